// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）和英文, 用于命令行输出
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 语言环境变量
pub const LANG_ENV: &str = "DICT_IMPORTER_LANG";

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 按环境变量设置语言 (未设置时保持默认)
pub fn init_from_env() {
    if let Ok(locale) = std::env::var(LANG_ENV) {
        let locale = locale.trim();
        if !locale.is_empty() {
            set_locale(locale);
        }
    }
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use dict_importer::i18n::t;
/// let msg = t("import.completed");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use dict_importer::i18n::t_with_args;
/// let msg = t_with_args("import.file_not_found", &[("path", "/tmp/ecdict.csv")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
