//! 部门名称规范化
//!
//! 去掉重音、转大写、只保留 `[A-Z0-9]`，用于模糊的子串匹配。

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 规范化文本
///
/// `normalize("Ç.P.A.D") == normalize("c p a d") == "CPAD"`。
/// 对任意输入都不会失败，并且幂等。
pub fn normalize(text: &str) -> String {
    text.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}
