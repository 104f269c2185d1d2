//! 来源部门拦截规则

use crate::utils::normalize;

/// 来源部门拦截规则
///
/// 每个片段按空白拆成若干词，规范化后全部出现在规范化的标签中才算命中；
/// 任一片段命中即拦截。多词片段要求所有词都在，避免部分重叠误拦。
#[derive(Debug, Clone, Default)]
pub struct BlockRule {
    fragments: Vec<Fragment>,
}

#[derive(Debug, Clone)]
struct Fragment {
    raw: String,
    tokens: Vec<String>,
}

impl BlockRule {
    pub fn new<S: AsRef<str>>(fragments: &[S]) -> Self {
        let fragments = fragments
            .iter()
            .filter_map(|f| {
                let raw = f.as_ref();
                let tokens: Vec<String> = raw
                    .split_whitespace()
                    .map(normalize)
                    .filter(|t| !t.is_empty())
                    .collect();
                (!tokens.is_empty()).then(|| Fragment {
                    raw: raw.to_string(),
                    tokens,
                })
            })
            .collect();
        Self { fragments }
    }

    /// 命中的片段（原文）
    pub fn matching_fragment(&self, label: &str) -> Option<&str> {
        let canonical = normalize(label);
        self.fragments
            .iter()
            .find(|f| f.tokens.iter().all(|t| canonical.contains(t.as_str())))
            .map(|f| f.raw.as_str())
    }

    pub fn is_blocked(&self, label: &str) -> bool {
        self.matching_fragment(label).is_some()
    }
}
