//! 条目处理上下文
//!
//! 封装"正在处理部门内第几个条目"这一信息，用作日志前缀

use std::fmt::Display;

/// 条目处理上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemCtx {
    /// 第几个条目（从 1 开始，仅用于日志显示）
    pub ordinal: usize,

    /// 本轮条目总数
    pub total: usize,

    /// 打开时在列表中的位置（从 0 开始）
    pub position: usize,
}

impl ItemCtx {
    pub fn new(ordinal: usize, total: usize, position: usize) -> Self {
        Self {
            ordinal,
            total,
            position,
        }
    }

    /// 进度（0.0 ~ 1.0）
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.ordinal as f64 / self.total as f64
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[条目 {}/{}]", self.ordinal, self.total)
    }
}
