/// 待接收列表中的一行
///
/// 只在当前列表视图内有效，任何导航后都要重新枚举
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 行序号（从 0 开始，对应勾选框的序号）
    pub ordinal: usize,
    /// 来源部门（页面上原样显示的文本）
    pub origin: String,
}

impl WorkItem {
    pub fn new(ordinal: usize, origin: impl Into<String>) -> Self {
        Self {
            ordinal,
            origin: origin.into(),
        }
    }
}
