use std::fmt::Display;

/// 工作队列页面的状态
///
/// 每次都从实时页面重新计算，不跨导航缓存
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    /// 部门下拉框可见，需要选择部门并确认
    SelectingUnit,
    /// 已在部门内（"待接收" / "部门内" 列表标题存在）
    InsideUnit,
    /// 无法识别
    Unknown,
}

impl Display for ScreenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ScreenState::SelectingUnit => "选择部门",
            ScreenState::InsideUnit => "部门内",
            ScreenState::Unknown => "未知",
        };
        write!(f, "{}", label)
    }
}
