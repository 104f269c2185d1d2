use thiserror::Error;

/// 应用程序错误类型
///
/// 分类与处理方式：
/// - `Connection` / `Navigation`：致命，整批终止
/// - `Submission` / `ElementNotFound`：只影响当前条目，在条目边界被捕获
/// - `SyncConfidenceLow`：非致命，只用于诊断日志
#[derive(Debug, Error)]
pub enum AppError {
    /// 无法连接浏览器
    #[error("无法连接到浏览器 (端口: {port}): {reason}")]
    Connection { port: u16, reason: String },

    /// 目标页面不可达，或重新登录等待超时
    #[error("导航失败: {0}")]
    Navigation(String),

    /// 观察字段内容未达到置信阈值
    #[error("同步置信度不足: 已确认 {measured} 字符, 需要 {required} 字符")]
    SyncConfidenceLow { measured: usize, required: usize },

    /// 所有定位方式都找不到元素
    #[error("元素未找到: {0}")]
    ElementNotFound(String),

    /// 提交动作没有任何路径成功
    #[error("提交失败: {0}")]
    Submission(String),

    /// CDP / 浏览器通信错误
    #[error("浏览器错误: {0}")]
    Browser(String),

    /// 脚本执行或结果解析失败
    #[error("脚本错误: {0}")]
    Script(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 文件错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// 是否为整批致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Connection { .. } | AppError::Navigation(_))
    }

    /// 创建浏览器连接错误
    pub fn connection(port: u16, reason: impl Into<String>) -> Self {
        AppError::Connection {
            port,
            reason: reason.into(),
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Script(err.to_string())
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Script(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Browser(err.to_string())
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
