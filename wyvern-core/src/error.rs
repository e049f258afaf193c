//! 统一的错误处理类型
//!
//! 封闭的错误分类使用 thiserror 定义；开放式的错误组合使用 anyhow，
//! 通过 .context() 方法添加错误上下文信息。

use thiserror::Error;

/// 容器侧错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Bean 后置处理失败
    #[error("bean post-processing failed for '{bean_name}': {reason}")]
    PostProcessing { bean_name: String, reason: String },

    /// Bean 类型不匹配
    #[error("bean type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// 日志系统初始化失败
    #[error("logging initialization failed: {0}")]
    LoggingInit(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

// 重新导出 anyhow::Result，方便调用方组合错误
pub use anyhow::Result;
