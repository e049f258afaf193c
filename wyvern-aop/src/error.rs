//! AOP 错误分类
//!
//! 所有错误都是快速失败的：配置变更被拒绝时，配置必须保持调用前的状态

use thiserror::Error;

/// AOP 配置与代理创建错误
#[derive(Debug, Error)]
pub enum AopError {
    /// 配置已冻结，拒绝一切结构性变更
    #[error("proxy configuration is frozen; cannot change advice or interfaces")]
    ConfigurationFrozen,

    /// 插入/删除位置越界
    #[error("invalid position {index}: advisor count is {size}")]
    InvalidPosition { index: usize, size: usize },

    /// 非法参数
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// 引入通知声明的接口无法由其通知实现
    #[error("introduction validation failed: {0}")]
    IntroductionValidation(String),

    /// 无法被安全自动包装的通知组合
    #[error("cannot auto-wrap advice into an advisor: {0}")]
    UnsupportedAdviceComposition(String),

    /// 代理创建失败
    #[error("proxy creation failed: {0}")]
    ProxyCreation(String),
}

pub type AopResult<T> = std::result::Result<T, AopError>;
