// wyvern-core: Wyvern 框架的容器侧基础设施
//
// 提供 AOP 子系统消费的最小底座：
// - 值语义的类/接口/方法描述符与动态调用面（反射替身）
// - BeanPostProcessor 扩展机制
// - 统一的错误类型与日志初始化

pub mod bean_post_processor;
pub mod error;
pub mod logging;
pub mod reflect;

// 重新导出常用类型
pub use bean_post_processor::{apply_post_processors, BeanPostProcessor};
pub use error::{ContainerError, ContainerResult, Result};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use reflect::{AnyValue, Args, ClassRef, InterfaceRef, MethodRef, Reflective};

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean_post_processor::{apply_post_processors, BeanPostProcessor};
    pub use crate::error::{ContainerError, ContainerResult, Result};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::reflect::{AnyValue, Args, ClassRef, InterfaceRef, MethodRef, Reflective};
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
