//! Wyvern AOP - 面向切面编程支持
//!
//! 提供基于动态代理的 AOP 功能，支持：
//! - 可变的代理配置（目标源、接口、切面列表与行为标志）
//! - 切点表达式（类过滤器 + 静态/运行时方法匹配器）
//! - 按方法缓存的拦截器链解析
//! - 基于接口与基于目标类两种代理形态
//! - 通过 BeanPostProcessor 自动为容器 Bean 应用切面

pub mod adapter;
pub mod advice;
pub mod advised;
pub mod advisor;
pub mod bean_post_processor;
pub mod chain;
pub mod error;
pub mod invocation;
pub mod pointcut;
pub mod proxy;
pub mod proxy_config;
pub mod proxy_factory;
pub mod target_source;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出核心类型
pub use adapter::{AdviceAdapterRegistry, DefaultAdviceAdapterRegistry};
pub use advice::{
    Advice, AfterReturningAdvice, BeforeAdvice, DynamicIntroductionAdvice,
    IntroductionInterceptor, MethodInterceptor, MethodInvocation,
};
pub use advised::{Advised, AdvisedSupport};
pub use advisor::{Advisor, IntroductionAdvisor, PointcutAdvisor};
pub use bean_post_processor::AdvisingBeanPostProcessor;
pub use chain::{
    AdvisorChainFactory, ChainEntry, DefaultAdvisorChainFactory,
    InterceptorAndDynamicMethodMatcher,
};
pub use error::{AopError, AopResult};
pub use pointcut::{ClassFilter, MethodMatcher, MethodPattern, Pointcut, RuntimeMethodMatcher};
pub use proxy::{AopProxy, AopProxyFactory, DefaultAopProxyFactory, Proxy, ProxyKind};
pub use proxy_config::ProxyConfig;
pub use proxy_factory::{ProxyCreatorSupport, ProxyFactory};
pub use target_source::{EmptyTargetSource, SingletonTargetSource, TargetSource};

/// 预导入模块
pub mod prelude {
    pub use crate::advice::{Advice, MethodInterceptor, MethodInvocation};
    pub use crate::advised::{Advised, AdvisedSupport};
    pub use crate::advisor::{Advisor, IntroductionAdvisor, PointcutAdvisor};
    pub use crate::error::{AopError, AopResult};
    pub use crate::pointcut::{ClassFilter, MethodMatcher, MethodPattern, Pointcut};
    pub use crate::proxy::{Proxy, ProxyKind};
    pub use crate::proxy_factory::ProxyFactory;
    pub use crate::target_source::{SingletonTargetSource, TargetSource};
}
