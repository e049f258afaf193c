//! 通知（Advice）定义
//!
//! 通知是注入到连接点的行为本身。封闭的 `Advice` 和枚举让
//! `add_advice` 与链构建处可以做穷尽匹配，而不是运行时类型探测。

use crate::proxy::Proxy;
use std::fmt;
use std::sync::Arc;
use wyvern_core::reflect::{AnyValue, Args, ClassRef, InterfaceRef, MethodRef};

/// 方法调用上下文 — 拦截器看到的调用视图
///
/// `proceed` 将控制权交给链上的下一个拦截器，链耗尽后调用目标方法
pub trait MethodInvocation {
    /// 被调用的方法
    fn method(&self) -> &MethodRef;

    /// 调用参数
    fn args(&self) -> &Args;

    /// 目标类（无目标时为 None）
    fn target_class(&self) -> Option<&ClassRef>;

    /// 继续执行调用链
    fn proceed(&mut self) -> anyhow::Result<AnyValue>;

    /// expose_proxy 开启时，携带当前正在处理此调用的代理句柄
    fn exposed_proxy(&self) -> Option<Arc<Proxy>>;
}

/// 环绕拦截器
///
/// 链上最外层的拦截器最先获得控制权；拦截器可以改写返回值或异常
pub trait MethodInterceptor: Send + Sync {
    fn invoke(&self, invocation: &mut dyn MethodInvocation) -> anyhow::Result<AnyValue>;
}

/// 前置通知
///
/// 在目标方法执行前调用；返回 Err 会中止调用链
pub trait BeforeAdvice: Send + Sync {
    fn before(&self, method: &MethodRef, args: &Args) -> anyhow::Result<()>;
}

/// 返回后通知
///
/// 在目标方法成功返回后调用
pub trait AfterReturningAdvice: Send + Sync {
    fn after_returning(
        &self,
        value: &AnyValue,
        method: &MethodRef,
        args: &Args,
    ) -> anyhow::Result<()>;
}

/// 自描述引入通知
///
/// 携带其引入接口的元数据，因此可以被安全地自动包装成引入切面
pub trait IntroductionInterceptor: MethodInterceptor {
    /// 该通知引入的接口
    fn interfaces(&self) -> Vec<InterfaceRef>;

    /// 该通知是否能真实支撑指定接口
    fn implements_interface(&self, iface: &InterfaceRef) -> bool {
        self.interfaces().iter().any(|i| i == iface)
    }
}

/// 动态引入通知
///
/// 不携带接口元数据，能否支撑某个接口只能逐个询问；
/// 因此无法被 `add_advice` 安全地自动包装
pub trait DynamicIntroductionAdvice: Send + Sync {
    fn implements_interface(&self, iface: &InterfaceRef) -> bool;
}

/// 通知的封闭和类型
#[derive(Clone)]
pub enum Advice {
    /// 环绕拦截器
    Interceptor(Arc<dyn MethodInterceptor>),

    /// 前置通知
    Before(Arc<dyn BeforeAdvice>),

    /// 返回后通知
    AfterReturning(Arc<dyn AfterReturningAdvice>),

    /// 自描述引入通知
    Introduction(Arc<dyn IntroductionInterceptor>),

    /// 动态引入通知（无接口元数据）
    DynamicIntroduction(Arc<dyn DynamicIntroductionAdvice>),
}

impl Advice {
    /// 按对象身份比较两个通知
    pub fn ptr_eq(&self, other: &Advice) -> bool {
        match (self, other) {
            (Advice::Interceptor(a), Advice::Interceptor(b)) => Arc::ptr_eq(a, b),
            (Advice::Before(a), Advice::Before(b)) => Arc::ptr_eq(a, b),
            (Advice::AfterReturning(a), Advice::AfterReturning(b)) => Arc::ptr_eq(a, b),
            (Advice::Introduction(a), Advice::Introduction(b)) => Arc::ptr_eq(a, b),
            (Advice::DynamicIntroduction(a), Advice::DynamicIntroduction(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// 通知种类名称（用于日志和错误信息）
    pub fn kind(&self) -> &'static str {
        match self {
            Advice::Interceptor(_) => "interceptor",
            Advice::Before(_) => "before",
            Advice::AfterReturning(_) => "after-returning",
            Advice::Introduction(_) => "introduction",
            Advice::DynamicIntroduction(_) => "dynamic-introduction",
        }
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Advice::{}", self.kind())
    }
}
