//! 通知适配注册表
//!
//! 把各种形态的通知适配成链上统一的拦截器形态。
//! 注册表作为显式依赖注入到链工厂，而不是进程级单例，
//! 测试可以替换成假实现。

use crate::advice::{
    Advice, AfterReturningAdvice, BeforeAdvice, IntroductionInterceptor, MethodInterceptor,
    MethodInvocation,
};
use crate::error::{AopError, AopResult};
use std::sync::Arc;
use wyvern_core::reflect::AnyValue;

/// 通知适配注册表
pub trait AdviceAdapterRegistry: Send + Sync {
    /// 把一个通知展开成零个或多个拦截器
    ///
    /// 展开顺序即链上顺序；无法适配的通知返回错误
    fn to_interceptors(&self, advice: &Advice) -> AopResult<Vec<Arc<dyn MethodInterceptor>>>;
}

/// 默认适配注册表
///
/// 对封闭的 `Advice` 和类型做穷尽匹配
#[derive(Debug, Default)]
pub struct DefaultAdviceAdapterRegistry;

impl AdviceAdapterRegistry for DefaultAdviceAdapterRegistry {
    fn to_interceptors(&self, advice: &Advice) -> AopResult<Vec<Arc<dyn MethodInterceptor>>> {
        match advice {
            Advice::Interceptor(interceptor) => Ok(vec![interceptor.clone()]),
            Advice::Before(before) => Ok(vec![Arc::new(BeforeAdviceInterceptor {
                advice: before.clone(),
            })]),
            Advice::AfterReturning(after) => Ok(vec![Arc::new(AfterReturningAdviceInterceptor {
                advice: after.clone(),
            })]),
            Advice::Introduction(introduction) => Ok(vec![Arc::new(IntroductionDelegate {
                advice: introduction.clone(),
            })]),
            Advice::DynamicIntroduction(_) => Err(AopError::UnsupportedAdviceComposition(
                "dynamic introduction advice carries no interface metadata".to_string(),
            )),
        }
    }
}

/// 前置通知的拦截器适配
struct BeforeAdviceInterceptor {
    advice: Arc<dyn BeforeAdvice>,
}

impl MethodInterceptor for BeforeAdviceInterceptor {
    fn invoke(&self, invocation: &mut dyn MethodInvocation) -> anyhow::Result<AnyValue> {
        self.advice.before(invocation.method(), invocation.args())?;
        invocation.proceed()
    }
}

/// 返回后通知的拦截器适配
struct AfterReturningAdviceInterceptor {
    advice: Arc<dyn AfterReturningAdvice>,
}

impl MethodInterceptor for AfterReturningAdviceInterceptor {
    fn invoke(&self, invocation: &mut dyn MethodInvocation) -> anyhow::Result<AnyValue> {
        let value = invocation.proceed()?;
        self.advice
            .after_returning(&value, invocation.method(), invocation.args())?;
        Ok(value)
    }
}

/// 引入通知的拦截器委托
struct IntroductionDelegate {
    advice: Arc<dyn IntroductionInterceptor>,
}

impl MethodInterceptor for IntroductionDelegate {
    fn invoke(&self, invocation: &mut dyn MethodInvocation) -> anyhow::Result<AnyValue> {
        self.advice.invoke(invocation)
    }
}
