//! 切面链构建策略
//!
//! 给定方法与目标类，按切面列表的插入顺序展开出有序的拦截器链。
//! 静态可判定的匹配在此处一次性完成；需要运行时参数的匹配被
//! 打包成"拦截器 + 动态匹配器"对，推迟到每次实际调用。

use crate::adapter::{AdviceAdapterRegistry, DefaultAdviceAdapterRegistry};
use crate::advice::MethodInterceptor;
use crate::advisor::Advisor;
use crate::error::AopResult;
use crate::pointcut::{MethodMatcher, RuntimeMethodMatcher};
use std::sync::Arc;
use wyvern_core::reflect::{ClassRef, MethodRef};

/// 拦截器与动态匹配器的组合
///
/// 链构建时静态部分已经通过，运行时部分在每次调用时裁决
#[derive(Clone)]
pub struct InterceptorAndDynamicMethodMatcher {
    pub interceptor: Arc<dyn MethodInterceptor>,
    pub matcher: Arc<dyn RuntimeMethodMatcher>,
}

/// 链上的一个元素
#[derive(Clone)]
pub enum ChainEntry {
    /// 静态匹配已确定适用的拦截器
    Static(Arc<dyn MethodInterceptor>),

    /// 需要逐次调用裁决的拦截器
    Dynamic(InterceptorAndDynamicMethodMatcher),
}

/// 链构建策略
pub trait AdvisorChainFactory: Send + Sync {
    /// 为 (方法, 目标类) 计算有序的拦截器链
    ///
    /// `pre_filtered` 为 true 时跳过类级过滤（调用方保证列表中的
    /// 每个切面都已适用于目标类）
    fn interceptor_chain(
        &self,
        advisors: &[Arc<Advisor>],
        pre_filtered: bool,
        method: &MethodRef,
        target_class: Option<&ClassRef>,
    ) -> AopResult<Vec<ChainEntry>>;
}

/// 默认链构建策略
pub struct DefaultAdvisorChainFactory {
    adapters: Arc<dyn AdviceAdapterRegistry>,
}

impl DefaultAdvisorChainFactory {
    /// 用显式注入的适配注册表创建
    pub fn new(adapters: Arc<dyn AdviceAdapterRegistry>) -> Self {
        Self { adapters }
    }
}

impl Default for DefaultAdvisorChainFactory {
    fn default() -> Self {
        Self::new(Arc::new(DefaultAdviceAdapterRegistry))
    }
}

impl AdvisorChainFactory for DefaultAdvisorChainFactory {
    fn interceptor_chain(
        &self,
        advisors: &[Arc<Advisor>],
        pre_filtered: bool,
        method: &MethodRef,
        target_class: Option<&ClassRef>,
    ) -> AopResult<Vec<ChainEntry>> {
        let mut chain = Vec::with_capacity(advisors.len());

        for advisor in advisors {
            match advisor.as_ref() {
                Advisor::Pointcut(pa) => {
                    let pointcut = pa.pointcut();
                    if !pre_filtered && !pointcut.class_filter.matches(target_class) {
                        continue;
                    }
                    match &pointcut.method_matcher {
                        MethodMatcher::Static(pattern) => {
                            if pattern.matches(method) {
                                for interceptor in self.adapters.to_interceptors(pa.advice())? {
                                    chain.push(ChainEntry::Static(interceptor));
                                }
                            }
                        }
                        MethodMatcher::Dynamic {
                            static_part,
                            runtime,
                        } => {
                            if static_part.matches(method) {
                                for interceptor in self.adapters.to_interceptors(pa.advice())? {
                                    chain.push(ChainEntry::Dynamic(
                                        InterceptorAndDynamicMethodMatcher {
                                            interceptor,
                                            matcher: runtime.clone(),
                                        },
                                    ));
                                }
                            }
                        }
                    }
                }
                Advisor::Introduction(ia) => {
                    if !pre_filtered && !ia.class_filter().matches(target_class) {
                        continue;
                    }
                    // 引入通知只作用于其引入接口声明的方法，
                    // 该检查替代普通的切点匹配
                    if ia.interfaces().iter().any(|iface| iface.declares(method)) {
                        for interceptor in self.adapters.to_interceptors(ia.advice())? {
                            chain.push(ChainEntry::Static(interceptor));
                        }
                    }
                }
            }
        }

        tracing::trace!(
            "Resolved {} chain entr(ies) for {}",
            chain.len(),
            method.signature()
        );
        Ok(chain)
    }
}
