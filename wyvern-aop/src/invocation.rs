//! 链执行器
//!
//! 按顺序执行拦截器链，链耗尽后调用目标方法。动态元素在每次
//! 调用时结合实际参数裁决；不匹配的动态拦截器被跳过。

use crate::advice::MethodInvocation;
use crate::chain::ChainEntry;
use crate::proxy::Proxy;
use std::sync::Arc;
use wyvern_core::reflect::{AnyValue, Args, ClassRef, MethodRef, Reflective};

/// 一次代理方法调用
///
/// `proceed` 可被链上的拦截器递归推进；最内层是目标调用
pub struct ProxyMethodInvocation {
    method: MethodRef,
    args: Args,
    target: Option<Arc<dyn Reflective>>,
    target_class: Option<ClassRef>,
    chain: Arc<Vec<ChainEntry>>,
    index: usize,
    exposed_proxy: Option<Arc<Proxy>>,
}

impl ProxyMethodInvocation {
    pub fn new(
        method: MethodRef,
        args: Args,
        target: Option<Arc<dyn Reflective>>,
        target_class: Option<ClassRef>,
        chain: Arc<Vec<ChainEntry>>,
        exposed_proxy: Option<Arc<Proxy>>,
    ) -> Self {
        Self {
            method,
            args,
            target,
            target_class,
            chain,
            index: 0,
            exposed_proxy,
        }
    }

    /// 最内层：调用目标方法
    fn invoke_joinpoint(&self) -> anyhow::Result<AnyValue> {
        match &self.target {
            Some(target) => target.invoke(&self.method, self.args.clone()),
            None => anyhow::bail!(
                "no target available for {} and the interceptor chain did not \
                 produce a result",
                self.method.signature()
            ),
        }
    }
}

impl MethodInvocation for ProxyMethodInvocation {
    fn method(&self) -> &MethodRef {
        &self.method
    }

    fn args(&self) -> &Args {
        &self.args
    }

    fn target_class(&self) -> Option<&ClassRef> {
        self.target_class.as_ref()
    }

    fn proceed(&mut self) -> anyhow::Result<AnyValue> {
        if self.index == self.chain.len() {
            return self.invoke_joinpoint();
        }

        let entry = self.chain[self.index].clone();
        self.index += 1;

        match entry {
            ChainEntry::Static(interceptor) => interceptor.invoke(self),
            ChainEntry::Dynamic(pair) => {
                if pair
                    .matcher
                    .matches(&self.method, self.target_class.as_ref(), &self.args)
                {
                    pair.interceptor.invoke(self)
                } else {
                    // 动态匹配失败：跳过该拦截器，继续链上其余部分
                    self.proceed()
                }
            }
        }
    }

    fn exposed_proxy(&self) -> Option<Arc<Proxy>> {
        self.exposed_proxy.clone()
    }
}
