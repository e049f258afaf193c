//! 代理工厂门面
//!
//! `ProxyCreatorSupport` 把一份配置与一个创建策略绑在一起；
//! `ProxyFactory` 在其上提供编程式入口：设目标、加通知、取代理。

use crate::advice::Advice;
use crate::advised::AdvisedSupport;
use crate::advisor::Advisor;
use crate::error::AopResult;
use crate::proxy::{AopProxy, AopProxyFactory, DefaultAopProxyFactory, Proxy};
use crate::target_source::TargetSource;
use std::sync::Arc;
use wyvern_core::reflect::{InterfaceRef, Reflective};

/// 配置与创建策略的组合基座
pub struct ProxyCreatorSupport {
    advised: Arc<AdvisedSupport>,
    aop_proxy_factory: Arc<dyn AopProxyFactory>,
}

impl ProxyCreatorSupport {
    pub fn new() -> Self {
        Self::with_factory(Arc::new(DefaultAopProxyFactory))
    }

    pub fn with_factory(aop_proxy_factory: Arc<dyn AopProxyFactory>) -> Self {
        Self {
            advised: Arc::new(AdvisedSupport::new()),
            aop_proxy_factory,
        }
    }

    pub fn advised(&self) -> &Arc<AdvisedSupport> {
        &self.advised
    }

    /// 按当前配置选择后端并构造一次性生成器
    pub fn create_aop_proxy(&self) -> AopResult<Box<dyn AopProxy>> {
        self.aop_proxy_factory.create_aop_proxy(self.advised.clone())
    }
}

impl Default for ProxyCreatorSupport {
    fn default() -> Self {
        Self::new()
    }
}

/// 编程式代理创建入口
pub struct ProxyFactory {
    creator: ProxyCreatorSupport,
}

impl ProxyFactory {
    pub fn new() -> Self {
        Self {
            creator: ProxyCreatorSupport::new(),
        }
    }

    /// 以目标对象初始化
    pub fn for_target(target: Arc<dyn Reflective>) -> AopResult<Self> {
        let factory = Self::new();
        factory.creator.advised().set_target(target)?;
        Ok(factory)
    }

    pub fn advised(&self) -> &Arc<AdvisedSupport> {
        self.creator.advised()
    }

    // ------------------------------------------------------------------
    // 常用操作的转发
    // ------------------------------------------------------------------

    pub fn set_target(&self, target: Arc<dyn Reflective>) -> AopResult<()> {
        self.advised().set_target(target)
    }

    pub fn set_target_source(&self, source: Option<Arc<dyn TargetSource>>) -> AopResult<()> {
        self.advised().set_target_source(source)
    }

    pub fn add_interface(&self, iface: InterfaceRef) -> AopResult<()> {
        self.advised().add_interface(iface)
    }

    pub fn add_advice(&self, advice: Advice) -> AopResult<()> {
        self.advised().add_advice(advice)
    }

    pub fn add_advisor(&self, advisor: Advisor) -> AopResult<()> {
        self.advised().add_advisor(advisor)
    }

    pub fn add_advisor_at(&self, pos: usize, advisor: Advisor) -> AopResult<()> {
        self.advised().add_advisor_at(pos, advisor)
    }

    pub fn set_proxy_target_class(&self, flag: bool) {
        self.advised().set_proxy_target_class(flag);
    }

    pub fn set_expose_proxy(&self, flag: bool) {
        self.advised().set_expose_proxy(flag);
    }

    pub fn freeze(&self) {
        self.advised().freeze();
    }

    /// 生成代理
    ///
    /// 未要求按目标类代理且未显式指定接口时，创建策略退回目标类
    /// 实现的全部接口；该推断在创建时计算，不改动配置本身
    pub fn get_proxy(&self) -> AopResult<Arc<Proxy>> {
        self.creator.create_aop_proxy()?.proxy()
    }
}

impl Default for ProxyFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AopError;
    use crate::proxy::ProxyKind;
    use crate::testing::{as_string, EventLog, RecordingInterceptor, TestService};
    use std::sync::Mutex;
    use wyvern_core::reflect::ClassRef;

    fn events() -> EventLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_plain_proxy_detects_interfaces_and_delegates() {
        let factory = ProxyFactory::for_target(TestService::plain()).unwrap();
        let proxy = factory.get_proxy().unwrap();

        assert_eq!(proxy.kind(), ProxyKind::Interface);
        assert!(proxy.implements(&TestService::greeter_interface()));

        let result = proxy
            .invoke(&ClassRef::new("TestService").method("greet"), Vec::new())
            .unwrap();
        assert_eq!(as_string(&result), "hello");
    }

    #[test]
    fn test_interceptor_fires_around_every_invocation() {
        let log = events();
        let interceptor = Arc::new(RecordingInterceptor::new("audit", log.clone()));
        let factory =
            ProxyFactory::for_target(TestService::with_events(log.clone())).unwrap();
        factory
            .add_advice(Advice::Interceptor(interceptor.clone()))
            .unwrap();
        let proxy = factory.get_proxy().unwrap();

        let greet = ClassRef::new("TestService").method("greet");
        for _ in 0..3 {
            proxy.invoke(&greet, Vec::new()).unwrap();
        }

        assert_eq!(interceptor.count(), 6);
        let recorded = log.lock().unwrap();
        assert_eq!(
            &recorded[..3],
            &["audit:before".to_string(), "target:greet".to_string(), "audit:after".to_string()]
        );
    }

    #[test]
    fn test_advisor_inserted_at_front_runs_first() {
        let log = events();
        let x = Arc::new(RecordingInterceptor::new("x", log.clone()));
        let y = Arc::new(RecordingInterceptor::new("y", log.clone()));

        let factory =
            ProxyFactory::for_target(TestService::with_events(log.clone())).unwrap();
        factory.add_advice(Advice::Interceptor(y)).unwrap();
        factory
            .add_advisor_at(
                0,
                Advisor::Pointcut(crate::advisor::PointcutAdvisor::always(
                    Advice::Interceptor(x),
                )),
            )
            .unwrap();

        let proxy = factory.get_proxy().unwrap();
        proxy
            .invoke(&ClassRef::new("TestService").method("greet"), Vec::new())
            .unwrap();

        let recorded = log.lock().unwrap();
        assert_eq!(
            *recorded,
            vec![
                "x:before".to_string(),
                "y:before".to_string(),
                "target:greet".to_string(),
                "y:after".to_string(),
                "x:after".to_string(),
            ]
        );
    }

    #[test]
    fn test_frozen_factory_rejects_mutation_and_keeps_working() {
        let log = events();
        let factory =
            ProxyFactory::for_target(TestService::with_events(log.clone())).unwrap();
        factory
            .add_advice(Advice::Interceptor(Arc::new(RecordingInterceptor::new(
                "a",
                log.clone(),
            ))))
            .unwrap();
        factory.freeze();

        let err = factory
            .add_advice(Advice::Interceptor(Arc::new(RecordingInterceptor::new(
                "b",
                log.clone(),
            ))))
            .unwrap_err();
        assert!(matches!(err, AopError::ConfigurationFrozen));
        assert_eq!(factory.advised().advisor_count(), 1);

        // 冻结后已有链照常工作
        let proxy = factory.get_proxy().unwrap();
        proxy
            .invoke(&ClassRef::new("TestService").method("greet"), Vec::new())
            .unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:before".to_string(),
                "target:greet".to_string(),
                "a:after".to_string(),
            ]
        );
    }

    #[test]
    fn test_frozen_config_still_auto_detects_interfaces() {
        let factory = ProxyFactory::for_target(TestService::plain()).unwrap();
        factory.freeze();

        // 冻结只禁止结构性变更，不禁止生成代理
        let proxy = factory.get_proxy().unwrap();
        assert!(proxy.implements(&TestService::greeter_interface()));
        // 接口推断不回写配置
        assert!(factory.advised().proxied_interfaces().is_empty());
    }

    #[test]
    fn test_target_class_proxy_for_interfaceless_target() {
        let factory = ProxyFactory::for_target(TestService::interfaceless()).unwrap();
        factory.set_proxy_target_class(true);
        let proxy = factory.get_proxy().unwrap();

        assert_eq!(proxy.kind(), ProxyKind::TargetClass);
        assert!(proxy.is_instance_of(&ClassRef::new("PlainService")));

        let result = proxy
            .invoke(&ClassRef::new("PlainService").method("greet"), Vec::new())
            .unwrap();
        assert_eq!(as_string(&result), "hello");
    }

    #[test]
    fn test_changes_after_creation_are_observed() {
        let log = events();
        let factory =
            ProxyFactory::for_target(TestService::with_events(log.clone())).unwrap();
        let proxy = factory.get_proxy().unwrap();

        let greet = ClassRef::new("TestService").method("greet");
        proxy.invoke(&greet, Vec::new()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["target:greet".to_string()]);

        factory
            .add_advice(Advice::Interceptor(Arc::new(RecordingInterceptor::new(
                "late",
                log.clone(),
            ))))
            .unwrap();
        log.lock().unwrap().clear();

        proxy.invoke(&greet, Vec::new()).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "late:before".to_string(),
                "target:greet".to_string(),
                "late:after".to_string(),
            ]
        );
    }

    #[test]
    fn test_exposed_proxy_reaches_interceptors() {
        struct Capture {
            saw_proxy: Arc<Mutex<bool>>,
        }
        impl crate::advice::MethodInterceptor for Capture {
            fn invoke(
                &self,
                invocation: &mut dyn crate::advice::MethodInvocation,
            ) -> anyhow::Result<wyvern_core::reflect::AnyValue> {
                *self.saw_proxy.lock().unwrap() = invocation.exposed_proxy().is_some();
                invocation.proceed()
            }
        }

        let saw_proxy = Arc::new(Mutex::new(false));
        let factory = ProxyFactory::for_target(TestService::plain()).unwrap();
        factory.set_expose_proxy(true);
        factory
            .add_advice(Advice::Interceptor(Arc::new(Capture {
                saw_proxy: saw_proxy.clone(),
            })))
            .unwrap();

        let proxy = factory.get_proxy().unwrap();
        proxy
            .invoke(&ClassRef::new("TestService").method("greet"), Vec::new())
            .unwrap();
        assert!(*saw_proxy.lock().unwrap());
    }
}
