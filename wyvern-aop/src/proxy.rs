//! 代理创建策略与代理运行时对象
//!
//! `AopProxy`/`AopProxyFactory` 是把一份配置变成存活代理的策略契约；
//! 基于接口与基于目标类的两种后端满足同一契约。代理对象把每次
//! 方法调用路由经过链解析（见 `advised`），最内层经由目标源取得
//! 目标并调用。

use crate::advised::AdvisedSupport;
use crate::error::{AopError, AopResult};
use crate::invocation::ProxyMethodInvocation;
use crate::advice::MethodInvocation;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use wyvern_core::reflect::{AnyValue, Args, ClassRef, InterfaceRef, MethodRef, Reflective};

/// 代理的生成形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    /// 仅实现配置接口的动态代理
    Interface,

    /// 子类化目标类形态的代理
    TargetClass,
}

/// 已配置好的一次性代理生成器
pub trait AopProxy: Send + Sync {
    /// 生成代理对象；永远不返回"空"代理
    fn proxy(&self) -> AopResult<Arc<Proxy>>;
}

/// 代理生成策略的选择与构造
pub trait AopProxyFactory: Send + Sync {
    fn create_aop_proxy(&self, advised: Arc<AdvisedSupport>) -> AopResult<Box<dyn AopProxy>>;
}

/// 代理基础设施自身的标记接口判定
fn is_infrastructure_interface(iface: &InterfaceRef) -> bool {
    iface.name == "Advised" || iface.name.starts_with("wyvern.aop")
}

/// 创建时生效的接口列表
///
/// 未显式配置接口且未要求按目标类代理时，退回目标类实现的接口。
/// 该推断只在创建时计算，不回写配置，冻结的配置照常生成代理
fn effective_interfaces(advised: &AdvisedSupport) -> Vec<InterfaceRef> {
    let configured = advised.proxied_interfaces();
    if !configured.is_empty() || advised.is_proxy_target_class() {
        return configured;
    }
    advised
        .target_class()
        .map(|class| class.interfaces)
        .unwrap_or_default()
}

/// 默认策略选择
///
/// 要求按目标类代理、或没有可用接口、或唯一接口是代理基础设施
/// 标记接口时，选择子类化形态；否则选择接口形态
pub struct DefaultAopProxyFactory;

impl AopProxyFactory for DefaultAopProxyFactory {
    fn create_aop_proxy(&self, advised: Arc<AdvisedSupport>) -> AopResult<Box<dyn AopProxy>> {
        let interfaces = effective_interfaces(&advised);
        let subclass_style = advised.is_proxy_target_class()
            || interfaces.is_empty()
            || (interfaces.len() == 1 && is_infrastructure_interface(&interfaces[0]));

        if subclass_style {
            let target_class = advised.target_class().ok_or_else(|| {
                AopError::ProxyCreation(
                    "target-class proxying requires a target class".to_string(),
                )
            })?;
            if target_class.is_final {
                return Err(AopError::ProxyCreation(format!(
                    "class '{}' is final and cannot be subclass-proxied",
                    target_class
                )));
            }
            tracing::debug!("Creating target-class proxy for '{}'", target_class);
            Ok(Box::new(TargetClassAopProxy { advised }))
        } else {
            tracing::debug!(
                "Creating interface proxy with {} interface(s)",
                interfaces.len()
            );
            Ok(Box::new(InterfaceAopProxy { advised, interfaces }))
        }
    }
}

/// 基于接口的代理后端
///
/// 接口列表在创建策略选择时已经确定，不再从配置重新读取
pub struct InterfaceAopProxy {
    advised: Arc<AdvisedSupport>,
    interfaces: Vec<InterfaceRef>,
}

impl AopProxy for InterfaceAopProxy {
    fn proxy(&self) -> AopResult<Arc<Proxy>> {
        if self.interfaces.is_empty() {
            return Err(AopError::ProxyCreation(
                "interface proxying requires at least one proxied interface".to_string(),
            ));
        }
        let base = self
            .advised
            .target_class()
            .map(|c| c.name)
            .unwrap_or_else(|| "Advised".to_string());
        let proxy_class =
            ClassRef::implementing(format!("$WyvernProxy${}", base), self.interfaces.clone());
        Ok(Proxy::create(
            self.advised.clone(),
            proxy_class,
            ProxyKind::Interface,
        ))
    }
}

/// 基于目标类（子类化形态）的代理后端
pub struct TargetClassAopProxy {
    advised: Arc<AdvisedSupport>,
}

impl AopProxy for TargetClassAopProxy {
    fn proxy(&self) -> AopResult<Arc<Proxy>> {
        let target_class = self.advised.target_class().ok_or_else(|| {
            AopError::ProxyCreation("target-class proxying requires a target class".to_string())
        })?;
        if target_class.is_final {
            return Err(AopError::ProxyCreation(format!(
                "class '{}' is final and cannot be subclass-proxied",
                target_class
            )));
        }

        // 生成的"子类"沿用目标类的身份，并补上配置里额外引入的接口
        let mut interfaces = target_class.interfaces.clone();
        for iface in self.advised.proxied_interfaces() {
            if !interfaces.contains(&iface) {
                interfaces.push(iface);
            }
        }
        let proxy_class = ClassRef::implementing(target_class.name, interfaces);
        Ok(Proxy::create(
            self.advised.clone(),
            proxy_class,
            ProxyKind::TargetClass,
        ))
    }
}

/// 存活的代理对象
///
/// 持有其配置的直接引用：配置未冻结时，创建之后对配置的变更
/// 会被代理观察到
pub struct Proxy {
    advised: Arc<AdvisedSupport>,
    proxy_class: ClassRef,
    kind: ProxyKind,
    weak_self: Weak<Proxy>,
}

impl Proxy {
    fn create(advised: Arc<AdvisedSupport>, proxy_class: ClassRef, kind: ProxyKind) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            advised,
            proxy_class,
            kind,
            weak_self: weak.clone(),
        })
    }

    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    /// 代理声明的接口（创建时固定，保持配置中的顺序）
    pub fn proxied_interfaces(&self) -> Vec<InterfaceRef> {
        self.proxy_class.interfaces.clone()
    }

    /// 配置自省入口；`opaque` 配置下不可用
    pub fn advised(&self) -> Option<&Arc<AdvisedSupport>> {
        if self.advised.is_opaque() {
            None
        } else {
            Some(&self.advised)
        }
    }

    /// 代理是否可视为指定类/接口的实例
    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        self.proxy_class.name == class.name
            || self
                .proxy_class
                .interfaces
                .iter()
                .any(|i| i.name == class.name)
    }

    pub fn implements(&self, iface: &InterfaceRef) -> bool {
        self.proxy_class.implements(iface)
    }

    /// 结构化相等：相同的被代理接口、相同的切面（按身份）与相同目标源
    pub fn proxy_equals(&self, other: &Proxy) -> bool {
        if self.proxy_class.interfaces != other.proxy_class.interfaces {
            return false;
        }
        let (a, b) = (self.advised.advisors(), other.advised.advisors());
        if a.len() != b.len() || !a.iter().zip(b.iter()).all(|(x, y)| Arc::ptr_eq(x, y)) {
            return false;
        }
        Arc::ptr_eq(&self.advised.target_source(), &other.advised.target_source())
    }
}

impl Reflective for Proxy {
    fn class(&self) -> &ClassRef {
        &self.proxy_class
    }

    /// 把一次方法调用路由经过拦截器链
    fn invoke(&self, method: &MethodRef, args: Args) -> anyhow::Result<AnyValue> {
        let source = self.advised.target_source();
        let target = source.get_target()?;
        let target_class = source
            .target_class()
            .cloned()
            .or_else(|| target.as_ref().map(|t| t.class().clone()));

        // 目标一旦取得就必须归还，链解析失败也不例外
        let result = match self.advised.interceptors_for(method, target_class.as_ref()) {
            Ok(chain) => {
                let exposed = if self.advised.is_expose_proxy() {
                    self.weak_self.upgrade()
                } else {
                    None
                };
                let mut invocation = ProxyMethodInvocation::new(
                    method.clone(),
                    args,
                    target.clone(),
                    target_class,
                    chain,
                    exposed,
                );
                invocation.proceed()
            }
            Err(err) => Err(err.into()),
        };

        if !source.is_static() {
            if let Some(target) = target {
                source.release_target(target);
            }
        }
        result
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.proxy_equals(other)
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("class", &self.proxy_class.name)
            .field("kind", &self.kind)
            .field("interfaces", &self.proxy_class.interfaces)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestService;

    fn advised_for(target: Arc<dyn Reflective>) -> Arc<AdvisedSupport> {
        let advised = Arc::new(AdvisedSupport::new());
        advised.set_target(target).unwrap();
        advised
    }

    #[test]
    fn test_factory_selects_interface_proxy() {
        let advised = advised_for(TestService::plain());
        advised
            .add_interface(TestService::greeter_interface())
            .unwrap();

        let proxy = DefaultAopProxyFactory
            .create_aop_proxy(advised)
            .unwrap()
            .proxy()
            .unwrap();
        assert_eq!(proxy.kind(), ProxyKind::Interface);
        assert!(proxy.implements(&TestService::greeter_interface()));
    }

    #[test]
    fn test_factory_selects_target_class_proxy_without_interfaces() {
        let advised = advised_for(TestService::interfaceless());

        let proxy = DefaultAopProxyFactory
            .create_aop_proxy(advised)
            .unwrap()
            .proxy()
            .unwrap();
        assert_eq!(proxy.kind(), ProxyKind::TargetClass);
        assert!(proxy.is_instance_of(&ClassRef::new("PlainService")));
    }

    #[test]
    fn test_factory_honors_proxy_target_class_flag() {
        let advised = advised_for(TestService::plain());
        advised
            .add_interface(TestService::greeter_interface())
            .unwrap();
        advised.set_proxy_target_class(true);

        let proxy = DefaultAopProxyFactory
            .create_aop_proxy(advised)
            .unwrap()
            .proxy()
            .unwrap();
        assert_eq!(proxy.kind(), ProxyKind::TargetClass);
        // 子类形态仍补上配置里的接口
        assert!(proxy.implements(&TestService::greeter_interface()));
    }

    #[test]
    fn test_final_class_cannot_be_subclass_proxied() {
        let advised = advised_for(TestService::final_target());

        let Err(err) = DefaultAopProxyFactory.create_aop_proxy(advised) else {
            panic!("final class must not be subclass-proxied");
        };
        assert!(matches!(err, AopError::ProxyCreation(_)));
    }

    #[test]
    fn test_no_target_and_no_interfaces_fails() {
        let advised = Arc::new(AdvisedSupport::new());
        let Err(err) = DefaultAopProxyFactory.create_aop_proxy(advised) else {
            panic!("proxy creation must fail without a target or interfaces");
        };
        assert!(matches!(err, AopError::ProxyCreation(_)));
    }

    #[test]
    fn test_opaque_hides_configuration_introspection() {
        let advised = advised_for(TestService::plain());
        advised.set_opaque(true);

        let proxy = DefaultAopProxyFactory
            .create_aop_proxy(advised)
            .unwrap()
            .proxy()
            .unwrap();
        assert!(proxy.advised().is_none());
    }

    #[test]
    fn test_target_released_when_chain_resolution_fails() {
        use crate::advice::DynamicIntroductionAdvice;
        use crate::advisor::{Advisor, PointcutAdvisor};
        use crate::advice::Advice;
        use crate::target_source::TargetSource;
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Pooling {
            target: Arc<dyn Reflective>,
            class: ClassRef,
            released: Arc<AtomicUsize>,
        }

        impl TargetSource for Pooling {
            fn target_class(&self) -> Option<&ClassRef> {
                Some(&self.class)
            }

            fn is_static(&self) -> bool {
                false
            }

            fn get_target(&self) -> crate::error::AopResult<Option<Arc<dyn Reflective>>> {
                Ok(Some(self.target.clone()))
            }

            fn release_target(&self, _target: Arc<dyn Reflective>) {
                self.released.fetch_add(1, Ordering::SeqCst);
            }
        }

        struct Opaque;
        impl DynamicIntroductionAdvice for Opaque {
            fn implements_interface(&self, _iface: &InterfaceRef) -> bool {
                true
            }
        }

        let target = TestService::plain();
        let released = Arc::new(AtomicUsize::new(0));
        let advised = Arc::new(AdvisedSupport::new());
        advised
            .set_target_source(Some(Arc::new(Pooling {
                class: target.class().clone(),
                target,
                released: released.clone(),
            })))
            .unwrap();
        // 动态引入通知无法被适配成拦截器，链解析必然失败
        advised
            .add_advisor(Advisor::Pointcut(PointcutAdvisor::always(
                Advice::DynamicIntroduction(Arc::new(Opaque)),
            )))
            .unwrap();

        let proxy = DefaultAopProxyFactory
            .create_aop_proxy(advised)
            .unwrap()
            .proxy()
            .unwrap();
        let result = proxy.invoke(&ClassRef::new("TestService").method("greet"), Vec::new());

        assert!(result.is_err());
        // 已取得的目标在失败路径上同样被归还
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_structural_proxy_equality() {
        let advised = advised_for(TestService::plain());
        advised
            .add_interface(TestService::greeter_interface())
            .unwrap();

        let factory = DefaultAopProxyFactory;
        let a = factory
            .create_aop_proxy(advised.clone())
            .unwrap()
            .proxy()
            .unwrap();
        let b = factory.create_aop_proxy(advised).unwrap().proxy().unwrap();

        // 同一配置生成的两个代理结构化相等
        assert!(a.proxy_equals(&b));

        let other = advised_for(TestService::plain());
        other
            .add_interface(TestService::greeter_interface())
            .unwrap();
        let c = factory.create_aop_proxy(other).unwrap().proxy().unwrap();
        assert!(!a.proxy_equals(&c));
    }
}
