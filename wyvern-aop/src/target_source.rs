//! 目标源（TargetSource）
//!
//! 对"如何获得被通知对象"的抽象：单例、按调用获取/释放、
//! 或者没有目标（行为完全由通知提供）

use crate::error::AopResult;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;
use wyvern_core::reflect::{ClassRef, Reflective};

/// 目标源
pub trait TargetSource: Send + Sync {
    /// 目标的类；没有目标时为 None
    fn target_class(&self) -> Option<&ClassRef>;

    /// 每次调用是否返回同一个目标
    ///
    /// 为 true 时调用方可以缓存目标，且无需调用 `release_target`
    fn is_static(&self) -> bool;

    /// 获取一个目标实例
    fn get_target(&self) -> AopResult<Option<Arc<dyn Reflective>>>;

    /// 归还目标实例（非静态目标源在每次调用结束后归还）
    fn release_target(&self, _target: Arc<dyn Reflective>) {}

    /// 描述（用于日志）
    fn describe(&self) -> String {
        match self.target_class() {
            Some(class) => format!("TargetSource({})", class),
            None => "TargetSource(<none>)".to_string(),
        }
    }
}

impl fmt::Debug for dyn TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// 单例目标源：始终返回同一个对象
pub struct SingletonTargetSource {
    target: Arc<dyn Reflective>,
    class: ClassRef,
}

impl SingletonTargetSource {
    pub fn new(target: Arc<dyn Reflective>) -> Self {
        let class = target.class().clone();
        Self { target, class }
    }
}

impl TargetSource for SingletonTargetSource {
    fn target_class(&self) -> Option<&ClassRef> {
        Some(&self.class)
    }

    fn is_static(&self) -> bool {
        true
    }

    fn get_target(&self) -> AopResult<Option<Arc<dyn Reflective>>> {
        Ok(Some(self.target.clone()))
    }
}

/// 空目标源 — "没有目标，行为完全由通知提供"的规范表示
pub struct EmptyTargetSource;

static EMPTY: Lazy<Arc<EmptyTargetSource>> = Lazy::new(|| Arc::new(EmptyTargetSource));

impl EmptyTargetSource {
    /// 共享的规范实例
    pub fn shared() -> Arc<dyn TargetSource> {
        EMPTY.clone()
    }
}

impl TargetSource for EmptyTargetSource {
    fn target_class(&self) -> Option<&ClassRef> {
        None
    }

    fn is_static(&self) -> bool {
        true
    }

    fn get_target(&self) -> AopResult<Option<Arc<dyn Reflective>>> {
        Ok(None)
    }
}

/// 仅携带类信息的目标源
///
/// 配置快照用它替换真实目标：保留目标类与是否静态，
/// 但不再暴露可变的目标对象
pub struct ClassOnlyTargetSource {
    class: ClassRef,
    static_target: bool,
}

impl ClassOnlyTargetSource {
    pub fn new(class: ClassRef, static_target: bool) -> Self {
        Self {
            class,
            static_target,
        }
    }
}

impl TargetSource for ClassOnlyTargetSource {
    fn target_class(&self) -> Option<&ClassRef> {
        Some(&self.class)
    }

    fn is_static(&self) -> bool {
        self.static_target
    }

    fn get_target(&self) -> AopResult<Option<Arc<dyn Reflective>>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use wyvern_core::reflect::{AnyValue, Args, MethodRef};

    struct Probe {
        class: ClassRef,
    }

    impl Reflective for Probe {
        fn class(&self) -> &ClassRef {
            &self.class
        }

        fn invoke(&self, method: &MethodRef, _args: Args) -> anyhow::Result<AnyValue> {
            anyhow::bail!("no such method: {}", method)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_singleton_target_source() {
        let target: Arc<dyn Reflective> = Arc::new(Probe {
            class: ClassRef::new("Probe"),
        });
        let source = SingletonTargetSource::new(target.clone());

        assert!(source.is_static());
        assert_eq!(source.target_class().unwrap().name, "Probe");

        let obtained = source.get_target().unwrap().unwrap();
        assert!(Arc::ptr_eq(&obtained, &target));
        source.release_target(obtained);
    }

    #[test]
    fn test_empty_target_source_is_shared() {
        let a = EmptyTargetSource::shared();
        let b = EmptyTargetSource::shared();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.target_class().is_none());
        assert!(a.get_target().unwrap().is_none());
    }

    #[test]
    fn test_class_only_target_source() {
        let source = ClassOnlyTargetSource::new(ClassRef::new("Probe"), true);
        assert!(source.is_static());
        assert_eq!(source.target_class().unwrap().name, "Probe");
        assert!(source.get_target().unwrap().is_none());
    }
}
