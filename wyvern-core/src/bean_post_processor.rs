//! BeanPostProcessor - Bean 工厂扩展机制
//!
//! 提供在 Bean 初始化前后进行自定义处理的钩子，类似 Spring 的 BeanPostProcessor
//!
//! 使用场景：
//! - AOP 代理创建
//! - Bean 包装
//! - 验证等

use crate::error::ContainerResult;
use crate::reflect::Reflective;
use std::sync::Arc;

/// BeanPostProcessor trait
///
/// 在 Bean 初始化的不同阶段提供钩子，允许自定义替换或包装 Bean 实例。
/// Bean 以 `Arc<dyn Reflective>` 形式流转，处理器可以原样返回，
/// 也可以返回一个包装后的新对象（例如 AOP 代理）。
pub trait BeanPostProcessor: Send + Sync {
    /// 处理器名称
    fn name(&self) -> &str;

    /// 执行顺序，数值越小越先执行
    fn order(&self) -> i32 {
        0
    }

    /// 在 Bean 初始化回调之前调用
    fn post_process_before_initialization(
        &self,
        bean: Arc<dyn Reflective>,
        _bean_name: &str,
    ) -> ContainerResult<Arc<dyn Reflective>> {
        Ok(bean)
    }

    /// 在 Bean 初始化回调之后调用
    ///
    /// 返回处理后的 Bean 实例（可以是原始 Bean，也可以是包装后的 Bean）
    fn post_process_after_initialization(
        &self,
        bean: Arc<dyn Reflective>,
        _bean_name: &str,
    ) -> ContainerResult<Arc<dyn Reflective>> {
        Ok(bean)
    }
}

/// 按 order 依次应用所有处理器的 after-initialization 钩子
pub fn apply_post_processors(
    processors: &[Arc<dyn BeanPostProcessor>],
    bean: Arc<dyn Reflective>,
    bean_name: &str,
) -> ContainerResult<Arc<dyn Reflective>> {
    let mut ordered: Vec<&Arc<dyn BeanPostProcessor>> = processors.iter().collect();
    ordered.sort_by_key(|p| p.order());

    let mut current = bean;
    for processor in ordered {
        tracing::trace!(
            "Applying post-processor '{}' to bean '{}'",
            processor.name(),
            bean_name
        );
        current = processor.post_process_after_initialization(current, bean_name)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{AnyValue, Args, ClassRef, MethodRef};
    use std::any::Any;
    use std::sync::Mutex;

    struct Dummy {
        class: ClassRef,
    }

    impl Reflective for Dummy {
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

    struct Recording {
        label: &'static str,
        order: i32,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl BeanPostProcessor for Recording {
        fn name(&self) -> &str {
            self.label
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn post_process_after_initialization(
            &self,
            bean: Arc<dyn Reflective>,
            _bean_name: &str,
        ) -> ContainerResult<Arc<dyn Reflective>> {
            self.log.lock().unwrap().push(self.label);
            Ok(bean)
        }
    }

    #[test]
    fn test_processors_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let processors: Vec<Arc<dyn BeanPostProcessor>> = vec![
            Arc::new(Recording {
                label: "late",
                order: 2000,
                log: log.clone(),
            }),
            Arc::new(Recording {
                label: "early",
                order: 0,
                log: log.clone(),
            }),
        ];

        let bean = Arc::new(Dummy {
            class: ClassRef::new("Dummy"),
        });
        apply_post_processors(&processors, bean, "dummy").unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["early", "late"]);
    }
}
