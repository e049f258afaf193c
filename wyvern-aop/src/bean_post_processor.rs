//! 把单个切面应用到容器 Bean 的后置处理器
//!
//! 对已经是代理的 Bean，把切面拼接进现有配置而不是再包一层；
//! 对普通 Bean，按类过滤器判定是否合格，合格则包装为代理。

use crate::advisor::Advisor;
use crate::proxy::Proxy;
use crate::proxy_config::ProxyConfig;
use crate::proxy_factory::ProxyFactory;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use wyvern_core::bean_post_processor::BeanPostProcessor;
use wyvern_core::error::{ContainerError, ContainerResult};
use wyvern_core::reflect::{ClassRef, Reflective};

/// 应用单个切面的后置处理器
pub struct AdvisingBeanPostProcessor {
    advisor: Arc<Advisor>,
    before_existing_advisors: bool,
    proxy_config: ProxyConfig,
    eligible: RwLock<HashMap<String, bool>>,
    order: i32,
}

impl AdvisingBeanPostProcessor {
    pub fn new(advisor: Advisor) -> Self {
        Self {
            advisor: Arc::new(advisor),
            before_existing_advisors: false,
            proxy_config: ProxyConfig::default(),
            eligible: RwLock::new(HashMap::new()),
            order: 2000,
        }
    }

    /// 拼接进已有代理时置于链首而非链尾
    pub fn set_before_existing_advisors(&mut self, flag: bool) {
        self.before_existing_advisors = flag;
    }

    /// 新建代理时套用的标志模板
    pub fn set_proxy_config(&mut self, config: ProxyConfig) {
        self.proxy_config = config;
    }

    pub fn set_order(&mut self, order: i32) {
        self.order = order;
    }

    /// 类过滤器判定，按类名缓存
    fn is_eligible(&self, class: &ClassRef) -> bool {
        if let Some(&cached) = self.eligible.read().get(&class.name) {
            return cached;
        }
        let matched = self.advisor.class_filter().matches(Some(class));
        self.eligible.write().insert(class.name.clone(), matched);
        matched
    }

    fn failure(bean_name: &str, err: crate::error::AopError) -> ContainerError {
        ContainerError::PostProcessing {
            bean_name: bean_name.to_string(),
            reason: err.to_string(),
        }
    }
}

impl BeanPostProcessor for AdvisingBeanPostProcessor {
    fn name(&self) -> &str {
        "AdvisingBeanPostProcessor"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn post_process_after_initialization(
        &self,
        bean: Arc<dyn Reflective>,
        bean_name: &str,
    ) -> ContainerResult<Arc<dyn Reflective>> {
        // 已有代理：拼接切面，保持 Bean 身份不变
        if let Some(proxy) = bean.as_any().downcast_ref::<Proxy>() {
            if let Some(advised) = proxy.advised() {
                if !advised.is_frozen()
                    && advised
                        .target_class()
                        .map(|c| self.is_eligible(&c))
                        .unwrap_or(false)
                {
                    let advisor = (*self.advisor).clone();
                    let result = if self.before_existing_advisors {
                        advised.add_advisor_at(0, advisor)
                    } else {
                        advised.add_advisor(advisor)
                    };
                    result.map_err(|e| Self::failure(bean_name, e))?;
                    tracing::debug!("Spliced advisor into existing proxy '{}'", bean_name);
                    return Ok(bean);
                }
            }
            return Ok(bean);
        }

        // 普通 Bean：合格则包装
        if self.is_eligible(bean.class()) {
            let factory = ProxyFactory::for_target(bean.clone())
                .map_err(|e| Self::failure(bean_name, e))?;
            factory.advised().copy_proxy_config(&self.proxy_config);
            factory
                .add_advisor((*self.advisor).clone())
                .map_err(|e| Self::failure(bean_name, e))?;
            let proxy = factory
                .get_proxy()
                .map_err(|e| Self::failure(bean_name, e))?;
            tracing::debug!("Wrapped bean '{}' in advising proxy", bean_name);
            return Ok(proxy);
        }

        Ok(bean)
    }
}
