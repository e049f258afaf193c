//! 切面（Advisor）定义
//!
//! 切面是切点与通知的配对。封闭的 `Advisor` 和类型区分普通切面
//! 与引入切面，链构建处据此做穷尽匹配。

use crate::advice::{Advice, IntroductionInterceptor};
use crate::error::{AopError, AopResult};
use crate::pointcut::{ClassFilter, Pointcut};
use std::fmt;
use std::sync::Arc;
use wyvern_core::reflect::InterfaceRef;

/// 普通切面：切点 + 通知
#[derive(Debug, Clone)]
pub struct PointcutAdvisor {
    pointcut: Pointcut,
    advice: Advice,
}

impl PointcutAdvisor {
    pub fn new(pointcut: Pointcut, advice: Advice) -> Self {
        Self { pointcut, advice }
    }

    /// 恒真切点的便捷构造
    pub fn always(advice: Advice) -> Self {
        Self {
            pointcut: Pointcut::truthy(),
            advice,
        }
    }

    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    pub fn advice(&self) -> &Advice {
        &self.advice
    }
}

/// 引入切面
///
/// 使代理额外实现目标上不存在的接口；其通知只作用于
/// 引入接口声明的方法
#[derive(Clone)]
pub struct IntroductionAdvisor {
    class_filter: ClassFilter,
    interfaces: Vec<InterfaceRef>,
    advice: Advice,
}

impl IntroductionAdvisor {
    /// 从自描述引入通知创建，接口列表取自通知自身的元数据
    pub fn new(advice: Arc<dyn IntroductionInterceptor>) -> Self {
        let interfaces = advice.interfaces();
        Self {
            class_filter: ClassFilter::All,
            interfaces,
            advice: Advice::Introduction(advice),
        }
    }

    /// 覆盖引入的接口列表
    pub fn with_interfaces(mut self, interfaces: Vec<InterfaceRef>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// 限制引入作用的目标类
    pub fn with_class_filter(mut self, filter: ClassFilter) -> Self {
        self.class_filter = filter;
        self
    }

    pub fn class_filter(&self) -> &ClassFilter {
        &self.class_filter
    }

    pub fn interfaces(&self) -> &[InterfaceRef] {
        &self.interfaces
    }

    pub fn advice(&self) -> &Advice {
        &self.advice
    }

    /// 校验声明的每个接口都能由通知真实支撑
    ///
    /// 在任何状态变更之前调用；失败时不得留下部分生效的状态
    pub fn validate_interfaces(&self) -> AopResult<()> {
        for iface in &self.interfaces {
            let supported = match &self.advice {
                Advice::Introduction(advice) => advice.implements_interface(iface),
                Advice::DynamicIntroduction(advice) => advice.implements_interface(iface),
                other => {
                    return Err(AopError::IntroductionValidation(format!(
                        "advice of kind '{}' cannot introduce interfaces",
                        other.kind()
                    )))
                }
            };
            if !supported {
                return Err(AopError::IntroductionValidation(format!(
                    "advice does not implement declared interface '{}'",
                    iface
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for IntroductionAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntroductionAdvisor")
            .field("class_filter", &self.class_filter)
            .field("interfaces", &self.interfaces)
            .field("advice", &self.advice)
            .finish()
    }
}

/// 切面的封闭和类型
#[derive(Debug, Clone)]
pub enum Advisor {
    /// 普通切面
    Pointcut(PointcutAdvisor),

    /// 引入切面
    Introduction(IntroductionAdvisor),
}

impl Advisor {
    /// 切面携带的通知
    pub fn advice(&self) -> &Advice {
        match self {
            Advisor::Pointcut(advisor) => advisor.advice(),
            Advisor::Introduction(advisor) => advisor.advice(),
        }
    }

    /// 类级过滤器
    pub fn class_filter(&self) -> &ClassFilter {
        match self {
            Advisor::Pointcut(advisor) => &advisor.pointcut().class_filter,
            Advisor::Introduction(advisor) => advisor.class_filter(),
        }
    }
}
