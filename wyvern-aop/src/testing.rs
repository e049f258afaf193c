//! 测试夹具
//!
//! 供各模块的单元测试共享的目标对象与记录型拦截器

use crate::advice::{MethodInterceptor, MethodInvocation};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wyvern_core::reflect::{AnyValue, Args, ClassRef, InterfaceRef, MethodRef, Reflective};

/// 事件日志
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// 实现 Greeter 接口的测试目标
///
/// `greet` 返回 "hello"，`farewell` 返回 "bye"，其余方法报错
pub struct TestService {
    class: ClassRef,
    events: Option<EventLog>,
    calls: AtomicUsize,
}

impl TestService {
    pub fn greeter_interface() -> InterfaceRef {
        InterfaceRef::with_methods("Greeter", &["greet", "farewell"])
    }

    fn build(events: Option<EventLog>) -> Arc<dyn Reflective> {
        Arc::new(Self {
            class: ClassRef::implementing("TestService", vec![Self::greeter_interface()]),
            events,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn plain() -> Arc<dyn Reflective> {
        Self::build(None)
    }

    pub fn with_events(events: EventLog) -> Arc<dyn Reflective> {
        Self::build(Some(events))
    }

    /// 不可子类化的测试目标
    pub fn final_target() -> Arc<dyn Reflective> {
        Arc::new(Self {
            class: ClassRef::new("SealedService").finalized(),
            events: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// 不实现任何接口的测试目标
    pub fn interfaceless() -> Arc<dyn Reflective> {
        Arc::new(Self {
            class: ClassRef::new("PlainService"),
            events: None,
            calls: AtomicUsize::new(0),
        })
    }
}

impl Reflective for TestService {
    fn class(&self) -> &ClassRef {
        &self.class
    }

    fn invoke(&self, method: &MethodRef, _args: Args) -> anyhow::Result<AnyValue> {
        if let Some(events) = &self.events {
            events.lock().unwrap().push(format!("target:{}", method.name));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        match method.name.as_str() {
            "greet" => Ok(Arc::new("hello".to_string())),
            "farewell" => Ok(Arc::new("bye".to_string())),
            "boom" => anyhow::bail!("boom"),
            other => anyhow::bail!("no such method: {}", other),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 记录进入/退出顺序并计数的拦截器
pub struct RecordingInterceptor {
    name: &'static str,
    events: EventLog,
    count: AtomicUsize,
}

impl RecordingInterceptor {
    pub fn new(name: &'static str, events: EventLog) -> Self {
        Self {
            name,
            events,
            count: AtomicUsize::new(0),
        }
    }

    /// before + after 的累计次数
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl MethodInterceptor for RecordingInterceptor {
    fn invoke(&self, invocation: &mut dyn MethodInvocation) -> anyhow::Result<AnyValue> {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:before", self.name));
        self.count.fetch_add(1, Ordering::SeqCst);

        let result = invocation.proceed();

        self.events
            .lock()
            .unwrap()
            .push(format!("{}:after", self.name));
        self.count.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// 把调用结果读取为字符串
pub fn as_string(value: &AnyValue) -> String {
    value
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_else(|| "<not a string>".to_string())
}
