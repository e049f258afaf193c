//! 反射替身层
//!
//! Rust 没有运行时反射，这里用值语义的描述符替代 Class/Method 身份：
//! - `ClassRef` / `InterfaceRef` / `MethodRef` 描述类型结构，按值比较
//! - `Reflective` 是动态调用面，目标对象和代理都实现它
//!
//! `MethodRef` 的相等性由（声明类型，方法名，参数签名）三元组决定，
//! 因此同名不同类的方法不会被混淆，可以安全地作为缓存键。

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 框架内流转的通用值类型
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// 方法调用参数
pub type Args = Vec<AnyValue>;

/// 方法描述符
///
/// 值语义的方法身份，用作方法缓存的键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// 声明该方法的类型名称
    pub declaring_type: String,

    /// 方法名称
    pub name: String,

    /// 擦除后的参数类型签名
    pub params: Vec<String>,
}

impl MethodRef {
    /// 创建无参方法描述符
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// 设置参数类型签名
    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.params = params.iter().map(|p| (*p).to_string()).collect();
        self
    }

    /// 获取完整的方法签名
    pub fn signature(&self) -> String {
        format!(
            "{}::{}({})",
            self.declaring_type,
            self.name,
            self.params.join(", ")
        )
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// 接口描述符
///
/// 按名称比较；`methods` 列出接口声明的方法名，
/// 用于判断某个方法是否属于该接口
#[derive(Debug, Clone)]
pub struct InterfaceRef {
    /// 接口名称
    pub name: String,

    /// 接口声明的方法名
    pub methods: Vec<String>,
}

impl InterfaceRef {
    /// 创建接口描述符
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// 创建带方法列表的接口描述符
    pub fn with_methods(name: impl Into<String>, methods: &[&str]) -> Self {
        Self {
            name: name.into(),
            methods: methods.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    /// 判断方法是否由该接口声明
    pub fn declares(&self, method: &MethodRef) -> bool {
        method.declaring_type == self.name || self.methods.iter().any(|m| *m == method.name)
    }
}

impl PartialEq for InterfaceRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for InterfaceRef {}

impl Hash for InterfaceRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for InterfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// 类描述符
///
/// 按名称比较；记录类实现的接口和是否允许子类化
#[derive(Debug, Clone)]
pub struct ClassRef {
    /// 类名称
    pub name: String,

    /// 是否禁止子类化
    pub is_final: bool,

    /// 类实现的接口
    pub interfaces: Vec<InterfaceRef>,
}

impl ClassRef {
    /// 创建类描述符
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_final: false,
            interfaces: Vec::new(),
        }
    }

    /// 创建实现指定接口的类描述符
    pub fn implementing(name: impl Into<String>, interfaces: Vec<InterfaceRef>) -> Self {
        Self {
            name: name.into(),
            is_final: false,
            interfaces,
        }
    }

    /// 标记为 final（禁止子类化）
    pub fn finalized(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// 判断是否实现指定接口
    pub fn implements(&self, iface: &InterfaceRef) -> bool {
        self.interfaces.iter().any(|i| i == iface)
    }

    /// 构造属于该类的方法描述符
    pub fn method(&self, name: impl Into<String>) -> MethodRef {
        MethodRef::new(self.name.clone(), name)
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// 动态调用面
///
/// 目标对象通过实现此 trait 暴露可拦截的方法调用入口；
/// AOP 代理同样实现它，因此代理本身也可以再次被通知或后置处理
pub trait Reflective: Send + Sync {
    /// 获取对象的类描述符
    fn class(&self) -> &ClassRef;

    /// 按方法描述符调用对象
    fn invoke(&self, method: &MethodRef, args: Args) -> anyhow::Result<AnyValue>;

    /// 向下转型入口
    fn as_any(&self) -> &dyn Any;
}
