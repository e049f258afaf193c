//! 切点（Pointcut）表达式系统
//!
//! 切点是 (类, 方法) 上的适用性谓词，分为两部分：
//! - `ClassFilter`：类级过滤，决定通知是否可能作用于某个目标类
//! - `MethodMatcher`：方法级匹配，分为静态可求值与需要运行时参数的动态匹配

use crate::error::{AopError, AopResult};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use wyvern_core::reflect::{Args, ClassRef, MethodRef};

/// 简单的模式匹配（支持 * 通配符）
///
/// 支持的模式：
/// - `*` - 匹配任意字符串
/// - `User*` - 以 User 开头
/// - `*Service` - 以 Service 结尾
/// - `*Service*` - 包含 Service
pub(crate) fn pattern_matches(pattern: &str, target: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if !pattern.contains('*') {
        return pattern == target;
    }

    let regex_pattern = format!("^{}$", pattern.replace('*', ".*"));
    match Regex::new(&regex_pattern) {
        Ok(regex) => regex.is_match(target),
        Err(_) => false,
    }
}

/// 类级过滤器
#[derive(Clone)]
pub enum ClassFilter {
    /// 匹配所有类
    All,

    /// 按名称模式匹配（支持 * 通配符）
    TypePattern(String),

    /// 按正则表达式匹配
    TypeRegex(Regex),

    /// 自定义匹配函数
    Custom(Arc<dyn Fn(&ClassRef) -> bool + Send + Sync>),
}

impl ClassFilter {
    /// 检查目标类是否匹配
    ///
    /// 无目标类（target class 为 None）时，需要具体类信息的过滤器
    /// 一律视为不匹配，而不是报错
    pub fn matches(&self, class: Option<&ClassRef>) -> bool {
        match (self, class) {
            (ClassFilter::All, _) => true,
            (_, None) => false,
            (ClassFilter::TypePattern(pattern), Some(c)) => pattern_matches(pattern, &c.name),
            (ClassFilter::TypeRegex(regex), Some(c)) => regex.is_match(&c.name),
            (ClassFilter::Custom(func), Some(c)) => func(c),
        }
    }
}

impl fmt::Debug for ClassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassFilter::All => write!(f, "All"),
            ClassFilter::TypePattern(p) => write!(f, "TypePattern({})", p),
            ClassFilter::TypeRegex(_) => write!(f, "TypeRegex(...)"),
            ClassFilter::Custom(_) => write!(f, "Custom(...)"),
        }
    }
}

/// 静态方法匹配模式
///
/// 仅依赖 (方法, 类) 即可求值，不需要运行时参数
#[derive(Clone)]
pub enum MethodPattern {
    /// 匹配所有方法
    All,

    /// 按方法名模式匹配（支持 * 通配符）
    Name(String),

    /// 按正则表达式匹配方法名
    NameRegex(Regex),

    /// 自定义匹配函数
    Custom(Arc<dyn Fn(&MethodRef) -> bool + Send + Sync>),

    /// 与运算（AND）
    And(Box<MethodPattern>, Box<MethodPattern>),

    /// 或运算（OR）
    Or(Box<MethodPattern>, Box<MethodPattern>),

    /// 非运算（NOT）
    Not(Box<MethodPattern>),
}

impl MethodPattern {
    /// 检查方法是否匹配
    pub fn matches(&self, method: &MethodRef) -> bool {
        match self {
            MethodPattern::All => true,
            MethodPattern::Name(pattern) => pattern_matches(pattern, &method.name),
            MethodPattern::NameRegex(regex) => regex.is_match(&method.name),
            MethodPattern::Custom(func) => func(method),
            MethodPattern::And(left, right) => left.matches(method) && right.matches(method),
            MethodPattern::Or(left, right) => left.matches(method) || right.matches(method),
            MethodPattern::Not(expr) => !expr.matches(method),
        }
    }

    /// 与运算
    pub fn and(self, other: MethodPattern) -> Self {
        MethodPattern::And(Box::new(self), Box::new(other))
    }

    /// 或运算
    pub fn or(self, other: MethodPattern) -> Self {
        MethodPattern::Or(Box::new(self), Box::new(other))
    }

    /// 非运算
    pub fn not(self) -> Self {
        MethodPattern::Not(Box::new(self))
    }
}

impl fmt::Debug for MethodPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodPattern::All => write!(f, "All"),
            MethodPattern::Name(p) => write!(f, "Name({})", p),
            MethodPattern::NameRegex(_) => write!(f, "NameRegex(...)"),
            MethodPattern::Custom(_) => write!(f, "Custom(...)"),
            MethodPattern::And(l, r) => write!(f, "And({:?}, {:?})", l, r),
            MethodPattern::Or(l, r) => write!(f, "Or({:?}, {:?})", l, r),
            MethodPattern::Not(e) => write!(f, "Not({:?})", e),
        }
    }
}

/// 运行时方法匹配器
///
/// 在每次实际调用时，结合调用参数做最终裁决
pub trait RuntimeMethodMatcher: Send + Sync {
    fn matches(&self, method: &MethodRef, class: Option<&ClassRef>, args: &Args) -> bool;
}

/// 方法匹配器
///
/// 静态匹配器在链构建时一次性求值；动态匹配器的静态部分在链构建时
/// 求值，运行时部分被推迟到每次实际调用
#[derive(Clone)]
pub enum MethodMatcher {
    /// 静态可求值
    Static(MethodPattern),

    /// 需要运行时参数参与裁决
    Dynamic {
        static_part: MethodPattern,
        runtime: Arc<dyn RuntimeMethodMatcher>,
    },
}

impl MethodMatcher {
    /// 是否需要运行时求值
    pub fn is_runtime(&self) -> bool {
        matches!(self, MethodMatcher::Dynamic { .. })
    }

    /// 仅对静态部分求值
    pub fn matches_statically(&self, method: &MethodRef) -> bool {
        match self {
            MethodMatcher::Static(pattern) => pattern.matches(method),
            MethodMatcher::Dynamic { static_part, .. } => static_part.matches(method),
        }
    }
}

impl fmt::Debug for MethodMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodMatcher::Static(p) => write!(f, "Static({:?})", p),
            MethodMatcher::Dynamic { static_part, .. } => {
                write!(f, "Dynamic({:?}, ...)", static_part)
            }
        }
    }
}

/// 切点：类级过滤器 + 方法匹配器
#[derive(Debug, Clone)]
pub struct Pointcut {
    pub class_filter: ClassFilter,
    pub method_matcher: MethodMatcher,
}

impl Pointcut {
    pub fn new(class_filter: ClassFilter, method_matcher: MethodMatcher) -> Self {
        Self {
            class_filter,
            method_matcher,
        }
    }

    /// 恒真切点：匹配任意类的任意方法
    pub fn truthy() -> Self {
        Self {
            class_filter: ClassFilter::All,
            method_matcher: MethodMatcher::Static(MethodPattern::All),
        }
    }

    /// 创建 execution 风格的切点
    ///
    /// 例如：`Pointcut::execution("UserService", "get_*")`
    pub fn execution(type_pattern: impl Into<String>, method_pattern: impl Into<String>) -> Self {
        Self {
            class_filter: ClassFilter::TypePattern(type_pattern.into()),
            method_matcher: MethodMatcher::Static(MethodPattern::Name(method_pattern.into())),
        }
    }

    /// 用正则表达式创建类型过滤器
    pub fn type_regex(pattern: &str) -> AopResult<ClassFilter> {
        let regex = Regex::new(pattern)
            .map_err(|e| AopError::InvalidArgument(format!("bad type regex '{}': {}", pattern, e)))?;
        Ok(ClassFilter::TypeRegex(regex))
    }
}
