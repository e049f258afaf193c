//! 代理配置标志
//!
//! 扁平的、可序列化的配置值对象，除拷贝/比较外不包含任何逻辑

use serde::{Deserialize, Serialize};

/// 代理创建的基础配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// 是否代理具体类而不是仅代理接口
    proxy_target_class: bool,

    /// 是否允许激进优化（可能禁用运行时的通知变更）
    optimize: bool,

    /// 为 true 时，生成的代理不暴露配置自省入口
    opaque: bool,

    /// 为 true 时，调用期间把代理自身放入调用上下文，
    /// 使自调用也能被再次通知
    expose_proxy: bool,

    /// 为 true 时，禁止一切结构性变更
    frozen: bool,
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_proxy_target_class(&mut self, flag: bool) {
        self.proxy_target_class = flag;
    }

    pub fn is_proxy_target_class(&self) -> bool {
        self.proxy_target_class
    }

    pub fn set_optimize(&mut self, flag: bool) {
        self.optimize = flag;
    }

    pub fn is_optimize(&self) -> bool {
        self.optimize
    }

    pub fn set_opaque(&mut self, flag: bool) {
        self.opaque = flag;
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn set_expose_proxy(&mut self, flag: bool) {
        self.expose_proxy = flag;
    }

    pub fn is_expose_proxy(&self) -> bool {
        self.expose_proxy
    }

    pub fn set_frozen(&mut self, flag: bool) {
        self.frozen = flag;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// 从另一份配置拷贝全部标志
    pub fn copy_from(&mut self, other: &ProxyConfig) {
        *self = other.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::new();
        assert!(!config.is_proxy_target_class());
        assert!(!config.is_optimize());
        assert!(!config.is_opaque());
        assert!(!config.is_expose_proxy());
        assert!(!config.is_frozen());
    }

    #[test]
    fn test_copy_from() {
        let mut a = ProxyConfig::new();
        a.set_proxy_target_class(true);
        a.set_expose_proxy(true);
        a.set_frozen(true);

        let mut b = ProxyConfig::new();
        b.copy_from(&a);

        assert_eq!(a, b);
    }
}
