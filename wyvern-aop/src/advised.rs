//! 代理配置的中心数据结构
//!
//! `AdvisedSupport` 持有有序的切面列表、被代理接口列表、目标源和
//! 方法到拦截器链的缓存；所有结构性变更都带不变量检查，并通过
//! 单一的 "advice changed" 通知点使缓存失效。
//!
//! 并发模型：结构性变更在内部写锁下串行化；每次变更递增代数计数器，
//! 链缓存条目记录计算时的代数，过期条目按未命中处理。同一个配置
//! 可以被多个存活代理并发读取，未冻结时仍可在运行期增删通知。

use crate::advisor::{Advisor, IntroductionAdvisor, PointcutAdvisor};
use crate::advice::Advice;
use crate::chain::{AdvisorChainFactory, ChainEntry, DefaultAdvisorChainFactory};
use crate::error::{AopError, AopResult};
use crate::proxy_config::ProxyConfig;
use crate::target_source::{
    ClassOnlyTargetSource, EmptyTargetSource, SingletonTargetSource, TargetSource,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wyvern_core::reflect::{ClassRef, InterfaceRef, MethodRef, Reflective};

/// 配置自省契约
///
/// 任何代理配置必须暴露的只读视图；`opaque` 的代理不暴露它
pub trait Advised: Send + Sync {
    /// 配置是否已冻结
    fn is_frozen(&self) -> bool;

    /// 是否按具体类代理
    fn is_proxy_target_class(&self) -> bool;

    /// 被代理接口的快照
    fn proxied_interfaces(&self) -> Vec<InterfaceRef>;

    /// 指定接口是否被代理
    fn is_interface_proxied(&self, iface: &InterfaceRef) -> bool;

    /// 切面列表的独立快照（永远不是内部活动列表）
    fn advisors(&self) -> Vec<Arc<Advisor>>;

    /// 切面数量
    fn advisor_count(&self) -> usize;
}

/// 切面与接口的共享状态
///
/// 配置快照（configuration-only copy）与源配置共享同一份状态
struct AdvisedState {
    /// 有序的切面列表；插入顺序即拦截顺序
    advisors: Vec<Arc<Advisor>>,

    /// 有序且唯一的被代理接口列表；插入顺序决定代理声明接口的顺序
    interfaces: Vec<InterfaceRef>,

    /// 显式（而非经引入切面）加入的接口，用于级联移除时的引用裁决
    explicit_interfaces: HashSet<InterfaceRef>,

    /// 结构代数；每次结构性变更递增
    generation: u64,
}

/// 带代数标记的缓存链
struct CachedChain {
    generation: u64,
    chain: Arc<Vec<ChainEntry>>,
}

/// 代理配置与链解析宿主
pub struct AdvisedSupport {
    /// 基础标志
    config: RwLock<ProxyConfig>,

    /// 列表中的切面是否已按目标类预过滤
    pre_filtered: AtomicBool,

    /// 目标源；未设置时为规范的空目标源
    target_source: RwLock<Arc<dyn TargetSource>>,

    /// 切面与接口状态（可与配置快照共享）
    state: Arc<RwLock<AdvisedState>>,

    /// 方法 → 拦截器链缓存
    method_cache: RwLock<HashMap<MethodRef, CachedChain>>,

    /// 链构建策略
    chain_factory: RwLock<Arc<dyn AdvisorChainFactory>>,
}

impl AdvisedSupport {
    /// 创建空配置
    pub fn new() -> Self {
        Self::with_chain_factory(Arc::new(DefaultAdvisorChainFactory::default()))
    }

    /// 使用指定的链构建策略创建
    pub fn with_chain_factory(chain_factory: Arc<dyn AdvisorChainFactory>) -> Self {
        Self {
            config: RwLock::new(ProxyConfig::new()),
            pre_filtered: AtomicBool::new(false),
            target_source: RwLock::new(EmptyTargetSource::shared()),
            state: Arc::new(RwLock::new(AdvisedState {
                advisors: Vec::new(),
                interfaces: Vec::new(),
                explicit_interfaces: HashSet::new(),
                generation: 0,
            })),
            method_cache: RwLock::new(HashMap::new()),
            chain_factory: RwLock::new(chain_factory),
        }
    }

    // ------------------------------------------------------------------
    // 标志
    // ------------------------------------------------------------------

    /// 当前标志的快照
    pub fn proxy_config(&self) -> ProxyConfig {
        self.config.read().clone()
    }

    /// 从模板拷贝全部标志
    pub fn copy_proxy_config(&self, template: &ProxyConfig) {
        self.config.write().copy_from(template);
    }

    pub fn set_proxy_target_class(&self, flag: bool) {
        self.config.write().set_proxy_target_class(flag);
    }

    pub fn is_proxy_target_class(&self) -> bool {
        self.config.read().is_proxy_target_class()
    }

    pub fn set_optimize(&self, flag: bool) {
        self.config.write().set_optimize(flag);
    }

    pub fn is_optimize(&self) -> bool {
        self.config.read().is_optimize()
    }

    pub fn set_opaque(&self, flag: bool) {
        self.config.write().set_opaque(flag);
    }

    pub fn is_opaque(&self) -> bool {
        self.config.read().is_opaque()
    }

    pub fn set_expose_proxy(&self, flag: bool) {
        self.config.write().set_expose_proxy(flag);
    }

    pub fn is_expose_proxy(&self) -> bool {
        self.config.read().is_expose_proxy()
    }

    /// 永久禁止后续结构性变更
    pub fn freeze(&self) {
        self.config.write().set_frozen(true);
    }

    pub fn is_frozen(&self) -> bool {
        self.config.read().is_frozen()
    }

    /// 预过滤标志影响链构建的结果，翻转时同样使已缓存的链失效
    pub fn set_pre_filtered(&self, flag: bool) {
        if self.pre_filtered.swap(flag, Ordering::AcqRel) != flag {
            let mut state = self.state.write();
            self.advice_changed(&mut state);
        }
    }

    pub fn is_pre_filtered(&self) -> bool {
        self.pre_filtered.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // 目标源
    // ------------------------------------------------------------------

    /// 替换目标源；None 归一化为规范的空目标源
    pub fn set_target_source(&self, source: Option<Arc<dyn TargetSource>>) -> AopResult<()> {
        self.assert_not_frozen()?;
        let source = source.unwrap_or_else(EmptyTargetSource::shared);
        *self.target_source.write() = source;
        Ok(())
    }

    /// 把目标对象包装为单例目标源
    pub fn set_target(&self, target: Arc<dyn Reflective>) -> AopResult<()> {
        self.set_target_source(Some(Arc::new(SingletonTargetSource::new(target))))
    }

    pub fn target_source(&self) -> Arc<dyn TargetSource> {
        self.target_source.read().clone()
    }

    /// 目标类（无目标时为 None）
    pub fn target_class(&self) -> Option<ClassRef> {
        self.target_source.read().target_class().cloned()
    }

    // ------------------------------------------------------------------
    // 接口
    // ------------------------------------------------------------------

    /// 替换整个接口列表
    pub fn set_interfaces(&self, interfaces: Vec<InterfaceRef>) -> AopResult<()> {
        self.assert_not_frozen()?;
        for iface in &interfaces {
            validate_interface(iface)?;
        }
        let mut state = self.state.write();
        state.explicit_interfaces = interfaces.iter().cloned().collect();
        state.interfaces = dedup_preserving_order(interfaces);
        self.advice_changed(&mut state);
        Ok(())
    }

    /// 追加一个接口（幂等；保持插入顺序）
    pub fn add_interface(&self, iface: InterfaceRef) -> AopResult<()> {
        self.assert_not_frozen()?;
        validate_interface(&iface)?;
        let mut state = self.state.write();
        state.explicit_interfaces.insert(iface.clone());
        if !state.interfaces.contains(&iface) {
            tracing::debug!("Adding proxied interface: {}", iface);
            state.interfaces.push(iface);
            self.advice_changed(&mut state);
        }
        Ok(())
    }

    /// 移除一个接口；不存在时返回 false
    pub fn remove_interface(&self, iface: &InterfaceRef) -> AopResult<bool> {
        self.assert_not_frozen()?;
        let mut state = self.state.write();
        state.explicit_interfaces.remove(iface);
        match state.interfaces.iter().position(|i| i == iface) {
            Some(pos) => {
                state.interfaces.remove(pos);
                self.advice_changed(&mut state);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_interface_proxied(&self, iface: &InterfaceRef) -> bool {
        self.state.read().interfaces.contains(iface)
    }

    /// 被代理接口的快照（按插入顺序）
    pub fn proxied_interfaces(&self) -> Vec<InterfaceRef> {
        self.state.read().interfaces.clone()
    }

    // ------------------------------------------------------------------
    // 切面
    // ------------------------------------------------------------------

    /// 切面列表的独立快照
    pub fn advisors(&self) -> Vec<Arc<Advisor>> {
        self.state.read().advisors.clone()
    }

    pub fn advisor_count(&self) -> usize {
        self.state.read().advisors.len()
    }

    /// 追加切面
    pub fn add_advisor(&self, advisor: Advisor) -> AopResult<()> {
        self.add_advisor_arc_at(None, Arc::new(advisor))
    }

    /// 在指定位置插入切面；`pos` 超出 [0, 切面数] 时报错
    pub fn add_advisor_at(&self, pos: usize, advisor: Advisor) -> AopResult<()> {
        self.add_advisor_arc_at(Some(pos), Arc::new(advisor))
    }

    /// 按身份移除切面；不存在时返回 false
    pub fn remove_advisor(&self, advisor: &Arc<Advisor>) -> AopResult<bool> {
        self.assert_not_frozen()?;
        let mut state = self.state.write();
        match index_of(&state.advisors, advisor) {
            Some(index) => {
                self.remove_at_locked(&mut state, index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 按位置移除切面
    pub fn remove_advisor_at(&self, index: usize) -> AopResult<()> {
        self.assert_not_frozen()?;
        let mut state = self.state.write();
        let size = state.advisors.len();
        if index >= size {
            return Err(AopError::InvalidPosition { index, size });
        }
        self.remove_at_locked(&mut state, index);
        Ok(())
    }

    /// 切面在列表中的位置（按身份）
    pub fn index_of_advisor(&self, advisor: &Arc<Advisor>) -> Option<usize> {
        index_of(&self.state.read().advisors, advisor)
    }

    /// 通知所属切面在列表中的位置（按通知身份）
    pub fn index_of_advice(&self, advice: &Advice) -> Option<usize> {
        self.state
            .read()
            .advisors
            .iter()
            .position(|a| a.advice().ptr_eq(advice))
    }

    /// 原子地用 `new` 替换 `old`（位置不变）；`old` 不存在时返回 false
    pub fn replace_advisor(&self, old: &Arc<Advisor>, new: Advisor) -> AopResult<bool> {
        self.assert_not_frozen()?;
        // 先校验，失败时不留下任何部分生效的状态
        if let Advisor::Introduction(ia) = &new {
            ia.validate_interfaces()?;
        }
        let mut state = self.state.write();
        let Some(index) = index_of(&state.advisors, old) else {
            return Ok(false);
        };
        self.remove_at_locked(&mut state, index);
        let new = Arc::new(new);
        merge_introduced_interfaces(&mut state, &new);
        state.advisors.insert(index, new);
        self.advice_changed(&mut state);
        Ok(true)
    }

    /// 追加通知，自动包装为切面
    pub fn add_advice(&self, advice: Advice) -> AopResult<()> {
        self.add_advisor(wrap_advice(advice)?)
    }

    /// 在指定位置插入通知，自动包装为切面
    pub fn add_advice_at(&self, pos: usize, advice: Advice) -> AopResult<()> {
        self.add_advisor_at(pos, wrap_advice(advice)?)
    }

    /// 按通知身份定位所属切面并移除；不存在时返回 false
    pub fn remove_advice(&self, advice: &Advice) -> AopResult<bool> {
        self.assert_not_frozen()?;
        let mut state = self.state.write();
        match state.advisors.iter().position(|a| a.advice().ptr_eq(advice)) {
            Some(index) => {
                self.remove_at_locked(&mut state, index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // 链解析
    // ------------------------------------------------------------------

    /// 为 (方法, 目标类) 解析拦截器链，带缓存
    ///
    /// 配置未变更时，对同一方法的两次查询返回同一个 Arc；
    /// 并发未命中允许各自重复计算，最终存入的是同代的正确链
    pub fn interceptors_for(
        &self,
        method: &MethodRef,
        target_class: Option<&ClassRef>,
    ) -> AopResult<Arc<Vec<ChainEntry>>> {
        let (generation, advisors) = {
            let state = self.state.read();
            (state.generation, state.advisors.clone())
        };

        if let Some(hit) = self.method_cache.read().get(method) {
            if hit.generation == generation {
                return Ok(hit.chain.clone());
            }
        }

        let factory = self.chain_factory.read().clone();
        let chain = Arc::new(factory.interceptor_chain(
            &advisors,
            self.is_pre_filtered(),
            method,
            target_class,
        )?);

        let mut cache = self.method_cache.write();
        let entry = cache.entry(method.clone()).or_insert_with(|| CachedChain {
            generation,
            chain: chain.clone(),
        });
        if entry.generation < generation {
            *entry = CachedChain {
                generation,
                chain: chain.clone(),
            };
        }
        Ok(entry.chain.clone())
    }

    /// 当前结构代数（每次结构性变更单调递增）
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    // ------------------------------------------------------------------
    // 拷贝
    // ------------------------------------------------------------------

    /// 从另一份配置深拷贝填充自身
    ///
    /// 标志（含 frozen）、目标源引用、链构建策略引用被拷贝；接口
    /// 列表是内容的新副本；切面列表被整体替换为源列表的新副本
    /// （同一批 Arc，按身份共享）。引入切面先整体校验再落地，
    /// 失败时不产生任何可见变更。拷贝不经过冻结检查：冻结的源
    /// 配置可以照常被拷贝
    pub fn copy_configuration_from(&self, other: &AdvisedSupport) -> AopResult<()> {
        let (advisors, interfaces, explicit) = {
            let state = other.state.read();
            (
                state.advisors.clone(),
                state.interfaces.clone(),
                state.explicit_interfaces.clone(),
            )
        };
        for advisor in &advisors {
            if let Advisor::Introduction(ia) = advisor.as_ref() {
                ia.validate_interfaces()?;
            }
        }

        self.copy_proxy_config(&other.proxy_config());
        self.set_pre_filtered(other.is_pre_filtered());
        *self.target_source.write() = other.target_source();
        *self.chain_factory.write() = other.chain_factory.read().clone();

        let mut state = self.state.write();
        state.advisors = advisors;
        state.interfaces = interfaces;
        state.explicit_interfaces = explicit;
        self.advice_changed(&mut state);
        Ok(())
    }

    /// 仅配置的快照
    ///
    /// 与源配置共享同一份切面/接口状态（不是副本），但目标源被
    /// 替换为只携带目标类的占位，因此快照可用于自省而不暴露
    /// 可变的真实目标
    pub fn configuration_only_copy(&self) -> AdvisedSupport {
        let source = self.target_source.read();
        let placeholder: Arc<dyn TargetSource> = match source.target_class() {
            Some(class) => Arc::new(ClassOnlyTargetSource::new(
                class.clone(),
                source.is_static(),
            )),
            None => EmptyTargetSource::shared(),
        };

        AdvisedSupport {
            config: RwLock::new(self.proxy_config()),
            pre_filtered: AtomicBool::new(self.is_pre_filtered()),
            target_source: RwLock::new(placeholder),
            state: self.state.clone(),
            method_cache: RwLock::new(HashMap::new()),
            chain_factory: RwLock::new(self.chain_factory.read().clone()),
        }
    }

    // ------------------------------------------------------------------
    // 内部
    // ------------------------------------------------------------------

    fn assert_not_frozen(&self) -> AopResult<()> {
        if self.is_frozen() {
            return Err(AopError::ConfigurationFrozen);
        }
        Ok(())
    }

    fn add_advisor_arc_at(&self, pos: Option<usize>, advisor: Arc<Advisor>) -> AopResult<()> {
        self.assert_not_frozen()?;
        // 引入切面先校验再合并接口，校验失败时不产生任何可见变更
        if let Advisor::Introduction(ia) = advisor.as_ref() {
            ia.validate_interfaces()?;
        }
        let mut state = self.state.write();
        let size = state.advisors.len();
        let index = pos.unwrap_or(size);
        if index > size {
            return Err(AopError::InvalidPosition { index, size });
        }
        merge_introduced_interfaces(&mut state, &advisor);
        tracing::debug!("Adding advisor at {}: {:?}", index, advisor);
        state.advisors.insert(index, advisor);
        self.advice_changed(&mut state);
        Ok(())
    }

    /// 移除指定位置的切面，并对引入切面做级联接口移除
    fn remove_at_locked(&self, state: &mut AdvisedState, index: usize) {
        let removed = state.advisors.remove(index);
        if let Advisor::Introduction(ia) = removed.as_ref() {
            cascade_remove_interfaces(state, ia);
        }
        self.advice_changed(state);
    }

    /// 单一的 "advice changed" 通知点
    ///
    /// 在持有状态写锁时调用：递增代数并清空方法缓存，保证任何
    /// 后续读取都不会看到过期的链
    fn advice_changed(&self, state: &mut AdvisedState) {
        state.generation += 1;
        self.method_cache.write().clear();
    }
}

impl Default for AdvisedSupport {
    fn default() -> Self {
        Self::new()
    }
}

impl Advised for AdvisedSupport {
    fn is_frozen(&self) -> bool {
        AdvisedSupport::is_frozen(self)
    }

    fn is_proxy_target_class(&self) -> bool {
        AdvisedSupport::is_proxy_target_class(self)
    }

    fn proxied_interfaces(&self) -> Vec<InterfaceRef> {
        AdvisedSupport::proxied_interfaces(self)
    }

    fn is_interface_proxied(&self, iface: &InterfaceRef) -> bool {
        AdvisedSupport::is_interface_proxied(self, iface)
    }

    fn advisors(&self) -> Vec<Arc<Advisor>> {
        AdvisedSupport::advisors(self)
    }

    fn advisor_count(&self) -> usize {
        AdvisedSupport::advisor_count(self)
    }
}

impl fmt::Debug for AdvisedSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("AdvisedSupport")
            .field("config", &*self.config.read())
            .field("pre_filtered", &self.is_pre_filtered())
            .field("advisors", &state.advisors.len())
            .field("interfaces", &state.interfaces)
            .field("generation", &state.generation)
            .finish()
    }
}

impl fmt::Display for AdvisedSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        write!(
            f,
            "{} advisor(s), {} interface(s), target {}",
            state.advisors.len(),
            state.interfaces.len(),
            self.target_source.read().describe()
        )
    }
}

/// 把裸通知包装成切面
///
/// 自描述引入通知包装为引入切面；动态引入通知缺少接口元数据，
/// 无法安全自动包装；其余通知包装为恒真切点的普通切面
fn wrap_advice(advice: Advice) -> AopResult<Advisor> {
    match advice {
        Advice::Introduction(introduction) => {
            Ok(Advisor::Introduction(IntroductionAdvisor::new(introduction)))
        }
        Advice::DynamicIntroduction(_) => Err(AopError::UnsupportedAdviceComposition(
            "dynamic introduction advice cannot be auto-wrapped; \
             use an explicit IntroductionAdvisor"
                .to_string(),
        )),
        other => Ok(Advisor::Pointcut(PointcutAdvisor::always(other))),
    }
}

fn validate_interface(iface: &InterfaceRef) -> AopResult<()> {
    if iface.name.is_empty() {
        return Err(AopError::InvalidArgument(
            "interface name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn index_of(advisors: &[Arc<Advisor>], advisor: &Arc<Advisor>) -> Option<usize> {
    advisors.iter().position(|a| Arc::ptr_eq(a, advisor))
}

fn dedup_preserving_order(interfaces: Vec<InterfaceRef>) -> Vec<InterfaceRef> {
    let mut seen = HashSet::new();
    interfaces
        .into_iter()
        .filter(|i| seen.insert(i.clone()))
        .collect()
}

/// 把引入切面声明的接口并入接口列表（每个恰好一次）
fn merge_introduced_interfaces(state: &mut AdvisedState, advisor: &Arc<Advisor>) {
    if let Advisor::Introduction(ia) = advisor.as_ref() {
        for iface in ia.interfaces() {
            if !state.interfaces.contains(iface) {
                state.interfaces.push(iface.clone());
            }
        }
    }
}

/// 级联移除引入切面贡献的接口
///
/// 接口只有在既非显式加入、也不再被任何仍存在的引入切面贡献时
/// 才会被移除
fn cascade_remove_interfaces(state: &mut AdvisedState, removed: &IntroductionAdvisor) {
    for iface in removed.interfaces() {
        if state.explicit_interfaces.contains(iface) {
            continue;
        }
        let still_contributed = state.advisors.iter().any(|a| match a.as_ref() {
            Advisor::Introduction(ia) => ia.interfaces().contains(iface),
            Advisor::Pointcut(_) => false,
        });
        if !still_contributed {
            state.interfaces.retain(|i| i != iface);
        }
    }
}
