//! 对象图解析容器
//!
//! 提供按类型键注册和解析的功能，支持：
//! - 单例与瞬态生命周期
//! - 构造函数注入与 setter 注入
//! - 回调与工厂
//! - 别名与延迟引用
//! - 循环依赖检测

pub mod deferred;
pub mod definition;
pub mod signature;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

pub use deferred::{deferred, DeferredRef};
pub use definition::{
    Callable, Definition, DefinitionKind, DefinitionSource, DefinitionSpec, Overrides, SetterCall,
};
pub use signature::{Signature, SignatureKey, Slot};

use crate::config::ContainerConfig;
use crate::errors::{ContainerError, Result};
use crate::logging::ResolutionTimer;
use crate::reflect::{ClassRegistry, Convention, Reflector};
use crate::value::{Args, Instance, Value};
use signature::SignatureCache;

/// 服务生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceLifetime {
    /// 首次解析后缓存，之后每次返回同一个实例
    Singleton,
    /// 每次解析都重新构造
    Transient,
}

/// 注册信息
#[derive(Clone, Debug)]
struct Registration {
    definition: Arc<Definition>,
    lifetime: ServiceLifetime,
}

/// 容器统计信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContainerStats {
    /// 总解析次数（含递归解析）
    pub total_resolutions: u64,
    /// 单例缓存命中次数
    pub singleton_cache_hits: u64,
    /// 单例缓存未命中次数
    pub singleton_cache_misses: u64,
    /// 瞬态构造次数
    pub transient_creations: u64,
    /// 已注册定义数量
    pub registered_definitions: usize,
    /// 已缓存的单例数量
    pub active_singletons: usize,
    /// 依赖签名缓存条目数
    pub signature_entries: usize,
    /// 从参数元数据推导签名的次数
    pub signature_derivations: u64,
    /// 循环依赖检测次数
    pub circular_dependency_checks: u64,
}

impl ContainerStats {
    /// 缓存命中率（百分比）
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.singleton_cache_hits + self.singleton_cache_misses;
        if total == 0 {
            0.0
        } else {
            (self.singleton_cache_hits as f64 / total as f64) * 100.0
        }
    }

    pub fn performance_summary(&self) -> String {
        format!(
            "Container: {} total resolutions, {:.1}% cache hit rate, {} registered definitions, {} active singletons, {} signatures",
            self.total_resolutions,
            self.cache_hit_rate(),
            self.registered_definitions,
            self.active_singletons,
            self.signature_entries
        )
    }
}

/// 按类型键注册和解析对象的容器
///
/// 容器不做内部加锁：注册和解析由同一个所有者串行调用。
/// 需要跨线程共享时由调用方在外部同步，参见 [`crate::global`]。
pub struct Container {
    /// 类型定义注册表
    definitions: HashMap<String, Registration>,
    /// 单例实例缓存
    singletons: HashMap<String, Value>,
    /// 依赖签名缓存
    signatures: SignatureCache,
    /// 参数元数据来源
    reflector: Arc<dyn Reflector>,
    /// 循环依赖检测栈
    resolution_stack: Vec<String>,
    config: ContainerConfig,
    stats: ContainerStats,
}

impl Container {
    /// 创建没有任何已知类的容器
    pub fn new() -> Self {
        Self::with_reflector(ClassRegistry::new())
    }

    pub fn with_reflector(reflector: impl Reflector + 'static) -> Self {
        Self::with_config(reflector, ContainerConfig::default())
    }

    pub fn with_config(reflector: impl Reflector + 'static, config: ContainerConfig) -> Self {
        Self {
            definitions: HashMap::new(),
            singletons: HashMap::new(),
            signatures: SignatureCache::new(),
            reflector: Arc::new(reflector),
            resolution_stack: Vec::new(),
            config,
            stats: ContainerStats::default(),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn reflector(&self) -> &dyn Reflector {
        self.reflector.as_ref()
    }

    /// 注册或替换一个非单例定义，并丢弃该类型已缓存的实例
    ///
    /// 预构造实例无论如何注册都会在首次访问时缓存。
    pub fn register(
        &mut self,
        type_key: impl Into<String>,
        source: impl Into<DefinitionSource>,
    ) -> Result<&mut Self> {
        self.insert(type_key.into(), source.into(), ServiceLifetime::Transient)
    }

    /// 注册或替换一个定义，并标记为单例
    pub fn register_singleton(
        &mut self,
        type_key: impl Into<String>,
        source: impl Into<DefinitionSource>,
    ) -> Result<&mut Self> {
        self.insert(type_key.into(), source.into(), ServiceLifetime::Singleton)
    }

    fn insert(
        &mut self,
        type_key: String,
        source: DefinitionSource,
        lifetime: ServiceLifetime,
    ) -> Result<&mut Self> {
        // 解析失败时注册表保持不变
        let definition = definition::parse(&type_key, source, self.reflector.as_ref())?;
        tracing::debug!(type_key = %type_key, lifetime = ?lifetime, kind = ?definition.kind(), "Definition registered");

        self.singletons.remove(&type_key);
        self.definitions.insert(
            type_key,
            Registration {
                definition: Arc::new(definition),
                lifetime,
            },
        );
        Ok(self)
    }

    /// 是否存在定义（不检查类是否存在）
    pub fn has(&self, type_key: &str) -> bool {
        self.definitions.contains_key(type_key)
    }

    pub fn is_singleton(&self, type_key: &str) -> bool {
        self.definitions
            .get(type_key)
            .is_some_and(|registration| registration.lifetime == ServiceLifetime::Singleton)
    }

    /// 删除定义及其缓存的实例；不存在时什么也不做
    pub fn remove(&mut self, type_key: &str) -> &mut Self {
        let removed = self.definitions.remove(type_key).is_some();
        self.singletons.remove(type_key);
        if removed {
            tracing::debug!(type_key = %type_key, "Definition removed");
        }
        self
    }

    /// 当前注册表的快照
    pub fn definitions(&self) -> BTreeMap<String, Arc<Definition>> {
        self.definitions
            .iter()
            .map(|(type_key, registration)| (type_key.clone(), Arc::clone(&registration.definition)))
            .collect()
    }

    /// 解析一个类型
    pub fn get(&mut self, type_key: &str) -> Result<Value> {
        self.get_with(type_key, Overrides::new())
    }

    /// 解析一个类型，调用时的覆盖参数逐位置优先于定义中的参数
    ///
    /// 已缓存的单例忽略覆盖参数。未注册的类型键按类名直接构造。
    pub fn get_with(&mut self, type_key: &str, overrides: Overrides) -> Result<Value> {
        self.stats.total_resolutions += 1;

        if let Some(cached) = self.singletons.get(type_key) {
            self.stats.singleton_cache_hits += 1;
            tracing::trace!(type_key = %type_key, "Singleton cache hit");
            return Ok(cached.clone());
        }

        self.enter(type_key)?;
        let timer = self
            .config
            .trace_resolutions
            .then(|| ResolutionTimer::start(type_key, self.resolution_stack.len()));

        let result = self.resolve(type_key, overrides);

        self.resolution_stack.pop();
        if let Some(timer) = timer {
            timer.finish(result.is_ok());
        }
        result
    }

    /// 解析并向下转型
    pub fn get_as<T: std::any::Any + Send + Sync>(&mut self, type_key: &str) -> Result<Arc<T>> {
        self.get_as_with(type_key, Overrides::new())
    }

    pub fn get_as_with<T: std::any::Any + Send + Sync>(
        &mut self,
        type_key: &str,
        overrides: Overrides,
    ) -> Result<Arc<T>> {
        let value = self.get_with(type_key, overrides)?;
        value.downcast::<T>().ok_or_else(|| ContainerError::CreationFailed {
            type_key: type_key.to_string(),
            reason: format!("resolved {} is not a {}", value.kind(), std::any::type_name::<T>()),
        })
    }

    /// 压入解析栈，检测循环依赖与深度上限
    fn enter(&mut self, type_key: &str) -> Result<()> {
        if self.config.detect_cycles {
            self.stats.circular_dependency_checks += 1;
            if self.resolution_stack.iter().any(|key| key == type_key) {
                let resolution_stack = self.resolution_stack.clone();
                tracing::warn!(type_key = %type_key, stack = ?resolution_stack, "Circular dependency detected");
                return Err(ContainerError::CircularDependency {
                    cycle_point: type_key.to_string(),
                    resolution_stack,
                });
            }
        }
        if self.resolution_stack.len() >= self.config.max_depth {
            return Err(ContainerError::DepthExceeded {
                type_key: type_key.to_string(),
                limit: self.config.max_depth,
            });
        }
        self.resolution_stack.push(type_key.to_string());
        Ok(())
    }

    /// 内部解析逻辑
    fn resolve(&mut self, type_key: &str, overrides: Overrides) -> Result<Value> {
        let Some(registration) = self.definitions.get(type_key).cloned() else {
            if !self.reflector.class_exists(type_key) {
                return Err(ContainerError::TypeNotFound {
                    type_key: type_key.to_string(),
                });
            }
            self.stats.transient_creations += 1;
            return self.construct(type_key, &overrides);
        };

        let definition = &registration.definition;
        match registration.lifetime {
            ServiceLifetime::Singleton => self.stats.singleton_cache_misses += 1,
            ServiceLifetime::Transient => self.stats.transient_creations += 1,
        }

        let merged = overrides.merged_over(definition.params());
        let built = match definition.kind() {
            DefinitionKind::Prebuilt(instance) => {
                if definition.setter().is_some() || !definition.params().is_empty() {
                    return Err(ContainerError::InternalInconsistency {
                        type_key: type_key.to_string(),
                        detail: "pre-built instance carries params or a setter".to_string(),
                    });
                }
                let value = Value::Instance(instance.clone());
                self.singletons.insert(type_key.to_string(), value.clone());
                return Ok(value);
            }
            DefinitionKind::Class(class) if class == type_key => self.construct(class, &merged)?,
            DefinitionKind::Class(class) => self.get_with(class, merged)?,
            DefinitionKind::Callback(callable) => {
                self.invoke(type_key, callable, Convention::Normalized, &merged)?
            }
            DefinitionKind::Factory(callable) => {
                self.invoke(type_key, callable, Convention::Spread, &merged)?
            }
        };

        let built = match definition.setter() {
            Some(setter) => self.apply_setter(type_key, built, setter)?,
            None => built,
        };

        // 回调期间定义可能已被替换或删除，只为仍然有效的单例注册缓存
        let still_registered = self.definitions.get(type_key).is_some_and(|current| {
            current.lifetime == ServiceLifetime::Singleton
                && Arc::ptr_eq(&current.definition, &registration.definition)
        });
        if registration.lifetime == ServiceLifetime::Singleton && still_registered {
            self.singletons.insert(type_key.to_string(), built.clone());
        }
        Ok(built)
    }

    /// 按类的构造函数直接构造
    fn construct(&mut self, class: &str, overrides: &Overrides) -> Result<Value> {
        let descriptor = self
            .reflector
            .class(class)
            .ok_or_else(|| ContainerError::reflection(class, "class does not exist"))?;

        let signature = self
            .signatures
            .get_or_derive(SignatureKey::Class(class.to_string()), || Ok(descriptor.params().to_vec()))?;
        let args = deferred::resolve_all(self, signature::bind(class, &signature, overrides)?)?;

        let object = descriptor.construct(Args::new(class, args))?;
        Ok(Value::Instance(Instance::from_boxed(class, object)))
    }

    /// 调用回调或工厂，签名按请求它的类型键缓存
    fn invoke(
        &mut self,
        type_key: &str,
        callable: &Callable,
        convention: Convention,
        overrides: &Overrides,
    ) -> Result<Value> {
        let function = callable.introspect(self.reflector.as_ref())?;
        if function.convention() != convention {
            return Err(ContainerError::reflection(
                format!("{:?}", callable),
                format!("expected {:?} calling convention, found {:?}", convention, function.convention()),
            ));
        }

        let signature = self
            .signatures
            .get_or_derive(SignatureKey::Callable(type_key.to_string()), || Ok(function.params().to_vec()))?;
        let args = deferred::resolve_all(self, signature::bind(type_key, &signature, overrides)?)?;

        function.call(self, Args::new(type_key, args))
    }

    /// 对刚构造的实例调用一次 setter
    fn apply_setter(&mut self, type_key: &str, built: Value, setter: &SetterCall) -> Result<Value> {
        let mut instance = match built {
            Value::Instance(instance) => instance,
            other => {
                return Err(ContainerError::reflection(
                    type_key,
                    format!("setter '{}' requires an instance, found {}", setter.method(), other.kind()),
                ))
            }
        };

        let class = instance.class().to_string();
        let descriptor = self
            .reflector
            .class(&class)
            .ok_or_else(|| ContainerError::reflection(&class, "class does not exist"))?;
        let method = descriptor.setter(setter.method()).ok_or_else(|| {
            ContainerError::reflection(format!("{}->{}", class, setter.method()), "setter does not exist")
        })?;

        let key = SignatureKey::Setter {
            class: class.clone(),
            method: setter.method().to_string(),
        };
        let signature = self.signatures.get_or_derive(key, || Ok(method.params().to_vec()))?;
        let overrides = Overrides::from(setter.args().to_vec());
        let args = deferred::resolve_all(self, signature::bind(setter.method(), &signature, &overrides)?)?;

        let target = instance.get_mut().ok_or_else(|| ContainerError::SharedInstance {
            type_key: type_key.to_string(),
            method: setter.method().to_string(),
        })?;
        method.apply(target, Args::new(setter.method(), args))?;
        Ok(Value::Instance(instance))
    }

    /// 获取容器统计信息
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            registered_definitions: self.definitions.len(),
            active_singletons: self.singletons.len(),
            signature_entries: self.signatures.len(),
            signature_derivations: self.signatures.derivations(),
            ..self.stats.clone()
        }
    }

    pub fn reset_stats(&mut self) {
        self.stats = ContainerStats::default();
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("definitions", &self.definitions.len())
            .field("singletons", &self.singletons.len())
            .field("resolution_stack", &self.resolution_stack)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}
