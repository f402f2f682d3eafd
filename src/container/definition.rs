//! 类型定义
//!
//! 注册时把各种定义来源一次性解析为 [`Definition`]，解析阶段只按标签分派，
//! 不再检查结构。定义存入注册表后不可变。

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{ContainerError, Result};
use crate::reflect::{Function, Reflector};
use crate::value::{Instance, Value};

/// 稀疏的位置覆盖参数
///
/// 缺失的位置保留签名中的默认值或占位。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overrides(BTreeMap<usize, Value>);

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由 `(位置, 值)` 构造
    pub fn sparse<I, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (usize, V)>,
        V: Into<Value>,
    {
        Self(entries.into_iter().map(|(position, value)| (position, value.into())).collect())
    }

    pub fn with(mut self, position: usize, value: impl Into<Value>) -> Self {
        self.0.insert(position, value.into());
        self
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.0.get(&position)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn max_position(&self) -> Option<usize> {
        self.0.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.0.iter().map(|(position, value)| (*position, value))
    }

    /// 逐位置合并：`self` 中存在的位置优先，其余取 `fallback`
    pub fn merged_over(&self, fallback: &Overrides) -> Overrides {
        let mut merged = fallback.0.clone();
        merged.extend(self.0.iter().map(|(position, value)| (*position, value.clone())));
        Overrides(merged)
    }
}

impl From<Vec<Value>> for Overrides {
    fn from(values: Vec<Value>) -> Self {
        Self(values.into_iter().enumerate().collect())
    }
}

impl<V: Into<Value>> FromIterator<V> for Overrides {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).enumerate().collect())
    }
}

/// 构造覆盖参数
///
/// `params![a, b]` 为稠密数组，`params![1 => b]` 只覆盖指定位置。
#[macro_export]
macro_rules! params {
    ($($position:literal => $value:expr),+ $(,)?) => {
        $crate::container::Overrides::new()$(.with($position, $value))+
    };
    ($($value:expr),* $(,)?) => {
        $crate::container::Overrides::from(vec![$($crate::value::Value::from($value)),*])
    };
}

/// 构造后立即调用一次的 setter
#[derive(Clone, Debug, PartialEq)]
pub struct SetterCall {
    method: String,
    args: Vec<Value>,
}

impl SetterCall {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// 回调或工厂的可调用形态
#[derive(Clone)]
pub enum Callable {
    /// 在反射器中登记的自由函数
    Function(String),
    /// `Class::method`
    StaticMethod { class: String, method: String },
    /// 绑定到实例的方法
    BoundMethod { target: Instance, method: String },
    /// 自身可调用的实例
    Invokable(Instance),
    /// 闭包
    Closure(Function),
}

impl Callable {
    /// 解析 `"function"` 或 `"Class::method"`
    pub fn named(path: &str) -> Self {
        match path.split_once("::") {
            Some((class, method)) => Callable::StaticMethod {
                class: class.to_string(),
                method: method.to_string(),
            },
            None => Callable::Function(path.to_string()),
        }
    }

    pub fn static_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Callable::StaticMethod {
            class: class.into(),
            method: method.into(),
        }
    }

    pub fn bound(target: Instance, method: impl Into<String>) -> Self {
        Callable::BoundMethod {
            target,
            method: method.into(),
        }
    }

    /// 只检查形态，不检查目标是否存在
    pub fn is_well_formed(&self) -> bool {
        match self {
            Callable::Function(name) => !name.is_empty(),
            Callable::StaticMethod { class, method } => !class.is_empty() && !method.is_empty(),
            Callable::BoundMethod { method, .. } => !method.is_empty(),
            Callable::Invokable(_) | Callable::Closure(_) => true,
        }
    }

    /// 通过反射器取得参数元数据与调用体
    pub(crate) fn introspect(&self, reflector: &dyn Reflector) -> Result<Function> {
        match self {
            Callable::Function(name) => reflector
                .function(name)
                .ok_or_else(|| ContainerError::reflection(name, "function does not exist")),
            Callable::StaticMethod { class, method } => {
                let descriptor = reflector
                    .class(class)
                    .ok_or_else(|| ContainerError::reflection(class, "class does not exist"))?;
                descriptor.static_method(method).cloned().ok_or_else(|| {
                    ContainerError::reflection(format!("{}::{}", class, method), "static method does not exist")
                })
            }
            Callable::BoundMethod { target, method } => {
                let descriptor = reflector
                    .class(target.class())
                    .ok_or_else(|| ContainerError::reflection(target.class(), "class does not exist"))?;
                let bound = descriptor.method(method).ok_or_else(|| {
                    ContainerError::reflection(format!("{}->{}", target.class(), method), "method does not exist")
                })?;
                Ok(bound.bind(target.clone()))
            }
            Callable::Invokable(target) => {
                let descriptor = reflector
                    .class(target.class())
                    .ok_or_else(|| ContainerError::reflection(target.class(), "class does not exist"))?;
                let invoker = descriptor.invoker().ok_or_else(|| {
                    ContainerError::reflection(target.class(), "instance is neither a closure nor invokable")
                })?;
                Ok(invoker.bind(target.clone()))
            }
            Callable::Closure(function) => Ok(function.clone()),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(name) => write!(f, "Function({})", name),
            Callable::StaticMethod { class, method } => write!(f, "StaticMethod({}::{})", class, method),
            Callable::BoundMethod { target, method } => write!(f, "BoundMethod({:?}->{})", target, method),
            Callable::Invokable(target) => write!(f, "Invokable({:?})", target),
            Callable::Closure(_) => write!(f, "Closure"),
        }
    }
}

impl From<Function> for Callable {
    fn from(function: Function) -> Self {
        Callable::Closure(function)
    }
}

/// 定义的实例化方式，每个定义恰好一种
#[derive(Clone, Debug)]
pub enum DefinitionKind {
    /// 通过类的构造函数实例化；类名与类型键不同时为别名
    Class(String),
    /// 以 `(容器, 有序实参)` 调用
    Callback(Callable),
    /// 以展开的实参调用
    Factory(Callable),
    /// 预先构造好的实例，原样返回并缓存
    Prebuilt(Instance),
}

/// 已解析的类型定义
#[derive(Clone, Debug)]
pub struct Definition {
    kind: DefinitionKind,
    params: Overrides,
    setter: Option<SetterCall>,
}

impl Definition {
    pub fn class(class: impl Into<String>) -> Self {
        Self::from_kind(DefinitionKind::Class(class.into()))
    }

    fn from_kind(kind: DefinitionKind) -> Self {
        Self {
            kind,
            params: Overrides::new(),
            setter: None,
        }
    }

    pub fn kind(&self) -> &DefinitionKind {
        &self.kind
    }

    pub fn params(&self) -> &Overrides {
        &self.params
    }

    pub fn setter(&self) -> Option<&SetterCall> {
        self.setter.as_ref()
    }

    /// 若为类定义则返回目标类名
    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            DefinitionKind::Class(class) => Some(class),
            _ => None,
        }
    }
}

/// 带标签的定义：`class`/`callback`/`factory` 之一，外加可选的参数和 setter
#[derive(Clone, Debug, Default)]
pub struct DefinitionSpec {
    class: Option<String>,
    callback: Option<Callable>,
    factory: Option<Callable>,
    params: Overrides,
    setter: Option<SetterCall>,
}

impl DefinitionSpec {
    pub fn class(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Self::default()
        }
    }

    pub fn callback(callable: impl Into<Callable>) -> Self {
        Self {
            callback: Some(callable.into()),
            ..Self::default()
        }
    }

    pub fn factory(callable: impl Into<Callable>) -> Self {
        Self {
            factory: Some(callable.into()),
            ..Self::default()
        }
    }

    /// 不带标签，只有参数；类型键本身须为可构造类
    pub fn untagged() -> Self {
        Self::default()
    }

    pub fn params(mut self, params: impl Into<Overrides>) -> Self {
        self.params = params.into();
        self
    }

    pub fn setter(mut self, method: impl Into<String>, args: Vec<Value>) -> Self {
        self.setter = Some(SetterCall::new(method, args));
        self
    }

    fn is_empty(&self) -> bool {
        self.class.is_none()
            && self.callback.is_none()
            && self.factory.is_none()
            && self.params.is_empty()
            && self.setter.is_none()
    }
}

/// 注册时可接受的定义来源
#[derive(Clone, Debug, Default)]
pub enum DefinitionSource {
    /// 类型键本身须为可构造类
    #[default]
    Empty,
    /// 目标类名
    ClassName(String),
    /// 预先构造好的实例
    Instance(Instance),
    Tagged(DefinitionSpec),
    /// 纯覆盖参数数组；类型键本身须为可构造类
    Overrides(Overrides),
}

impl From<&str> for DefinitionSource {
    fn from(class: &str) -> Self {
        DefinitionSource::ClassName(class.to_string())
    }
}

impl From<String> for DefinitionSource {
    fn from(class: String) -> Self {
        DefinitionSource::ClassName(class)
    }
}

impl From<Instance> for DefinitionSource {
    fn from(instance: Instance) -> Self {
        DefinitionSource::Instance(instance)
    }
}

impl From<DefinitionSpec> for DefinitionSource {
    fn from(spec: DefinitionSpec) -> Self {
        DefinitionSource::Tagged(spec)
    }
}

impl From<Overrides> for DefinitionSource {
    fn from(params: Overrides) -> Self {
        DefinitionSource::Overrides(params)
    }
}

/// 把定义来源解析为 [`Definition`]
///
/// 同时带有多个标签时按 class、factory、callback 的顺序取第一个。
pub fn parse(type_key: &str, source: DefinitionSource, reflector: &dyn Reflector) -> Result<Definition> {
    match source {
        DefinitionSource::Empty => parse_empty(type_key, reflector),
        DefinitionSource::ClassName(class) if class.is_empty() => parse_empty(type_key, reflector),
        DefinitionSource::ClassName(class) => Ok(Definition::class(class)),
        DefinitionSource::Instance(instance) => Ok(Definition::from_kind(DefinitionKind::Prebuilt(instance))),
        DefinitionSource::Overrides(params) if params.is_empty() => parse_empty(type_key, reflector),
        DefinitionSource::Overrides(params) => {
            if reflector.class_exists(type_key) {
                Ok(Definition {
                    kind: DefinitionKind::Class(type_key.to_string()),
                    params,
                    setter: None,
                })
            } else {
                Err(ContainerError::invalid_definition(
                    type_key,
                    "override array given but type is not a class",
                ))
            }
        }
        DefinitionSource::Tagged(spec) if spec.is_empty() => parse_empty(type_key, reflector),
        DefinitionSource::Tagged(spec) => parse_spec(type_key, spec, reflector),
    }
}

fn parse_empty(type_key: &str, reflector: &dyn Reflector) -> Result<Definition> {
    if reflector.class_exists(type_key) {
        Ok(Definition::class(type_key))
    } else {
        Err(ContainerError::invalid_definition(
            type_key,
            "type is expected to be a class name when definition is empty",
        ))
    }
}

fn parse_spec(type_key: &str, spec: DefinitionSpec, reflector: &dyn Reflector) -> Result<Definition> {
    let DefinitionSpec {
        class,
        callback,
        factory,
        params,
        setter,
    } = spec;

    let kind = if let Some(class) = class.filter(|class| !class.is_empty()) {
        DefinitionKind::Class(class)
    } else if let Some(factory) = factory {
        ensure_well_formed(type_key, &factory)?;
        DefinitionKind::Factory(factory)
    } else if let Some(callback) = callback {
        ensure_well_formed(type_key, &callback)?;
        DefinitionKind::Callback(callback)
    } else if reflector.class_exists(type_key) {
        DefinitionKind::Class(type_key.to_string())
    } else {
        return Err(ContainerError::invalid_definition(
            type_key,
            "definition has no class, callback or factory and type is not a class",
        ));
    };

    Ok(Definition { kind, params, setter })
}

fn ensure_well_formed(type_key: &str, callable: &Callable) -> Result<()> {
    if callable.is_well_formed() {
        Ok(())
    } else {
        Err(ContainerError::invalid_definition(
            type_key,
            format!("malformed callable {:?}", callable),
        ))
    }
}
