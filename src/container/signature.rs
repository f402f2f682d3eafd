//! 依赖签名缓存
//!
//! 每个可构造实体的参数骨架只从元数据推导一次，之后在容器生命周期内复用，
//! 即使对应的定义后来被替换。

use std::collections::HashMap;
use std::sync::Arc;

use super::definition::Overrides;
use super::deferred::DeferredRef;
use crate::errors::{ContainerError, Result};
use crate::reflect::Parameter;
use crate::value::Value;

/// 签名中的一个参数槽
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    /// 参数自带默认值
    Default(Value),
    /// 参数声明了可构造类型，使用时再解析
    Deferred(DeferredRef),
    /// 既无默认值也无类型，只能由覆盖值提供
    Unresolved,
}

impl Slot {
    pub fn from_parameter(parameter: &Parameter) -> Self {
        if let Some(default) = parameter.default_value() {
            Slot::Default(default.clone())
        } else if let Some(class_type) = parameter.class_type() {
            Slot::Deferred(DeferredRef::new(class_type))
        } else {
            Slot::Unresolved
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Slot::Default(value) => value.clone(),
            Slot::Deferred(reference) => Value::Deferred(reference.clone()),
            Slot::Unresolved => Value::Null,
        }
    }
}

pub type Signature = Arc<[Slot]>;

/// 按声明顺序推导参数槽
pub fn derive(params: &[Parameter]) -> Signature {
    params.iter().map(Slot::from_parameter).collect()
}

/// 签名缓存的键
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SignatureKey {
    /// 按类名缓存的构造函数签名
    Class(String),
    /// 按请求它的类型键缓存的回调/工厂签名
    Callable(String),
    /// setter 方法签名
    Setter { class: String, method: String },
}

#[derive(Debug, Default)]
pub(crate) struct SignatureCache {
    entries: HashMap<SignatureKey, Signature>,
    derivations: u64,
}

impl SignatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 命中则直接返回，否则调用 `params` 获取元数据并推导
    pub fn get_or_derive<F>(&mut self, key: SignatureKey, params: F) -> Result<Signature>
    where
        F: FnOnce() -> Result<Vec<Parameter>>,
    {
        if let Some(signature) = self.entries.get(&key) {
            return Ok(Arc::clone(signature));
        }
        let signature = derive(&params()?);
        self.derivations += 1;
        tracing::trace!(key = ?key, slots = signature.len(), "Dependency signature derived");
        self.entries.insert(key, Arc::clone(&signature));
        Ok(signature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn derivations(&self) -> u64 {
        self.derivations
    }
}

/// 签名与覆盖值之外允许用 `Null` 补齐的最大空位数
const MAX_ARGUMENT_GAP: usize = 64;

/// 将覆盖值叠加在签名之上，得到稠密的位置实参
///
/// 覆盖值优先；超出签名长度的空位以 `Null` 填充。覆盖位置离签名和覆盖值
/// 数量都太远时返回 `ArgumentMismatch`，不会为其分配实参。
pub fn bind(subject: &str, signature: &[Slot], overrides: &Overrides) -> Result<Vec<Value>> {
    let len = match overrides.max_position() {
        Some(max) => {
            let limit = signature
                .len()
                .saturating_add(overrides.len())
                .saturating_add(MAX_ARGUMENT_GAP);
            match max.checked_add(1) {
                Some(end) if end <= limit => signature.len().max(end),
                _ => {
                    return Err(ContainerError::ArgumentMismatch {
                        subject: subject.to_string(),
                        position: max,
                        expected: "a position near the declared parameters",
                        found: format!("override at position {} (limit {})", max, limit),
                    })
                }
            }
        }
        None => signature.len(),
    };

    Ok((0..len)
        .map(|position| match overrides.get(position) {
            Some(value) => value.clone(),
            None => signature.get(position).map_or(Value::Null, Slot::to_value),
        })
        .collect())
}
