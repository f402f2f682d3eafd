//! 延迟引用：在真正需要时再从同一个容器解析另一个类型

use std::fmt;
use std::sync::Arc;

use super::Container;
use crate::errors::{ContainerError, Result};
use crate::value::Value;

/// 指向另一个类型键的占位符，创建后不可变
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DeferredRef {
    target: Arc<str>,
}

impl DeferredRef {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: Arc::from(target.into()),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// 从给定容器解析目标类型，不带覆盖参数
    pub fn resolve(&self, container: &mut Container) -> Result<Value> {
        if self.target.is_empty() {
            return Err(ContainerError::EmptyReference);
        }
        container.get(&self.target)
    }
}

impl fmt::Debug for DeferredRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeferredRef({})", self.target)
    }
}

/// 构造一个指向 `target` 的延迟引用值
pub fn deferred(target: impl Into<String>) -> Value {
    Value::Deferred(DeferredRef::new(target))
}

/// 替换实参列表中所有顶层的延迟引用
pub(crate) fn resolve_all(container: &mut Container, values: Vec<Value>) -> Result<Vec<Value>> {
    values
        .into_iter()
        .map(|value| match value {
            Value::Deferred(reference) => reference.resolve(container),
            other => Ok(other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{ClassDescriptor, ClassRegistry};

    struct Leaf;

    fn container() -> Container {
        let registry = ClassRegistry::new().with_class(ClassDescriptor::new("Leaf", vec![], |_| Ok(Leaf)));
        Container::with_reflector(registry)
    }

    #[test]
    fn test_resolve_against_container() {
        let mut container = container();
        let value = DeferredRef::new("Leaf").resolve(&mut container).unwrap();
        assert_eq!(value.as_instance().map(|i| i.class().to_string()), Some("Leaf".to_string()));
    }

    #[test]
    fn test_empty_reference_is_rejected() {
        let mut container = container();
        let result = DeferredRef::new("").resolve(&mut container);
        assert!(matches!(result, Err(ContainerError::EmptyReference)));
    }

    #[test]
    fn test_resolve_all_keeps_plain_values() {
        let mut container = container();
        let values = vec![Value::from(1), deferred("Leaf"), Value::Null];
        let resolved = resolve_all(&mut container, values).unwrap();

        assert_eq!(resolved[0], Value::from(1));
        assert!(resolved[1].downcast::<Leaf>().is_some());
        assert!(resolved[2].is_null());
    }
}
