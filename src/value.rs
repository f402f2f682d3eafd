//! 动态值模型
//!
//! 容器在参数、覆盖值和解析结果之间传递的值都是 [`Value`]。
//! 已构造的对象以 [`Instance`] 表示，按指针判断同一性。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::container::DeferredRef;
use crate::errors::{ContainerError, Result};

/// 已构造的对象实例，携带类名以便查找其方法
#[derive(Clone)]
pub struct Instance {
    class: Arc<str>,
    object: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// 包装一个已构造的对象
    pub fn new<T: Any + Send + Sync>(class: impl Into<String>, object: T) -> Self {
        Self {
            class: Arc::from(class.into()),
            object: Arc::new(object),
        }
    }

    pub(crate) fn from_boxed(class: &str, object: Box<dyn Any + Send + Sync>) -> Self {
        Self {
            class: Arc::from(class),
            object: Arc::from(object),
        }
    }

    /// 实例所属的类名
    pub fn class(&self) -> &str {
        &self.class
    }

    /// 向下转型为具体类型，共享同一个对象
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.object.clone().downcast::<T>().ok()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }

    /// 是否指向同一个对象
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }

    /// 仅当实例未被共享时返回可变引用
    pub(crate) fn get_mut(&mut self) -> Option<&mut (dyn Any + Send + Sync)> {
        Arc::get_mut(&mut self.object)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({}@{:p})", self.class, Arc::as_ptr(&self.object))
    }
}

/// 容器中流转的动态值
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Instance(Instance),
    /// 尚未解析的延迟引用
    Deferred(DeferredRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// 取出实例并向下转型
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.as_instance().and_then(Instance::downcast::<T>)
    }

    /// 值的种类名称，用于错误信息
    pub fn kind(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Instance(instance) => format!("instance of {}", instance.class()),
            Value::Deferred(reference) => format!("deferred reference to {}", reference.target()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            (Value::Deferred(a), Value::Deferred(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Instance(value)
    }
}

impl From<DeferredRef> for Value {
    fn from(value: DeferredRef) -> Self {
        Value::Deferred(value)
    }
}

/// 传给构造函数、可调用对象和 setter 的有序实参
#[derive(Clone, Debug)]
pub struct Args {
    subject: Arc<str>,
    values: Vec<Value>,
}

impl Args {
    pub fn new(subject: &str, values: Vec<Value>) -> Self {
        Self {
            subject: Arc::from(subject),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 第 `position` 个实参，越界时为 `Null`
    pub fn value(&self, position: usize) -> Value {
        self.values.get(position).cloned().unwrap_or_default()
    }

    pub fn string(&self, position: usize) -> Result<String> {
        match self.values.get(position) {
            Some(Value::Str(s)) => Ok(s.clone()),
            other => Err(self.mismatch(position, "string", other)),
        }
    }

    pub fn int(&self, position: usize) -> Result<i64> {
        match self.values.get(position) {
            Some(Value::Int(i)) => Ok(*i),
            other => Err(self.mismatch(position, "int", other)),
        }
    }

    /// 取出指定位置的实例并转型为 `T`
    pub fn instance<T: Any + Send + Sync>(&self, position: usize) -> Result<Arc<T>> {
        let value = self.values.get(position);
        value
            .and_then(Value::downcast::<T>)
            .ok_or_else(|| self.mismatch(position, std::any::type_name::<T>(), value))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }

    fn mismatch(&self, position: usize, expected: &'static str, found: Option<&Value>) -> ContainerError {
        ContainerError::ArgumentMismatch {
            subject: self.subject.to_string(),
            position,
            expected,
            found: found.map_or_else(|| "nothing".to_string(), Value::kind),
        }
    }
}
