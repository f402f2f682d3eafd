//! 参数元数据能力
//!
//! Rust 没有运行时反射，容器需要的构造函数/可调用对象参数信息由
//! [`ClassDescriptor`] 与 [`Function`] 显式登记，再通过 [`Reflector`] 查询。

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::container::Container;
use crate::errors::{ContainerError, Result};
use crate::value::{Args, Instance, Value};

type ConstructFn = dyn Fn(Args) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync;
type NativeFn = dyn Fn(&mut Container, Args) -> Result<Value> + Send + Sync;
type MethodFn = dyn Fn(&Instance, &mut Container, Args) -> Result<Value> + Send + Sync;
type SetterFn = dyn Fn(&mut (dyn Any + Send + Sync), Args) -> Result<()> + Send + Sync;

/// 形式参数：名称、默认值、声明的类类型
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    name: String,
    default: Option<Value>,
    class_type: Option<String>,
}

impl Parameter {
    /// 无默认值、无类型的参数
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            class_type: None,
        }
    }

    /// 声明为某个可构造类型的参数
    pub fn typed(name: impl Into<String>, class_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            class_type: Some(class_type.into()),
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn class_type(&self) -> Option<&str> {
        self.class_type.as_deref()
    }
}

/// 调用约定
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convention {
    /// 实参按位置展开，用于工厂定义
    Spread,
    /// 固定为 `(容器, 有序实参)`，用于回调定义
    Normalized,
}

/// 带参数元数据的可调用体
#[derive(Clone)]
pub struct Function {
    params: Arc<[Parameter]>,
    convention: Convention,
    body: Arc<NativeFn>,
}

impl Function {
    /// 以展开实参调用的函数
    pub fn new<F>(params: Vec<Parameter>, body: F) -> Self
    where
        F: Fn(Args) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            params: params.into(),
            convention: Convention::Spread,
            body: Arc::new(move |_: &mut Container, args: Args| body(args)),
        }
    }

    /// 以 `(容器, 有序实参)` 调用的函数
    pub fn normalized<F>(params: Vec<Parameter>, body: F) -> Self
    where
        F: Fn(&mut Container, Args) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            params: params.into(),
            convention: Convention::Normalized,
            body: Arc::new(body),
        }
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    pub(crate) fn call(&self, container: &mut Container, args: Args) -> Result<Value> {
        (self.body)(container, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("params", &self.params)
            .field("convention", &self.convention)
            .finish_non_exhaustive()
    }
}

/// 实例方法，绑定到具体实例后成为 [`Function`]
#[derive(Clone)]
pub struct Method {
    params: Arc<[Parameter]>,
    convention: Convention,
    body: Arc<MethodFn>,
}

impl Method {
    fn spread<T, F>(class: &str, params: Vec<Parameter>, body: F) -> Self
    where
        T: Any,
        F: Fn(&T, Args) -> Result<Value> + Send + Sync + 'static,
    {
        let class = class.to_string();
        Self {
            params: params.into(),
            convention: Convention::Spread,
            body: Arc::new(move |target: &Instance, _: &mut Container, args: Args| {
                body(receiver::<T>(&class, target)?, args)
            }),
        }
    }

    fn normalized<T, F>(class: &str, params: Vec<Parameter>, body: F) -> Self
    where
        T: Any,
        F: Fn(&T, &mut Container, Args) -> Result<Value> + Send + Sync + 'static,
    {
        let class = class.to_string();
        Self {
            params: params.into(),
            convention: Convention::Normalized,
            body: Arc::new(move |target: &Instance, container: &mut Container, args: Args| {
                body(receiver::<T>(&class, target)?, container, args)
            }),
        }
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// 绑定接收者
    pub fn bind(&self, target: Instance) -> Function {
        let body = Arc::clone(&self.body);
        Function {
            params: Arc::clone(&self.params),
            convention: self.convention,
            body: Arc::new(move |container: &mut Container, args: Args| {
                body(&target, container, args)
            }),
        }
    }
}

fn receiver<'a, T: Any>(class: &str, target: &'a Instance) -> Result<&'a T> {
    target.downcast_ref::<T>().ok_or_else(|| {
        ContainerError::reflection(
            class,
            format!("receiver '{}' is not a {}", target.class(), type_name::<T>()),
        )
    })
}

/// 构造后调用的 setter，需要独占实例
#[derive(Clone)]
pub struct Setter {
    params: Arc<[Parameter]>,
    body: Arc<SetterFn>,
}

impl Setter {
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub(crate) fn apply(&self, target: &mut (dyn Any + Send + Sync), args: Args) -> Result<()> {
        (self.body)(target, args)
    }
}

/// 类描述：构造函数参数、构造体以及可供容器调用的方法
pub struct ClassDescriptor {
    name: String,
    params: Arc<[Parameter]>,
    constructor: Arc<ConstructFn>,
    static_methods: HashMap<String, Function>,
    methods: HashMap<String, Method>,
    invoker: Option<Method>,
    setters: HashMap<String, Setter>,
}

impl ClassDescriptor {
    pub fn new<T, F>(name: impl Into<String>, params: Vec<Parameter>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Args) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: params.into(),
            constructor: Arc::new(move |args: Args| {
                constructor(args).map(|object| Box::new(object) as Box<dyn Any + Send + Sync>)
            }),
            static_methods: HashMap::new(),
            methods: HashMap::new(),
            invoker: None,
            setters: HashMap::new(),
        }
    }

    /// `Class::method` 形式的静态方法
    pub fn with_static_method(mut self, name: impl Into<String>, function: Function) -> Self {
        self.static_methods.insert(name.into(), function);
        self
    }

    pub fn with_method<T, F>(mut self, name: impl Into<String>, params: Vec<Parameter>, body: F) -> Self
    where
        T: Any,
        F: Fn(&T, Args) -> Result<Value> + Send + Sync + 'static,
    {
        let method = Method::spread(&self.name, params, body);
        self.methods.insert(name.into(), method);
        self
    }

    pub fn with_normalized_method<T, F>(
        mut self,
        name: impl Into<String>,
        params: Vec<Parameter>,
        body: F,
    ) -> Self
    where
        T: Any,
        F: Fn(&T, &mut Container, Args) -> Result<Value> + Send + Sync + 'static,
    {
        let method = Method::normalized(&self.name, params, body);
        self.methods.insert(name.into(), method);
        self
    }

    /// 让实例本身可被调用
    pub fn with_invoke<T, F>(mut self, params: Vec<Parameter>, body: F) -> Self
    where
        T: Any,
        F: Fn(&T, Args) -> Result<Value> + Send + Sync + 'static,
    {
        self.invoker = Some(Method::spread(&self.name, params, body));
        self
    }

    pub fn with_normalized_invoke<T, F>(mut self, params: Vec<Parameter>, body: F) -> Self
    where
        T: Any,
        F: Fn(&T, &mut Container, Args) -> Result<Value> + Send + Sync + 'static,
    {
        self.invoker = Some(Method::normalized(&self.name, params, body));
        self
    }

    pub fn with_setter<T, F>(mut self, name: impl Into<String>, params: Vec<Parameter>, body: F) -> Self
    where
        T: Any,
        F: Fn(&mut T, Args) -> Result<()> + Send + Sync + 'static,
    {
        let class = self.name.clone();
        let setter = Setter {
            params: params.into(),
            body: Arc::new(move |target: &mut (dyn Any + Send + Sync), args: Args| {
                let this = target.downcast_mut::<T>().ok_or_else(|| {
                    ContainerError::reflection(&class, format!("receiver is not a {}", type_name::<T>()))
                })?;
                body(this, args)
            }),
        };
        self.setters.insert(name.into(), setter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn static_method(&self, name: &str) -> Option<&Function> {
        self.static_methods.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn invoker(&self) -> Option<&Method> {
        self.invoker.as_ref()
    }

    pub fn setter(&self, name: &str) -> Option<&Setter> {
        self.setters.get(name)
    }

    pub(crate) fn construct(&self, args: Args) -> Result<Box<dyn Any + Send + Sync>> {
        (self.constructor)(args)
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// 给定类名或函数名，返回其参数元数据与调用体
pub trait Reflector: Send + Sync {
    fn class(&self, name: &str) -> Option<Arc<ClassDescriptor>>;

    fn function(&self, name: &str) -> Option<Function>;

    fn class_exists(&self, name: &str) -> bool {
        self.class(name).is_some()
    }
}

/// 显式登记的类与函数表
#[derive(Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, Arc<ClassDescriptor>>,
    functions: HashMap<String, Function>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, descriptor: ClassDescriptor) -> Self {
        self.add_class(descriptor);
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, function: Function) -> Self {
        self.add_function(name, function);
        self
    }

    pub fn add_class(&mut self, descriptor: ClassDescriptor) {
        self.classes
            .insert(descriptor.name().to_string(), Arc::new(descriptor));
    }

    pub fn add_function(&mut self, name: impl Into<String>, function: Function) {
        self.functions.insert(name.into(), function);
    }

    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Reflector for ClassRegistry {
    fn class(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.get(name).cloned()
    }

    fn function(&self, name: &str) -> Option<Function> {
        self.functions.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        step: i64,
        total: i64,
    }

    fn counter_class() -> ClassDescriptor {
        ClassDescriptor::new(
            "Counter",
            vec![Parameter::required("step").with_default(1)],
            |args| {
                Ok(Counter {
                    step: args.int(0)?,
                    total: 0,
                })
            },
        )
        .with_method::<Counter, _>("next", vec![], |this, _| Ok(Value::from(this.total + this.step)))
        .with_setter::<Counter, _>("set_total", vec![Parameter::required("total")], |this, args| {
            this.total = args.int(0)?;
            Ok(())
        })
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ClassRegistry::new()
            .with_class(counter_class())
            .with_function("one", Function::new(vec![], |_| Ok(Value::from(1))));

        assert!(registry.class_exists("Counter"));
        assert!(!registry.class_exists("Missing"));
        assert!(registry.function("one").is_some());
        assert_eq!(registry.class_names(), vec!["Counter"]);

        let descriptor = registry.class("Counter").unwrap();
        assert_eq!(descriptor.params()[0].default_value(), Some(&Value::from(1)));
        assert!(descriptor.method("next").is_some());
        assert!(descriptor.setter("set_total").is_some());
        assert!(descriptor.invoker().is_none());
    }

    #[test]
    fn test_setter_mutates_receiver() {
        let descriptor = counter_class();
        let mut object = descriptor
            .construct(Args::new("Counter", vec![Value::from(2)]))
            .unwrap();

        descriptor
            .setter("set_total")
            .unwrap()
            .apply(object.as_mut(), Args::new("set_total", vec![Value::from(40)]))
            .unwrap();

        let counter = object.downcast_ref::<Counter>().unwrap();
        assert_eq!(counter.total + counter.step, 42);
    }

    #[test]
    fn test_parameter_builders() {
        let typed = Parameter::typed("db", "Database");
        assert_eq!(typed.name(), "db");
        assert_eq!(typed.class_type(), Some("Database"));
        assert!(typed.default_value().is_none());

        let defaulted = Parameter::required("name").with_default("x");
        assert_eq!(defaulted.default_value(), Some(&Value::from("x")));
        assert!(defaulted.class_type().is_none());
    }
}
