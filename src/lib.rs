//! 反射驱动的对象图解析容器
//!
//! 给定类型键（类名或别名），容器按参数元数据解析构造函数/回调的参数，
//! 为声明了类类型的参数注入已注册的依赖，并可将结果缓存为单例。

pub mod config;
pub mod container;
pub mod errors;
pub mod global;
pub mod logging;
pub mod reflect;
pub mod value;

// Re-export commonly used items for convenience
pub use config::ContainerConfig;
pub use container::{
    deferred, Callable, Container, ContainerStats, DeferredRef, Definition, DefinitionKind,
    DefinitionSource, DefinitionSpec, Overrides, ServiceLifetime,
};
pub use errors::{ContainerError, Result};
pub use reflect::{ClassDescriptor, ClassRegistry, Convention, Function, Parameter, Reflector};
pub use value::{Args, Instance, Value};
