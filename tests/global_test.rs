mod common;

use common::{registry, ConfigurableB};
use graphdi::{global, Container, ContainerError, DefinitionSource, Value};

// 进程级容器只能安装一次，因此整个生命周期放在同一个测试里
#[test]
fn test_global_container_lifecycle() {
    assert!(!global::is_initialized());
    global::install(Container::with_reflector(registry())).unwrap();
    assert!(global::is_initialized());

    let err = global::install(Container::new()).unwrap_err();
    assert!(matches!(err, ContainerError::AlreadyInitialized));

    global::global()
        .register_singleton("ConfigurableB", DefinitionSource::Empty)
        .unwrap();

    let first = global::global().get_as::<ConfigurableB>("ConfigurableB").unwrap();
    let second = global::global().get_as::<ConfigurableB>("ConfigurableB").unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(first.data, Value::from("B"));
}
