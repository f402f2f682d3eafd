//! 集成测试共用的类描述

#![allow(dead_code)]

use graphdi::{ClassDescriptor, ClassRegistry, Function, Instance, Parameter, Value};
use std::sync::Arc;

pub const SPECIAL: &str = "special";

#[derive(Debug)]
pub struct ConfigurableA {
    pub data: Value,
}

#[derive(Debug)]
pub struct ConfigurableB {
    pub data: Value,
}

#[derive(Debug)]
pub struct ClientClass {
    pub a: Arc<ConfigurableA>,
    pub b: Arc<ConfigurableB>,
}

#[derive(Debug)]
pub struct MoreClass {
    pub a: Arc<ConfigurableA>,
    pub b: Arc<ConfigurableB>,
    pub extra: Value,
}

/// 通过实例方法或自身调用生产对象的工厂
pub struct FactoryC;

pub fn a_value(data: impl Into<Value>) -> Value {
    Value::from(Instance::new("ConfigurableA", ConfigurableA { data: data.into() }))
}

pub fn b_value(data: impl Into<Value>) -> Value {
    Value::from(Instance::new("ConfigurableB", ConfigurableB { data: data.into() }))
}

pub fn client_value(a: Value, b: Value) -> Value {
    let client = ClientClass {
        a: a.downcast::<ConfigurableA>().expect("ConfigurableA instance"),
        b: b.downcast::<ConfigurableB>().expect("ConfigurableB instance"),
    };
    Value::from(Instance::new("ClientClass", client))
}

pub fn registry() -> ClassRegistry {
    ClassRegistry::new()
        .with_class(
            ClassDescriptor::new("ConfigurableA", vec![Parameter::required("config")], |args| {
                Ok(ConfigurableA { data: args.value(0) })
            })
            .with_static_method("special", Function::new(vec![], |_| Ok(a_value(SPECIAL)))),
        )
        .with_class(ClassDescriptor::new(
            "ConfigurableB",
            vec![Parameter::required("config").with_default("B")],
            |args| Ok(ConfigurableB { data: args.value(0) }),
        ))
        .with_class(
            ClassDescriptor::new(
                "ClientClass",
                vec![
                    Parameter::typed("a", "ConfigurableA"),
                    Parameter::typed("b", "ConfigurableB"),
                ],
                |args| {
                    Ok(ClientClass {
                        a: args.instance::<ConfigurableA>(0)?,
                        b: args.instance::<ConfigurableB>(1)?,
                    })
                },
            )
            .with_static_method(
                "normalized",
                Function::normalized(vec![Parameter::required("a")], |container, args| {
                    container.remove("ClientClass");
                    let data = match args.value(0) {
                        Value::Null => Value::from("A"),
                        data => data,
                    };
                    Ok(client_value(a_value(data), b_value("B")))
                }),
            ),
        )
        .with_class(
            ClassDescriptor::new(
                "MoreClass",
                vec![
                    Parameter::typed("a", "ConfigurableA"),
                    Parameter::typed("b", "ConfigurableB"),
                ],
                |args| {
                    Ok(MoreClass {
                        a: args.instance::<ConfigurableA>(0)?,
                        b: args.instance::<ConfigurableB>(1)?,
                        extra: Value::Null,
                    })
                },
            )
            .with_setter::<MoreClass, _>("setExtra", vec![Parameter::required("extra")], |this, args| {
                this.extra = args.value(0);
                Ok(())
            }),
        )
        .with_class(
            ClassDescriptor::new("FactoryC", vec![], |_| Ok(FactoryC))
                .with_method::<FactoryC, _>("getInstance", vec![Parameter::required("a")], |_, args| {
                    Ok(a_value(args.value(0)))
                })
                .with_method::<FactoryC, _>(
                    "defaultValueTest",
                    vec![
                        Parameter::required("a").with_default("a"),
                        Parameter::required("b").with_default("b"),
                    ],
                    |_, args| Ok(client_value(a_value(args.value(0)), b_value(args.value(1)))),
                )
                .with_method::<FactoryC, _>(
                    "objectTest",
                    vec![
                        Parameter::typed("a", "ConfigurableA"),
                        Parameter::typed("b", "ConfigurableB"),
                    ],
                    |_, args| Ok(client_value(args.value(0), args.value(1))),
                )
                .with_invoke::<FactoryC, _>(vec![Parameter::required("b")], |_, args| {
                    Ok(b_value(args.value(0)))
                }),
        )
        .with_function(
            "sample_a",
            Function::new(vec![Parameter::required("a")], |args| Ok(a_value(args.value(0)))),
        )
}

pub fn factory_instance() -> Instance {
    Instance::new("FactoryC", FactoryC)
}
