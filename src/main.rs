mod args;

use anyhow::{Context, Result};
use clap::Parser;
use graphdi::logging::{init_logging, LoggingConfig};
use graphdi::{
    deferred, ClassDescriptor, ClassRegistry, Container, ContainerConfig, DefinitionSource,
    DefinitionSpec, Parameter, Value,
};
use std::sync::Arc;

use args::{Args, Command};

struct Database {
    dsn: String,
}

struct UserRepository {
    database: Arc<Database>,
}

struct UserService {
    repository: Arc<UserRepository>,
    name: String,
}

fn demo_registry() -> ClassRegistry {
    ClassRegistry::new()
        .with_class(ClassDescriptor::new(
            "Database",
            vec![Parameter::required("dsn").with_default("sqlite::memory:")],
            |args| Ok(Database { dsn: args.string(0)? }),
        ))
        .with_class(ClassDescriptor::new(
            "UserRepository",
            vec![Parameter::typed("database", "Database")],
            |args| {
                Ok(UserRepository {
                    database: args.instance::<Database>(0)?,
                })
            },
        ))
        .with_class(ClassDescriptor::new(
            "UserService",
            vec![
                Parameter::typed("repository", "UserRepository"),
                Parameter::required("name").with_default("users"),
            ],
            |args| {
                Ok(UserService {
                    repository: args.instance::<UserRepository>(0)?,
                    name: args.string(1)?,
                })
            },
        ))
}

fn describe(value: &Value) -> String {
    if let Some(service) = value.downcast::<UserService>() {
        format!(
            "UserService(name={}, dsn={})",
            service.name, service.repository.database.dsn
        )
    } else if let Some(repository) = value.downcast::<UserRepository>() {
        format!("UserRepository(dsn={})", repository.database.dsn)
    } else if let Some(database) = value.downcast::<Database>() {
        format!("Database(dsn={})", database.dsn)
    } else {
        format!("{:?}", value)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let logging = if args.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::default()
    };
    init_logging(logging);

    let config = match &args.config {
        Some(path) => ContainerConfig::load(path)
            .with_context(|| format!("loading container config from {}", path.display()))?,
        None => ContainerConfig::from_env()?,
    };

    let registry = demo_registry();
    match args.command {
        Command::Classes => {
            for name in registry.class_names() {
                println!("{}", name);
            }
        }
        Command::Resolve {
            type_key,
            repeat,
            singleton,
        } => {
            let mut container = Container::with_config(registry, config);
            let definitions = [
                (
                    "primary-db",
                    DefinitionSpec::class("Database").params(graphdi::params!["postgres://localhost/app"]),
                ),
                (
                    "UserRepository",
                    DefinitionSpec::class("UserRepository").params(graphdi::params![deferred("primary-db")]),
                ),
            ];
            for (key, spec) in definitions {
                if singleton {
                    container.register_singleton(key, spec)?;
                } else {
                    container.register(key, spec)?;
                }
            }
            if singleton && !container.has(&type_key) {
                container.register_singleton(type_key.as_str(), DefinitionSource::Empty)?;
            }

            let mut previous: Option<Value> = None;
            for round in 0..repeat {
                let value = container
                    .get(&type_key)
                    .with_context(|| format!("resolving '{}'", type_key))?;
                let identical = previous.as_ref().map(|p| p == &value);
                println!("#{} {} (same as previous: {:?})", round + 1, describe(&value), identical);
                previous = Some(value);
            }

            let stats = container.stats();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", stats.performance_summary());
            }
        }
    }

    Ok(())
}
