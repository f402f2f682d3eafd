use thiserror::Error;

/// 容器错误
///
/// 每个错误都是对单次 `get`/`register` 调用的最终拒绝，容器不做重试。
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Type '{type_key}' is neither registered nor a constructible class")]
    TypeNotFound { type_key: String },

    #[error("Invalid definition for '{type_key}': {reason}")]
    InvalidDefinition { type_key: String, reason: String },

    #[error("Reflection failed for '{subject}': {reason}")]
    Reflection { subject: String, reason: String },

    /// 注册阶段已校验过的数据在解析阶段不一致，属于逻辑缺陷
    #[error("Internal inconsistency while resolving '{type_key}': {detail}")]
    InternalInconsistency { type_key: String, detail: String },

    #[error("Circular dependency detected in chain: {chain}. Cycle at: {cycle_point}", chain = .resolution_stack.join(" -> "))]
    CircularDependency {
        cycle_point: String,
        resolution_stack: Vec<String>,
    },

    #[error("Resolution depth limit {limit} exceeded while resolving '{type_key}'")]
    DepthExceeded { type_key: String, limit: usize },

    #[error("Argument {position} of '{subject}': expected {expected}, found {found}")]
    ArgumentMismatch {
        subject: String,
        position: usize,
        expected: &'static str,
        found: String,
    },

    #[error("Cannot call setter '{method}' on '{type_key}': the instance is already shared")]
    SharedInstance { type_key: String, method: String },

    #[error("Deferred reference has no target type")]
    EmptyReference,

    #[error("Failed to create '{type_key}': {reason}")]
    CreationFailed { type_key: String, reason: String },

    #[error("Global container is already initialized")]
    AlreadyInitialized,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ContainerError {
    pub(crate) fn reflection(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        ContainerError::Reflection {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_definition(type_key: &str, reason: impl Into<String>) -> Self {
        ContainerError::InvalidDefinition {
            type_key: type_key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ContainerError>;
