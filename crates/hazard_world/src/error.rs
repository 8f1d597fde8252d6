//! Error types for the hazard world engine.

use hazard_world_proto::CodecError;

/// Failure to read or write an entity's ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("ledger codec failed: {0}")]
    Codec(#[from] CodecError),
    #[error("attachment store unavailable: {message}")]
    Unavailable { message: String },
    #[error("attachment {key} holds {found}, expected {expected}")]
    UnexpectedValue {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl StorageError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StorageError::Unavailable {
            message: message.into(),
        }
    }

    /// The blob was written by a newer protocol and was left untouched.
    pub fn is_unsupported_protocol(&self) -> bool {
        matches!(
            self,
            StorageError::Codec(CodecError::UnsupportedProtocol { .. })
        )
    }
}

/// A capability the engine consults is not ready to answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{capability} unavailable: {reason}")]
pub struct CapabilityUnavailable {
    pub capability: &'static str,
    pub reason: String,
}

impl CapabilityUnavailable {
    pub fn new(capability: &'static str, reason: impl Into<String>) -> Self {
        Self {
            capability,
            reason: reason.into(),
        }
    }
}

/// A configuration descriptor was rejected. Loading is all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("read config file failed ({path}): {message}")]
    ReadConfigFile { path: String, message: String },
    #[error("parse config file failed ({path}): {message}")]
    ParseConfigFile { path: String, message: String },
    #[error("{section}.{id}: {field} is invalid ({value}): {reason}")]
    InvalidField {
        section: &'static str,
        id: String,
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        id: &str,
        field: &'static str,
        value: impl ToString,
        reason: &'static str,
    ) -> Self {
        ConfigError::InvalidField {
            section,
            id: id.to_string(),
            field,
            value: value.to_string(),
            reason,
        }
    }
}

/// Engine setup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("zone {zone_id} is already registered")]
    DuplicateZone { zone_id: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
