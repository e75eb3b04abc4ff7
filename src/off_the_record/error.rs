use crate::attribute::EntryPoint;
use crate::input::ForbiddenAttributesError;
use crate::typecaster::TypeTag;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OtrError {
    #[error("Attribute named {0:?} already exists")]
    DuplicateAttribute(String),

    #[error("Invalid attribute name {0:?}")]
    InvalidName(String),

    #[error("Unknown options for attribute {attribute:?}: {keys:?}")]
    UnrecognizedOptions {
        attribute: String,
        keys: Vec<String>,
    },

    #[error("Invalid value for option {key:?} on attribute {attribute:?}: {reason}")]
    InvalidOption {
        attribute: String,
        key: String,
        reason: String,
    },

    #[error("No typecaster for type {tag} (attribute {attribute:?})")]
    UnknownTypeTag { attribute: String, tag: TypeTag },

    #[error("Feature {feature} contributed a {found} layer to the {entry} entry point")]
    LayerMismatch {
        feature: &'static str,
        entry: EntryPoint,
        found: &'static str,
    },

    #[error("Unknown attribute {attribute:?} for model {model}")]
    UnknownAttribute { model: String, attribute: String },

    #[error("Attribute {attribute:?} has no {entry} accessor")]
    NoAccessor {
        attribute: String,
        entry: EntryPoint,
    },

    #[error(transparent)]
    ForbiddenAttributes(#[from] ForbiddenAttributesError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, OtrError>;
