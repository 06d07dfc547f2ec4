use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown field '{field}' in {document}")]
    UnknownField { document: String, field: String },

    #[error("missing required field '{field}' in {document}")]
    MissingField { document: String, field: String },

    #[error("schema version {found} is not supported (expected {expected})")]
    UnsupportedSchemaVersion { found: String, expected: String },

    #[error(transparent)]
    CrossField(#[from] cleo_core::CoreError),
}
