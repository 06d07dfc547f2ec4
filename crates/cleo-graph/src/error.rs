use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("adding dependency {from} -> {to} would introduce a cycle")]
    CircularDependency { from: String, to: String },

    #[error("task '{0}' is not present in the graph")]
    UnknownTask(String),
}
