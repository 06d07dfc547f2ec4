use cleo_graph::GraphError;

/// Queries are pure reads over an in-memory snapshot; the only failure mode
/// is asking about a task id the graph doesn't know about.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Graph(#[from] GraphError),
}
