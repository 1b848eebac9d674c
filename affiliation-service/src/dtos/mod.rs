pub mod affiliation;

use serde::{Deserialize, Serialize};

/// GraphQL-style response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

/// Entry of the `errors` array. Only ever carries client-safe text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    pub path: Vec<String>,
}
