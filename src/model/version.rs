use serde::{Deserialize, Serialize};

/// Payload of the version-check endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
}
