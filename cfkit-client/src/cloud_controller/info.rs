use serde::{Deserialize, Serialize};

/// The target's `/v2/info` document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiInfo {
    pub name: String,
    pub api_version: String,
    /// Login server URL.
    pub authorization_endpoint: String,
    /// Identity service URL used for tokens.
    pub token_endpoint: String,
    pub min_cli_version: Option<String>,
    pub min_recommended_cli_version: Option<String>,
    #[serde(rename = "doppler_logging_endpoint")]
    pub doppler_endpoint: Option<String>,
    pub routing_endpoint: Option<String>,
}
