use serde::{Deserialize, Serialize};

/// Parameters needed to reach a tenant's own API endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConnection {
    /// API endpoint of the tenant control plane (e.g. `"https://10.0.0.1:6443"`).
    pub endpoint: String,
    /// PEM bundle of the tenant certificate authority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
    /// Credential presented to the tenant endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl TenantConnection {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ca_bundle: None,
            token: None,
        }
    }

    pub fn with_ca_bundle(mut self, ca_bundle: impl Into<String>) -> Self {
        self.ca_bundle = Some(ca_bundle.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}
