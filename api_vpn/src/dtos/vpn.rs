use common::env_config::Config;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub key: String,
    pub client_public_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub key: String,
}

/// Connection descriptor handed to a client holding a valid key. Everything
/// the desktop side needs to render its tunnel config, short of the
/// client's own keypair and allocated address.
#[derive(Debug, Serialize)]
pub struct VpnConnectionInfo {
    pub server: String,
    pub port: u16,
    pub protocol: String,
    pub location: String,
    pub server_public_key: String,
}

impl VpnConnectionInfo {
    pub fn from_config(config: &Config) -> Self {
        VpnConnectionInfo {
            server: config.vpn.server_host.clone(),
            port: config.vpn.server_port,
            protocol: config.vpn.protocol.clone(),
            location: config.vpn.location.clone(),
            server_public_key: config.vpn.server_public_key.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<VpnConnectionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
