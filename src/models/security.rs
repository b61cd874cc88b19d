use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PinSetupRequest {
    pub pin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinChangeRequest {
    pub current_pin: String,
    pub new_pin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinVerifyRequest {
    pub pin: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinActionResponse {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityStatusResponse {
    pub pin_set: bool,
    pub locked_until: Option<String>,
    pub failed_attempts: i32,
}
