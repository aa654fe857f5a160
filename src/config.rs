//! Client voice configuration

use serde::{Deserialize, Serialize};

/// Configuration for the voice streaming client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Relay server hostname, resolved once at worker startup.
    pub server_host: String,

    /// Relay server UDP port.
    pub server_port: u16,

    /// Capture device name, or "Default" for the platform default input.
    pub input_device_name: String,

    /// Gain applied to captured samples before clamping to [-1, 1].
    pub initial_volume_scale: f32,

    /// This client's avatar UID; the low 32 bits identify the sender on
    /// the wire.
    pub client_avatar_uid: u64,
}

impl VoiceConfig {
    /// Name selecting the platform default input device.
    pub const DEFAULT_DEVICE: &'static str = "Default";
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            server_host: "localhost".to_string(),
            server_port: 7700,
            input_device_name: Self::DEFAULT_DEVICE.to_string(),
            initial_volume_scale: 1.0,
            client_avatar_uid: 0,
        }
    }
}
