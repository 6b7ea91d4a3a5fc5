use serde::{Deserialize, Serialize};

use crate::body::ResolvePolicy;

/// Per-model settings, usually read from the `[drive]` table of the host's
/// configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Name of the body whose transform the model drives.
    pub body: String,
    /// Multiplies the tick's step size before integrating.
    pub speed_factor: f64,
    /// Topic the host should forward velocity commands from.
    pub cmd_topic: String,
    pub resolve: ResolvePolicy,
    pub viz_layer: String,
    pub viz_color: [f32; 4],
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            body: "base".to_string(),
            speed_factor: 1.0,
            cmd_topic: "cmd_vel".to_string(),
            resolve: ResolvePolicy::EveryStep,
            viz_layer: "diffbody".to_string(),
            viz_color: [1.0, 1.0, 1.0, 0.5],
        }
    }
}
