//! Best-effort debug visualization side channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tread_kinematics::Pose;

/// Linear RGBA colour, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl From<[f32; 4]> for Rgba {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Rgba { r, g, b, a }
    }
}

/// One body drawn on a named debug layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizRecord {
    pub layer: String,
    pub pose: Pose,
    pub color: Rgba,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VizError {
    /// Nobody is listening on the layer.
    #[error("no subscribers for debug layer `{0}`")]
    NoSubscribers(String),
    #[error("debug sink rejected record: {0}")]
    Rejected(String),
}

/// Receives debug drawings from models. Failures are logged by the caller
/// and otherwise ignored.
pub trait DebugSink: Send {
    /// Clears everything previously drawn on `layer`.
    fn reset(&mut self, layer: &str) -> Result<(), VizError>;

    fn visualize(&mut self, record: VizRecord) -> Result<(), VizError>;
}
