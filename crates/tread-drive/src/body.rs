//! The seam between the drive model and the physics engine's bodies.

use core::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tread_kinematics::Pose;

/// A collection of engine-owned rigid bodies addressable by name.
///
/// Handles are opaque and may stop being valid between ticks; the model
/// never creates or destroys bodies, it only overwrites transforms.
pub trait BodyStore {
    type Handle: Copy + Debug;

    /// Looks up the body currently registered under `name`.
    fn resolve(&self, name: &str) -> Option<Self::Handle>;

    /// Replaces the body's transform with `pose`.
    fn set_transform(&mut self, handle: Self::Handle, pose: Pose) -> Result<(), StaleHandle>;
}

/// Returned when a handle no longer refers to a live body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("body handle no longer refers to a live body")]
pub struct StaleHandle;

/// When the model looks its body up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvePolicy {
    /// Look the body up before every step.
    #[default]
    EveryStep,
    /// Keep the handle from the last lookup until it goes stale or the host
    /// calls [`DiffDrive::invalidate_body`](crate::DiffDrive::invalidate_body).
    Cached,
}
