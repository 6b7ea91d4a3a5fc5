//! Error types for the drive model.

use thiserror::Error;

/// Errors surfaced by the drive model to its host.
///
/// Per-step work never fails; only setting the model up can.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriveError {
    /// The configured body name does not exist in the model's body collection.
    /// The model stays uninitialized and every later step is a no-op.
    #[error("body `{name}` not found in the model's body collection")]
    BodyNotFound {
        /// Name that failed to resolve.
        name: String,
    },
    /// `initialize` was called on a model that is already active.
    #[error("model `{model}` is already initialized")]
    AlreadyInitialized {
        /// Name of the model plugin.
        model: String,
    },
}
