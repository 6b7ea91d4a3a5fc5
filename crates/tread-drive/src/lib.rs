//! Kinematic differential-drive model for a stepped 2-D physics simulation.
//!
//! A [`CommandIngress`] holds the latest velocity command delivered by any
//! transport. Once per tick the host calls [`DiffDrive::step`] (directly or via
//! the [`ModelPlugin`] hooks), which integrates that command into the robot's
//! pose and overwrites the transform of the named body in a [`BodyStore`].

pub mod body;
pub mod command;
pub mod config;
pub mod diff_drive;
pub mod error;
pub mod plugin;
pub mod time;
pub mod viz;
pub mod world;

pub use body::{BodyStore, ResolvePolicy, StaleHandle};
pub use command::{CommandIngress, CommandSnapshot};
pub use config::DriveConfig;
pub use diff_drive::DiffDrive;
pub use error::DriveError;
pub use plugin::ModelPlugin;
pub use time::Timekeeper;
pub use viz::{DebugSink, Rgba, VizError, VizRecord};
pub use world::{BodyKey, BodyWorld};

pub use tread_kinematics::{Pose, Twist};
