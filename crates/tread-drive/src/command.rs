use parking_lot::RwLock;
use std::sync::Arc;

use tread_kinematics::Twist;

/// The latest command plus how many commands had arrived when it was stored.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommandSnapshot {
    /// Linear and angular velocity, always from the same command.
    pub twist: Twist,
    /// Zero until the first command arrives.
    pub seq: u64,
}

/// Latest-value slot for velocity commands.
///
/// Cloning yields another handle to the same slot, so a transport callback
/// and the integrator can each own one. Writers overwrite the whole pair and
/// readers copy it out under the same lock, so a reader never sees the linear
/// part of one command with the angular part of another.
#[derive(Debug, Clone, Default)]
pub struct CommandIngress {
    slot: Arc<RwLock<CommandSnapshot>>,
}

impl CommandIngress {
    /// Creates a slot holding the zero command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `(linear, angular)` as the current command.
    ///
    /// Values are taken as-is: no clamping, NaN passes through.
    pub fn on_command(&self, linear: f64, angular: f64) {
        self.publish(Twist::new(linear, angular));
    }

    /// Replaces the current command with `twist` and bumps the sequence
    /// number.
    pub fn publish(&self, twist: Twist) {
        let mut slot = self.slot.write();
        slot.twist = twist;
        slot.seq = slot.seq.wrapping_add(1);
    }

    /// The most recent command.
    pub fn current(&self) -> Twist {
        self.slot.read().twist
    }

    /// Copies out the command and its sequence number together.
    pub fn snapshot(&self) -> CommandSnapshot {
        *self.slot.read()
    }
}
