use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use tread_drive::CommandIngress;
use tread_kinematics::Twist;

use crate::blackboard::{Blackboard, touch_cmd};
use crate::bus::Topic;

/// Velocity command message as it travels on the command topic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityCommand {
    pub linear_velocity: f64,
    pub angular_velocity: f64,
}

/// A command to publish `at` seconds after the script starts.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScriptedCommand {
    pub at: f64,
    pub linear_velocity: f64,
    pub angular_velocity: f64,
}

/// Publishes each scripted command on `topic` at its scheduled time.
///
/// Negative times fire immediately. Entries whose time is not a finite
/// number are skipped.
pub async fn run_script(mut script: Vec<ScriptedCommand>, topic: Topic<VelocityCommand>) -> anyhow::Result<()> {
    info!(commands = script.len(), topic = topic.name(), "Teleop script started.");
    script.sort_by(|a, b| a.at.total_cmp(&b.at));
    let start = Instant::now();

    for cmd in script {
        let offset = (!cmd.at.is_nan())
            .then(|| Duration::try_from_secs_f64(cmd.at.max(0.0)).ok())
            .flatten();
        let Some(offset) = offset else {
            warn!(at = cmd.at, "Skipping scripted command with unusable time");
            continue;
        };
        sleep_until(start + offset).await;
        let delivered = topic.publish(VelocityCommand {
            linear_velocity: cmd.linear_velocity,
            angular_velocity: cmd.angular_velocity,
        });
        info!(at = cmd.at, linear = cmd.linear_velocity, angular = cmd.angular_velocity, delivered, "Published velocity command");
    }

    info!("Teleop script finished.");
    Ok(())
}

/// Feeds every message from the command topic into the model's ingress.
///
/// Returns once all publishers are gone. Lagging is harmless: only the
/// latest command matters, and the receiver resumes from the oldest one
/// still buffered.
pub async fn forward_commands(
    mut rx: broadcast::Receiver<Arc<VelocityCommand>>,
    ingress: CommandIngress,
    bb: Blackboard,
) -> anyhow::Result<()> {
    info!("Command forwarder started.");
    loop {
        match rx.recv().await {
            Ok(msg) => {
                ingress.on_command(msg.linear_velocity, msg.angular_velocity);
                touch_cmd(&bb, Twist::new(msg.linear_velocity, msg.angular_velocity));
                debug!(?msg, "Forwarded velocity command");
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Command receiver lagged by {} messages.", n);
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("Command topic closed; forwarder exiting.");
                return Ok(());
            }
        }
    }
}
