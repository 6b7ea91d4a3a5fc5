use tracing::{debug, error, info, trace, warn};

use tread_kinematics::{Pose, effective_dt, integrate};

use crate::body::{BodyStore, ResolvePolicy};
use crate::command::CommandIngress;
use crate::config::DriveConfig;
use crate::error::DriveError;
use crate::plugin::ModelPlugin;
use crate::time::Timekeeper;
use crate::viz::{DebugSink, VizRecord};

#[derive(Debug)]
enum DriveState<H> {
    Uninitialized,
    /// `handle` is `None` when the body has to be looked up again.
    Active { handle: Option<H> },
}

/// Kinematic differential-drive model.
///
/// Owns the robot's pose and is the only writer of its body's transform:
/// every step overwrites whatever the engine did to the body in between.
pub struct DiffDrive<S: BodyStore> {
    name: String,
    config: DriveConfig,
    ingress: CommandIngress,
    pose: Pose,
    state: DriveState<S::Handle>,
    last_seq: u64,
    viz: Option<Box<dyn DebugSink>>,
}

impl<S: BodyStore> DiffDrive<S> {
    pub fn new(name: impl Into<String>, config: DriveConfig, ingress: CommandIngress) -> Self {
        DiffDrive {
            name: name.into(),
            config,
            ingress,
            pose: Pose::default(),
            state: DriveState::Uninitialized,
            last_seq: 0,
            viz: None,
        }
    }

    /// Attaches a debug sink that receives the body's pose after every step.
    pub fn with_debug_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.viz = Some(Box::new(sink));
        self
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Handle for whatever transport delivers commands to this model.
    pub fn ingress(&self) -> &CommandIngress {
        &self.ingress
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, DriveState::Active { .. })
    }

    /// Resolves the configured body and resets the pose to the origin.
    ///
    /// # Errors
    ///
    /// Returns `Err(DriveError::BodyNotFound)` if the body is not in `bodies`;
    /// the model then stays inert. Returns `Err(DriveError::AlreadyInitialized)`
    /// if the model is already active.
    pub fn initialize(&mut self, bodies: &S) -> Result<(), DriveError> {
        if self.is_active() {
            return Err(DriveError::AlreadyInitialized { model: self.name.clone() });
        }

        let Some(handle) = bodies.resolve(&self.config.body) else {
            error!(model = %self.name, body = %self.config.body, "Body not found; model disabled");
            return Err(DriveError::BodyNotFound { name: self.config.body.clone() });
        };

        self.pose = Pose::default();
        self.state = DriveState::Active { handle: Some(handle) };
        info!(
            model = %self.name,
            body = %self.config.body,
            speed_factor = self.config.speed_factor,
            resolve = ?self.config.resolve,
            "DiffDrive initialized"
        );
        Ok(())
    }

    /// Forces the next step to look the body up by name again.
    pub fn invalidate_body(&mut self) {
        if let DriveState::Active { handle } = &mut self.state {
            *handle = None;
        }
    }

    /// Advances the pose by one tick and writes it to the body.
    ///
    /// `elapsed` is the tick's step size and `speed_factor` scales it. The
    /// command is read once, at the start of the step. Does nothing before a
    /// successful [`initialize`](Self::initialize). If the body can no longer
    /// be found the tick is skipped and the pose is left as it was.
    pub fn step(&mut self, bodies: &mut S, elapsed: f64, speed_factor: f64) {
        if !self.is_active() {
            trace!(model = %self.name, "Step ignored: model not initialized");
            return;
        }
        let Some(handle) = self.body_handle(bodies) else {
            warn!(model = %self.name, body = %self.config.body, "Body missing; skipping step");
            return;
        };

        let command = self.ingress.snapshot();
        if command.seq != self.last_seq {
            debug!(model = %self.name, twist = %command.twist, stop = command.twist.is_zero(), "New velocity command");
            self.last_seq = command.seq;
        }

        let next = integrate(self.pose, command.twist, effective_dt(elapsed, speed_factor));

        if bodies.set_transform(handle, next).is_err() {
            // The engine replaced the body after we looked it up.
            self.invalidate_body();
            let retried = self
                .body_handle(bodies)
                .is_some_and(|h| bodies.set_transform(h, next).is_ok());
            if !retried {
                warn!(model = %self.name, body = %self.config.body, "Body went stale; skipping step");
                return;
            }
        }

        self.pose = next;
        trace!(model = %self.name, pose = %self.pose, twist = %command.twist, elapsed, "Stepped");
        self.emit_viz();
    }

    fn body_handle(&mut self, bodies: &S) -> Option<S::Handle> {
        let DriveState::Active { handle } = &mut self.state else {
            return None;
        };
        match (self.config.resolve, *handle) {
            (ResolvePolicy::Cached, Some(cached)) => Some(cached),
            _ => {
                *handle = bodies.resolve(&self.config.body);
                *handle
            }
        }
    }

    fn emit_viz(&mut self) {
        let Some(sink) = self.viz.as_mut() else {
            return;
        };
        let layer = &self.config.viz_layer;
        let record = VizRecord {
            layer: layer.clone(),
            pose: self.pose,
            color: self.config.viz_color.into(),
        };
        if let Err(e) = sink.reset(layer).and_then(|()| sink.visualize(record)) {
            debug!(model = %self.name, layer = %layer, error = %e, "Debug visualization dropped");
        }
    }
}

impl<S: BodyStore> ModelPlugin<S> for DiffDrive<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_initialize(&mut self, bodies: &S) -> Result<(), DriveError> {
        self.initialize(bodies)
    }

    fn before_physics_step(&mut self, timekeeper: &Timekeeper, bodies: &mut S) {
        let speed_factor = self.config.speed_factor;
        self.step(bodies, timekeeper.step_size(), speed_factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viz::VizError;
    use crate::world::BodyWorld;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tread_kinematics::Twist;

    const EPSILON: f64 = 1e-9;

    fn active_drive(world: &BodyWorld, config: DriveConfig) -> DiffDrive<BodyWorld> {
        let mut drive = DiffDrive::new("diff_drive", config, CommandIngress::new());
        drive.initialize(world).unwrap();
        drive
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
        poses: Arc<Mutex<Vec<Pose>>>,
    }

    impl DebugSink for Recorder {
        fn reset(&mut self, layer: &str) -> Result<(), VizError> {
            self.events.lock().push(format!("reset {layer}"));
            Ok(())
        }

        fn visualize(&mut self, record: VizRecord) -> Result<(), VizError> {
            self.events.lock().push(format!("draw {}", record.layer));
            self.poses.lock().push(record.pose);
            Ok(())
        }
    }

    struct Broken;

    impl DebugSink for Broken {
        fn reset(&mut self, layer: &str) -> Result<(), VizError> {
            Err(VizError::NoSubscribers(layer.to_string()))
        }

        fn visualize(&mut self, _record: VizRecord) -> Result<(), VizError> {
            Err(VizError::Rejected("closed".into()))
        }
    }

    #[test]
    fn test_step_before_initialize_is_a_no_op() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let mut drive: DiffDrive<BodyWorld> =
            DiffDrive::new("diff_drive", DriveConfig::default(), CommandIngress::new());
        drive.ingress().on_command(1.0, 1.0);
        drive.step(&mut world, 1.0, 1.0);
        assert!(!drive.is_active());
        assert_eq!(drive.pose(), Pose::default());
        assert_eq!(world.transform("base"), Some(Pose::default()));
    }

    #[test]
    fn test_initialize_resets_pose() {
        let world = BodyWorld::with_bodies(["base"]);
        let drive = active_drive(&world, DriveConfig::default());
        assert!(drive.is_active());
        assert_eq!(drive.pose(), Pose::default());
    }

    #[test]
    fn test_second_initialize_is_rejected() {
        let world = BodyWorld::with_bodies(["base"]);
        let mut drive = active_drive(&world, DriveConfig::default());
        assert_eq!(
            drive.initialize(&world),
            Err(DriveError::AlreadyInitialized { model: "diff_drive".into() })
        );
        assert!(drive.is_active());
        let err = drive.initialize(&world).unwrap_err();
        assert_eq!(err.to_string(), "model `diff_drive` is already initialized");
    }

    #[test]
    fn test_transform_matches_pose_after_every_step() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let mut drive = active_drive(&world, DriveConfig::default());
        drive.ingress().on_command(0.7, 0.3);
        for i in 0..50 {
            drive.step(&mut world, 0.01 + 0.001 * i as f64, 1.0);
            assert_eq!(world.transform("base"), Some(drive.pose()));
        }
    }

    #[test]
    fn test_pivot_changes_heading_by_exactly_omega_dt() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let mut drive = active_drive(&world, DriveConfig::default());
        drive.ingress().on_command(0.0, 0.9);
        drive.step(&mut world, 0.5, 1.0);
        assert_eq!(drive.pose(), Pose::new(0.0, 0.0, 0.9 * 0.5));
    }

    #[test]
    fn test_second_command_wins() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let mut drive = active_drive(&world, DriveConfig::default());
        drive.ingress().on_command(5.0, 5.0);
        drive.ingress().on_command(1.0, 0.0);
        drive.step(&mut world, 1.0, 1.0);
        assert!((drive.pose().x - 0.0).abs() < EPSILON);
        assert!((drive.pose().y - 1.0).abs() < EPSILON);
        assert_eq!(drive.pose().theta, 0.0);
    }

    #[test]
    fn test_non_positive_elapsed_leaves_pose_unchanged() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let mut drive = active_drive(&world, DriveConfig::default());
        drive.ingress().publish(Twist::new(1.0, 1.0));
        drive.step(&mut world, 0.0, 1.0);
        drive.step(&mut world, -1.0, 1.0);
        assert_eq!(drive.pose(), Pose::default());
    }

    #[test]
    fn test_every_step_policy_follows_respawned_body() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let mut drive = active_drive(&world, DriveConfig::default());
        drive.ingress().on_command(1.0, 0.0);
        drive.step(&mut world, 1.0, 1.0);
        world.respawn("base");
        drive.step(&mut world, 1.0, 1.0);
        assert!((drive.pose().y - 2.0).abs() < EPSILON);
        assert_eq!(world.transform("base"), Some(drive.pose()));
    }

    #[test]
    fn test_cached_policy_recovers_from_stale_handle() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let config = DriveConfig { resolve: ResolvePolicy::Cached, ..DriveConfig::default() };
        let mut drive = active_drive(&world, config);
        drive.ingress().on_command(1.0, 0.0);
        world.respawn("base");
        drive.step(&mut world, 1.0, 1.0);
        assert!((drive.pose().y - 1.0).abs() < EPSILON);
        assert_eq!(world.transform("base"), Some(drive.pose()));
    }

    #[test]
    fn test_missing_body_skips_step() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let mut drive = active_drive(&world, DriveConfig::default());
        drive.ingress().on_command(1.0, 1.0);
        world.despawn("base");
        drive.step(&mut world, 1.0, 1.0);
        assert_eq!(drive.pose(), Pose::default());

        // Body comes back under the same name: stepping resumes from the held pose.
        world.spawn("base", Pose::new(7.0, 7.0, 7.0));
        drive.step(&mut world, 1.0, 1.0);
        assert_eq!(world.transform("base"), Some(drive.pose()));
        assert!((drive.pose().theta - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_debug_sink_gets_reset_then_draw() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let recorder = Recorder::default();
        let mut drive: DiffDrive<BodyWorld> =
            DiffDrive::new("diff_drive", DriveConfig::default(), CommandIngress::new())
                .with_debug_sink(recorder.clone());
        drive.initialize(&world).unwrap();
        drive.ingress().on_command(1.0, 0.0);
        drive.step(&mut world, 0.5, 1.0);

        assert_eq!(*recorder.events.lock(), vec!["reset diffbody", "draw diffbody"]);
        assert_eq!(*recorder.poses.lock(), vec![drive.pose()]);
    }

    #[test]
    fn test_failing_debug_sink_does_not_affect_step() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let mut drive: DiffDrive<BodyWorld> =
            DiffDrive::new("diff_drive", DriveConfig::default(), CommandIngress::new())
                .with_debug_sink(Broken);
        drive.initialize(&world).unwrap();
        drive.ingress().on_command(2.0, 0.0);
        drive.step(&mut world, 0.5, 1.0);
        assert!((drive.pose().y - 1.0).abs() < EPSILON);
        assert_eq!(world.transform("base"), Some(drive.pose()));
    }

    #[test]
    fn test_plugin_hook_applies_configured_speed_factor() {
        let mut world = BodyWorld::with_bodies(["base"]);
        let config = DriveConfig { speed_factor: 3.0, ..DriveConfig::default() };
        let mut drive: DiffDrive<BodyWorld> = DiffDrive::new("diff_drive", config, CommandIngress::new());
        drive.on_initialize(&world).unwrap();
        drive.ingress().on_command(1.0, 0.0);
        drive.before_physics_step(&Timekeeper::new(0.1), &mut world);
        assert!((drive.pose().y - 0.3).abs() < EPSILON);
        assert_eq!(ModelPlugin::<BodyWorld>::name(&drive), "diff_drive");
    }
}
