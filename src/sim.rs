use std::time::{Duration, Instant};

use spin_sleep::SpinSleeper;
use tracing::{error, info};

use tread_drive::{BodyWorld, ModelPlugin, Timekeeper};

use crate::blackboard::{Blackboard, raise_fault};
use crate::config::SimConfig;

pub type Plugin = Box<dyn ModelPlugin<BodyWorld> + Send>;

/// Fixed-step host: a world of bodies, a clock and the model plugins that
/// act on them.
pub struct Simulation {
    world: BodyWorld,
    timekeeper: Timekeeper,
    plugins: Vec<Plugin>,
    watched_body: String,
    realtime: bool,
    bb: Blackboard,
}

impl Simulation {
    /// `watched_body` is the body whose transform gets mirrored to the blackboard.
    pub fn new(cfg: &SimConfig, watched_body: &str, bb: Blackboard) -> Self {
        Simulation {
            world: BodyWorld::with_bodies(&cfg.bodies),
            timekeeper: Timekeeper::new(cfg.step_size),
            plugins: Vec::new(),
            watched_body: watched_body.to_string(),
            realtime: cfg.realtime,
            bb,
        }
    }

    /// Initializes `plugin` against the world. A plugin that fails is kept
    /// but stays inert, and the failure is raised as a fault.
    pub fn add_plugin(&mut self, mut plugin: Plugin) {
        match plugin.on_initialize(&self.world) {
            Ok(()) => info!(plugin = plugin.name(), "Plugin initialized."),
            Err(e) => {
                error!(plugin = plugin.name(), error = %e, "Plugin failed to initialize.");
                raise_fault(&self.bb, &format!("{}: {}", plugin.name(), e));
            }
        }
        self.plugins.push(plugin);
    }

    pub fn world(&self) -> &BodyWorld {
        &self.world
    }

    pub fn timekeeper(&self) -> &Timekeeper {
        &self.timekeeper
    }

    /// Runs one tick: plugin pre-step hooks, the (transform-only) physics
    /// step, post-step hooks, then publishes status.
    pub fn step(&mut self) {
        for plugin in &mut self.plugins {
            plugin.before_physics_step(&self.timekeeper, &mut self.world);
        }
        for plugin in &mut self.plugins {
            plugin.after_physics_step(&self.timekeeper, &mut self.world);
        }
        self.timekeeper.advance();

        let mut g = self.bb.write();
        if let Some(pose) = self.world.transform(&self.watched_body) {
            g.pose = pose;
        }
        g.tick = self.timekeeper.ticks();
        g.sim_time = self.timekeeper.time();
    }

    /// Steps until `duration` seconds of simulated time have passed, paced
    /// to the wall clock unless `realtime` is off.
    pub fn run_for(&mut self, duration: f64) {
        let sleeper = self.realtime.then(|| SpinSleeper::new(100_000));
        let start = Instant::now();
        info!(
            duration,
            step_size = self.timekeeper.step_size(),
            realtime = self.realtime,
            "Simulation loop started."
        );

        while self.timekeeper.time() < duration {
            self.step();
            let Some(sleeper) = &sleeper else {
                continue;
            };
            match Duration::try_from_secs_f64(self.timekeeper.time()) {
                Ok(offset) => sleeper.sleep((start + offset).saturating_duration_since(Instant::now())),
                Err(e) => {
                    error!(sim_time = self.timekeeper.time(), error = %e, "Clock left the representable range; stopping.");
                    break;
                }
            }
        }

        info!(
            ticks = self.timekeeper.ticks(),
            sim_time = self.timekeeper.time(),
            wall_time = ?start.elapsed(),
            "Simulation loop finished."
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::snapshot;
    use std::sync::Arc;
    use tread_drive::{CommandIngress, DiffDrive, DriveConfig};

    fn drive(config: DriveConfig, ingress: &CommandIngress) -> Plugin {
        Box::new(DiffDrive::<BodyWorld>::new("diff_drive", config, ingress.clone()))
    }

    #[test]
    fn test_step_mirrors_watched_body() {
        let bb: Blackboard = Arc::default();
        let cfg = SimConfig { step_size: 0.1, ..SimConfig::default() };
        let mut sim = Simulation::new(&cfg, "base", bb.clone());
        let ingress = CommandIngress::new();
        sim.add_plugin(drive(DriveConfig::default(), &ingress));

        ingress.on_command(1.0, 0.0);
        for _ in 0..10 {
            sim.step();
        }

        let state = snapshot(&bb);
        assert_eq!(state.tick, 10);
        assert!((state.sim_time - 1.0).abs() < 1e-9);
        assert!((state.pose.y - 1.0).abs() < 1e-9);
        assert_eq!(Some(state.pose), sim.world().transform("base"));
        assert!(state.faults.is_empty());
    }

    #[test]
    fn test_failed_plugin_raises_fault_and_stays_inert() {
        let bb: Blackboard = Arc::default();
        let mut sim = Simulation::new(&SimConfig::default(), "base", bb.clone());
        let ingress = CommandIngress::new();
        let config = DriveConfig { body: "chassis".into(), ..DriveConfig::default() };
        sim.add_plugin(drive(config, &ingress));

        ingress.on_command(1.0, 1.0);
        sim.step();

        let state = snapshot(&bb);
        assert_eq!(state.faults.len(), 1);
        assert!(state.faults[0].contains("chassis"));
        assert_eq!(sim.world().transform("base"), Some(Default::default()));
    }

    #[test]
    fn test_run_for_stops_at_duration() {
        let bb: Blackboard = Arc::default();
        let cfg = SimConfig { step_size: 0.01, ..SimConfig::default() };
        let mut sim = Simulation::new(&cfg, "base", bb);
        sim.run_for(0.05);
        assert!(sim.timekeeper().time() >= 0.05 - 1e-9);
        assert!(sim.timekeeper().ticks() <= 6);
    }

    #[test]
    fn test_unpaced_run_finishes_well_under_duration() {
        let bb: Blackboard = Arc::default();
        let cfg = SimConfig { step_size: 0.01, realtime: false, ..SimConfig::default() };
        let mut sim = Simulation::new(&cfg, "base", bb.clone());
        let ingress = CommandIngress::new();
        sim.add_plugin(drive(DriveConfig::default(), &ingress));
        ingress.on_command(1.0, 0.0);

        let started = Instant::now();
        sim.run_for(2.0);
        assert!(started.elapsed() < Duration::from_millis(500), "took {:?}", started.elapsed());
        assert!(sim.timekeeper().time() >= 2.0 - 1e-9);
        assert!((snapshot(&bb).pose.y - sim.timekeeper().time()).abs() < 1e-6);
    }

    #[test]
    fn test_unrepresentable_clock_stops_the_loop() {
        let bb: Blackboard = Arc::default();
        let cfg = SimConfig { step_size: f64::INFINITY, ..SimConfig::default() };
        let mut sim = Simulation::new(&cfg, "base", bb);
        sim.run_for(1.0);
        assert_eq!(sim.timekeeper().ticks(), 1);
    }
}
