mod blackboard; // shared host status
mod bus; // tokio broadcast topics
mod config; // settings loading
mod graphics; // macroquad debug renderer
mod sim; // fixed-step host loop
mod teleop; // scripted commands and the command forwarder

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

use tread_drive::{BodyWorld, CommandIngress, DiffDrive, ModelPlugin};

use crate::blackboard::{Blackboard, snapshot};
use crate::bus::Topic;
use crate::config::{DEFAULT_CONFIG_PATH, Settings, load_config};
use crate::graphics::{TopicSink, VizEvent};
use crate::sim::Simulation;
use crate::teleop::VelocityCommand;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let settings = load_config(DEFAULT_CONFIG_PATH).context("loading configuration")?;
    settings.validate().context("validating configuration")?;

    info!("Tread simulation starting. Setting up Tokio runtime and physics thread...");
    let tokio_rt = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let bb: Blackboard = Arc::default();

    // Transport side: scripted teleop → command topic → ingress.
    let ingress = CommandIngress::new();
    let cmd_topic: Topic<VelocityCommand> = Topic::new(&settings.drive.cmd_topic, settings.sim.topic_capacity);
    tokio_rt.spawn(log_task_exit(
        "command forwarder",
        teleop::forward_commands(cmd_topic.subscribe(), ingress.clone(), bb.clone()),
    ));
    tokio_rt.spawn(log_task_exit(
        "teleop script",
        teleop::run_script(settings.teleop.commands.clone(), cmd_topic),
    ));

    if settings.sim.headless {
        let mut sim = build_simulation(&settings, ingress, None, bb.clone());
        sim.run_for(settings.sim.duration);
        let state = snapshot(&bb);
        info!(
            pose = %state.pose,
            ticks = sim.timekeeper().ticks(),
            committed = ?sim.world().transform(&settings.drive.body),
            faults = ?state.faults,
            "Headless run complete."
        );
        return Ok(());
    }

    let viz_topic: Topic<VizEvent> = Topic::new("debug_viz", settings.sim.topic_capacity * 4);
    let viz_rx = viz_topic.subscribe();
    let mut sim = build_simulation(&settings, ingress, Some(TopicSink::new(viz_topic)), bb.clone());
    let duration = settings.sim.duration;

    info!("Spawning physics thread...");
    std::thread::Builder::new()
        .name("physics".into())
        .spawn(move || sim.run_for(duration))
        .context("spawning physics thread")?;

    // Returns when the physics thread drops the debug topic or the window closes.
    macroquad::Window::from_config(
        graphics::window_conf(),
        graphics::run_visualization_loop(viz_rx, bb),
    );
    drop(tokio_rt);
    Ok(())
}

fn build_simulation(
    settings: &Settings,
    ingress: CommandIngress,
    sink: Option<TopicSink>,
    bb: Blackboard,
) -> Simulation {
    let mut sim = Simulation::new(&settings.sim, &settings.drive.body, bb);
    let mut drive: DiffDrive<BodyWorld> = DiffDrive::new("diff_drive", settings.drive.clone(), ingress);
    if let Some(sink) = sink {
        drive = drive.with_debug_sink(sink);
    }
    info!(plugin = drive.name(), body = %settings.drive.body, "Adding drive plugin.");
    sim.add_plugin(Box::new(drive));
    sim
}

async fn log_task_exit(task: &'static str, fut: impl Future<Output = anyhow::Result<()>>) {
    match fut.await {
        Ok(()) => info!("{} finished.", task),
        Err(e) => error!("{} failed: {:?}", task, e),
    }
}
