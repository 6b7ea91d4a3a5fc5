use std::collections::BTreeMap;
use std::sync::Arc;

use macroquad::prelude::*;
use tokio::sync::broadcast;
use tracing::{info, warn};

use tread_drive::{DebugSink, VizError, VizRecord};

use crate::blackboard::{Blackboard, snapshot};
use crate::bus::Topic;

const VIS_SCALE: f32 = 50.0; // pixels per world unit
const ROBOT_SIZE: f32 = 15.0; // pixels

/// What a [`TopicSink`] puts on the debug topic.
#[derive(Debug, Clone)]
pub enum VizEvent {
    Reset(String),
    Draw(VizRecord),
}

/// Debug sink that forwards records to the renderer over a topic.
pub struct TopicSink {
    topic: Topic<VizEvent>,
}

impl TopicSink {
    pub fn new(topic: Topic<VizEvent>) -> Self {
        Self { topic }
    }

    fn send(&self, layer: &str, event: VizEvent) -> Result<(), VizError> {
        match self.topic.publish(event) {
            0 => Err(VizError::NoSubscribers(layer.to_string())),
            _ => Ok(()),
        }
    }
}

impl DebugSink for TopicSink {
    fn reset(&mut self, layer: &str) -> Result<(), VizError> {
        self.send(layer, VizEvent::Reset(layer.to_string()))
    }

    fn visualize(&mut self, record: VizRecord) -> Result<(), VizError> {
        let layer = record.layer.clone();
        self.send(&layer, VizEvent::Draw(record))
    }
}

// Function to configure the macroquad window
pub fn window_conf() -> Conf {
    Conf {
        window_title: "Tread Simulation".to_string(),
        window_width: 800,
        window_height: 600,
        high_dpi: true,
        ..Default::default()
    }
}

/// Draws debug layers until the debug topic closes or Escape is pressed.
pub async fn run_visualization_loop(mut viz_rx: broadcast::Receiver<Arc<VizEvent>>, bb: Blackboard) {
    let mut layers: BTreeMap<String, Vec<VizRecord>> = BTreeMap::new();
    info!("Visualization loop starting inside graphics module...");

    'frames: loop {
        loop {
            match viz_rx.try_recv() {
                Ok(event) => apply(&mut layers, &event),
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Visualization receiver lagged by {} events.", n);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    info!("Debug topic closed. Exiting visualization loop.");
                    break 'frames;
                }
            }
        }
        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        clear_background(LIGHTGRAY);
        let origin = vec2(screen_width() / 2.0, screen_height() / 2.0);
        draw_line(0.0, origin.y, screen_width(), origin.y, 1.0, GRAY);
        draw_line(origin.x, 0.0, origin.x, screen_height(), 1.0, GRAY);

        for record in layers.values().flatten() {
            draw_robot(origin, record);
        }

        let state = snapshot(&bb);
        draw_text(
            &format!("t={:.2}s tick={}  pose {}", state.sim_time, state.tick, state.pose),
            10.0,
            20.0,
            20.0,
            BLACK,
        );
        let cmd_age = match state.last_cmd_ts {
            Some(ts) => format!("{:.1}s ago", ts.elapsed().as_secs_f32()),
            None => "none yet".to_string(),
        };
        draw_text(&format!("cmd {} ({})", state.twist, cmd_age), 10.0, 40.0, 20.0, BLACK);
        for (i, fault) in state.faults.iter().enumerate() {
            draw_text(fault, 10.0, 60.0 + 20.0 * i as f32, 20.0, RED);
        }

        next_frame().await
    }
}

fn apply(layers: &mut BTreeMap<String, Vec<VizRecord>>, event: &VizEvent) {
    match event {
        VizEvent::Reset(layer) => {
            if let Some(records) = layers.get_mut(layer) {
                records.clear();
            }
        }
        VizEvent::Draw(record) => layers.entry(record.layer.clone()).or_default().push(record.clone()),
    }
}

fn draw_robot(origin: Vec2, record: &VizRecord) {
    // Screen y grows downward.
    let center = vec2(
        origin.x + record.pose.x as f32 * VIS_SCALE,
        origin.y - record.pose.y as f32 * VIS_SCALE,
    );
    let (fx, fy) = record.pose.forward();
    let heading = f32::atan2(-fy as f32, fx as f32);
    let corner = |offset: f32| {
        center + vec2((heading + offset).cos(), (heading + offset).sin()) * ROBOT_SIZE
    };
    let (p1, p2, p3) = (
        corner(0.0),
        corner(2.0 * std::f32::consts::PI / 3.0),
        corner(-2.0 * std::f32::consts::PI / 3.0),
    );

    let c = record.color;
    // The default layer colour is translucent white; outline it so it shows up.
    draw_triangle(p1, p2, p3, Color::new(c.r, c.g, c.b, c.a));
    draw_triangle_lines(p1, p2, p3, 1.5, DARKBLUE);
    draw_line(center.x, center.y, p1.x, p1.y, 2.0, DARKBLUE);
}
