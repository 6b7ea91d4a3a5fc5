use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use tread_kinematics::{Pose, Twist};

/// Host-side status shared between the physics thread, the command
/// forwarder and the renderer.
#[derive(Clone, Default)]
pub struct State {
    /// Transform last committed to the watched body.
    pub pose: Pose,
    /// Last command forwarded to the model.
    pub twist: Twist,
    pub tick: u64,
    pub sim_time: f64,
    pub last_cmd_ts: Option<Instant>,
    pub faults: Vec<String>,
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn touch_cmd(bb: &Blackboard, twist: Twist) {
    let mut g = bb.write();
    g.twist = twist;
    g.last_cmd_ts = Some(Instant::now());
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}
