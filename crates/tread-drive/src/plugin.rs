use crate::body::BodyStore;
use crate::error::DriveError;
use crate::time::Timekeeper;

/// Lifecycle hooks a simulation host drives for each model plugin.
///
/// The host constructs the plugin, calls [`on_initialize`](Self::on_initialize)
/// once, then calls the step hooks around every physics step until it drops
/// the plugin.
pub trait ModelPlugin<S: BodyStore> {
    fn name(&self) -> &str;

    /// Binds the plugin to bodies in `bodies`. An error leaves the plugin
    /// inert; the simulation carries on without it.
    fn on_initialize(&mut self, bodies: &S) -> Result<(), DriveError>;

    fn before_physics_step(&mut self, timekeeper: &Timekeeper, bodies: &mut S);

    fn after_physics_step(&mut self, _timekeeper: &Timekeeper, _bodies: &mut S) {}
}
