//! Globe orientation
//!
//! Turns drag gestures and crown (wheel) input into the globe's transform.

use bevy::prelude::*;

pub mod controller;
pub mod systems;

pub use controller::{DragPhase, OrientationConfig, OrientationController, OrientationState};

/// Plugin for drag/crown driven globe orientation
pub struct OrientationPlugin;

impl Plugin for OrientationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OrientationConfig>()
            .init_resource::<OrientationController>()
            .add_systems(Startup, systems::setup_orientation_controller)
            .add_systems(
                Update,
                (
                    systems::drag_globe,
                    systems::crown_input,
                    systems::apply_globe_transform,
                )
                    .chain(),
            );
    }
}
