//! Visualization module
//!
//! Globe and marker meshes, lighting and debug axes.

use bevy::prelude::*;

pub mod axes;
pub mod globe;
pub mod lighting;

pub use axes::{ShowAxes, draw_axes, toggle_axes};
pub use globe::{GlobeConfig, GlobePlugin, GlobeRoot, IssMarker};
pub use lighting::SunLight;

/// Plugin for visualization systems
pub struct VisualizationPlugin;

impl Plugin for VisualizationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(GlobePlugin)
            .add_systems(Startup, lighting::spawn_lighting)
            .add_systems(Update, (toggle_axes, draw_axes).chain());
    }
}
