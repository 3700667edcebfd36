//! UI state management

use bevy::prelude::*;

/// Main UI state resource
#[derive(Resource, Default)]
pub struct UiState {
    pub show_axes: bool,
}
