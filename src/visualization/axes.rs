//! Axes gizmo on the globe root, handy when checking drag composition.

use crate::ui::UiState;
use bevy::prelude::*;

/// Component marker for entities that should display axes
#[derive(Component)]
pub struct ShowAxes;

pub fn toggle_axes(keys: Res<ButtonInput<KeyCode>>, mut state: ResMut<UiState>) {
    if keys.just_pressed(KeyCode::KeyA) {
        state.show_axes = !state.show_axes;
    }
}

/// System to draw axes for entities with the ShowAxes component
pub fn draw_axes(
    mut gizmos: Gizmos,
    query: Query<&GlobalTransform, With<ShowAxes>>,
    state: Res<UiState>,
) {
    if !state.show_axes {
        return;
    }
    for transform in &query {
        gizmos.axes(*transform, 0.35);
    }
}
