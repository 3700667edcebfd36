//! Orientation systems: mouse and keyboard adapted to drag/crown input.

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;

use crate::orientation::controller::{OrientationConfig, OrientationController};
use crate::visualization::globe::GlobeRoot;

pub fn setup_orientation_controller(mut commands: Commands, config: Res<OrientationConfig>) {
    commands.insert_resource(OrientationController::from_config(&config));
}

#[derive(Default)]
pub struct DragGesture {
    translation: Vec2,
    /// The press landed on a UI button; ignore it until release.
    on_ui: bool,
}

/// Left button drag. The gesture reports the translation since it began.
pub fn drag_globe(
    buttons: Res<ButtonInput<MouseButton>>,
    motion: Res<AccumulatedMouseMotion>,
    config: Res<OrientationConfig>,
    ui: Query<&Interaction>,
    mut controller: ResMut<OrientationController>,
    mut gesture: Local<DragGesture>,
) {
    if buttons.just_pressed(MouseButton::Left) {
        gesture.translation = Vec2::ZERO;
        gesture.on_ui = ui.iter().any(|i| *i == Interaction::Pressed);
    }

    if gesture.on_ui {
        if buttons.just_released(MouseButton::Left) {
            gesture.on_ui = false;
        }
        return;
    }

    if buttons.pressed(MouseButton::Left) && motion.delta != Vec2::ZERO {
        gesture.translation += motion.delta;
        let scaled = gesture.translation * config.drag_degrees_per_pixel;
        // Screen y grows downward.
        controller.on_drag_changed(scaled.x, -scaled.y);
    }

    if buttons.just_released(MouseButton::Left) {
        controller.on_drag_ended();
    }
}

/// Mouse wheel and PageUp/PageDown stand in for the crown.
pub fn crown_input(
    scroll: Res<AccumulatedMouseScroll>,
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    config: Res<OrientationConfig>,
    mut controller: ResMut<OrientationController>,
) {
    let mut delta = match scroll.unit {
        MouseScrollUnit::Line => scroll.delta.y * config.wheel_line_step,
        MouseScrollUnit::Pixel => scroll.delta.y * config.wheel_pixel_step,
    };
    if keys.pressed(KeyCode::PageUp) {
        delta += config.key_crown_rate * time.delta_secs();
    }
    if keys.pressed(KeyCode::PageDown) {
        delta -= config.key_crown_rate * time.delta_secs();
    }

    if delta != 0.0 {
        controller.on_crown_rotate(delta);
    }
}

pub fn apply_globe_transform(
    controller: Res<OrientationController>,
    mut globe: Query<&mut Transform, With<GlobeRoot>>,
) {
    if !controller.is_changed() {
        return;
    }
    let transform = Transform::from_matrix(controller.transform());
    for mut t in &mut globe {
        *t = transform;
    }
}
