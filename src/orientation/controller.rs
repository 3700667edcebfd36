//! Globe orientation from drag and crown input.
//!
//! A drag reports its translation since the gesture began, so each update *replaces*
//! the live rotation. When the drag ends the live rotation is folded into the pivot
//! and reset, so the next drag starts clean while the orientation so far is kept.
//! All composition is done on 4x4 matrices.

use bevy::log::debug;
use bevy::math::{Mat4, Vec3};
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Axis the crown translates the globe along.
    pub crown_axis: [f32; 3],
    /// Crown delta to distance.
    pub crown_scale: f32,
    /// Degrees of rotation per pixel dragged.
    pub drag_degrees_per_pixel: f32,
    /// Crown delta per mouse wheel line.
    pub wheel_line_step: f32,
    /// Crown delta per mouse wheel pixel (touchpads).
    pub wheel_pixel_step: f32,
    /// Crown delta per second while PageUp/PageDown is held.
    pub key_crown_rate: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            crown_axis: [0.0, 0.0, 1.0],
            crown_scale: 1.0,
            drag_degrees_per_pixel: 1.0,
            wheel_line_step: 0.05,
            wheel_pixel_step: 0.002,
            key_crown_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
}

/// What the renderer applies to the globe root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationState {
    /// Rotation of the drag in progress; identity when idle.
    pub live_rotation: Mat4,
    /// Committed orientation, stored inverted like a scene-graph node pivot.
    pub pivot: Mat4,
    /// Translation accumulated from crown input.
    pub position: Vec3,
}

impl Default for OrientationState {
    fn default() -> Self {
        Self {
            live_rotation: Mat4::IDENTITY,
            pivot: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

impl OrientationState {
    pub fn transform(&self) -> Mat4 {
        Mat4::from_translation(self.position) * self.live_rotation * self.pivot.inverse()
    }
}

#[derive(Resource, Debug)]
pub struct OrientationController {
    state: OrientationState,
    phase: DragPhase,
    crown_axis: Vec3,
    crown_scale: f32,
}

impl Default for OrientationController {
    fn default() -> Self {
        Self::new(Vec3::Z, 1.0)
    }
}

impl OrientationController {
    pub fn new(crown_axis: Vec3, crown_scale: f32) -> Self {
        Self {
            state: OrientationState::default(),
            phase: DragPhase::Idle,
            crown_axis: crown_axis.try_normalize().unwrap_or(Vec3::Z),
            crown_scale,
        }
    }

    pub fn from_config(config: &OrientationConfig) -> Self {
        Self::new(Vec3::from_array(config.crown_axis), config.crown_scale)
    }

    /// `dx`/`dy` are the total drag since the gesture began, y pointing up.
    pub fn on_drag_changed(&mut self, dx: f32, dy: f32) {
        self.phase = DragPhase::Dragging;
        self.state.live_rotation = drag_rotation(dx, dy);
    }

    pub fn on_drag_ended(&mut self) {
        if self.phase != DragPhase::Dragging {
            debug!("drag ended without a drag in progress");
            return;
        }
        let change = self.state.live_rotation.inverse();
        self.state.pivot *= change;
        self.state.live_rotation = Mat4::IDENTITY;
        self.phase = DragPhase::Idle;
    }

    /// Instant move along the crown axis. Independent of any drag.
    pub fn on_crown_rotate(&mut self, delta: f32) {
        self.state.position += self.crown_axis * (delta * self.crown_scale);
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn state(&self) -> &OrientationState {
        &self.state
    }

    pub fn transform(&self) -> Mat4 {
        self.state.transform()
    }
}

/// Rotation for a screen-space drag: one degree per unit, about the in-plane
/// perpendicular `(-dy, dx, 0)`.
pub fn drag_rotation(dx: f32, dy: f32) -> Mat4 {
    let angle = (dx * dx + dy * dy).sqrt() * PI / 180.0;
    match Vec3::new(-dy, dx, 0.0).try_normalize() {
        Some(axis) if angle > 0.0 => Mat4::from_axis_angle(axis, angle),
        _ => Mat4::IDENTITY,
    }
}
