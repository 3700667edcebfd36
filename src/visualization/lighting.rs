//! Scene lighting

use bevy::light::GlobalAmbientLight;
use bevy::prelude::*;

/// Marker component for the key directional light
#[derive(Component)]
pub struct SunLight;

pub fn spawn_lighting(mut commands: Commands) {
    // Night side stays readable.
    commands.insert_resource(GlobalAmbientLight {
        brightness: 400.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 6_000.0,
            ..default()
        },
        SunLight,
        Transform::from_xyz(1.0, 1.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}
