use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

use crate::visualization::axes::ShowAxes;

/// Parent of the globe and the marker; carries the orientation transform.
#[derive(Component)]
pub struct GlobeRoot;

#[derive(Component)]
pub struct GlobeSurface;

#[derive(Component)]
pub struct IssMarker;

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub globe_radius: f32,
    pub marker_radius: f32,
    pub marker_color: [f32; 3],
    /// Relative to the assets directory.
    pub texture_path: String,
    /// Rotate the sphere so the equirectangular texture lines up with the z-up
    /// marker coordinates.
    pub texture_axis_correction: bool,
    pub camera_distance: f32,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            globe_radius: 0.2,
            marker_radius: 0.02,
            marker_color: [0.5, 0.0, 0.5],
            texture_path: "earth.png".to_string(),
            texture_axis_correction: true,
            camera_distance: 1.0,
        }
    }
}

impl GlobeConfig {
    pub fn surface_rotation(&self) -> Quat {
        if self.texture_axis_correction {
            // Roll a quarter turn, then pitch a quarter turn.
            Quat::from_rotation_x(FRAC_PI_2) * Quat::from_rotation_z(FRAC_PI_2)
        } else {
            Quat::IDENTITY
        }
    }
}

/// Plugin for the globe and ISS marker
pub struct GlobePlugin;

impl Plugin for GlobePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GlobeConfig>()
            .add_systems(Startup, spawn_globe);
    }
}

pub fn spawn_globe(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
    config: Res<GlobeConfig>,
) {
    let globe_mesh = meshes.add(Sphere::new(config.globe_radius).mesh().uv(64, 32));
    let globe_material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        base_color_texture: Some(asset_server.load(config.texture_path.clone())),
        perceptual_roughness: 1.0,
        ..default()
    });

    let [r, g, b] = config.marker_color;
    let marker_mesh = meshes.add(Sphere::new(config.marker_radius).mesh().uv(16, 8));
    let marker_material = materials.add(StandardMaterial {
        base_color: Color::srgb(r, g, b),
        unlit: true,
        ..default()
    });

    commands
        .spawn((
            Transform::IDENTITY,
            Visibility::Visible,
            GlobeRoot,
            ShowAxes,
            Name::new("Globe Root"),
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh3d(globe_mesh),
                MeshMaterial3d(globe_material),
                Transform::from_rotation(config.surface_rotation()),
                GlobeSurface,
                Name::new("Globe"),
            ));
            // Hidden until the first fix arrives.
            parent.spawn((
                Mesh3d(marker_mesh),
                MeshMaterial3d(marker_material),
                Transform::default(),
                Visibility::Hidden,
                IssMarker,
                Name::new("ISS"),
            ));
        });

    info!(
        radius = config.globe_radius,
        texture = %config.texture_path,
        "[INIT] globe spawned"
    );
}
