use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;
use bevy::render::RenderPlugin;
use bevy::render::settings::{RenderCreation, WgpuSettings};
use bevy::window::{PresentMode, Window, WindowPlugin};

#[cfg(feature = "dev")]
use bevy::dev_tools::fps_overlay::FpsOverlayPlugin;

mod config;
mod core;
mod iss;
mod orientation;
mod ui;
mod visualization;

use config::AppConfig;
use iss::IssPlugin;
use orientation::OrientationPlugin;
use ui::UiPlugin;
use visualization::{GlobeConfig, VisualizationPlugin};

#[derive(Component)]
pub struct MainCamera;

fn setup_camera(mut commands: Commands, config: Res<GlobeConfig>) {
    commands.spawn((
        Camera3d::default(),
        Camera {
            clear_color: ClearColorConfig::Custom(Color::BLACK),
            ..default()
        },
        Tonemapping::TonyMcMapface,
        MainCamera,
        Transform::from_xyz(0.0, 0.0, config.camera_distance).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn main() {
    let mut app = App::new();

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "ISS Globe".to_string(),
                    present_mode: PresentMode::AutoVsync,
                    ..default()
                }),
                ..default()
            })
            .set(RenderPlugin {
                render_creation: RenderCreation::Automatic(WgpuSettings { ..default() }),
                ..default()
            }),
    );

    #[cfg(feature = "dev")]
    app.add_plugins(FpsOverlayPlugin::default());

    // Config from disk
    let config = AppConfig::load();
    app.insert_resource(config.iss)
        .insert_resource(config.orientation)
        .insert_resource(config.globe);

    app.add_plugins(VisualizationPlugin);
    app.add_plugins(OrientationPlugin);
    app.add_plugins(IssPlugin);
    app.add_plugins(UiPlugin);
    app.add_systems(Startup, setup_camera);

    app.run();
}
