//! User interface module
//!
//! Alert banner for failed polls and a status line with the last position.

use bevy::prelude::*;

pub mod alert;
pub mod state;
pub mod status;

pub use alert::{ALERT_TITLE, AlertState};
pub use state::UiState;

/// Plugin for user interface management
pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<UiState>()
            .init_resource::<AlertState>()
            .add_systems(
                Startup,
                (alert::spawn_alert_banner, status::spawn_status_text),
            )
            .add_systems(
                Update,
                (
                    alert::dismiss_alert,
                    alert::sync_alert_banner,
                    status::update_status_text,
                )
                    .chain(),
            );
    }
}
