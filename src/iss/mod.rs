//! ISS position tracking
//!
//! Polls the open-notify `iss-now.json` endpoint on a background worker, decodes the
//! quoted-string coordinates and places the marker on the globe.

use bevy::prelude::*;

pub mod fetcher;
pub mod poller;
pub mod systems;
pub mod types;

pub use fetcher::{HttpSource, PositionSource};
pub use poller::{Callbacks, PositionPoller, PositionSubscriber};
pub use types::{IssConfig, IssError, IssErrorKind, IssTrackState, PositionFix};

/// Plugin for ISS position polling
pub struct IssPlugin;

impl Plugin for IssPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<IssConfig>()
            .init_resource::<IssTrackState>()
            .add_systems(Startup, systems::setup_iss_poller)
            .add_systems(
                Update,
                (systems::refresh_on_keypress, systems::apply_iss_results).chain(),
            );
    }
}
