//! ISS systems: start the poller and hand its results to the marker and alert.

use bevy::prelude::*;
use chrono::Utc;

use crate::iss::fetcher::HttpSource;
use crate::iss::poller::{PositionPoller, PositionSubscriber};
use crate::iss::types::{IssConfig, IssError, IssTrackState, PositionFix};
use crate::ui::alert::{ALERT_TITLE, AlertState};
use crate::visualization::globe::IssMarker;

pub fn setup_iss_poller(mut commands: Commands, config: Res<IssConfig>) {
    let source = match HttpSource::new(&config) {
        Ok(source) => source,
        Err(err) => {
            error!("ISS HTTP client could not be built: {}", err);
            return;
        }
    };

    match PositionPoller::spawn(source, config.marker_orbit_radius) {
        Ok(mut poller) => {
            poller.start(config.poll_interval());
            info!(endpoint = %config.endpoint, "[INIT] ISS poller worker started");
            commands.insert_resource(poller);
        }
        Err(err) => error!("ISS poller could not be started: {:#}", err),
    }
}

/// `R` forces an immediate refresh, superseding whatever is in flight.
pub fn refresh_on_keypress(
    keys: Res<ButtonInput<KeyCode>>,
    poller: Option<ResMut<PositionPoller>>,
) {
    let Some(mut poller) = poller else { return };
    if keys.just_pressed(KeyCode::KeyR) {
        debug!("manual ISS refresh");
        poller.poll();
    }
}

/// Subscriber that writes straight into the world for the duration of one dispatch.
struct MarkerSink<'a> {
    track: ResMut<'a, IssTrackState>,
    alerts: ResMut<'a, AlertState>,
    marker: Option<(Mut<'a, Transform>, Mut<'a, Visibility>)>,
}

impl PositionSubscriber for MarkerSink<'_> {
    fn on_update(&mut self, fix: PositionFix) {
        if let Some((transform, visibility)) = self.marker.as_mut() {
            transform.translation = fix.point.as_vec3();
            **visibility = Visibility::Inherited;
        }
        self.track.record_fix(fix, Utc::now());
    }

    fn on_error(&mut self, error: IssError) {
        self.track.record_error(&error);
        self.alerts.raise(ALERT_TITLE, error.to_string());
    }
}

pub fn apply_iss_results(
    poller: Option<ResMut<PositionPoller>>,
    track: ResMut<IssTrackState>,
    alerts: ResMut<AlertState>,
    mut marker: Query<(&mut Transform, &mut Visibility), With<IssMarker>>,
) {
    let Some(mut poller) = poller else { return };

    let mut sink = MarkerSink {
        track,
        alerts,
        marker: marker.single_mut().ok(),
    };
    poller.dispatch(&mut sink);
}
