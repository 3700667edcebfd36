//! Status readout with the last known position.

use bevy::prelude::*;

use crate::iss::IssTrackState;

#[derive(Component)]
pub struct StatusText;

pub fn format_status(track: &IssTrackState) -> String {
    let Some(fix) = track.last_fix else {
        return match &track.last_error {
            Some(_) => "ISS position unavailable".to_string(),
            None => "Waiting for ISS position...".to_string(),
        };
    };

    let mut text = format!(
        "ISS {:.2}°, {:.2}°",
        fix.coordinate.latitude, fix.coordinate.longitude
    );
    if let Some(ts) = fix.timestamp {
        text.push_str(&format!(" at {} UTC", ts.format("%H:%M:%S")));
    }
    if track.last_error.is_some() {
        text.push_str(" (stale)");
    }
    text
}

pub fn spawn_status_text(mut commands: Commands) {
    commands.spawn((
        Text::new("Waiting for ISS position..."),
        TextColor(Color::srgb(0.75, 0.85, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        },
        StatusText,
    ));
}

pub fn update_status_text(
    track: Res<IssTrackState>,
    mut query: Query<&mut Text, With<StatusText>>,
) {
    if !track.is_changed() {
        return;
    }
    let status = format_status(&track);
    for mut text in &mut query {
        text.0 = status.clone();
    }
}
