//! Error alert banner, dismissed with OK or Escape.

use bevy::prelude::*;
use chrono::{DateTime, Utc};

pub const ALERT_TITLE: &str = "Could not retrieve ISS position";

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    /// Times the same alert was raised while still showing.
    pub repeats: u32,
}

#[derive(Resource, Debug, Default)]
pub struct AlertState {
    current: Option<Alert>,
}

impl AlertState {
    /// Show an alert, replacing whatever is showing. Raising the same alert again
    /// only bumps its count.
    pub fn raise(&mut self, title: &str, message: impl Into<String>) {
        let message = message.into();
        let now = Utc::now();
        match self.current.as_mut() {
            Some(alert) if alert.title == title && alert.message == message => {
                alert.repeats += 1;
                alert.raised_at = now;
            }
            _ => {
                self.current = Some(Alert {
                    title: title.to_string(),
                    message,
                    raised_at: now,
                    repeats: 1,
                });
            }
        }
    }

    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn current(&self) -> Option<&Alert> {
        self.current.as_ref()
    }
}

pub fn format_alert(alert: &Alert) -> String {
    let mut text = format!("{}\n{}", alert.title, alert.message);
    if alert.repeats > 1 {
        text.push_str(&format!(" (x{})", alert.repeats));
    }
    text
}

#[derive(Component)]
pub struct AlertBanner;

#[derive(Component)]
pub struct AlertText;

#[derive(Component)]
pub struct AlertOkButton;

pub fn spawn_alert_banner(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(16.0),
                left: Val::Percent(15.0),
                right: Val::Percent(15.0),
                padding: UiRect::all(Val::Px(12.0)),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                row_gap: Val::Px(8.0),
                ..default()
            },
            BackgroundColor(Color::srgba(0.12, 0.04, 0.06, 0.92)),
            Visibility::Hidden,
            AlertBanner,
            Name::new("Alert"),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextColor(Color::srgb(1.0, 0.85, 0.85)),
                AlertText,
            ));
            parent
                .spawn((
                    Button,
                    Node {
                        padding: UiRect::axes(Val::Px(18.0), Val::Px(4.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.3, 0.1, 0.12, 1.0)),
                    AlertOkButton,
                ))
                .with_children(|button| {
                    button.spawn((Text::new("OK"), TextColor(Color::WHITE)));
                });
        });
}

pub fn sync_alert_banner(
    alerts: Res<AlertState>,
    mut banner: Query<&mut Visibility, With<AlertBanner>>,
    mut text: Query<&mut Text, With<AlertText>>,
) {
    if !alerts.is_changed() {
        return;
    }

    let visibility = match alerts.current() {
        Some(alert) => {
            for mut t in &mut text {
                t.0 = format_alert(alert);
            }
            Visibility::Visible
        }
        None => Visibility::Hidden,
    };
    for mut v in &mut banner {
        *v = visibility;
    }
}

pub fn dismiss_alert(
    keys: Res<ButtonInput<KeyCode>>,
    buttons: Query<&Interaction, (Changed<Interaction>, With<AlertOkButton>)>,
    mut alerts: ResMut<AlertState>,
) {
    if alerts.current().is_none() {
        return;
    }
    let clicked = buttons.iter().any(|i| *i == Interaction::Pressed);
    if clicked || keys.just_pressed(KeyCode::Escape) {
        alerts.dismiss();
    }
}
