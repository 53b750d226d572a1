//! # UI Styling Module
//!
//! Status colors and button styles shared by the dashboard views.

use crate::dashboard::{LinkState, PulseState};
use crate::readout::ConfidenceLevel;
use iced::widget::button;
use iced::{Background, Border, Color};

pub const GOOD: Color = Color::from_rgb(0.063, 0.725, 0.506);
pub const WARNING: Color = Color::from_rgb(0.961, 0.620, 0.043);
pub const POOR: Color = Color::from_rgb(0.937, 0.267, 0.267);
pub const NEUTRAL: Color = Color::from_rgb(0.580, 0.639, 0.722);

pub const BPM: Color = Color::from_rgb(0.937, 0.267, 0.267);
pub const SPO2: Color = Color::from_rgb(0.231, 0.510, 0.965);
pub const PERFUSION: Color = Color::from_rgb(0.961, 0.620, 0.043);
pub const TEMPERATURE: Color = Color::from_rgb(0.506, 0.549, 0.973);
pub const HRV: Color = Color::from_rgb(0.851, 0.275, 0.937);

/// Status dot next to the pulse status text
pub fn pulse_color(state: PulseState) -> Color {
    match state {
        PulseState::PulseAcquired => GOOD,
        PulseState::SeekingPulse => WARNING,
        PulseState::Initializing | PulseState::Other => NEUTRAL,
    }
}

pub fn link_color(link: &LinkState) -> Color {
    match link {
        LinkState::Connected => GOOD,
        LinkState::Connecting => WARNING,
        LinkState::Disconnected | LinkState::Failed(_) => POOR,
    }
}

/// Confidence readout color; no reading yet uses the neutral color
pub fn confidence_color(level: Option<ConfidenceLevel>) -> Color {
    match level {
        Some(ConfidenceLevel::Good) => GOOD,
        Some(ConfidenceLevel::Warning) => WARNING,
        Some(ConfidenceLevel::Poor) => POOR,
        None => NEUTRAL,
    }
}

fn filled(background: Color, border: Color, width: f32) -> button::Style {
    button::Style {
        background: Some(Background::Color(background)),
        text_color: Color::WHITE,
        border: Border {
            color: border,
            width,
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

fn disabled() -> button::Style {
    button::Style {
        background: Some(Background::Color(Color::from_rgb(0.3, 0.3, 0.3))),
        text_color: Color::from_rgb(0.6, 0.6, 0.6),
        border: Border {
            color: Color::from_rgb(0.4, 0.4, 0.4),
            width: 1.0,
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

/// Style for serial port list buttons based on selection state
pub fn port_button_style(is_selected: bool) -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    move |_theme: &iced::Theme, status: button::Status| match (status, is_selected) {
        // Selected: teal, unselected: neutral gray
        (button::Status::Active, true) => filled(Color::from_rgb(0.2, 0.6, 0.7), Color::from_rgb(0.3, 0.7, 0.8), 2.0),
        (button::Status::Active, false) => filled(Color::from_rgb(0.4, 0.4, 0.4), Color::from_rgb(0.5, 0.5, 0.5), 1.0),
        (button::Status::Hovered, true) => filled(Color::from_rgb(0.3, 0.7, 0.8), Color::from_rgb(0.4, 0.8, 0.9), 2.0),
        (button::Status::Hovered, false) => filled(Color::from_rgb(0.5, 0.5, 0.5), Color::from_rgb(0.6, 0.6, 0.6), 1.0),
        (button::Status::Pressed, true) => filled(Color::from_rgb(0.15, 0.5, 0.6), Color::from_rgb(0.2, 0.6, 0.7), 2.0),
        (button::Status::Pressed, false) => filled(Color::from_rgb(0.35, 0.35, 0.35), Color::from_rgb(0.45, 0.45, 0.45), 1.0),
        (button::Status::Disabled, _) => disabled(),
    }
}

/// Style for connect buttons (green theme)
pub fn connect_button_style() -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    |theme: &iced::Theme, status: button::Status| match status {
        button::Status::Active => filled(Color::from_rgb(0.2, 0.7, 0.2), Color::from_rgb(0.3, 0.8, 0.3), 1.0),
        button::Status::Hovered => filled(Color::from_rgb(0.3, 0.8, 0.3), Color::from_rgb(0.4, 0.9, 0.4), 1.0),
        button::Status::Pressed => filled(Color::from_rgb(0.15, 0.6, 0.15), Color::from_rgb(0.2, 0.7, 0.2), 1.0),
        _ => button::primary(theme, status),
    }
}

/// Style for the reset button (red theme)
pub fn reset_button_style() -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    |theme: &iced::Theme, status: button::Status| match status {
        button::Status::Active => filled(Color::from_rgb(0.8, 0.2, 0.2), Color::from_rgb(0.9, 0.3, 0.3), 1.0),
        button::Status::Hovered => filled(Color::from_rgb(0.9, 0.3, 0.3), Color::from_rgb(1.0, 0.4, 0.4), 1.0),
        button::Status::Pressed => filled(Color::from_rgb(0.7, 0.15, 0.15), Color::from_rgb(0.8, 0.2, 0.2), 1.0),
        _ => button::primary(theme, status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_colors() {
        assert_eq!(pulse_color(PulseState::PulseAcquired), GOOD);
        assert_eq!(pulse_color(PulseState::SeekingPulse), WARNING);
        assert_eq!(pulse_color(PulseState::Initializing), NEUTRAL);
        assert_eq!(pulse_color(PulseState::Other), NEUTRAL);
    }

    #[test]
    fn test_confidence_colors() {
        assert_eq!(confidence_color(Some(ConfidenceLevel::Good)), GOOD);
        assert_eq!(confidence_color(Some(ConfidenceLevel::Poor)), POOR);
        assert_eq!(confidence_color(None), NEUTRAL);
    }
}
