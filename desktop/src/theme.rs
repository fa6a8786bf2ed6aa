//! Theme definitions for Huddle Desktop

use huddle_core::{CallLogStatus, MessageKind, UserStatus};
use iced::widget::container;
use iced::{Background, Color};

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub surface: Color,
    pub text_secondary: Color,
    pub primary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub outgoing_bubble: Color,
    pub incoming_bubble: Color,
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            surface: Color::from_rgb(0.17, 0.17, 0.18),         // #2c2c2e
            text_secondary: Color::from_rgb(0.6, 0.6, 0.6),
            primary: Color::from_rgb(0.0, 0.48, 1.0),           // #007aff
            success: Color::from_rgb(0.2, 0.78, 0.35),          // #34c759
            warning: Color::from_rgb(1.0, 0.62, 0.04),          // #ff9f0a
            error: Color::from_rgb(1.0, 0.27, 0.23),            // #ff453a
            outgoing_bubble: Color::from_rgb(0.0, 0.48, 1.0),
            incoming_bubble: Color::from_rgb(0.22, 0.22, 0.23), // #38383a
        }
    }

    pub fn light() -> Self {
        Self {
            surface: Color::from_rgb(1.0, 1.0, 1.0),
            text_secondary: Color::from_rgb(0.4, 0.4, 0.4),
            primary: Color::from_rgb(0.0, 0.48, 1.0),
            success: Color::from_rgb(0.2, 0.78, 0.35),
            warning: Color::from_rgb(1.0, 0.62, 0.04),
            error: Color::from_rgb(1.0, 0.23, 0.19),
            outgoing_bubble: Color::from_rgb(0.0, 0.48, 1.0),
            incoming_bubble: Color::from_rgb(0.9, 0.9, 0.92),
        }
    }

    pub fn for_mode(dark: bool) -> Self {
        if dark {
            Self::dark()
        } else {
            Self::light()
        }
    }

    pub fn call_status(&self, status: CallLogStatus) -> Color {
        match status {
            CallLogStatus::Completed => self.success,
            CallLogStatus::Missed => self.error,
            CallLogStatus::Declined => self.warning,
            CallLogStatus::Ongoing => self.primary,
        }
    }

    pub fn user_status(&self, status: UserStatus) -> Color {
        match status {
            UserStatus::Active => self.success,
            UserStatus::Away => self.warning,
            UserStatus::Inactive => self.text_secondary,
        }
    }

    pub fn message_kind(&self, kind: MessageKind) -> Color {
        match kind {
            MessageKind::Text => self.primary,
            MessageKind::Image => colors::PURPLE,
            MessageKind::File => self.warning,
        }
    }
}

// Common colors
pub mod colors {
    use iced::Color;

    pub const PURPLE: Color = Color::from_rgb(0.69, 0.32, 0.87);
}

/// Rounded block with a solid fill and white text: banners, badges, own bubbles.
pub struct Filled(pub Color);

impl container::StyleSheet for Filled {
    type Style = iced::Theme;

    fn appearance(&self, _style: &Self::Style) -> container::Appearance {
        container::Appearance {
            background: Some(Background::Color(self.0)),
            text_color: Some(Color::WHITE),
            border: iced::Border {
                radius: 6.0.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Rounded card that keeps the theme's text color.
pub struct Card(pub Color);

impl container::StyleSheet for Card {
    type Style = iced::Theme;

    fn appearance(&self, _style: &Self::Style) -> container::Appearance {
        container::Appearance {
            background: Some(Background::Color(self.0)),
            border: iced::Border {
                radius: 8.0.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

pub fn filled(color: Color) -> iced::theme::Container {
    iced::theme::Container::Custom(Box::new(Filled(color)))
}

pub fn card(color: Color) -> iced::theme::Container {
    iced::theme::Container::Custom(Box::new(Card(color)))
}
