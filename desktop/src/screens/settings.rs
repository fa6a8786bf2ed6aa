//! Settings screen for Huddle Desktop

use crate::messages::Message;
use crate::state::AppState;
use iced::widget::{button, checkbox, column, container, row, text, Space};
use iced::{Alignment, Element, Length};

pub struct SettingsScreen;

impl SettingsScreen {
    pub fn view(state: &AppState) -> Element<'static, Message> {
        // Header
        let header = row![
            button(text("<").size(20))
                .padding([8, 14])
                .on_press(Message::GoBack),
            Space::with_width(16),
            text("Settings").size(24),
        ]
        .padding(16)
        .align_items(Alignment::Center);

        // Account section
        let account_section = if let Some(ref user) = state.user {
            column![
                text("Account").size(18),
                Space::with_height(12),
                field("Name:", user.name().to_string()),
                field("Email:", user.email.clone().unwrap_or_default()),
                field("User ID:", user.uid.clone()),
                Space::with_height(20),
            ]
            .spacing(8)
        } else {
            column![]
        };

        // Appearance section
        let appearance_section = column![
            text("Appearance").size(18),
            Space::with_height(12),
            checkbox("Dark theme", state.config.ui.is_dark()).on_toggle(Message::ThemeChanged),
            Space::with_height(20),
        ]
        .spacing(8);

        // Backend section
        let client = &state.config.client;
        let backend_section = column![
            text("Backend").size(18),
            Space::with_height(12),
            field(
                "Mode:",
                if state.offline {
                    "Offline (in-memory)".to_string()
                } else {
                    "Firebase".to_string()
                }
            ),
            field("Database:", client.firebase.database_url.clone()),
            field("Dashboard API:", client.placeholder.base_url.clone()),
            field(
                "Fetch policy:",
                format!(
                    "{} attempts, {} ms timeout",
                    client.fetch.attempts, client.fetch.timeout_ms
                )
            ),
            Space::with_height(20),
        ]
        .spacing(8);

        // About section
        let about_section = column![
            text("About").size(18),
            Space::with_height(12),
            field("Version:", env!("CARGO_PKG_VERSION").to_string()),
            Space::with_height(20),
        ]
        .spacing(8);

        // Logout button
        let logout_section = column![
            Space::with_height(20),
            button(
                text("Log Out")
                    .size(14)
                    .horizontal_alignment(iced::alignment::Horizontal::Center),
            )
            .width(Length::Fixed(200.0))
            .padding(12)
            .on_press(Message::Logout),
        ]
        .align_items(Alignment::Center);

        // Main content
        let content = column![
            header,
            container(
                column![
                    account_section,
                    appearance_section,
                    backend_section,
                    about_section,
                    logout_section,
                ]
                .padding(20)
                .max_width(600),
            )
            .width(Length::Fill)
            .center_x(),
        ];

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}

fn field(label: &str, value: String) -> Element<'static, Message> {
    row![
        text(label.to_string()).size(14),
        Space::with_width(8),
        text(value).size(14),
    ]
    .into()
}
