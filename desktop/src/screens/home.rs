//! Home screen with the chat list for Huddle Desktop

use crate::messages::Message;
use crate::screens::{avatar, empty_state};
use crate::state::AppState;
use huddle_core::Conversation;
use iced::widget::{button, column, row, scrollable, text, Column, Space};
use iced::{Alignment, Element, Length};

const PREVIEW_CHARS: usize = 40;

pub struct HomeScreen;

impl HomeScreen {
    pub fn view(state: &AppState) -> Element<'static, Message> {
        let header = Self::header(state);
        let conversations = Self::conversation_list(state);

        column![header, conversations]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn header(state: &AppState) -> Element<'static, Message> {
        let user_name = state
            .user
            .as_ref()
            .map(|u| u.name().to_string())
            .unwrap_or_default();

        row![
            text("Chats").size(24),
            Space::with_width(Length::Fill),
            text(user_name).size(12),
            Space::with_width(10),
            button(text("Dashboard").size(14))
                .padding(8)
                .on_press(Message::OpenDashboard),
            Space::with_width(5),
            button(text("Settings").size(14))
                .padding(8)
                .on_press(Message::OpenSettings),
        ]
        .padding(16)
        .align_items(Alignment::Center)
        .into()
    }

    fn conversation_list(state: &AppState) -> Element<'static, Message> {
        let conversations = state.conversations();
        if conversations.is_empty() {
            return empty_state(
                "No contacts yet",
                "Other users appear here as soon as they sign up",
            );
        }

        let list: Vec<Element<'static, Message>> = conversations
            .iter()
            .map(Self::conversation_item)
            .collect();

        scrollable(Column::with_children(list).spacing(1).width(Length::Fill))
            .height(Length::Fill)
            .into()
    }

    fn conversation_item(conversation: &Conversation) -> Element<'static, Message> {
        let contact = &conversation.contact;

        let (preview, time) = match &conversation.last_message {
            Some(message) => (
                format!("{}: {}", message.sender_name, truncate(&message.text)),
                AppState::format_timestamp(message.timestamp),
            ),
            None => ("No messages yet".to_string(), String::new()),
        };

        let content = row![
            avatar(&contact.name, 48),
            Space::with_width(12),
            column![text(contact.name.clone()).size(16), text(preview).size(13)]
                .spacing(4)
                .width(Length::Fill),
            text(time).size(12),
        ]
        .align_items(Alignment::Center);

        button(content)
            .padding(12)
            .width(Length::Fill)
            .style(iced::theme::Button::Text)
            .on_press(Message::OpenChat(contact.clone()))
            .into()
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_previews_are_cut_on_char_boundaries() {
        assert_eq!(truncate("short"), "short");
        let long = "ü".repeat(50);
        let cut = truncate(&long);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS);
        assert!(cut.ends_with("..."));
    }
}
