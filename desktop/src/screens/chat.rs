//! Chat screen for Huddle Desktop

use crate::messages::Message;
use crate::screens::{avatar, empty_state};
use crate::state::AppState;
use crate::theme::{self, Palette};
use huddle_core::format::time_of_day_ms;
use huddle_core::{CallType, ChatMessage, Contact};
use iced::widget::{button, column, container, row, scrollable, text, text_input, Column, Space};
use iced::{Alignment, Element, Length};

pub struct ChatScreen;

impl ChatScreen {
    pub fn view(state: &AppState, contact: &Contact) -> Element<'static, Message> {
        let header = Self::header(contact);
        let messages = Self::messages_view(state);
        let input = Self::input_area(state);

        column![header, messages, input]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn header(contact: &Contact) -> Element<'static, Message> {
        let back_btn = button(text("<").size(20))
            .padding([8, 14])
            .on_press(Message::GoBack);

        let info = column![
            text(contact.name.clone()).size(16),
            text(contact.email.clone().unwrap_or_default()).size(12),
        ]
        .spacing(2);

        // Call buttons
        let audio_call_btn = button(text("Call").size(12))
            .padding(8)
            .on_press(Message::StartCall(CallType::Audio));

        let video_call_btn = button(text("Video").size(12))
            .padding(8)
            .on_press(Message::StartCall(CallType::Video));

        row![
            back_btn,
            Space::with_width(8),
            avatar(&contact.name, 40),
            Space::with_width(12),
            info,
            Space::with_width(Length::Fill),
            audio_call_btn,
            Space::with_width(8),
            video_call_btn,
        ]
        .padding(12)
        .align_items(Alignment::Center)
        .into()
    }

    fn messages_view(state: &AppState) -> Element<'static, Message> {
        if state.current_messages.is_empty() {
            return empty_state("No messages yet", "Send a message to start the conversation");
        }

        let palette = state.palette();
        let me = state.user_id().unwrap_or_default();
        let messages: Vec<Element<'static, Message>> = state
            .current_messages
            .iter()
            .map(|msg| Self::message_bubble(msg, msg.sender_id == me, &palette))
            .collect();

        scrollable(
            Column::with_children(messages)
                .spacing(8)
                .padding(16)
                .width(Length::Fill),
        )
        .height(Length::Fill)
        .into()
    }

    fn message_bubble(msg: &ChatMessage, own: bool, palette: &Palette) -> Element<'static, Message> {
        let mut body = column![].spacing(4).max_width(420);
        if !own {
            body = body.push(text(msg.sender_name.clone()).size(12));
        }
        body = body
            .push(text(msg.text.clone()).size(14))
            .push(text(time_of_day_ms(msg.timestamp)).size(10));

        let color = if own {
            palette.outgoing_bubble
        } else {
            palette.incoming_bubble
        };
        let bubble = container(body).padding(10).style(if own {
            theme::filled(color)
        } else {
            theme::card(color)
        });

        // Own messages on the right
        let line = if own {
            row![Space::with_width(Length::Fill), bubble]
        } else {
            row![bubble, Space::with_width(Length::Fill)]
        };
        line.width(Length::Fill).into()
    }

    fn input_area(state: &AppState) -> Element<'static, Message> {
        let input = text_input("Type a message...", &state.message_input)
            .on_input(Message::MessageInputChanged)
            .on_submit(Message::SendMessage)
            .padding(12)
            .width(Length::Fill);

        let mut send_btn = button(text("Send").size(14)).padding([12, 20]);
        if !state.message_input.trim().is_empty() {
            send_btn = send_btn.on_press(Message::SendMessage);
        }

        row![input, send_btn]
            .spacing(8)
            .padding(12)
            .align_items(Alignment::Center)
            .into()
    }
}
