//! Screens for Huddle Desktop

pub mod call;
pub mod chat;
pub mod dashboard;
pub mod home;
pub mod login;
pub mod room_detail;
pub mod settings;
pub mod user_detail;

use crate::messages::Message;
use iced::widget::{button, column, container, row, text, Space};
use iced::{Alignment, Color, Element, Length};

/// Single-letter avatar circle.
pub(crate) fn avatar(name: &str, size: u16) -> Element<'static, Message> {
    let first_char = name.chars().next().unwrap_or('?').to_uppercase().to_string();

    container(
        text(first_char)
            .size(size / 2)
            .horizontal_alignment(iced::alignment::Horizontal::Center)
            .vertical_alignment(iced::alignment::Vertical::Center),
    )
    .width(size)
    .height(size)
    .center_x()
    .center_y()
    .into()
}

/// Back button followed by a title, used by every secondary screen.
pub(crate) fn back_header(title: String) -> Element<'static, Message> {
    row![
        button(text("<").size(20))
            .padding([8, 14])
            .on_press(Message::GoBack),
        Space::with_width(12),
        text(title).size(22),
    ]
    .padding(12)
    .align_items(Alignment::Center)
    .into()
}

/// Small colored label such as a call status.
pub(crate) fn badge(label: &str, color: Color) -> Element<'static, Message> {
    container(text(label.to_string()).size(12))
        .padding([2, 8])
        .style(crate::theme::filled(color))
        .into()
}

/// Titled number card for stats rows.
pub(crate) fn stat_card(title: &str, value: String, surface: Color) -> Element<'static, Message> {
    container(column![text(title.to_string()).size(12), text(value).size(24)].spacing(4))
        .padding(16)
        .width(Length::Fill)
        .style(crate::theme::card(surface))
        .into()
}

/// Centered placeholder shown when there is nothing to list.
pub(crate) fn empty_state(title: &str, hint: &str) -> Element<'static, Message> {
    container(
        column![
            text(title.to_string()).size(18),
            Space::with_height(10),
            text(hint.to_string()).size(14),
        ]
        .align_items(Alignment::Center),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .center_x()
    .center_y()
    .into()
}
