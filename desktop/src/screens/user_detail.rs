//! Per-user activity view for Huddle Desktop

use crate::messages::Message;
use crate::screens::{avatar, back_header, badge, empty_state, stat_card};
use crate::state::AppState;
use huddle_core::dashboard::UserDetail;
use huddle_core::format::{duration_long, short_date};
use iced::widget::{button, column, row, scrollable, text, Column, Space};
use iced::{Alignment, Element, Length};

const RECENT_LIMIT: usize = 5;

pub struct UserDetailScreen;

impl UserDetailScreen {
    pub fn view(state: &AppState, user_id: &str) -> Element<'static, Message> {
        let Some(detail) = UserDetail::build(state.dashboard.data(), user_id) else {
            return column![
                back_header("User".to_string()),
                empty_state("User not found", "Open the dashboard to load user statistics"),
            ]
            .into();
        };

        let palette = state.palette();
        let user = &detail.user;

        let profile = row![
            avatar(&user.user_name, 64),
            Space::with_width(16),
            column![
                text(user.user_name.clone()).size(22),
                text(user.email.clone()).size(13),
                text(format!("Last seen {}", short_date(&user.last_seen))).size(12),
            ]
            .spacing(4),
            Space::with_width(Length::Fill),
            badge(user.status.label(), palette.user_status(user.status)),
        ]
        .align_items(Alignment::Center);

        let stats = row![
            stat_card("Messages", user.total_messages.to_string(), palette.surface),
            stat_card("Calls", user.total_calls.to_string(), palette.surface),
            stat_card(
                "Completed Calls",
                format!("{} ({}%)", detail.completed_calls, detail.completion_rate),
                palette.surface
            ),
            stat_card(
                "Talk Time",
                duration_long(detail.completed_duration),
                palette.surface
            ),
        ]
        .spacing(12);

        let messages: Vec<Element<'static, Message>> = detail
            .messages
            .iter()
            .rev()
            .take(RECENT_LIMIT)
            .map(|m| {
                row![
                    text(m.content.clone()).size(13).width(Length::Fill),
                    button(text(m.room_id.clone()).size(12))
                        .style(iced::theme::Button::Text)
                        .on_press(Message::OpenChatRoom(m.room_id.clone())),
                    text(short_date(&m.timestamp)).size(12),
                ]
                .spacing(8)
                .align_items(Alignment::Center)
                .into()
            })
            .collect();

        let calls: Vec<Element<'static, Message>> = detail
            .calls
            .iter()
            .rev()
            .take(RECENT_LIMIT)
            .map(|c| {
                row![
                    text(format!("{} -> {}", c.caller_name, c.receiver_name))
                        .size(13)
                        .width(Length::Fill),
                    badge(c.status.label(), palette.call_status(c.status)),
                    button(text(c.room_id.clone()).size(12))
                        .style(iced::theme::Button::Text)
                        .on_press(Message::OpenCallRoom(c.room_id.clone())),
                    text(short_date(&c.start_time)).size(12),
                ]
                .spacing(8)
                .align_items(Alignment::Center)
                .into()
            })
            .collect();

        let content = column![
            profile,
            stats,
            text("Recent messages").size(16),
            section(messages, "No messages from this user"),
            text("Recent calls").size(16),
            section(calls, "No calls for this user"),
        ]
        .spacing(16)
        .padding([0, 16, 16, 16]);

        column![
            back_header(user.user_name.clone()),
            scrollable(content).height(Length::Fill),
        ]
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }
}

fn section(rows: Vec<Element<'static, Message>>, empty: &str) -> Element<'static, Message> {
    if rows.is_empty() {
        text(empty.to_string()).size(13).into()
    } else {
        Column::with_children(rows).spacing(6).into()
    }
}
