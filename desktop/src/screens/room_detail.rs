//! Chat-room and call-room summaries for Huddle Desktop

use crate::messages::Message;
use crate::screens::{back_header, badge, empty_state, stat_card};
use crate::state::AppState;
use huddle_core::dashboard::{CallRoomSummary, ChatRoomSummary};
use huddle_core::format::{duration_long, short_date};
use huddle_core::{CallLogStatus, CallType, MessageKind};
use iced::widget::{column, row, scrollable, text, Column, Space};
use iced::{Alignment, Element, Length};

pub struct RoomDetailScreen;

impl RoomDetailScreen {
    pub fn chat_room(state: &AppState, room_id: &str) -> Element<'static, Message> {
        let title = format!("Chat Room {}", room_id);
        let Some(summary) = ChatRoomSummary::build(state.dashboard.data(), room_id) else {
            return column![
                back_header(title),
                empty_state("No messages in this room", "The room may not exist yet"),
            ]
            .into();
        };

        let palette = state.palette();

        let mut kinds = row![].spacing(8);
        for kind in [MessageKind::Text, MessageKind::Image, MessageKind::File] {
            let count = summary.kinds.get(&kind).copied().unwrap_or(0);
            kinds = kinds.push(badge(
                &format!("{}: {}", kind.as_str(), count),
                palette.message_kind(kind),
            ));
        }

        let last = summary
            .last_message
            .as_ref()
            .map(|m| format!("{} at {}", m.sender_name, short_date(&m.timestamp)))
            .unwrap_or_default();

        let stats = row![
            stat_card("Messages", summary.total_messages().to_string(), palette.surface),
            stat_card("Participants", summary.participants.len().to_string(), palette.surface),
            stat_card("Last Message", last, palette.surface),
        ]
        .spacing(12);

        let messages: Vec<Element<'static, Message>> = summary
            .messages
            .iter()
            .map(|m| {
                row![
                    text(m.sender_name.clone()).size(13).width(Length::FillPortion(2)),
                    text(m.content.clone()).size(13).width(Length::FillPortion(6)),
                    text(short_date(&m.timestamp)).size(12).width(Length::FillPortion(2)),
                ]
                .spacing(8)
                .into()
            })
            .collect();

        let content = column![
            stats,
            text(format!("Participants: {}", summary.participants.join(", "))).size(14),
            kinds,
            text("Messages").size(16),
            Column::with_children(messages).spacing(6),
        ]
        .spacing(16)
        .padding([0, 16, 16, 16]);

        column![back_header(title), scrollable(content).height(Length::Fill)]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    pub fn call_room(state: &AppState, room_id: &str) -> Element<'static, Message> {
        let title = format!("Call Room {}", room_id);
        let Some(summary) = CallRoomSummary::build(state.dashboard.data(), room_id) else {
            return column![
                back_header(title),
                empty_state("No calls in this room", "The room may not exist yet"),
            ]
            .into();
        };

        let palette = state.palette();

        let stats = row![
            stat_card("Total Calls", summary.total_calls().to_string(), palette.surface),
            stat_card("Success Rate", format!("{}%", summary.success_rate), palette.surface),
            stat_card(
                "Talk Time",
                duration_long(summary.completed_duration),
                palette.surface
            ),
        ]
        .spacing(12);

        let mut statuses = column![text("By status").size(16)].spacing(6);
        for status in CallLogStatus::ALL {
            let (count, percent) = summary.status_share(status);
            statuses = statuses.push(
                row![
                    badge(status.label(), palette.call_status(status)),
                    Space::with_width(Length::Fill),
                    text(format!("{} ({}%)", count, percent)).size(13),
                ]
                .align_items(Alignment::Center),
            );
        }

        let mut types = column![text("By type").size(16)].spacing(6);
        for call_type in [CallType::Audio, CallType::Video] {
            let (count, percent) = summary.type_share(call_type);
            types = types.push(row![
                text(call_type.label()).size(13),
                Space::with_width(Length::Fill),
                text(format!("{} ({}%)", count, percent)).size(13),
            ]);
        }

        let calls: Vec<Element<'static, Message>> = summary
            .calls
            .iter()
            .map(|c| {
                let duration = if c.status == CallLogStatus::Completed {
                    duration_long(c.duration)
                } else {
                    "-".to_string()
                };
                row![
                    text(format!("{} -> {}", c.caller_name, c.receiver_name))
                        .size(13)
                        .width(Length::FillPortion(4)),
                    text(c.call_type.label()).size(12).width(Length::FillPortion(1)),
                    text(c.status.label()).size(12).width(Length::FillPortion(1)),
                    text(duration).size(12).width(Length::FillPortion(1)),
                    text(short_date(&c.start_time)).size(12).width(Length::FillPortion(2)),
                ]
                .spacing(8)
                .into()
            })
            .collect();

        let content = column![
            stats,
            text(format!("Participants: {}", summary.participants.join(", "))).size(14),
            row![statuses, Space::with_width(40), types],
            text("Calls").size(16),
            Column::with_children(calls).spacing(6),
        ]
        .spacing(16)
        .padding([0, 16, 16, 16]);

        column![back_header(title), scrollable(content).height(Length::Fill)]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}
