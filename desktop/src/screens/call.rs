//! Call overlay for Huddle Desktop

use crate::messages::Message;
use crate::screens::avatar;
use crate::state::AppState;
use huddle_core::format::clock;
use huddle_core::{CallSession, CallStatus, CallType};
use iced::widget::{button, column, container, row, text, Space};
use iced::{Alignment, Element, Length};

pub struct CallScreen;

impl CallScreen {
    pub fn view(state: &AppState) -> Element<'static, Message> {
        let call = &state.call;
        let name = call
            .participant
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();

        let kind = match call.call_type {
            Some(CallType::Video) => "Video call",
            _ => "Audio call",
        };

        let status: Element<'static, Message> = match call.status {
            CallStatus::Ringing => text("Ringing...").size(18).into(),
            CallStatus::Connected => column![
                text(Self::connected_label(call)).size(14),
                text(clock(call.elapsed_seconds)).size(24),
            ]
            .align_items(Alignment::Center)
            .spacing(4)
            .into(),
            CallStatus::Ended => text("Call Ended").size(18).into(),
            CallStatus::Idle => Space::with_height(0).into(),
        };

        let controls = match call.status {
            CallStatus::Ringing => Self::end_button(),
            CallStatus::Connected => Self::connected_controls(call),
            _ => Space::with_height(80).into(),
        };

        let content = column![
            Space::with_height(Length::FillPortion(1)),
            avatar(&name, 150),
            Space::with_height(30),
            text(name).size(32),
            text(kind).size(16),
            Space::with_height(10),
            status,
            Space::with_height(Length::FillPortion(1)),
            controls,
            Space::with_height(50),
        ]
        .align_items(Alignment::Center)
        .width(Length::Fill);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x()
            .into()
    }

    fn connected_label(call: &CallSession) -> &'static str {
        match call.call_type {
            Some(CallType::Video) if call.is_video_off => "Video off: Connected",
            Some(CallType::Video) => "Video call: Connected",
            _ => "Audio call: Connected",
        }
    }

    fn round_button(label: &str, message: Message) -> Element<'static, Message> {
        button(
            container(text(label.to_string()).size(14))
                .width(70)
                .height(70)
                .center_x()
                .center_y(),
        )
        .on_press(message)
        .into()
    }

    fn end_button() -> Element<'static, Message> {
        Self::round_button("End", Message::EndCall)
    }

    fn connected_controls(call: &CallSession) -> Element<'static, Message> {
        let mute = Self::round_button(if call.is_muted { "Unmute" } else { "Mute" }, Message::ToggleMute);

        // Video toggle only for video calls
        let video: Element<'static, Message> = if call.call_type == Some(CallType::Video) {
            Self::round_button(
                if call.is_video_off { "Video On" } else { "Video Off" },
                Message::ToggleVideo,
            )
        } else {
            Space::with_width(0).into()
        };

        row![
            mute,
            Space::with_width(20),
            video,
            Space::with_width(20),
            Self::end_button(),
        ]
        .align_items(Alignment::Center)
        .into()
    }
}
