//! Activity dashboard for Huddle Desktop

use crate::messages::Message;
use crate::screens::{back_header, badge, empty_state, stat_card};
use crate::state::AppState;
use crate::theme::{self, Palette};
use huddle_core::dashboard::{LoadPhase, Page, StatusFilter, TIMEOUT_MESSAGE};
use huddle_core::format::{duration_long, hours_minutes, short_date};
use huddle_core::{
    CallLogRecord, CallLogStatus, DashboardMessage, DashboardModel, Tab, UserStatRecord,
    UserStatus,
};
use iced::widget::{button, column, container, pick_list, row, scrollable, text, Column, Space};
use iced::{Alignment, Element, Length};

pub struct DashboardScreen;

impl DashboardScreen {
    pub fn view(state: &AppState) -> Element<'static, Message> {
        let model = &state.dashboard;
        let palette = state.palette();

        let body: Element<'static, Message> = match model.phase() {
            LoadPhase::Idle | LoadPhase::Loading if model.data().is_empty() => {
                empty_state("Loading dashboard...", "Fetching messages, calls and users")
            }
            LoadPhase::TimedOut => Self::timeout_view(),
            phase => {
                let mut content = column![].spacing(16).padding([0, 16, 16, 16]);
                if let LoadPhase::Failed(error) = phase {
                    content = content.push(Self::error_banner(error, &palette));
                }
                content
                    .push(Self::stats_row(model, &palette))
                    .push(Self::tabs(model))
                    .push(Self::tab_content(model, &palette))
                    .into()
            }
        };

        column![back_header("Dashboard".to_string()), body]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn timeout_view() -> Element<'static, Message> {
        container(
            column![
                text("Request timeout").size(22),
                Space::with_height(10),
                text(TIMEOUT_MESSAGE).size(14),
                Space::with_height(20),
                button(text("Retry").size(14))
                    .padding([10, 20])
                    .on_press(Message::RetryDashboard),
            ]
            .align_items(Alignment::Center),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x()
        .center_y()
        .into()
    }

    fn error_banner(error: &str, palette: &Palette) -> Element<'static, Message> {
        container(
            row![
                text(format!("Failed to load dashboard data: {}", error)).size(14),
                Space::with_width(Length::Fill),
                button(text("Retry").size(13))
                    .padding([6, 14])
                    .on_press(Message::RetryDashboard),
            ]
            .align_items(Alignment::Center),
        )
        .padding(10)
        .width(Length::Fill)
        .style(theme::filled(palette.error))
        .into()
    }

    fn stats_row(model: &DashboardModel, palette: &Palette) -> Element<'static, Message> {
        let stats = model.stats();
        row![
            stat_card("Total Messages", stats.total_messages.to_string(), palette.surface),
            stat_card("Total Calls", stats.total_calls.to_string(), palette.surface),
            stat_card("Active Users", stats.active_users.to_string(), palette.surface),
            stat_card(
                "Total Call Duration",
                hours_minutes(stats.total_call_duration),
                palette.surface
            ),
        ]
        .spacing(12)
        .into()
    }

    fn tabs(model: &DashboardModel) -> Element<'static, Message> {
        let mut tabs = row![].spacing(8).align_items(Alignment::Center);
        for tab in Tab::ALL {
            let style = if tab == model.tab() {
                iced::theme::Button::Primary
            } else {
                iced::theme::Button::Secondary
            };
            tabs = tabs.push(
                button(text(tab.label()).size(14))
                    .padding([8, 16])
                    .style(style)
                    .on_press(Message::SelectTab(tab)),
            );
        }

        tabs = tabs.push(Space::with_width(Length::Fill));
        match model.tab() {
            Tab::Messages => {}
            Tab::Calls => {
                tabs = tabs.push(text("Status").size(13)).push(pick_list(
                    StatusFilter::options(&CallLogStatus::ALL),
                    Some(model.call_filter()),
                    Message::CallFilterChanged,
                ));
            }
            Tab::Users => {
                tabs = tabs.push(text("Status").size(13)).push(pick_list(
                    StatusFilter::options(&UserStatus::ALL),
                    Some(model.user_filter()),
                    Message::UserFilterChanged,
                ));
            }
        }
        tabs.into()
    }

    fn tab_content(model: &DashboardModel, palette: &Palette) -> Element<'static, Message> {
        match model.tab() {
            Tab::Messages => {
                let page = model.messages_page();
                let rows = page.items.iter().map(Self::message_row).collect();
                Self::table(&page, rows, "No messages found")
            }
            Tab::Calls => {
                let page = model.calls_page();
                let rows = page.items.iter().map(|c| Self::call_row(c, palette)).collect();
                Self::table(&page, rows, "No call logs match this filter")
            }
            Tab::Users => {
                let page = model.users_page();
                let rows = page.items.iter().map(|u| Self::user_row(u, palette)).collect();
                Self::table(&page, rows, "No users match this filter")
            }
        }
    }

    fn table<T>(
        page: &Page<T>,
        rows: Vec<Element<'static, Message>>,
        empty: &str,
    ) -> Element<'static, Message> {
        if rows.is_empty() {
            return empty_state(empty, "");
        }

        let (first, last) = page.range();
        let mut previous = button(text("Previous").size(13)).padding([6, 14]);
        if page.has_previous() {
            previous = previous.on_press(Message::SetPage(page.page - 1));
        }
        let mut next = button(text("Next").size(13)).padding([6, 14]);
        if page.has_next() {
            next = next.on_press(Message::SetPage(page.page + 1));
        }

        let pager = row![
            text(format!("Showing {}-{} of {}", first, last, page.total_items)).size(13),
            Space::with_width(Length::Fill),
            previous,
            text(format!("Page {} of {}", page.page, page.total_pages)).size(13),
            next,
        ]
        .spacing(10)
        .align_items(Alignment::Center);

        column![
            scrollable(Column::with_children(rows).spacing(4).width(Length::Fill))
                .height(Length::Fill),
            pager,
        ]
        .spacing(10)
        .into()
    }

    fn message_row(message: &DashboardMessage) -> Element<'static, Message> {
        row![
            text(message.sender_name.clone()).size(14).width(Length::FillPortion(2)),
            text(message.content.clone()).size(13).width(Length::FillPortion(5)),
            button(text(message.room_id.clone()).size(12))
                .style(iced::theme::Button::Text)
                .on_press(Message::OpenChatRoom(message.room_id.clone()))
                .width(Length::FillPortion(2)),
            text(message.kind.as_str()).size(12).width(Length::FillPortion(1)),
            text(short_date(&message.timestamp)).size(12).width(Length::FillPortion(2)),
        ]
        .spacing(8)
        .align_items(Alignment::Center)
        .into()
    }

    fn call_row(call: &CallLogRecord, palette: &Palette) -> Element<'static, Message> {
        let duration = if call.status == CallLogStatus::Completed {
            duration_long(call.duration)
        } else {
            "-".to_string()
        };

        row![
            text(format!("{} -> {}", call.caller_name, call.receiver_name))
                .size(14)
                .width(Length::FillPortion(3)),
            text(call.call_type.label()).size(12).width(Length::FillPortion(1)),
            container(badge(call.status.label(), palette.call_status(call.status)))
                .width(Length::FillPortion(1)),
            text(duration).size(12).width(Length::FillPortion(1)),
            text(short_date(&call.start_time)).size(12).width(Length::FillPortion(2)),
            button(text(call.room_id.clone()).size(12))
                .style(iced::theme::Button::Text)
                .on_press(Message::OpenCallRoom(call.room_id.clone()))
                .width(Length::FillPortion(2)),
        ]
        .spacing(8)
        .align_items(Alignment::Center)
        .into()
    }

    fn user_row(user: &UserStatRecord, palette: &Palette) -> Element<'static, Message> {
        row![
            button(text(user.user_name.clone()).size(14))
                .style(iced::theme::Button::Text)
                .on_press(Message::OpenUser(user.user_id.clone()))
                .width(Length::FillPortion(2)),
            text(user.email.clone()).size(12).width(Length::FillPortion(3)),
            container(badge(user.status.label(), palette.user_status(user.status)))
                .width(Length::FillPortion(1)),
            text(user.total_messages.to_string()).size(12).width(Length::FillPortion(1)),
            text(user.total_calls.to_string()).size(12).width(Length::FillPortion(1)),
            text(hours_minutes(user.total_call_duration)).size(12).width(Length::FillPortion(1)),
            text(short_date(&user.last_seen)).size(12).width(Length::FillPortion(2)),
        ]
        .spacing(8)
        .align_items(Alignment::Center)
        .into()
    }
}
