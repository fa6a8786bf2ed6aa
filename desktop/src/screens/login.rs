//! Login and sign-up screen for Huddle Desktop

use crate::messages::Message;
use crate::state::AppState;
use iced::widget::{button, column, container, text, text_input, Space};
use iced::{Alignment, Element, Length};

pub struct LoginScreen;

impl LoginScreen {
    pub fn view(state: &AppState) -> Element<'static, Message> {
        let title = text("Huddle").size(48);

        let subtitle = text(if state.sign_up_mode {
            "Create your account"
        } else {
            "Sign in to continue"
        })
        .size(16);

        let submit = if state.sign_up_mode {
            Message::SignUp
        } else {
            Message::Login
        };

        // Credentials
        let mut credentials = column![].spacing(8);
        if state.sign_up_mode {
            credentials = credentials.push(
                text_input("Display name", &state.login_display_name)
                    .on_input(Message::DisplayNameChanged)
                    .padding(12),
            );
        }
        credentials = credentials
            .push(
                text_input("Email", &state.login_email)
                    .on_input(Message::EmailChanged)
                    .padding(12),
            )
            .push(
                text_input("Password", &state.login_password)
                    .on_input(Message::PasswordChanged)
                    .on_submit(submit.clone())
                    .padding(12)
                    .secure(true),
            );

        // Submit button
        let label = match (state.is_loading, state.sign_up_mode) {
            (true, _) => "Please wait...",
            (false, true) => "Sign Up",
            (false, false) => "Sign In",
        };
        let mut submit_btn = button(
            text(label).horizontal_alignment(iced::alignment::Horizontal::Center),
        )
        .width(Length::Fill)
        .padding(14);
        if !state.is_loading {
            submit_btn = submit_btn.on_press(submit);
        }

        let toggle = button(
            text(if state.sign_up_mode {
                "Already have an account? Sign in"
            } else {
                "No account yet? Sign up"
            })
            .size(13),
        )
        .style(iced::theme::Button::Text)
        .on_press(Message::ToggleSignUpMode);

        let form = column![credentials, Space::with_height(20), submit_btn, toggle]
            .spacing(10)
            .align_items(Alignment::Center)
            .max_width(400);

        let mode_hint: Element<'static, Message> = if state.offline {
            text("Offline mode: accounts and messages live only in this session.")
                .size(12)
                .into()
        } else {
            Space::with_height(0).into()
        };

        // Main layout
        let content = column![
            Space::with_height(Length::FillPortion(1)),
            title,
            subtitle,
            Space::with_height(40),
            form,
            Space::with_height(30),
            mode_hint,
            Space::with_height(Length::FillPortion(1)),
        ]
        .align_items(Alignment::Center)
        .spacing(10)
        .padding(40);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x()
            .center_y()
            .into()
    }
}
