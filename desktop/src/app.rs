//! Main application module for Huddle Desktop

use crate::config::AppConfig;
use crate::database::Database;
use crate::messages::Message;
use crate::screens::{
    call::CallScreen, chat::ChatScreen, dashboard::DashboardScreen, home::HomeScreen,
    login::LoginScreen, room_detail::RoomDetailScreen, settings::SettingsScreen,
    user_detail::UserDetailScreen,
};
use crate::state::{AppState, Screen};
use crate::theme;

use futures::SinkExt;
use huddle_core::dashboard::LoadTicket;
use huddle_core::{AuthContext, AuthUser, CallParticipant, DashboardRoute, HuddleClient};
use iced::widget::{button, column, container, row, text};
use iced::{executor, Application, Color, Command, Element, Length, Subscription};
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const DASHBOARD_ROUTE_KEY: &str = "dashboard_route";

pub struct Flags {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub client: Arc<HuddleClient>,
}

pub struct Huddle {
    state: AppState,
    db: Option<Arc<Database>>,
    client: Arc<HuddleClient>,
}

impl Application for Huddle {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = iced::Theme;
    type Flags = Flags;

    fn new(flags: Self::Flags) -> (Self, Command<Self::Message>) {
        let db = match Database::new(&flags.data_dir) {
            Ok(db) => Some(Arc::new(db)),
            Err(e) => {
                tracing::error!("Failed to open local database: {}", e);
                None
            }
        };

        let mut state = AppState::new(flags.data_dir, flags.config);
        state.offline = flags.client.is_offline();

        if let Some(db) = &db {
            if let Ok(Some(query)) = db.get_setting(DASHBOARD_ROUTE_KEY) {
                state.dashboard.set_route(DashboardRoute::parse(&query));
            }
        }

        let cached = db
            .as_ref()
            .and_then(|db| db.get_session().ok().flatten());

        let command = match cached {
            Some(session) => {
                state.is_loading = true;
                let auth = flags.client.auth();
                Command::perform(
                    async move { auth.restore(session).await.map_err(|e| e.to_string()) },
                    Message::SessionRestored,
                )
            }
            None => Command::none(),
        };

        let app = Self {
            state,
            db,
            client: flags.client,
        };

        (app, command)
    }

    fn title(&self) -> String {
        match &self.state.current_screen {
            Screen::Login => "Huddle - Login".to_string(),
            Screen::Home => "Huddle".to_string(),
            Screen::Chat(contact) => format!("Huddle - {}", contact.name),
            Screen::Dashboard => "Huddle - Dashboard".to_string(),
            Screen::UserDetail(_) => "Huddle - User".to_string(),
            Screen::ChatRoom(_) => "Huddle - Chat Room".to_string(),
            Screen::CallRoom(_) => "Huddle - Call Room".to_string(),
            Screen::Settings => "Huddle - Settings".to_string(),
        }
    }

    fn update(&mut self, message: Self::Message) -> Command<Self::Message> {
        match message {
            // ============= Navigation =============
            Message::GoBack => {
                let parent = self.state.current_screen.parent();
                self.navigate(parent);
                Command::none()
            }

            // ============= Login =============
            Message::EmailChanged(email) => {
                self.state.login_email = email;
                Command::none()
            }

            Message::PasswordChanged(password) => {
                self.state.login_password = password;
                Command::none()
            }

            Message::DisplayNameChanged(name) => {
                self.state.login_display_name = name;
                Command::none()
            }

            Message::ToggleSignUpMode => {
                self.state.sign_up_mode = !self.state.sign_up_mode;
                self.state.error = None;
                Command::none()
            }

            Message::Login => {
                if self.state.is_loading {
                    return Command::none();
                }
                self.state.is_loading = true;
                self.state.error = None;

                let auth = self.client.auth();
                let email = self.state.login_email.trim().to_string();
                let password = self.state.login_password.clone();

                Command::perform(
                    async move {
                        auth.sign_in(&email, &password)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    Message::AuthCompleted,
                )
            }

            Message::SignUp => {
                if self.state.is_loading {
                    return Command::none();
                }
                self.state.is_loading = true;
                self.state.error = None;

                let auth = self.client.auth();
                let email = self.state.login_email.trim().to_string();
                let password = self.state.login_password.clone();
                let display_name = Some(self.state.login_display_name.trim().to_string())
                    .filter(|name| !name.is_empty());

                Command::perform(
                    async move {
                        auth.sign_up(&email, &password, display_name.as_deref())
                            .await
                            .map_err(|e| e.to_string())
                    },
                    Message::AuthCompleted,
                )
            }

            Message::AuthCompleted(Ok(user)) => {
                self.cache_session();
                self.enter(user);
                Command::none()
            }

            Message::AuthCompleted(Err(error)) => {
                self.state.is_loading = false;
                self.state.error = Some(error);
                Command::none()
            }

            Message::SessionRestored(Ok(user)) => {
                tracing::info!(uid = %user.uid, "Session restored");
                self.cache_session();
                self.enter(user);
                Command::none()
            }

            Message::SessionRestored(Err(error)) => {
                tracing::info!("Cached session not restored: {}", error);
                self.state.is_loading = false;
                if let Some(db) = &self.db {
                    db.clear_session().ok();
                }
                Command::none()
            }

            // Token refreshes and sessions that ended outside the UI
            Message::AuthStateChanged(Some(user)) => {
                if self.state.user.is_some() {
                    self.cache_session();
                    self.state.user = Some(user);
                }
                if let Some(error) = self.client.auth().error() {
                    self.state.error = Some(error);
                }
                Command::none()
            }

            Message::AuthStateChanged(None) => {
                if self.state.user.is_some() {
                    tracing::info!("Session ended");
                    self.client.call().end_call();
                    if let Some(db) = &self.db {
                        db.clear_session().ok();
                    }
                    self.state.sign_out();
                    self.state.error = self.client.auth().error();
                }
                Command::none()
            }

            Message::Logout => {
                self.client.call().end_call();
                if let Some(db) = &self.db {
                    db.clear_session().ok();
                }
                self.state.sign_out();

                let auth = self.client.auth();
                Command::perform(
                    async move {
                        auth.sign_out().await.ok();
                    },
                    |_| Message::LoggedOut,
                )
            }

            Message::LoggedOut => {
                tracing::debug!("Sign-out finished");
                Command::none()
            }

            // ============= Chat list =============
            Message::ContactsUpdated(contacts) => {
                self.state.contacts = contacts;
                Command::none()
            }

            Message::LastMessageUpdated(room_id, last) => {
                match last {
                    Some(message) => {
                        self.state.last_messages.insert(room_id, message);
                    }
                    None => {
                        self.state.last_messages.remove(&room_id);
                    }
                }
                Command::none()
            }

            Message::OpenChat(contact) => {
                match self.client.room_with(&contact.id) {
                    Ok(room_id) => {
                        self.state.open_chat(room_id);
                        self.navigate(Screen::Chat(contact));
                    }
                    Err(e) => self.state.error = Some(e.to_string()),
                }
                Command::none()
            }

            // ============= Messaging =============
            Message::MessagesUpdated(room_id, messages) => {
                if self.state.current_room.as_deref() == Some(room_id.as_str()) {
                    self.state.current_messages = messages;
                }
                Command::none()
            }

            Message::MessageInputChanged(input) => {
                self.state.message_input = input;
                Command::none()
            }

            Message::SendMessage => {
                let text = self.state.message_input.trim().to_string();
                let Some(room_id) = self.state.current_room.clone() else {
                    return Command::none();
                };
                if text.is_empty() {
                    return Command::none();
                }
                self.state.message_input.clear();

                let client = self.client.clone();
                Command::perform(
                    async move {
                        client
                            .send_message(&room_id, &text)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    Message::MessageSent,
                )
            }

            Message::MessageSent(Ok(message_id)) => {
                tracing::debug!(message_id = %message_id, "Message sent");
                Command::none()
            }

            Message::MessageSent(Err(error)) => {
                tracing::error!("Failed to send message: {}", error);
                self.state.error = Some(format!("Failed to send message: {}", error));
                Command::none()
            }

            // ============= Calls =============
            Message::StartCall(call_type) => {
                if let Screen::Chat(contact) = &self.state.current_screen {
                    let mut participant = CallParticipant::new(contact.name.clone());
                    if let Some(avatar) = &contact.avatar {
                        participant = participant.with_avatar(avatar.clone());
                    }
                    self.client.call().start_call(call_type, participant);
                    self.state.call = self.client.call().snapshot();
                }
                Command::none()
            }

            Message::EndCall => {
                self.client.call().end_call();
                self.state.call = self.client.call().snapshot();
                Command::none()
            }

            Message::ToggleMute => {
                self.client.call().toggle_mute();
                self.state.call = self.client.call().snapshot();
                Command::none()
            }

            Message::ToggleVideo => {
                self.client.call().toggle_video();
                self.state.call = self.client.call().snapshot();
                Command::none()
            }

            Message::Tick => {
                self.state.call = self.client.call().snapshot();
                Command::none()
            }

            // ============= Dashboard =============
            Message::OpenDashboard => {
                self.navigate(Screen::Dashboard);
                let uid = self.state.user_id().map(str::to_string);
                match self.state.dashboard.begin_load(uid.as_deref()) {
                    Some(ticket) => self.load_dashboard(ticket),
                    None => Command::none(),
                }
            }

            Message::DashboardLoaded(ticket, outcome) => {
                self.state.dashboard.apply(&ticket, outcome);
                Command::none()
            }

            Message::RetryDashboard => {
                let Some(uid) = self.state.user_id().map(str::to_string) else {
                    return Command::none();
                };
                match self.state.dashboard.retry(&uid) {
                    Some(ticket) => self.load_dashboard(ticket),
                    None => Command::none(),
                }
            }

            Message::SelectTab(tab) => {
                self.state.dashboard.select_tab(tab);
                self.save_route();
                Command::none()
            }

            Message::SetPage(page) => {
                self.state.dashboard.go_to_page(page);
                self.save_route();
                Command::none()
            }

            Message::CallFilterChanged(filter) => {
                self.state.dashboard.set_call_filter(filter);
                Command::none()
            }

            Message::UserFilterChanged(filter) => {
                self.state.dashboard.set_user_filter(filter);
                Command::none()
            }

            Message::OpenUser(user_id) => {
                self.navigate(Screen::UserDetail(user_id));
                Command::none()
            }

            Message::OpenChatRoom(room_id) => {
                self.navigate(Screen::ChatRoom(room_id));
                Command::none()
            }

            Message::OpenCallRoom(room_id) => {
                self.navigate(Screen::CallRoom(room_id));
                Command::none()
            }

            // ============= Settings =============
            Message::OpenSettings => {
                self.navigate(Screen::Settings);
                Command::none()
            }

            Message::ThemeChanged(dark) => {
                self.state.config.ui.theme = if dark { "dark" } else { "light" }.to_string();
                if let Err(e) = self.state.config.save(&self.state.data_dir) {
                    tracing::warn!("Failed to save config: {}", e);
                }
                Command::none()
            }

            // ============= Misc =============
            Message::ClearError => {
                self.state.error = None;
                self.client.auth().clear_error();
                Command::none()
            }
        }
    }

    fn view(&self) -> Element<Self::Message> {
        let content: Element<Self::Message> = if self.state.call.is_active() {
            CallScreen::view(&self.state)
        } else {
            match &self.state.current_screen {
                Screen::Login => LoginScreen::view(&self.state),
                Screen::Home => HomeScreen::view(&self.state),
                Screen::Chat(contact) => ChatScreen::view(&self.state, contact),
                Screen::Dashboard => DashboardScreen::view(&self.state),
                Screen::UserDetail(user_id) => UserDetailScreen::view(&self.state, user_id),
                Screen::ChatRoom(room_id) => RoomDetailScreen::chat_room(&self.state, room_id),
                Screen::CallRoom(room_id) => RoomDetailScreen::call_room(&self.state, room_id),
                Screen::Settings => SettingsScreen::view(&self.state),
            }
        };

        // Wrap with error display if any
        let content = if let Some(ref error) = self.state.error {
            column![
                container(
                    row![
                        text(error).style(iced::theme::Text::Color(Color::WHITE)),
                        button(text("X"))
                            .on_press(Message::ClearError)
                            .style(iced::theme::Button::Text)
                    ]
                    .spacing(10)
                )
                .padding(10)
                .width(Length::Fill)
                .style(theme::filled(Color::from_rgb(0.3, 0.1, 0.1))),
                content
            ]
            .into()
        } else {
            content
        };

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Self::Message> {
        let mut subscriptions = Vec::new();

        // Re-read the call every second while the overlay is up
        if self.state.call.is_active() {
            subscriptions.push(iced::time::every(Duration::from_secs(1)).map(|_| Message::Tick));
        }

        let Some(uid) = self.state.user_id() else {
            return Subscription::batch(subscriptions);
        };

        subscriptions.push(auth_observer(self.client.auth()));

        let users = self.client.users().clone();
        let me = uid.to_string();
        subscriptions.push(store_listener(
            ("contacts", me.clone()),
            move |tx| {
                users.listen_users(&me, move |contacts| {
                    let _ = tx.send(contacts);
                })
            },
            Message::ContactsUpdated,
        ));

        for conversation in self.state.conversations() {
            let chat = self.client.chat().clone();
            let room = conversation.room_id;
            let listen_room = room.clone();
            subscriptions.push(store_listener(
                ("last_message", room.clone()),
                move |tx| {
                    chat.last_message(&listen_room, move |last| {
                        let _ = tx.send(last);
                    })
                },
                move |last| Message::LastMessageUpdated(room.clone(), last),
            ));
        }

        // Lives exactly as long as the chat view
        if let (Screen::Chat(_), Some(room)) =
            (&self.state.current_screen, self.state.current_room.clone())
        {
            let chat = self.client.chat().clone();
            let listen_room = room.clone();
            subscriptions.push(store_listener(
                ("room", room.clone()),
                move |tx| {
                    chat.listen_messages(&listen_room, move |messages| {
                        let _ = tx.send(messages);
                    })
                },
                move |messages| Message::MessagesUpdated(room.clone(), messages),
            ));
        }

        Subscription::batch(subscriptions)
    }

    fn theme(&self) -> iced::Theme {
        if self.state.config.ui.is_dark() {
            iced::Theme::Dark
        } else {
            iced::Theme::Light
        }
    }
}

impl Huddle {
    fn enter(&mut self, user: AuthUser) {
        self.state.is_loading = false;
        self.state.error = None;
        self.state.user = Some(user);
        self.state.clear_login_form();
        self.navigate(Screen::Home);
    }

    /// Switch screens, releasing whatever the old screen owned.
    fn navigate(&mut self, screen: Screen) {
        let in_dashboard = |s: &Screen| {
            matches!(
                s,
                Screen::Dashboard | Screen::UserDetail(_) | Screen::ChatRoom(_) | Screen::CallRoom(_)
            )
        };

        if !matches!(screen, Screen::Chat(_)) {
            self.state.close_chat();
        }
        if in_dashboard(&self.state.current_screen) && !in_dashboard(&screen) {
            self.state.dashboard.detach();
        }
        if !self.client.auth().is_signed_in() && screen != Screen::Login {
            self.state.current_screen = Screen::Login;
            return;
        }
        self.state.current_screen = screen;
    }

    fn cache_session(&self) {
        if let (Some(db), Some(session)) = (&self.db, self.client.auth().session()) {
            if let Err(e) = db.save_session(&session) {
                tracing::warn!("Failed to cache session: {}", e);
            }
        }
    }

    fn load_dashboard(&self, ticket: LoadTicket) -> Command<Message> {
        let loader = self.client.dashboard().clone();
        Command::perform(
            async move {
                let outcome = loader.load(&ticket.user_id).await;
                (ticket, outcome)
            },
            |(ticket, outcome)| Message::DashboardLoaded(ticket, outcome),
        )
    }

    fn save_route(&self) {
        if let Some(db) = &self.db {
            let query = self.state.dashboard.route().to_query();
            if let Err(e) = db.set_setting(DASHBOARD_ROUTE_KEY, &query) {
                tracing::warn!("Failed to save dashboard route: {}", e);
            }
        }
    }
}

/// Report every sign-in, token refresh and sign-out of `auth`.
fn auth_observer(auth: Arc<AuthContext>) -> Subscription<Message> {
    iced::subscription::channel("auth", 8, move |mut output| async move {
        let mut updates = auth.watch();
        drop(auth);

        loop {
            if updates.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
            let user = updates.borrow_and_update().clone();
            if output.send(Message::AuthStateChanged(user)).await.is_err() {
                tracing::debug!("Auth observer output closed");
            }
        }
    })
}

/// Forward a store listener into the iced runtime. The listener is released
/// when iced drops the subscription.
fn store_listener<I, T, L, F>(id: I, listen: L, to_message: F) -> Subscription<Message>
where
    I: Hash + 'static,
    T: Send + 'static,
    L: FnOnce(mpsc::UnboundedSender<T>) -> huddle_core::Subscription + Send + 'static,
    F: Fn(T) -> Message + Send + 'static,
{
    iced::subscription::channel(id, 64, move |mut output| async move {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _listener = listen(tx);

        loop {
            match rx.recv().await {
                Some(value) => {
                    if output.send(to_message(value)).await.is_err() {
                        tracing::debug!("Subscription output closed");
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    })
}
