//! Application state management

use crate::config::AppConfig;
use crate::theme::Palette;
use huddle_core::chat::{conversations_for, sort_conversations};
use huddle_core::{AuthUser, CallSession, ChatMessage, Contact, Conversation, DashboardModel};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Login,
    Home,
    Chat(Contact),
    Dashboard,
    UserDetail(String), // user_id
    ChatRoom(String),   // room_id
    CallRoom(String),   // room_id
    Settings,
}

impl Screen {
    /// Where "Back" leads from this screen.
    pub fn parent(&self) -> Screen {
        match self {
            Screen::Login => Screen::Login,
            Screen::UserDetail(_) | Screen::ChatRoom(_) | Screen::CallRoom(_) => Screen::Dashboard,
            _ => Screen::Home,
        }
    }
}

pub struct AppState {
    // Paths
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub offline: bool,

    // Navigation
    pub current_screen: Screen,

    // Auth
    pub user: Option<AuthUser>,
    pub login_email: String,
    pub login_password: String,
    pub login_display_name: String,
    pub sign_up_mode: bool,

    // Chat list
    pub contacts: Vec<Contact>,
    pub last_messages: HashMap<String, ChatMessage>,

    // Open chat
    pub current_room: Option<String>,
    pub current_messages: Vec<ChatMessage>,
    pub message_input: String,

    // Calls
    pub call: CallSession,

    // Dashboard
    pub dashboard: DashboardModel,

    // UI State
    pub is_loading: bool,
    pub error: Option<String>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, config: AppConfig) -> Self {
        let dashboard = DashboardModel::new(config.client.dashboard.page_size);
        Self {
            data_dir,
            config,
            offline: false,
            current_screen: Screen::Login,
            user: None,
            login_email: String::new(),
            login_password: String::new(),
            login_display_name: String::new(),
            sign_up_mode: false,
            contacts: Vec::new(),
            last_messages: HashMap::new(),
            current_room: None,
            current_messages: Vec::new(),
            message_input: String::new(),
            call: CallSession::default(),
            dashboard,
            is_loading: false,
            error: None,
        }
    }

    pub fn palette(&self) -> Palette {
        Palette::for_mode(self.config.ui.is_dark())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.uid.as_str())
    }

    /// Chat list entries, newest conversation first.
    pub fn conversations(&self) -> Vec<Conversation> {
        let Some(uid) = self.user_id() else {
            return Vec::new();
        };

        let mut conversations = conversations_for(uid, &self.contacts);
        for conversation in &mut conversations {
            conversation.last_message = self.last_messages.get(&conversation.room_id).cloned();
        }
        sort_conversations(&mut conversations);
        conversations
    }

    pub fn open_chat(&mut self, room_id: String) {
        if self.current_room.as_deref() != Some(room_id.as_str()) {
            self.current_messages.clear();
            self.message_input.clear();
        }
        self.current_room = Some(room_id);
    }

    pub fn close_chat(&mut self) {
        self.current_room = None;
        self.current_messages.clear();
        self.message_input.clear();
    }

    pub fn clear_login_form(&mut self) {
        self.login_password.clear();
        self.login_display_name.clear();
        self.sign_up_mode = false;
    }

    /// Forget everything that belongs to the signed-in user.
    pub fn sign_out(&mut self) {
        self.user = None;
        self.contacts.clear();
        self.last_messages.clear();
        self.close_chat();
        self.call = CallSession::default();
        self.dashboard.reset();
        self.current_screen = Screen::Login;
        self.is_loading = false;
    }

    /// Chat list preview time: clock for today, "Yesterday", then dates.
    pub fn format_timestamp(timestamp: i64) -> String {
        use chrono::{Datelike, Local, TimeZone};

        let Some(dt) = Local.timestamp_millis_opt(timestamp).single() else {
            return String::new();
        };
        let now = Local::now();

        if dt.date_naive() == now.date_naive() {
            dt.format("%H:%M").to_string()
        } else if dt.date_naive() == (now - chrono::Duration::days(1)).date_naive() {
            "Yesterday".to_string()
        } else if dt.year() == now.year() {
            dt.format("%d %b").to_string()
        } else {
            dt.format("%d.%m.%Y").to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::room_id;

    fn contact(id: &str) -> Contact {
        Contact {
            id: id.into(),
            name: id.to_uppercase(),
            email: None,
            avatar: None,
        }
    }

    fn message(room: &str, timestamp: i64) -> ChatMessage {
        ChatMessage {
            id: format!("m{}", timestamp),
            room_id: room.into(),
            text: "hi".into(),
            sender_id: "bob".into(),
            sender_name: "Bob".into(),
            timestamp,
        }
    }

    fn signed_in() -> AppState {
        let mut state = AppState::new(PathBuf::from("."), AppConfig::default());
        state.user = Some(AuthUser {
            uid: "me".into(),
            display_name: Some("Me".into()),
            email: None,
            photo_url: None,
        });
        state
    }

    #[test]
    fn conversations_follow_latest_message() {
        let mut state = signed_in();
        state.contacts = vec![contact("ann"), contact("bob"), contact("cat")];
        let bob_room = room_id("me", "bob");
        let cat_room = room_id("me", "cat");
        state.last_messages.insert(bob_room.clone(), message(&bob_room, 10));
        state.last_messages.insert(cat_room.clone(), message(&cat_room, 20));

        let order: Vec<String> = state
            .conversations()
            .into_iter()
            .map(|c| c.contact.id)
            .collect();
        assert_eq!(order, vec!["cat", "bob", "ann"]);
    }

    #[test]
    fn no_conversations_when_signed_out() {
        let mut state = AppState::new(PathBuf::from("."), AppConfig::default());
        state.contacts = vec![contact("ann")];
        assert!(state.conversations().is_empty());
    }

    #[test]
    fn sign_out_clears_user_data() {
        let mut state = signed_in();
        state.contacts = vec![contact("ann")];
        state.open_chat("ann_me".into());
        state.current_messages.push(message("ann_me", 1));
        state.current_screen = Screen::Settings;

        state.sign_out();
        assert!(state.user.is_none());
        assert!(state.contacts.is_empty());
        assert!(state.current_room.is_none());
        assert!(state.current_messages.is_empty());
        assert_eq!(state.current_screen, Screen::Login);
    }

    #[test]
    fn back_navigation() {
        assert_eq!(Screen::UserDetail("user-1".into()).parent(), Screen::Dashboard);
        assert_eq!(Screen::CallRoom("r".into()).parent(), Screen::Dashboard);
        assert_eq!(Screen::Dashboard.parent(), Screen::Home);
        assert_eq!(Screen::Chat(contact("ann")).parent(), Screen::Home);
        assert_eq!(Screen::Login.parent(), Screen::Login);
    }
}
