//! Application messages (events)

use huddle_core::dashboard::{LoadTicket, StatusFilter};
use huddle_core::{
    AuthUser, CallLogStatus, CallType, ChatMessage, Contact, DashboardOutcome, Tab, UserStatus,
};

#[derive(Debug, Clone)]
pub enum Message {
    // Navigation
    GoBack,

    // Login
    EmailChanged(String),
    PasswordChanged(String),
    DisplayNameChanged(String),
    ToggleSignUpMode,
    Login,
    SignUp,
    AuthCompleted(Result<AuthUser, String>),
    SessionRestored(Result<AuthUser, String>),
    AuthStateChanged(Option<AuthUser>),
    Logout,
    LoggedOut,

    // Chat list
    ContactsUpdated(Vec<Contact>),
    LastMessageUpdated(String, Option<ChatMessage>), // room_id
    OpenChat(Contact),

    // Messaging
    MessagesUpdated(String, Vec<ChatMessage>), // room_id
    MessageInputChanged(String),
    SendMessage,
    MessageSent(Result<String, String>),

    // Calls
    StartCall(CallType),
    EndCall,
    ToggleMute,
    ToggleVideo,
    Tick,

    // Dashboard
    OpenDashboard,
    DashboardLoaded(LoadTicket, DashboardOutcome),
    RetryDashboard,
    SelectTab(Tab),
    SetPage(usize),
    CallFilterChanged(StatusFilter<CallLogStatus>),
    UserFilterChanged(StatusFilter<UserStatus>),
    OpenUser(String),
    OpenChatRoom(String),
    OpenCallRoom(String),

    // Settings
    OpenSettings,
    ThemeChanged(bool), // dark

    // Errors
    ClearError,
}
