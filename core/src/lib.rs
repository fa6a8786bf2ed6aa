//! Huddle Core Library
//!
//! Shared library for the Huddle messaging and calling client.
//! Provides: call state, chat over a realtime store, authentication,
//! and the analytics dashboard.

pub mod auth;
pub mod call;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod models;
pub mod placeholder;
pub mod store;
pub mod users;

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

pub use auth::{AuthContext, AuthErrorCode, AuthOperation, AuthSession, AuthUser, IdentityProvider};
pub use call::{CallController, CallTimings};
pub use chat::{room_id, ChatService};
pub use config::ClientConfig;
pub use dashboard::{DashboardLoader, DashboardModel, DashboardOutcome, DashboardRoute, Tab};
pub use error::{Error, Result};
pub use models::*;
pub use placeholder::PlaceholderClient;
pub use store::{MemoryStore, RealtimeStore, Subscription};
pub use users::UserDirectory;

use auth::{FirebaseIdentity, LocalIdentity};
use store::FirebaseStore;

/// Main client instance
pub struct HuddleClient {
    config: ClientConfig,
    offline: bool,
    store: Arc<dyn RealtimeStore>,
    auth: Arc<AuthContext>,
    chat: ChatService,
    users: UserDirectory,
    call: CallController,
    placeholder: PlaceholderClient,
    dashboard: DashboardLoader,
}

impl HuddleClient {
    /// Wire every service from `config`. Without a configured Firebase
    /// project the client runs on an in-memory store and local accounts.
    pub fn new(config: ClientConfig, runtime: Handle) -> Result<Self> {
        if config.firebase.is_configured() {
            let store = FirebaseStore::new(
                &config.firebase.database_url,
                Duration::from_millis(config.store.poll_interval_ms.max(100)),
                runtime.clone(),
            )?;
            let identity = FirebaseIdentity::new(&config.firebase.auth_url, &config.firebase.api_key)?
                .with_token_url(&config.firebase.token_url);
            tracing::info!(database = %config.firebase.database_url, "Using Firebase backend");
            Self::with_backend(config, Arc::new(store), Arc::new(identity), runtime, false)
        } else {
            tracing::warn!("Firebase is not configured, running offline");
            Self::with_backend(
                config,
                Arc::new(MemoryStore::new()),
                Arc::new(LocalIdentity::new()),
                runtime,
                true,
            )
        }
    }

    /// Build on an explicit store and identity provider.
    pub fn with_backend(
        config: ClientConfig,
        store: Arc<dyn RealtimeStore>,
        identity: Arc<dyn IdentityProvider>,
        runtime: Handle,
        offline: bool,
    ) -> Result<Self> {
        let placeholder = PlaceholderClient::new(&config.placeholder.base_url, config.fetch.policy())?;
        let dashboard = DashboardLoader::new(
            Arc::new(placeholder.clone()),
            Duration::from_millis(config.dashboard.load_timeout_ms),
        );

        let auth = Arc::new(AuthContext::new(identity, store.clone()));
        if !offline {
            spawn_token_refresh(&auth, crate::auth::TOKEN_CHECK_INTERVAL, &runtime);
        }

        Ok(Self {
            auth,
            chat: ChatService::with_window(store.clone(), config.store.message_window),
            users: UserDirectory::new(store.clone()),
            call: CallController::new(config.call.timings(), runtime),
            offline,
            store,
            placeholder,
            dashboard,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn store(&self) -> Arc<dyn RealtimeStore> {
        self.store.clone()
    }

    pub fn auth(&self) -> Arc<AuthContext> {
        self.auth.clone()
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn call(&self) -> &CallController {
        &self.call
    }

    pub fn placeholder(&self) -> &PlaceholderClient {
        &self.placeholder
    }

    pub fn dashboard(&self) -> &DashboardLoader {
        &self.dashboard
    }

    /// Send `text` from the signed-in user to `room_id`.
    pub async fn send_message(&self, room_id: &str, text: &str) -> Result<String> {
        if let Err(e) = self.auth.refresh_if_needed().await {
            tracing::warn!(error = %e, "Sending with the current id token");
        }
        let user = self.auth.current_user().ok_or(Error::NotSignedIn)?;
        self.chat
            .send_message(MessageInput {
                text: text.to_string(),
                sender_id: user.uid.clone(),
                sender_name: user.name().to_string(),
                room_id: room_id.to_string(),
            })
            .await
    }

    /// Room shared between the signed-in user and `contact_id`.
    pub fn room_with(&self, contact_id: &str) -> Result<String> {
        let user = self.auth.current_user().ok_or(Error::NotSignedIn)?;
        Ok(room_id(&user.uid, contact_id))
    }
}

/// Keep the id token of `auth` fresh until the context is dropped.
fn spawn_token_refresh(auth: &Arc<AuthContext>, every: Duration, runtime: &Handle) {
    let auth = Arc::downgrade(auth);
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let Some(auth) = auth.upgrade() else {
                break;
            };
            if let Err(e) = auth.refresh_if_needed().await {
                tracing::debug!(error = %e, "Background token refresh failed");
            }
        }
    });
}
