//! Client configuration

use crate::auth::{DEFAULT_AUTH_URL, DEFAULT_TOKEN_URL};
use crate::call::CallTimings;
use crate::chat::MESSAGE_WINDOW;
use crate::dashboard::DEFAULT_PAGE_SIZE;
use crate::placeholder::{FetchPolicy, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub api_key: String,
    /// Realtime Database root. Empty selects the in-memory store.
    pub database_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub project_id: Option<String>,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            database_url: String::new(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            project_id: None,
        }
    }
}

impl FirebaseConfig {
    pub fn is_configured(&self) -> bool {
        !self.database_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    pub base_url: String,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub attempts: u32,
    pub backoff_base_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            attempts: 3,
            backoff_base_ms: 100,
        }
    }
}

impl FetchConfig {
    pub fn policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            attempts: self.attempts,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    pub ringing_ms: u64,
    pub ended_ms: u64,
    pub tick_ms: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ringing_ms: 3_000,
            ended_ms: 2_000,
            tick_ms: 1_000,
        }
    }
}

impl CallConfig {
    pub fn timings(&self) -> CallTimings {
        CallTimings {
            ringing: Duration::from_millis(self.ringing_ms),
            ended: Duration::from_millis(self.ended_ms),
            tick: Duration::from_millis(self.tick_ms.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub page_size: usize,
    pub load_timeout_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            load_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How often a remote subscription re-reads its path.
    pub poll_interval_ms: u64,
    pub message_window: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_500,
            message_window: MESSAGE_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub firebase: FirebaseConfig,
    pub placeholder: PlaceholderConfig,
    pub fetch: FetchConfig,
    pub call: CallConfig,
    pub dashboard: DashboardConfig,
    pub store: StoreConfig,
}

impl ClientConfig {
    /// Apply `HUDDLE_*` overrides from the environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("HUDDLE_FIREBASE_API_KEY") {
            self.firebase.api_key = key;
        }
        if let Some(url) = lookup("HUDDLE_FIREBASE_DATABASE_URL") {
            self.firebase.database_url = url;
        }
        if let Some(url) = lookup("HUDDLE_PLACEHOLDER_URL") {
            self.placeholder.base_url = url;
        }
    }
}
