//! Dashboard records derived from a generic placeholder HTTP API
//!
//! Comments become messages, todos become call logs and users plus posts
//! become per-user statistics. Every derived field is computed from record
//! ids and list positions against a fixed base date, so two fetches of the
//! same data always map to identical records.

use crate::error::{Error, Result};
use crate::models::{
    CallLogRecord, CallLogStatus, CallType, DashboardData, DashboardMessage, DashboardStats,
    MessageKind, UserStatRecord, UserStatus,
};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{sleep, timeout};

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// 2025-01-01T00:00:00Z
pub const BASE_DATE_MS: i64 = 1_735_689_600_000;

const MAX_RECORDS: usize = 100;

// ============================================================================
// Fetching
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPolicy {
    /// Deadline for the response and, separately, for decoding its body.
    pub timeout: Duration,
    pub attempts: u32,
    pub backoff_base: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            attempts: 3,
            backoff_base: Duration::from_millis(100),
        }
    }
}

impl FetchPolicy {
    /// Pause after the failed `attempt` (1-based): 200 ms, 400 ms, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}

#[derive(Clone)]
pub struct PlaceholderClient {
    http: Client,
    base_url: String,
    policy: FetchPolicy,
}

impl PlaceholderClient {
    pub fn new(base_url: &str, policy: FetchPolicy) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        })
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    /// GET `endpoint` and decode it, retrying with exponential backoff.
    pub async fn fetch_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.fetch_once(endpoint).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        endpoint,
                        attempt,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Fetch failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_timeout() => {
                    tracing::error!(endpoint, attempts, "Fetch timed out");
                    return Err(Error::Timeout(format!(
                        "API did not respond within {} seconds",
                        self.policy.timeout.as_secs_f32()
                    )));
                }
                Err(e) => {
                    tracing::error!(endpoint, attempts, error = %e, "Fetch failed");
                    return Err(Error::Fetch {
                        endpoint: endpoint.to_string(),
                        attempts,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn fetch_once<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let resp = timeout(self.policy.timeout, self.http.get(&url).send()).await??;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )));
        }

        let value = timeout(self.policy.timeout, resp.json::<T>()).await??;
        Ok(value)
    }

    pub async fn fetch_messages(&self, user_id: Option<&str>) -> Result<Vec<DashboardMessage>> {
        let mut comments: Vec<Comment> = self.fetch_json("/comments").await?;
        if let Some(p) = user_id.map(partition) {
            comments.retain(|c| c.post_id % 10 == p);
        }
        Ok(map_comments(&comments))
    }

    pub async fn fetch_call_logs(&self, user_id: Option<&str>) -> Result<Vec<CallLogRecord>> {
        let mut todos: Vec<Todo> = self.fetch_json("/todos").await?;
        if let Some(p) = user_id.map(partition) {
            todos.retain(|t| t.user_id % 10 == p);
        }
        Ok(map_todos(&todos))
    }

    pub async fn fetch_user_stats(&self, user_id: Option<&str>) -> Result<Vec<UserStatRecord>> {
        let (users, mut posts) = tokio::try_join!(
            self.fetch_json::<Vec<User>>("/users"),
            self.fetch_json::<Vec<Post>>("/posts"),
        )?;
        if let Some(p) = user_id.map(partition) {
            posts.retain(|post| post.user_id % 10 == p);
        }
        Ok(map_user_stats(&users, &posts))
    }

    /// Everything the dashboard shows, fetched concurrently.
    pub async fn fetch_dashboard_data(&self, user_id: Option<&str>) -> Result<DashboardData> {
        let (messages, call_logs, user_stats) = tokio::try_join!(
            self.fetch_messages(user_id),
            self.fetch_call_logs(user_id),
            self.fetch_user_stats(user_id),
        )?;

        let stats = DashboardStats::compute(&messages, &call_logs, &user_stats);
        tracing::info!(
            messages = messages.len(),
            calls = call_logs.len(),
            users = user_stats.len(),
            "Dashboard data loaded"
        );

        Ok(DashboardData {
            messages,
            call_logs,
            user_stats,
            stats,
        })
    }
}

// ============================================================================
// Source records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    pub post_id: u64,
    pub name: String,
    pub email: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub website: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub body: String,
}

// ============================================================================
// Mapping
// ============================================================================

/// Demo personalization bucket for a user id: the id's digits read as a
/// number, zero or missing digits count as 1, taken mod 10.
pub fn partition(user_id: &str) -> u64 {
    let digits: Vec<u32> = user_id.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.iter().all(|&d| d == 0) {
        return 1;
    }
    digits.last().copied().map(u64::from).unwrap_or(1)
}

fn base_offset(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(BASE_DATE_MS - ms)
        .single()
        .unwrap_or_default()
}

/// `jane.doe_smith@x` -> `Jane Doe Smith`
pub fn sender_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut out = String::with_capacity(local.len());
    let mut prev_is_word = false;

    for c in local.chars() {
        let c = if c == '.' || c == '_' { ' ' } else { c };
        let is_word = c.is_ascii_alphanumeric();
        if is_word && !prev_is_word {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = is_word;
    }
    out
}

pub fn map_comments(comments: &[Comment]) -> Vec<DashboardMessage> {
    comments
        .iter()
        .take(MAX_RECORDS)
        .enumerate()
        .map(|(index, c)| DashboardMessage {
            id: format!("msg-{}", c.id),
            room_id: format!("room-{}", c.post_id),
            sender_id: format!("user-{}", c.id),
            sender_name: sender_name_from_email(&c.email),
            content: c.body.clone(),
            timestamp: base_offset(index as i64 * 60_000),
            kind: MessageKind::Text,
        })
        .collect()
}

fn call_status(todo: &Todo, index: usize) -> CallLogStatus {
    if todo.completed {
        return CallLogStatus::Completed;
    }
    match index % 3 {
        0 => CallLogStatus::Missed,
        1 => CallLogStatus::Declined,
        _ => CallLogStatus::Ongoing,
    }
}

pub fn map_todos(todos: &[Todo]) -> Vec<CallLogRecord> {
    todos
        .iter()
        .take(MAX_RECORDS)
        .enumerate()
        .map(|(index, todo)| {
            let status = call_status(todo, index);
            let seed = todo.id * 11 + index as u64 * 3;
            let duration = if status == CallLogStatus::Completed {
                seed % 3600 + 60
            } else {
                0
            };
            let start_time = base_offset(index as i64 * 3_600_000);
            let end_time = (status == CallLogStatus::Completed)
                .then(|| start_time + chrono::Duration::seconds(duration as i64));
            let receiver = todo.user_id % 10 + 1;

            CallLogRecord {
                id: format!("call-{}", todo.id),
                room_id: format!("room-{}", todo.user_id),
                caller_id: format!("user-{}", todo.user_id),
                caller_name: format!("User {}", todo.user_id),
                receiver_id: format!("user-{}", receiver),
                receiver_name: format!("User {}", receiver),
                status,
                duration,
                start_time,
                end_time,
                call_type: if index % 2 == 0 {
                    CallType::Video
                } else {
                    CallType::Audio
                },
            }
        })
        .collect()
}

const USER_STATUS_CYCLE: [UserStatus; 4] = [
    UserStatus::Active,
    UserStatus::Active,
    UserStatus::Away,
    UserStatus::Inactive,
];

pub fn map_user_stats(users: &[User], posts: &[Post]) -> Vec<UserStatRecord> {
    let mut comments_per_user: HashMap<u64, u64> = HashMap::new();
    for post in posts {
        let seed = post.user_id * 7 + post.id * 3;
        *comments_per_user.entry(post.user_id).or_default() += seed % 10 + 1;
    }

    users
        .iter()
        .enumerate()
        .map(|(index, user)| {
            let idx = index as u64;
            let seed1 = user.id * 13 + idx * 7;
            let seed2 = user.id * 17 + idx * 11;
            let seed3 = user.id * 19 + idx * 5;

            UserStatRecord {
                id: format!("user-stat-{}", user.id),
                user_id: format!("user-{}", user.id),
                user_name: user.name.clone(),
                email: user.email.clone(),
                status: USER_STATUS_CYCLE[index % USER_STATUS_CYCLE.len()],
                last_seen: base_offset(index as i64 * 86_400_000),
                total_messages: comments_per_user
                    .get(&user.id)
                    .copied()
                    .filter(|&n| n > 0)
                    .unwrap_or(seed1 % 50 + 10),
                total_calls: seed2 % 20 + 5,
                total_call_duration: seed3 % 7200 + 1800,
                avatar: Some(format!("https://i.pravatar.cc/150?img={}", user.id)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(id: u64, user_id: u64, completed: bool) -> Todo {
        Todo {
            id,
            user_id,
            title: format!("todo {}", id),
            completed,
        }
    }

    #[test]
    fn sender_names_are_title_cased() {
        assert_eq!(sender_name_from_email("Eliseo@gardner.biz"), "Eliseo");
        assert_eq!(sender_name_from_email("jayne_kuhic@sydney.com"), "Jayne Kuhic");
        assert_eq!(sender_name_from_email("lew.alysha@x.tv"), "Lew Alysha");
        assert_eq!(sender_name_from_email("mary-ann2b@x"), "Mary-Ann2b");
    }

    #[test]
    fn partition_uses_last_digit_with_default() {
        assert_eq!(partition("user-7"), 7);
        assert_eq!(partition("user-42"), 2);
        assert_eq!(partition("a1b30"), 0);
        assert_eq!(partition("abc"), 1);
        assert_eq!(partition("u000"), 1);
    }

    #[test]
    fn backoff_doubles() {
        let policy = FetchPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn comments_map_to_staggered_messages() {
        let comments: Vec<Comment> = (1..=120)
            .map(|id| Comment {
                id,
                post_id: id / 5 + 1,
                name: "n".into(),
                email: "first.last@example.com".into(),
                body: format!("body {}", id),
            })
            .collect();

        let messages = map_comments(&comments);
        assert_eq!(messages.len(), 100);
        assert_eq!(messages[0].id, "msg-1");
        assert_eq!(messages[0].room_id, "room-1");
        assert_eq!(messages[0].sender_name, "First Last");
        assert_eq!(messages[0].timestamp.timestamp_millis(), BASE_DATE_MS);
        assert_eq!(messages[2].timestamp.timestamp_millis(), BASE_DATE_MS - 120_000);
        assert_eq!(messages[0].kind, MessageKind::Text);
    }

    #[test]
    fn todos_map_to_call_logs() {
        let logs = map_todos(&[
            todo(1, 1, false),
            todo(2, 1, false),
            todo(3, 1, false),
            todo(4, 12, true),
        ]);

        assert_eq!(logs[0].status, CallLogStatus::Missed);
        assert_eq!(logs[1].status, CallLogStatus::Declined);
        assert_eq!(logs[2].status, CallLogStatus::Ongoing);
        assert_eq!(logs[3].status, CallLogStatus::Completed);

        // seed = 4 * 11 + 3 * 3 = 53
        assert_eq!(logs[3].duration, 53 + 60);
        assert_eq!(logs[3].receiver_id, "user-3");
        assert_eq!(logs[3].receiver_name, "User 3");
        let start = logs[3].start_time;
        assert_eq!(start.timestamp_millis(), BASE_DATE_MS - 3 * 3_600_000);
        assert_eq!(
            logs[3].end_time.unwrap().timestamp_millis(),
            start.timestamp_millis() + 113_000
        );

        assert_eq!(logs[0].duration, 0);
        assert!(logs[0].end_time.is_none());
        assert_eq!(logs[0].call_type, CallType::Video);
        assert_eq!(logs[1].call_type, CallType::Audio);
        assert_eq!(logs[0].id, "call-1");
    }

    #[test]
    fn user_stats_use_post_counts_then_seeds() {
        let users: Vec<User> = (1..=5)
            .map(|id| User {
                id,
                name: format!("User {}", id),
                username: String::new(),
                email: format!("u{}@x", id),
                phone: String::new(),
                website: String::new(),
            })
            .collect();
        let posts = vec![
            Post { id: 1, user_id: 1, title: String::new(), body: String::new() },
            Post { id: 2, user_id: 1, title: String::new(), body: String::new() },
        ];

        let stats = map_user_stats(&users, &posts);
        // (7 + 3) % 10 + 1 = 1, (7 + 6) % 10 + 1 = 4
        assert_eq!(stats[0].total_messages, 5);
        // seed1 = 2 * 13 + 7 = 33
        assert_eq!(stats[1].total_messages, 33 % 50 + 10);
        assert_eq!(stats[1].total_calls, (2 * 17 + 11) % 20 + 5);
        assert_eq!(stats[1].total_call_duration, (2 * 19 + 5) % 7200 + 1800);

        let statuses: Vec<UserStatus> = stats.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                UserStatus::Active,
                UserStatus::Active,
                UserStatus::Away,
                UserStatus::Inactive,
                UserStatus::Active
            ]
        );
        assert_eq!(stats[4].avatar.as_deref(), Some("https://i.pravatar.cc/150?img=5"));
        assert_eq!(
            stats[1].last_seen.timestamp_millis(),
            BASE_DATE_MS - 86_400_000
        );
    }

    #[test]
    fn mapping_is_deterministic() {
        let todos: Vec<Todo> = (1..=30).map(|id| todo(id, id % 7, id % 4 == 0)).collect();
        assert_eq!(map_todos(&todos), map_todos(&todos));
    }
}
