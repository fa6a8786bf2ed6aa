//! Dashboard paging, filtering and loading
//!
//! Everything here is view state without a window: the desktop shell owns a
//! [`DashboardModel`], hands the ticket from [`DashboardModel::begin_load`] to
//! a [`DashboardLoader`] task and feeds the outcome back through
//! [`DashboardModel::apply`].

use crate::error::Result;
use crate::models::{
    CallLogRecord, CallLogStatus, CallType, DashboardData, DashboardMessage, DashboardStats,
    MessageKind, UserStatRecord, UserStatus,
};
use crate::placeholder::PlaceholderClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 10;

// ============================================================================
// Pagination
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, always within `1..=total_pages`.
    pub page: usize,
    /// At least 1, even for an empty record set.
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// 1-based bounds of the visible window, `(0, 0)` when empty.
    pub fn range(&self) -> (usize, usize) {
        if self.items.is_empty() {
            return (0, 0);
        }
        let start = (self.page - 1) * self.page_size + 1;
        (start, start + self.items.len() - 1)
    }
}

/// `ceil(n / page_size)`; zero for an empty set.
pub fn total_pages(n: usize, page_size: usize) -> usize {
    n.div_ceil(page_size.max(1))
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = total_pages(items.len(), page_size);
    let page = clamp_page(page, total);
    let start = (page - 1) * page_size;

    Page {
        items: items.iter().skip(start).take(page_size).cloned().collect(),
        page,
        total_pages: total.max(1),
        total_items: items.len(),
        page_size,
    }
}

// ============================================================================
// Filtering
// ============================================================================

pub trait HasStatus {
    type Status: Copy + PartialEq;

    fn status(&self) -> Self::Status;
}

impl HasStatus for CallLogRecord {
    type Status = CallLogStatus;

    fn status(&self) -> CallLogStatus {
        self.status
    }
}

impl HasStatus for UserStatRecord {
    type Status = UserStatus;

    fn status(&self) -> UserStatus {
        self.status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter<S> {
    #[default]
    All,
    Only(S),
}

impl<S: Copy + PartialEq> StatusFilter<S> {
    pub fn matches(&self, status: S) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => *s == status,
        }
    }

    pub fn apply<T>(&self, items: &[T]) -> Vec<T>
    where
        T: HasStatus<Status = S> + Clone,
    {
        items
            .iter()
            .filter(|item| self.matches(item.status()))
            .cloned()
            .collect()
    }

    /// `All` followed by one entry per status, for pick lists.
    pub fn options(statuses: &[S]) -> Vec<Self> {
        std::iter::once(StatusFilter::All)
            .chain(statuses.iter().copied().map(StatusFilter::Only))
            .collect()
    }
}

impl<S: fmt::Display> fmt::Display for StatusFilter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("All"),
            StatusFilter::Only(s) => s.fmt(f),
        }
    }
}

impl DashboardStats {
    /// Counts over the full record set; only completed calls add duration.
    pub fn compute(
        messages: &[DashboardMessage],
        call_logs: &[CallLogRecord],
        user_stats: &[UserStatRecord],
    ) -> Self {
        Self {
            total_messages: messages.len(),
            total_calls: call_logs.len(),
            active_users: user_stats
                .iter()
                .filter(|u| u.status == UserStatus::Active)
                .count(),
            total_call_duration: call_logs
                .iter()
                .filter(|c| c.status == CallLogStatus::Completed)
                .map(|c| c.duration)
                .sum(),
        }
    }
}

// ============================================================================
// Routing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Messages,
    Calls,
    Users,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Messages, Tab::Calls, Tab::Users];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Messages => "messages",
            Tab::Calls => "calls",
            Tab::Users => "users",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Messages => "Messages",
            Tab::Calls => "Call Logs",
            Tab::Users => "User Stats",
        }
    }

    pub fn parse(s: &str) -> Option<Tab> {
        Tab::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Dashboard location as a `tab`/`page` query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardRoute {
    pub tab: Tab,
    page: usize,
}

impl DashboardRoute {
    /// Unknown or missing tabs fall back to messages. A page number only
    /// counts when the query names the tab it belongs to.
    pub fn parse(query: &str) -> Self {
        let mut tab = None;
        let mut page = None;
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "tab" => tab = Some(value.into_owned()),
                "page" => page = Some(value.into_owned()),
                _ => {}
            }
        }

        match tab.as_deref().and_then(Tab::parse) {
            Some(tab) => Self {
                tab,
                page: page.and_then(|p| p.parse().ok()).unwrap_or(1).max(1),
            },
            None => Self::default(),
        }
    }

    /// Requested page for `tab`, before clamping.
    pub fn page_for(&self, tab: Tab) -> usize {
        if tab == self.tab {
            self.page.max(1)
        } else {
            1
        }
    }

    pub fn with_tab(self, tab: Tab) -> Self {
        Self { tab, page: 1 }
    }

    pub fn with_page(self, page: usize) -> Self {
        Self {
            tab: self.tab,
            page: page.max(1),
        }
    }

    pub fn to_query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("tab", self.tab.as_str());
        if self.page > 1 {
            query.append_pair("page", &self.page.to_string());
        }
        query.finish()
    }
}

// ============================================================================
// Loading
// ============================================================================

#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn load(&self, user_id: Option<&str>) -> Result<DashboardData>;
}

#[async_trait]
impl DashboardSource for PlaceholderClient {
    async fn load(&self, user_id: Option<&str>) -> Result<DashboardData> {
        self.fetch_dashboard_data(user_id).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardOutcome {
    Loaded(DashboardData),
    TimedOut,
    Failed(String),
}

pub const TIMEOUT_MESSAGE: &str = "Request timeout: API did not respond within 5 seconds";

/// Races a [`DashboardSource`] against a fixed deadline.
#[derive(Clone)]
pub struct DashboardLoader {
    source: Arc<dyn DashboardSource>,
    timeout: Duration,
}

impl DashboardLoader {
    pub fn new(source: Arc<dyn DashboardSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub async fn load(&self, user_id: &str) -> DashboardOutcome {
        match tokio::time::timeout(self.timeout, self.source.load(Some(user_id))).await {
            Ok(Ok(data)) => DashboardOutcome::Loaded(data),
            Ok(Err(e)) if e.is_timeout() => {
                tracing::warn!(user_id, error = %e, "Dashboard source timed out");
                DashboardOutcome::TimedOut
            }
            Ok(Err(e)) => {
                tracing::error!(user_id, error = %e, "Failed to fetch dashboard data");
                DashboardOutcome::Failed(e.to_string())
            }
            Err(_) => {
                tracing::warn!(user_id, timeout_ms = self.timeout.as_millis() as u64, "Dashboard load timed out");
                DashboardOutcome::TimedOut
            }
        }
    }
}

// ============================================================================
// View model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Inline banner with a retry action; existing data stays visible.
    Failed(String),
    /// Dedicated error view; every list is empty.
    TimedOut,
}

/// Identifies one load. Outcomes carrying an older ticket are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    id: u64,
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct DashboardModel {
    page_size: usize,
    route: DashboardRoute,
    call_filter: StatusFilter<CallLogStatus>,
    user_filter: StatusFilter<UserStatus>,
    data: DashboardData,
    phase: LoadPhase,
    loaded_for: Option<String>,
    in_flight: Option<u64>,
    next_ticket: u64,
}

impl Default for DashboardModel {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl DashboardModel {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            route: DashboardRoute::default(),
            call_filter: StatusFilter::All,
            user_filter: StatusFilter::All,
            data: DashboardData::default(),
            phase: LoadPhase::Idle,
            loaded_for: None,
            in_flight: None,
            next_ticket: 1,
        }
    }

    /// Start loading for `user_id` unless that user is already loaded or a
    /// load is running. `None` (signed out) clears a previously loaded user.
    pub fn begin_load(&mut self, user_id: Option<&str>) -> Option<LoadTicket> {
        match user_id {
            Some(uid) if self.loaded_for.as_deref() != Some(uid) && self.in_flight.is_none() => {
                let id = self.next_ticket;
                self.next_ticket += 1;
                self.in_flight = Some(id);
                self.loaded_for = Some(uid.to_string());
                self.phase = LoadPhase::Loading;
                Some(LoadTicket {
                    id,
                    user_id: uid.to_string(),
                })
            }
            None if self.loaded_for.is_some() => {
                self.reset();
                None
            }
            _ => None,
        }
    }

    /// Load the same user again after an error.
    pub fn retry(&mut self, user_id: &str) -> Option<LoadTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        self.loaded_for = None;
        self.begin_load(Some(user_id))
    }

    /// Record the result of a load. Returns false for stale tickets.
    pub fn apply(&mut self, ticket: &LoadTicket, outcome: DashboardOutcome) -> bool {
        if self.in_flight != Some(ticket.id) {
            tracing::debug!(ticket = ticket.id, "Ignoring stale dashboard load");
            return false;
        }
        self.in_flight = None;

        match outcome {
            DashboardOutcome::Loaded(data) => {
                self.data = data;
                self.phase = LoadPhase::Ready;
            }
            DashboardOutcome::TimedOut => {
                self.data = DashboardData::default();
                self.phase = LoadPhase::TimedOut;
            }
            DashboardOutcome::Failed(message) => {
                self.phase = LoadPhase::Failed(message);
            }
        }
        true
    }

    /// The view went away: any running load no longer applies.
    pub fn detach(&mut self) {
        if self.in_flight.take().is_some() {
            self.loaded_for = None;
            self.phase = LoadPhase::Idle;
        }
    }

    /// Drop all data, e.g. on sign-out.
    pub fn reset(&mut self) {
        self.data = DashboardData::default();
        self.phase = LoadPhase::Idle;
        self.loaded_for = None;
        self.in_flight = None;
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn data(&self) -> &DashboardData {
        &self.data
    }

    pub fn stats(&self) -> DashboardStats {
        self.data.stats
    }

    pub fn route(&self) -> DashboardRoute {
        self.route
    }

    pub fn set_route(&mut self, route: DashboardRoute) {
        self.route = route;
    }

    pub fn tab(&self) -> Tab {
        self.route.tab
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.route = self.route.with_tab(tab);
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.route = self.route.with_page(page);
    }

    pub fn call_filter(&self) -> StatusFilter<CallLogStatus> {
        self.call_filter
    }

    pub fn set_call_filter(&mut self, filter: StatusFilter<CallLogStatus>) {
        self.call_filter = filter;
    }

    pub fn user_filter(&self) -> StatusFilter<UserStatus> {
        self.user_filter
    }

    pub fn set_user_filter(&mut self, filter: StatusFilter<UserStatus>) {
        self.user_filter = filter;
    }

    pub fn messages_page(&self) -> Page<DashboardMessage> {
        paginate(
            &self.data.messages,
            self.route.page_for(Tab::Messages),
            self.page_size,
        )
    }

    pub fn calls_page(&self) -> Page<CallLogRecord> {
        paginate(
            &self.call_filter.apply(&self.data.call_logs),
            self.route.page_for(Tab::Calls),
            self.page_size,
        )
    }

    pub fn users_page(&self) -> Page<UserStatRecord> {
        paginate(
            &self.user_filter.apply(&self.data.user_stats),
            self.route.page_for(Tab::Users),
            self.page_size,
        )
    }
}

// ============================================================================
// Detail summaries
// ============================================================================

fn percent(part: usize, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

fn unique_in_order<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for name in names {
        if !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

fn completed_duration<'a>(calls: impl Iterator<Item = &'a CallLogRecord>) -> u64 {
    calls
        .filter(|c| c.status == CallLogStatus::Completed)
        .map(|c| c.duration)
        .sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserDetail {
    pub user: UserStatRecord,
    pub messages: Vec<DashboardMessage>,
    pub calls: Vec<CallLogRecord>,
    pub completed_calls: usize,
    pub completed_duration: u64,
    /// Completed calls relative to the user's recorded call total.
    pub completion_rate: u32,
}

impl UserDetail {
    /// `None` when `user_id` is not among the user stats.
    pub fn build(data: &DashboardData, user_id: &str) -> Option<Self> {
        let user = data.user_stats.iter().find(|u| u.user_id == user_id)?.clone();
        let messages: Vec<DashboardMessage> = data
            .messages
            .iter()
            .filter(|m| m.sender_id == user_id)
            .cloned()
            .collect();
        let calls: Vec<CallLogRecord> = data
            .call_logs
            .iter()
            .filter(|c| c.caller_id == user_id || c.receiver_id == user_id)
            .cloned()
            .collect();

        let completed_calls = calls
            .iter()
            .filter(|c| c.status == CallLogStatus::Completed)
            .count();

        Some(Self {
            completion_rate: percent(completed_calls, user.total_calls),
            completed_duration: completed_duration(calls.iter()),
            completed_calls,
            user,
            messages,
            calls,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRoomSummary {
    pub room_id: String,
    pub messages: Vec<DashboardMessage>,
    /// Sender names in first-seen order.
    pub participants: Vec<String>,
    pub last_message: Option<DashboardMessage>,
    pub kinds: HashMap<MessageKind, usize>,
}

impl ChatRoomSummary {
    /// `None` for a room without messages.
    pub fn build(data: &DashboardData, room_id: &str) -> Option<Self> {
        let messages: Vec<DashboardMessage> = data
            .messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        if messages.is_empty() {
            return None;
        }

        let mut kinds = HashMap::new();
        for m in &messages {
            *kinds.entry(m.kind).or_insert(0) += 1;
        }

        Some(Self {
            room_id: room_id.to_string(),
            participants: unique_in_order(messages.iter().map(|m| m.sender_name.as_str())),
            last_message: messages.last().cloned(),
            kinds,
            messages,
        })
    }

    pub fn total_messages(&self) -> usize {
        self.messages.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallRoomSummary {
    pub room_id: String,
    pub calls: Vec<CallLogRecord>,
    /// Callers first, then receivers, without repeats.
    pub participants: Vec<String>,
    pub completed_calls: usize,
    pub success_rate: u32,
    pub completed_duration: u64,
}

impl CallRoomSummary {
    /// `None` for a room without calls.
    pub fn build(data: &DashboardData, room_id: &str) -> Option<Self> {
        let calls: Vec<CallLogRecord> = data
            .call_logs
            .iter()
            .filter(|c| c.room_id == room_id)
            .cloned()
            .collect();
        if calls.is_empty() {
            return None;
        }

        let participants = unique_in_order(
            calls
                .iter()
                .map(|c| c.caller_name.as_str())
                .chain(calls.iter().map(|c| c.receiver_name.as_str())),
        );
        let completed_calls = calls
            .iter()
            .filter(|c| c.status == CallLogStatus::Completed)
            .count();

        Some(Self {
            room_id: room_id.to_string(),
            success_rate: percent(completed_calls, calls.len() as u64),
            completed_duration: completed_duration(calls.iter()),
            completed_calls,
            participants,
            calls,
        })
    }

    pub fn total_calls(&self) -> usize {
        self.calls.len()
    }

    /// `(count, percent)` of calls with `status`.
    pub fn status_share(&self, status: CallLogStatus) -> (usize, u32) {
        let count = self.calls.iter().filter(|c| c.status == status).count();
        (count, percent(count, self.calls.len() as u64))
    }

    /// `(count, percent)` of calls of `call_type`.
    pub fn type_share(&self, call_type: CallType) -> (usize, u32) {
        let count = self.calls.iter().filter(|c| c.call_type == call_type).count();
        (count, percent(count, self.calls.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::placeholder::{map_comments, map_todos, Comment, Todo};
    use parking_lot::Mutex;
    use tokio::time::sleep;

    fn user(id: u64, status: UserStatus, total_calls: u64) -> UserStatRecord {
        UserStatRecord {
            id: format!("user-stat-{}", id),
            user_id: format!("user-{}", id),
            user_name: format!("User {}", id),
            email: format!("u{}@x", id),
            status,
            last_seen: chrono::Utc::now(),
            total_messages: 0,
            total_calls,
            total_call_duration: 0,
            avatar: None,
        }
    }

    fn sample_data() -> DashboardData {
        let comments: Vec<Comment> = (1..=6)
            .map(|id| Comment {
                id,
                post_id: if id <= 4 { 1 } else { 2 },
                name: String::new(),
                email: if id % 2 == 0 { "ann@x".into() } else { "bo@x".into() },
                body: format!("body {}", id),
            })
            .collect();
        let todos: Vec<Todo> = (1..=6)
            .map(|id| Todo {
                id,
                user_id: 1,
                title: String::new(),
                completed: id % 2 == 0,
            })
            .collect();

        let messages = map_comments(&comments);
        let call_logs = map_todos(&todos);
        let user_stats = vec![
            user(1, UserStatus::Active, 4),
            user(2, UserStatus::Away, 0),
            user(3, UserStatus::Active, 10),
        ];
        let stats = DashboardStats::compute(&messages, &call_logs, &user_stats);

        DashboardData {
            messages,
            call_logs,
            user_stats,
            stats,
        }
    }

    #[test]
    fn pagination_clamps_requested_page() {
        let items: Vec<u32> = (0..25).collect();

        let page = paginate(&items, 5, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
        assert_eq!(page.items, (20..25).collect::<Vec<_>>());
        assert_eq!(page.range(), (21, 25));
        assert!(!page.has_next());

        let page = paginate(&items, 0, 10);
        assert_eq!(page.page, 1);
        assert!(page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn empty_set_has_one_page() {
        let page = paginate::<u32>(&[], 4, 10);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert_eq!(page.range(), (0, 0));
    }

    #[test]
    fn filters_pass_through_on_all() {
        let data = sample_data();
        assert_eq!(StatusFilter::All.apply(&data.call_logs).len(), 6);

        let completed = StatusFilter::Only(CallLogStatus::Completed).apply(&data.call_logs);
        assert_eq!(completed.len(), 3);
        assert!(completed.iter().all(|c| c.status == CallLogStatus::Completed));

        let away = StatusFilter::Only(UserStatus::Away).apply(&data.user_stats);
        assert_eq!(away.len(), 1);

        let options = StatusFilter::options(&UserStatus::ALL);
        assert_eq!(options.len(), 4);
        assert_eq!(options[0].to_string(), "All");
        assert_eq!(options[3].to_string(), "Away");
    }

    #[test]
    fn stats_count_active_users_and_completed_duration() {
        let data = sample_data();
        assert_eq!(data.stats.total_messages, 6);
        assert_eq!(data.stats.total_calls, 6);
        assert_eq!(data.stats.active_users, 2);

        let expected: u64 = data
            .call_logs
            .iter()
            .filter(|c| c.status == CallLogStatus::Completed)
            .map(|c| c.duration)
            .sum();
        assert!(expected > 0);
        assert_eq!(data.stats.total_call_duration, expected);
    }

    #[test]
    fn route_parsing() {
        let route = DashboardRoute::parse("?tab=calls&page=3");
        assert_eq!(route.tab, Tab::Calls);
        assert_eq!(route.page_for(Tab::Calls), 3);
        assert_eq!(route.page_for(Tab::Users), 1);

        let route = DashboardRoute::parse("tab=bogus&page=3");
        assert_eq!(route.tab, Tab::Messages);
        assert_eq!(route.page_for(Tab::Messages), 1);

        let route = DashboardRoute::parse("page=abc&tab=users");
        assert_eq!(route.page_for(Tab::Users), 1);

        assert_eq!(DashboardRoute::parse("").tab, Tab::Messages);
    }

    #[test]
    fn route_serialization_omits_first_page() {
        let route = DashboardRoute::parse("tab=users&page=2");
        assert_eq!(route.to_query(), "tab=users&page=2");
        assert_eq!(route.with_page(1).to_query(), "tab=users");

        let switched = route.with_tab(Tab::Calls);
        assert_eq!(switched.to_query(), "tab=calls");
        assert_eq!(switched.page_for(Tab::Calls), 1);
    }

    #[test]
    fn model_pages_follow_route_and_filters() {
        let mut model = DashboardModel::new(2);
        let ticket = model.begin_load(Some("u1")).unwrap();
        assert!(model.apply(&ticket, DashboardOutcome::Loaded(sample_data())));

        model.set_route(DashboardRoute::parse("tab=calls&page=9"));
        let calls = model.calls_page();
        assert_eq!(calls.total_pages, 3);
        assert_eq!(calls.page, 3);
        assert_eq!(model.messages_page().page, 1);

        model.set_call_filter(StatusFilter::Only(CallLogStatus::Missed));
        let calls = model.calls_page();
        assert_eq!(calls.total_items, 1);
        assert_eq!(calls.page, 1);

        model.select_tab(Tab::Users);
        model.go_to_page(2);
        assert_eq!(model.users_page().items.len(), 1);
    }

    #[test]
    fn repeated_loads_for_same_user_are_deduplicated() {
        let mut model = DashboardModel::default();
        let ticket = model.begin_load(Some("u1")).unwrap();
        assert!(model.begin_load(Some("u1")).is_none());
        assert!(model.begin_load(Some("u2")).is_none(), "load already running");

        model.apply(&ticket, DashboardOutcome::Loaded(sample_data()));
        assert!(model.begin_load(Some("u1")).is_none());
        assert!(model.begin_load(Some("u2")).is_some());
    }

    #[test]
    fn timeout_clears_everything() {
        let mut model = DashboardModel::default();
        let first = model.begin_load(Some("u1")).unwrap();
        model.apply(&first, DashboardOutcome::Loaded(sample_data()));

        let retry = model.retry("u1").unwrap();
        assert!(model.is_loading());
        model.apply(&retry, DashboardOutcome::TimedOut);

        assert_eq!(model.phase(), &LoadPhase::TimedOut);
        assert!(model.data().is_empty());
        assert_eq!(model.stats(), DashboardStats::default());
    }

    #[test]
    fn other_failures_keep_data_and_allow_retry() {
        let mut model = DashboardModel::default();
        let first = model.begin_load(Some("u1")).unwrap();
        model.apply(&first, DashboardOutcome::Loaded(sample_data()));

        let second = model.retry("u1").unwrap();
        model.apply(&second, DashboardOutcome::Failed("boom".into()));
        assert_eq!(model.phase(), &LoadPhase::Failed("boom".into()));
        assert_eq!(model.data().messages.len(), 6);

        assert!(model.retry("u1").is_some());
    }

    #[test]
    fn stale_and_detached_outcomes_are_ignored() {
        let mut model = DashboardModel::default();
        let ticket = model.begin_load(Some("u1")).unwrap();
        model.detach();
        assert_eq!(model.phase(), &LoadPhase::Idle);
        assert!(!model.apply(&ticket, DashboardOutcome::Loaded(sample_data())));
        assert!(model.data().is_empty());

        let again = model.begin_load(Some("u1")).unwrap();
        assert!(model.apply(&again, DashboardOutcome::Loaded(sample_data())));
    }

    #[test]
    fn sign_out_resets() {
        let mut model = DashboardModel::default();
        let ticket = model.begin_load(Some("u1")).unwrap();
        model.apply(&ticket, DashboardOutcome::Loaded(sample_data()));

        assert!(model.begin_load(None).is_none());
        assert!(model.data().is_empty());
        assert_eq!(model.phase(), &LoadPhase::Idle);
        assert!(model.begin_load(Some("u1")).is_some());
    }

    #[test]
    fn user_detail() {
        let data = sample_data();
        let detail = UserDetail::build(&data, "user-1").unwrap();

        // Every call has caller user-1 and receiver user-2.
        assert_eq!(detail.calls.len(), 6);
        assert_eq!(detail.completed_calls, 3);
        assert_eq!(detail.completion_rate, 75);
        assert_eq!(detail.messages.len(), 1);

        let detail = UserDetail::build(&data, "user-2").unwrap();
        assert_eq!(detail.completion_rate, 0);
        assert!(UserDetail::build(&data, "user-99").is_none());
    }

    #[test]
    fn chat_room_summary() {
        let data = sample_data();
        let summary = ChatRoomSummary::build(&data, "room-1").unwrap();
        assert_eq!(summary.total_messages(), 4);
        assert_eq!(summary.participants, vec!["Bo".to_string(), "Ann".to_string()]);
        assert_eq!(summary.last_message.as_ref().unwrap().id, "msg-4");
        assert_eq!(summary.kinds.get(&MessageKind::Text), Some(&4));
        assert!(ChatRoomSummary::build(&data, "room-404").is_none());
    }

    #[test]
    fn call_room_summary() {
        let data = sample_data();
        let summary = CallRoomSummary::build(&data, "room-1").unwrap();
        assert_eq!(summary.total_calls(), 6);
        assert_eq!(summary.participants, vec!["User 1".to_string(), "User 2".to_string()]);
        assert_eq!(summary.success_rate, 50);
        assert_eq!(summary.completed_duration, data.stats.total_call_duration);
        assert_eq!(summary.status_share(CallLogStatus::Completed), (3, 50));
        assert_eq!(summary.type_share(CallType::Video), (3, 50));
    }

    struct FakeSource {
        delay: Duration,
        result: Mutex<Option<Result<DashboardData>>>,
    }

    #[async_trait]
    impl DashboardSource for FakeSource {
        async fn load(&self, _user_id: Option<&str>) -> Result<DashboardData> {
            sleep(self.delay).await;
            self.result
                .lock()
                .take()
                .unwrap_or_else(|| Ok(DashboardData::default()))
        }
    }

    fn loader(delay_ms: u64, result: Result<DashboardData>) -> DashboardLoader {
        DashboardLoader::new(
            Arc::new(FakeSource {
                delay: Duration::from_millis(delay_ms),
                result: Mutex::new(Some(result)),
            }),
            Duration::from_secs(5),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let outcome = loader(6_000, Ok(sample_data())).load("u1").await;
        assert_eq!(outcome, DashboardOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_source_loads() {
        let outcome = loader(4_000, Ok(sample_data())).load("u1").await;
        assert!(matches!(outcome, DashboardOutcome::Loaded(d) if d.messages.len() == 6));
    }

    #[tokio::test(start_paused = true)]
    async fn source_errors_are_classified() {
        let outcome = loader(10, Err(Error::Timeout("slow".into()))).load("u1").await;
        assert_eq!(outcome, DashboardOutcome::TimedOut);

        let outcome = loader(
            10,
            Err(Error::Fetch {
                endpoint: "/todos".into(),
                attempts: 3,
                reason: "HTTP 500".into(),
            }),
        )
        .load("u1")
        .await;
        assert_eq!(
            outcome,
            DashboardOutcome::Failed("Failed to fetch /todos after 3 attempts: HTTP 500".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_model_shows_no_records() {
        let mut model = DashboardModel::default();
        let ticket = model.begin_load(Some("u1")).unwrap();
        let outcome = loader(60_000, Ok(sample_data())).load(&ticket.user_id).await;
        model.apply(&ticket, outcome);

        assert_eq!(model.phase(), &LoadPhase::TimedOut);
        assert!(model.messages_page().items.is_empty());
        assert!(model.calls_page().items.is_empty());
        assert!(model.users_page().items.is_empty());
    }
}
