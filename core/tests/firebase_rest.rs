//! Firebase REST store and identity provider against a mock server

use huddle_core::auth::{AuthSession, AuthUser, FirebaseIdentity, IdentityProvider};
use huddle_core::store::{server_timestamp, FirebaseStore, Listener, Query, RealtimeStore, Snapshot};
use huddle_core::{AuthContext, AuthErrorCode, ChatService, Error, UserDirectory};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> FirebaseStore {
    FirebaseStore::new(&server.uri(), Duration::from_millis(50), Handle::current()).unwrap()
}

#[tokio::test]
async fn push_posts_value_with_server_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/a_b.json"))
        .and(query_param("auth", "token-1"))
        .and(body_partial_json(json!({
            "text": "hi",
            "timestamp": { ".sv": "timestamp" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "-Nabc" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    store.authorize(Some("token-1".into()));
    let key = store
        .push("messages/a_b", json!({ "text": "hi", "timestamp": server_timestamp() }))
        .await
        .unwrap();
    assert_eq!(key, "-Nabc");
}

#[tokio::test]
async fn get_requests_last_children_by_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/a_b.json"))
        .and(query_param("orderBy", "\"$key\""))
        .and(query_param("limitToLast", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "-k2": { "text": "two" },
            "-k3": { "text": "three" }
        })))
        .mount(&server)
        .await;

    let snapshot = store(&server)
        .get(&Query::new("messages/a_b").limit_to_last(2))
        .await
        .unwrap();
    let keys: Vec<&str> = snapshot.children().iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec!["-k2", "-k3"]);
}

#[tokio::test]
async fn rejected_writes_are_store_errors() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/users/u1.json"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Permission denied" })))
        .mount(&server)
        .await;

    let err = store(&server)
        .set("users/u1", json!({ "displayName": "A" }))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(ref m) if m.contains("401")), "{:?}", err);
}

#[tokio::test]
async fn subscription_polls_until_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "u1": { "displayName": "A" } })))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener: Listener = Arc::new(move |snapshot: huddle_core::Result<Snapshot>| {
        let _ = tx.send(snapshot.map(|s| s.exists()));
    });

    let sub = store(&server).subscribe(Query::new("users"), listener);
    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(first.unwrap());

    // Unchanged values are not delivered again.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());

    sub.unsubscribe();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.recv().await.is_none(), "listener released with the task");
}

#[tokio::test]
async fn listeners_report_empty_results_when_the_store_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/(messages|users)"))
        .respond_with(ResponseTemplate::new(500).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let store: Arc<dyn RealtimeStore> = Arc::new(store(&server));
    let chat = ChatService::new(store.clone());
    let users = UserDirectory::new(store);
    let wait = Duration::from_secs(2);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _messages = chat.listen_messages("a_b", move |messages| {
        let _ = tx.send(messages);
    });
    let delivered = tokio::time::timeout(wait, rx.recv()).await.unwrap().unwrap();
    assert!(delivered.is_empty());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _last = chat.last_message("a_b", move |last| {
        let _ = tx.send(last);
    });
    let delivered = tokio::time::timeout(wait, rx.recv()).await.unwrap().unwrap();
    assert!(delivered.is_none());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _contacts = users.listen_users("u1", move |contacts| {
        let _ = tx.send(contacts);
    });
    let delivered = tokio::time::timeout(wait, rx.recv()).await.unwrap().unwrap();
    assert!(delivered.is_empty());
}

fn identity(server: &MockServer) -> FirebaseIdentity {
    FirebaseIdentity::new(&server.uri(), "api-key")
        .unwrap()
        .with_token_url(&server.uri())
}

fn cached_session(expires_at: i64) -> AuthSession {
    AuthSession {
        user: AuthUser {
            uid: "uid-1".into(),
            display_name: Some("Ann".into()),
            email: Some("ann@example.com".into()),
            photo_url: None,
        },
        id_token: "id-1".into(),
        refresh_token: "refresh-1".into(),
        expires_at,
    }
}

async fn mount_token_exchange(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(query_param("key", "api-key"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": "3600",
            "token_type": "Bearer",
            "refresh_token": "refresh-2",
            "id_token": "id-2",
            "user_id": "uid-1"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn refresh_exchanges_refresh_token() {
    let server = MockServer::start().await;
    mount_token_exchange(&server).await;

    let fresh = identity(&server).refresh(&cached_session(0)).await.unwrap();
    assert_eq!(fresh.id_token, "id-2");
    assert_eq!(fresh.refresh_token, "refresh-2");
    assert_eq!(fresh.user.display_name.as_deref(), Some("Ann"));
    assert!(!fresh.is_expired(chrono::Utc::now().timestamp_millis()));
}

#[tokio::test]
async fn rejected_refresh_token_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "TOKEN_EXPIRED", "status": "INVALID_ARGUMENT" }
        })))
        .mount(&server)
        .await;

    let err = identity(&server).refresh(&cached_session(0)).await.unwrap_err();
    assert!(
        matches!(err, Error::Auth { ref code, .. } if code.as_str() == "auth/token-expired"),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn restore_refreshes_expired_session_and_authorizes_store() {
    let server = MockServer::start().await;
    mount_token_exchange(&server).await;
    Mock::given(method("PUT"))
        .and(path("/users/uid-1.json"))
        .and(query_param("auth", "id-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = AuthContext::new(Arc::new(identity(&server)), Arc::new(store(&server)));
    let user = ctx.restore(cached_session(0)).await.unwrap();

    assert_eq!(user.uid, "uid-1");
    assert_eq!(ctx.session().unwrap().id_token, "id-2");
}

#[tokio::test]
async fn refresh_if_needed_swaps_token_before_expiry() {
    let server = MockServer::start().await;
    mount_token_exchange(&server).await;
    Mock::given(method("PUT"))
        .and(path("/users/uid-1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages/a_b.json"))
        .and(query_param("auth", "id-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "-Nnew" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(store(&server));
    let ctx = AuthContext::new(Arc::new(identity(&server)), store.clone());
    let soon = chrono::Utc::now().timestamp_millis() + 60_000;
    ctx.restore(cached_session(soon)).await.unwrap();
    assert_eq!(ctx.session().unwrap().id_token, "id-1");

    assert!(ctx.refresh_if_needed().await.unwrap());
    let key = store.push("messages/a_b", json!({ "text": "hi" })).await.unwrap();
    assert_eq!(key, "-Nnew");
}

#[tokio::test]
async fn sign_in_returns_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .and(query_param("key", "api-key"))
        .and(body_partial_json(json!({ "email": "ann@example.com", "returnSecureToken": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "uid-1",
            "email": "ann@example.com",
            "displayName": "Ann",
            "idToken": "id-token",
            "refreshToken": "refresh",
            "expiresIn": "3600"
        })))
        .mount(&server)
        .await;

    let session = identity(&server)
        .sign_in("ann@example.com", "secret")
        .await
        .unwrap();
    assert_eq!(session.user.uid, "uid-1");
    assert_eq!(session.user.display_name.as_deref(), Some("Ann"));
    assert_eq!(session.id_token, "id-token");
    assert!(!session.is_expired(chrono::Utc::now().timestamp_millis()));
}

#[tokio::test]
async fn sign_in_errors_are_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "INVALID_PASSWORD" }
        })))
        .mount(&server)
        .await;

    let err = identity(&server)
        .sign_in("ann@example.com", "nope")
        .await
        .unwrap_err();
    match err {
        Error::Auth { code, message } => {
            assert_eq!(code, AuthErrorCode::WrongPassword);
            assert_eq!(message, "Incorrect password. Please try again.");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn sign_up_sets_display_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signUp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "uid-2",
            "email": "bob@example.com",
            "idToken": "id-token",
            "refreshToken": "refresh",
            "expiresIn": "3600"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts:update"))
        .and(body_partial_json(json!({ "idToken": "id-token", "displayName": "Bob" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "localId": "uid-2" })))
        .expect(1)
        .mount(&server)
        .await;

    let session = identity(&server)
        .sign_up("bob@example.com", "secret", Some(" Bob "))
        .await
        .unwrap();
    assert_eq!(session.user.display_name.as_deref(), Some("Bob"));
}

#[tokio::test]
async fn sign_up_conflict_and_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "EMAIL_EXISTS" }
        })))
        .mount(&server)
        .await;

    let err = identity(&server)
        .sign_up("bob@example.com", "secret", None)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "An account with this email already exists. Please sign in instead."
    );

    let offline = FirebaseIdentity::new("http://127.0.0.1:9", "api-key").unwrap();
    let err = offline.sign_in("bob@example.com", "secret").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Auth { code: AuthErrorCode::NetworkRequestFailed, .. }
    ));
}
