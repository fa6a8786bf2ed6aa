//! User directory kept under `users/{uid}`

use crate::error::Result;
use crate::models::{Contact, UserProfile};
use crate::store::{Listener, Query, RealtimeStore, Snapshot, Subscription};
use serde_json::Value;
use std::sync::Arc;

fn non_empty(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map the `users` node to contacts, leaving out `current_user_id`.
pub fn parse_contacts(snapshot: &Snapshot, current_user_id: &str) -> Vec<Contact> {
    snapshot
        .children()
        .into_iter()
        .filter(|(key, _)| *key != current_user_id)
        .map(|(key, user)| {
            let email = non_empty(&user["email"]);
            Contact {
                id: key.to_string(),
                name: non_empty(&user["displayName"])
                    .or_else(|| email.clone())
                    .unwrap_or_else(|| "Unknown User".to_string()),
                email,
                avatar: non_empty(&user["photoURL"]),
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn RealtimeStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Follow every registered user except the signed-in one.
    pub fn listen_users<F>(&self, current_user_id: &str, callback: F) -> Subscription
    where
        F: Fn(Vec<Contact>) + Send + Sync + 'static,
    {
        let me = current_user_id.to_string();
        let listener: Listener = Arc::new(move |snapshot: Result<Snapshot>| match snapshot {
            Ok(snapshot) => callback(parse_contacts(&snapshot, &me)),
            Err(e) => {
                tracing::error!(error = %e, "Error listening to users");
                callback(Vec::new());
            }
        });

        self.store.subscribe(Query::new("users"), listener)
    }

    /// Write the profile record for a user who just signed in or up.
    pub async fn create_or_update_profile(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        email: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<UserProfile> {
        let now = chrono::Utc::now().timestamp_millis();
        let display_name = display_name
            .filter(|s| !s.is_empty())
            .or(email.filter(|s| !s.is_empty()))
            .unwrap_or("User");

        let profile = UserProfile {
            display_name: display_name.to_string(),
            email: email.unwrap_or_default().to_string(),
            photo_url: photo_url.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        self.store
            .set(&format!("users/{}", user_id), serde_json::to_value(&profile)?)
            .await?;
        tracing::debug!(user_id = %user_id, "Profile saved");

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn contacts_fall_back_to_email_then_unknown() {
        let snapshot = Snapshot::new(
            "users",
            json!({
                "u1": { "displayName": "Ada", "email": "ada@example.com", "photoURL": "http://x/a.png" },
                "u2": { "displayName": "", "email": "bob@example.com" },
                "u3": {},
                "me": { "displayName": "Me" }
            }),
        );

        let contacts = parse_contacts(&snapshot, "me");
        assert_eq!(contacts.len(), 3);
        assert_eq!(contacts[0].name, "Ada");
        assert_eq!(contacts[0].avatar.as_deref(), Some("http://x/a.png"));
        assert_eq!(contacts[1].name, "bob@example.com");
        assert_eq!(contacts[2].name, "Unknown User");
        assert_eq!(contacts[2].email, None);
    }

    #[tokio::test]
    async fn profile_defaults() {
        let store = Arc::new(MemoryStore::new());
        let users = UserDirectory::new(store.clone());

        let profile = users
            .create_or_update_profile("u1", None, Some("ann@example.com"), None)
            .await
            .unwrap();
        assert_eq!(profile.display_name, "ann@example.com");

        let profile = users
            .create_or_update_profile("u2", None, None, None)
            .await
            .unwrap();
        assert_eq!(profile.display_name, "User");
        assert_eq!(profile.email, "");

        let stored = store.get(&Query::new("users/u1")).await.unwrap();
        assert_eq!(stored.value().unwrap()["displayName"], "ann@example.com");
        assert!(stored.value().unwrap()["photoURL"].is_null());
    }

    #[tokio::test]
    async fn listen_users_excludes_current_user() {
        let store = Arc::new(MemoryStore::new());
        let users = UserDirectory::new(store);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = users.listen_users("me", move |contacts| *sink.lock() = contacts);

        users
            .create_or_update_profile("me", Some("Me"), None, None)
            .await
            .unwrap();
        users
            .create_or_update_profile("friend", Some("Friend"), None, None)
            .await
            .unwrap();

        let contacts = seen.lock().clone();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, "friend");
    }
}
