//! Local SQLite cache for Huddle Desktop: the last session and UI settings

use anyhow::Result;
use huddle_core::{AuthSession, AuthUser};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join("huddle.db");
        Self::from_connection(Connection::open(&db_path)?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            -- Sessions
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY,
                uid TEXT NOT NULL,
                display_name TEXT,
                email TEXT,
                photo_url TEXT,
                id_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                created_at INTEGER DEFAULT (strftime('%s', 'now'))
            );

            -- Settings
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ============= Sessions =============

    pub fn save_session(&self, session: &AuthSession) -> Result<()> {
        let conn = self.conn.lock();

        // Only one session is ever cached
        conn.execute("DELETE FROM sessions", [])?;

        conn.execute(
            "INSERT INTO sessions (uid, display_name, email, photo_url, id_token, refresh_token, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.user.uid,
                session.user.display_name,
                session.user.email,
                session.user.photo_url,
                session.id_token,
                session.refresh_token,
                session.expires_at
            ],
        )?;

        Ok(())
    }

    pub fn get_session(&self) -> Result<Option<AuthSession>> {
        let conn = self.conn.lock();

        let session = conn
            .query_row(
                "SELECT uid, display_name, email, photo_url, id_token, refresh_token, expires_at
                 FROM sessions ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(AuthSession {
                        user: AuthUser {
                            uid: row.get(0)?,
                            display_name: row.get(1)?,
                            email: row.get(2)?,
                            photo_url: row.get(3)?,
                        },
                        id_token: row.get(4)?,
                        refresh_token: row.get(5)?,
                        expires_at: row.get(6)?,
                    })
                },
            )
            .optional()?;

        Ok(session)
    }

    pub fn clear_session(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions", [])?;
        Ok(())
    }

    // ============= Settings =============

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(uid: &str) -> AuthSession {
        AuthSession {
            user: AuthUser {
                uid: uid.into(),
                display_name: Some("Ada".into()),
                email: Some("ada@example.com".into()),
                photo_url: None,
            },
            id_token: "token".into(),
            refresh_token: "refresh".into(),
            expires_at: 1_900_000_000_000,
        }
    }

    #[test]
    fn session_is_replaced_and_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path()).unwrap();
        assert!(db.get_session().unwrap().is_none());

        db.save_session(&session("a")).unwrap();
        db.save_session(&session("b")).unwrap();
        let cached = db.get_session().unwrap().unwrap();
        assert_eq!(cached, session("b"));

        db.clear_session().unwrap();
        assert!(db.get_session().unwrap().is_none());
    }

    #[test]
    fn session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        Database::new(dir.path())
            .unwrap()
            .save_session(&session("a"))
            .unwrap();

        let reopened = Database::new(dir.path()).unwrap();
        assert_eq!(reopened.get_session().unwrap().unwrap().user.uid, "a");
    }

    #[test]
    fn settings_overwrite() {
        let db = Database::from_connection(Connection::open_in_memory().unwrap()).unwrap();
        assert_eq!(db.get_setting("dashboard_route").unwrap(), None);

        db.set_setting("dashboard_route", "tab=calls").unwrap();
        db.set_setting("dashboard_route", "tab=users&page=2").unwrap();
        assert_eq!(
            db.get_setting("dashboard_route").unwrap().as_deref(),
            Some("tab=users&page=2")
        );
    }
}
