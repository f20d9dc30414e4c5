//! The single authenticated identity, persisted in durable storage.

use crate::storage::Storage;
use anyhow::Result;
use serde::{Deserialize, Serialize};

const USER_KEY: &str = "user";
const TOKEN_KEY: &str = "token";

/// Client-held proof that a user is authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub token: String,
    /// Expiration as issued by the server. Stored, never enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl Session {
    /// Session built from a bare login: the backend returns neither an id nor
    /// a display name, so the id defaults to 1 and the name is the email's
    /// local part.
    pub fn from_login(email: &str, token: &str, expires_at: Option<String>) -> Self {
        let name = email.split('@').next().unwrap_or(email).to_string();
        Self {
            id: 1,
            email: email.to_string(),
            name,
            token: token.to_string(),
            expires_at,
        }
    }
}

/// How a session is laid out across storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLayout {
    /// `user` holds the session record, `token` holds the raw token.
    Split,
    /// `user` alone holds the session record including its token.
    Combined,
}

pub struct SessionStore {
    storage: Box<dyn Storage>,
    layout: SessionLayout,
}

impl SessionStore {
    pub fn new(storage: Box<dyn Storage>, layout: SessionLayout) -> Self {
        Self { storage, layout }
    }

    pub fn layout(&self) -> SessionLayout {
        self.layout
    }

    /// Persist `session`, replacing whatever was stored before.
    pub fn save(&mut self, session: &Session) -> Result<()> {
        let record = serde_json::to_string(session)?;
        self.storage.set(USER_KEY, &record)?;
        match self.layout {
            SessionLayout::Split => self.storage.set(TOKEN_KEY, &session.token)?,
            SessionLayout::Combined => self.storage.remove(TOKEN_KEY)?,
        }
        Ok(())
    }

    /// The persisted session, if any. A record that fails to decode counts
    /// as no session.
    pub fn current(&self) -> Option<Session> {
        let record = self.storage.get(USER_KEY)?;
        match serde_json::from_str::<Session>(&record) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring undecodable stored session");
                None
            }
        }
    }

    /// Token to attach to outgoing requests. In the split layout the `token`
    /// entry is authoritative.
    pub fn token(&self) -> Option<String> {
        let token = match self.layout {
            SessionLayout::Split => self.storage.get(TOKEN_KEY),
            SessionLayout::Combined => self.current().map(|s| s.token),
        };
        token.filter(|t| !t.is_empty())
    }

    /// Remove the session under both layouts.
    pub fn clear(&mut self) -> Result<()> {
        self.storage.remove(USER_KEY)?;
        self.storage.remove(TOKEN_KEY)?;
        Ok(())
    }
}
