//! The signed-in user as seen by pages.
//!
//! Loaded once from the session store at startup and kept in step with it by
//! `login`, `register` and `logout`. Failures collapse to `false`; the pages
//! show their own fixed message.

use crate::api::{ApiClient, Transport};
use crate::session::Session;
use anyhow::Result;

pub struct AuthContext<T: Transport> {
    api: ApiClient<T>,
    user: Option<Session>,
}

impl<T: Transport> AuthContext<T> {
    pub fn new(api: ApiClient<T>) -> Self {
        let user = api.current_user();
        if let Some(user) = &user {
            tracing::debug!(email = %user.email, "restored session");
        }
        Self { api, user }
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    pub fn user(&self) -> Option<&Session> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn login(&mut self, email: &str, password: &str) -> bool {
        match self.api.authenticate(email, password) {
            Ok(Some(session)) => {
                self.user = Some(session);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, transport = e.is_transport(), "login failed");
                false
            }
        }
    }

    pub fn register(&mut self, name: &str, email: &str, password: &str) -> bool {
        match self.api.register_account(name, email, password) {
            Ok(Some(session)) => {
                self.user = Some(session);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, transport = e.is_transport(), "registration failed");
                false
            }
        }
    }

    pub fn logout(&mut self) -> Result<()> {
        self.user = None;
        self.api.logout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, ScriptedTransport};
    use crate::config::Dialect;
    use serde_json::json;

    #[test]
    fn test_login_sets_user() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({ "success": true, "message": "ok", "token": "t" }));
        let mut auth = AuthContext::new(client(transport, Dialect::Flag));

        assert!(!auth.is_authenticated());
        assert!(auth.login("ana@x.com", "secret1"));
        assert_eq!(auth.user().unwrap().email, "ana@x.com");
    }

    #[test]
    fn test_login_errors_collapse_to_false() {
        let transport = ScriptedTransport::new();
        transport.push_status(500, "boom");
        transport.push_json(200, json!({ "success": false, "message": "no" }));
        let mut auth = AuthContext::new(client(transport, Dialect::Flag));

        assert!(!auth.login("ana@x.com", "secret1"));
        assert!(!auth.login("ana@x.com", "secret1"));
        assert!(auth.user().is_none());
    }

    #[test]
    fn test_register_scenario() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({ "success": true, "message": "ok", "userId": 3 }));
        transport.push_json(200, json!({ "success": true, "message": "ok", "token": "t" }));
        let mut auth = AuthContext::new(client(transport, Dialect::Flag));

        assert!(auth.register("Ana", "ana@x.com", "secret1"));
        assert_eq!(auth.user().unwrap().name, "Ana");
        assert_eq!(auth.api().current_user().unwrap().name, "Ana");
    }

    #[test]
    fn test_logout_clears_memory_and_store() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({ "success": true, "message": "ok", "token": "t" }));
        let mut auth = AuthContext::new(client(transport, Dialect::Entity));

        assert!(auth.login("ana@x.com", "secret1"));
        auth.logout().unwrap();
        assert!(!auth.is_authenticated());
        assert!(auth.api().current_user().is_none());
    }
}
