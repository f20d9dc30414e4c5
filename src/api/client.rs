//! Domain operations mapped onto backend round trips.

use super::models::{
    LoginRequest, LoginResponse, MutationResponse, Product, ProductFields, ProductUpdate,
    RegisterRequest, RegisterResponse,
};
use super::transport::{Method, Request, Response, Transport};
use crate::config::Dialect;
use crate::error::ApiError;
use crate::session::{Session, SessionStore};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct ApiClient<T: Transport> {
    transport: T,
    dialect: Dialect,
    sessions: SessionStore,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, dialect: Dialect, sessions: SessionStore) -> Self {
        Self {
            transport,
            dialect,
            sessions,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn request<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let body = body.map(serde_json::to_value).transpose()?;
        let request = Request {
            method,
            path: path.to_string(),
            authorization: self
                .sessions
                .token()
                .map(|t| self.dialect.authorization(&t)),
            body,
        };
        tracing::debug!(method = method.as_str(), path, "sending request");

        let response = self.transport.send(&request)?;
        tracing::debug!(status = response.status, path, "received response");
        if !response.is_success() {
            return Err(ApiError::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    fn call<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<R, ApiError> {
        let response = self.request(method, path, body)?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Full product list. Any failure reads as an empty list.
    pub fn list_products(&self) -> Vec<Product> {
        match self.call::<(), Vec<Product>>(Method::Get, "/Product", None) {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch products");
                Vec::new()
            }
        }
    }

    /// Create a product. `Ok(None)` means the backend declined it.
    ///
    /// With the success-flag backend the returned id is a client-side
    /// placeholder (milliseconds since the epoch), not the id the backend
    /// assigned; re-list to see the real one.
    pub fn create_product(&self, fields: &ProductFields) -> Result<Option<Product>, ApiError> {
        match self.dialect {
            Dialect::Flag => {
                let result: MutationResponse = self.call(Method::Post, "/Product", Some(fields))?;
                if !result.success {
                    tracing::warn!(message = %result.message, "create declined");
                    return Ok(None);
                }
                let placeholder = chrono::Utc::now().timestamp_millis().max(0) as u64;
                Ok(Some(Product::from_fields(placeholder, fields.clone())))
            }
            Dialect::Entity => Ok(Some(self.call(Method::Post, "/Product", Some(fields))?)),
        }
    }

    /// Replace the fields of product `id`. `Ok(None)` means the backend
    /// declined the update.
    pub fn update_product(
        &self,
        id: u64,
        fields: &ProductFields,
    ) -> Result<Option<Product>, ApiError> {
        match self.dialect {
            Dialect::Flag => {
                let body = ProductUpdate { id, fields };
                let result: MutationResponse = self.call(Method::Put, "/Product", Some(&body))?;
                if !result.success {
                    tracing::warn!(id, message = %result.message, "update declined");
                    return Ok(None);
                }
                Ok(Some(Product::from_fields(id, fields.clone())))
            }
            Dialect::Entity => {
                let path = format!("/Product/{}", id);
                Ok(Some(self.call(Method::Put, &path, Some(fields))?))
            }
        }
    }

    /// Log in and persist the resulting session. `Ok(None)` means the
    /// credentials were refused; transport and HTTP failures are errors.
    pub fn authenticate(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<Option<Session>, ApiError> {
        let data: LoginResponse = self.call(
            Method::Post,
            "/Auth/login",
            Some(&LoginRequest { email, password }),
        )?;

        let token = match data.token.filter(|t| !t.is_empty()) {
            Some(token) if data.success => token,
            _ => {
                tracing::debug!(message = %data.message, "login refused");
                return Ok(None);
            }
        };

        let session = Session::from_login(email, &token, data.expires_at);
        self.sessions.save(&session)?;
        Ok(Some(session))
    }

    /// Register an account, then log in with the same credentials. The two
    /// calls are independent: a failed login leaves the account registered.
    pub fn register_account(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<Session>, ApiError> {
        let data: RegisterResponse = self.call(
            Method::Post,
            "/Auth/register",
            Some(&RegisterRequest {
                name,
                email,
                password,
            }),
        )?;
        if !data.success {
            tracing::debug!(message = %data.message, "registration refused");
            return Ok(None);
        }

        let Some(mut session) = self.authenticate(email, password)? else {
            return Ok(None);
        };
        session.name = name.to_string();
        if let Some(user_id) = data.user_id {
            session.id = user_id;
        }
        self.sessions.save(&session)?;
        Ok(Some(session))
    }

    pub fn current_user(&self) -> Option<Session> {
        self.sessions.current()
    }

    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.sessions.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, ScriptedTransport};
    use serde_json::json;

    fn fields(stock: u32) -> ProductFields {
        ProductFields {
            name: "Widget".to_string(),
            description: Some("Blue".to_string()),
            price: 9.9,
            stock_quantity: stock,
        }
    }

    fn login_ok(token: &str) -> serde_json::Value {
        json!({
            "success": true,
            "message": "ok",
            "token": token,
            "expiresAt": "2030-01-01T00:00:00Z"
        })
    }

    #[test]
    fn test_list_products_decodes() {
        let transport = ScriptedTransport::new();
        transport.push_json(
            200,
            json!([{ "id": 1, "name": "Widget", "price": 2.5, "stockQuantity": 4 }]),
        );
        let api = client(transport, Dialect::Flag);

        let products = api.list_products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Widget");
        let sent = api.transport.requests();
        assert_eq!(sent[0].method, Method::Get);
        assert_eq!(sent[0].path, "/Product");
    }

    #[test]
    fn test_list_products_swallows_failures() {
        let transport = ScriptedTransport::new();
        transport.push_transport_error("connection refused");
        transport.push_status(500, "boom");
        transport.push_status(200, "not json");
        let api = client(transport, Dialect::Flag);

        assert!(api.list_products().is_empty());
        assert!(api.list_products().is_empty());
        assert!(api.list_products().is_empty());
    }

    #[test]
    fn test_authenticate_then_current() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, login_ok("tok-1"));
        let mut api = client(transport, Dialect::Flag);

        let session = api.authenticate("ana@x.com", "secret1").unwrap().unwrap();
        assert_eq!(session.token, "tok-1");
        assert_eq!(session.expires_at.as_deref(), Some("2030-01-01T00:00:00Z"));
        let current = api.current_user().unwrap();
        assert_eq!(current.email, "ana@x.com");

        let sent = api.transport.requests();
        assert_eq!(sent[0].path, "/Auth/login");
        assert_eq!(
            sent[0].body,
            Some(json!({ "email": "ana@x.com", "password": "secret1" }))
        );
        assert!(sent[0].authorization.is_none());
    }

    #[test]
    fn test_authenticate_refused_is_none() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({ "success": false, "message": "bad credentials" }));
        transport.push_json(200, json!({ "success": true, "message": "ok", "token": "" }));
        let mut api = client(transport, Dialect::Flag);

        assert!(api.authenticate("ana@x.com", "wrong").unwrap().is_none());
        assert!(api.authenticate("ana@x.com", "wrong").unwrap().is_none());
        assert!(api.current_user().is_none());
    }

    #[test]
    fn test_authenticate_http_failure_is_error() {
        let transport = ScriptedTransport::new();
        transport.push_status(401, "unauthorized");
        transport.push_transport_error("connection reset");
        let mut api = client(transport, Dialect::Flag);

        let err = api.authenticate("ana@x.com", "secret1").unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 401, .. }));
        let err = api.authenticate("ana@x.com", "secret1").unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_logout_clears_session() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, login_ok("tok-1"));
        let mut api = client(transport, Dialect::Entity);

        api.authenticate("ana@x.com", "secret1").unwrap();
        api.logout().unwrap();
        assert!(api.current_user().is_none());
    }

    #[test]
    fn test_register_chains_login_and_keeps_name() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({ "success": true, "message": "created", "userId": 42 }));
        transport.push_json(200, login_ok("tok-9"));
        let mut api = client(transport, Dialect::Flag);

        let session = api
            .register_account("Ana", "ana@x.com", "secret1")
            .unwrap()
            .unwrap();
        assert_eq!(session.name, "Ana");
        assert_eq!(session.id, 42);
        assert_eq!(api.current_user(), Some(session));

        let sent = api.transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].path, "/Auth/register");
        assert_eq!(sent[0].body.as_ref().unwrap()["nome"], "Ana");
        assert_eq!(sent[1].path, "/Auth/login");
    }

    #[test]
    fn test_register_refused_skips_login() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({ "success": false, "message": "email taken" }));
        let mut api = client(transport, Dialect::Flag);

        assert!(api
            .register_account("Ana", "ana@x.com", "secret1")
            .unwrap()
            .is_none());
        assert_eq!(api.transport.requests().len(), 1);
    }

    #[test]
    fn test_flag_dialect_sends_raw_token() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, login_ok("tok-1"));
        transport.push_json(200, json!({ "success": true, "message": "created" }));
        let mut api = client(transport, Dialect::Flag);
        api.authenticate("ana@x.com", "secret1").unwrap();

        let created = api.create_product(&fields(3)).unwrap().unwrap();
        assert_eq!(created.name, "Widget");
        assert!(created.id > 0);

        let sent = api.transport.requests();
        assert_eq!(sent[1].method, Method::Post);
        assert_eq!(sent[1].authorization.as_deref(), Some("tok-1"));
        assert_eq!(sent[1].body.as_ref().unwrap()["stockQuantity"], 3);
    }

    #[test]
    fn test_flag_create_declined() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({ "success": false, "message": "invalid" }));
        let api = client(transport, Dialect::Flag);
        assert!(api.create_product(&fields(1)).unwrap().is_none());
    }

    #[test]
    fn test_create_failure_is_error() {
        let transport = ScriptedTransport::new();
        transport.push_status(500, "boom");
        let api = client(transport, Dialect::Flag);
        assert!(api.create_product(&fields(1)).is_err());
    }

    #[test]
    fn test_flag_update_puts_id_in_body() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({ "success": true, "message": "updated" }));
        let api = client(transport, Dialect::Flag);

        let updated = api.update_product(5, &fields(8)).unwrap().unwrap();
        assert_eq!(updated.id, 5);
        assert_eq!(updated.stock_quantity, 8);

        let sent = api.transport.requests();
        assert_eq!(sent[0].method, Method::Put);
        assert_eq!(sent[0].path, "/Product");
        assert_eq!(sent[0].body.as_ref().unwrap()["id"], 5);
    }

    #[test]
    fn test_entity_dialect_update_path_and_bearer() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, login_ok("tok-2"));
        transport.push_json(
            200,
            json!({ "id": 5, "name": "Widget", "price": 9.9, "stockQuantity": 8 }),
        );
        let mut api = client(transport, Dialect::Entity);
        api.authenticate("ana@x.com", "secret1").unwrap();

        let updated = api.update_product(5, &fields(8)).unwrap().unwrap();
        assert_eq!(updated.stock_quantity, 8);

        let sent = api.transport.requests();
        assert_eq!(sent[1].path, "/Product/5");
        assert_eq!(sent[1].authorization.as_deref(), Some("Bearer tok-2"));
        assert!(sent[1].body.as_ref().unwrap().get("id").is_none());
    }

    #[test]
    fn test_entity_dialect_create_returns_server_id() {
        let transport = ScriptedTransport::new();
        transport.push_json(
            201,
            json!({ "id": 77, "name": "Widget", "price": 9.9, "stockQuantity": 1 }),
        );
        let api = client(transport, Dialect::Entity);
        assert_eq!(api.create_product(&fields(1)).unwrap().unwrap().id, 77);
    }

    #[test]
    fn test_update_then_relist_reflects_stock() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({ "success": true, "message": "updated" }));
        transport.push_json(
            200,
            json!([{ "id": 5, "name": "Widget", "price": 9.9, "stockQuantity": 8 }]),
        );
        let api = client(transport, Dialect::Flag);

        api.update_product(5, &fields(8)).unwrap();
        let listed = api.list_products();
        assert_eq!(listed[0].stock_quantity, 8);
    }
}
