//! API client for the AquaFeed backend.
//!
//! Every request flows through the authorization gate in
//! [`ApiClient::endpoint`]: auth endpoints are dispatched bare, everything
//! else picks up the stored bearer token, and a token that has expired
//! locally fails the call before it leaves the process.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::jwt;
use crate::auth::TokenStore;
use crate::bus::{AuthSignal, SignalBus};
use crate::models::{
    Aquarium, AquariumCreate, AquariumUpdate, Company, CompanyCreate, CompanyUpdate, Device,
    DeviceCreate, DeviceUpdate, FeedingSchedule, FeedingScheduleCreate, FeedingScheduleUpdate,
    Fish, FishCreate, FishUpdate, ProfileUpdate, RegisterResponse, Role, RoleCreate, RoleUpdate,
    TokenPair, UserProfile,
};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for AquaFeed.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: Arc<TokenStore>,
    bus: SignalBus,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<TokenStore>,
        bus: SignalBus,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            store,
            bus,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Whether a path picks up the bearer token. Login and register must be
    /// callable without one; `/auth/me` and `/auth/logout` act on the
    /// current session and need it.
    fn needs_token(path: &str) -> bool {
        !path.starts_with("/auth/") || path == "/auth/me" || path == "/auth/logout"
    }

    /// Build a request with the authorization gate applied.
    ///
    /// An expired stored token clears storage, raises `LogoutRequested`, and
    /// fails the call without dispatching it. A missing token forwards the
    /// request bare; the backend is the authority on rejecting it.
    fn endpoint(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let mut req = self.http.request(method, self.url(path));
        if Self::needs_token(path) {
            if let Some(stored) = self.store.read() {
                if jwt::is_expired(&stored.access_token) {
                    debug!(path, "Stored token expired, refusing request");
                    if let Err(e) = self.store.clear() {
                        warn!(error = %e, "Failed to clear expired token");
                    }
                    self.bus.emit(AuthSignal::LogoutRequested);
                    return Err(ApiError::TokenExpired);
                }
                req = req.bearer_auth(stored.access_token);
            }
        }
        Ok(req)
    }

    /// Dispatch a request and parse the JSON response body.
    async fn run<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let response = req.send().await?;
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Dispatch a request, discarding the response body.
    async fn run_unit(&self, req: RequestBuilder) -> Result<(), ApiError> {
        let response = req.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    // ===== Auth =====

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let req = self
            .endpoint(Method::POST, "/auth/login")?
            .json(&serde_json::json!({ "email": email, "password": password }));
        self.run(req).await
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<RegisterResponse, ApiError> {
        let req = self.endpoint(Method::POST, "/auth/register")?.json(&serde_json::json!({
            "email": email,
            "password": password,
            "display_name": display_name,
        }));
        self.run(req).await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let req = self.endpoint(Method::POST, "/auth/logout")?;
        self.run_unit(req).await
    }

    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let req = self.endpoint(Method::GET, "/auth/me")?;
        self.run(req).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        #[derive(serde::Deserialize)]
        struct Updated {
            user: UserProfile,
        }
        let req = self.endpoint(Method::PUT, "/auth/me")?.json(update);
        let updated: Updated = self.run(req).await?;
        Ok(updated.user)
    }

    pub async fn delete_account(&self) -> Result<(), ApiError> {
        let req = self.endpoint(Method::DELETE, "/auth/me")?;
        self.run_unit(req).await
    }

    // ===== Companies =====

    pub async fn create_company(&self, company: &CompanyCreate) -> Result<Company, ApiError> {
        let req = self.endpoint(Method::POST, "/companies")?.json(company);
        self.run(req).await
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>, ApiError> {
        let req = self.endpoint(Method::GET, "/companies")?;
        self.run(req).await
    }

    pub async fn get_company(&self, company_id: i64) -> Result<Company, ApiError> {
        let req = self.endpoint(Method::GET, &format!("/companies/{}", company_id))?;
        self.run(req).await
    }

    pub async fn update_company(
        &self,
        company_id: i64,
        update: &CompanyUpdate,
    ) -> Result<Company, ApiError> {
        let req = self
            .endpoint(Method::PUT, &format!("/companies/{}", company_id))?
            .json(update);
        self.run(req).await
    }

    pub async fn delete_company(&self, company_id: i64) -> Result<(), ApiError> {
        let req = self.endpoint(Method::DELETE, &format!("/companies/{}", company_id))?;
        self.run_unit(req).await
    }

    /// Invite an existing user into a company under the given role.
    /// The backend takes these as query parameters, not a body.
    pub async fn add_company_user(
        &self,
        company_id: i64,
        email: &str,
        role_id: i64,
    ) -> Result<(), ApiError> {
        let req = self
            .endpoint(Method::POST, &format!("/companies/{}/users", company_id))?
            .query(&[("email", email), ("role_id", &role_id.to_string())]);
        self.run_unit(req).await
    }

    pub async fn remove_company_user(&self, company_id: i64, email: &str) -> Result<(), ApiError> {
        let req = self.endpoint(
            Method::DELETE,
            &format!("/companies/{}/users/{}", company_id, email),
        )?;
        self.run_unit(req).await
    }

    // ===== Aquariums =====

    pub async fn list_aquariums(&self, company_id: i64) -> Result<Vec<Aquarium>, ApiError> {
        let req = self.endpoint(Method::GET, &format!("/companies/{}/aquariums", company_id))?;
        self.run(req).await
    }

    pub async fn create_aquarium(
        &self,
        company_id: i64,
        aquarium: &AquariumCreate,
    ) -> Result<Aquarium, ApiError> {
        let req = self
            .endpoint(Method::POST, &format!("/companies/{}/aquariums", company_id))?
            .json(aquarium);
        self.run(req).await
    }

    pub async fn update_aquarium(
        &self,
        company_id: i64,
        aquarium_id: i64,
        update: &AquariumUpdate,
    ) -> Result<Aquarium, ApiError> {
        let req = self
            .endpoint(
                Method::PUT,
                &format!("/companies/{}/aquariums/{}", company_id, aquarium_id),
            )?
            .json(update);
        self.run(req).await
    }

    pub async fn delete_aquarium(&self, company_id: i64, aquarium_id: i64) -> Result<(), ApiError> {
        let req = self.endpoint(
            Method::DELETE,
            &format!("/companies/{}/aquariums/{}", company_id, aquarium_id),
        )?;
        self.run_unit(req).await
    }

    /// Trigger an immediate feeding on the aquarium's paired device.
    pub async fn feed_now(&self, aquarium_id: i64) -> Result<(), ApiError> {
        let req = self.endpoint(Method::POST, &format!("/aquariums/{}/feed-now", aquarium_id))?;
        self.run_unit(req).await
    }

    // ===== Fish =====

    pub async fn add_fish(&self, aquarium_id: i64, fish: &FishCreate) -> Result<Fish, ApiError> {
        let req = self
            .endpoint(Method::POST, &format!("/aquariums/{}/fish", aquarium_id))?
            .json(fish);
        self.run(req).await
    }

    pub async fn list_fish(&self, aquarium_id: i64) -> Result<Vec<Fish>, ApiError> {
        let req = self.endpoint(Method::GET, &format!("/aquariums/{}/fish", aquarium_id))?;
        self.run(req).await
    }

    /// Update a fish record. The backend expects the update wrapped together
    /// with the owning company id.
    pub async fn update_fish(
        &self,
        aquarium_id: i64,
        fish_id: i64,
        update: &FishUpdate,
        company_id: i64,
    ) -> Result<Fish, ApiError> {
        let req = self
            .endpoint(
                Method::PUT,
                &format!("/aquariums/{}/fish/{}", aquarium_id, fish_id),
            )?
            .json(&serde_json::json!({
                "fish_data": update,
                "company_id": company_id,
            }));
        self.run(req).await
    }

    /// Remove fish from a tank. Passing a quantity removes only that many;
    /// omitting it removes the whole record.
    pub async fn remove_fish(
        &self,
        aquarium_id: i64,
        fish_id: i64,
        company_id: i64,
        quantity: Option<i32>,
    ) -> Result<(), ApiError> {
        let mut params = vec![("company_id", company_id.to_string())];
        if let Some(quantity) = quantity {
            params.push(("quantity", quantity.to_string()));
        }
        let req = self
            .endpoint(
                Method::DELETE,
                &format!("/aquariums/{}/fish/{}", aquarium_id, fish_id),
            )?
            .query(&params);
        self.run_unit(req).await
    }

    // ===== Devices =====

    pub async fn setup_device(
        &self,
        aquarium_id: i64,
        device: &DeviceCreate,
    ) -> Result<Device, ApiError> {
        let req = self
            .endpoint(Method::POST, &format!("/devices/{}", aquarium_id))?
            .json(device);
        self.run(req).await
    }

    pub async fn get_device(&self, aquarium_id: i64) -> Result<Device, ApiError> {
        let req = self.endpoint(Method::GET, &format!("/devices/{}", aquarium_id))?;
        self.run(req).await
    }

    pub async fn update_device(
        &self,
        aquarium_id: i64,
        update: &DeviceUpdate,
    ) -> Result<Device, ApiError> {
        let req = self
            .endpoint(Method::PUT, &format!("/devices/{}", aquarium_id))?
            .json(update);
        self.run(req).await
    }

    pub async fn activate_device(&self, aquarium_id: i64) -> Result<Device, ApiError> {
        let req = self.endpoint(Method::POST, &format!("/devices/{}/activate", aquarium_id))?;
        self.run(req).await
    }

    pub async fn deactivate_device(&self, aquarium_id: i64) -> Result<Device, ApiError> {
        let req = self.endpoint(Method::POST, &format!("/devices/{}/deactivate", aquarium_id))?;
        self.run(req).await
    }

    // ===== Feeding schedules =====

    pub async fn create_feeding_schedule(
        &self,
        aquarium_id: i64,
        schedule: &FeedingScheduleCreate,
    ) -> Result<FeedingSchedule, ApiError> {
        let req = self
            .endpoint(
                Method::POST,
                &format!("/aquariums/{}/feeding-schedules", aquarium_id),
            )?
            .json(schedule);
        self.run(req).await
    }

    pub async fn list_feeding_schedules(
        &self,
        aquarium_id: i64,
    ) -> Result<Vec<FeedingSchedule>, ApiError> {
        let req = self.endpoint(
            Method::GET,
            &format!("/aquariums/{}/feeding-schedules", aquarium_id),
        )?;
        self.run(req).await
    }

    pub async fn get_feeding_schedule(&self, schedule_id: i64) -> Result<FeedingSchedule, ApiError> {
        let req = self.endpoint(Method::GET, &format!("/feeding-schedules/{}", schedule_id))?;
        self.run(req).await
    }

    pub async fn update_feeding_schedule(
        &self,
        schedule_id: i64,
        update: &FeedingScheduleUpdate,
    ) -> Result<FeedingSchedule, ApiError> {
        let req = self
            .endpoint(Method::PUT, &format!("/feeding-schedules/{}", schedule_id))?
            .json(update);
        self.run(req).await
    }

    pub async fn delete_feeding_schedule(&self, schedule_id: i64) -> Result<(), ApiError> {
        let req = self.endpoint(Method::DELETE, &format!("/feeding-schedules/{}", schedule_id))?;
        self.run_unit(req).await
    }

    // ===== Roles =====

    pub async fn create_role(&self, role: &RoleCreate) -> Result<Role, ApiError> {
        let req = self.endpoint(Method::POST, "/roles")?.json(role);
        self.run(req).await
    }

    pub async fn list_company_roles(&self, company_id: i64) -> Result<Vec<Role>, ApiError> {
        let req = self.endpoint(Method::GET, &format!("/roles/company/{}", company_id))?;
        self.run(req).await
    }

    pub async fn get_company_role(&self, company_id: i64, role_id: i64) -> Result<Role, ApiError> {
        let req = self.endpoint(
            Method::GET,
            &format!("/roles/company/{}/role/{}", company_id, role_id),
        )?;
        self.run(req).await
    }

    pub async fn update_role(&self, role_id: i64, update: &RoleUpdate) -> Result<Role, ApiError> {
        let req = self
            .endpoint(Method::PUT, &format!("/roles/{}", role_id))?
            .json(update);
        self.run(req).await
    }

    pub async fn assign_role(
        &self,
        role_id: i64,
        user_uid: &str,
        company_id: i64,
    ) -> Result<(), ApiError> {
        let req = self
            .endpoint(Method::POST, &format!("/roles/{}/assign", role_id))?
            .query(&[("user_uid", user_uid), ("company_id", &company_id.to_string())]);
        self.run_unit(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::tests::make_token;
    use crate::auth::StoredToken;
    use chrono::{Duration, Utc};
    use httpmock::prelude::*;

    fn client_with(
        base_url: &str,
        dir: &std::path::Path,
    ) -> (ApiClient, Arc<TokenStore>, SignalBus) {
        let store = Arc::new(TokenStore::new(dir.to_path_buf()));
        let bus = SignalBus::new();
        let api = ApiClient::new(base_url, Arc::clone(&store), bus.clone()).unwrap();
        (api, store, bus)
    }

    #[test]
    fn token_whitelist_matches_auth_endpoints() {
        assert!(!ApiClient::needs_token("/auth/login"));
        assert!(!ApiClient::needs_token("/auth/register"));
        assert!(ApiClient::needs_token("/auth/me"));
        assert!(ApiClient::needs_token("/auth/logout"));
        assert!(ApiClient::needs_token("/companies"));
        assert!(ApiClient::needs_token("/aquariums/1/fish"));
    }

    #[tokio::test]
    async fn expired_token_fails_before_dispatch() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/companies");
            then.status(200).json_body(serde_json::json!([]));
        });

        let dir = tempfile::tempdir().unwrap();
        let (api, store, bus) = client_with(&server.base_url(), dir.path());
        let mut rx = bus.subscribe();
        store
            .save(&StoredToken {
                access_token: make_token(Utc::now() - Duration::hours(1)),
                token_type: "bearer".into(),
            })
            .unwrap();

        let err = api.list_companies().await.unwrap_err();
        assert!(matches!(err, ApiError::TokenExpired));
        // Request never left the process
        mock.assert_hits(0);
        // Storage cleared and the logout signal raised
        assert!(store.read().is_none());
        assert_eq!(rx.recv().await.unwrap(), AuthSignal::LogoutRequested);
    }

    #[tokio::test]
    async fn valid_token_is_attached_as_bearer() {
        let server = MockServer::start_async().await;
        let token = make_token(Utc::now() + Duration::hours(1));
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/companies")
                .header("authorization", format!("Bearer {}", token));
            then.status(200).json_body(serde_json::json!([]));
        });

        let dir = tempfile::tempdir().unwrap();
        let (api, store, _bus) = client_with(&server.base_url(), dir.path());
        store
            .save(&StoredToken {
                access_token: token,
                token_type: "bearer".into(),
            })
            .unwrap();

        let companies = api.list_companies().await.unwrap();
        assert!(companies.is_empty());
        mock.assert();
    }

    #[tokio::test]
    async fn missing_token_forwards_request_bare() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/companies");
            then.status(401)
                .json_body(serde_json::json!({ "detail": "Not authenticated" }));
        });

        let dir = tempfile::tempdir().unwrap();
        let (api, _store, _bus) = client_with(&server.base_url(), dir.path());

        let err = api.list_companies().await.unwrap_err();
        assert!(matches!(&err, ApiError::Backend(d) if d == "Not authenticated"));
    }

    #[tokio::test]
    async fn login_skips_the_authorization_gate() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(200).json_body(serde_json::json!({
                "access_token": "fresh",
                "token_type": "bearer"
            }));
        });

        // Even with a stale token on disk, login must go through untouched.
        let dir = tempfile::tempdir().unwrap();
        let (api, store, _bus) = client_with(&server.base_url(), dir.path());
        store
            .save(&StoredToken {
                access_token: make_token(Utc::now() - Duration::hours(1)),
                token_type: "bearer".into(),
            })
            .unwrap();

        let pair = api.login("keeper@reef.example", "hunter2!").await.unwrap();
        assert_eq!(pair.access_token, "fresh");
        mock.assert();
    }
}
