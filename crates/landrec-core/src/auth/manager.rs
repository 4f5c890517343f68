//! Session lifecycle: login, logout, token refresh, authorized requests.
//!
//! Two invariants carry this module:
//!
//! - concurrent demand for a token refresh collapses into exactly one
//!   backend call, and every waiter observes that call's outcome;
//! - an authenticated request that sees a 401 is replayed at most once,
//!   after a successful refresh, and never retried beyond that.
//!
//! The refresh gate is a mutex-guarded slot holding the shared future of
//! the outstanding refresh. The mutex is held only across the
//! check-and-install step, never across the network await, so late
//! arrivals attach to the in-flight operation instead of starting
//! another.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::api::transport::{ApiRequest, ApiTransport, Body, Method, RawResponse};
use crate::api::ApiError;

use super::claims::Claims;
use super::session::{SessionData, SessionStore, UserProfile};

pub(crate) const LOGIN_PATH: &str = "accounts/login/";
pub(crate) const LOGOUT_PATH: &str = "accounts/logout/";
pub(crate) const REFRESH_PATH: &str = "accounts/token/refresh/";

/// Authentication state as observed by the UI layer.
///
/// `Unauthenticated` is terminal until the next `login`; a transition into
/// it while a screen is open is the redirect-to-login signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    user_id: i64,
    username: String,
    #[serde(default)]
    is_staff: bool,
    #[serde(default)]
    is_superuser: bool,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present only when the backend rotates refresh tokens.
    refresh: Option<String>,
}

type RefreshFuture = Shared<BoxFuture<'static, bool>>;

/// Owns the credential pair and provides authenticated access to the
/// backend. Clone is cheap; clones share the same session state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn ApiTransport>,
    base_url: String,
    store: Mutex<SessionStore>,
    refresh_gate: Mutex<Option<RefreshFuture>>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        base_url: impl Into<String>,
        store: SessionStore,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let initial = if store.access_token().is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        };
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                transport,
                base_url,
                store: Mutex::new(store),
                refresh_gate: Mutex::new(None),
                state,
            }),
        }
    }

    /// Subscribe to session state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Authenticate and store the resulting session, overwriting any
    /// previous one unconditionally.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, ApiError> {
        self.inner.state.send_replace(SessionState::Authenticating);
        match self.try_login(username, password).await {
            Ok(profile) => {
                self.inner.state.send_replace(SessionState::Authenticated);
                debug!(username = %profile.username, "Login successful");
                Ok(profile)
            }
            Err(error) => {
                self.inner.state.send_replace(SessionState::Unauthenticated);
                Err(error)
            }
        }
    }

    async fn try_login(&self, username: &str, password: &str) -> Result<UserProfile, ApiError> {
        let request = ApiRequest {
            method: Method::Post,
            url: self.url(LOGIN_PATH),
            bearer: None,
            body: Body::Json(json!({ "username": username, "password": password })),
        };
        let response = self.inner.transport.execute(request).await?;
        if !response.is_success() {
            let message = ApiError::backend_detail(&response.text())
                .unwrap_or_else(|| "Login failed".to_string());
            return Err(ApiError::Login(message));
        }
        let login: LoginResponse = response
            .json()
            .map_err(|e| ApiError::InvalidResponse(format!("login response: {e}")))?;
        let profile = UserProfile {
            user_id: login.user_id,
            username: login.username,
            is_staff: login.is_staff,
            is_superuser: login.is_superuser,
            email: login.email,
        };
        let mut store = self.inner.store.lock().await;
        if let Err(error) = store.replace(SessionData {
            access: Some(login.access),
            refresh: Some(login.refresh),
            profile: Some(profile.clone()),
        }) {
            warn!(error = %error, "Failed to persist session");
        }
        Ok(profile)
    }

    /// End the session. Never fails to the caller: the backend
    /// notification is best-effort, local state is always cleared.
    /// Idempotent when no session is present.
    pub async fn logout(&self) {
        let (refresh, access) = {
            let store = self.inner.store.lock().await;
            (
                store.refresh_token().map(str::to_string),
                store.access_token().map(str::to_string),
            )
        };
        if let Some(refresh) = refresh {
            let request = ApiRequest {
                method: Method::Post,
                url: self.url(LOGOUT_PATH),
                bearer: access,
                body: Body::Json(json!({ "refresh_token": refresh })),
            };
            match self.inner.transport.execute(request).await {
                Ok(response) if !response.is_success() => {
                    warn!(status = response.status, "Logout rejected by backend; clearing local session anyway");
                }
                Err(error) => {
                    warn!(error = %error, "Logout notification failed; clearing local session anyway");
                }
                Ok(_) => {}
            }
        }
        self.teardown().await;
    }

    /// Clear persisted session state, reset the refresh gate and publish
    /// the unauthenticated state.
    async fn teardown(&self) {
        {
            let mut store = self.inner.store.lock().await;
            if let Err(error) = store.clear() {
                warn!(error = %error, "Failed to clear session storage");
            }
        }
        *self.inner.refresh_gate.lock().await = None;
        self.inner.state.send_replace(SessionState::Unauthenticated);
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Returns `true` when a usable access token is stored afterwards.
    /// With no refresh token stored this returns `false` immediately, with
    /// no network call and no storage mutation. Callers arriving while a
    /// refresh is outstanding wait on the same in-flight operation; one
    /// backend call serves them all.
    pub async fn refresh_access_token(&self) -> bool {
        if self.inner.store.lock().await.refresh_token().is_none() {
            debug!("No refresh token stored; not attempting refresh");
            return false;
        }
        let inflight = {
            let mut gate = self.inner.refresh_gate.lock().await;
            match gate.as_ref() {
                Some(inflight) => {
                    debug!("Refresh already in flight; waiting for its outcome");
                    inflight.clone()
                }
                None => {
                    let manager = self.clone();
                    let future: RefreshFuture = async move {
                        let ok = manager.perform_refresh().await;
                        // Settle: let the next demand start a fresh attempt.
                        *manager.inner.refresh_gate.lock().await = None;
                        ok
                    }
                    .boxed()
                    .shared();
                    *gate = Some(future.clone());
                    future
                }
            }
        };
        inflight.await
    }

    async fn perform_refresh(&self) -> bool {
        let refresh = match self.inner.store.lock().await.refresh_token() {
            Some(token) => token.to_string(),
            None => return false,
        };
        self.inner.state.send_replace(SessionState::Refreshing);
        let request = ApiRequest {
            method: Method::Post,
            url: self.url(REFRESH_PATH),
            bearer: None,
            body: Body::Json(json!({ "refresh": refresh })),
        };
        let response = match self.inner.transport.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "Token refresh failed; clearing session");
                self.teardown().await;
                return false;
            }
        };
        if !response.is_success() {
            warn!(status = response.status, "Token refresh rejected; clearing session");
            self.teardown().await;
            return false;
        }
        let parsed: RefreshResponse = match response.json() {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(error = %error, "Unparseable refresh response; clearing session");
                self.teardown().await;
                return false;
            }
        };
        {
            let mut store = self.inner.store.lock().await;
            if let Err(error) = store.set_access(parsed.access) {
                warn!(error = %error, "Failed to persist refreshed access token");
            }
            if let Some(rotated) = parsed.refresh {
                debug!("Refresh token rotated by backend");
                if let Err(error) = store.set_refresh(rotated) {
                    warn!(error = %error, "Failed to persist rotated refresh token");
                }
            }
        }
        self.inner.state.send_replace(SessionState::Authenticated);
        true
    }

    /// Resolve whether a persisted session is still usable, at application
    /// start or reload. Never trusts a stored access token without a round
    /// trip.
    pub async fn verify_auth(&self) -> bool {
        let (has_access, has_refresh) = {
            let store = self.inner.store.lock().await;
            (
                store.access_token().is_some(),
                store.refresh_token().is_some(),
            )
        };
        if !has_access && !has_refresh {
            return false;
        }
        if has_access && !has_refresh {
            // A lone access token cannot be validated without a refresh
            // round trip; drop it and report the session unusable.
            let refreshed = self.refresh_access_token().await;
            if !refreshed {
                self.teardown().await;
            }
            return refreshed;
        }
        self.refresh_access_token().await
    }

    /// Send an authenticated request.
    ///
    /// Attaches `Authorization: Bearer <access>` when a token is stored.
    /// On a 401 from anything but the refresh endpoint, refreshes the
    /// token and replays the identical request exactly once, returning the
    /// replay's outcome as-is. A failed refresh tears the session down and
    /// surfaces `ApiError::Unauthorized`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Body,
    ) -> Result<RawResponse, ApiError> {
        let request = ApiRequest {
            method,
            url: self.url(path),
            bearer: None,
            body,
        };
        let response = self.send_with_token(request.clone()).await?;
        if response.status != 401 || path.trim_matches('/') == REFRESH_PATH.trim_matches('/') {
            return Ok(response);
        }
        debug!(path, "Received 401; attempting token refresh");
        if self.refresh_access_token().await {
            return self.send_with_token(request).await;
        }
        self.teardown().await;
        Err(ApiError::Unauthorized)
    }

    async fn send_with_token(&self, mut request: ApiRequest) -> Result<RawResponse, ApiError> {
        request.bearer = self
            .inner
            .store
            .lock()
            .await
            .access_token()
            .map(str::to_string);
        Ok(self.inner.transport.execute(request).await?)
    }

    /// Decode the stored access token's claims. Local only, infallible:
    /// no token or a malformed token yields empty defaults.
    pub async fn claims(&self) -> Claims {
        match self.inner.store.lock().await.access_token() {
            Some(token) => Claims::decode(token),
            None => Claims::default(),
        }
    }

    /// User attributes captured at login, if a session is present.
    pub async fn profile(&self) -> Option<UserProfile> {
        self.inner.store.lock().await.profile().cloned()
    }

    /// Whether an access token is currently stored. Does not verify the
    /// token against the backend.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.store.lock().await.access_token().is_some()
    }
}
