use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::errors::CoreError;
use crate::models::identity::{
    AuthResponse, Identity, RenewalRequest, RenewalResponse, SignInRequest, SignUpRequest,
};
use crate::storage::CredentialStorage;
use crate::transport::{ApiRequest, ApiResponse, Transport};

use super::credential_store::CredentialStore;

pub const SIGN_IN_PATH: &str = "/auth/signin/";
pub const SIGN_UP_PATH: &str = "/auth/signup/";
pub const RENEWAL_PATH: &str = "/auth/token/refresh/";

const DEFAULT_RENEWAL_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of one renewal exchange, shared by every caller waiting on it.
#[derive(Debug, Clone)]
enum RenewalOutcome {
    /// New access credential.
    Renewed(String),
    /// Refresh credential missing or refused; the session is gone.
    Rejected(String),
    /// Provider unreachable (or too slow); the session is untouched.
    Unreachable(String),
}

/// A renewal in progress (or settled), keyed by the access credential that
/// was refused. The outcome is `None` until the exchange settles or times
/// out.
struct RenewalFlight {
    stale: Option<String>,
    outcome: watch::Receiver<Option<RenewalOutcome>>,
}

/// Owns the session credentials and runs every authenticated call.
///
/// Per call: attach bearer → send → on 401 renew once → replay once.
/// Concurrent callers refused with the same access credential join a single
/// renewal flight instead of each hitting the provider, which matters for
/// providers that rotate the refresh credential on use.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    store: Arc<Mutex<CredentialStore>>,
    in_flight: Arc<Mutex<Option<RenewalFlight>>>,
    renewal_timeout: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &*self.lock_store())
            .field("renewal_timeout", &self.renewal_timeout)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Build a manager, reading durable storage once.
    pub fn new(transport: Arc<dyn Transport>, storage: Box<dyn CredentialStorage>) -> Self {
        Self {
            transport,
            store: Arc::new(Mutex::new(CredentialStore::open(storage))),
            in_flight: Arc::new(Mutex::new(None)),
            renewal_timeout: DEFAULT_RENEWAL_TIMEOUT,
        }
    }

    /// How long callers wait on a renewal. The exchange itself keeps running
    /// past it and still applies its answer.
    #[must_use]
    pub fn with_renewal_timeout(mut self, timeout: Duration) -> Self {
        self.renewal_timeout = timeout;
        self
    }

    // ── Identity ────────────────────────────────────────────────────

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock_store().is_authenticated()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<Identity> {
        self.lock_store().identity().cloned()
    }

    /// Exchange username + password for a session.
    ///
    /// On failure nothing stored changes and the provider's message is
    /// returned as `ValidationError`.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<Identity, CoreError> {
        require("username", username)?;
        require("password", password)?;
        let body = SignInRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        self.exchange(SIGN_IN_PATH, ApiRequest::post(SIGN_IN_PATH).with_json(&body)?)
            .await
    }

    /// Create an account and start a session for it.
    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, CoreError> {
        require("username", username)?;
        require("email", email)?;
        require("password", password)?;
        let body = SignUpRequest {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.exchange(SIGN_UP_PATH, ApiRequest::post(SIGN_UP_PATH).with_json(&body)?)
            .await
    }

    /// Drop the session, in memory and in storage.
    pub fn sign_out(&self) {
        self.teardown();
        tracing::info!("signed out");
    }

    // ── Authenticated calls ─────────────────────────────────────────

    /// Run `request` with the current access credential attached.
    ///
    /// - any status other than 401 → `Ok(response)`, untouched
    /// - 401 → one renewal, one replay:
    ///   - renewal refused → session torn down, `Err(RenewalFailed)`
    ///   - replay still 401 → session torn down, `Err(Unauthorized)`
    /// - transport failure, or renewal timeout → `Err(NetworkUnavailable)`,
    ///   session untouched
    ///
    /// The request must not carry its own Authorization header.
    pub async fn authenticated_call(&self, request: ApiRequest) -> Result<ApiResponse, CoreError> {
        if request.has_authorization_header() {
            return Err(CoreError::InvalidRequest(
                "the Authorization header is managed by the session".into(),
            ));
        }

        let mut request = request;
        let attached = self.access_token();
        request.set_bearer(attached.clone());

        let response = self.transport.send(&request).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        tracing::debug!(path = %request.path, "access credential refused; renewing");
        let access = match self.renew(attached).await {
            RenewalOutcome::Renewed(access) => access,
            RenewalOutcome::Rejected(reason) => return Err(CoreError::RenewalFailed(reason)),
            RenewalOutcome::Unreachable(reason) => {
                return Err(CoreError::NetworkUnavailable(reason))
            }
        };

        request.set_bearer(Some(access));
        let replay = self.transport.send(&request).await?;
        if replay.is_unauthorized() {
            tracing::warn!(path = %request.path, "replay refused after renewal; ending session");
            self.teardown();
            return Err(CoreError::Unauthorized);
        }
        Ok(replay)
    }

    // ── Internal ────────────────────────────────────────────────────

    async fn exchange(&self, path: &str, request: ApiRequest) -> Result<Identity, CoreError> {
        let response = self.transport.send(&request).await?;

        if !response.is_success() {
            let message = response.error_message();
            tracing::warn!(path, status = response.status, %message, "credential exchange refused");
            return Err(CoreError::ValidationError(message));
        }

        let auth: AuthResponse = response.json()?;
        let identity = auth.user.clone();
        self.lock_store().establish(auth.tokens, auth.user)?;
        tracing::info!(username = %identity.username, "session established");
        Ok(identity)
    }

    /// Join (or start) the renewal flight for credential `stale`.
    async fn renew(&self, stale: Option<String>) -> RenewalOutcome {
        // Someone already replaced the credential we were refused with.
        if let Some(current) = self.access_token() {
            if Some(&current) != stale.as_ref() {
                return RenewalOutcome::Renewed(current);
            }
        }

        // Settled flights stay put so late callers refused with the same
        // credential get the same answer.
        let mut outcome = {
            let mut slot = self.lock_in_flight();
            match slot.as_ref() {
                Some(flight) if flight.stale == stale => flight.outcome.clone(),
                _ => {
                    let outcome = self.start_renewal();
                    *slot = Some(RenewalFlight {
                        stale,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };

        let settled = match outcome.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| {
            RenewalOutcome::Unreachable("credential renewal ended without an outcome".into())
        })
    }

    /// Spawn the single provider exchange of a new flight.
    ///
    /// The exchange runs to completion even when every waiter has gone;
    /// only the waiters are released at `renewal_timeout`. A flight that
    /// could not reach the provider is retired so the next caller retries.
    fn start_renewal(&self) -> watch::Receiver<Option<RenewalOutcome>> {
        let (sender, receiver) = watch::channel(None);
        let renewal = Renewal {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
        };
        let in_flight = Arc::clone(&self.in_flight);
        let own = receiver.clone();
        let timeout = self.renewal_timeout;

        tokio::spawn(async move {
            let mut exchange = std::pin::pin!(renewal.run());
            let outcome = match tokio::time::timeout(timeout, &mut exchange).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(?timeout, "credential renewal timed out; releasing waiters");
                    sender.send_replace(Some(RenewalOutcome::Unreachable(format!(
                        "credential renewal timed out after {}s",
                        timeout.as_secs_f32()
                    ))));
                    exchange.await
                }
            };

            if matches!(outcome, RenewalOutcome::Unreachable(_)) {
                let mut slot = lock(&in_flight);
                if slot
                    .as_ref()
                    .is_some_and(|flight| flight.outcome.same_channel(&own))
                {
                    *slot = None;
                }
            }
            sender.send_replace(Some(outcome));
        });

        receiver
    }

    fn access_token(&self) -> Option<String> {
        self.lock_store().access_token().map(str::to_owned)
    }

    fn teardown(&self) {
        self.lock_store().teardown();
    }

    fn lock_store(&self) -> MutexGuard<'_, CredentialStore> {
        lock(&self.store)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<RenewalFlight>> {
        lock(&self.in_flight)
    }
}

/// What a spawned renewal needs from the manager.
struct Renewal {
    transport: Arc<dyn Transport>,
    store: Arc<Mutex<CredentialStore>>,
}

impl Renewal {
    /// The single provider exchange behind a renewal flight.
    ///
    /// Teardown and token replacement are keyed on the refresh credential
    /// presented, so a late answer never touches a session established
    /// after the renewal started.
    async fn run(self) -> RenewalOutcome {
        let refresh = lock(&self.store).refresh_token().map(str::to_owned);
        let Some(refresh) = refresh else {
            lock(&self.store).teardown();
            return RenewalOutcome::Rejected("no refresh credential stored".into());
        };

        let request = match ApiRequest::post(RENEWAL_PATH).with_json(&RenewalRequest {
            refresh: &refresh,
        }) {
            Ok(request) => request,
            Err(e) => return RenewalOutcome::Unreachable(e.to_string()),
        };

        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "credential renewal could not reach the provider");
                return RenewalOutcome::Unreachable(e.to_string());
            }
        };

        if !response.is_success() {
            let reason = response.error_message();
            tracing::warn!(status = response.status, %reason, "refresh credential refused; ending session");
            lock(&self.store).teardown_if_current(&refresh);
            return RenewalOutcome::Rejected(reason);
        }

        let renewed: RenewalResponse = match response.json() {
            Ok(renewed) => renewed,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable renewal response; ending session");
                lock(&self.store).teardown_if_current(&refresh);
                return RenewalOutcome::Rejected(e.to_string());
            }
        };

        let access = renewed.access.clone();
        let replaced =
            lock(&self.store).replace_tokens(&refresh, renewed.access, renewed.refresh);
        if !replaced {
            tracing::debug!("session changed during renewal; discarding renewed credential");
            return RenewalOutcome::Rejected("session ended during renewal".into());
        }
        tracing::info!("access credential renewed");
        RenewalOutcome::Renewed(access)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn require(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::ValidationError(format!("{field} is required")));
    }
    Ok(())
}
