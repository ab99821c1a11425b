pub mod errors;
pub mod models;
pub mod services;
pub mod storage;
pub mod transport;

use std::sync::Arc;

use chrono::NaiveDate;
use models::{
    filter::{Filter, QuickFilter},
    identity::Identity,
    metrics::{AnalyticsSummary, DashboardSummary},
    settings::ClientSettings,
    transaction::{Category, NewTransaction, Transaction},
};
use services::{
    metrics_service::MetricsService, session_service::SessionManager,
    transaction_service::TransactionService,
};
use storage::{CredentialStorage, FileStorage};
use transport::{HttpTransport, Transport};

use errors::CoreError;

/// Main entry point for the finance tracker core library.
/// Holds the session and all services that work through it.
#[must_use]
pub struct FinanceTracker {
    session: Arc<SessionManager>,
    transaction_service: TransactionService,
    metrics_service: MetricsService,
}

impl std::fmt::Debug for FinanceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinanceTracker")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl FinanceTracker {
    /// Build a tracker talking HTTP to `settings.base_url`, with credentials
    /// persisted at `settings.credentials_path` (sealed when a passphrase
    /// is configured).
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, CoreError> {
        let transport = HttpTransport::new(&settings.base_url, settings.request_timeout())?;
        let storage = match settings.credentials_passphrase.as_deref() {
            Some(passphrase) if !passphrase.is_empty() => {
                FileStorage::open_sealed(&settings.credentials_path, passphrase)?
            }
            _ => FileStorage::open(&settings.credentials_path)?,
        };

        let session = SessionManager::new(Arc::new(transport), Box::new(storage))
            .with_renewal_timeout(settings.renewal_timeout());
        Ok(Self::build(session))
    }

    /// Build a tracker from explicit parts (tests, embedding applications).
    pub fn with_parts(transport: Arc<dyn Transport>, storage: Box<dyn CredentialStorage>) -> Self {
        Self::build(SessionManager::new(transport, storage))
    }

    fn build(session: SessionManager) -> Self {
        let session = Arc::new(session);
        Self {
            transaction_service: TransactionService::new(Arc::clone(&session)),
            metrics_service: MetricsService::new(),
            session,
        }
    }

    // ── Session ─────────────────────────────────────────────────────

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<Identity, CoreError> {
        self.session.sign_in(username, password).await
    }

    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, CoreError> {
        self.session.sign_up(username, email, password).await
    }

    pub fn sign_out(&self) {
        self.session.sign_out();
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<Identity> {
        self.session.current_user()
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Transactions matching `filter`; empty on any failure.
    pub async fn transactions(&self, filter: &Filter) -> Vec<Transaction> {
        self.transaction_service.query_transactions(filter).await
    }

    /// Transactions for a quick-filter preset as of `today`.
    pub async fn quick(&self, quick: QuickFilter, today: NaiveDate) -> Vec<Transaction> {
        self.transactions(&quick.to_filter(today)).await
    }

    /// Categories; empty on any failure.
    pub async fn categories(&self) -> Vec<Category> {
        self.transaction_service.list_categories().await
    }

    pub async fn create_transaction(
        &self,
        new: &NewTransaction,
    ) -> Result<Transaction, CoreError> {
        self.transaction_service.create_transaction(new).await
    }

    // ── Metrics ─────────────────────────────────────────────────────

    /// Dashboard figures for `reference`, computed over every transaction.
    pub async fn dashboard(&self, reference: NaiveDate) -> DashboardSummary {
        let transactions = self.transactions(&Filter::all()).await;
        self.metrics_service.dashboard(&transactions, reference)
    }

    /// Analytics figures for `reference`, computed over every transaction.
    pub async fn analytics(&self, reference: NaiveDate) -> AnalyticsSummary {
        let transactions = self.transactions(&Filter::all()).await;
        self.metrics_service.analytics(&transactions, reference)
    }

    #[must_use]
    pub fn metrics(&self) -> &MetricsService {
        &self.metrics_service
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    #[must_use]
    pub fn transaction_service(&self) -> &TransactionService {
        &self.transaction_service
    }
}
