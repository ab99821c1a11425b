use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::filter::Filter;
use crate::models::transaction::{Category, NewTransaction, Transaction};
use crate::transport::{ApiRequest, ApiResponse};

use super::session_service::SessionManager;

pub const TRANSACTIONS_PATH: &str = "/transactions/";
pub const CATEGORIES_PATH: &str = "/categories/";

/// Reads and creates transactions through the session.
///
/// Two flavours of read:
/// - `fetch_*` return every failure to the caller.
/// - `query_transactions` / `list_categories` are fail-soft: any failure is
///   logged and turned into an empty list, so views always get something to
///   render.
pub struct TransactionService {
    session: Arc<SessionManager>,
}

impl TransactionService {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Transactions matching `filter`, most recent first as the provider
    /// orders them.
    ///
    /// Only present filter fields are sent. The provider's answer is
    /// re-checked against the filter so a lax provider cannot leak rows
    /// outside the requested range.
    pub async fn fetch_transactions(&self, filter: &Filter) -> Result<Vec<Transaction>, CoreError> {
        let request = ApiRequest::get(TRANSACTIONS_PATH).with_query(filter.to_query_pairs());
        let response = self.session.authenticated_call(request).await?;
        let mut transactions: Vec<Transaction> = success(response)?.json()?;

        let received = transactions.len();
        transactions.retain(|t| filter.matches(t));
        if transactions.len() != received {
            tracing::debug!(
                dropped = received - transactions.len(),
                "provider returned transactions outside the filter"
            );
        }
        Ok(transactions)
    }

    /// Fail-soft [`TransactionService::fetch_transactions`].
    pub async fn query_transactions(&self, filter: &Filter) -> Vec<Transaction> {
        match self.fetch_transactions(filter).await {
            Ok(transactions) => transactions,
            Err(e) => {
                tracing::warn!(error = %e, "transaction query failed; showing none");
                Vec::new()
            }
        }
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, CoreError> {
        let response = self
            .session
            .authenticated_call(ApiRequest::get(CATEGORIES_PATH))
            .await?;
        success(response)?.json()
    }

    /// Fail-soft [`TransactionService::fetch_categories`].
    pub async fn list_categories(&self) -> Vec<Category> {
        match self.fetch_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                tracing::warn!(error = %e, "category lookup failed; showing none");
                Vec::new()
            }
        }
    }

    /// Create a transaction. Provider-side validation messages come back
    /// verbatim as `ValidationError`; nothing is retried.
    pub async fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction, CoreError> {
        new.validate()?;

        let request = ApiRequest::post(TRANSACTIONS_PATH).with_json(new)?;
        let response = self.session.authenticated_call(request).await?;
        if matches!(response.status, 400 | 422) {
            return Err(CoreError::ValidationError(response.error_message()));
        }

        let created: Transaction = success(response)?.json()?;
        tracing::info!(id = created.id, kind = %created.transaction_type, "transaction created");
        Ok(created)
    }
}

fn success(response: ApiResponse) -> Result<ApiResponse, CoreError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(CoreError::Provider {
            status: response.status,
            message: response.error_message(),
        })
    }
}
