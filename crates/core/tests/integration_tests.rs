// ═══════════════════════════════════════════════════════════════════
// Integration Tests — the FinanceTracker facade against an in-memory
// ledger server: sign-up/in, queries, creation, metrics, renewal,
// restart and sign-out
// ═══════════════════════════════════════════════════════════════════

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use finance_tracker_core::errors::CoreError;
use finance_tracker_core::models::filter::{Filter, QuickFilter};
use finance_tracker_core::models::metrics::{BalanceHealth, Direction, Mood};
use finance_tracker_core::models::money::Amount;
use finance_tracker_core::models::settings::ClientSettings;
use finance_tracker_core::models::transaction::{NewTransaction, TransactionType};
use finance_tracker_core::storage::{MemoryStorage, Slot};
use finance_tracker_core::transport::{ApiRequest, ApiResponse, Method, Transport};
use finance_tracker_core::FinanceTracker;

// ═══════════════════════════════════════════════════════════════════
// In-memory ledger server
// ═══════════════════════════════════════════════════════════════════

const PASSWORD: &str = "correct horse";

#[derive(Default)]
struct LedgerState {
    access: Option<String>,
    refresh: Option<String>,
    issued: u32,
    renewals: u32,
    next_id: i64,
    transactions: Vec<Value>,
}

/// Behaves like the real provider for one user: issues tokens, answers
/// renewals, stores transactions and filters them by type only (the
/// client narrows the rest).
#[derive(Default)]
struct LedgerServer {
    state: Mutex<LedgerState>,
}

impl LedgerServer {
    fn categories() -> Value {
        json!([
            { "id": 1, "name": "Salary", "emoji": "💰", "color": "#34c759" },
            { "id": 2, "name": "Food", "emoji": "🍔", "color": "#ff3b30" },
            { "id": 3, "name": "Transport", "emoji": "🚌", "color": "#007aff" }
        ])
    }

    /// Invalidate the current access credential; the refresh one survives.
    fn expire_access(&self) {
        self.state.lock().unwrap().access = None;
    }

    /// Invalidate both credentials.
    fn revoke(&self) {
        let mut state = self.state.lock().unwrap();
        state.access = None;
        state.refresh = None;
    }

    fn renewals(&self) -> u32 {
        self.state.lock().unwrap().renewals
    }

    fn issue(&self, username: &str, email: &str, status: u16) -> ApiResponse {
        let mut state = self.state.lock().unwrap();
        state.issued += 1;
        let access = format!("access-{}", state.issued);
        let refresh = format!("refresh-{}", state.issued);
        state.access = Some(access.clone());
        state.refresh = Some(refresh.clone());
        ApiResponse::json_body(
            status,
            &json!({
                "user": { "id": 1, "username": username, "email": email },
                "tokens": { "access": access, "refresh": refresh },
            }),
        )
    }

    fn renew(&self, body: &Value) -> ApiResponse {
        let mut state = self.state.lock().unwrap();
        let presented = body["refresh"].as_str();
        if presented.is_none() || presented != state.refresh.as_deref() {
            return ApiResponse::json_body(401, &json!({ "detail": "Token is invalid or expired" }));
        }
        state.issued += 1;
        state.renewals += 1;
        let access = format!("access-{}", state.issued);
        state.access = Some(access.clone());
        ApiResponse::json_body(200, &json!({ "access": access }))
    }

    fn list(&self, request: &ApiRequest) -> ApiResponse {
        let state = self.state.lock().unwrap();
        let wanted = request
            .query
            .iter()
            .find(|(k, _)| k == "type")
            .map(|(_, v)| v.clone());
        let mut rows: Vec<Value> = state
            .transactions
            .iter()
            .filter(|t| wanted.as_deref().map_or(true, |w| t["transaction_type"] == w))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b["transaction_date"]
                .as_str()
                .cmp(&a["transaction_date"].as_str())
        });
        ApiResponse::json_body(200, &Value::Array(rows))
    }

    fn create(&self, body: &Value) -> ApiResponse {
        let category = Self::categories()
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["id"] == body["category_id"])
            .cloned();
        let Some(category) = category else {
            return ApiResponse::json_body(400, &json!({ "category_id": ["Invalid pk."] }));
        };

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let when = body
            .get("transaction_date")
            .cloned()
            .unwrap_or_else(|| json!("2024-03-15T12:00:00Z"));
        let row = json!({
            "id": state.next_id,
            "amount": body["amount"],
            "transaction_type": body["transaction_type"],
            "category": category,
            "description": body.get("description").cloned().unwrap_or(Value::Null),
            "transaction_date": when,
            "created_at": when,
        });
        state.transactions.push(row.clone());
        ApiResponse::json_body(201, &row)
    }
}

#[async_trait]
impl Transport for LedgerServer {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, CoreError> {
        let body = request.body.clone().unwrap_or(Value::Null);

        match (request.method, request.path.as_str()) {
            (Method::Post, "/auth/signup/") => {
                let username = body["username"].as_str().unwrap_or_default();
                let email = body["email"].as_str().unwrap_or_default();
                return Ok(self.issue(username, email, 201));
            }
            (Method::Post, "/auth/signin/") => {
                if body["password"] != PASSWORD {
                    return Ok(ApiResponse::json_body(
                        401,
                        &json!({ "error": "Invalid credentials" }),
                    ));
                }
                let username = body["username"].as_str().unwrap_or_default();
                return Ok(self.issue(username, "alice@example.com", 200));
            }
            (Method::Post, "/auth/token/refresh/") => return Ok(self.renew(&body)),
            _ => {}
        }

        let current = self.state.lock().unwrap().access.clone();
        if current.is_none() || request.bearer() != current.as_deref() {
            return Ok(ApiResponse::json_body(
                401,
                &json!({ "detail": "Given token not valid for any token type" }),
            ));
        }

        Ok(match (request.method, request.path.as_str()) {
            (Method::Get, "/transactions/") => self.list(request),
            (Method::Post, "/transactions/") => self.create(&body),
            (Method::Get, "/categories/") => ApiResponse::json_body(200, &Self::categories()),
            _ => ApiResponse::json_body(404, &json!({ "detail": "Not found." })),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn tracker(server: &Arc<LedgerServer>, storage: &MemoryStorage) -> FinanceTracker {
    let transport: Arc<dyn Transport> = server.clone();
    FinanceTracker::with_parts(transport, Box::new(storage.clone()))
}

fn entry(kind: TransactionType, units: i64, category: i64, day: NaiveDate) -> NewTransaction {
    let when = Utc.from_utc_datetime(&day.and_hms_opt(9, 30, 0).unwrap());
    NewTransaction::new(Amount::from_units(units), kind, category).on(when)
}

/// Signs up and records February and March 2024 activity:
///
/// | day    | type    | amount | category  |
/// |--------|---------|--------|-----------|
/// | Feb 10 | expense | 200    | Food      |
/// | Mar 1  | income  | 3000   | Salary    |
/// | Mar 5  | expense | 450    | Food      |
/// | Mar 12 | expense | 150    | Transport |
async fn populated() -> (Arc<LedgerServer>, MemoryStorage, FinanceTracker) {
    let server = Arc::new(LedgerServer::default());
    let storage = MemoryStorage::new();
    let app = tracker(&server, &storage);

    app.sign_up("alice", "alice@example.com", PASSWORD).await.unwrap();
    for new in [
        entry(TransactionType::Expense, 200, 2, date(2024, 2, 10)),
        entry(TransactionType::Income, 3000, 1, date(2024, 3, 1)),
        entry(TransactionType::Expense, 450, 2, date(2024, 3, 5)),
        entry(TransactionType::Expense, 150, 3, date(2024, 3, 12)),
    ] {
        app.create_transaction(&new).await.unwrap();
    }
    (server, storage, app)
}

// ═══════════════════════════════════════════════════════════════════
// Session lifecycle
// ═══════════════════════════════════════════════════════════════════

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn sign_up_establishes_session() {
        let server = Arc::new(LedgerServer::default());
        let storage = MemoryStorage::new();
        let app = tracker(&server, &storage);
        assert!(!app.is_authenticated());

        let user = app.sign_up("alice", "alice@example.com", PASSWORD).await.unwrap();
        assert_eq!(user.username, "alice");
        assert!(app.is_authenticated());
        assert_eq!(app.current_user().unwrap().email, "alice@example.com");
        assert_eq!(storage.peek(Slot::AccessToken).as_deref(), Some("access-1"));
        assert_eq!(storage.peek(Slot::RefreshToken).as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn wrong_password_leaves_signed_out() {
        let server = Arc::new(LedgerServer::default());
        let storage = MemoryStorage::new();
        let app = tracker(&server, &storage);

        let err = app.sign_in("alice", "nope").await.unwrap_err();
        assert_eq!(err, CoreError::ValidationError("Invalid credentials".into()));
        assert!(!app.is_authenticated());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn session_survives_restart() {
        let (server, storage, app) = populated().await;
        drop(app);

        let restarted = tracker(&server, &storage);
        assert!(restarted.is_authenticated());
        assert_eq!(restarted.current_user().unwrap().username, "alice");
        assert_eq!(restarted.transactions(&Filter::all()).await.len(), 4);
    }

    #[tokio::test]
    async fn sign_out_clears_everything() {
        let (_server, storage, app) = populated().await;
        app.sign_out();

        assert!(!app.is_authenticated());
        assert!(app.current_user().is_none());
        assert!(storage.is_empty());
        assert!(app.transactions(&Filter::all()).await.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════════════════════════════

mod queries {
    use super::*;

    #[tokio::test]
    async fn newest_first() {
        let (_server, _storage, app) = populated().await;
        let all = app.transactions(&Filter::all()).await;
        let days: Vec<NaiveDate> = all.iter().map(|t| t.day()).collect();
        assert_eq!(
            days,
            vec![date(2024, 3, 12), date(2024, 3, 5), date(2024, 3, 1), date(2024, 2, 10)]
        );
    }

    #[tokio::test]
    async fn quick_presets() {
        let (_server, _storage, app) = populated().await;
        let today = date(2024, 3, 15);

        assert_eq!(app.quick(QuickFilter::Expenses, today).await.len(), 3);
        assert_eq!(app.quick(QuickFilter::Income, today).await.len(), 1);
        assert_eq!(app.quick(QuickFilter::ThisMonth, today).await.len(), 3);
        assert_eq!(app.quick(QuickFilter::ThisWeek, today).await.len(), 1);
        assert!(app.quick(QuickFilter::Today, today).await.is_empty());
    }

    #[tokio::test]
    async fn client_narrows_what_the_server_ignores() {
        let (_server, _storage, app) = populated().await;
        let filter = Filter::all()
            .with_category(2)
            .amount_range(Some(Amount::from_units(300)), None);

        let rows = app.transactions(&filter).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, Amount::from_units(450));
    }

    #[tokio::test]
    async fn categories_listed() {
        let (_server, _storage, app) = populated().await;
        let names: Vec<String> = app.categories().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Salary", "Food", "Transport"]);
    }

    #[tokio::test]
    async fn create_rejection_is_validation_error() {
        let (_server, _storage, app) = populated().await;
        let bad = entry(TransactionType::Expense, 10, 99, date(2024, 3, 15));
        let err = app.create_transaction(&bad).await.unwrap_err();
        assert_eq!(err, CoreError::ValidationError("category_id: Invalid pk.".into()));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Metrics
// ═══════════════════════════════════════════════════════════════════

mod metrics {
    use super::*;

    #[tokio::test]
    async fn dashboard() {
        let (_server, _storage, app) = populated().await;
        let summary = app.dashboard(date(2024, 3, 15)).await;

        assert_eq!(summary.as_of, date(2024, 3, 15));
        assert_eq!(summary.month.income, Amount::from_units(3000));
        assert_eq!(summary.month.expense, Amount::from_units(600));
        assert_eq!(summary.month_balance(), Amount::from_units(2400));
        assert_eq!(summary.overall.expense, Amount::from_units(800));

        // 600 against February's 200
        assert_eq!(summary.spending_change.direction, Direction::Up);
        assert_eq!(summary.spending_change.percentage, 200);
        assert!(summary.spending_change.has_comparison);

        // Mar 13, 14, 15
        assert_eq!(summary.streak, 3);
        // 600 / 3000 = 20 %
        assert_eq!(summary.mood, Mood::Excellent);
        assert_eq!(summary.balance_health, BalanceHealth::Percent(80));
    }

    #[tokio::test]
    async fn analytics() {
        let (_server, _storage, app) = populated().await;
        let summary = app.analytics(date(2024, 3, 15)).await;

        let categories: Vec<(String, Amount)> = summary
            .category_spending
            .iter()
            .map(|c| (c.name().to_string(), c.total))
            .collect();
        assert_eq!(
            categories,
            vec![
                ("Food".to_string(), Amount::from_units(650)),
                ("Transport".to_string(), Amount::from_units(150)),
            ]
        );

        let trend: Vec<(&str, i64)> = summary
            .monthly_trend
            .iter()
            .map(|p| (p.label.as_str(), p.amount.cents()))
            .collect();
        assert_eq!(
            trend,
            vec![
                ("Oct", 0),
                ("Nov", 0),
                ("Dec", 0),
                ("Jan", 0),
                ("Feb", 20_000),
                ("Mar", 60_000),
            ]
        );

        assert_eq!(summary.income_vs_expense.income, Amount::from_units(3000));
        assert_eq!(summary.income_vs_expense.expense, Amount::from_units(800));
    }

    #[tokio::test]
    async fn signed_out_dashboard_is_empty() {
        let (_server, _storage, app) = populated().await;
        app.sign_out();
        let summary = app.dashboard(date(2024, 3, 15)).await;

        assert_eq!(summary.overall.income, Amount::ZERO);
        assert_eq!(summary.streak, 0);
        assert_eq!(summary.mood, Mood::Dead);
        assert_eq!(summary.balance_health, BalanceHealth::NoIncome);
        assert!(!summary.spending_change.has_comparison);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Renewal through the facade
// ═══════════════════════════════════════════════════════════════════

mod renewal {
    use super::*;

    #[tokio::test]
    async fn expired_access_is_renewed_transparently() {
        let (server, storage, app) = populated().await;
        let before = storage.peek(Slot::AccessToken);
        server.expire_access();

        assert_eq!(app.transactions(&Filter::all()).await.len(), 4);
        assert_eq!(server.renewals(), 1);
        assert!(app.is_authenticated());
        assert_ne!(storage.peek(Slot::AccessToken), before);
        assert_eq!(storage.peek(Slot::RefreshToken).as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn revoked_session_signs_out() {
        let (server, storage, app) = populated().await;
        server.revoke();

        let new = entry(TransactionType::Income, 10, 1, date(2024, 3, 15));
        let err = app.create_transaction(&new).await.unwrap_err();
        assert!(err.requires_reauthentication(), "{err}");
        assert!(!app.is_authenticated());
        assert!(storage.is_empty());

        // reads after the teardown are empty, not errors
        assert!(app.transactions(&Filter::all()).await.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Settings wiring
// ═══════════════════════════════════════════════════════════════════

mod from_settings {
    use super::*;

    #[tokio::test]
    async fn unreachable_provider_fails_soft() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ClientSettings {
            base_url: "http://127.0.0.1:9/api".into(),
            request_timeout_secs: 1,
            credentials_path: dir.path().join("credentials.json").display().to_string(),
            ..ClientSettings::default()
        };
        let app = FinanceTracker::from_settings(&settings).unwrap();

        assert!(!app.is_authenticated());
        assert!(app.transactions(&Filter::all()).await.is_empty());
        let err = app.sign_in("alice", PASSWORD).await.unwrap_err();
        assert!(matches!(err, CoreError::NetworkUnavailable(_)), "{err}");
    }

    #[tokio::test]
    async fn sealed_credentials_need_the_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.vault");
        let mut sealed = finance_tracker_core::storage::FileStorage::open_sealed_with(
            &path,
            "pw",
            finance_tracker_core::storage::encryption::KdfParams {
                memory_cost: 8,
                time_cost: 1,
                parallelism: 1,
            },
        )
        .unwrap();
        finance_tracker_core::storage::CredentialStorage::write(&mut sealed, Slot::AccessToken, "a")
            .unwrap();

        let plain = ClientSettings {
            credentials_path: path.display().to_string(),
            ..ClientSettings::default()
        };
        let err = FinanceTracker::from_settings(&plain).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(_)));

        let with_passphrase = ClientSettings {
            credentials_passphrase: Some("pw".into()),
            ..plain
        };
        assert!(FinanceTracker::from_settings(&with_passphrase).is_ok());
    }
}
