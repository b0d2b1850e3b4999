use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use folio_core::{AdminSession, AppError, AppResult};
use folio_domain::{AttemptRecord, ClientAddress, ConsumeOutcome, RateLimitKey, RateLimitPolicy};

use crate::{AttemptStore, Clock, RateLimitService};

use super::{AdminAuthService, AuthenticationResult, Authenticator, LoginAttempt, LoginOutcome};

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 5, 4, 8, 30, 0)
            .single()
            .unwrap_or_default();
        Self {
            now: Mutex::new(start),
        }
    }

    fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}

struct TestStore {
    clock: Arc<ManualClock>,
    records: Mutex<HashMap<String, AttemptRecord>>,
    unavailable: bool,
}

impl TestStore {
    fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            records: Mutex::new(HashMap::new()),
            unavailable: false,
        }
    }
}

#[async_trait]
impl AttemptStore for TestStore {
    async fn consume(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> AppResult<ConsumeOutcome> {
        if self.unavailable {
            return Err(AppError::StoreUnavailable("connection reset".to_owned()));
        }

        let now = self.clock.now();
        let mut records = self
            .records
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock store state: {error}")))?;
        let record = records
            .entry(policy.storage_key(key))
            .or_insert_with(|| AttemptRecord::new(now));
        Ok(record.consume(policy, now))
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "test"
    }
}

#[derive(Default)]
struct TestAuthenticator {
    valid_password: Option<String>,
    calls: Mutex<Vec<String>>,
    resets: Mutex<Vec<(String, String)>>,
}

impl TestAuthenticator {
    fn accepting(password: &str) -> Self {
        Self {
            valid_password: Some(password.to_owned()),
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Authenticator for TestAuthenticator {
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<AuthenticationResult> {
        self.calls
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock calls: {error}")))?
            .push(email.to_owned());

        if self.valid_password.as_deref() == Some(password) {
            return Ok(AuthenticationResult::Succeeded(AdminSession::new(
                "user-1",
                Some(email.to_owned()),
                "access",
                "refresh",
                Utc::now() + Duration::hours(1),
            )));
        }

        Ok(AuthenticationResult::Failed {
            message: "Invalid login credentials".to_owned(),
        })
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> AppResult<()> {
        self.resets
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock resets: {error}")))?
            .push((email.to_owned(), redirect_to.to_owned()));
        Ok(())
    }

    async fn sign_out(&self, _access_token: &str) -> AppResult<()> {
        Ok(())
    }
}

fn gate(store: Arc<TestStore>, authenticator: Arc<TestAuthenticator>) -> AdminAuthService {
    AdminAuthService::new(
        RateLimitService::new(store, RateLimitPolicy::login()),
        authenticator,
    )
}

fn attempt(client: ClientAddress, email: &str, password: &str) -> LoginAttempt {
    LoginAttempt {
        email: email.to_owned(),
        password: password.to_owned(),
        client,
    }
}

fn from_ip(ip: &str) -> ClientAddress {
    ClientAddress::Forwarded(ip.to_owned())
}

#[tokio::test]
async fn wrong_passwords_exhaust_budget_then_block_until_released() {
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(TestStore::new(clock.clone()));
    let authenticator = Arc::new(TestAuthenticator::accepting("correct"));
    let service = gate(store, authenticator.clone());

    for _ in 0..3 {
        let outcome = service
            .sign_in(attempt(from_ip("1.2.3.4"), "a@b.com", "wrong"))
            .await;
        assert_eq!(
            outcome.ok(),
            Some(LoginOutcome::AuthenticationFailed {
                message: "Invalid login credentials".to_owned(),
            })
        );
        clock.advance(Duration::seconds(3));
    }

    let blocked = service
        .sign_in(attempt(from_ip("1.2.3.4"), "a@b.com", "correct"))
        .await;
    let Ok(LoginOutcome::RateLimitExceeded { retry_after }) = &blocked else {
        panic!("fourth attempt should be rate limited, got {blocked:?}");
    };
    assert_eq!(retry_after.seconds(), 1800);
    assert_eq!(
        LoginOutcome::rate_limit_message(*retry_after),
        "Too many login attempts. Please try again in 30 minutes."
    );
    assert_eq!(authenticator.call_count(), 3);

    clock.advance(Duration::seconds(1801));

    let released = service
        .sign_in(attempt(from_ip("1.2.3.4"), "a@b.com", "correct"))
        .await;
    assert!(matches!(released, Ok(LoginOutcome::Admitted(_))));
    assert_eq!(authenticator.call_count(), 4);
}

#[tokio::test]
async fn successful_sign_in_still_consumes_a_point() {
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(TestStore::new(clock));
    let authenticator = Arc::new(TestAuthenticator::accepting("correct"));
    let service = gate(store, authenticator.clone());

    for _ in 0..3 {
        let outcome = service
            .sign_in(attempt(from_ip("5.6.7.8"), "admin@example.com", "correct"))
            .await;
        assert!(matches!(outcome, Ok(LoginOutcome::Admitted(_))));
    }

    let outcome = service
        .sign_in(attempt(from_ip("5.6.7.8"), "admin@example.com", "correct"))
        .await;
    assert!(matches!(
        outcome,
        Ok(LoginOutcome::RateLimitExceeded { .. })
    ));
    assert_eq!(authenticator.call_count(), 3);
}

#[tokio::test]
async fn clients_without_forwarding_headers_share_one_bucket() {
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(TestStore::new(clock));
    let authenticator = Arc::new(TestAuthenticator::default());
    let service = gate(store.clone(), authenticator);

    for _ in 0..3 {
        let client = ClientAddress::from_forwarding_headers(None, None);
        let outcome = service
            .sign_in(attempt(client, "a@b.com", "wrong"))
            .await;
        assert!(matches!(
            outcome,
            Ok(LoginOutcome::AuthenticationFailed { .. })
        ));
    }

    let other_client = ClientAddress::from_forwarding_headers(None, Some(""));
    let outcome = service
        .sign_in(attempt(other_client, "a@b.com", "wrong"))
        .await;
    assert!(matches!(
        outcome,
        Ok(LoginOutcome::RateLimitExceeded { .. })
    ));

    let keys: Vec<String> = store
        .records
        .lock()
        .map(|records| records.keys().cloned().collect())
        .unwrap_or_default();
    assert_eq!(keys, vec!["login_attempt:unknown:a@b.com".to_owned()]);
}

#[tokio::test]
async fn exhausted_key_does_not_affect_other_keys() {
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(TestStore::new(clock));
    let authenticator = Arc::new(TestAuthenticator::default());
    let service = gate(store, authenticator);

    for _ in 0..4 {
        let _ = service
            .sign_in(attempt(from_ip("1.2.3.4"), "a@b.com", "wrong"))
            .await;
    }

    let other_email = service
        .sign_in(attempt(from_ip("1.2.3.4"), "c@d.com", "wrong"))
        .await;
    let other_ip = service
        .sign_in(attempt(from_ip("4.3.2.1"), "a@b.com", "wrong"))
        .await;

    assert!(matches!(
        other_email,
        Ok(LoginOutcome::AuthenticationFailed { .. })
    ));
    assert!(matches!(
        other_ip,
        Ok(LoginOutcome::AuthenticationFailed { .. })
    ));
}

#[tokio::test]
async fn unreachable_store_denies_without_calling_authenticator() {
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(TestStore {
        unavailable: true,
        ..TestStore::new(clock)
    });
    let authenticator = Arc::new(TestAuthenticator::accepting("correct"));
    let service = gate(store, authenticator.clone());

    let outcome = service
        .sign_in(attempt(from_ip("1.2.3.4"), "a@b.com", "correct"))
        .await;

    assert!(matches!(outcome, Err(AppError::StoreUnavailable(_))));
    assert_eq!(authenticator.call_count(), 0);
}

#[tokio::test]
async fn password_reset_requires_email() {
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(TestStore::new(clock));
    let authenticator = Arc::new(TestAuthenticator::default());
    let service = gate(store, authenticator.clone());

    let rejected = service
        .request_password_reset("   ", "https://example.com/admin/update-password")
        .await;
    assert!(matches!(rejected, Err(AppError::Validation(_))));

    let accepted = service
        .request_password_reset(" admin@example.com ", "https://example.com/admin/update-password")
        .await;
    assert!(accepted.is_ok());

    let resets = authenticator
        .resets
        .lock()
        .map(|resets| resets.clone())
        .unwrap_or_default();
    assert_eq!(
        resets,
        vec![(
            "admin@example.com".to_owned(),
            "https://example.com/admin/update-password".to_owned()
        )]
    );
}

#[test]
fn login_attempt_debug_hides_credentials() {
    let rendered = format!("{:?}", attempt(from_ip("1.2.3.4"), "a@b.com", "hunter2"));
    assert!(rendered.contains("1.2.3.4"));
    assert!(!rendered.contains("hunter2"));
    assert!(!rendered.contains("a@b.com"));
}
