//! Credential store adapter: narrow lookups and last-writer-wins mutations.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{
    Account, AccountUpdate, EmailVerification, NewAccount, VerificationUpdate,
};

/// Result of the conditional insert keyed on the normalized email.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Account),
    EmailTaken,
}

/// Narrow persistence interface for account records.
///
/// Lookups return `Ok(None)` on absence, never an error. Mutations are
/// last-writer-wins with no optimistic-concurrency check; the one atomic
/// guarantee is `insert_if_absent` on the email key.
///
/// `find_by_verification_token` matches the most recently issued token,
/// including one already consumed by a successful verification, so that
/// revisiting a used link can be reported as "already verified". A rotation
/// or an OAuth link stops the old token from matching.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;
    async fn find_by_oauth_subject(&self, subject_id: &str) -> Result<Option<Account>>;
    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Account>>;
    async fn insert_if_absent(&self, account: NewAccount) -> Result<InsertOutcome>;
    async fn update(&self, id: Uuid, update: AccountUpdate) -> Result<Account>;
}

#[derive(Default)]
struct MemoryInner {
    accounts: HashMap<Uuid, Account>,
    /// Token value to account id, kept after consumption until rotated or cleared.
    tokens: HashMap<String, Uuid>,
}

/// In-memory store for tests and local development without Postgres.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts; used by tests asserting uniqueness.
    pub async fn account_count(&self) -> usize {
        self.inner.lock().await.accounts.len()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .accounts
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner.accounts.get(&id).cloned())
    }

    async fn find_by_oauth_subject(&self, subject_id: &str) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .accounts
            .values()
            .find(|account| account.identity.oauth_subject() == Some(subject_id))
            .cloned())
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .get(token)
            .and_then(|id| inner.accounts.get(id))
            .cloned())
    }

    async fn insert_if_absent(&self, account: NewAccount) -> Result<InsertOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.accounts.values().any(|existing| existing.email == account.email) {
            return Ok(InsertOutcome::EmailTaken);
        }

        let now = Utc::now();
        let record = Account {
            id: Uuid::new_v4(),
            email: account.email,
            display_name: account.display_name,
            role: account.role,
            identity: account.identity,
            verification: account.verification,
            created_at: now,
            updated_at: now,
        };
        if let EmailVerification::Pending { token, .. } = &record.verification {
            inner.tokens.insert(token.clone(), record.id);
        }
        inner.accounts.insert(record.id, record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn update(&self, id: Uuid, update: AccountUpdate) -> Result<Account> {
        let mut inner = self.inner.lock().await;
        let mut record = inner
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("account {id} not found"))?;

        if let Some(display_name) = update.display_name {
            record.display_name = display_name;
        }
        if let Some(identity) = update.identity {
            record.identity = identity;
        }
        match update.verification {
            Some(VerificationUpdate::Rotate { token, expires_at }) => {
                inner.tokens.retain(|_, owner| *owner != id);
                inner.tokens.insert(token.clone(), id);
                record.verification = EmailVerification::Pending { token, expires_at };
            }
            Some(VerificationUpdate::MarkVerified) => {
                // Consumed token stays in the lookup map for idempotent re-visits.
                record.verification = EmailVerification::Verified;
            }
            Some(VerificationUpdate::ClearVerified) => {
                inner.tokens.retain(|_, owner| *owner != id);
                record.verification = EmailVerification::Verified;
            }
            None => {}
        }
        record.updated_at = Utc::now();
        inner.accounts.insert(id, record.clone());
        Ok(record)
    }
}
