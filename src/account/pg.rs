//! Postgres implementation of the credential store adapter.
//!
//! Accounts live in a single `accounts` table. The tagged enums map to
//! nullable columns on the way in and are rebuilt (with invariant checks) on
//! the way out. A consumed verification token keeps its column value when the
//! account is marked verified, so the idempotent "already verified" lookup
//! works; rotation overwrites it and an OAuth link nulls it.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::models::{
    Account, AccountUpdate, EmailVerification, IdentitySource, NewAccount, Role,
    VerificationUpdate,
};
use super::store::{AccountStore, InsertOutcome};

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS accounts (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        password_hash TEXT,
        oauth_subject_id TEXT,
        email_verified BOOLEAN NOT NULL DEFAULT FALSE,
        verification_token TEXT,
        verification_expires_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CHECK (password_hash IS NOT NULL OR oauth_subject_id IS NOT NULL)
    );
    CREATE INDEX IF NOT EXISTS accounts_oauth_subject_idx
        ON accounts (oauth_subject_id);
    CREATE INDEX IF NOT EXISTS accounts_verification_token_idx
        ON accounts (verification_token);
";

const ACCOUNT_COLUMNS: &str = "id, email, display_name, role, password_hash, oauth_subject_id, \
     email_verified, verification_token, verification_expires_at, created_at, updated_at";

/// Create the accounts table and indexes if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "CREATE"
    );
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to create accounts schema")?;
    Ok(())
}

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by(&self, column: &str, value: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("failed to lookup account by {column}"))?;
        row.map(|row| account_from_row(&row)).transpose()
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.find_by("email", email).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account by id")?;
        row.map(|row| account_from_row(&row)).transpose()
    }

    async fn find_by_oauth_subject(&self, subject_id: &str) -> Result<Option<Account>> {
        self.find_by("oauth_subject_id", subject_id).await
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Account>> {
        self.find_by("verification_token", token).await
    }

    async fn insert_if_absent(&self, account: NewAccount) -> Result<InsertOutcome> {
        // The unique index on email makes this the one atomic guarantee the
        // adapter offers; a concurrent duplicate surfaces as EmailTaken
        // instead of a second record.
        let (email_verified, verification_token, verification_expires_at) =
            verification_columns(&account.verification);
        let query = format!(
            "INSERT INTO accounts \
                 (id, email, display_name, role, password_hash, oauth_subject_id, \
                  email_verified, verification_token, verification_expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&account.email)
            .bind(&account.display_name)
            .bind(account.role.as_str())
            .bind(account.identity.password_hash())
            .bind(account.identity.oauth_subject())
            .bind(email_verified)
            .bind(verification_token)
            .bind(verification_expires_at)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(InsertOutcome::Created(account_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::EmailTaken),
            Err(err) => Err(err).context("failed to insert account"),
        }
    }

    async fn update(&self, id: Uuid, update: AccountUpdate) -> Result<Account> {
        // Read-merge-write with no concurrency check: last writer wins, as the
        // adapter contract states.
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("account {id} not found"))?;

        let display_name = update.display_name.unwrap_or(current.display_name);
        let identity = update.identity.unwrap_or(current.identity);
        let (email_verified, verification_token, verification_expires_at) =
            match update.verification {
                Some(VerificationUpdate::Rotate { token, expires_at }) => {
                    (false, Some(token), Some(expires_at))
                }
                // Keep the consumed token so a revisited link still matches.
                Some(VerificationUpdate::MarkVerified) => {
                    let (_, token, expires_at) = verification_columns(&current.verification);
                    (true, token.map(str::to_string), expires_at)
                }
                Some(VerificationUpdate::ClearVerified) => (true, None, None),
                None => {
                    let (verified, token, expires_at) =
                        verification_columns(&current.verification);
                    (verified, token.map(str::to_string), expires_at)
                }
            };

        let query = format!(
            "UPDATE accounts \
             SET display_name = $2, password_hash = $3, oauth_subject_id = $4, \
                 email_verified = $5, verification_token = $6, \
                 verification_expires_at = $7, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(&display_name)
            .bind(identity.password_hash())
            .bind(identity.oauth_subject())
            .bind(email_verified)
            .bind(verification_token)
            .bind(verification_expires_at)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to update account")?;
        account_from_row(&row)
    }
}

fn verification_columns(
    verification: &EmailVerification,
) -> (bool, Option<&str>, Option<DateTime<Utc>>) {
    match verification {
        EmailVerification::Pending { token, expires_at } => {
            (false, Some(token.as_str()), Some(*expires_at))
        }
        EmailVerification::Verified => (true, None, None),
    }
}

fn account_from_row(row: &sqlx::postgres::PgRow) -> Result<Account> {
    let role: String = row.try_get("role")?;
    account_from_parts(
        row.try_get("id")?,
        row.try_get("email")?,
        row.try_get("display_name")?,
        &role,
        row.try_get("password_hash")?,
        row.try_get("oauth_subject_id")?,
        row.try_get("email_verified")?,
        row.try_get("verification_token")?,
        row.try_get("verification_expires_at")?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    )
}

/// Rebuild the typed account from raw column values, rejecting rows that
/// violate the model invariants.
#[allow(clippy::too_many_arguments)]
fn account_from_parts(
    id: Uuid,
    email: String,
    display_name: String,
    role: &str,
    password_hash: Option<String>,
    oauth_subject_id: Option<String>,
    email_verified: bool,
    verification_token: Option<String>,
    verification_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Result<Account> {
    let identity = match (password_hash, oauth_subject_id) {
        (Some(password_hash), None) => IdentitySource::Password { password_hash },
        (None, Some(subject_id)) => IdentitySource::OAuth { subject_id },
        (Some(password_hash), Some(subject_id)) => IdentitySource::Linked {
            password_hash,
            subject_id,
        },
        (None, None) => {
            return Err(anyhow!(
                "account {id} has neither a password hash nor an oauth subject"
            ))
        }
    };

    let verification = if email_verified {
        EmailVerification::Verified
    } else {
        match (verification_token, verification_expires_at) {
            (Some(token), Some(expires_at)) => EmailVerification::Pending { token, expires_at },
            _ => {
                return Err(anyhow!(
                    "unverified account {id} is missing its verification token or expiry"
                ))
            }
        }
    };

    Ok(Account {
        id,
        email,
        display_name,
        role: Role::from_db(role)?,
        identity,
        verification,
        created_at,
        updated_at,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
