//! Account entity and its tagged state variants.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Capability tag carried into session claims. Assigned at creation and never
/// mutated by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse the persisted textual value into a typed role.
    pub fn from_db(value: &str) -> anyhow::Result<Self> {
        match value {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(anyhow::anyhow!("invalid account role value: {value}")),
        }
    }
}

/// Proven identity sources attached to an account.
///
/// Every account carries at least one source; the enum makes a record with
/// neither a password hash nor an OAuth subject unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    Password {
        password_hash: String,
    },
    OAuth {
        subject_id: String,
    },
    Linked {
        password_hash: String,
        subject_id: String,
    },
}

impl IdentitySource {
    #[must_use]
    pub fn password_hash(&self) -> Option<&str> {
        match self {
            Self::Password { password_hash } | Self::Linked { password_hash, .. } => {
                Some(password_hash)
            }
            Self::OAuth { .. } => None,
        }
    }

    #[must_use]
    pub fn oauth_subject(&self) -> Option<&str> {
        match self {
            Self::OAuth { subject_id } | Self::Linked { subject_id, .. } => Some(subject_id),
            Self::Password { .. } => None,
        }
    }

    /// Attach an OAuth subject, preserving an existing password hash.
    #[must_use]
    pub fn link_oauth(self, subject_id: String) -> Self {
        match self {
            Self::Password { password_hash } | Self::Linked { password_hash, .. } => Self::Linked {
                password_hash,
                subject_id,
            },
            Self::OAuth { .. } => Self::OAuth { subject_id },
        }
    }

    /// Replace the password hash, preserving an existing OAuth link.
    #[must_use]
    pub fn with_password_hash(self, password_hash: String) -> Self {
        match self {
            Self::Password { .. } => Self::Password { password_hash },
            Self::OAuth { subject_id } | Self::Linked { subject_id, .. } => Self::Linked {
                password_hash,
                subject_id,
            },
        }
    }
}

/// Email ownership state. `Pending` carries the only live verification token;
/// a verified account has no pending token by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailVerification {
    Pending {
        token: String,
        expires_at: DateTime<Utc>,
    },
    Verified,
}

impl EmailVerification {
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// The persisted account record. Timestamps are maintained by the store
/// adapter, not by callers.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub identity: IdentitySource,
    pub verification: EmailVerification,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Sanitized client view: never the password hash, never the raw token.
    #[must_use]
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id.to_string(),
            email: self.email.clone(),
            name: self.display_name.clone(),
            role: self.role,
            email_verified: self.verification.is_verified(),
        }
    }
}

/// Subset of account fields safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(rename = "emailVerified")]
    pub email_verified: bool,
}

/// Fields for a new account; id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub identity: IdentitySource,
    pub verification: EmailVerification,
}

/// How an update changes the verification state.
#[derive(Debug, Clone)]
pub enum VerificationUpdate {
    /// Back to pending with a fresh token; the previous token stops matching.
    Rotate {
        token: String,
        expires_at: DateTime<Utc>,
    },
    /// Mark verified but keep the consumed token findable, so revisiting the
    /// same link reports "already verified" instead of an error.
    MarkVerified,
    /// Verified through OAuth proof; the pending token is cleared outright.
    ClearVerified,
}

/// Partial update applied last-writer-wins; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub display_name: Option<String>,
    pub identity: Option<IdentitySource>,
    pub verification: Option<VerificationUpdate>,
}

/// Normalize an email for lookup and uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}
