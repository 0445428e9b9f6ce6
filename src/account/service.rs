//! Account lifecycle controller: the state machine behind registration,
//! login, OAuth login, verification, resend, and profile reads.
//!
//! Each operation touches at most one account record. The store adapter is
//! the sole mutator and offers no cross-record transactions; the conditional
//! insert on email is the only atomic guarantee. Verification emails are
//! dispatched after the state change commits, so a failed send is surfaced
//! and never rolls the account back.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::email::EmailSender;

use super::error::AuthError;
use super::google::IdentityExchanger;
use super::models::{
    normalize_email, valid_email, Account, AccountUpdate, AccountView, EmailVerification,
    IdentitySource, NewAccount, Role, VerificationUpdate,
};
use super::password::{hash_password, password_policy_violation, verify_password};
use super::session::SessionIssuer;
use super::store::{AccountStore, InsertOutcome};
use super::token;

/// Outcome of a registration. The account state is committed even when the
/// verification email could not be dispatched; `delivery_error` carries that
/// failure for the caller to surface.
#[derive(Debug)]
pub struct Registered {
    pub email: String,
    pub delivery_error: Option<String>,
}

/// Session token plus sanitized account view returned by the login flows.
#[derive(Debug)]
pub struct Authenticated {
    pub token: String,
    pub user: AccountView,
}

/// Four-way outcome of visiting a verification link. Explicit variants, not
/// errors, because each one gets distinct user-facing behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
    Expired { email: String },
    NotFound,
}

pub struct AccountService {
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn EmailSender>,
    oauth: Arc<dyn IdentityExchanger>,
    sessions: SessionIssuer,
    /// Public base URL of this service; verification links point back here.
    public_base_url: String,
}

impl AccountService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn EmailSender>,
        oauth: Arc<dyn IdentityExchanger>,
        sessions: SessionIssuer,
        public_base_url: String,
    ) -> Self {
        Self {
            store,
            mailer,
            oauth,
            sessions,
            public_base_url,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Register a password account, or rotate the credentials of an existing
    /// unverified one. Both branches answer "check your email" so the
    /// response does not reveal which one ran.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Registered, AuthError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::Validation("Invalid email address".to_string()));
        }
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AuthError::Validation("Missing name".to_string()));
        }
        // Policy runs before the lookup so a weak password gets the same
        // answer whether or not the address is known.
        if let Some(rule) = password_policy_violation(password) {
            return Err(AuthError::WeakPassword(rule));
        }

        match self.store.find_by_email(&email).await? {
            Some(account) if account.verification.is_verified() => {
                Err(AuthError::EmailAlreadyRegistered)
            }
            Some(account) => {
                // Re-registration while unverified rotates the token and
                // password on the existing record; never a duplicate.
                let (token, expires_at) = token::issue()?;
                let password_hash = hash_password(password)?;
                let account = self
                    .store
                    .update(
                        account.id,
                        AccountUpdate {
                            display_name: Some(display_name.to_string()),
                            identity: Some(account.identity.clone().with_password_hash(password_hash)),
                            verification: Some(VerificationUpdate::Rotate {
                                token: token.clone(),
                                expires_at,
                            }),
                        },
                    )
                    .await?;
                let delivery_error = self.dispatch_verification(&account, &token).await;
                Ok(Registered {
                    email,
                    delivery_error,
                })
            }
            None => {
                let (token, expires_at) = token::issue()?;
                let password_hash = hash_password(password)?;
                let new_account = NewAccount {
                    email: email.clone(),
                    display_name: display_name.to_string(),
                    role: Role::User,
                    identity: IdentitySource::Password { password_hash },
                    verification: EmailVerification::Pending {
                        token: token.clone(),
                        expires_at,
                    },
                };
                match self.store.insert_if_absent(new_account).await? {
                    InsertOutcome::Created(account) => {
                        info!(account_id = %account.id, "account registered");
                        let delivery_error = self.dispatch_verification(&account, &token).await;
                        Ok(Registered {
                            email,
                            delivery_error,
                        })
                    }
                    // Lost the race to a concurrent registration.
                    InsertOutcome::EmailTaken => Err(AuthError::EmailAlreadyRegistered),
                }
            }
        }
    }

    /// Password login. Unknown email, OAuth-only account, and a bad password
    /// all answer `InvalidCredentials`; the verification gate comes after the
    /// password check so a wrong password learns nothing about the address.
    pub async fn login(&self, email: &str, password: &str) -> Result<Authenticated, AuthError> {
        let email = normalize_email(email);
        let account = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = account
            .identity
            .password_hash()
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if !account.verification.is_verified() {
            return Err(AuthError::EmailNotVerified);
        }
        self.authenticated(account)
    }

    /// Login with a Google authorization code. Known subject logs straight
    /// in; a known email gets the OAuth identity linked (provider proof
    /// supersedes the pending password-flow verification); otherwise a new
    /// verified, passwordless account is created.
    pub async fn oauth_login(&self, code: &str) -> Result<Authenticated, AuthError> {
        let identity = self.oauth.exchange_code(code).await?;

        if let Some(account) = self
            .store
            .find_by_oauth_subject(&identity.subject_id)
            .await?
        {
            return self.authenticated(account);
        }

        let email = normalize_email(&identity.email);
        if let Some(account) = self.store.find_by_email(&email).await? {
            let account = self.link_oauth(account, identity.subject_id).await?;
            return self.authenticated(account);
        }

        let new_account = NewAccount {
            email: email.clone(),
            display_name: identity.display_name,
            role: Role::User,
            identity: IdentitySource::OAuth {
                subject_id: identity.subject_id.clone(),
            },
            verification: EmailVerification::Verified,
        };
        match self.store.insert_if_absent(new_account).await? {
            InsertOutcome::Created(account) => {
                info!(account_id = %account.id, "oauth account created");
                self.authenticated(account)
            }
            InsertOutcome::EmailTaken => {
                // A concurrent registration won the insert; fall back to the
                // link path against the record that beat us.
                let account = self
                    .store
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| AuthError::Store(anyhow::anyhow!(
                        "account for {email} vanished between conflict and lookup"
                    )))?;
                let account = self.link_oauth(account, identity.subject_id).await?;
                self.authenticated(account)
            }
        }
    }

    /// Resolve a verification link into one of four outcomes.
    pub async fn verify_email(&self, token: &str) -> Result<VerifyOutcome, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(VerifyOutcome::NotFound);
        }
        let Some(account) = self.store.find_by_verification_token(token).await? else {
            return Ok(VerifyOutcome::NotFound);
        };
        match &account.verification {
            // Revisiting a consumed link is a success, not an error.
            EmailVerification::Verified => Ok(VerifyOutcome::AlreadyVerified),
            EmailVerification::Pending { expires_at, .. } if Utc::now() > *expires_at => {
                // Expiry is enforced by comparison; the stored row is left alone.
                Ok(VerifyOutcome::Expired {
                    email: account.email.clone(),
                })
            }
            EmailVerification::Pending { .. } => {
                self.store
                    .update(
                        account.id,
                        AccountUpdate {
                            verification: Some(VerificationUpdate::MarkVerified),
                            ..AccountUpdate::default()
                        },
                    )
                    .await?;
                info!(account_id = %account.id, "email verified");
                Ok(VerifyOutcome::Verified)
            }
        }
    }

    /// Rotate and resend the verification email for an unverified account.
    /// The caller's response is identical whether the address exists, does
    /// not exist, or is already verified; that uniformity is the
    /// enumeration guard.
    pub async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let Some(account) = self.store.find_by_email(&email).await? else {
            return Ok(());
        };
        if account.verification.is_verified() {
            return Ok(());
        }

        let (token, expires_at) = token::issue()?;
        let account = self
            .store
            .update(
                account.id,
                AccountUpdate {
                    verification: Some(VerificationUpdate::Rotate {
                        token: token.clone(),
                        expires_at,
                    }),
                    ..AccountUpdate::default()
                },
            )
            .await?;
        // A failed send stays invisible to the caller here; the link can be
        // requested again.
        let _ = self.dispatch_verification(&account, &token).await;
        Ok(())
    }

    /// Sanitized profile read for an authenticated session.
    pub async fn me(&self, account_id: Uuid) -> Result<Option<AccountView>, AuthError> {
        Ok(self
            .store
            .find_by_id(account_id)
            .await?
            .map(|account| account.view()))
    }

    async fn link_oauth(
        &self,
        account: Account,
        subject_id: String,
    ) -> Result<Account, AuthError> {
        info!(account_id = %account.id, "linking oauth identity");
        let account = self
            .store
            .update(
                account.id,
                AccountUpdate {
                    identity: Some(account.identity.clone().link_oauth(subject_id)),
                    verification: Some(VerificationUpdate::ClearVerified),
                    ..AccountUpdate::default()
                },
            )
            .await?;
        Ok(account)
    }

    fn authenticated(&self, account: Account) -> Result<Authenticated, AuthError> {
        let token = self
            .sessions
            .issue(account.id, &account.email, account.role)
            .map_err(AuthError::Store)?;
        Ok(Authenticated {
            token,
            user: account.view(),
        })
    }

    /// Dispatch the verification email after the state change has committed.
    /// Returns the failure text, if any, for the caller to surface.
    async fn dispatch_verification(&self, account: &Account, token: &str) -> Option<String> {
        let verify_url = build_verify_url(&self.public_base_url, token);
        match self
            .mailer
            .send_verification(&account.email, &account.display_name, &verify_url)
            .await
        {
            Ok(()) => None,
            Err(err) => {
                warn!(email = %account.email, "verification email dispatch failed: {err:#}");
                Some(err.to_string())
            }
        }
    }
}

/// Build the link included in outbound verification emails.
#[must_use]
pub fn build_verify_url(public_base_url: &str, token: &str) -> String {
    let base = public_base_url.trim_end_matches('/');
    format!("{base}/auth/verify-email?token={token}")
}

#[cfg(test)]
mod tests {
    use super::build_verify_url;

    #[test]
    fn build_verify_url_trims_trailing_slash() {
        let url = build_verify_url("https://api.attesta.dev/", "token");
        assert_eq!(url, "https://api.attesta.dev/auth/verify-email?token=token");
    }
}
