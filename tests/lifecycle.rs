//! End-to-end lifecycle scenarios against the in-memory store: registration,
//! token rotation, verification, expiry, login gates, and OAuth linking.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::SecretString;

use attesta::account::google::{IdentityExchanger, OAuthIdentity};
use attesta::account::models::{AccountUpdate, VerificationUpdate};
use attesta::account::session::SessionIssuer;
use attesta::account::{
    AccountService, AccountStore, AuthError, MemoryStore, VerifyOutcome,
};
use attesta::api::email::EmailSender;

const PASSWORD: &str = "Str0ng!pass";
const PUBLIC_BASE_URL: &str = "https://api.attesta.test";

struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    fail: Mutex<bool>,
}

impl RecordingMailer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
        })
    }

    fn last_token(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let (_, url) = sent.last().expect("at least one email sent");
        url.split("token=").nth(1).expect("token query").to_string()
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send_verification(
        &self,
        to: &str,
        _display_name: &str,
        verify_url: &str,
    ) -> anyhow::Result<()> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("delivery endpoint unreachable");
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), verify_url.to_string()));
        Ok(())
    }
}

struct ScriptedExchanger {
    identity: OAuthIdentity,
}

#[async_trait]
impl IdentityExchanger for ScriptedExchanger {
    async fn exchange_code(&self, code: &str) -> Result<OAuthIdentity, AuthError> {
        if code == "good-code" {
            Ok(self.identity.clone())
        } else {
            Err(AuthError::OAuthExchange("unknown code".to_string()))
        }
    }
}

struct Harness {
    service: AccountService,
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
}

fn harness_with_identity(identity: OAuthIdentity) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let mailer = RecordingMailer::new();
    let sessions = SessionIssuer::new(&SecretString::from("lifecycle-test-signing-key".to_string()))
        .expect("test signing key");
    let service = AccountService::new(
        store.clone(),
        mailer.clone(),
        Arc::new(ScriptedExchanger { identity }),
        sessions,
        PUBLIC_BASE_URL.to_string(),
    );
    Harness {
        service,
        store,
        mailer,
    }
}

fn harness() -> Harness {
    harness_with_identity(OAuthIdentity {
        subject_id: "google-sub-1".to_string(),
        email: "alice@example.com".to_string(),
        display_name: "Alice G".to_string(),
    })
}

#[tokio::test]
async fn register_creates_single_unverified_account() -> anyhow::Result<()> {
    let h = harness();
    let registered = h
        .service
        .register("Alice@Example.com ", PASSWORD, "Alice")
        .await?;
    assert_eq!(registered.email, "alice@example.com");
    assert!(registered.delivery_error.is_none());
    assert_eq!(h.store.account_count().await, 1);

    let account = h
        .store
        .find_by_email("alice@example.com")
        .await?
        .expect("account exists");
    assert!(!account.verification.is_verified());

    // The emailed link points at this service with the stored token.
    let sent = h.mailer.sent.lock().unwrap();
    assert!(sent[0]
        .1
        .starts_with("https://api.attesta.test/auth/verify-email?token="));
    Ok(())
}

#[tokio::test]
async fn reregister_rotates_token_and_keeps_one_account() -> anyhow::Result<()> {
    let h = harness();
    h.service.register("alice@example.com", PASSWORD, "Alice").await?;
    let first_token = h.mailer.last_token();

    h.service
        .register("alice@example.com", "N3w!password", "Alice A.")
        .await?;
    let second_token = h.mailer.last_token();

    assert_ne!(first_token, second_token);
    assert_eq!(h.store.account_count().await, 1);

    // The rotated-out token no longer verifies.
    assert_eq!(
        h.service.verify_email(&first_token).await?,
        VerifyOutcome::NotFound
    );
    assert_eq!(
        h.service.verify_email(&second_token).await?,
        VerifyOutcome::Verified
    );

    // The new password is the live credential.
    assert!(h.service.login("alice@example.com", PASSWORD).await.is_err());
    assert!(h
        .service
        .login("alice@example.com", "N3w!password")
        .await
        .is_ok());
    Ok(())
}

#[tokio::test]
async fn reregister_verified_account_conflicts() -> anyhow::Result<()> {
    let h = harness();
    h.service.register("alice@example.com", PASSWORD, "Alice").await?;
    let token = h.mailer.last_token();
    h.service.verify_email(&token).await?;

    let result = h
        .service
        .register("alice@example.com", PASSWORD, "Alice")
        .await;
    assert!(matches!(result, Err(AuthError::EmailAlreadyRegistered)));
    Ok(())
}

#[tokio::test]
async fn verify_twice_reports_already_verified() -> anyhow::Result<()> {
    let h = harness();
    h.service.register("alice@example.com", PASSWORD, "Alice").await?;
    let token = h.mailer.last_token();

    assert_eq!(h.service.verify_email(&token).await?, VerifyOutcome::Verified);
    assert_eq!(
        h.service.verify_email(&token).await?,
        VerifyOutcome::AlreadyVerified
    );
    Ok(())
}

#[tokio::test]
async fn expired_token_reports_expired_with_email() -> anyhow::Result<()> {
    let h = harness();
    h.service.register("alice@example.com", PASSWORD, "Alice").await?;
    let token = h.mailer.last_token();

    // Backdate the stored expiry instead of waiting out the clock.
    let account = h
        .store
        .find_by_email("alice@example.com")
        .await?
        .expect("account exists");
    h.store
        .update(
            account.id,
            AccountUpdate {
                verification: Some(VerificationUpdate::Rotate {
                    token: token.clone(),
                    expires_at: Utc::now() - Duration::hours(1),
                }),
                ..AccountUpdate::default()
            },
        )
        .await?;

    assert_eq!(
        h.service.verify_email(&token).await?,
        VerifyOutcome::Expired {
            email: "alice@example.com".to_string()
        }
    );

    // Expired is not consumed; the account stays unverified.
    let account = h
        .store
        .find_by_email("alice@example.com")
        .await?
        .expect("account exists");
    assert!(!account.verification.is_verified());
    Ok(())
}

#[tokio::test]
async fn login_gates_in_order() -> anyhow::Result<()> {
    let h = harness();
    h.service.register("alice@example.com", PASSWORD, "Alice").await?;

    // Wrong password on an unverified account: credentials error, not the
    // verification gate.
    assert!(matches!(
        h.service.login("alice@example.com", "Wr0ng!pass!").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        h.service.login("alice@example.com", PASSWORD).await,
        Err(AuthError::EmailNotVerified)
    ));
    assert!(matches!(
        h.service.login("nobody@example.com", PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    ));

    let token = h.mailer.last_token();
    h.service.verify_email(&token).await?;
    let authenticated = h.service.login("alice@example.com", PASSWORD).await?;
    assert_eq!(authenticated.user.email, "alice@example.com");
    assert!(authenticated.user.email_verified);

    // The issued session resolves back to the account.
    let claims = h.service.sessions().verify(&authenticated.token)?;
    let id = claims.account_id()?;
    assert!(h.service.me(id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn oauth_login_links_existing_password_account() -> anyhow::Result<()> {
    let h = harness();
    h.service.register("alice@example.com", PASSWORD, "Alice").await?;
    let pending_token = h.mailer.last_token();

    let authenticated = h.service.oauth_login("good-code").await?;
    assert_eq!(authenticated.user.email, "alice@example.com");
    assert!(authenticated.user.email_verified);
    assert_eq!(h.store.account_count().await, 1);

    // Provider proof verified the address; the pending link is dead.
    assert_eq!(
        h.service.verify_email(&pending_token).await?,
        VerifyOutcome::NotFound
    );

    // The linked account still holds its password credential.
    assert!(h.service.login("alice@example.com", PASSWORD).await.is_ok());

    // Display name from registration survives the link.
    let account = h
        .store
        .find_by_email("alice@example.com")
        .await?
        .expect("account exists");
    assert_eq!(account.display_name, "Alice");
    Ok(())
}

#[tokio::test]
async fn oauth_login_twice_reuses_account() -> anyhow::Result<()> {
    let h = harness();
    h.service.oauth_login("good-code").await?;
    h.service.oauth_login("good-code").await?;
    assert_eq!(h.store.account_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn oauth_only_account_cannot_password_login() -> anyhow::Result<()> {
    let h = harness();
    h.service.oauth_login("good-code").await?;
    assert!(matches!(
        h.service.login("alice@example.com", PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    ));
    Ok(())
}

#[tokio::test]
async fn resend_is_uniform_and_rotates() -> anyhow::Result<()> {
    let h = harness();
    h.service.register("alice@example.com", PASSWORD, "Alice").await?;
    let first_token = h.mailer.last_token();

    // Unknown address: same Ok, nothing sent.
    let before = h.mailer.sent_count();
    h.service.resend_verification("nobody@example.com").await?;
    assert_eq!(h.mailer.sent_count(), before);

    // Unverified address: rotated token goes out.
    h.service.resend_verification("alice@example.com").await?;
    assert_eq!(h.mailer.sent_count(), before + 1);
    let second_token = h.mailer.last_token();
    assert_ne!(first_token, second_token);
    assert_eq!(
        h.service.verify_email(&first_token).await?,
        VerifyOutcome::NotFound
    );

    // Verified address: same Ok, nothing sent.
    h.service.verify_email(&second_token).await?;
    let before = h.mailer.sent_count();
    h.service.resend_verification("alice@example.com").await?;
    assert_eq!(h.mailer.sent_count(), before);
    Ok(())
}

#[tokio::test]
async fn register_survives_delivery_failure() -> anyhow::Result<()> {
    let h = harness();
    h.mailer.set_fail(true);
    let registered = h
        .service
        .register("alice@example.com", PASSWORD, "Alice")
        .await?;
    assert!(registered.delivery_error.is_some());
    assert_eq!(h.store.account_count().await, 1);

    // The account committed; a later resend can still deliver the link.
    h.mailer.set_fail(false);
    h.service.resend_verification("alice@example.com").await?;
    let token = h.mailer.last_token();
    assert_eq!(h.service.verify_email(&token).await?, VerifyOutcome::Verified);
    Ok(())
}

#[tokio::test]
async fn weak_passwords_rejected_before_account_lookup() -> anyhow::Result<()> {
    let h = harness();
    for password in ["short", "alllowercase1!", "ALLUPPERCASE1!", "NoDigits!!", "NoSymbol11"] {
        let result = h
            .service
            .register("alice@example.com", password, "Alice")
            .await;
        assert!(
            matches!(result, Err(AuthError::WeakPassword(_))),
            "password {password:?} should be rejected"
        );
    }
    assert_eq!(h.store.account_count().await, 0);
    Ok(())
}
