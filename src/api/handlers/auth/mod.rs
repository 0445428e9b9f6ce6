//! Account lifecycle endpoints: register, login, Google login, email
//! verification, resend, and the authenticated profile read.

pub mod google;
pub mod login;
pub mod me;
pub mod register;
pub mod state;
pub mod types;
pub mod verification;

pub use state::{AuthConfig, AuthState};

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for handler tests: in-memory store, recording
    //! mailer, and a scripted OAuth exchanger.

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use secrecy::SecretString;

    use crate::account::google::{IdentityExchanger, OAuthIdentity};
    use crate::account::session::SessionIssuer;
    use crate::account::{AccountService, AuthError, MemoryStore};
    use crate::api::email::EmailSender;

    use super::state::AuthState;

    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMailer {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
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
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), verify_url.to_string()));
            Ok(())
        }
    }

    pub struct ScriptedExchanger {
        pub identity: OAuthIdentity,
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

    pub fn auth_state() -> (Arc<AuthState>, Arc<MemoryStore>, Arc<RecordingMailer>) {
        let store = Arc::new(MemoryStore::new());
        let mailer = RecordingMailer::new();
        let exchanger = Arc::new(ScriptedExchanger {
            identity: OAuthIdentity {
                subject_id: "google-sub-1".to_string(),
                email: "oauth@example.com".to_string(),
                display_name: "OAuth User".to_string(),
            },
        });
        let sessions = SessionIssuer::new(&SecretString::from("test-signing-key-for-unit-tests".to_string()))
            .expect("test signing key");
        let service = Arc::new(AccountService::new(
            store.clone(),
            mailer.clone(),
            exchanger,
            sessions,
            "https://api.attesta.test".to_string(),
        ));
        let state = Arc::new(AuthState::new(
            service,
            "https://app.attesta.test".to_string(),
        ));
        (state, store, mailer)
    }
}
