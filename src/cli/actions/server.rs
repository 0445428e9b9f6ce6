use crate::api;
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub public_base_url: String,
    pub frontend_base_url: String,
    pub session_signing_key: SecretString,
    pub google_client_id: String,
    pub google_client_secret: SecretString,
    pub google_redirect_uri: String,
    pub email_endpoint: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the signing key is a placeholder, the database is
/// unreachable, or the listener fails to bind.
pub async fn execute(args: Args) -> Result<()> {
    debug!("server args: {:?}", args);

    let config = api::handlers::auth::AuthConfig::new(
        args.public_base_url,
        args.frontend_base_url,
        args.session_signing_key,
        args.google_client_id,
        args.google_client_secret,
        args.google_redirect_uri,
    )
    .with_email_endpoint(args.email_endpoint);

    api::new(args.port, args.dsn, config).await
}
