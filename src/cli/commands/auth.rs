use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub fn with_args(command: Command) -> Command {
    let command = with_url_args(command);
    let command = with_session_args(command);
    let command = with_google_args(command);
    with_email_args(command)
}

fn with_url_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("public-base-url")
                .long("public-base-url")
                .help("Public base URL of this service, used in verification links")
                .env("ATTESTA_PUBLIC_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL used for verification result redirects and CORS")
                .env("ATTESTA_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
}

fn with_session_args(command: Command) -> Command {
    command.arg(
        Arg::new("session-signing-key")
            .long("session-signing-key")
            .help("HMAC key for signing session tokens; placeholder values abort startup")
            .env("ATTESTA_SESSION_KEY")
            .required(true),
    )
}

fn with_google_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("google-client-id")
                .long("google-client-id")
                .help("Google OAuth client id")
                .env("ATTESTA_GOOGLE_CLIENT_ID")
                .default_value(""),
        )
        .arg(
            Arg::new("google-client-secret")
                .long("google-client-secret")
                .help("Google OAuth client secret")
                .env("ATTESTA_GOOGLE_CLIENT_SECRET")
                .default_value(""),
        )
        .arg(
            Arg::new("google-redirect-uri")
                .long("google-redirect-uri")
                .help("Redirect URI registered with the Google OAuth client")
                .env("ATTESTA_GOOGLE_REDIRECT_URI")
                .default_value("http://localhost:3000/auth/callback"),
        )
}

fn with_email_args(command: Command) -> Command {
    command.arg(
        Arg::new("email-endpoint")
            .long("email-endpoint")
            .help("HTTP endpoint for outbound email delivery; verification links are logged when unset")
            .env("ATTESTA_EMAIL_ENDPOINT"),
    )
}

pub struct Options {
    pub public_base_url: String,
    pub frontend_base_url: String,
    pub session_signing_key: SecretString,
    pub google_client_id: String,
    pub google_client_secret: SecretString,
    pub google_redirect_uri: String,
    pub email_endpoint: Option<String>,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let session_signing_key = matches
            .get_one::<String>("session-signing-key")
            .cloned()
            .context("missing required argument: --session-signing-key")?;

        Ok(Self {
            public_base_url: required(matches, "public-base-url")?,
            frontend_base_url: required(matches, "frontend-base-url")?,
            session_signing_key: SecretString::from(session_signing_key),
            google_client_id: required(matches, "google-client-id")?,
            google_client_secret: SecretString::from(required(
                matches,
                "google-client-secret",
            )?),
            google_redirect_uri: required(matches, "google-redirect-uri")?,
            email_endpoint: matches.get_one::<String>("email-endpoint").cloned(),
        })
    }
}

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}
