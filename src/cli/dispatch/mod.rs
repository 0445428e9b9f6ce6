//! Command-line argument dispatch and server initialization.
//!
//! Parses validated CLI arguments and maps them to the appropriate action,
//! such as starting the API server with its full configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        public_base_url: auth_opts.public_base_url,
        frontend_base_url: auth_opts.frontend_base_url,
        session_signing_key: auth_opts.session_signing_key,
        google_client_id: auth_opts.google_client_id,
        google_client_secret: auth_opts.google_client_secret,
        google_redirect_uri: auth_opts.google_redirect_uri,
        email_endpoint: auth_opts.email_endpoint,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn handler_builds_server_action() {
        temp_env::with_vars(
            [
                ("ATTESTA_DSN", Some("postgres://postgres@localhost:5432/attesta")),
                ("ATTESTA_SESSION_KEY", Some("not-a-placeholder")),
                ("ATTESTA_PORT", Some("9090")),
                ("ATTESTA_EMAIL_ENDPOINT", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["attesta"]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 9090);
                    assert!(args.email_endpoint.is_none());
                    assert_eq!(args.frontend_base_url, "http://localhost:3000");
                }
            },
        );
    }
}
