//! # Attesta (Account Identity & Email Verification)
//!
//! `attesta` is the account identity service: it creates user accounts, proves
//! ownership of an email address before granting access, issues signed session
//! credentials, and reconciles password-based and Google OAuth identities into
//! a single account record.
//!
//! ## Account Lifecycle
//!
//! An account is created either by password registration (unverified until the
//! emailed link is visited) or by Google OAuth login (verified immediately,
//! since the provider already proved the address). A password account becomes
//! verified exactly once, through the verification link or through a later
//! OAuth link of the same address.
//!
//! - **Email Normalization:** Emails are trimmed and lowercased before any
//!   lookup; there is exactly one account per normalized address.
//! - **Verification Tokens:** Opaque, 24-hour tokens sent by email; expiry is
//!   enforced by comparison, never by active deletion.
//! - **Sessions:** Signed bearer tokens carrying account id, email, and role,
//!   valid for seven days.
//!
//! Accounts are never deleted by this service.

pub mod account;
pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
