//! # TplatForm (Email Confirmation & App Handoff)
//!
//! `tplatform` serves the callback page behind the links in TplatForm's
//! confirmation emails (signup, password recovery, invitations and magic links).
//!
//! ## Flow
//!
//! 1. The email link lands on `GET /confirm?token=…&type=…`.
//! 2. The one-time token is forwarded to the hosted identity provider
//!    (a `GoTrue` compatible auth backend) through the injected
//!    [`tplatform::provider::IdentityProvider`].
//! 3. The answer is mapped onto one of four states (`loading`, `success`,
//!    `error`, `expired`) and rendered as a page.
//! 4. On success the page offers a deep link back into the native app, with a
//!    fallback notice when the app does not open within three seconds.
//!
//! The service keeps no state between requests: every request is one page load
//! and owns exactly one verification attempt. Retrying means loading the page
//! again with the same query string.

pub mod cli;
pub mod tplatform;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
