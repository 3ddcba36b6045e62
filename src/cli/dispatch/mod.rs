//! Map parsed command-line arguments to the action to execute.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, app, provider};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let provider_opts = provider::Options::parse(matches)?;
    let app_opts = app::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        supabase_url: provider_opts.url,
        supabase_anon_key: provider_opts.anon_key,
        deep_link_base: app_opts.deep_link_base,
        app_name: app_opts.app_name,
        analytics_url: app_opts.analytics_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn builds_server_action() {
        temp_env::with_vars(
            [
                ("TPLATFORM_PORT", Some("3000")),
                ("TPLATFORM_SUPABASE_URL", Some("https://xyz.supabase.co")),
                ("TPLATFORM_SUPABASE_ANON_KEY", Some("anon-key")),
                ("TPLATFORM_DEEP_LINK_BASE", Some("tplatform://app/")),
                ("TPLATFORM_APP_NAME", None),
                ("TPLATFORM_ANALYTICS_URL", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["tplatform"]);
                let result = handler(&matches);
                assert!(result.is_ok());
                if let Ok(Action::Server(args)) = result {
                    assert_eq!(args.port, 3000);
                    assert_eq!(args.supabase_url.as_str(), "https://xyz.supabase.co/");
                    assert_eq!(args.supabase_anon_key.expose_secret(), "anon-key");
                    assert_eq!(args.deep_link_base.as_str(), "tplatform://app/");
                    assert_eq!(args.app_name, "TplatForm");
                    assert!(args.analytics_url.is_none());
                }
            },
        );
    }

    #[test]
    fn invalid_supabase_url() {
        temp_env::with_vars(
            [
                ("TPLATFORM_SUPABASE_URL", Some("xyz.supabase.co")),
                ("TPLATFORM_SUPABASE_ANON_KEY", Some("anon-key")),
                ("TPLATFORM_DEEP_LINK_BASE", Some("tplatform://app/")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["tplatform"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("invalid --supabase-url"));
                }
            },
        );
    }

    #[test]
    fn empty_anon_key() {
        temp_env::with_vars(
            [
                ("TPLATFORM_SUPABASE_URL", Some("https://xyz.supabase.co")),
                ("TPLATFORM_SUPABASE_ANON_KEY", Some("  ")),
                ("TPLATFORM_DEEP_LINK_BASE", Some("tplatform://app/")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["tplatform"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(
                        err.to_string()
                            .contains("missing required argument: --supabase-anon-key")
                    );
                }
            },
        );
    }
}
