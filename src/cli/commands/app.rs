use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use url::Url;

pub const ARG_DEEP_LINK_BASE: &str = "deep-link-base";
pub const ARG_APP_NAME: &str = "app-name";
pub const ARG_ANALYTICS_URL: &str = "analytics-url";

#[derive(Debug, Clone)]
pub struct Options {
    pub deep_link_base: Url,
    pub app_name: String,
    pub analytics_url: Option<Url>,
}

impl Options {
    /// Parse companion app and analytics arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the deep link base is missing or a URL is invalid.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let deep_link_base = get_non_empty(ARG_DEEP_LINK_BASE)
            .with_context(|| format!("missing required argument: --{ARG_DEEP_LINK_BASE}"))?;
        let deep_link_base = Url::parse(&deep_link_base)
            .with_context(|| format!("invalid --{ARG_DEEP_LINK_BASE}"))?;

        let app_name =
            get_non_empty(ARG_APP_NAME).unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        let analytics_url = get_non_empty(ARG_ANALYTICS_URL)
            .map(|value| Url::parse(&value))
            .transpose()
            .with_context(|| format!("invalid --{ARG_ANALYTICS_URL}"))?;

        Ok(Self {
            deep_link_base,
            app_name,
            analytics_url,
        })
    }
}

const DEFAULT_APP_NAME: &str = "TplatForm";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DEEP_LINK_BASE)
                .long(ARG_DEEP_LINK_BASE)
                .help("Deep link prefix of the native app, e.g. tplatform://app/")
                .long_help(
                    "Deep link prefix of the native app, e.g. tplatform://app/\n\nThe handoff target is this prefix followed by `login`.",
                )
                .env("TPLATFORM_DEEP_LINK_BASE")
                .required(true),
        )
        .arg(
            Arg::new(ARG_APP_NAME)
                .long(ARG_APP_NAME)
                .help("Product name shown on the confirmation page")
                .default_value(DEFAULT_APP_NAME)
                .env("TPLATFORM_APP_NAME"),
        )
        .arg(
            Arg::new(ARG_ANALYTICS_URL)
                .long(ARG_ANALYTICS_URL)
                .help("Analytics collector URL; events are only logged when unset")
                .env("TPLATFORM_ANALYTICS_URL"),
        )
}
