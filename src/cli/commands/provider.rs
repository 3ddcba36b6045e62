use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_SUPABASE_URL: &str = "supabase-url";
pub const ARG_SUPABASE_ANON_KEY: &str = "supabase-anon-key";

#[derive(Debug)]
pub struct Options {
    pub url: Url,
    pub anon_key: SecretString,
}

impl Options {
    /// Parse identity provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if an argument is missing, empty or not a valid URL.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let url = match matches.get_one::<String>(ARG_SUPABASE_URL) {
            Some(value) if !value.trim().is_empty() => value.trim(),
            _ => anyhow::bail!("missing required argument: --{ARG_SUPABASE_URL}"),
        };
        let url = Url::parse(url).with_context(|| format!("invalid --{ARG_SUPABASE_URL}"))?;

        let anon_key = match matches.get_one::<String>(ARG_SUPABASE_ANON_KEY) {
            Some(value) if !value.trim().is_empty() => SecretString::from(value.trim().to_string()),
            _ => anyhow::bail!("missing required argument: --{ARG_SUPABASE_ANON_KEY}"),
        };

        Ok(Self { url, anon_key })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SUPABASE_URL)
                .long(ARG_SUPABASE_URL)
                .help("Base URL of the Supabase project, e.g. https://xyz.supabase.co")
                .env("TPLATFORM_SUPABASE_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SUPABASE_ANON_KEY)
                .long(ARG_SUPABASE_ANON_KEY)
                .help("Public anon key of the Supabase project")
                .long_help(
                    "Public anon key of the Supabase project.\n\nSent as the `apikey` header and bearer token when verifying confirmation tokens.",
                )
                .env("TPLATFORM_SUPABASE_ANON_KEY")
                .hide_env_values(true)
                .required(true),
        )
}
