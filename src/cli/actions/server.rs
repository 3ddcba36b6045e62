use crate::{
    cli::telemetry,
    tplatform::{
        self,
        analytics::{AnalyticsSink, HttpAnalytics, LogAnalytics},
        confirmation::ConfirmationFlow,
        handoff::CompanionApp,
        provider::GoTrue,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub supabase_url: Url,
    pub supabase_anon_key: SecretString,
    pub deep_link_base: Url,
    pub app_name: String,
    pub analytics_url: Option<Url>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the identity provider client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let provider = GoTrue::new(&args.supabase_url, args.supabase_anon_key)
        .context("Could not build identity provider client")?;

    let analytics: Arc<dyn AnalyticsSink> = match args.analytics_url {
        Some(url) => {
            Arc::new(HttpAnalytics::new(url).context("Could not build analytics client")?)
        }
        None => Arc::new(LogAnalytics),
    };

    let flow = Arc::new(ConfirmationFlow::new(Arc::new(provider), analytics));
    let app = Arc::new(CompanionApp::new(args.app_name, args.deep_link_base));

    let result = tplatform::new(args.port, flow, app).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("supabase_url", args.supabase_url.to_string()),
        ("deep_link_base", args.deep_link_base.to_string()),
        ("app_name", args.app_name.clone()),
        (
            "analytics_url",
            args.analytics_url
                .as_ref()
                .map_or_else(|| "log".to_string(), ToString::to_string),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
