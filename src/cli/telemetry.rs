//! Logging and optional OTLP trace export.
//!
//! Logs always go to stderr. Spans are additionally exported over OTLP/gRPC
//! when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, so a local run needs no
//! collector.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, propagation::TextMapCompositePropagator, trace::TracerProvider as _};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
};
use std::time::Duration;
use tonic::{
    metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;
use url::Url;

const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const ENV_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
const ENV_INSTANCE_ID: &str = "OTEL_SERVICE_INSTANCE_ID";

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Export settings read from the standard `OTEL_*` variables.
#[derive(Debug, PartialEq, Eq)]
struct OtlpConfig {
    endpoint: Url,
    headers: Vec<(String, String)>,
    instance_id: String,
}

impl OtlpConfig {
    /// `None` when no endpoint is configured, i.e. export is off.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let Some(raw) = lookup(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };

        // collectors are usually given as host:port; gRPC over TLS is the safe default
        let raw = raw.trim().trim_end_matches('/');
        let endpoint = if raw.contains("://") {
            Url::parse(raw)
        } else {
            Url::parse(&format!("https://{raw}"))
        }
        .with_context(|| format!("invalid {ENV_ENDPOINT}"))?;

        let headers = lookup(ENV_HEADERS)
            .map(|value| parse_header_list(&value))
            .unwrap_or_default();

        let instance_id = lookup(ENV_INSTANCE_ID).unwrap_or_else(|| Ulid::new().to_string());

        Ok(Some(Self {
            endpoint,
            headers,
            instance_id,
        }))
    }

    fn metadata(&self) -> Result<MetadataMap> {
        let mut metadata = MetadataMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let key = MetadataKey::<Ascii>::from_bytes(name.to_ascii_lowercase().as_bytes())
                .with_context(|| format!("invalid {ENV_HEADERS} name {name}"))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .with_context(|| format!("invalid {ENV_HEADERS} value for {name}"))?;
            metadata.insert(key, value);
        }
        Ok(metadata)
    }

    fn tls(&self) -> Option<ClientTlsConfig> {
        if self.endpoint.scheme() != "https" {
            return None;
        }
        let host = self.endpoint.host_str()?;
        Some(
            ClientTlsConfig::new()
                .domain_name(host.to_string())
                .with_native_roots(),
        )
    }

    fn resource(&self) -> Resource {
        Resource::builder_empty()
            .with_attributes([
                KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                KeyValue::new("service.instance.id", self.instance_id.clone()),
            ])
            .build()
    }
}

/// `name=value` pairs separated by commas; entries without a name are skipped.
fn parse_header_list(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .filter_map(|entry| entry.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn tracer(config: &OtlpConfig) -> Result<Tracer> {
    let mut exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.endpoint.as_str())
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT)
        .with_metadata(config.metadata()?);

    if let Some(tls) = config.tls() {
        exporter = exporter.with_tls_config(tls);
    }

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter.build()?)
        .with_resource(config.resource())
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

fn log_filter(level: Level) -> Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    for directive in ["hyper=error", "reqwest=warn", "opentelemetry_sdk=warn"] {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Install the global subscriber. `None` logs errors only; `RUST_LOG` still
/// overrides per target.
///
/// # Errors
///
/// Returns an error if the OTLP settings are invalid or a subscriber is
/// already installed
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let filter = log_filter(verbosity_level.unwrap_or(Level::ERROR))?;
    let fmt_layer = fmt::layer().with_target(false).pretty();
    let subscriber = Registry::default().with(fmt_layer).with(filter);

    match OtlpConfig::from_lookup(|name| std::env::var(name).ok())? {
        Some(config) => {
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer(&config)?);
            tracing::subscriber::set_global_default(subscriber.with(otel_layer))?;
            debug!("exporting traces to {}", config.endpoint);
        }
        None => tracing::subscriber::set_global_default(subscriber)?,
    }

    Ok(())
}

/// Flush pending spans. Does nothing when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        debug!("tracer provider shutdown: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Option<OtlpConfig>> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        OtlpConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn export_is_off_without_endpoint() -> Result<()> {
        assert_eq!(config(&[])?, None);
        assert_eq!(config(&[(ENV_ENDPOINT, "  ")])?, None);
        Ok(())
    }

    #[test]
    fn bare_endpoint_defaults_to_https() -> Result<()> {
        let config = config(&[(ENV_ENDPOINT, "otel.tld:4317/"), (ENV_INSTANCE_ID, "i-1")])?;
        let config = config.ok_or_else(|| anyhow::anyhow!("export should be on"))?;
        assert_eq!(config.endpoint.as_str(), "https://otel.tld:4317/");
        assert_eq!(config.instance_id, "i-1");
        assert!(config.tls().is_some());
        Ok(())
    }

    #[test]
    fn plain_http_endpoint_has_no_tls() -> Result<()> {
        let config = config(&[(ENV_ENDPOINT, "http://localhost:4317")])?
            .ok_or_else(|| anyhow::anyhow!("export should be on"))?;
        assert!(config.tls().is_none());
        assert!(!config.instance_id.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_endpoint_is_an_error() {
        let err = config(&[(ENV_ENDPOINT, "http://")]).err();
        assert!(err.is_some_and(|e| e.to_string().contains(ENV_ENDPOINT)));
    }

    #[test]
    fn header_list_parsing() {
        assert!(parse_header_list("").is_empty());
        assert_eq!(
            parse_header_list("authorization = Basic dXNlcjpwYXNz== , x-team=auth,broken,=orphan"),
            vec![
                ("authorization".to_string(), "Basic dXNlcjpwYXNz==".to_string()),
                ("x-team".to_string(), "auth".to_string()),
            ]
        );
    }

    #[test]
    fn headers_become_lowercase_metadata() -> Result<()> {
        let config = config(&[
            (ENV_ENDPOINT, "http://localhost:4317"),
            (ENV_HEADERS, "Authorization=Bearer token123,x-scope=tplatform"),
        ])?
        .ok_or_else(|| anyhow::anyhow!("export should be on"))?;

        let metadata = config.metadata()?;
        assert_eq!(metadata.len(), 2);
        assert_eq!(
            metadata.get("authorization").and_then(|v| v.to_str().ok()),
            Some("Bearer token123")
        );
        Ok(())
    }

    #[test]
    fn invalid_header_value_is_an_error() -> Result<()> {
        let config = config(&[
            (ENV_ENDPOINT, "http://localhost:4317"),
            (ENV_HEADERS, "x-note=line\nbreak"),
        ])?
        .ok_or_else(|| anyhow::anyhow!("export should be on"))?;
        assert!(config.metadata().is_err());
        Ok(())
    }

    #[test]
    fn shutdown_without_export_is_noop() {
        shutdown_tracer();
    }
}
