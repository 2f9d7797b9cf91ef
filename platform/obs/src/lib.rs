//! Tracing setup shared by every binary in the workspace.

use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{self as sdk, Resource};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "info,tower_http=warn,sqlx=warn";

#[derive(Clone, Debug)]
pub struct ObsConfig {
    pub service_name: &'static str,
    pub env_filter: Option<String>,
    pub otlp_endpoint: Option<String>,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            service_name: "hr-server",
            env_filter: None,
            otlp_endpoint: None,
        }
    }
}

impl ObsConfig {
    /// Filter from `RUST_LOG`, exporter endpoint from `OTLP_ENDPOINT`.
    pub fn from_env(service_name: &'static str) -> Self {
        Self {
            service_name,
            env_filter: std::env::var("RUST_LOG").ok(),
            otlp_endpoint: std::env::var("OTLP_ENDPOINT").ok(),
        }
    }

    fn filter(&self) -> String {
        self.env_filter
            .clone()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

/// Install the fmt subscriber, plus an OTLP span exporter when an endpoint is configured.
/// Repeated calls are no-ops.
pub fn init_tracing(config: ObsConfig) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(config.filter())?;
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if let Some(endpoint) = config.otlp_endpoint.as_deref() {
        let exporter = SpanExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(endpoint)
            .build()?;

        let resource = Resource::builder()
            .with_service_name(config.service_name)
            .build();

        let provider = sdk::trace::SdkTracerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(exporter)
            .build();
        let tracer = provider.tracer(config.service_name);

        registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()?;
    } else {
        registry.try_init()?;
    }

    INIT.set(()).map_err(|_| anyhow!("tracing already initialized"))?;
    tracing::debug!(service = config.service_name, "tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filter_falls_back_to_default() {
        let config = ObsConfig {
            env_filter: Some("  ".into()),
            ..ObsConfig::default()
        };
        assert_eq!(config.filter(), DEFAULT_FILTER);
    }

    #[test]
    fn explicit_filter_is_kept() {
        let config = ObsConfig {
            env_filter: Some("debug".into()),
            ..ObsConfig::default()
        };
        assert_eq!(config.filter(), "debug");
    }
}
