use crate::config::Config;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::env;
use tracing_stackdriver::CloudTraceConfiguration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,weterest_services=debug";

pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    if config.is_local() {
        tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
            )
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
    } else {
        // JSON logging with Stackdriver, plus Cloud Trace ids when a project is set
        let cloud_trace = cloud_trace_config(env::var("GOOGLE_CLOUD_PROJECT").ok());

        // W3C trace-context propagation for the request span parent
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

        let mut stackdriver_layer = tracing_stackdriver::layer();
        if let Some(configuration) = cloud_trace {
            stackdriver_layer = stackdriver_layer.with_cloud_trace(configuration);
        }

        let otel_layer = tracing_opentelemetry::layer();

        tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
            )
            .with(otel_layer)
            .with(stackdriver_layer)
            .try_init()?;
    }

    Ok(())
}

/// Cloud Trace correlation for the given project, if one is configured.
fn cloud_trace_config(project_id: Option<String>) -> Option<CloudTraceConfiguration> {
    project_id
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
        .map(|project_id| CloudTraceConfiguration { project_id })
}
