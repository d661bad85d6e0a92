use anyhow::Result;
use tracing::error;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, EnvFilter, Layer};

use crate::config::ProviderConfig;

/// `RUST_LOG` wins; otherwise the level Terraform was asked for through
/// `TF_LOG`, defaulting to info.
pub fn get_env_filter() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = tf_log_level(std::env::var("TF_LOG").ok().as_deref());
    EnvFilter::default().add_directive(level.into())
}

/// `TF_LOG` also accepts values such as `JSON` that are not levels.
fn tf_log_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::INFO)
}

// stdout belongs to the plugin protocol, logs go to stderr.
pub fn get_log_layer<S>(config: &ProviderConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    S: tracing::Subscriber,
{
    if config.structured_logging() {
        return Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_writer(std::io::stderr),
        );
    }

    Box::new(
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr),
    )
}

/// Installs the global subscriber once per process. Configuring the provider
/// again keeps the first subscriber.
pub fn setup_tracing(config: &ProviderConfig) -> Result<()> {
    let subscriber =
        tracing_subscriber::registry().with(get_log_layer(config).with_filter(get_env_filter()));

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        error!("provider logging was already set up, continuing: {:?}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tf_log_level() {
        assert_eq!(tf_log_level(Some("DEBUG")), LevelFilter::DEBUG);
        assert_eq!(tf_log_level(Some("trace")), LevelFilter::TRACE);
        assert_eq!(tf_log_level(Some("JSON")), LevelFilter::INFO);
        assert_eq!(tf_log_level(None), LevelFilter::INFO);
    }
}
