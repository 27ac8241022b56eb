use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const QUIET_TARGETS: [&str; 3] = ["async_ssh2_lite=warn", "tokio=warn", "runtime=warn"];
const FALLBACK_LEVEL: &str = "debug";

/// Logs go to stdout. `RUST_LOG` wins over `default_level` when set.
pub fn init_logging(default_level: &str) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, rejected) = build_filter(rust_log.as_deref(), default_level);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .init();

    if let Some(rejected) = rejected {
        warn!("{}", rejected);
    }
}

/// Returns the filter plus a message for every directive that had to be
/// ignored, so it can be logged once a subscriber is installed.
fn build_filter(rust_log: Option<&str>, default_level: &str) -> (EnvFilter, Option<String>) {
    let mut rejected = Vec::new();

    let from_env = match rust_log {
        Some(directives) => match EnvFilter::try_new(directives) {
            Ok(filter) => Some(filter),
            Err(err) => {
                rejected.push(format!("Ignoring RUST_LOG={:?}: {}", directives, err));
                None
            }
        },
        None => None,
    };

    let mut filter = match from_env {
        Some(filter) => filter,
        None => match EnvFilter::try_new(default_level) {
            Ok(filter) => filter,
            Err(err) => {
                rejected.push(format!(
                    "Invalid log level {:?}: {}. Falling back to {}",
                    default_level, err, FALLBACK_LEVEL
                ));
                EnvFilter::new(FALLBACK_LEVEL)
            }
        },
    };

    for directive in QUIET_TARGETS {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if rejected.is_empty() {
        (filter, None)
    } else {
        (filter, Some(rejected.join(". ")))
    }
}
