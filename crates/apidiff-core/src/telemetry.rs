//! Log output for the `apidiff` binary.
//!
//! Logs always go to stderr; stdout is reserved for the breakage report.
//! Verbosity comes from `APIDIFF_LOG` (an `EnvFilter` directive string) and
//! falls back to the level chosen on the command line.

use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding log filter directives.
pub const LOG_ENV: &str = "APIDIFF_LOG";

/// Filter from [`LOG_ENV`], or `level` when it is unset or unparsable.
pub fn log_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy()
}

/// Install the process-wide subscriber. Only the first call has an effect.
pub fn init_tracing(json: bool, level: Level) {
    let (plain, json_lines) = if json {
        let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);
        (None, Some(stderr.json()))
    } else {
        let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);
        (Some(stderr), None)
    };

    tracing_subscriber::registry()
        .with(log_filter(level))
        .with(plain)
        .with(json_lines)
        .try_init()
        .ok();
}
