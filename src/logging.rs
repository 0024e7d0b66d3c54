use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding an `EnvFilter` directive, e.g. `gitread=trace`.
pub const LOG_ENV_VAR: &str = "GITREAD_LOG";

/// Install the stderr logger.
///
/// `verbosity` raises the default level (0 = warn, 1 = debug, 2+ = trace);
/// `GITREAD_LOG` still overrides it per target.
pub fn setup_logger(verbosity: u8) {
    let default_level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let fmt = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .compact();

    // a second call (tests driving several commands) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(fmt)
        .with(env_filter)
        .try_init();
}
