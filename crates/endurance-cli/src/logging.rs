use endurance_core::Config;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ENDURANCE_LOG";

/// Install the stderr subscriber. `ENDURANCE_LOG` wins over the configured
/// filter; stdout stays reserved for command output.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let configured = Config::peek().logging.filter;
        EnvFilter::try_new(&configured).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
