use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Checked in order; the first one set wins.
const FILTER_ENV_VARS: [&str; 2] = ["LOADWIRE_LOG", "RUST_LOG"];

/// Per-request client chatter from hyper/reqwest stays at `warn` unless asked for.
const DEFAULT_FILTER: &str = "warn,loadwire=info";
const VERBOSE_FILTER: &str = "info,loadwire=debug";

pub fn init_logging(verbose: bool) {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(build_filter(env_directives().as_deref(), verbose))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}

fn env_directives() -> Option<String> {
    FILTER_ENV_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .filter(|value| !value.trim().is_empty())
}

/// Explicit directives win; invalid ones fall back to the defaults.
fn build_filter(directives: Option<&str>, verbose: bool) -> EnvFilter {
    let default = if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };
    directives
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}
