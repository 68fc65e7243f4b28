use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::info;

use crate::args::ServerArgs;
use crate::channel::{ChannelServer, ServerSettings};
use crate::error::{AppError, AppResult};
use crate::shutdown::{setup_signal_shutdown_handler, shutdown_channel};
use crate::signup::{SignupServer, SignupSettings};

/// Parses CLI/config, then serves until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error when arguments or config are invalid, or a listener cannot be bound.
pub fn run() -> AppResult<()> {
    let (mut args, matches) = parse_args()?;
    let loaded = crate::config::load_config(args.config.as_deref())?;
    if let Some(loaded) = loaded.as_ref() {
        crate::config::apply_config(&mut args, &matches, &loaded.file)?;
    }

    crate::logger::init_logging(args.verbose);
    if let Some(loaded) = loaded {
        info!("Loaded config from {}", loaded.path.display());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args))
}

fn parse_args() -> AppResult<(ServerArgs, ArgMatches)> {
    let matches = ServerArgs::command().get_matches();
    let args = ServerArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}

async fn run_async(args: ServerArgs) -> AppResult<()> {
    let settings = ServerSettings::from_args(&args)?;
    let (shutdown_tx, _) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let signup_handle = if args.serve_targets {
        let signup = SignupServer::bind(SignupSettings::from_args(&args)).await?;
        Some(tokio::spawn(signup.serve(shutdown_tx.subscribe())))
    } else {
        None
    };

    let channel = ChannelServer::bind(settings).await?;
    let result = channel.serve(shutdown_tx.subscribe()).await;

    drop(shutdown_tx.send(()));
    if let Some(handle) = signup_handle {
        handle.await.map_err(AppError::from)??;
    }
    signal_handle.abort();
    info!("Shutdown complete");
    result
}
