use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::parsers::parse_channel_path;
use crate::args::{PositiveU64, PositiveUsize, ServerArgs};
use crate::error::{AppError, AppResult, ConfigError};

use super::types::{ConfigFile, DurationValue, SignupConfig, TargetsConfig};

/// Applies configuration values to CLI arguments. Values given on the command
/// line always win.
///
/// # Errors
///
/// Returns an error when a config value is out of range or malformed.
pub fn apply_config(
    args: &mut ServerArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "listen")
        && let Some(listen) = config.listen.clone()
    {
        args.listen = listen;
    }

    if !is_cli(matches, "path")
        && let Some(path) = config.path.as_deref()
    {
        args.path = parse_channel_path(path)?;
    }

    if !is_cli(matches, "concurrency")
        && let Some(concurrency) = config.concurrency
    {
        args.concurrency = ensure_positive_usize(concurrency, "concurrency")?;
    }

    if !is_cli(matches, "default_rps")
        && let Some(rps) = config.default_rps
    {
        args.default_rps = ensure_positive_u64(rps, "default_rps")?;
    }

    if !is_cli(matches, "default_max")
        && let Some(max) = config.default_max
    {
        args.default_max = ensure_positive_u64(max, "default_max")?;
    }

    if !is_cli(matches, "tick_interval")
        && let Some(tick) = config.tick_interval_ms
    {
        args.tick_interval = ensure_positive_u64(tick, "tick_interval_ms")?;
    }

    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.request_timeout = to_duration(timeout, "timeout")?;
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = to_duration(timeout, "connect_timeout")?;
    }

    if !is_cli(matches, "body_limit")
        && let Some(limit) = config.body_limit
    {
        args.body_limit = ensure_positive_usize(limit, "body_limit")?;
    }

    if !is_cli(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    if let Some(targets) = config.targets.as_ref() {
        apply_targets(args, matches, targets);
    }

    if let Some(signup) = config.signup.as_ref() {
        apply_signup(args, matches, signup)?;
    }

    Ok(())
}

fn apply_targets(args: &mut ServerArgs, matches: &ArgMatches, targets: &TargetsConfig) {
    if !is_cli(matches, "target_base_url")
        && let Some(base_url) = targets.base_url.clone()
    {
        args.target_base_url = base_url;
    }

    if !is_cli(matches, "captcha_url")
        && let Some(url) = targets.captcha.clone()
    {
        args.captcha_url = Some(url);
    }

    if !is_cli(matches, "nocaptcha_url")
        && let Some(url) = targets.nocaptcha.clone()
    {
        args.nocaptcha_url = Some(url);
    }
}

fn apply_signup(
    args: &mut ServerArgs,
    matches: &ArgMatches,
    signup: &SignupConfig,
) -> AppResult<()> {
    if !is_cli(matches, "serve_targets")
        && let Some(enabled) = signup.enabled
    {
        args.serve_targets = enabled;
    }

    if !is_cli(matches, "targets_listen")
        && let Some(listen) = signup.listen.clone()
    {
        args.targets_listen = listen;
    }

    // The environment variable counts as an explicit value too.
    if args.captcha_secret.is_none()
        && let Some(secret) = signup.secret.clone()
    {
        args.captcha_secret = Some(secret);
    }

    if !is_cli(matches, "captcha_rate_limit")
        && let Some(limit) = signup.rate_limit
    {
        args.captcha_rate_limit = ensure_positive_u64(limit, "signup.rate_limit")?;
    }

    if !is_cli(matches, "captcha_rate_window")
        && let Some(window) = signup.rate_window.as_ref()
    {
        args.captcha_rate_window = to_duration(window, "signup.rate_window")?;
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_u64(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn to_duration(value: &DurationValue, field: &str) -> AppResult<std::time::Duration> {
    value.to_duration().map_err(|err| {
        AppError::config(ConfigError::InvalidDuration {
            field: field.to_owned(),
            source: err,
        })
    })
}
