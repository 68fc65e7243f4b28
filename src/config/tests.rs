use super::{apply_config, find_default_config, load_config, load_config_file, types::ConfigFile};
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use std::time::Duration;
use tempfile::tempdir;

use crate::args::ServerArgs;

fn parse_cli(argv: &[&str]) -> Result<(ServerArgs, ArgMatches), String> {
    let matches = ServerArgs::command()
        .try_get_matches_from(argv)
        .map_err(|err| format!("parse failed: {}", err))?;
    let args =
        ServerArgs::from_arg_matches(&matches).map_err(|err| format!("from matches: {}", err))?;
    Ok((args, matches))
}

fn write_config(name: &str, content: &str) -> Result<(tempfile::TempDir, ConfigFile), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join(name);
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;
    let config = load_config_file(&path).map_err(|err| err.to_string())?;
    Ok((dir, config))
}

#[test]
fn parse_toml_config_with_sections() -> Result<(), String> {
    let (_dir, config) = write_config(
        "loadwire.toml",
        r#"
listen = "127.0.0.1:9100"
concurrency = 8
default_rps = 300
timeout = "2s"

[targets]
base_url = "http://targets.internal:8000"
nocaptcha = "http://other.internal/signup"

[signup]
enabled = true
secret = "s3cret"
rate_window = 60
"#,
    )?;

    if config.listen.as_deref() != Some("127.0.0.1:9100") {
        return Err("Unexpected listen".to_owned());
    }
    if config.concurrency != Some(8) {
        return Err("Unexpected concurrency".to_owned());
    }
    let targets = config.targets.as_ref().ok_or("Expected targets")?;
    if targets.base_url.as_deref() != Some("http://targets.internal:8000") {
        return Err("Unexpected base_url".to_owned());
    }
    let signup = config.signup.as_ref().ok_or("Expected signup")?;
    if signup.enabled != Some(true) {
        return Err("Expected signup enabled".to_owned());
    }
    Ok(())
}

#[test]
fn parse_json_config() -> Result<(), String> {
    let (_dir, config) = write_config(
        "loadwire.json",
        r#"{ "path": "/load", "default_max": 50, "targets": { "captcha": "http://c/signup" } }"#,
    )?;
    if config.path.as_deref() != Some("/load") {
        return Err("Unexpected path".to_owned());
    }
    if config.default_max != Some(50) {
        return Err("Unexpected default_max".to_owned());
    }
    Ok(())
}

#[test]
fn unsupported_extension_is_rejected() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("loadwire.yaml");
    std::fs::write(&path, "listen: x").map_err(|err| format!("write failed: {}", err))?;
    if load_config_file(&path).is_ok() {
        return Err("Expected yaml config to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn config_fills_values_not_given_on_cli() -> Result<(), String> {
    let (_dir, config) = write_config(
        "loadwire.toml",
        r#"
listen = "127.0.0.1:9100"
concurrency = 8
connect_timeout = "250ms"

[targets]
captcha = "http://captcha.internal/signup"

[signup]
secret = "from-config"
rate_limit = 5
"#,
    )?;
    let (mut args, matches) = parse_cli(&["loadwire", "--concurrency", "2"])?;
    let env_secret = args.captcha_secret.clone();
    apply_config(&mut args, &matches, &config).map_err(|err| err.to_string())?;

    if args.listen != "127.0.0.1:9100" {
        return Err("Expected listen from config".to_owned());
    }
    if args.concurrency.get() != 2 {
        return Err("Expected CLI concurrency to win".to_owned());
    }
    if args.connect_timeout != Duration::from_millis(250) {
        return Err("Expected connect_timeout from config".to_owned());
    }
    if args.captcha_url.as_deref() != Some("http://captcha.internal/signup") {
        return Err("Expected captcha url from config".to_owned());
    }
    if args.captcha_rate_limit.get() != 5 {
        return Err("Expected rate limit from config".to_owned());
    }
    let expected_secret = env_secret.unwrap_or_else(|| "from-config".to_owned());
    if args.captcha_secret.as_deref() != Some(expected_secret.as_str()) {
        return Err("Unexpected captcha secret".to_owned());
    }
    Ok(())
}

#[test]
fn zero_values_are_config_errors() -> Result<(), String> {
    let (_dir, config) = write_config("loadwire.toml", "default_rps = 0\n")?;
    let (mut args, matches) = parse_cli(&["loadwire"])?;
    if apply_config(&mut args, &matches, &config).is_ok() {
        return Err("Expected zero default_rps to fail".to_owned());
    }
    Ok(())
}

#[test]
fn default_config_prefers_toml_over_json() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    if find_default_config(dir.path()).is_some() {
        return Err("Expected no default config in empty dir".to_owned());
    }
    std::fs::write(dir.path().join("loadwire.json"), "{}")
        .map_err(|err| format!("write failed: {}", err))?;
    let found = find_default_config(dir.path()).ok_or_else(|| "Expected json config".to_owned())?;
    if !found.ends_with("loadwire.json") {
        return Err(format!("Unexpected config {}", found.display()));
    }
    std::fs::write(dir.path().join("loadwire.toml"), "").map_err(|err| format!("write failed: {}", err))?;
    let found = find_default_config(dir.path()).ok_or_else(|| "Expected toml config".to_owned())?;
    if !found.ends_with("loadwire.toml") {
        return Err(format!("Unexpected config {}", found.display()));
    }
    Ok(())
}

#[test]
fn explicit_config_path_must_exist() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let missing = dir.path().join("absent.toml");
    let missing = missing.to_str().ok_or_else(|| "Non-UTF-8 temp path".to_owned())?;
    if load_config(Some(missing)).is_ok() {
        return Err("Expected missing config to fail".to_owned());
    }
    Ok(())
}
