use std::time::Duration;

use serde::Deserialize;

use crate::args::parsers::parse_duration_value;
use crate::error::ValidationError;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub listen: Option<String>,
    pub path: Option<String>,
    pub concurrency: Option<usize>,
    pub default_rps: Option<u64>,
    pub default_max: Option<u64>,
    pub tick_interval_ms: Option<u64>,
    pub timeout: Option<DurationValue>,
    pub connect_timeout: Option<DurationValue>,
    pub body_limit: Option<usize>,
    pub verbose: Option<bool>,
    pub targets: Option<TargetsConfig>,
    pub signup: Option<SignupConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TargetsConfig {
    pub base_url: Option<String>,
    pub captcha: Option<String>,
    pub nocaptcha: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupConfig {
    pub enabled: Option<bool>,
    pub listen: Option<String>,
    pub secret: Option<String>,
    pub rate_limit: Option<u64>,
    pub rate_window: Option<DurationValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration_value(text),
        }
    }
}
