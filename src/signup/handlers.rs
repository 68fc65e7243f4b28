use std::net::IpAddr;
use std::num::FpCategory;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::captcha::CaptchaIssuer;
use super::http::HttpRequest;
use super::limiter::FixedWindowLimiter;

pub(crate) const WRONG_CAPTCHA: &str = "Wrong Captcha";
pub(crate) const INVALID_DATA: &str = "Incomplete or Invalid data";
pub(crate) const NOT_SIGNED_IN: &str = "User not signed in";
pub(crate) const NOT_FOUND: &str = "Not found";
pub(crate) const TOO_MANY_REQUESTS: &str = "Too many requests";

const CAPTCHA_PREFIX: &str = "/captcha";

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum ReplyBody {
    Captcha { data: String, hash: String },
    Accepted(SignupAccepted),
    Error { error: &'static str },
}

#[derive(Debug, Serialize)]
pub(crate) struct SignupAccepted {
    auth: bool,
    name: Value,
    roll: Value,
    phone: Value,
}

#[derive(Debug)]
pub(crate) struct Reply {
    pub(crate) status: u16,
    pub(crate) body: ReplyBody,
}

impl Reply {
    const fn error(status: u16, error: &'static str) -> Self {
        Self {
            status,
            body: ReplyBody::Error { error },
        }
    }
}

/// Fields are kept as raw JSON so a numeric `roll` or `phone` still counts as present.
#[derive(Debug, Default, Deserialize)]
struct SignupForm {
    name: Option<Value>,
    roll: Option<Value>,
    phone: Option<Value>,
    captcha: Option<Value>,
    hash: Option<Value>,
}

/// Routes signup target requests. Nothing is persisted between requests.
#[derive(Debug)]
pub(crate) struct SignupHandler {
    issuer: CaptchaIssuer,
    limiter: FixedWindowLimiter,
}

impl SignupHandler {
    pub(crate) const fn new(issuer: CaptchaIssuer, limiter: FixedWindowLimiter) -> Self {
        Self { issuer, limiter }
    }

    pub(crate) fn handle(&self, request: &HttpRequest, client: IpAddr) -> Reply {
        let path = request
            .path
            .split_once('?')
            .map_or(request.path.as_str(), |(path, _)| path);

        if is_captcha_scope(path) && !self.limiter.check(client, Instant::now()) {
            return Reply::error(429, TOO_MANY_REQUESTS);
        }

        match (request.method.as_str(), path) {
            ("GET", "/captcha") => {
                let captcha = self.issuer.issue();
                Reply {
                    status: 200,
                    body: ReplyBody::Captcha {
                        data: captcha.svg,
                        hash: captcha.hash,
                    },
                }
            }
            ("POST", "/captcha/signup") => self.captcha_signup(&request.body),
            ("POST", "/nocaptcha/signup") => nocaptcha_signup(&request.body),
            ("GET", "/me") => Reply::error(404, NOT_SIGNED_IN),
            _ => Reply::error(404, NOT_FOUND),
        }
    }

    fn captcha_signup(&self, body: &[u8]) -> Reply {
        let form = parse_form(body);
        let (Some(name), Some(roll), Some(phone), Some(captcha), Some(hash)) = (
            present(form.name),
            present(form.roll),
            present(form.phone),
            present(form.captcha),
            present(form.hash),
        ) else {
            return Reply::error(403, INVALID_DATA);
        };
        let verified = match &hash {
            Value::String(hash) => self.issuer.verify(&value_text(&captcha), hash),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                false
            }
        };
        if !verified {
            return Reply::error(403, WRONG_CAPTCHA);
        }
        accepted(name, roll, phone)
    }
}

fn nocaptcha_signup(body: &[u8]) -> Reply {
    let form = parse_form(body);
    let (Some(name), Some(roll), Some(phone)) =
        (present(form.name), present(form.roll), present(form.phone))
    else {
        return Reply::error(403, INVALID_DATA);
    };
    accepted(name, roll, phone)
}

const fn accepted(name: Value, roll: Value, phone: Value) -> Reply {
    Reply {
        status: 200,
        body: ReplyBody::Accepted(SignupAccepted {
            auth: true,
            name,
            roll,
            phone,
        }),
    }
}

fn is_captcha_scope(path: &str) -> bool {
    path.strip_prefix(CAPTCHA_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn parse_form(body: &[u8]) -> SignupForm {
    serde_json::from_slice(body).unwrap_or_default()
}

/// Keeps values that count as filled in: not null, false, 0 or an empty string.
fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|value| match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number
            .as_f64()
            .is_some_and(|number| number.classify() != FpCategory::Zero),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Text a value contributes to the captcha hash input.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}
