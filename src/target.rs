//! Symbolic page identifiers and the URLs they resolve to.
use url::Url;

use crate::args::ServerArgs;
use crate::error::{AppError, AppResult, ValidationError};

const CAPTCHA_SIGNUP_PATH: &str = "/captcha/signup";
const NOCAPTCHA_SIGNUP_PATH: &str = "/nocaptcha/signup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Signup gated by a captcha hash.
    Captcha,
    /// Signup accepted unconditionally.
    NoCaptcha,
}

impl Page {
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "captcha" => Some(Page::Captcha),
            "nocaptcha" => Some(Page::NoCaptcha),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Page::Captcha => "captcha",
            Page::NoCaptcha => "nocaptcha",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetResolver {
    captcha: Url,
    nocaptcha: Url,
}

impl TargetResolver {
    #[must_use]
    pub const fn new(captcha: Url, nocaptcha: Url) -> Self {
        Self { captcha, nocaptcha }
    }

    /// Builds both signup URLs under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when `base_url` is not an absolute http(s) URL.
    pub fn from_base(base_url: &str) -> AppResult<Self> {
        let base = parse_http_url(base_url)?;
        Ok(Self {
            captcha: join_path(&base, CAPTCHA_SIGNUP_PATH),
            nocaptcha: join_path(&base, NOCAPTCHA_SIGNUP_PATH),
        })
    }

    /// Resolves the targets from CLI/config values; explicit URLs win over the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error when any configured URL is invalid.
    pub fn from_args(args: &ServerArgs) -> AppResult<Self> {
        let mut resolver = Self::from_base(&args.target_base_url)?;
        if let Some(url) = args.captcha_url.as_deref() {
            resolver.captcha = parse_http_url(url)?;
        }
        if let Some(url) = args.nocaptcha_url.as_deref() {
            resolver.nocaptcha = parse_http_url(url)?;
        }
        Ok(resolver)
    }

    /// Maps a page identifier to its endpoint. Unknown identifiers yield `None`.
    #[must_use]
    pub fn resolve(&self, page_id: &str) -> Option<&Url> {
        Page::from_id(page_id).map(|page| self.url_for(page))
    }

    #[must_use]
    pub const fn url_for(&self, page: Page) -> &Url {
        match page {
            Page::Captcha => &self.captcha,
            Page::NoCaptcha => &self.nocaptcha,
        }
    }
}

fn parse_http_url(value: &str) -> AppResult<Url> {
    let url = Url::parse(value.trim()).map_err(|err| {
        AppError::validation(ValidationError::InvalidUrl {
            url: value.to_owned(),
            source: err,
        })
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::validation(
            ValidationError::UnsupportedUrlScheme {
                url: value.to_owned(),
            },
        ));
    }
    Ok(url)
}

fn join_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{}{}", prefix, path));
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(base: &str) -> Result<TargetResolver, String> {
        TargetResolver::from_base(base).map_err(|err| err.to_string())
    }

    #[test]
    fn known_pages_resolve_to_distinct_urls() -> Result<(), String> {
        let resolver = resolver("http://localhost:8000")?;
        let captcha = resolver
            .resolve("captcha")
            .ok_or_else(|| "Expected captcha url".to_owned())?;
        let nocaptcha = resolver
            .resolve("nocaptcha")
            .ok_or_else(|| "Expected nocaptcha url".to_owned())?;

        if captcha.as_str() != "http://localhost:8000/captcha/signup" {
            return Err(format!("Unexpected captcha url {}", captcha));
        }
        if nocaptcha.as_str() != "http://localhost:8000/nocaptcha/signup" {
            return Err(format!("Unexpected nocaptcha url {}", nocaptcha));
        }
        if captcha == nocaptcha {
            return Err("Expected distinct urls".to_owned());
        }
        Ok(())
    }

    #[test]
    fn unknown_pages_do_not_resolve() -> Result<(), String> {
        let resolver = resolver("http://localhost:8000")?;
        for page in ["bogus", "", "Captcha", "no-captcha"] {
            if resolver.resolve(page).is_some() {
                return Err(format!("Expected '{}' to be unresolved", page));
            }
        }
        Ok(())
    }

    #[test]
    fn base_url_prefix_is_kept() -> Result<(), String> {
        let resolver = resolver("https://example.test/api/")?;
        if resolver.url_for(Page::NoCaptcha).as_str()
            != "https://example.test/api/nocaptcha/signup"
        {
            return Err("Expected base path prefix".to_owned());
        }
        Ok(())
    }

    #[test]
    fn invalid_base_urls_are_rejected() -> Result<(), String> {
        for base in ["localhost:8000", "ftp://example.test", "not a url"] {
            if TargetResolver::from_base(base).is_ok() {
                return Err(format!("Expected '{}' to be rejected", base));
            }
        }
        Ok(())
    }

    #[test]
    fn explicit_urls_override_base() -> Result<(), String> {
        let args = crate::args::parse_test_args([
            "loadwire",
            "--nocaptcha-url",
            "http://other.test/open",
        ])
        .map_err(|err| err.to_string())?;
        let resolver = TargetResolver::from_args(&args).map_err(|err| err.to_string())?;
        if resolver.url_for(Page::NoCaptcha).as_str() != "http://other.test/open" {
            return Err("Expected nocaptcha override".to_owned());
        }
        if resolver.url_for(Page::Captcha).as_str() != "http://localhost:8000/captcha/signup" {
            return Err("Expected captcha from base".to_owned());
        }
        Ok(())
    }
}
