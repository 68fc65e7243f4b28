use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::args::PositiveU64;
use crate::error::ChannelError;
use crate::http::{RunCompletion, TelemetryEvent};
use crate::target::{Page, TargetResolver};

/// Inbound run request. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunRequest {
    pub page: Option<String>,
    pub rps: Option<u64>,
    pub max: Option<u64>,
}

/// Fallbacks for omitted or zero `rps`/`max`.
#[derive(Debug, Clone, Copy)]
pub struct RunDefaults {
    pub requests_per_second: PositiveU64,
    pub max_requests: PositiveU64,
}

/// A validated run request.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub page: Page,
    pub url: Url,
    pub requests_per_second: PositiveU64,
    pub max_requests: PositiveU64,
}

impl RunRequest {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is not a JSON object of the expected shape.
    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(text).map_err(|source| ChannelError::InvalidRunRequest { source })
    }

    /// Resolves the page and fills in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when `page` is absent or unknown.
    pub fn into_spec(
        self,
        resolver: &TargetResolver,
        defaults: RunDefaults,
    ) -> Result<RunSpec, ChannelError> {
        let page_id = self.page.ok_or(ChannelError::MissingPage)?;
        let page = Page::from_id(&page_id).ok_or(ChannelError::UnknownPage { page: page_id })?;
        Ok(RunSpec {
            page,
            url: resolver.url_for(page).clone(),
            requests_per_second: positive_or(self.rps, defaults.requests_per_second),
            max_requests: positive_or(self.max, defaults.max_requests),
        })
    }
}

fn positive_or(value: Option<u64>, default: PositiveU64) -> PositiveU64 {
    value
        .and_then(|value| PositiveU64::try_from(value).ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Result(TelemetryEvent),
    Done {
        error: Option<String>,
        completed: u64,
    },
    Rejected {
        error: String,
    },
}

impl From<RunCompletion> for OutboundMessage {
    fn from(completion: RunCompletion) -> Self {
        OutboundMessage::Done {
            error: completion.error,
            completed: completion.completed,
        }
    }
}

impl OutboundMessage {
    pub(crate) fn to_frame(&self) -> Result<Message, ChannelError> {
        serde_json::to_string(self)
            .map(Message::Text)
            .map_err(|source| ChannelError::Serialize {
                context: "outbound message",
                source,
            })
    }
}
