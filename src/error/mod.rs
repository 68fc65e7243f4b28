mod app;
mod channel;
mod config;
mod http;
mod signup;
mod validation;

pub use app::{AppError, AppResult};
pub use channel::ChannelError;
pub use config::ConfigError;
pub use http::HttpError;
pub use signup::SignupError;
pub use validation::ValidationError;
