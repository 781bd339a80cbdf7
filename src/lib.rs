pub mod adapters;
pub mod codec;
pub mod config;
pub mod core;
pub mod domain;
pub mod text;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Commands};

pub use adapters::http_client::{FetchedBody, HttpClient};
pub use adapters::http_server::TestServer;
pub use adapters::router::Router;
pub use config::{toml_config::TourConfig, Settings};
pub use core::{command::CommandSpec, pipe::PipeCoordinator, runner::ProcessRunner};
pub use domain::model::{CapturedOutput, OutputLine, PipeState, StreamSource};
pub use utils::error::{Result, TourError};
