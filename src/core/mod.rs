pub mod command;
pub mod pipe;
pub mod runner;

pub use crate::domain::model::{CapturedOutput, OutputLine, PipeState, StreamSource};
pub use crate::domain::ports::{ConfigProvider, Handler};
pub use crate::utils::error::Result;
