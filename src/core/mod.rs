pub mod config;
pub mod error;

pub use config::{ClientConfig, SendPolicy};
pub use error::ClientError;
