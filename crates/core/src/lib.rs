pub mod config;
pub mod error;
pub mod session;

pub use config::WorkerConfig;
pub use error::*;
pub use session::SessionId;
