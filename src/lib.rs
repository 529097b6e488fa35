pub mod autoplay;
pub mod browser;
pub mod capture;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod timeouts;

pub use config::Config;
pub use error::BridgeError;

pub type Result<T> = std::result::Result<T, BridgeError>;
