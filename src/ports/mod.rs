pub mod clipboard;
pub mod config;
pub mod host;

pub use clipboard::Clipboard;
pub use config::ConfigStore;
pub use host::HostClient;
