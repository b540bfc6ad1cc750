pub mod clipboard;
pub mod config_store;
pub mod stdio_host;

pub use clipboard::ArboardClipboard;
pub use config_store::TomlConfigStore;
pub use stdio_host::StdioHostClient;
