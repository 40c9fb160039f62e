pub mod file;
pub mod memory;
pub mod migration;
pub mod traits;

pub use file::JsonFileSettingsStore;
pub use memory::InMemorySettingsStore;
pub use traits::SettingsStore;
