// Configuration loading and on-disk storage

pub mod settings;
pub mod storage;

pub use settings::Settings;
pub use storage::FileStore;
