pub mod logger;
pub mod settings;

pub use settings::ClientConfig;
