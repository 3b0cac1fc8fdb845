// src/config/mod.rs
pub mod settings;
pub mod sources;

pub use settings::Settings;
pub use sources::{load_sources, SourcesFile};
