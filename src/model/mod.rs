pub mod class_map;
pub mod config;
pub mod model_metadata;
pub mod model_storage;

pub use class_map::{ClassMap, ClassMapError, MAX_CLASS_INDEX, UNKNOWN_LABEL};
pub use config::{AppConfig, ConfigError, DeviceType, ModelSettings, ServerSettings};
pub use model_metadata::ModelMetadata;
pub use model_storage::{load_metadata, load_model_with_metadata, log_metadata_info, save_model_with_metadata};
