pub mod inference;
#[cfg(feature = "ml")]
pub mod ml_model;
pub mod prediction;

pub use inference::{load_classifier, Classifier};
#[cfg(feature = "ml")]
pub use inference::InferenceEngine;
#[cfg(feature = "ml")]
pub use ml_model::{ModelConfig, WasteClassifierNet, ARCHITECTURE};
pub use prediction::{classify_bytes, predict_image_bytes, preprocess_image_bytes, top_prediction};
