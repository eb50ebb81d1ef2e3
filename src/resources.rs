//! 起動時のリソース読み込み
//!
//! モデルパッケージとクラス名JSONを読み込みます。どちらも失敗はログに残すだけで、
//! サーバーは起動を続けヘルスチェックで unhealthy を返します。

use std::path::Path;
use std::sync::Arc;

use crate::api::AppState;
use crate::ml::{load_classifier, Classifier};
use crate::model::{ClassMap, DeviceType, ModelSettings};

/// モデルを読み込む。存在しない・壊れている場合は `None`
pub fn load_model(path: &Path, device_type: DeviceType) -> Option<Arc<dyn Classifier>> {
    if !path.exists() {
        tracing::warn!("⚠️  Model file not found at {}", path.display());
        return None;
    }

    tracing::info!("Loading model from {} ({})", path.display(), device_type);
    match load_classifier(path, device_type) {
        Ok(classifier) => {
            tracing::info!(
                "✅ Model loaded successfully (input {}x{})",
                classifier.input_size(),
                classifier.input_size()
            );
            Some(classifier)
        }
        Err(e) => {
            tracing::error!("❌ Failed to load model: {:#}", e);
            None
        }
    }
}

/// クラス名を読み込む。存在しない・壊れている場合は空
pub fn load_class_map(path: &Path) -> ClassMap {
    if !path.exists() {
        tracing::warn!("⚠️  Class names file not found at {}", path.display());
        return ClassMap::default();
    }

    match ClassMap::load(path) {
        Ok(class_map) => {
            tracing::info!("✅ Class names loaded: {} classes", class_map.len());
            class_map
        }
        Err(e) => {
            tracing::error!("❌ Failed to load class names: {:#}", e);
            ClassMap::default()
        }
    }
}

/// 設定に従ってリソースを読み込み、ハンドラ用の状態を組み立てる
pub fn load_resources(settings: &ModelSettings) -> AppState {
    let classifier = load_model(&settings.model_path, settings.device_type);
    let class_map = load_class_map(&settings.class_names_path);

    if classifier.is_some() {
        warn_on_label_mismatch(&settings.model_path, &class_map);
    }

    AppState::new(classifier, class_map)
}

/// パッケージ内のクラス数とクラス名JSONの件数が食い違う場合に警告する
#[cfg(feature = "ml")]
fn warn_on_label_mismatch(model_path: &Path, class_map: &ClassMap) {
    match crate::model::load_metadata(model_path) {
        Ok(metadata) => {
            crate::model::log_metadata_info(&metadata);
            if metadata.num_classes() != class_map.len() {
                tracing::warn!(
                    "クラス数が一致しません: モデル {} / クラス名 {}",
                    metadata.num_classes(),
                    class_map.len()
                );
            }
        }
        Err(e) => tracing::debug!("メタデータの再読み込みに失敗しました: {:#}", e),
    }
}

#[cfg(not(feature = "ml"))]
fn warn_on_label_mismatch(_model_path: &Path, _class_map: &ClassMap) {}
