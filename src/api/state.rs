use std::sync::Arc;

use crate::ml::Classifier;
use crate::model::ClassMap;

/// ハンドラに注入される共有状態
///
/// 起動時に一度だけ組み立てられ、以降は読み取り専用。
#[derive(Clone, Default)]
pub struct AppState {
    /// 読み込みに失敗した場合は `None`
    pub classifier: Option<Arc<dyn Classifier>>,
    /// 読み込みに失敗した場合は空
    pub class_map: Arc<ClassMap>,
}

impl AppState {
    pub fn new(classifier: Option<Arc<dyn Classifier>>, class_map: ClassMap) -> Self {
        Self {
            classifier,
            class_map: Arc::new(class_map),
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_some()
    }
}
