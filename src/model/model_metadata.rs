//! モデルメタデータの定義
//!
//! モデルパッケージ（tar.gz）内の `metadata.json` に対応します。
//! ネットワークの形状（入力サイズ、クラス数、中間層の幅）を復元するのに必要な情報を保持します。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_input_size() -> u32 {
    224
}

fn default_hidden_size() -> usize {
    128
}

/// モデルメタデータ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// ネットワーク構成の名前
    pub architecture: String,

    /// 学習時のクラスラベル（インデックス順）
    /// 出力層の次元数はこの長さで決まる
    pub class_labels: Vec<String>,

    /// モデル入力サイズ（正方形、通常224x224）
    #[serde(default = "default_input_size")]
    pub model_input_size: u32,

    /// 全結合層の中間次元
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,

    /// 学習エポック数
    #[serde(default)]
    pub num_epochs: u32,

    /// モデルの学習時刻（ISO8601形式）
    pub trained_at: String,
}

impl ModelMetadata {
    /// 新しいメタデータを作成
    pub fn new(
        architecture: impl Into<String>,
        class_labels: Vec<String>,
        model_input_size: u32,
        hidden_size: usize,
        num_epochs: u32,
    ) -> Self {
        let trained_at = chrono::Local::now().to_rfc3339();

        Self {
            architecture: architecture.into(),
            class_labels,
            model_input_size,
            hidden_size,
            num_epochs,
            trained_at,
        }
    }

    /// 出力クラス数
    pub fn num_classes(&self) -> usize {
        self.class_labels.len()
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize metadata to JSON")
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize metadata from JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_fields() {
        let json = r#"{
            "architecture": "waste-cnn",
            "class_labels": ["battery", "glass", "paper"],
            "trained_at": "2024-01-01T00:00:00+00:00"
        }"#;
        let metadata = ModelMetadata::from_json_string(json).unwrap();
        assert_eq!(metadata.model_input_size, 224);
        assert_eq!(metadata.hidden_size, 128);
        assert_eq!(metadata.num_epochs, 0);
        assert_eq!(metadata.num_classes(), 3);
    }

    #[test]
    fn test_missing_labels_is_error() {
        let json = r#"{"architecture": "waste-cnn", "trained_at": "now"}"#;
        assert!(ModelMetadata::from_json_string(json).is_err());
    }
}
