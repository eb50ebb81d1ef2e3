//! モデル推論機能
//!
//! `Classifier` はAPI層から見たモデルの境界です。
//! 実装はモデルパッケージを読み込んだ `InferenceEngine`（Burn）ですが、テストではモックに差し替えます。

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::model::DeviceType;

/// 画像分類モデル
///
/// 複数リクエストから同時に参照されるため `Send + Sync` を要求する。
pub trait Classifier: Send + Sync {
    /// 入力画像の一辺（ピクセル）
    fn input_size(&self) -> u32;

    /// 正規化済み画素（CHW順、長さ 3 * size * size）からクラスごとの確率を返す
    fn predict(&self, pixels: &[f32]) -> Result<Vec<f32>>;
}

#[cfg(feature = "ml")]
pub use engine::InferenceEngine;

#[cfg(feature = "ml")]
mod engine {
    use super::Classifier;
    use anyhow::{Context, Result};
    use burn::tensor::{backend::Backend, Tensor, TensorData};
    use std::path::Path;
    use std::sync::Mutex;

    use crate::ml::ml_model::{decode_weights, ModelConfig, WasteClassifierNet, ARCHITECTURE};
    use crate::model::{load_model_with_metadata, ModelMetadata};

    struct Loaded<B: Backend> {
        model: WasteClassifierNet<B>,
        device: B::Device,
    }

    /// 推論エンジン
    ///
    /// Burnのモジュールは `Sync` を保証しないため、モデルとデバイスを `Mutex` で保護する。
    pub struct InferenceEngine<B: Backend> {
        loaded: Mutex<Loaded<B>>,
        metadata: ModelMetadata,
    }

    impl<B: Backend> InferenceEngine<B> {
        /// モデルパッケージを読み込んで推論エンジンを初期化
        pub fn load<P: AsRef<Path>>(model_path: P, device: B::Device) -> Result<Self> {
            let (metadata, model_binary) = load_model_with_metadata(model_path.as_ref())?;

            if metadata.architecture != ARCHITECTURE {
                anyhow::bail!(
                    "対応していないネットワーク構成です: {} (期待: {})",
                    metadata.architecture,
                    ARCHITECTURE
                );
            }

            let config = ModelConfig::from_metadata(&metadata);
            config.validate().context("モデルメタデータが不正です")?;

            let model = decode_weights(config.init::<B>(&device), model_binary, &device)?;

            Ok(Self::from_model(model, metadata, device))
        }

        /// 構築済みのモデルから推論エンジンを作成
        pub fn from_model(model: WasteClassifierNet<B>, metadata: ModelMetadata, device: B::Device) -> Self {
            Self {
                loaded: Mutex::new(Loaded { model, device }),
                metadata,
            }
        }
    }

    impl<B: Backend> Classifier for InferenceEngine<B> {
        fn input_size(&self) -> u32 {
            self.metadata.model_input_size
        }

        fn predict(&self, pixels: &[f32]) -> Result<Vec<f32>> {
            let size = self.metadata.model_input_size as usize;
            if pixels.len() != 3 * size * size {
                anyhow::bail!(
                    "入力長が不正です: {} (期待: 3x{}x{})",
                    pixels.len(),
                    size,
                    size
                );
            }

            let loaded = self
                .loaded
                .lock()
                .map_err(|_| anyhow::anyhow!("モデルのロックが破損しています"))?;

            // [1, 3, size, size]
            let data = TensorData::new(pixels.to_vec(), [1, 3, size, size]);
            let input = Tensor::<B, 4>::from_data(data, &loaded.device);

            let output = loaded.model.predict(input);

            output
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow::anyhow!("推論結果の取得エラー: {:?}", e))
        }
    }
}

/// 設定された計算デバイスでモデルパッケージを読み込む
#[cfg(feature = "ml")]
pub fn load_classifier(model_path: &Path, device_type: DeviceType) -> Result<Arc<dyn Classifier>> {
    match device_type {
        DeviceType::Cpu => {
            let device = burn_ndarray::NdArrayDevice::default();
            let engine = InferenceEngine::<burn_ndarray::NdArray<f32>>::load(model_path, device)?;
            Ok(Arc::new(engine))
        }
        DeviceType::Wgpu => load_wgpu(model_path),
    }
}

#[cfg(not(feature = "ml"))]
pub fn load_classifier(_model_path: &Path, _device_type: DeviceType) -> Result<Arc<dyn Classifier>> {
    anyhow::bail!("機械学習機能が有効化されていません (feature \"ml\")")
}

#[cfg(all(feature = "ml", feature = "gpu"))]
fn load_wgpu(model_path: &Path) -> Result<Arc<dyn Classifier>> {
    let device = burn_wgpu::WgpuDevice::default();
    let engine = InferenceEngine::<burn_wgpu::Wgpu>::load(model_path, device)?;
    Ok(Arc::new(engine))
}

#[cfg(all(feature = "ml", not(feature = "gpu")))]
fn load_wgpu(_model_path: &Path) -> Result<Arc<dyn Classifier>> {
    anyhow::bail!("WGPUバックエンドが有効化されていません (feature \"gpu\")")
}

#[cfg(all(test, feature = "ml"))]
mod tests {
    use super::*;
    use crate::ml::ml_model::{encode_weights, ModelConfig, ARCHITECTURE};
    use crate::model::{save_model_with_metadata, ModelMetadata};
    use burn_ndarray::{NdArray, NdArrayDevice};

    fn write_package(dir: &Path, labels: &[&str], input_size: u32) -> std::path::PathBuf {
        write_package_as(dir, ARCHITECTURE, labels, input_size)
    }

    fn write_package_as(dir: &Path, architecture: &str, labels: &[&str], input_size: u32) -> std::path::PathBuf {
        let device = NdArrayDevice::default();
        let metadata = ModelMetadata::new(
            architecture,
            labels.iter().map(|s| s.to_string()).collect(),
            input_size,
            8,
            0,
        );
        let model = ModelConfig::from_metadata(&metadata).init::<NdArray<f32>>(&device);
        let bytes = encode_weights(model).unwrap();
        save_model_with_metadata(&dir.join("model.tar.gz"), &metadata, &bytes).unwrap()
    }

    #[test]
    fn test_load_and_predict() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_package(dir.path(), &["battery", "glass", "paper"], 16);

        let classifier = load_classifier(&path, DeviceType::Cpu).unwrap();
        assert_eq!(classifier.input_size(), 16);

        let probs = classifier.predict(&vec![0.5; 3 * 16 * 16]).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_wrong_input_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_package(dir.path(), &["battery", "glass"], 16);

        let classifier = load_classifier(&path, DeviceType::Cpu).unwrap();
        assert!(classifier.predict(&[0.0; 10]).is_err());
    }

    #[test]
    fn test_invalid_metadata_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_package(dir.path(), &["battery", "glass"], 16);

        // 入力サイズだけを壊したパッケージを作り直す
        let (mut metadata, bytes) = crate::model::load_model_with_metadata(&path).unwrap();
        metadata.model_input_size = 4;
        let broken = save_model_with_metadata(&dir.path().join("broken.tar.gz"), &metadata, &bytes).unwrap();

        let err = load_classifier(&broken, DeviceType::Cpu).err().unwrap();
        assert!(format!("{:#}", err).contains("入力サイズが小さすぎます"));
    }

    #[test]
    fn test_unknown_architecture_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_package_as(dir.path(), "mobilenet_v2", &["battery", "glass"], 16);

        let err = load_classifier(&path, DeviceType::Cpu).err().unwrap();
        assert!(format!("{:#}", err).contains("対応していないネットワーク構成です: mobilenet_v2"));
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn test_wgpu_without_gpu_feature() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_package(dir.path(), &["battery", "glass"], 16);

        let err = load_classifier(&path, DeviceType::Wgpu).err().unwrap();
        assert!(err.to_string().contains("WGPU"));
    }

    #[test]
    fn test_missing_package() {
        assert!(load_classifier(Path::new("/nonexistent/model.tar.gz"), DeviceType::Cpu).is_err());
    }
}
