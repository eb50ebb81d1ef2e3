//! アップロード画像のバイト列から (ラベル, 信頼度%) を得るまでの処理

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};

use crate::ml::inference::Classifier;
use crate::model::ClassMap;

/// 画像バイト列をデコードし、モデル入力用に正規化する
///
/// RGBに変換して `size` x `size` にリサイズ（バイキュービック）し、
/// 画素値を [0, 1] に正規化して (C, H, W) の順で平坦化する。
pub fn preprocess_image_bytes(bytes: &[u8], size: u32) -> Result<Vec<f32>> {
    if size == 0 {
        anyhow::bail!("入力サイズが0です");
    }

    let img = image::load_from_memory(bytes)
        .context("画像のデコードに失敗しました")?
        .to_rgb8();
    let resized = imageops::resize(&img, size, size, FilterType::CatmullRom);

    let mut data = Vec::with_capacity(3 * (size * size) as usize);
    for channel in 0..3 {
        for y in 0..size {
            for x in 0..size {
                let pixel = resized.get_pixel(x, y);
                data.push(pixel[channel] as f32 / 255.0);
            }
        }
    }

    Ok(data)
}

/// 確率ベクトルの最大値とそのインデックス
///
/// NaNは無視する。有効な値がなければ `None`。
pub fn top_prediction(probabilities: &[f32]) -> Option<(usize, f32)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, p)| !p.is_nan())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
}

/// 画像を分類して (ラベル, 信頼度%) を返す
pub fn predict_image_bytes(
    classifier: &dyn Classifier,
    class_map: &ClassMap,
    image_bytes: &[u8],
) -> Result<(String, f32)> {
    let pixels = preprocess_image_bytes(image_bytes, classifier.input_size())?;
    let probabilities = classifier.predict(&pixels)?;

    let (index, probability) = top_prediction(&probabilities)
        .ok_or_else(|| anyhow::anyhow!("モデルの出力が空です"))?;

    let label = class_map.label_for(index).to_string();
    Ok((label, probability * 100.0))
}

/// `predict_image_bytes` のエラーをログに残して `None` にする
pub fn classify_bytes(
    classifier: &dyn Classifier,
    class_map: &ClassMap,
    image_bytes: &[u8],
) -> Option<(String, f32)> {
    match predict_image_bytes(classifier, class_map, image_bytes) {
        Ok(prediction) => {
            tracing::debug!(label = %prediction.0, confidence = prediction.1, "推論完了");
            Some(prediction)
        }
        Err(e) => {
            tracing::error!("Prediction error: {:#}", e);
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::collections::HashMap;
    use std::io::Cursor;

    /// 固定の確率を返すモデル
    pub(crate) struct FixedClassifier {
        pub size: u32,
        pub probabilities: Vec<f32>,
    }

    impl Classifier for FixedClassifier {
        fn input_size(&self) -> u32 {
            self.size
        }

        fn predict(&self, pixels: &[f32]) -> Result<Vec<f32>> {
            assert_eq!(pixels.len(), (3 * self.size * self.size) as usize);
            Ok(self.probabilities.clone())
        }
    }

    pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn class_map() -> ClassMap {
        ClassMap::new(HashMap::from([
            ("0".to_string(), "battery".to_string()),
            ("1".to_string(), "glass".to_string()),
        ]))
    }

    #[test]
    fn test_preprocess_layout() {
        let bytes = png_bytes(10, 7, [255, 0, 0]);
        let data = preprocess_image_bytes(&bytes, 4).unwrap();

        assert_eq!(data.len(), 3 * 4 * 4);
        // R チャネルが先頭 16 要素
        assert!(data[..16].iter().all(|v| *v > 0.99));
        assert!(data[16..].iter().all(|v| *v < 0.01));
    }

    #[test]
    fn test_preprocess_rejects_garbage() {
        assert!(preprocess_image_bytes(b"not an image", 224).is_err());
    }

    #[test]
    fn test_top_prediction() {
        assert_eq!(top_prediction(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
        assert_eq!(top_prediction(&[f32::NAN, 0.3]), Some((1, 0.3)));
        assert_eq!(top_prediction(&[]), None);
        assert_eq!(top_prediction(&[f32::NAN]), None);
    }

    #[test]
    fn test_predict_maps_label() {
        let classifier = FixedClassifier {
            size: 8,
            probabilities: vec![0.1, 0.9],
        };
        let bytes = png_bytes(20, 20, [0, 128, 0]);

        let (label, confidence) = predict_image_bytes(&classifier, &class_map(), &bytes).unwrap();
        assert_eq!(label, "glass");
        assert!((confidence - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_index_outside_class_map_is_unknown() {
        let classifier = FixedClassifier {
            size: 8,
            probabilities: vec![0.1, 0.2, 0.7],
        };
        let bytes = png_bytes(8, 8, [0, 0, 0]);

        let (label, _) = predict_image_bytes(&classifier, &class_map(), &bytes).unwrap();
        assert_eq!(label, "Unknown");
    }

    #[test]
    fn test_classify_bytes_swallows_errors() {
        let classifier = FixedClassifier {
            size: 8,
            probabilities: vec![1.0],
        };
        assert_eq!(classify_bytes(&classifier, &class_map(), b"garbage"), None);

        let empty = FixedClassifier {
            size: 8,
            probabilities: vec![],
        };
        let bytes = png_bytes(8, 8, [1, 2, 3]);
        assert_eq!(classify_bytes(&empty, &class_map(), &bytes), None);
    }
}
