//! 分類ネットワークの定義
//!
//! ゴミ画像分類用のCNNモデルと関連する設定を提供します。

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::{activation::softmax, backend::Backend, Tensor},
};

use crate::model::ModelMetadata;

/// ネットワーク構成名（メタデータに記録される）
pub const ARCHITECTURE: &str = "waste-cnn-gap";

/// 畳み込み3層とプーリング2回を通すのに必要な最小入力サイズ
pub const MIN_IMAGE_SIZE: usize = 14;

/// モデル設定
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// 分類クラス数
    pub num_classes: usize,
    /// ドロップアウト率
    #[config(default = 0.2)]
    pub dropout: f64,
    /// 入力画像サイズ（正方形）
    #[config(default = 224)]
    pub image_size: usize,
    /// 全結合層の中間次元
    #[config(default = 128)]
    pub hidden_size: usize,
}

impl ModelConfig {
    /// メタデータから推論用の設定を作る（推論時はドロップアウトなし）
    pub fn from_metadata(metadata: &ModelMetadata) -> Self {
        Self {
            num_classes: metadata.num_classes(),
            dropout: 0.0,
            image_size: metadata.model_input_size as usize,
            hidden_size: metadata.hidden_size,
        }
    }

    /// ネットワークを組み立てられる設定かどうか
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_classes == 0 {
            anyhow::bail!("クラス数が0です");
        }
        if self.image_size < MIN_IMAGE_SIZE {
            anyhow::bail!(
                "入力サイズが小さすぎます: {} (最小{}x{}が必要)",
                self.image_size,
                MIN_IMAGE_SIZE,
                MIN_IMAGE_SIZE
            );
        }
        if self.hidden_size == 0 {
            anyhow::bail!("中間層の次元が0です");
        }
        Ok(())
    }

    /// モデルを初期化
    pub fn init<B: Backend>(&self, device: &B::Device) -> WasteClassifierNet<B> {
        // 入力サイズに依存しないよう、最後はグローバル平均プーリングで128次元に潰す
        WasteClassifierNet {
            conv1: Conv2dConfig::new([3, 32], [3, 3])
                .with_stride([1, 1])
                .init(device),
            pool1: MaxPool2dConfig::new([2, 2]).init(),
            conv2: Conv2dConfig::new([32, 64], [3, 3])
                .with_stride([1, 1])
                .init(device),
            pool2: MaxPool2dConfig::new([2, 2]).init(),
            conv3: Conv2dConfig::new([64, 128], [3, 3])
                .with_stride([1, 1])
                .init(device),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc1: LinearConfig::new(128, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }
}

/// ゴミ画像分類用CNNモデル
///
/// # アーキテクチャ
/// - Conv 3x3 + ReLU + MaxPool 2x2 (3 -> 32)
/// - Conv 3x3 + ReLU + MaxPool 2x2 (32 -> 64)
/// - Conv 3x3 + ReLU (64 -> 128)
/// - Global Average Pooling
/// - Dropout
/// - FC: 128 -> hidden + ReLU
/// - FC: hidden -> num_classes
/// - Softmax (予測時)
#[derive(Module, Debug)]
pub struct WasteClassifierNet<B: Backend> {
    conv1: Conv2d<B>,
    pool1: MaxPool2d,
    conv2: Conv2d<B>,
    pool2: MaxPool2d,
    conv3: Conv2d<B>,
    global_pool: AdaptiveAvgPool2d,
    dropout: Dropout,
    fc1: Linear<B>,
    fc2: Linear<B>,
    activation: Relu,
}

impl<B: Backend> WasteClassifierNet<B> {
    /// 順伝播
    ///
    /// # 引数
    /// - `images`: バッチ画像 [batch_size, 3, size, size]
    ///
    /// # 戻り値
    /// - クラスごとのロジット [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool1.forward(x);

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool2.forward(x);

        let x = self.conv3.forward(x);
        let x = self.activation.forward(x);

        // [batch, 128, 1, 1] -> [batch, 128]
        let x = self.global_pool.forward(x);
        let [_, c, _, _] = x.dims();
        let x = x.reshape([batch_size, c]);
        let x = self.dropout.forward(x);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);

        self.fc2.forward(x)
    }

    /// クラスごとの確率 [batch_size, num_classes]
    pub fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }
}

/// モデルの重みをバイト列に変換（model.bin の中身）
pub fn encode_weights<B: Backend>(model: WasteClassifierNet<B>) -> anyhow::Result<Vec<u8>> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    Recorder::<B>::record(&recorder, model.into_record(), ())
        .map_err(|e| anyhow::anyhow!("モデル重みの書き出しエラー: {:?}", e))
}

/// バイト列から重みを復元
pub fn decode_weights<B: Backend>(
    model: WasteClassifierNet<B>,
    bytes: Vec<u8>,
    device: &B::Device,
) -> anyhow::Result<WasteClassifierNet<B>> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    let record = Recorder::<B>::load(&recorder, bytes, device)
        .map_err(|e| anyhow::anyhow!("モデル重みの読み込みエラー: {:?}", e))?;
    Ok(model.load_record(record))
}
