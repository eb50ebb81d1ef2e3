//! アプリケーション設定管理モジュール
//!
//! デフォルト値 → JSON設定ファイル → 環境変数 の順に上書きして設定を組み立てます。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 計算デバイスの種類
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// NdArray (CPU) バックエンド
    #[default]
    Cpu,
    /// WGPU (GPU) バックエンド
    Wgpu,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Cpu => write!(f, "CPU (NdArray)"),
            DeviceType::Wgpu => write!(f, "WGPU (GPU)"),
        }
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" | "ndarray" => Ok(DeviceType::Cpu),
            "wgpu" | "gpu" => Ok(DeviceType::Wgpu),
            other => Err(format!("unknown device type: {}", other)),
        }
    }
}

/// HTTPサーバー設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// デバッグログを有効にする
    pub debug: bool,
    /// アップロードの最大サイズ（バイト）
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            debug: false,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

/// モデル設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// モデルパッケージ（tar.gz）のパス
    pub model_path: PathBuf,
    /// クラス名JSON（{"0": "battery", ...}）のパス
    pub class_names_path: PathBuf,
    /// 計算デバイスの種類
    pub device_type: DeviceType,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/waste_classifier.tar.gz"),
            class_names_path: PathBuf::from("models/class_names.json"),
            device_type: DeviceType::default(),
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub model: ModelSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

impl AppConfig {
    /// 設定ファイルパスを指定する環境変数
    pub const PATH_ENV: &'static str = "WASTE_CLASSIFIER_CONFIG";

    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        std::env::var(Self::PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.json"))
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// デフォルトパスから設定を読み込む、存在しない場合はデフォルト設定を返す
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(&Self::default_path())
    }

    /// 指定パスから設定を読み込む。存在しない・壊れている場合はデフォルト設定
    pub fn load_or_default_from(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(config) => {
                    tracing::info!("設定ファイルを読み込みました: {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "設定ファイルの読み込みに失敗しました ({}): {}。デフォルト設定を使用します",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::debug!("設定ファイルが存在しません。デフォルト設定を使用します");
            Self::default()
        }
    }

    /// 設定ファイルと環境変数から設定を組み立てる
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::load_or_default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 環境変数相当の値で上書きする
    ///
    /// `lookup` はキーに対応する値を返す。テストから差し替えられるよう関数で受け取る。
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(debug) = lookup("DEBUG") {
            self.server.debug = parse_flag(&debug);
        }
        if let Some(limit) = lookup("MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", &limit)?;
        }
        if let Some(path) = lookup("MODEL_PATH") {
            self.model.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CLASS_NAMES_PATH") {
            self.model.class_names_path = PathBuf::from(path);
        }
        if let Some(device) = lookup("DEVICE_TYPE") {
            self.model.device_type = parse_var("DEVICE_TYPE", &device)?;
        }
        Ok(())
    }

    /// 待ち受けアドレス
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 設定情報をログに出力
    pub fn log_summary(&self) {
        tracing::info!("=== アプリケーション設定 ===");
        tracing::info!("待ち受け: {}", self.bind_addr());
        tracing::info!("デバッグ: {}", self.server.debug);
        tracing::info!("最大アップロード: {} バイト", self.server.max_upload_bytes);
        tracing::info!("モデルパス: {}", self.model.model_path.display());
        tracing::info!("クラス名パス: {}", self.model.class_names_path.display());
        tracing::info!("計算デバイス: {}", self.model.device_type);
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

/// "true" / "1" / "yes" を真とみなす
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
