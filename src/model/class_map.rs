//! クラスインデックスからラベルへの対応表
//!
//! 学習スクリプトが出力する `{"0": "battery", "1": "biological", ...}` 形式のJSONを扱います。
//! キーは文字列のまま保持し、整数として解釈できるかどうかは一覧取得時に検証します。

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// 対応表に存在しないインデックスに使うラベル
pub const UNKNOWN_LABEL: &str = "Unknown";

/// 一覧に展開できるインデックスの上限
pub const MAX_CLASS_INDEX: i64 = 65_535;

#[derive(Debug, thiserror::Error)]
pub enum ClassMapError {
    #[error("class map is empty")]
    Empty,
    #[error("class index is not an integer: {0:?}")]
    InvalidIndex(String),
    #[error("class index {index} exceeds the limit {limit}")]
    IndexOutOfRange { index: i64, limit: i64 },
}

/// 起動時に一度だけ読み込まれ、以降は変更されない
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMap {
    entries: HashMap<String, String>,
}

impl ClassMap {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// JSONファイルから読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read class names: {:?}", path))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse class names: {:?}", path))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// インデックスからラベルを取得。存在しなければ "Unknown"
    pub fn label_for(&self, index: usize) -> &str {
        self.entries
            .get(&index.to_string())
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// 0..=最大インデックス の順に並べたラベル一覧
    ///
    /// 欠番は "Unknown" で埋める。
    pub fn ordered_labels(&self) -> Result<Vec<String>, ClassMapError> {
        if self.entries.is_empty() {
            return Err(ClassMapError::Empty);
        }

        let mut max_index: i64 = i64::MIN;
        for key in self.entries.keys() {
            let index: i64 = key
                .trim()
                .parse()
                .map_err(|_| ClassMapError::InvalidIndex(key.clone()))?;
            max_index = max_index.max(index);
        }

        // 欠番は Unknown で埋めるため、巨大なインデックスは一覧の確保自体が破綻する
        if max_index > MAX_CLASS_INDEX {
            return Err(ClassMapError::IndexOutOfRange {
                index: max_index,
                limit: MAX_CLASS_INDEX,
            });
        }

        if max_index < 0 {
            return Ok(Vec::new());
        }

        Ok((0..=max_index)
            .map(|i| self.label_for(i as usize).to_string())
            .collect())
    }
}
