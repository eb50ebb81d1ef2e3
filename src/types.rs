use serde::{Deserialize, Serialize};

/// ゴミ箱カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinCategory {
    Paper,
    Plastic,
    Glass,
    Metal,
    Organic,
    Textile,
    Unknown,
}

impl BinCategory {
    /// 生分解性（堆肥化可能）かどうか
    pub fn is_degradable(self) -> bool {
        matches!(self, BinCategory::Paper | BinCategory::Organic)
    }
}

impl std::fmt::Display for BinCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BinCategory::Paper => "Paper",
            BinCategory::Plastic => "Plastic",
            BinCategory::Glass => "Glass",
            BinCategory::Metal => "Metal",
            BinCategory::Organic => "Organic",
            BinCategory::Textile => "Textile",
            BinCategory::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// 信頼度から導くリスク段階（UI表示用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// 1リクエスト分の推論結果（永続化しない）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "predicted_class")]
    pub label: String,
    /// 0.0 - 1.0
    pub confidence: f32,
    /// 0 - 100（小数点以下2桁に丸め）
    pub confidence_percentage: f32,
    pub category: BinCategory,
    pub degradable: bool,
    pub risk_level: RiskLevel,
    pub disposal_tip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub classes_loaded: usize,
    pub processing: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassesResponse {
    pub classes: Vec<String>,
    pub total: usize,
}
