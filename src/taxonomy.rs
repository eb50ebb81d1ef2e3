//! ラベル文字列から分別情報への変換
//!
//! ラベルを小文字化し、キーワードの部分一致で判定します。
//! テーブルは上から順に評価され、最初に一致した行が採用されます。

use crate::types::{BinCategory, PredictionResult, RiskLevel};

/// カテゴリ判定テーブル
const CATEGORY_RULES: &[(&[&str], BinCategory)] = &[
    (&["paper", "cardboard"], BinCategory::Paper),
    (&["plastic"], BinCategory::Plastic),
    (&["glass"], BinCategory::Glass),
    (&["metal", "can", "battery"], BinCategory::Metal),
    (&["bio", "organic", "food", "compost"], BinCategory::Organic),
    (&["clothes", "footwear"], BinCategory::Textile),
];

/// 廃棄方法テーブル（カテゴリとは独立）
///
/// batteryはMetalに分類されるが、回収拠点への持ち込みを案内する。
const DISPOSAL_RULES: &[(&[&str], &str)] = &[
    (&["paper", "cardboard"], "Recycle in paper bin. Remove tape/labels first."),
    (&["plastic"], "Check recycling number. Clean and dry before recycling."),
    (&["glass"], "Rinse clean and recycle. Remove lids/caps."),
    (&["metal", "can"], "Rinse and recycle. Highly recyclable!"),
    (&["battery"], "Take to designated battery recycling center."),
    (&["bio", "organic", "food"], "Compost if possible, or use organic waste bin."),
    (&["clothes", "footwear"], "Donate if reusable, or textile recycling."),
];

const DEFAULT_DISPOSAL_TIP: &str = "Check local guidelines for proper disposal.";

/// 低リスクとみなす信頼度の下限（%）
pub const LOW_RISK_THRESHOLD: f32 = 80.0;
/// 中リスクとみなす信頼度の下限（%）
pub const MEDIUM_RISK_THRESHOLD: f32 = 50.0;

fn first_match<'a, T: Copy>(label: &str, rules: &'a [(&'a [&'a str], T)]) -> Option<T> {
    let lowered = label.to_lowercase();
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, value)| *value)
}

/// ラベルからゴミ箱カテゴリと生分解性を取得
pub fn bin_info(label: &str) -> (BinCategory, bool) {
    let category = first_match(label, CATEGORY_RULES).unwrap_or(BinCategory::Unknown);
    (category, category.is_degradable())
}

/// 信頼度（%）からリスク段階を取得
pub fn risk_level(confidence_pct: f32) -> RiskLevel {
    if confidence_pct >= LOW_RISK_THRESHOLD {
        RiskLevel::Low
    } else if confidence_pct >= MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// ラベルから廃棄方法の案内文を取得
pub fn disposal_tip(label: &str) -> &'static str {
    first_match(label, DISPOSAL_RULES).unwrap_or(DEFAULT_DISPOSAL_TIP)
}

/// 推論ラベルと信頼度（%）からAPIレスポンス用の結果を組み立てる
pub fn describe(label: &str, confidence_pct: f32) -> PredictionResult {
    let (category, degradable) = bin_info(label);

    PredictionResult {
        label: label.to_string(),
        confidence: confidence_pct / 100.0,
        confidence_percentage: (confidence_pct * 100.0).round() / 100.0,
        category,
        degradable,
        risk_level: risk_level(confidence_pct),
        disposal_tip: disposal_tip(label).to_string(),
    }
}
