//! ローカルの画像ファイルを分類するコマンドラインツール
//!
//! 使い方: classify <image> [--model PATH] [--classes PATH] [--device cpu|wgpu]

use anyhow::{Context, Result};
use std::path::PathBuf;

use waste_classifier_lib::ml::predict_image_bytes;
use waste_classifier_lib::model::AppConfig;
use waste_classifier_lib::{resources, taxonomy};

fn main() {
    dotenv::dotenv().ok();
    // 結果のJSONは標準出力に出すので、ログは標準エラーへ
    waste_classifier_lib::init_cli_tracing(false);

    if let Err(e) = run() {
        eprintln!("✗ エラー: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut config = AppConfig::from_env()?;

    let mut args = std::env::args().skip(1);
    let mut image_path: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--model" => {
                config.model.model_path = args.next().map(PathBuf::from).context("--model にパスがありません")?;
            }
            "--classes" => {
                config.model.class_names_path =
                    args.next().map(PathBuf::from).context("--classes にパスがありません")?;
            }
            "--device" => {
                let value = args.next().context("--device に値がありません")?;
                config.model.device_type = value.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            }
            _ if image_path.is_none() => image_path = Some(PathBuf::from(arg)),
            _ => anyhow::bail!("不明な引数です: {}", arg),
        }
    }
    let image_path =
        image_path.context("使い方: classify <image> [--model PATH] [--classes PATH] [--device cpu|wgpu]")?;

    let state = resources::load_resources(&config.model);
    let classifier = state
        .classifier
        .clone()
        .context("モデルが読み込まれていません")?;

    let bytes = std::fs::read(&image_path)
        .with_context(|| format!("画像を読み込めません: {}", image_path.display()))?;

    let (label, confidence) = predict_image_bytes(classifier.as_ref(), &state.class_map, &bytes)?;
    let result = taxonomy::describe(&label, confidence);

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
