use waste_classifier_lib::model::{config::parse_flag, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 設定ファイルの読み込みログも出したいので、環境変数だけ見て先にログを初期化する
    let debug = std::env::var("DEBUG").map(|v| parse_flag(&v)).unwrap_or(false);
    waste_classifier_lib::init_tracing(debug);

    let config = AppConfig::from_env()?;
    config.log_summary();

    waste_classifier_lib::run(config).await
}
