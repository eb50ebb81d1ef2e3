pub mod api;
pub mod ml;
pub mod model;
pub mod resources;
pub mod taxonomy;
pub mod types;

use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use model::AppConfig;

/// ログ出力を初期化する（標準出力）
///
/// `RUST_LOG` があればそれを優先し、なければ debug 設定に応じて info / debug を使う。
pub fn init_tracing(debug: bool) {
    // 二重初期化（テストや複数バイナリからの呼び出し）は無視する
    let _ = log_subscriber(debug, std::io::stdout).try_init();
}

/// ログ出力を標準エラーに初期化する
///
/// 標準出力に結果を書くコマンドラインツール用。
pub fn init_cli_tracing(debug: bool) {
    let _ = log_subscriber(debug, std::io::stderr).try_init();
}

fn log_subscriber<W>(debug: bool, writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .with(filter)
}

/// サーバーを起動し、終了まで待つ
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let state = resources::load_resources(&config.model);

    tracing::info!("{}", "=".repeat(60));
    tracing::info!("🚀 Waste Classifier API Server");
    tracing::info!("{}", "=".repeat(60));
    tracing::info!("Model loaded: {}", if state.model_loaded() { "✅" } else { "❌" });
    tracing::info!("Classes: {}", state.class_map.len());
    tracing::info!("Port: {}", config.server.port);
    tracing::info!("Debug: {}", config.server.debug);
    tracing::info!("{}", "=".repeat(60));

    let app = api::construct_router(state, config.server.max_upload_bytes);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("サーバーを停止しました");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("シグナル待機に失敗しました: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_logs_go_to_the_given_writer() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = log_subscriber(false, move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("モデルが見つかりません");
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("モデルが見つかりません"));
    }
}
