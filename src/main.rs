use anyhow::Result;
use doc_qa_dispatch::utils::logging;
use doc_qa_dispatch::{App, Config};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::try_from_env()?;

    // 初始化日志
    logging::init_tracing(config.verbose_logging);

    // Ctrl-C 时取消当前批次
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 收到中断信号，正在取消...");
                cancel.cancel();
            }
        });
    }

    // 初始化并运行应用
    let response = App::initialize(config).run(&cancel).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
