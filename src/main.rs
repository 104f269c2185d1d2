use anyhow::Result;
use tracing::info;

use ueci_tramitacao::utils::logging;
use ueci_tramitacao::{run_batch, Config, StatusEvent, StatusReporter};

/// 状态通道容量
const STATUS_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(&config)?;
    logging::log_startup(&config);

    // 状态通知只在控制台显示
    let (reporter, mut events) = StatusReporter::channel(STATUS_CAPACITY);
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                StatusEvent::Status(text) => println!("▶ {}", text),
                StatusEvent::Progress(fraction) => println!("  [{:>3.0}%]", fraction * 100.0),
            }
        }
    });

    let result = run_batch(config, reporter).await;
    printer.await.ok();

    let report = result?;
    info!(
        "结束: 转办成功 {} 个, 失败 {} 个",
        report.queue.processed, report.queue.failed
    );
    Ok(())
}
