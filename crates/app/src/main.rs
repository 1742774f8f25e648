mod replay;
mod settings;
mod sink;

use clap::Parser;
use replay::JsonLinesFeed;
use sink::LogSink;
use std::path::PathBuf;
use std::sync::Arc;
use tenkan_core::config::LoggingConfig;
use tenkan_engine::{StrategyEngine, StrategyRegistry};
use tenkan_manager::PipelineCoordinator;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// 多周期 K 线信号管线
#[derive(Parser, Debug)]
#[command(name = "tenkan", version)]
struct Args {
    /// 配置文件路径 (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON Lines 格式的行情事件回放文件
    #[arg(short, long)]
    replay: PathBuf,

    /// 发布结果时输出完整 JSON
    #[arg(long)]
    json: bool,
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 `Arc<dyn Trait>` 注入到 `PipelineCoordinator`。
///
/// # Logic
/// 1. 解析命令行并加载配置。
/// 2. 初始化全局日志。
/// 3. 按配置构建策略注册表与执行器。
/// 4. 构造管线协调器，接入回放行情源与日志接收方。
/// 5. 行情源结束或收到退出信号后，排空所有工作协程再退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = settings::load(args.config.as_deref())?;
    let _guard = init_logging(&config.logging);
    info!("Tenkan pipeline starting...");

    let registry = StrategyRegistry::from_config(&config.strategies, &config.indicators);
    let engine = Arc::new(StrategyEngine::new(registry, &config.indicators.specs()));
    info!(
        "Computing {} indicator parameterizations per trigger",
        engine.indicator_specs().len()
    );

    let sink = Arc::new(LogSink::new(args.json));
    let coordinator =
        PipelineCoordinator::new(config.pipeline, engine, None, sink.clone(), sink);
    let feed = JsonLinesFeed::new(args.replay);

    tokio::select! {
        result = coordinator.run(&feed) => match result {
            Ok(submitted) => info!("Replay finished, {} events submitted", submitted),
            Err(e) => error!("Pipeline stopped: {}", e),
        },
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("Shutdown signal received. Draining..."),
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        },
    }

    let stats = coordinator.shutdown().await;
    info!(
        "Exiting: {} events, {} rejected, {} results published",
        stats.events, stats.rejected, stats.published
    );
    Ok(())
}

/// # Summary
/// 初始化日志：标准输出 + 可选的按日滚动文件。
///
/// # Returns
/// 文件写入线程的守卫，必须存活到进程结束。
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "tenkan.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}
