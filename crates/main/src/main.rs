//! 主应用程序入口
//!
//! 加载配置，组装内存存储与事件中心，启动后台维护任务和 Axum Web API 服务。

use application::maintenance;
use config::AppConfig;
use infrastructure::Infrastructure;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    let address = config.server.bind_address();

    let infra = Infrastructure::in_memory(&config);
    let shutdown = CancellationToken::new();
    let state = AppState::new(&infra, config.clone(), shutdown.clone());

    let mut tasks = maintenance::spawn(
        &infra.hub,
        state.rating_service.clone(),
        infra.clock.clone(),
        &config,
        shutdown.clone(),
    );

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("服务器启动在 http://{}", address);

    let signal = shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "无法监听关闭信号");
            }
            tracing::info!("收到关闭信号，正在停止");
            signal.cancel();
        })
        .await?;

    // 长轮询和 SSE 依赖这个令牌退出，维护任务也一样
    shutdown.cancel();
    while tasks.join_next().await.is_some() {}
    tracing::info!("服务器已停止");

    Ok(())
}
