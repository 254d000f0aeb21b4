use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use parley_config::ConfigManager;
use parley_llm::{ChatBackend, LmStudioClient, LmStudioConfig};
use parley_observability::{LogManager, LogSettings};
use parley_router::{ConversationOrchestrator, EventHandler, MessageSender, OrchestratorConfig};
use parley_server::{run_server, AppState, LineClient};
use parley_session::{MemorySessionStore, SessionStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug, Clone)]
#[command(name = "parley-server")]
#[command(about = "LINE chat bot backed by a local LM Studio model")]
#[command(version)]
struct Cli {
    /// Config file path (defaults to ~/.parley/config.json)
    #[arg(long, env = "PARLEY_CONFIG")]
    config: Option<String>,

    /// Bind host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Log level (overrides config)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 显式路径优先，否则使用默认路径
    let config_path = parley_config::resolve_config_path(cli.config.as_deref())
        .context("Could not determine config path")?;

    let config_manager = ConfigManager::load(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    let mut config = config_manager.snapshot().await;

    // CLI 参数覆盖配置文件
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    ConfigManager::validate(&config)?;

    let _log_manager = LogManager::init(LogSettings::from(&config.logging))?;

    info!("Config loaded from {:?}", config_manager.path());
    for warning in config.warnings() {
        warn!("{}", warning);
    }
    info!("LLM Configuration:");
    info!("  Base URL: {}", config.llm.base_url);
    info!(
        "  Model: {}",
        config.llm.model.as_deref().unwrap_or("<first listed model>")
    );
    info!(
        "  Session timeout: {:?}, max turns: {}",
        config.session.timeout(),
        config.session.effective_max_turns()
    );

    let shutdown = CancellationToken::new();

    let mut llm_config =
        LmStudioConfig::new(config.llm.base_url.clone()).with_timeout(config.llm.timeout());
    if let Some(model) = &config.llm.model {
        llm_config = llm_config.with_model(model.clone());
    }
    let backend: Arc<dyn ChatBackend> = Arc::new(LmStudioClient::new(llm_config)?);

    let memory_store = Arc::new(MemorySessionStore::new());
    let janitor = config
        .session
        .purge_interval()
        .map(|interval| memory_store.spawn_janitor(interval, shutdown.clone()));
    let store: Arc<dyn SessionStore> = memory_store;

    let sender: Arc<dyn MessageSender> = Arc::new(LineClient::new(
        config.line.api_base_url.clone(),
        config.line.channel_token.clone(),
    )?);

    let orchestrator_config = OrchestratorConfig {
        system_prompt: config.llm.system_prompt.clone(),
        session_timeout: chrono::Duration::from_std(config.session.timeout())
            .context("Session timeout out of range")?,
        max_turns: config.session.effective_max_turns(),
        temperature: config.llm.temperature,
    };
    let handler: Arc<dyn EventHandler> = Arc::new(ConversationOrchestrator::new(
        Arc::clone(&backend),
        store,
        sender,
        orchestrator_config,
    ));

    let state = AppState::new(
        handler,
        backend,
        config.line.channel_secret.as_str(),
        shutdown.clone(),
    );

    // Ctrl-C 触发优雅关闭
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        signal_token.cancel();
    });

    let result = run_server(state, &config.server.bind_address()).await;

    shutdown.cancel();
    if let Some(janitor) = janitor {
        let _ = janitor.await;
    }

    result
}
