//! hookci server binary.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: load `.hookci/config.toml`, apply flag
//!    overrides, and validate the result.
//! 2. **Wire observability**: install `tracing-subscriber` (JSON or text) and,
//!    when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an OTLP span exporter.
//! 3. **Construct infrastructure**: the GitHub status client (or a logging
//!    stand-in without a token), the dispatcher, the engine, and the router.
//! 4. **Run**: optionally register repository webhooks, serve until Ctrl-C or
//!    SIGTERM, remove the webhooks again, and let queued hook runs finish.

mod config;
mod observability;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use github::{DisabledPublisher, GitHubStatusClient, WebhookRegistrar};
use listener::AppState;
use pipeline::{CommitStatusPublisher, DeliveryLog, DescriptorExtractor, TraceStore};
use runner::{CiEngine, Dispatcher, HookResolver, StatusReporter, TaskExecutor};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::{ServerConfig, DEFAULT_CONFIG_PATH};
use crate::observability::LogFormat;

#[derive(Parser)]
#[command(name = "hookci", version)]
#[command(about = "Run repository hook scripts on GitHub webhooks and report commit statuses")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Start the webhook server
    Serve(ServeArgs),

    /// Validate the configuration file and print the resolved settings
    CheckConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    hooks_dir: Option<PathBuf>,

    /// Per-hook timeout
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Token for commit statuses and webhook registration; without one,
    /// statuses are only logged
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,
}

impl ServeArgs {
    fn apply_overrides(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(hooks_dir) = &self.hooks_dir {
            config.hooks_dir = hooks_dir.clone();
        }
        if let Some(timeout) = self.timeout {
            config.script_timeout_secs = timeout;
        }
    }

    fn token(&self) -> Option<String> {
        self.github_token.clone().filter(|t| !t.trim().is_empty())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = observability::init(cli.log_format)?;

    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::CheckConfig { config } => check_config(&config),
    };
    if let Err(e) = &result {
        error!(error = ?e, "hookci exited with an error");
    }

    telemetry.shutdown();
    result
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = ServerConfig::load(path)?;
    let repos = config.validate()?;
    let rendered = toml::to_string_pretty(&config).context("failed to render configuration")?;

    println!("{rendered}");
    println!("# {} repositories, public URL {}", repos.len(), config.public_url());
    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = ServerConfig::load(&args.config)?;
    args.apply_overrides(&mut config);
    let repos = config.validate()?;

    tokio::fs::create_dir_all(&config.workspace_root)
        .await
        .with_context(|| format!("failed to create {}", config.workspace_root.display()))?;

    let token = args.token();
    let publisher: Arc<dyn CommitStatusPublisher> = match &token {
        Some(token) => Arc::new(GitHubStatusClient::new(token.clone())),
        None => {
            warn!("no GitHub token configured; commit statuses will only be logged");
            Arc::new(DisabledPublisher)
        }
    };

    let traces = TraceStore::new();
    let executor = TaskExecutor::new(config.executor_config(), traces.clone());
    let reporter = StatusReporter::new(publisher, config.trace_base_url());
    let (dispatcher, worker) = Dispatcher::start(executor, reporter);

    let engine = CiEngine::new(
        DescriptorExtractor::new(config.api_base.clone()),
        HookResolver::new(&config.hooks_dir, repos.iter().cloned()),
        dispatcher,
        &config.workspace_root,
    );

    let registrar = match (&token, config.register_webhooks) {
        (Some(token), true) => Some(WebhookRegistrar::new(
            &config.api_base,
            token.clone(),
            config.public_url(),
        )),
        (None, true) => {
            warn!("register_webhooks is set but no GitHub token is available; skipping");
            None
        }
        (_, false) => None,
    };
    let registered = match &registrar {
        Some(registrar) => registrar.register_all(&repos).await,
        None => Vec::new(),
    };

    let socket = TcpListener::bind(config.socket_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.socket_addr()))?;
    info!(
        repositories = repos.len(),
        hooks_dir = %config.hooks_dir.display(),
        public_url = %config.public_url(),
        "hookci started"
    );

    let app = listener::router(AppState::new(engine, traces, DeliveryLog::new()));
    listener::serve(socket, app, shutdown_signal())
        .await
        .context("webhook listener failed")?;

    if let Some(registrar) = &registrar {
        registrar.unregister_all(&registered).await;
    }

    // The router held the last dispatch handles; the worker now drains.
    info!("waiting for queued hook runs to finish");
    worker.await.context("dispatcher task failed")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_file_values() {
        let cli = Cli::try_parse_from([
            "hookci",
            "serve",
            "--port",
            "9000",
            "--hooks-dir",
            "/srv/hooks",
            "--timeout",
            "30",
        ])
        .unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        let mut config = ServerConfig::parse(r#"repos = ["A/B"]"#).unwrap();
        args.apply_overrides(&mut config);

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.hooks_dir, PathBuf::from("/srv/hooks"));
        assert_eq!(config.script_timeout_secs, 30);
    }

    #[test]
    fn test_blank_token_disables_reporting() {
        let cli = Cli::try_parse_from(["hookci", "serve", "--github-token", "  "]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.token(), None);
    }

    #[test]
    fn test_log_format_is_global() {
        let cli = Cli::try_parse_from(["hookci", "check-config", "--log-format", "text"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Text);
    }
}
