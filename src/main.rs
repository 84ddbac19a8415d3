// ABOUTME: Main entry point for the AI Guide command line and HTTP service
// ABOUTME: Initializes logging and config, builds the runtime, store, and queue, then dispatches subcommands

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use guide::backends::replay::ReplayRuntime;
use guide::config::Config;
use guide::orchestrator::GuideSettings;
use guide::queue::{run_log_worker, ChannelQueue};
use guide::store::SqliteMessageStore;
use guide::{
    server, AgentRuntime, ChatRequest, GuideReply, GuideService, MessageStore, ReplyOutcome,
    RuntimeRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// AI Guide: answers learner questions through a streaming agent runtime.
#[derive(Parser, Debug)]
#[command(name = "guide", version, about)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask one question and print the reply
    Ask {
        message: String,
        #[arg(long, default_value = "cli-user")]
        user: String,
        #[arg(long, default_value = "cli")]
        conversation: String,
        /// Explicit session id; derived from user and conversation when omitted
        #[arg(long)]
        session: Option<String>,
    },
    /// Play a recorded transcript through the reply pipeline
    Replay {
        transcript: PathBuf,
        /// Only replay this prompt
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Run the HTTP API
    Serve,
    /// Print the stored messages of a conversation
    History {
        conversation: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so replies on stdout stay clean
    let json = cli.json_logs;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!(
        runtime = %config.runtime.backend_type(),
        store = %config.store.path,
        timeout_secs = ?config.guide.timeout_secs,
        "Configuration loaded"
    );

    match cli.command {
        Command::Ask {
            message,
            user,
            conversation,
            session,
        } => {
            let service = build_service(&config, runtime_from_config(&config)?, open_store(&config)?);
            let mut request = ChatRequest::new(user, conversation, message);
            request.session_id = session;
            ask(&service, request).await
        }
        Command::Replay { transcript, prompt } => {
            let runtime = ReplayRuntime::from_file(&transcript)?;
            let prompts = match prompt {
                Some(p) => vec![p],
                None => runtime.prompts(),
            };
            let store = Arc::new(SqliteMessageStore::open_in_memory()?);
            let service = GuideService::new(Arc::new(runtime), store, GuideSettings::from(&config));

            for prompt in prompts {
                println!("> {}", prompt);
                ask(&service, ChatRequest::new("replay", "replay", prompt)).await?;
                println!();
            }
            Ok(())
        }
        Command::Serve => serve(config).await,
        Command::History {
            conversation,
            limit,
        } => {
            let store = open_store(&config)?;
            let messages = store.conversation(&conversation, limit).await?;
            if messages.is_empty() {
                println!("No messages in conversation {}", conversation);
            }
            for message in messages {
                println!(
                    "[{}] {}: {}",
                    message.created_at.format("%Y-%m-%d %H:%M:%S"),
                    message.sender,
                    message.body
                );
            }
            Ok(())
        }
    }
}

fn runtime_from_config(config: &Config) -> Result<Arc<dyn AgentRuntime>> {
    let registry = RuntimeRegistry::default();
    registry
        .create_from_config(&config.runtime)
        .with_context(|| format!("Failed to create runtime '{}'", config.runtime.backend_type()))
}

fn open_store(config: &Config) -> Result<Arc<dyn MessageStore>> {
    let store = SqliteMessageStore::new(&config.store.path)?;
    tracing::info!(path = %config.store.path, "Message store initialized");
    Ok(Arc::new(store))
}

fn build_service(
    config: &Config,
    runtime: Arc<dyn AgentRuntime>,
    store: Arc<dyn MessageStore>,
) -> GuideService {
    let service = GuideService::new(runtime, store, GuideSettings::from(config));
    if !config.guide.notify {
        return service;
    }

    let (queue, rx) = ChannelQueue::new(config.guide.queue_capacity);
    tokio::spawn(run_log_worker(rx));
    service.with_queue(Arc::new(queue))
}

/// Answer one request, cancelling on Ctrl-C, and print the reply
async fn ask(service: &GuideService, request: ChatRequest) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let reply = service.respond(request, cancel).await;
    interrupt.abort();

    print_reply(&reply);
    if reply.outcome == ReplyOutcome::Cancelled {
        anyhow::bail!("Request cancelled");
    }
    Ok(())
}

fn print_reply(reply: &GuideReply) {
    println!("{}", reply.text);
    for (i, citation) in reply.citations.iter().enumerate() {
        match (&citation.source, &citation.text) {
            (Some(source), _) => println!("  [{}] {}", i + 1, source),
            (None, Some(text)) => println!("  [{}] \"{}\"", i + 1, text),
            (None, None) => {}
        }
    }
    tracing::debug!(outcome = %reply.outcome, session_id = %reply.session_id, "Reply printed");
}

async fn serve(config: Config) -> Result<()> {
    let metrics_handle =
        guide::metrics::init_metrics().context("Failed to initialize Prometheus metrics")?;

    let runtime = runtime_from_config(&config)?;
    let store = open_store(&config)?;
    let service = Arc::new(build_service(&config, runtime, store));

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            on_signal.cancel();
        }
    });

    let app = server::router(service, config.http.api_key.clone(), metrics_handle);
    server::serve(&config.http, app, shutdown).await
}
