mod transcript;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

use recap::summarize::{TriggerOutcome, truncate_preview};
use recap::{
    ChatHost, ConversationId, LoggingHooks, Message, RecapSettings, SessionBuilder,
    SessionOutcome, StorageConfig, SummarizationSession,
};

use crate::transcript::{Transcript, TranscriptHost};

#[derive(Parser)]
#[command(name = "recap")]
#[command(about = "Progressive summarization for chat transcripts")]
#[command(version)]
struct Cli {
    /// Settings file (YAML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Where summaries and settings are stored when the settings file names no storage
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the stored summaries of a conversation
    Status {
        conversation: String,
    },
    /// Feed a transcript one message at a time, summarizing whenever the threshold is reached
    Replay {
        transcript: PathBuf,
        /// Print the projected context after the last message
        #[arg(long)]
        show_context: bool,
    },
    /// Summarize the pending messages of a transcript now
    Summarize {
        transcript: PathBuf,
    },
    /// Print the context that would be sent to the model
    Project {
        transcript: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Delete every summary of a conversation
    Clear {
        conversation: String,
    },
    /// Show or change summarization settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Enable,
    Disable,
    /// Set the token threshold that triggers summarization
    Threshold {
        tokens: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match &cli.command {
        Commands::Status { conversation } => {
            let host = TranscriptHost::new(ConversationId::new(conversation.as_str()));
            let session = open_session(&cli, Arc::new(host)).await?;
            print_status(&session);
        }
        Commands::Replay {
            transcript,
            show_context,
        } => replay(&cli, transcript, *show_context).await?,
        Commands::Summarize { transcript } => {
            let host: TranscriptHost = Transcript::load(transcript)?.into();
            let session = open_session(&cli, Arc::new(host)).await?;
            let outcome = session.manual_summarize_now().await?;
            report(&outcome);
        }
        Commands::Project { transcript, json } => {
            let host: TranscriptHost = Transcript::load(transcript)?.into();
            let session = open_session(&cli, Arc::new(host)).await?;
            let context = session.prepare_context().await;
            if *json {
                println!("{}", serde_json::to_string_pretty(&context)?);
            } else {
                print_context(&context);
            }
        }
        Commands::Clear { conversation } => {
            let host = TranscriptHost::new(ConversationId::new(conversation.as_str()));
            let session = open_session(&cli, Arc::new(host)).await?;
            let removed = session.summaries().len();
            session.clear_all().await?;
            println!("Summaries cleared ({} removed)", removed);
        }
        Commands::Config { action } => {
            let session = open_session(&cli, Arc::new(NoConversation)).await?;
            match action {
                None | Some(ConfigAction::Show) => {}
                Some(ConfigAction::Enable) => session.set_enabled(true).await?,
                Some(ConfigAction::Disable) => session.set_enabled(false).await?,
                Some(ConfigAction::Threshold { tokens }) => {
                    session.set_token_threshold(*tokens).await?
                }
            }
            println!("{}", serde_json::to_string_pretty(&session.config())?);
        }
    }

    Ok(())
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "recap=debug" } else { "recap=info" };
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()))
        .with_writer(std::io::stderr)
        .init();
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("recap"))
        .context("Could not determine a data directory; pass --data-dir")
}

async fn open_session(
    cli: &Cli,
    host: Arc<dyn ChatHost>,
) -> anyhow::Result<SummarizationSession> {
    let settings = match &cli.config {
        Some(path) => RecapSettings::from_yaml_file(path)?,
        None => RecapSettings::default(),
    };
    let uses_default_storage = settings.storage == StorageConfig::None;

    let mut builder = SessionBuilder::from_settings(settings)?;
    if uses_default_storage || cli.data_dir.is_some() {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        debug!(path = %data_dir.display(), "Using file storage");
        builder = builder.storage_config(StorageConfig::File {
            path: data_dir.display().to_string(),
        });
    }

    let session = builder
        .host(host)
        .hooks(Arc::new(LoggingHooks::default()))
        .build()
        .await?;
    session.sync_conversation().await?;
    Ok(session)
}

async fn replay(cli: &Cli, path: &Path, show_context: bool) -> anyhow::Result<()> {
    let transcript = Transcript::load(path)?;
    let host = Arc::new(TranscriptHost::new(transcript.conversation_id.clone()));
    let session = open_session(cli, host.clone()).await?;

    if !session.is_enabled() {
        bail!("Summarization is disabled; run `recap config enable` first");
    }

    for message in transcript.messages {
        let speaker = message.display_speaker().to_string();
        host.push(message);
        let outcome = session.on_message_appended().await?;
        if outcome.summarized().is_some() {
            print!("after message {} ({}): ", host.len(), speaker);
            report(&outcome);
        }
    }

    println!(
        "{} messages, {} summarized, {} pending tokens",
        host.len(),
        session.summarized_count(),
        session.pending_token_count()
    );

    if show_context {
        println!();
        print_context(&session.prepare_context().await);
    }
    Ok(())
}

fn report(outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::Disabled => println!("Summarization is disabled"),
        SessionOutcome::NoActiveConversation => println!("No active conversation"),
        SessionOutcome::Cleared => println!("Summaries cleared"),
        SessionOutcome::Triggered(TriggerOutcome::Waiting { pending_tokens }) => {
            println!("Waiting ({} pending tokens)", pending_tokens)
        }
        SessionOutcome::Triggered(TriggerOutcome::NothingToSummarize) => {
            println!("Nothing to summarize")
        }
        SessionOutcome::Triggered(TriggerOutcome::Busy) => {
            println!("A summarization is already running")
        }
        SessionOutcome::Triggered(TriggerOutcome::Summarized { record, persisted }) => {
            println!(
                "Summarized {} messages (~{} tokens){}",
                record.source_message_count,
                record.source_token_count,
                if *persisted { "" } else { " [not saved]" }
            );
            println!("  {}", record.text);
        }
    }
}

fn print_status(session: &SummarizationSession) {
    let config = session.config();
    println!(
        "Conversation: {}",
        session
            .active_conversation()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Enabled: {}  Threshold: {} tokens  Backend: {}",
        config.enabled,
        config.token_threshold,
        session.backend_name()
    );
    println!(
        "Summaries: {}  Summarized messages: {}",
        session.summaries().len(),
        session.summarized_count()
    );

    for (i, summary) in session.summaries().iter().enumerate() {
        let created = summary.created_at.with_timezone(&chrono::Local);
        println!(
            "\nSummary {} ({}, {} messages)",
            i + 1,
            created.format("%Y-%m-%d %H:%M"),
            summary.source_message_count
        );
        println!("  {}", truncate_preview(&summary.text, 300));
    }
}

fn print_context(context: &[Message]) {
    for message in context {
        println!("[{}] {}", message.display_speaker(), message.text);
    }
}

/// Host with nothing open, for commands that only touch settings.
struct NoConversation;

#[async_trait::async_trait]
impl ChatHost for NoConversation {
    async fn active_conversation_id(&self) -> Option<ConversationId> {
        None
    }

    async fn live_messages(&self) -> Vec<Message> {
        Vec::new()
    }
}
