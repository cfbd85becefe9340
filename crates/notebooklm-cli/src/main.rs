//! Command-line front-end for the NotebookLM client.
//!
//! Thin layer over the library: argument parsing, output formatting, and
//! the poll loop for generation tasks. Exits 0 on success, 1 on any error
//! with a one-line message on stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use notebooklm::{
    login, storage, AudioFormat, AudioLength, Client, GenerationStatus, VideoFormat, VideoStyle,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "notebooklm", version, about = "Unofficial NotebookLM client")]
struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Path to the storage-state file (defaults to ~/.notebooklm/storage_state.json).
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with a browser (credentials are stored locally).
    Login,
    /// Check authentication status.
    Status,
    /// List all notebooks.
    List,
    /// Create a new notebook.
    Create { title: String },
    /// Delete a notebook.
    Delete { notebook_id: String },
    /// Rename a notebook.
    Rename { notebook_id: String, new_title: String },
    /// Manage sources in a notebook.
    #[command(subcommand)]
    Source(SourceCommand),
    /// Ask a question against a notebook's sources.
    Ask { notebook_id: String, question: String },
    /// Generate an audio overview.
    Audio {
        notebook_id: String,
        #[arg(long, default_value = "deep-dive")]
        audio_format: AudioFormat,
        #[arg(long, default_value = "default")]
        length: AudioLength,
        /// Poll until the task finishes.
        #[arg(long)]
        wait: bool,
    },
    /// Generate a video overview.
    Video {
        notebook_id: String,
        #[arg(long, default_value = "briefing")]
        video_format: VideoFormat,
        #[arg(long, default_value = "classroom")]
        style: VideoStyle,
        /// Poll until the task finishes.
        #[arg(long)]
        wait: bool,
    },
    /// List generated artifacts.
    Artifacts { notebook_id: String },
    /// Download a completed artifact.
    #[command(subcommand)]
    Download(DownloadCommand),
}

#[derive(Subcommand)]
enum SourceCommand {
    /// List sources.
    List { notebook_id: String },
    /// Add a URL source (YouTube links are detected automatically).
    Add { notebook_id: String, url: String },
    /// Upload a local file as a source.
    File { notebook_id: String, path: PathBuf },
    /// Add a text source; the body is read from stdin.
    Text { notebook_id: String, title: String },
    /// Delete a source.
    Delete { notebook_id: String, source_id: String },
    /// Rename a source.
    Rename {
        notebook_id: String,
        source_id: String,
        new_title: String,
    },
}

#[derive(Subcommand)]
enum DownloadCommand {
    /// Download the latest completed audio overview.
    Audio {
        notebook_id: String,
        output: PathBuf,
        #[arg(long)]
        artifact_id: Option<String>,
    },
    /// Download the latest completed video overview.
    Video {
        notebook_id: String,
        output: PathBuf,
        #[arg(long)]
        artifact_id: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Login => {
            tokio::task::spawn_blocking(login::interactive_login)
                .await
                .context("login task failed")??;
            Ok(())
        }
        Command::Status => status(cli.storage.as_deref()).await,
        command => {
            let client = Client::from_storage(cli.storage.as_deref())
                .context("no credentials; run `notebooklm login` first")?;
            dispatch(&client, command, cli.format).await
        }
    }
}

async fn status(storage_path: Option<&std::path::Path>) -> Result<()> {
    if storage_path.is_none() && !storage::storage_exists() {
        println!("Not logged in (no stored credentials)");
        return Ok(());
    }
    let client = Client::from_storage(storage_path)?;
    match client.refresh_tokens().await {
        Ok(()) => println!("Logged in (session tokens refreshed)"),
        Err(err) if err.is_auth_error() => {
            println!("Credentials present but expired; run `notebooklm login`")
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

async fn dispatch(client: &Client, command: Command, format: OutputFormat) -> Result<()> {
    match command {
        Command::Login | Command::Status => unreachable!("handled in run"),
        Command::List => {
            let notebooks = client.list_notebooks().await?;
            match format {
                OutputFormat::Json => print_json(&notebooks)?,
                OutputFormat::Text => {
                    for nb in &notebooks {
                        let sources = nb
                            .source_count
                            .map(|n| format!("  ({n} sources)"))
                            .unwrap_or_default();
                        println!("{}  {}{}", nb.id, nb.title, sources);
                    }
                }
            }
            Ok(())
        }
        Command::Create { title } => {
            let notebook = client.create_notebook(&title).await?;
            match format {
                OutputFormat::Json => print_json(&notebook)?,
                OutputFormat::Text => println!("Created {}  {}", notebook.id, notebook.title),
            }
            Ok(())
        }
        Command::Delete { notebook_id } => {
            client.delete_notebook(&notebook_id).await?;
            println!("Deleted {notebook_id}");
            Ok(())
        }
        Command::Rename {
            notebook_id,
            new_title,
        } => {
            client.rename_notebook(&notebook_id, &new_title).await?;
            println!("Renamed {notebook_id} to {new_title:?}");
            Ok(())
        }
        Command::Source(source) => dispatch_source(client, source, format).await,
        Command::Ask {
            notebook_id,
            question,
        } => {
            let result = client.ask(&notebook_id, &question, &[]).await?;
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => println!("{}", result.answer),
            }
            Ok(())
        }
        Command::Audio {
            notebook_id,
            audio_format,
            length,
            wait,
        } => {
            let task = client
                .generate_audio(&notebook_id, Some(audio_format), Some(length))
                .await?;
            report_generation(client, &notebook_id, task, wait, format).await
        }
        Command::Video {
            notebook_id,
            video_format,
            style,
            wait,
        } => {
            let task = client
                .generate_video(&notebook_id, video_format, style)
                .await?;
            report_generation(client, &notebook_id, task, wait, format).await
        }
        Command::Artifacts { notebook_id } => {
            let artifacts = client.list_artifacts(&notebook_id).await?;
            match format {
                OutputFormat::Json => print_json(&artifacts)?,
                OutputFormat::Text => {
                    for artifact in &artifacts {
                        println!(
                            "{}  [{:?}] {}  {}",
                            artifact.id, artifact.artifact_type, artifact.status, artifact.title
                        );
                    }
                }
            }
            Ok(())
        }
        Command::Download(download) => {
            match download {
                DownloadCommand::Audio {
                    notebook_id,
                    output,
                    artifact_id,
                } => {
                    client
                        .download_audio(&notebook_id, &output, artifact_id.as_deref())
                        .await?;
                    println!("Saved {}", output.display());
                }
                DownloadCommand::Video {
                    notebook_id,
                    output,
                    artifact_id,
                } => {
                    client
                        .download_video(&notebook_id, &output, artifact_id.as_deref())
                        .await?;
                    println!("Saved {}", output.display());
                }
            }
            Ok(())
        }
    }
}

async fn dispatch_source(
    client: &Client,
    command: SourceCommand,
    format: OutputFormat,
) -> Result<()> {
    match command {
        SourceCommand::List { notebook_id } => {
            let sources = client.list_sources(&notebook_id).await?;
            match format {
                OutputFormat::Json => print_json(&sources)?,
                OutputFormat::Text => {
                    for source in &sources {
                        println!(
                            "{}  [{}] {}  {}",
                            source.id,
                            source.source_type.as_str(),
                            source.status.as_str(),
                            source.title
                        );
                    }
                }
            }
            Ok(())
        }
        SourceCommand::Add { notebook_id, url } => {
            let source = client.add_source_url(&notebook_id, &url).await?;
            print_source(&source, format)
        }
        SourceCommand::File { notebook_id, path } => {
            let source = client.add_source_file(&notebook_id, &path).await?;
            print_source(&source, format)
        }
        SourceCommand::Text { notebook_id, title } => {
            let content = std::io::read_to_string(std::io::stdin())
                .context("failed to read source text from stdin")?;
            let source = client.add_source_text(&notebook_id, &title, &content).await?;
            print_source(&source, format)
        }
        SourceCommand::Delete {
            notebook_id,
            source_id,
        } => {
            client.delete_source(&notebook_id, &source_id).await?;
            println!("Deleted source {source_id}");
            Ok(())
        }
        SourceCommand::Rename {
            notebook_id,
            source_id,
            new_title,
        } => {
            client
                .rename_source(&notebook_id, &source_id, &new_title)
                .await?;
            println!("Renamed source {source_id} to {new_title:?}");
            Ok(())
        }
    }
}

fn print_source(source: &notebooklm::Source, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(source)?,
        OutputFormat::Text => println!(
            "Added {}  [{}] {}",
            source.id,
            source.source_type.as_str(),
            source.title
        ),
    }
    Ok(())
}

/// Print the submit result, then optionally poll the task to completion.
/// The task keeps running server-side either way; re-running `artifacts`
/// later will still find the result.
async fn report_generation(
    client: &Client,
    notebook_id: &str,
    task: GenerationStatus,
    wait: bool,
    format: OutputFormat,
) -> Result<()> {
    if !wait {
        match format {
            OutputFormat::Json => print_json(&task)?,
            OutputFormat::Text => {
                println!("Task {} submitted ({})", task.task_id, task.status)
            }
        }
        return Ok(());
    }

    let mut status = task;
    while !status.is_done() {
        eprintln!("Task {}: {}", status.task_id, status.status);
        tokio::time::sleep(POLL_INTERVAL).await;
        status = client.poll_generation(notebook_id, &status.task_id).await?;
    }

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Text => {
            if status.status == "failed" {
                anyhow::bail!(
                    "generation failed: {}",
                    status.error.as_deref().unwrap_or("unknown error")
                );
            }
            println!("Task {} completed", status.task_id);
            if let Some(url) = &status.download_url {
                println!("Download URL: {url}");
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
