//! `loyalty-upload` -- command-line client for the upload queue.
//!
//! Submits spreadsheets, follows their processing until a terminal state,
//! and inspects or cancels existing jobs.
//!
//! # Environment variables
//!
//! | Variable           | Required | Default                 | Description              |
//! |--------------------|----------|-------------------------|--------------------------|
//! | `UPLOAD_QUEUE_URL` | no       | `http://localhost:3000` | API origin (`--api-url`) |
//! | `RUST_LOG`         | no       | `loyalty_tracker=info`  | Log filter               |

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use loyalty_core::upload_job::{JobStatus, UploadJob, DEFAULT_RECENT_LIMIT};
use loyalty_tracker::client::QueueClient;
use loyalty_tracker::display::render_line;
use loyalty_tracker::poller::spawn_poller;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "loyalty-upload", version, about = "Submit and track loyalty transaction uploads")]
struct Cli {
    /// Upload queue API origin.
    #[arg(long, env = "UPLOAD_QUEUE_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Seconds between status polls while following a job.
    #[arg(long, default_value_t = 2)]
    interval_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a spreadsheet and follow the job until it finishes.
    Submit {
        file: PathBuf,
        #[arg(long)]
        branch: String,
        /// Print the job id and exit without following.
        #[arg(long)]
        no_follow: bool,
    },
    /// Show the status of one or more jobs.
    Status {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List the most recent jobs, newest first.
    Recent {
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
    /// Request cancellation of a job.
    Cancel { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loyalty_tracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let client = QueueClient::new(&cli.api_url)?;
    let colored = std::io::stdout().is_terminal();

    match cli.command {
        Command::Submit {
            file,
            branch,
            no_follow,
        } => {
            let submitted = client
                .submit_file(&file, &branch)
                .await
                .with_context(|| format!("submitting {}", file.display()))?;
            println!("{} ({})", submitted.message, submitted.job_id);

            if no_follow {
                return Ok(ExitCode::SUCCESS);
            }

            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let job = UploadJob::submitted(submitted.job_id, file_name, branch);
            let interval = Duration::from_secs(cli.interval_secs.max(1));
            let status = follow(client, job, interval, colored).await?;

            Ok(if status == JobStatus::Completed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Status { ids } => {
            if let [id] = ids.as_slice() {
                let job = client.job_status(id).await?;
                println!("{}", render_line(&job, colored));
                return Ok(ExitCode::SUCCESS);
            }

            let jobs = client.batch_status(&ids).await?;
            for job in &jobs {
                println!("{}", render_line(job, colored));
            }
            if jobs.len() < ids.len() {
                eprintln!("{} of {} jobs could not be found", ids.len() - jobs.len(), ids.len());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Recent { limit } => {
            let jobs = client.recent(limit).await?;
            if jobs.is_empty() {
                println!("No recent uploads");
            }
            for job in &jobs {
                println!("{}", render_line(job, colored));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Cancel { id } => {
            let ack = client.cancel(&id).await?;
            println!("{}", ack.message);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Poll `job` until it leaves the active collection. Ctrl-C cancels the job
/// once; a second Ctrl-C stops following.
async fn follow(
    client: QueueClient,
    job: UploadJob,
    interval: Duration,
    colored: bool,
) -> anyhow::Result<JobStatus> {
    let id = job.id.clone();
    let handle = spawn_poller(Arc::new(client), interval);
    let mut updates = handle.subscribe();
    handle.track(job).await;

    let mut last_line = String::new();
    let mut cancel_requested = false;

    let status = loop {
        let current = handle.snapshot().find(&id).cloned();
        if let Some(job) = &current {
            let line = render_line(job, colored);
            if line != last_line {
                println!("{line}");
                last_line = line;
            }
            if job.status.is_terminal() {
                break job.status;
            }
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    anyhow::bail!("status poller stopped unexpectedly");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for Ctrl-C")?;
                if cancel_requested {
                    tracing::warn!(job_id = %id, "Stopped following job");
                    break JobStatus::Failed;
                }
                cancel_requested = true;
                eprintln!("Cancelling {id} (press Ctrl-C again to stop waiting)");
                handle.cancel_job(id.clone()).await;
            }
        }
    };

    handle.stop().await;
    Ok(status)
}
