//! # copycheck CLI
//!
//! ```bash
//! copycheck --config ./config/copycheck.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `copycheck init` | Create the SQLite database and run schema migrations |
//! | `copycheck serve` | Start the HTTP API |
//! | `copycheck submit <file>` | Submit a file and print the plagiarism check |
//! | `copycheck report <work_id>` | Show the latest report of a work |
//! | `copycheck reports --assignment <id>` | Show reports for a whole assignment |
//! | `copycheck compare <a> <b>` | Score two local files against each other |
//! | `copycheck wordcloud <work_id>` | Print a word-cloud URL for a work |

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use copycheck::config::{self, Config};
use copycheck::reports::print_report;
use copycheck::services::Services;
use copycheck::submission::SubmitRequest;
use copycheck::{migrate, server};
use copycheck_core::extract::{resolve_media_type, MIME_TEXT_MARKDOWN, MIME_TEXT_PLAIN};
use copycheck_core::similarity::{ShingleDetector, DEFAULT_SHINGLE_LEN};

/// copycheck: plagiarism checks for assignment submissions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/copycheck.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "copycheck", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/copycheck.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Submit a file for an assignment and print the result.
    Submit {
        /// File to submit (`.txt`, `.md`, `.markdown`).
        file: PathBuf,

        /// Assignment UUID.
        #[arg(long)]
        assignment: String,

        /// Student UUID.
        #[arg(long)]
        student: String,

        /// Override the media type guessed from the file extension.
        #[arg(long)]
        media_type: Option<String>,
    },

    /// Show the latest report for a work.
    Report {
        /// Work UUID.
        work_id: String,
    },

    /// Show the latest report of every work in an assignment.
    Reports {
        /// Assignment UUID.
        #[arg(long)]
        assignment: String,
    },

    /// Score two local text files without touching the database.
    Compare {
        a: PathBuf,
        b: PathBuf,

        /// Words per shingle.
        #[arg(long, default_value_t = DEFAULT_SHINGLE_LEN)]
        shingle_len: usize,
    },

    /// Print a word-cloud URL for a work's text.
    Wordcloud {
        /// Work UUID.
        work_id: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn parse_uuid(raw: &str, what: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("invalid {}: {}", what, raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config;
    let load = || config::load_config(&config_path);

    match cli.command {
        Commands::Init => {
            let cfg = load()?;
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            let cfg = load()?;
            server::run_server(&cfg).await?;
        }
        Commands::Submit {
            file,
            assignment,
            student,
            media_type,
        } => {
            let cfg = load()?;
            run_submit(&cfg, &file, &assignment, &student, media_type.as_deref()).await?;
        }
        Commands::Report { work_id } => {
            let cfg = load()?;
            let work_id = parse_uuid(&work_id, "work id")?;
            let services = Services::open(&cfg).await?;
            let result = services.reports.get_report(work_id).await;
            services.close().await;
            print_report(&result?);
        }
        Commands::Reports { assignment } => {
            let cfg = load()?;
            let assignment_id = parse_uuid(&assignment, "assignment id")?;
            let services = Services::open(&cfg).await?;
            let result = services.reports.list_for_assignment(assignment_id).await;
            services.close().await;
            let reports = result?;
            if reports.is_empty() {
                println!("No reports for assignment {}.", assignment_id);
            }
            for (i, report) in reports.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print_report(report);
            }
        }
        Commands::Wordcloud { work_id } => {
            let cfg = load()?;
            let work_id = parse_uuid(&work_id, "work id")?;
            let services = Services::open(&cfg).await?;
            let result = services.word_clouds.for_work(work_id).await;
            services.close().await;
            println!("{}", result?.word_cloud_url);
        }
        // Needs no config or database.
        Commands::Compare { a, b, shingle_len } => run_compare(&a, &b, shingle_len)?,
    }

    Ok(())
}

async fn run_submit(
    cfg: &Config,
    file: &Path,
    assignment: &str,
    student: &str,
    media_type: Option<&str>,
) -> anyhow::Result<()> {
    let assignment_id = parse_uuid(assignment, "assignment id")?;
    let student_id = parse_uuid(student, "student id")?;

    let bytes = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    if bytes.len() > cfg.server.max_upload_bytes {
        bail!(
            "{} is larger than the {} byte limit",
            file.display(),
            cfg.server.max_upload_bytes
        );
    }
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let media_type = resolve_media_type(media_type, &file_name);
    if media_type != MIME_TEXT_PLAIN && media_type != MIME_TEXT_MARKDOWN {
        bail!("unsupported media type {} for {}", media_type, file.display());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let services = Services::open(cfg).await?;
    let request = SubmitRequest {
        assignment_id,
        student_id,
        file_name,
        media_type,
        bytes,
    };
    let result = services.submissions.submit(request, &cancel).await;
    services.close().await;
    let outcome = result?;

    println!("work_id:        {}", outcome.work.id);
    println!("content_hash:   {}", outcome.content.content_hash);
    println!("score:          {:.4}", outcome.report.score);
    println!("is_plagiarized: {}", outcome.report.is_plagiarized);
    if let Some(matched) = outcome.report.matched_work_id {
        println!("matched_work:   {}", matched);
    }
    Ok(())
}

fn run_compare(a: &Path, b: &Path, shingle_len: usize) -> anyhow::Result<()> {
    if shingle_len == 0 {
        bail!("--shingle-len must be > 0");
    }
    let read = |p: &Path| {
        std::fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display()))
    };
    let detector = ShingleDetector::new(shingle_len);
    let score = detector.score(&read(a)?, &read(b)?);
    println!("{:.4}", score);
    Ok(())
}
