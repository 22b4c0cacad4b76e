//! CLI binary for convertorio.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `ClientConfig` / `ConversionRequest` and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use convertorio::{
    ClientConfig, ConversionMetadata, ConversionRequest, ConvertorioClient, Event, EventKind,
    JobStatus, ListJobsQuery,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # PNG → JPG next to the input (photo.jpg)
  convertorio convert photo.png --to jpg

  # WebP at quality 85 into another directory
  convertorio convert photo.png --to webp --quality 85 -o out/photo.webp

  # 16:9 crop from the centre
  convertorio convert banner.jpg --to jpg --aspect-ratio 16:9 --crop-strategy crop-center

  # 32 px favicon
  convertorio convert logo.png --to ico --icon-size 32

  # Account and job history
  convertorio account
  convertorio jobs --limit 10 --status completed
  convertorio job 3f2a9c1e-...

ENVIRONMENT VARIABLES:
  CONVERTORIO_API_KEY     API key (https://convertorio.com/account)
  CONVERTORIO_BASE_URL    Override the API endpoint
  RUST_LOG                Override log filtering (e.g. convertorio=debug)
"#;

/// Convert images and documents with the Convertorio API.
#[derive(Parser, Debug)]
#[command(
    name = "convertorio",
    version,
    about = "Convert images and documents with the Convertorio API",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// API key.
    #[arg(long, env = "CONVERTORIO_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// API base URL.
    #[arg(long, env = "CONVERTORIO_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Skip TLS certificate verification (staging servers only).
    #[arg(long, global = true)]
    insecure: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a local file.
    Convert(ConvertArgs),
    /// Show account information.
    Account,
    /// List recent jobs.
    Jobs {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Filter by status: queued, processing, completed, failed, expired.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Show a single job.
    Job { id: String },
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// File to convert.
    input: PathBuf,

    /// Target format (jpg, png, webp, avif, ico, …).
    #[arg(short, long = "to")]
    to: String,

    /// Output path. Default: input path with the target extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// original, 1:1, 4:3, 16:9, 9:16, 21:9 or custom.
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// fit, crop-center, crop-top, crop-bottom, crop-left or crop-right.
    #[arg(long)]
    crop_strategy: Option<String>,

    /// Compression quality (1–100).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// ICO size: 16, 32, 48, 64, 128 or 256.
    #[arg(long)]
    icon_size: Option<u32>,

    #[arg(long)]
    resize_width: Option<u32>,

    #[arg(long)]
    resize_height: Option<u32>,

    /// Width for --aspect-ratio custom.
    #[arg(long)]
    custom_width: Option<u32>,

    /// Height for --aspect-ratio custom.
    #[arg(long)]
    custom_height: Option<u32>,

    /// Maximum number of status checks.
    #[arg(long, default_value_t = convertorio::config::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Seconds between status checks.
    #[arg(long, default_value_t = 2.0)]
    poll_interval: f64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    Queued,
    Processing,
    Completed,
    Failed,
    Expired,
}

impl From<StatusArg> for JobStatus {
    fn from(v: StatusArg) -> Self {
        match v {
            StatusArg::Queued => JobStatus::Queued,
            StatusArg::Processing => JobStatus::Processing,
            StatusArg::Completed => JobStatus::Completed,
            StatusArg::Failed => JobStatus::Failed,
            StatusArg::Expired => JobStatus::Expired,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries step-by-step feedback, so library INFO logs are
    // muted while it is shown.
    let show_progress = !cli.quiet && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let poll_interval = match &cli.command {
        Command::Convert(args) => Some(poll_interval(args.poll_interval)?),
        _ => None,
    };
    let config = build_config(&cli, poll_interval)?;
    let client = ConvertorioClient::new(config).context("Failed to create client")?;

    match &cli.command {
        Command::Convert(args) => run_convert(&cli, &client, args, show_progress).await,
        Command::Account => {
            let account = client
                .get_account()
                .await
                .context("Failed to get account")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                println!("Account:      {}", account.id);
                if let Some(ref e) = account.email {
                    println!("Email:        {}", e);
                }
                if let Some(ref n) = account.name {
                    println!("Name:         {}", n);
                }
                if let Some(ref p) = account.plan {
                    println!("Plan:         {}", p);
                }
                if let Some(p) = account.points {
                    println!("Points:       {}", p);
                }
                if let Some(d) = account.daily_conversions_remaining {
                    println!("Daily left:   {}", d);
                }
                if let Some(t) = account.total_conversions {
                    println!("Conversions:  {}", t);
                }
            }
            Ok(())
        }
        Command::Jobs {
            limit,
            offset,
            status,
        } => {
            let query = ListJobsQuery {
                limit: *limit,
                offset: *offset,
                status: status.map(JobStatus::from),
            };
            let jobs = client
                .list_jobs(&query)
                .await
                .context("Failed to list jobs")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
            } else if jobs.is_empty() {
                eprintln!("{}", dim("no jobs"));
            } else {
                for job in &jobs {
                    println!(
                        "{}  {:<10}  {} → {}  {}",
                        job.id,
                        job.status,
                        job.source_format.as_deref().unwrap_or("?"),
                        job.target_format.as_deref().unwrap_or("?"),
                        dim(job.created_at.as_deref().unwrap_or("")),
                    );
                }
            }
            Ok(())
        }
        Command::Job { id } => {
            let job = client.get_job(id).await.context("Failed to get job")?;
            println!("{}", serde_json::to_string_pretty(&job)?);
            Ok(())
        }
    }
}

async fn run_convert(
    cli: &Cli,
    client: &ConvertorioClient,
    args: &ConvertArgs,
    show_progress: bool,
) -> Result<()> {
    if show_progress {
        attach_spinner(client);
    }

    let metadata = ConversionMetadata {
        aspect_ratio: args.aspect_ratio.clone(),
        crop_strategy: args.crop_strategy.clone(),
        quality: args.quality,
        icon_size: args.icon_size,
        resize_width: args.resize_width,
        resize_height: args.resize_height,
        custom_width: args.custom_width,
        custom_height: args.custom_height,
        ..Default::default()
    };

    let mut request = ConversionRequest::new(&args.input, &args.to);
    if let Some(ref out) = args.output {
        request = request.output_path(out);
    }
    if !metadata.is_empty() {
        request = request.metadata(metadata);
    }

    let result = client
        .convert(&request)
        .await
        .context("Conversion failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !cli.quiet {
        eprintln!(
            "{}  {} → {}  ({} bytes{})",
            green("✔"),
            result.input_path.display(),
            bold(&result.output_path.display().to_string()),
            result.file_size,
            result
                .processing_time_ms
                .map(|ms| format!(", {ms}ms"))
                .unwrap_or_default(),
        );
    }
    Ok(())
}

/// Wire an indicatif spinner to the client's observers.
fn attach_spinner(client: &ConvertorioClient) {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Preparing");
    bar.enable_steady_tick(Duration::from_millis(80));
    wire_spinner(client, bar);
}

/// Drive `bar` from the observers. Failures are only cleared here; the
/// error itself is reported once, by `main`.
fn wire_spinner(client: &ConvertorioClient, bar: ProgressBar) {
    let bar = Arc::new(bar);

    let b = Arc::clone(&bar);
    client.on(EventKind::Start, move |event| {
        if let Event::Start(s) = event {
            b.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!(
                    "{}  {} → {}",
                    s.file_name,
                    s.source_format.to_uppercase(),
                    s.target_format.to_uppercase()
                ))
            ));
        }
        Ok(())
    });

    let b = Arc::clone(&bar);
    client.on(EventKind::Progress, move |event| {
        if let Event::Progress(p) = event {
            b.set_prefix("Converting");
            b.set_message(p.message.clone());
        }
        Ok(())
    });

    let b = Arc::clone(&bar);
    client.on(EventKind::Status, move |event| {
        if let Event::Status(s) = event {
            b.set_message(format!(
                "{}  {}",
                s.status,
                dim(&format!("check {}/{}", s.attempt, s.max_attempts))
            ));
        }
        Ok(())
    });

    let b = Arc::clone(&bar);
    client.on(EventKind::Complete, move |_| {
        b.finish_and_clear();
        Ok(())
    });

    let b = Arc::clone(&bar);
    client.on(EventKind::Error, move |_| {
        b.finish_and_clear();
        Ok(())
    });
}

/// Map global flags to `ClientConfig`.
fn build_config(cli: &Cli, poll_interval: Option<Duration>) -> Result<ClientConfig> {
    let api_key = cli
        .api_key
        .clone()
        .context("No API key: pass --api-key or set CONVERTORIO_API_KEY")?;

    let mut builder = ClientConfig::builder(api_key).accept_invalid_certs(cli.insecure);
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Command::Convert(args) = &cli.command {
        builder = builder.max_attempts(args.max_attempts);
    }
    if let Some(interval) = poll_interval {
        builder = builder.poll_interval(interval);
    }

    builder.build().context("Invalid configuration")
}

fn poll_interval(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        anyhow::bail!("--poll-interval must be a non-negative number of seconds (got {secs})");
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| anyhow::anyhow!("--poll-interval is too large (got {secs})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use convertorio::{ErrorEvent, ErrorKind};

    #[test]
    fn poll_interval_accepts_fractions() {
        assert_eq!(poll_interval(0.5).unwrap(), Duration::from_millis(500));
        assert_eq!(poll_interval(0.0).unwrap(), Duration::ZERO);
    }

    #[test]
    fn poll_interval_rejects_out_of_range_values() {
        for secs in [-1.0, f64::NAN, f64::INFINITY, 1e20] {
            assert!(poll_interval(secs).is_err(), "{secs} accepted");
        }
    }

    #[test]
    fn spinner_error_observer_only_clears_the_bar() {
        let config = ClientConfig::builder("key").build().unwrap();
        let client = ConvertorioClient::new(config).unwrap();
        let bar = ProgressBar::hidden();
        wire_spinner(&client, bar.clone());

        client
            .events()
            .emit(&Event::Error(ErrorEvent {
                error: "Conversion failed: bad input".into(),
                kind: ErrorKind::ConversionFailed,
                input_path: PathBuf::from("photo.png"),
                target_format: "jpg".into(),
            }))
            .unwrap();

        assert!(bar.is_finished());
        assert_eq!(client.events().observer_count(EventKind::Error), 1);
    }

    #[test]
    fn convert_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "convertorio",
            "--api-key",
            "k",
            "convert",
            "photo.png",
            "--to",
            "webp",
            "--quality",
            "85",
            "--poll-interval",
            "0.5",
        ])
        .unwrap();
        match cli.command {
            Command::Convert(args) => {
                assert_eq!(args.to, "webp");
                assert_eq!(args.quality, Some(85));
                assert_eq!(args.poll_interval, 0.5);
            }
            other => panic!("expected convert, got {other:?}"),
        }
    }
}
