use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use newsgram::broadcast::{EventKind, JobProgressEvent, JobRecord, JobStatus};
use newsgram::config::{load_config, Config};
use newsgram::{
    export, telemetry, JobOptions, JobService, PostRecord, PublishStatus, TimeRange,
};

#[derive(Parser)]
#[command(name = "newsgram", version)]
#[command(about = "Turn news topics into ready-to-publish Instagram posts")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one job and export its posts
    Run(RunArgs),

    /// Validate a config file
    CheckConfig { path: PathBuf },
}

#[derive(Args)]
struct RunArgs {
    /// Topic to generate posts for; repeat for several
    #[arg(short, long = "topic", required = true)]
    topics: Vec<String>,

    /// Build one post from this article instead of searching news;
    /// takes exactly one --topic
    #[arg(long)]
    url: Option<String>,

    /// Config file (JSON); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// oneDay, oneWeek, oneMonth, oneYear or noLimit
    #[arg(long)]
    time_range: Option<TimeRange>,

    /// Posts per topic (1-10)
    #[arg(long)]
    max_posts: Option<u32>,

    /// Publish each post to Instagram
    #[arg(long)]
    auto_post: bool,

    /// Export file; defaults to a timestamped file in the export directory
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing(cli.json_logs)?;

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::CheckConfig { path } => check_config(&path),
    }
}

fn check_config(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    println!("Config OK: {}", path.display());
    println!("  workers:        {}", config.worker_count);
    println!("  queue capacity: {}", config.queue_capacity);
    println!("  chat model:     {}", config.providers.zai.chat_model);
    println!("  image model:    {}", config.providers.zai.image_model);
    println!(
        "  instagram:      {}",
        if config.providers.instagram.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );
    Ok(())
}

fn run(args: RunArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let options = JobOptions {
        time_range: args.time_range.unwrap_or(config.defaults.time_range),
        max_posts: args.max_posts.unwrap_or(config.defaults.max_posts),
        auto_post: args.auto_post,
    };

    check_run_args(&args)?;

    let service = Arc::new(JobService::from_config(&config)?);
    let job_id = match &args.url {
        Some(url) => service.submit_url_job(url, &args.topics[0], options)?,
        None => service.submit_job(args.topics, options)?,
    };
    log::info!("Submitted job {}", job_id);

    {
        let service = Arc::clone(&service);
        let job_id = job_id.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nCancelling job...");
            if let Err(e) = service.cancel_job(&job_id) {
                eprintln!("Cancel failed: {}", e);
            }
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let record = runtime.block_on(follow_progress(&service, &job_id))?;

    let outcome = finish(&service, &config, &record, args.output.as_deref());
    service.shutdown();
    outcome
}

fn check_run_args(args: &RunArgs) -> Result<()> {
    if args.url.is_some() && args.topics.len() != 1 {
        bail!("--url takes exactly one --topic");
    }
    Ok(())
}

/// Prints this job's events until it reaches a terminal state.
async fn follow_progress(service: &JobService, job_id: &str) -> Result<JobRecord> {
    let mut rx = service.subscribe();
    loop {
        let record = service.get_status(job_id)?;
        if record.is_finished() {
            return Ok(record);
        }

        match rx.recv().await {
            Ok(event) if event.job_id == job_id => print_event(&event),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Progress output skipped {} event(s)", skipped);
            }
            Err(RecvError::Closed) => return Ok(service.get_status(job_id)?),
        }
    }
}

fn print_event(event: &JobProgressEvent) {
    let message = event.message.as_deref().unwrap_or_default();
    match event.kind {
        EventKind::Started => println!("[  0%] {}", message),
        EventKind::Progress => match event.progress {
            Some(percent) => println!("[{:>3}%] {}", percent, message),
            None => println!("       {}", message),
        },
        EventKind::Warning => {
            println!("   !   {}", event.warning.as_deref().unwrap_or_default())
        }
        EventKind::Completed => println!("[100%] {}", message),
        EventKind::Failed => println!(
            "[fail] {}",
            event.error.as_deref().unwrap_or("Job failed")
        ),
    }
}

fn finish(
    service: &JobService,
    config: &Config,
    record: &JobRecord,
    output: Option<&Path>,
) -> Result<()> {
    if record.status != JobStatus::Completed {
        bail!(
            "Job {} failed: {}",
            record.id,
            record.error.as_deref().unwrap_or("unknown error")
        );
    }

    let posts = service.get_result(&record.id)?;
    let path = match output {
        Some(path) => export::export_posts(&posts, path)?,
        None => export::export_to_directory(&posts, Path::new(&config.export.directory))?,
    };

    print_summary(&posts, record);
    println!("\nSaved {} post(s) to {}", posts.len(), path.display());
    Ok(())
}

fn print_summary(posts: &[PostRecord], record: &JobRecord) {
    println!("\nGenerated {} post(s)", posts.len());
    for (i, post) in posts.iter().enumerate() {
        let hashtags: Vec<&str> = post.hashtags.iter().take(3).map(String::as_str).collect();
        println!("\n{}. {}", i + 1, post.topic);
        println!("   Scheduled: {}", post.scheduled_time.format("%Y-%m-%d %H:%M %:z"));
        println!("   Image:     {}", post.image_url);
        println!("   Hashtags:  {}", hashtags.join(" "));
        match &post.publish_status {
            PublishStatus::Draft => {}
            PublishStatus::Published { media_id } => println!("   Published: {}", media_id),
            PublishStatus::Scheduled { container_id } => {
                println!("   Instagram: scheduled (container {})", container_id)
            }
            PublishStatus::ManualPostingRequired => println!("   Instagram: post manually"),
        }
    }

    if !record.warnings.is_empty() {
        println!("\n{} warning(s):", record.warnings.len());
        for warning in &record.warnings {
            println!("  - {}", warning);
        }
    }
}
