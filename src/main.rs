//! The parrun binary: run shell commands from a file or stdin, at most N at
//! a time.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use parrun::{
    Config, Dispatcher, Event, EventKind, JobSummary, LineSource, LogWriter, RunnerError,
    ShellSpawner, SubscriberSet,
};

/// Run shell commands from a file or stdin, at most N at a time.
#[derive(Parser, Debug)]
#[command(name = "parrun", version, about)]
struct Cli {
    /// Maximal number of parallel processes (default: one per processing unit)
    #[arg(short = 'n', long = "nprocs", value_name = "N")]
    nprocs: Option<NonZeroUsize>,

    /// Read commands from FILE instead of from stdin
    #[arg(short = 'c', long = "commands", value_name = "FILE")]
    commands: Option<PathBuf>,

    /// Emit progress messages to stdout
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg = Config {
        max_concurrent: cli.nprocs.map(NonZeroUsize::get).unwrap_or(0),
        verbose: cli.verbose,
    };

    match run(&cfg, cli.commands).await {
        Ok(summary) => {
            println!(
                "** {} jobs launched, {} completed",
                summary.launched,
                summary.completed()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err.as_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: &Config, commands: Option<PathBuf>) -> Result<JobSummary, RunnerError> {
    // Two-phase logger init: anything emitted before the sinks are attached
    // is buffered and replayed to them.
    let subs = SubscriberSet::buffering();
    subs.attach(Arc::new(LogWriter::new(cfg.verbose)));
    subs.mark_ready();

    let mut source = LineSource::open(commands.as_deref())?;

    let nprocs = cfg.concurrency_limit();
    println!("** {nprocs} parallel processes");

    let mut dispatcher = Dispatcher::new(ShellSpawner::new(), subs.clone(), nprocs);
    let summary = dispatcher.run(&mut source).await;

    if source.is_truncated() {
        subs.emit(
            Event::new(EventKind::SourceTruncated)
                .with_reason("incomplete line at the end of command file (ignored)"),
        );
    }
    subs.shutdown().await;
    Ok(summary)
}
