use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use keycount::{
    config::CliOverrides, parse_worker_count, CancelToken, Coordinator, CountConfig, CountError,
    EncodingMode, OutputFormat,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit code used when the run was interrupted with Ctrl-C (128 + SIGINT)
const EXIT_INTERRUPTED: u8 = 130;

const USAGE_HINT: &str = "Three arguments are required: path to the text file, \
                          path to the keyword file, number of workers.";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Text file, keyword file (one keyword per line) and number of workers
    #[arg(value_name = "INPUT KEYWORDS WORKERS", allow_negative_numbers = true)]
    args: Vec<String>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Handoff channel capacity, 0 hands every line directly to a worker
    #[arg(long)]
    capacity: Option<usize>,

    /// How to handle invalid UTF-8 in the input (lossy|failfast)
    #[arg(long)]
    encoding: Option<String>,

    /// Trim whitespace around each keyword
    #[arg(long)]
    trim_keywords: bool,

    /// Ignore blank lines in the keyword file
    #[arg(long)]
    skip_blank_keywords: bool,

    /// Label of the final total line
    #[arg(long)]
    total_label: Option<String>,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Print run statistics to stderr
    #[arg(short, long)]
    stats: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.args.len() != 3 {
        println!("{USAGE_HINT}");
        println!("{}", Cli::command().render_usage());
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_status(&err);
            if code == EXIT_INTERRUPTED {
                eprintln!("Interrupted, no results reported");
            } else {
                eprintln!("Error: {err}");
            }
            ExitCode::from(code)
        }
    }
}

/// Maps a failed run to the process exit status
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<CountError>() {
        Some(CountError::Canceled) => EXIT_INTERRUPTED,
        _ => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    // Validated before any file is touched
    let workers = parse_worker_count(&cli.args[2])?;
    let format: OutputFormat = cli.format.parse()?;
    let encoding = cli
        .encoding
        .as_deref()
        .map(str::parse::<EncodingMode>)
        .transpose()?;

    let config = CountConfig::load_from(cli.config.as_deref())?.merge_with_cli(CliOverrides {
        input_path: PathBuf::from(&cli.args[0]),
        keywords_path: PathBuf::from(&cli.args[1]),
        workers: Some(workers),
        channel_capacity: cli.capacity,
        encoding,
        trim_keywords: cli.trim_keywords,
        skip_blank_keywords: cli.skip_blank_keywords,
        total_label: cli.total_label,
        log_level: cli.log_level,
    });

    init_tracing(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel)?;

    let report = Coordinator::new(config).run(&cancel)?;

    let rendered = report.render(format)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;

    if cli.stats {
        eprint!("{}", report.stats_summary());
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// First Ctrl-C raises the cancel token so the line source stops, a second one
/// terminates the process.
fn install_interrupt_handler(cancel: &CancelToken) -> Result<()> {
    use signal_hook::consts::SIGINT;
    use signal_hook::flag;

    let raised = cancel.flag();
    flag::register_conditional_shutdown(SIGINT, i32::from(EXIT_INTERRUPTED), raised.clone())
        .context("failed to install interrupt handler")?;
    flag::register(SIGINT, raised).context("failed to install interrupt handler")?;
    Ok(())
}
