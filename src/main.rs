use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use unique_ipv4_counter::{count_unique_ipv4_with, CounterConfig};

#[derive(Parser)]
#[command(
    name = "unique-ipv4-counter",
    about = "Count distinct IPv4 addresses in a newline-delimited file",
    version
)]
struct Cli {
    /// File with one IPv4 address per line
    #[arg(short, long, value_name = "FILE", default_value = "ip_addresses")]
    file: PathBuf,

    /// Number of parsing workers [default: number of CPUs]
    #[arg(short, long)]
    workers: Option<usize>,

    /// Minimum bytes read per chunk
    #[arg(long, value_name = "BYTES")]
    block_size: Option<usize>,

    /// Chunks allowed in flight between the reader and the workers
    #[arg(long, value_name = "N")]
    queue_capacity: Option<usize>,

    /// More logging (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors; skipped lines are not reported
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    fn config(&self) -> CounterConfig {
        let mut config = CounterConfig::default();
        if let Some(workers) = self.workers {
            config = config.workers(workers);
        }
        if let Some(block_size) = self.block_size {
            config = config.block_size(block_size);
        }
        if let Some(queue_capacity) = self.queue_capacity {
            config = config.queue_capacity(queue_capacity);
        }
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(cli.level()).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match count_unique_ipv4_with(&cli.file, &cli.config()) {
        Ok(report) => {
            println!("Number of unique IPv4: {}", report.unique);
            println!("Time: {:?}", report.elapsed);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
