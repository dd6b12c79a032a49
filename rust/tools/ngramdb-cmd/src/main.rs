use std::io::{self, BufReader, BufWriter};

use anyhow::{Context, Result};
use clap::Parser;
use log::error;
use ngramdb_engine::Session;

mod options;

use options::Options;

const INPUT_BUFFER_SIZE: usize = 1 << 20;
const OUTPUT_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Parser)]
#[command(name = "ngramdb")]
#[command(about = "Versioned n-gram index answering point-in-time document queries over stdin")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    options: Options,

    /// Increase log verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = cli.options.engine_config()?;
    let input = BufReader::with_capacity(INPUT_BUFFER_SIZE, io::stdin().lock());
    let output = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, io::stdout().lock());

    let session = Session::new(config, output).context("failed to start the engine")?;
    match session.run(input) {
        Ok(metrics) => {
            metrics.log_report();
            Ok(())
        }
        Err(e) => {
            if e.is_input_error() {
                error!("rejected input: {e}");
            }
            Err(e).context("workload failed")
        }
    }
}

fn init_logger(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}
