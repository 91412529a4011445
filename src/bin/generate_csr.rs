//! Writes a random sparse matrix in CSR text format

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use csrmul::generate::{default_file_name, generate_csr, GeneratorConfig, DEFAULT_DENSITY};
use csrmul::write_csr_file;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a random sparse matrix in CSR text format")]
struct Args {
    /// Number of rows
    rows: usize,

    /// Number of columns
    cols: usize,

    /// Fraction of columns populated in every row
    #[arg(long, default_value_t = DEFAULT_DENSITY)]
    density: f64,

    /// Seed for reproducible output (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Output file (defaults to <rows>_<cols>_csr.txt)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let config = GeneratorConfig {
        density: args.density,
        ..GeneratorConfig::default()
    };
    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let matrix = match generate_csr(args.rows, args.cols, &config, &mut rng) {
        Ok(matrix) => matrix,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };
    info!(rows = args.rows, cols = args.cols, nnz = matrix.nnz(), "generated matrix");

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(default_file_name(args.rows, args.cols)));

    match write_csr_file(&path, &matrix) {
        Ok(()) => {
            println!("CSR matrix saved to {}", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
