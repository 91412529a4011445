use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use csrmul::utils::write_csr;
use csrmul::{read_csr_file, AccumulatorKind, CsrMatrix, DistributedProduct, Error, KernelConfig};

/// Multiply two CSR matrices across a set of parallel workers
///
/// Built with the `mpi` feature, every process started by `mpirun` is one
/// worker and rank 0 prints the result.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Rows of A
    a_rows: usize,

    /// Columns of A (and rows of B)
    a_cols: usize,

    /// Columns of B
    b_cols: usize,

    /// CSR text file holding A
    file_a: PathBuf,

    /// CSR text file holding B
    file_b: PathBuf,

    /// Number of in-process workers (defaults to the number of CPU cores, ignored under MPI)
    #[arg(short, long, env = "CSRMUL_WORKERS")]
    workers: Option<usize>,

    /// Row accumulator: dense, sparse or auto
    #[arg(long, default_value_t = AccumulatorKind::Dense)]
    accumulator: AccumulatorKind,

    /// Also spread each worker's rows over the rayon pool
    #[arg(long)]
    row_parallel: bool,

    /// Only print the elapsed time, not the matrices
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

type Operands = (CsrMatrix<i64>, CsrMatrix<i64>);

/// Reads both operands and keeps a copy of them for the report
fn load_operands(cli: &Cli, inputs: &mut Option<Operands>) -> csrmul::Result<Operands> {
    let a = read_csr_file(&cli.file_a, cli.a_rows, cli.a_cols)?.matrix;
    let b = read_csr_file(&cli.file_b, cli.a_cols, cli.b_cols)?.matrix;
    *inputs = Some((a.clone(), b.clone()));
    Ok((a, b))
}

fn kernel_config(cli: &Cli) -> KernelConfig {
    KernelConfig::default()
        .with_accumulator(cli.accumulator)
        .with_row_parallel(cli.row_parallel)
}

#[cfg(not(feature = "mpi"))]
fn run(cli: &Cli) -> csrmul::Result<()> {
    use csrmul::{distributed_spgemm_with, DistributedConfig};

    let mut config = DistributedConfig::default().with_kernel(kernel_config(cli));
    if let Some(workers) = cli.workers {
        config.n_workers = workers;
    }

    let mut inputs = None;
    let product = distributed_spgemm_with::<i64, _>(&config, || load_operands(cli, &mut inputs))?;
    report(cli, &product, inputs)
}

#[cfg(feature = "mpi")]
fn run(cli: &Cli) -> csrmul::Result<()> {
    use csrmul::distributed::{run_worker, MpiComm, COORDINATOR};
    use tracing::warn;

    let universe = mpi::initialize().ok_or_else(|| Error::Config {
        reason: "MPI was already initialized".to_string(),
    })?;
    let comm = MpiComm::new(universe.world());

    if cli.workers.is_some() && comm.rank() == COORDINATOR {
        warn!(size = comm.size(), "--workers is ignored under MPI, the world size comes from mpirun");
    }

    let mut inputs = None;
    let product = run_worker::<i64, _, _>(&comm, || load_operands(cli, &mut inputs), &kernel_config(cli))?;
    match product {
        Some(product) => report(cli, &product, inputs),
        None => Ok(()),
    }
}

fn report(cli: &Cli, product: &DistributedProduct<i64>, inputs: Option<Operands>) -> csrmul::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let printed = print_report(&mut out, product.elapsed.as_secs_f64(), inputs, &product.matrix, cli.quiet);
    printed.map_err(|source| Error::Io {
        path: PathBuf::from("<stdout>"),
        source,
    })
}

fn print_report(
    out: &mut impl Write,
    elapsed_secs: f64,
    inputs: Option<Operands>,
    product: &CsrMatrix<i64>,
    quiet: bool,
) -> io::Result<()> {
    writeln!(out, "\nMatrix multiplication took: {} seconds", elapsed_secs)?;
    if quiet {
        return Ok(());
    }

    if let Some((a, b)) = inputs {
        writeln!(out, "\nMatrix A:")?;
        write_csr(out, &a)?;
        writeln!(out, "\nMatrix B:")?;
        write_csr(out, &b)?;
    }
    writeln!(out, "\nProduct A x B:")?;
    write_csr(out, product)
}
