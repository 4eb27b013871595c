use anyhow::{Context, Result};
use blemu::{generate_design, grid, min_distance, Problem};
use clap::{Parser, Subcommand};
use log::info;
use ndarray_npy::write_npy;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about = "Derivative-informed Bayes linear emulator", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generates a maximin Latin hypercube design of the unit square
    Design {
        /// number of design points
        #[arg(short, long, default_value_t = 16)]
        size: usize,
        /// random generator seed
        #[arg(long, default_value_t = 15)]
        seed: u64,
        /// numpy file receiving the design, printed on stdout when missing
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Adjusts the emulator described by a JSON problem file over a regular grid
    Emulate {
        /// JSON problem file
        #[arg(short, long)]
        problem: PathBuf,
        /// number of grid levels along each component
        #[arg(short, long, default_value_t = 50)]
        grid: usize,
        /// directory receiving grid.npy, expectation.npy and variance.npy
        #[arg(short, long, default_value = "./blemu")]
        outdir: PathBuf,
    },
}

fn design(size: usize, seed: u64, out: Option<&Path>) -> Result<()> {
    let xd = generate_design(size, seed)
        .with_context(|| format!("design of {size} points with seed {seed}"))?;
    info!("Design min distance = {}", min_distance(&xd)?);
    match out {
        Some(path) => {
            write_npy(path, &xd).with_context(|| format!("writing {}", path.display()))?;
            info!("Design saved in {}", path.display());
        }
        None => println!("{xd}"),
    }
    Ok(())
}

fn emulate(problem: &Path, levels: usize, outdir: &Path) -> Result<()> {
    let problem = Problem::from_file(problem)
        .with_context(|| format!("reading problem {}", problem.display()))?;
    let xd = problem.normalized_design()?;
    let d = problem.observations()?;
    let params = problem.params()?;
    info!(
        "Emulator with {} design points and {} observations",
        xd.nrows(),
        d.len()
    );

    let query = grid(levels, levels)?;
    let (expectations, variances) =
        blemu::adjust_grid(&query, &xd, &d, params).context("grid adjustment")?;

    std::fs::create_dir_all(outdir)?;
    for (name, arr) in [("expectation", &expectations), ("variance", &variances)] {
        let path = outdir.join(format!("{name}.npy"));
        write_npy(&path, arr).with_context(|| format!("writing {}", path.display()))?;
    }
    write_npy(outdir.join("grid.npy"), &query)?;
    info!("Adjusted grid saved in {}", outdir.display());
    Ok(())
}

fn main() -> Result<()> {
    let env = env_logger::Env::new().filter_or("BLEMU_LOG", "info");
    let mut builder = env_logger::Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();

    let args = Args::parse();
    match args.command {
        Command::Design { size, seed, out } => design(size, seed, out.as_deref()),
        Command::Emulate {
            problem,
            grid,
            outdir,
        } => emulate(&problem, grid, &outdir),
    }
}
