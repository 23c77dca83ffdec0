//! Command implementations for the annex CLI.

use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::dataset::Dataset;
use crate::dataset::io::{load_dataset, random_dataset, save_dataset};
use crate::error::{AnnexError, Result};
use crate::eval::{Benchmark, BenchmarkConfig};
use crate::index::IndexConfig;

/// Execute a CLI command.
pub fn execute_command(args: AnnexArgs) -> Result<()> {
    match &args.command {
        Command::Bench(bench_args) => run_bench(bench_args, &args),
        Command::Generate(generate_args) => generate_dataset(generate_args, &args),
    }
}

/// Run the benchmark pipeline.
fn run_bench(args: &BenchArgs, cli_args: &AnnexArgs) -> Result<()> {
    let config = BenchmarkConfig {
        index: index_config(args)?,
        neighbors: args.neighbors,
        control_size: args.control_size,
        remove_fraction: args.remove_fraction,
    };

    let mut rng = StdRng::seed_from_u64(args.seed);
    let dataset = load_input(args, &mut rng)?;

    let report = Benchmark::new(config).run(dataset, &mut rng)?;
    output_result("Benchmark completed", &report, cli_args)
}

/// Index configuration from `--config` with command line overrides.
fn index_config(args: &BenchArgs) -> Result<IndexConfig> {
    let mut config = match (&args.config, &args.index_type) {
        (Some(path), _) => {
            info!("loading index configuration from {}", path.display());
            IndexConfig::from_file(path)?
        }
        (None, Some(index_type)) => IndexConfig::new(index_type.as_str()),
        (None, None) => {
            return Err(AnnexError::config(
                "an index type is required: pass --type or --config",
            ));
        }
    };

    if let Some(index_type) = &args.index_type {
        config.index_type = index_type.clone();
    }
    if args.max_links.is_some() {
        config.max_links = args.max_links;
    }
    if args.ef_construction.is_some() {
        config.ef_construction = args.ef_construction;
    }
    if args.insert_method.is_some() {
        config.insert_method = args.insert_method.clone();
    }
    if args.remove_method.is_some() {
        config.remove_method = args.remove_method.clone();
    }
    Ok(config)
}

fn load_input(args: &BenchArgs, rng: &mut StdRng) -> Result<Dataset> {
    match (&args.input, args.synthetic) {
        (Some(path), _) => {
            info!("loading dataset from {}", path.display());
            load_dataset(path)
        }
        (None, Some(count)) => {
            if args.dimension == 0 {
                return Err(AnnexError::config("dimension must be > 0"));
            }
            info!("generating {count} random vectors of dimension {}", args.dimension);
            Ok(random_dataset(count, args.dimension, rng))
        }
        (None, None) => Err(AnnexError::config(
            "a dataset is required: pass --input or --synthetic",
        )),
    }
}

/// Write a synthetic dataset.
fn generate_dataset(args: &GenerateArgs, cli_args: &AnnexArgs) -> Result<()> {
    if args.dimension == 0 {
        return Err(AnnexError::config("dimension must be > 0"));
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let dataset = random_dataset(args.count, args.dimension, &mut rng);
    save_dataset(&args.output, &dataset)?;

    let result = GenerationResult {
        path: args.output.display().to_string(),
        count: args.count,
        dimension: args.dimension,
        seed: args.seed,
    };
    output_result("Dataset generated", &result, cli_args)
}
