// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runs a study, a sweep of DAS simulations over a parameter grid.
//!
//! The study file is TOML with an optional `name`, a `[grid]` table listing
//! the values to sweep over and a `[config]` table shared by all runs.
//! Runs are executed in parallel with [`rayon`].
//!
//! With `--output`, one CSV row per run and the full results as JSON are
//! written to the given directory.

mod grid;

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::Context;
use das_sim::{Config, RunResult, Shape, SimulationError, Simulator, logging};
use log::{error, info};
use rayon::prelude::*;

use grid::StudyFile;

/// Sweeps DAS simulations over a parameter grid.
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Study file to run.
    study: PathBuf,
    /// Directory to write CSV and JSON results to.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Overrides the seed of the study file.
    #[arg(long)]
    seed: Option<u64>,
    /// Logs with timestamps and targets.
    #[arg(long)]
    timestamps: bool,
}

fn main() -> Result<()> {
    // enable fancy `color_eyre` error messages
    color_eyre::install()?;

    let args = Args::parse();
    if args.timestamps {
        logging::enable_logforth_stderr();
    } else {
        logging::enable_logforth();
    }

    let study = std::fs::read_to_string(&args.study).context("Study file is required")?;
    let mut study: StudyFile = toml::from_str(&study).context("Can not parse study file")?;
    if study.name.is_empty() {
        study.name = args
            .study
            .file_stem()
            .map_or_else(|| "study".to_owned(), |s| s.to_string_lossy().into_owned());
    }
    if let Some(seed) = args.seed {
        study.config.seed = seed;
    }
    study.config.validate()?;

    let shapes = study.grid.shapes();
    info!("study {}: running {} simulations", study.name, shapes.len());
    let results = run_all(&shapes, &study.config);
    summarize(&results);

    if let Some(dir) = args.output {
        std::fs::create_dir_all(&dir)?;
        let results: Vec<_> = results.into_iter().filter_map(|(_, r)| r.ok()).collect();
        write_csv(&dir.join(&study.name).with_extension("csv"), &results)?;
        let path = dir.join(&study.name).with_extension("json");
        serde_json::to_writer_pretty(File::create(&path)?, &results)?;
        info!("results written to {}", dir.display());
    }

    Ok(())
}

fn run_all<'a>(
    shapes: &'a [Shape],
    config: &Config,
) -> Vec<(&'a Shape, Result<RunResult, SimulationError>)> {
    shapes
        .par_iter()
        .map(|shape| {
            let result = Simulator::new(shape.clone(), config.clone()).map(|mut sim| sim.run());
            (shape, result)
        })
        .collect()
}

fn summarize(results: &[(&Shape, Result<RunResult, SimulationError>)]) {
    let mut available = 0;
    let mut ttas = Vec::new();
    for (shape, result) in results {
        match result {
            Ok(run) => {
                info!(
                    "{}: available {}, rounds {}, tta {}, missing {}",
                    run.id,
                    run.block_available,
                    run.rounds,
                    run.tta.map_or_else(|| "-".to_owned(), |t| format!("{t}ms")),
                    run.final_missing()
                );
                if run.block_available {
                    available += 1;
                }
                ttas.extend(run.tta);
            }
            Err(err) => error!("{shape}: {err}"),
        }
    }
    let mean_tta = if ttas.is_empty() {
        f64::NAN
    } else {
        ttas.iter().sum::<u64>() as f64 / ttas.len() as f64
    };
    info!(
        "{available}/{} runs available, mean tta {mean_tta:.1}ms",
        results.len()
    );
}

fn write_csv(path: &Path, results: &[RunResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "id",
        "run",
        "block_size",
        "threshold",
        "nodes",
        "failure_model",
        "failure_rate",
        "malicious",
        "custody_rows",
        "custody_cols",
        "net_degree",
        "block_available",
        "rounds",
        "tta_ms",
        "samples_sent",
        "final_missing",
    ])?;
    for run in results {
        let shape = &run.shape;
        writer.write_record(&[
            run.id.clone(),
            shape.run.to_string(),
            shape.row_count.to_string(),
            shape.row_count_k.to_string(),
            shape.node_count.to_string(),
            shape.failure_model.to_string(),
            shape.failure_rate_pct.to_string(),
            shape.malicious_pct.to_string(),
            shape.custody_rows.to_string(),
            shape.custody_cols.to_string(),
            shape.net_degree.to_string(),
            run.block_available.to_string(),
            run.rounds.to_string(),
            run.tta.map(|t| t.to_string()).unwrap_or_default(),
            run.samples_sent().to_string(),
            run.final_missing().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
