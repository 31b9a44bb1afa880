use crate::compress::compress;
use crate::helpers::{create_table, read_params};
use crate::ingest::ingest;
use crate::{GlobalConfiguration, Subcommand};
use anyhow::{Context, Result};
use clap::Parser;
use prettytable::row;
use std::process::ExitCode;
use zinm_hmm::{driver, emission, viterbi, Diagnostics, OutputMode};

/// Decodes the most likely state path for a count profile under a previously fitted model.
#[derive(Parser)]
pub struct Opts {
    /// Tab-separated count file.
    input: String,
    /// YAML file with a fitted `Q`, `init`, `P`, `a`, `pi`.
    params: String,
}

impl Subcommand for Opts {
    fn run(&self, _cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let ingested = ingest(&self.input)?;
        let obs = &ingested.observations;

        let param_file = read_params(&self.params).context("failed to read the parameter file")?;
        let (params, mut model) = param_file.into_model()?;

        let mut diagnostics = Diagnostics::new();
        let pem = emission::evaluate(obs, &mut model, OutputMode::LinPreferred, false, &mut diagnostics)?;

        // The block driver overwrites its emission matrix in place with normalized forward
        // alphas, which Viterbi must not see, so it runs on a clone purely to report a
        // log-likelihood alongside the decoded path (see DESIGN.md).
        let mut pem_for_driver = pem.clone();
        let driver_output = driver::run(&params, obs.block_sizes(), pem_for_driver.view_mut());

        let path = viterbi::viterbi(&params, obs.block_sizes(), pem.view())?;
        let compressed = compress(&path, obs.block_sizes());

        let mut summary = create_table();
        summary.set_titles(row!["log-likelihood"]);
        summary.add_row(row![format!("{:.6}", driver_output.loglik)]);
        summary.printstd();

        let mut table = create_table();
        table.set_titles(row!["block", "state", "run length"]);
        for (block, runs) in compressed.iter().enumerate() {
            for &(state, length) in runs {
                table.add_row(row![block, state, length]);
            }
        }
        table.printstd();

        Ok(ExitCode::SUCCESS)
    }
}
