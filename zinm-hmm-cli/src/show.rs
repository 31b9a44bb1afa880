use crate::helpers::{create_table, read_params};
use crate::ingest::ingest;
use crate::{GlobalConfiguration, Subcommand};
use anyhow::Result;
use clap::Parser;
use prettytable::row;
use std::process::ExitCode;

/// Summarizes a tab-separated count file or a YAML parameter file, without running inference.
#[derive(Parser)]
pub struct Opts {
    /// The file to summarize.
    input: String,
    /// Treat `input` as a YAML parameter file instead of a tab-separated count file.
    #[arg(long)]
    params: bool,
}

impl Subcommand for Opts {
    fn run(&self, _cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let mut table = create_table();

        if self.params {
            let param_file = read_params(&self.input)?;
            let tracks = param_file.p.first().map_or(0, Vec::len).saturating_sub(1);

            table.set_titles(row!["states", "tracks", "a", "pi"]);
            table.add_row(row![
                param_file.init.len(),
                tracks,
                format!("{:.4}", param_file.a),
                format!("{:.4}", param_file.pi)
            ]);
        } else {
            let ingested = ingest(&self.input)?;
            let obs = &ingested.observations;
            let distinct = (0..obs.n()).filter(|&k| obs.is_canonical(k)).count();

            table.set_titles(row!["rows", "tracks", "blocks", "distinct rows"]);
            table.add_row(row![obs.n(), obs.tracks(), obs.block_sizes().len(), distinct]);
        }

        table.printstd();
        Ok(ExitCode::SUCCESS)
    }
}
