use crate::helpers::{create_table, read_params, write_params, ParamFile};
use crate::ingest::ingest;
use crate::zinb;
use crate::{GlobalConfiguration, Subcommand};
use anyhow::{Context, Result};
use clap::Parser;
use prettytable::row;
use std::process::ExitCode;
use zinm_hmm::{trainer, EmissionModel};

/// Fits a zero-inflated negative multinomial HMM to a tab-separated count profile.
#[derive(Parser)]
pub struct Opts {
    /// Tab-separated count file (see the module docs on ingestion for the format).
    input: String,
    /// YAML file with a starting `Q`, `init`, and `P` (and, optionally, `a`/`pi`).
    start: String,
    /// Where to write the fitted parameters; printed as a summary table if omitted.
    #[arg(long, value_name = "FILE")]
    output: Option<String>,
    /// Force the dispersion `a` instead of seeding it from the control-track ZINB fit.
    #[arg(long)]
    a: Option<f64>,
    /// Force the zero-inflation weight `pi` instead of seeding it from the control-track ZINB
    /// fit.
    #[arg(long)]
    pi: Option<f64>,
}

impl Subcommand for Opts {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let ingested = ingest(&self.input)?;
        let obs = &ingested.observations;

        let start = read_params(&self.start).context("failed to read the starting parameter file")?;
        let (mut params, mut model) = start.into_model()?;

        let config = cfg.trainer_config();

        let (seeded_a, seeded_pi) = if self.a.is_some() && self.pi.is_some() {
            (self.a.unwrap(), self.pi.unwrap())
        } else {
            let control: Vec<i64> = (0..obs.n()).map(|k| obs.row(k)[0]).collect();
            let seed = zinb::fit(&control, &config);
            (self.a.unwrap_or(seed.a), self.pi.unwrap_or(seed.pi))
        };

        if let EmissionModel::ZeroInflated { a, pi, .. } = &mut model {
            *a = seeded_a;
            *pi = seeded_pi;
        }

        let output = trainer::fit(obs, &mut params, &mut model, &config)?;

        if cfg.verbose_warnings {
            for warning in output.diagnostics.warnings() {
                eprintln!("warning: {warning:?}");
            }
        }

        let mut table = create_table();
        table.set_titles(row!["iterations", "log-likelihood", "a", "pi"]);
        table.add_row(row![
            output.iterations,
            format!("{:.6}", output.loglik),
            format!("{seeded_a:.6}"),
            format!("{seeded_pi:.6}")
        ]);
        table.printstd();

        if let Some(path) = &self.output {
            let param_file = ParamFile::from_model(&params, &model)?;
            write_params(path, &param_file).context(format!("failed to write fitted parameters to '{path}'"))?;
        }

        Ok(ExitCode::SUCCESS)
    }
}
