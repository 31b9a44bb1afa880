#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::too_many_arguments)]
#![allow(missing_docs)]

mod compress;
mod decode;
mod fit;
mod helpers;
mod ingest;
mod show;
mod zinb;

use anyhow::Result;
use clap::Parser;
use enum_dispatch::enum_dispatch;
use git_version::git_version;
use std::process::ExitCode;
use zinm_hmm::TrainerConfig;

/// Tuning knobs and warning verbosity shared by every subcommand.
#[derive(Parser)]
pub struct GlobalConfiguration {
    /// Maximum number of Baum–Welch outer iterations.
    #[arg(default_value_t = TrainerConfig::default().max_iter, global = true, long)]
    pub max_iter: usize,
    /// Maximum number of bracket/Newton iterations per emission update.
    #[arg(default_value_t = TrainerConfig::default().newton_max_iter, global = true, long)]
    pub newton_max_iter: usize,
    /// Convergence tolerance for both the outer loop and the inner root finder.
    #[arg(default_value_t = TrainerConfig::default().tolerance, global = true, long)]
    pub tolerance: f64,
    /// Print non-fatal diagnostics (renormalization, structural inconsistency) to stderr.
    #[arg(global = true, long)]
    pub verbose_warnings: bool,
}

impl GlobalConfiguration {
    #[must_use]
    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            max_iter: self.max_iter,
            newton_max_iter: self.newton_max_iter,
            tolerance: self.tolerance,
        }
    }
}

#[enum_dispatch]
pub trait Subcommand {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode>;
}

#[enum_dispatch(Subcommand)]
#[derive(Parser)]
pub enum SubcommandEnum {
    Fit(fit::Opts),
    Decode(decode::Opts),
    Show(show::Opts),
}

#[derive(Parser)]
#[command(
    arg_required_else_help = true,
    author,
    about,
    disable_help_subcommand = true,
    name = "zinm-hmm",
    version = git_version!(
        args = ["--always", "--dirty", "--long", "--tags"],
        cargo_prefix = "",
        fallback = "unknown"
    )
)]
pub struct Opts {
    #[command(flatten)]
    pub configuration: GlobalConfiguration,
    #[command(subcommand)]
    pub subcommand: SubcommandEnum,
}
