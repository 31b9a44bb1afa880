use anyhow::{Context, Result};
use ndarray::{Array1, Array2};
use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};
use prettytable::Table;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use zinm_hmm::{EmissionModel, HmmParams};

/// The on-disk (de)serialization of a fitted or starting parameter set.
#[derive(Serialize, Deserialize)]
pub struct ParamFile {
    pub a: f64,
    pub pi: f64,
    pub q: Vec<Vec<f64>>,
    pub init: Vec<f64>,
    pub p: Vec<Vec<f64>>,
}

impl ParamFile {
    pub fn from_model(params: &HmmParams, model: &EmissionModel) -> Result<Self> {
        let EmissionModel::ZeroInflated { a, pi, p } = model else {
            anyhow::bail!("only EmissionModel::ZeroInflated can be written as a parameter file");
        };

        Ok(Self {
            a: *a,
            pi: *pi,
            q: params.q().rows().into_iter().map(|row| row.to_vec()).collect(),
            init: params.init().to_vec(),
            p: p.rows().into_iter().map(|row| row.to_vec()).collect(),
        })
    }

    pub fn into_model(self) -> Result<(HmmParams, EmissionModel)> {
        let m = self.init.len();
        let q = Array2::from_shape_vec((m, m), self.q.into_iter().flatten().collect())
            .context("Q is not a valid m x m matrix")?;
        let init = Array1::from_vec(self.init);
        let params = HmmParams::new(q, init).context("parameter file contains an invalid Q/init")?;

        let r_plus_one = self.p.first().map_or(0, Vec::len);
        let p = Array2::from_shape_vec((m, r_plus_one), self.p.into_iter().flatten().collect())
            .context("P is not a valid m x (r+1) matrix")?;

        let model = EmissionModel::ZeroInflated { a: self.a, pi: self.pi, p };

        Ok((params, model))
    }
}

/// Reads and parses a YAML parameter file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or does not deserialize as a [`ParamFile`].
pub fn read_params(path: &str) -> Result<ParamFile> {
    let file = File::open(path).context(format!("unable to open '{path}'"))?;
    serde_yaml::from_reader(BufReader::new(file)).context(format!("unable to parse '{path}' as a parameter file"))
}

/// Serializes a parameter file as YAML.
///
/// # Errors
///
/// Returns an error if the file cannot be created or serialization fails.
pub fn write_params(path: &str, params: &ParamFile) -> Result<()> {
    let file = File::create(path).context(format!("unable to write '{path}'"))?;
    serde_yaml::to_writer(BufWriter::new(file), params).context(format!("unable to serialize parameters to '{path}'"))
}

pub fn create_table() -> Table {
    let mut table = Table::new();
    table.set_format(
        FormatBuilder::new()
            .column_separator(' ')
            .separator(LinePosition::Title, LineSeparator::new('-', '+', ' ', ' '))
            .build(),
    );
    table
}
