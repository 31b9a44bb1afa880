//! Tab-separated ingestion of block-segmented count profiles (§4.8).

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader};
use zinm_hmm::Observations;

/// The result of ingesting one TSV file: the validated [`Observations`] plus the original
/// column labels (control + track names) for later display.
pub struct IngestedFile {
    /// The block-segmented count matrix and its deduplication index.
    pub observations: Observations,
    /// Column labels, in order, starting with the control track.
    pub column_labels: Vec<String>,
}

/// Parses `path`: one header line (block-label column, then count columns), one row per
/// observation. A run of consecutive rows sharing the same first-column label forms one block.
/// `NA` is stored as `-1`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read, a row's column count does not match
/// the header, a count field is neither an integer nor `NA`, or the resulting block sizes fail
/// [`Observations::new`]'s validation.
pub fn ingest(path: &str) -> Result<IngestedFile> {
    let file = File::open(path).context(format!("unable to open '{path}'"))?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .context(format!("'{path}' is empty"))?
        .context(format!("unable to read the header line of '{path}'"))?;
    let column_labels: Vec<String> = header.split('\t').skip(1).map(ToOwned::to_owned).collect();

    if column_labels.is_empty() {
        bail!("'{path}' has no count columns after the block-label column");
    }

    let mut rows: Vec<Vec<i64>> = Vec::new();
    let mut block_sizes: Vec<usize> = Vec::new();
    let mut current_label: Option<String> = None;
    let mut current_size = 0usize;

    for line in lines {
        let line = line.context(format!("unable to read a line of '{path}'"))?;
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let label = fields
            .next()
            .context(format!("a row of '{path}' is missing its block label"))?
            .to_owned();

        let row: Vec<i64> = fields
            .map(|field| {
                if field == "NA" {
                    Ok(-1)
                } else {
                    field
                        .parse::<i64>()
                        .context(format!("invalid count '{field}' in '{path}'"))
                }
            })
            .collect::<Result<_>>()?;

        if row.len() != column_labels.len() {
            bail!(
                "a row of '{path}' has {} count columns, expected {}",
                row.len(),
                column_labels.len()
            );
        }

        match &current_label {
            Some(prev) if *prev == label => current_size += 1,
            Some(_) => {
                block_sizes.push(current_size);
                current_size = 1;
                current_label = Some(label);
            }
            None => {
                current_size = 1;
                current_label = Some(label);
            }
        }

        rows.push(row);
    }

    if current_size > 0 {
        block_sizes.push(current_size);
    }

    if rows.is_empty() {
        bail!("'{path}' contains no observation rows");
    }

    let n = rows.len();
    let cols = column_labels.len();
    let mut data = Array2::<i64>::zeros((n, cols));
    for (k, row) in rows.into_iter().enumerate() {
        for (j, value) in row.into_iter().enumerate() {
            data[[k, j]] = value;
        }
    }

    let observations = Observations::new(data, block_sizes).context("ingested block sizes did not validate")?;

    Ok(IngestedFile { observations, column_labels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tsv(contents: &str) -> assert_fs::NamedTempFile {
        let file = assert_fs::NamedTempFile::new("input.tsv").unwrap();
        let mut handle = File::create(file.path()).unwrap();
        handle.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn contiguous_label_runs_become_blocks() {
        let file = write_tsv("label\tcontrol\ttrack1\nA\t10\t0\nA\t9\t1\nB\t0\t5\nB\t0\t6\nB\t1\t4\n");
        let ingested = ingest(file.path().to_str().unwrap()).unwrap();

        assert_eq!(ingested.observations.block_sizes(), &[2, 3]);
        assert_eq!(ingested.observations.n(), 5);
        assert_eq!(ingested.column_labels, vec!["control", "track1"]);
    }

    #[test]
    fn na_literal_becomes_negative_one() {
        let file = write_tsv("label\tcontrol\ttrack1\nA\tNA\tNA\nA\t3\t4\n");
        let ingested = ingest(file.path().to_str().unwrap()).unwrap();

        assert_eq!(ingested.observations.row(0)[0], -1);
        assert_eq!(ingested.observations.row(0)[1], -1);
    }

    #[test]
    fn mismatched_column_count_is_rejected() {
        let file = write_tsv("label\tcontrol\ttrack1\nA\t10\t0\nA\t9\n");
        assert!(ingest(file.path().to_str().unwrap()).is_err());
    }
}
