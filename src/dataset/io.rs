//! Reading, writing and generating datasets.
//!
//! Datasets are stored as JSON lines, one `{"key": .., "vector": [..]}`
//! object per line.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{AnnexError, Result};

#[derive(Debug, Deserialize)]
struct Record {
    key: String,
    vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct RecordRef<'a> {
    key: &'a str,
    vector: &'a [f32],
}

/// Load a JSON lines dataset. Blank lines are skipped.
///
/// All vectors must share the dimensionality of the first one.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let dataset = read_dataset(reader)?;
    debug!("loaded {} entries from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// Parse JSON lines from any buffered reader.
pub fn read_dataset<R: BufRead>(reader: R) -> Result<Dataset> {
    let mut dataset = Dataset::new();
    let mut dimension = None;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: Record = serde_json::from_str(&line)?;
        let expected = *dimension.get_or_insert(record.vector.len());
        if record.vector.len() != expected {
            return Err(AnnexError::dataset(format!(
                "line {}: vector '{}' has dimension {}, expected {}",
                line_num + 1,
                record.key,
                record.vector.len(),
                expected
            )));
        }
        if record.vector.iter().all(|x| *x == 0.0) {
            warn!(
                "line {}: vector '{}' has zero norm and cannot be normalized",
                line_num + 1,
                record.key
            );
        }

        dataset.push((record.key, record.vector));
    }

    Ok(dataset)
}

/// Write a dataset as JSON lines.
pub fn save_dataset<P: AsRef<Path>>(path: P, dataset: &Dataset) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_dataset(&mut writer, dataset)?;
    writer.flush()?;
    Ok(())
}

/// Write JSON lines to any writer.
pub fn write_dataset<W: Write>(writer: &mut W, dataset: &Dataset) -> Result<()> {
    for (key, vector) in dataset {
        serde_json::to_writer(&mut *writer, &RecordRef { key, vector })?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Synthetic dataset with keys `item_{i}` and components uniform in [-1, 1).
pub fn random_dataset<R: Rng + ?Sized>(count: usize, dimension: usize, rng: &mut R) -> Dataset {
    (0..count)
        .map(|i| {
            let vector = (0..dimension)
                .map(|_| rng.random_range(-1.0f32..1.0))
                .collect();
            (format!("item_{i}"), vector)
        })
        .collect()
}
