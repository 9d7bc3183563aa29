//! JSON persistence for [`Gmm`].
//!
//! ```text
//! {
//!   "type": "GMM",
//!   "n": 2, "d": 3, "kind": "diag",
//!   "weights": [..n],
//!   "means": [[..d] x n],
//!   "variances": [[..d] x n],
//!   "history": "composite human-readable history",
//!   "history_t": [unix seconds, ..],
//!   "history_s": [description, ..]
//! }
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::history::{Event, History};
use crate::model::{CovarianceKind, Gmm};
use crate::GmmError;

const FILE_TYPE: &str = "GMM";
const PLACEHOLDER_HISTORY: &str = "no original history";
const WRITTEN_RECORD: &str = "GMM written to file";

#[derive(Serialize, Deserialize)]
struct GmmFile {
    #[serde(rename = "type")]
    file_type: String,
    n: usize,
    d: usize,
    kind: String,
    weights: Vec<f64>,
    means: Vec<Vec<f64>>,
    variances: Vec<Vec<f64>>,
    #[serde(default)]
    history: String,
    #[serde(default)]
    history_t: Vec<f64>,
    #[serde(default)]
    history_s: Vec<String>,
}

/// Writes `gmm` as JSON. The persisted history ends with a "written to
/// file" record, which is added to the model's own history once the write
/// has succeeded.
pub fn write(gmm: &mut Gmm, w: &mut dyn Write) -> Result<(), GmmError> {
    let history = gmm.history.derive(WRITTEN_RECORD);

    let events = history.events();
    let file = GmmFile {
        file_type: FILE_TYPE.to_string(),
        n: gmm.n(),
        d: gmm.d(),
        kind: gmm.kind.to_string(),
        weights: gmm.weights.iter().copied().collect(),
        means: rows(&gmm.means),
        variances: rows(&gmm.variances),
        history: history.to_string(),
        history_t: events
            .iter()
            .map(|e| e.time.timestamp_millis() as f64 / 1000.0)
            .collect(),
        history_s: events.iter().map(|e| e.message.clone()).collect(),
    };

    let mut bw = BufWriter::new(w);
    serde_json::to_writer_pretty(&mut bw, &file).map_err(|e| GmmError::Io(e.to_string()))?;
    bw.flush().map_err(|e| GmmError::Io(e.to_string()))?;

    gmm.history = history;
    Ok(())
}

/// Reads a model written by [`write`]. Shapes are validated, the weight
/// sum is not.
///
/// A file without history gets a single placeholder record stamped with
/// the current time.
pub fn read(r: &mut dyn Read) -> Result<Gmm, GmmError> {
    let file: GmmFile = serde_json::from_reader(BufReader::new(r))
        .map_err(|e| GmmError::InvalidFormat(e.to_string()))?;

    if file.file_type != FILE_TYPE {
        return Err(GmmError::UnknownType(file.file_type));
    }
    let kind: CovarianceKind = file.kind.parse()?;

    if file.weights.len() != file.n {
        return Err(GmmError::InvalidFormat(format!(
            "n = {} but {} weights",
            file.n,
            file.weights.len()
        )));
    }
    let means = matrix("means", &file.means, file.n, file.d)?;
    let variances = matrix("variances", &file.variances, file.n, file.d)?;

    let mut history = History::new();
    if file.history_s.is_empty() {
        history.push(PLACEHOLDER_HISTORY);
    } else {
        if file.history_t.len() != file.history_s.len() {
            return Err(GmmError::InvalidFormat(format!(
                "{} history timestamps for {} descriptions",
                file.history_t.len(),
                file.history_s.len()
            )));
        }
        for (t, s) in file.history_t.iter().zip(file.history_s) {
            history.push_event(Event::at(timestamp(*t)?, s));
        }
    }

    // Weights are not required to sum to 1: EM leaves them short when some
    // points get no responsibility.
    Gmm::from_shapes(DVector::from_vec(file.weights), means, variances, kind, history)
        .map_err(|e| GmmError::InvalidFormat(e.to_string()))
}

/// Saves `gmm` to `path`. See [`write`].
pub fn save(gmm: &mut Gmm, path: impl AsRef<Path>) -> Result<(), GmmError> {
    let mut f = File::create(path.as_ref())
        .map_err(|e| GmmError::Io(format!("create {}: {e}", path.as_ref().display())))?;
    write(gmm, &mut f)
}

/// Loads a model from `path`. See [`read`].
pub fn load(path: impl AsRef<Path>) -> Result<Gmm, GmmError> {
    let mut f = File::open(path.as_ref())
        .map_err(|e| GmmError::Io(format!("open {}: {e}", path.as_ref().display())))?;
    read(&mut f)
}

fn rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}

fn matrix(name: &str, rows: &[Vec<f64>], n: usize, d: usize) -> Result<DMatrix<f64>, GmmError> {
    if rows.len() != n {
        return Err(GmmError::InvalidFormat(format!(
            "{name}: want {n} rows, got {}",
            rows.len()
        )));
    }
    let mut m = DMatrix::zeros(n, d);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != d {
            return Err(GmmError::InvalidFormat(format!(
                "{name}: row {i} has {} values, want {d}",
                row.len()
            )));
        }
        for (k, &v) in row.iter().enumerate() {
            m[(i, k)] = v;
        }
    }
    Ok(m)
}

fn timestamp(secs: f64) -> Result<DateTime<Utc>, GmmError> {
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
        .ok_or_else(|| GmmError::InvalidFormat(format!("bad history timestamp {secs}")))
}
