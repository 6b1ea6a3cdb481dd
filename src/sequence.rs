use log::debug;
use ndarray::{s, Array1, Array3, Axis};

use crate::error::{ForecastError, Result};
use crate::features::{CleanedTable, FeatureColumn};

/// Windowed model inputs with one target per window.
///
/// `x` is `(samples, lookback, features)`, `y` is `(samples,)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceSet {
    pub x: Array3<f64>,
    pub y: Array1<f64>,
}

impl SequenceSet {
    pub fn new(x: Array3<f64>, y: Array1<f64>) -> Result<Self> {
        if x.shape()[0] != y.len() {
            return Err(ForecastError::ShapeMismatch(format!(
                "{} input windows but {} targets",
                x.shape()[0],
                y.len()
            )));
        }
        Ok(SequenceSet { x, y })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn lookback(&self) -> usize {
        self.x.shape()[1]
    }

    pub fn num_features(&self) -> usize {
        self.x.shape()[2]
    }

    /// Chronological split: the first `floor(len * ratio)` samples, then the rest.
    pub fn split(&self, ratio: f64) -> (SequenceSet, SequenceSet) {
        let at = split_index(self.len(), ratio);
        let head = SequenceSet {
            x: self.x.slice(s![..at, .., ..]).to_owned(),
            y: self.y.slice(s![..at]).to_owned(),
        };
        let tail = SequenceSet {
            x: self.x.slice(s![at.., .., ..]).to_owned(),
            y: self.y.slice(s![at..]).to_owned(),
        };
        (head, tail)
    }

    /// Gather the samples at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> SequenceSet {
        SequenceSet {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
        }
    }

    /// Mini-batches of at most `batch_size` samples, visiting `order`.
    /// Each batch is gathered only when the iterator reaches it.
    pub fn batches<'a>(&'a self, batch_size: usize, order: &'a [usize]) -> impl Iterator<Item = SequenceSet> + 'a {
        order.chunks(batch_size.max(1)).map(move |chunk| self.select(chunk))
    }
}

/// Number of samples in the first part of a `ratio` split of `len` samples.
pub fn split_index(len: usize, ratio: f64) -> usize {
    (((len as f64) * ratio).floor() as usize).min(len)
}

/// Slice a cleaned table into overlapping lookback windows.
///
/// Window `i` covers rows `[i, i + lookback)` across every feature column; its
/// target is `target` at row `i + lookback`, just past the window. A table with
/// `lookback` rows or fewer yields an empty set.
pub fn windows(table: &CleanedTable, target: FeatureColumn, lookback: usize) -> Result<SequenceSet> {
    if lookback == 0 {
        return Err(ForecastError::InvalidConfig("lookback must be at least 1".to_string()));
    }

    let data = table.to_array();
    let rows = data.nrows();
    let features = data.ncols();
    let samples = rows.saturating_sub(lookback);

    let mut x: Array3<f64> = Array3::zeros((samples, lookback, features));
    let mut y: Array1<f64> = Array1::zeros(samples);
    for i in 0..samples {
        x.index_axis_mut(Axis(0), i)
            .assign(&data.slice(s![i..i + lookback, ..]));
        y[i] = data[[i + lookback, target.index()]];
    }

    debug!(
        "Built {} windows of shape ({}, {}) targeting '{}'",
        samples,
        lookback,
        features,
        target.name()
    );
    SequenceSet::new(x, y)
}
