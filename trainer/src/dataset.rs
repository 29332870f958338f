use std::path::Path;

use ndarray::{ArrayView2, Axis};
use rand::Rng;
use serde::Deserialize;

use crate::error::{Result, TrainerError};

/// Number of target classes.
pub const CLASSES: usize = 3;

/// One CSV row: a single light-intensity reading and its class name.
#[derive(Debug, Deserialize)]
pub struct Record {
    #[serde(rename = "Light_Intensity")]
    pub light_intensity: f32,
    #[serde(rename = "Label")]
    pub label: String,
}

/// The three light-level classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Bright,
    Dim,
    Dark,
}

impl Label {
    /// Parses a class name as it appears in the CSV.
    ///
    /// # Errors
    /// Returns `TrainerError::UnknownLabel` for anything that is not one of
    /// the three known classes.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Bright" => Ok(Self::Bright),
            "Dim" => Ok(Self::Dim),
            "Dark" => Ok(Self::Dark),
            other => Err(TrainerError::UnknownLabel(other.to_string())),
        }
    }

    /// Position of this class in the one-hot vector.
    pub fn index(self) -> usize {
        match self {
            Self::Bright => 0,
            Self::Dim => 1,
            Self::Dark => 2,
        }
    }

    /// One-hot encoding of this class.
    pub fn one_hot(self) -> [f32; CLASSES] {
        let mut encoded = [0.0; CLASSES];
        encoded[self.index()] = 1.0;
        encoded
    }
}

/// An in-memory supervised dataset stored as one flat buffer, one row of
/// `[x.., y..]` per sample.
#[derive(Debug)]
pub struct Dataset {
    x_size: usize,
    y_size: usize,
    len: usize,
    data: Vec<f32>,
}

impl Dataset {
    /// Creates a new `Dataset` from a flat buffer of `[x.., y..]` rows.
    ///
    /// # Errors
    /// Returns a `SizeMismatch` when the buffer is not a whole number of rows.
    pub fn new(data: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        let row = x_size + y_size;
        if row == 0 || data.len() % row != 0 {
            return Err(TrainerError::SizeMismatch {
                what: "dataset rows",
                got: data.len(),
                expected: row,
            });
        }

        Ok(Self {
            x_size,
            y_size,
            len: data.len() / row,
            data,
        })
    }

    /// Loads and one-hot encodes the light-intensity CSV.
    ///
    /// # Errors
    /// Any I/O failure, malformed row or unknown label aborts the load; an
    /// empty file yields `EmptyDataset`.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut data = Vec::new();
        let mut len = 0;

        for record in reader.deserialize::<Record>() {
            let record = record?;
            let label = Label::parse(&record.label)?;

            data.push(record.light_intensity);
            data.extend(label.one_hot());
            len += 1;
        }

        if len == 0 {
            return Err(TrainerError::EmptyDataset);
        }

        Ok(Self {
            x_size: 1,
            y_size: CLASSES,
            len,
            data,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shuffles the rows in place (Fisher–Yates over whole rows).
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let row = self.x_size + self.y_size;

        for i in (1..self.len).rev() {
            let j = rng.random_range(0..=i);
            if i != j {
                let (head, tail) = self.data.split_at_mut(i * row);
                head[j * row..(j + 1) * row].swap_with_slice(&mut tail[..row]);
            }
        }
    }

    /// Shuffles and splits off the trailing `valid_ratio` of the rows into a
    /// validation set, returning `(train, valid)`.
    pub fn split<R: Rng>(mut self, valid_ratio: f32, rng: &mut R) -> (Self, Self) {
        self.shuffle(rng);

        let row = self.x_size + self.y_size;
        let valid_len = ((self.len as f32) * valid_ratio).round() as usize;
        let train_len = self.len - valid_len.min(self.len);

        let valid_data = self.data.split_off(train_len * row);
        let valid = Self {
            x_size: self.x_size,
            y_size: self.y_size,
            len: valid_len.min(self.len),
            data: valid_data,
        };
        self.len = train_len;

        (self, valid)
    }

    /// Views the whole set as an `(x, y)` pair.
    pub fn xy(&self) -> (ArrayView2<'_, f32>, ArrayView2<'_, f32>) {
        let row = self.x_size + self.y_size;
        let view = ArrayView2::from_shape((self.len, row), &self.data).unwrap();
        view.split_at(Axis(1), self.x_size)
    }

    /// Iterates over `(x, y)` batches of at most `batch_size` rows, in the
    /// current row order. The trailing partial batch is included.
    pub fn batches(&self, batch_size: usize) -> Batches<'_> {
        assert!(batch_size > 0, "batch_size must be non-zero");

        Batches {
            data: &self.data,
            x_size: self.x_size,
            y_size: self.y_size,
            batch_size,
        }
    }
}

/// Iterator over the `(x, y)` batch views of a `Dataset`.
pub struct Batches<'a> {
    data: &'a [f32],
    x_size: usize,
    y_size: usize,
    batch_size: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let row = self.x_size + self.y_size;
        let rows = self.batch_size.min(self.data.len() / row);
        let (chunk, rest) = self.data.split_at(rows * row);
        self.data = rest;

        let view = ArrayView2::from_shape((rows, row), chunk).unwrap();
        Some(view.split_at(Axis(1), self.x_size))
    }
}
