//! Embedding lookup and the linear transform matrix
//!
//! The embedding table is a total function: a token missing from the
//! vocabulary maps to the all-zero vector of the table's dimensionality.
//! Silent vocabulary mismatch is a real failure mode, so every fallback is
//! counted and the pipeline reports the miss total after vectorization.

use anyhow::{bail, Context, Result};
use nalgebra::{DMatrix, DVector};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::stats::StatError;

/// token -> fixed-dimension vector, with a counted zero-vector fallback.
pub struct EmbeddingTable {
    vectors: FxHashMap<String, DVector<f64>>,
    dim: usize,
    misses: AtomicUsize,
}

impl EmbeddingTable {
    pub fn new(vectors: FxHashMap<String, DVector<f64>>, dim: usize) -> Result<Self> {
        for (token, v) in &vectors {
            if v.len() != dim {
                bail!(
                    "embedding for {:?} has dimension {}, expected {}",
                    token,
                    v.len(),
                    dim
                );
            }
        }
        Ok(Self {
            vectors,
            dim,
            misses: AtomicUsize::new(0),
        })
    }

    /// Load GloVe-style whitespace text: `token v1 v2 ... vD` per line.
    /// Dimensionality is fixed by the first line.
    pub fn from_text_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open embedding file {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut vectors = FxHashMap::default();
        let mut dim = None;
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.with_context(|| {
                format!("failed to read {} line {}", path.display(), line_no + 1)
            })?;
            let mut fields = line.split_whitespace();
            let Some(token) = fields.next() else {
                continue;
            };
            let values: Vec<f64> = fields
                .map(|f| f.parse::<f64>())
                .collect::<Result<_, _>>()
                .with_context(|| {
                    format!("invalid embedding value at {} line {}", path.display(), line_no + 1)
                })?;
            match dim {
                None => {
                    if values.is_empty() {
                        bail!(
                            "embedding row for {:?} at {} line {} has no values",
                            token,
                            path.display(),
                            line_no + 1
                        );
                    }
                    dim = Some(values.len());
                }
                Some(d) if values.len() != d => bail!(
                    "embedding row for {:?} at {} line {} has dimension {}, expected {}",
                    token,
                    path.display(),
                    line_no + 1,
                    values.len(),
                    d
                ),
                Some(_) => {}
            }
            vectors.insert(token.to_string(), DVector::from_vec(values));
        }

        let Some(dim) = dim else {
            bail!("embedding file {} is empty", path.display());
        };
        debug!(
            "loaded {} embeddings of dimension {} from {}",
            vectors.len(),
            dim,
            path.display()
        );
        Ok(Self {
            vectors,
            dim,
            misses: AtomicUsize::new(0),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Total lookup: a miss yields the zero vector and bumps the miss counter.
    pub fn lookup(&self, token: &str) -> DVector<f64> {
        match self.vectors.get(token) {
            Some(v) => v.clone(),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                DVector::zeros(self.dim)
            }
        }
    }

    /// How many lookups fell back to the zero vector so far.
    pub fn miss_count(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Square linear transform applied to every context vector before regression.
/// Squareness and the embedding-dimension match are checked at construction,
/// not at query time.
#[derive(Debug, Clone)]
pub struct TransformMatrix {
    matrix: DMatrix<f64>,
}

impl TransformMatrix {
    pub fn new(matrix: DMatrix<f64>, embedding_dim: usize) -> Result<Self, StatError> {
        if matrix.nrows() != embedding_dim || matrix.ncols() != embedding_dim {
            return Err(StatError::TransformDimension {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
                expected: embedding_dim,
            });
        }
        Ok(Self { matrix })
    }

    /// Identity transform (regress on raw context vectors).
    pub fn identity(embedding_dim: usize) -> Self {
        Self {
            matrix: DMatrix::identity(embedding_dim, embedding_dim),
        }
    }

    /// Load a raw little-endian f32 square matrix; the side is the square
    /// root of the element count (the format the induction matrix ships in).
    pub fn from_f32le_path(path: &Path, embedding_dim: usize) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read transform matrix {}", path.display()))?;
        if bytes.len() % 4 != 0 {
            bail!(
                "transform matrix {} is {} bytes, not a whole number of f32s",
                path.display(),
                bytes.len()
            );
        }
        let values: Vec<f64> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect();
        let side = (values.len() as f64).sqrt() as usize;
        if side * side != values.len() {
            bail!(
                "transform matrix {} has {} elements, not a perfect square",
                path.display(),
                values.len()
            );
        }
        let matrix = DMatrix::from_row_slice(side, side, &values);
        Self::new(matrix, embedding_dim).map_err(anyhow::Error::from)
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn apply(&self, v: &DVector<f64>) -> DVector<f64> {
        &self.matrix * v
    }
}
