//! Flat cosine vector index with file persistence.
//!
//! Exact nearest-neighbor search over a packed row-major `f32` matrix.
//! Contract consumed by the retrieval engine: build from vectors in
//! canonical corpus order, query returns `(position, cosine)` pairs
//! best-first. The sidecar file format is `GSVI` magic, format version,
//! dimension, vector count, then little-endian `f32` data.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

const MAGIC: &[u8; 4] = b"GSVI";
const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("corrupt index file: {0}")]
    Corrupt(String),
}

pub struct FlatIndex {
    dimension: usize,
    /// Row-major, `count * dimension` values.
    data: Vec<f32>,
    /// Precomputed L2 norm per row.
    norms: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from vectors in their addressable order.
    pub fn build(dimension: usize, vectors: &[Vec<f32>]) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::Corrupt("zero dimension".into()));
        }
        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for vector in vectors {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }
        Ok(Self::from_data(dimension, data))
    }

    fn from_data(dimension: usize, data: Vec<f32>) -> Self {
        let norms = data
            .chunks_exact(dimension)
            .map(|row| row.iter().map(|v| v * v).sum::<f32>().sqrt())
            .collect();
        Self {
            dimension,
            data,
            norms,
        }
    }

    pub fn len(&self) -> usize {
        self.norms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The stored vector at `position`, if in range.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// Exact k-nearest-neighbor search by cosine similarity, best-first.
    /// Ties resolve by ascending position for determinism.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let query_norm = query.iter().map(|v| v * v).sum::<f32>().sqrt();
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| {
                let denominator = query_norm * self.norms[position];
                let score = if denominator > 0.0 {
                    let dot: f32 = row.iter().zip(query).map(|(x, y)| x * y).sum();
                    dot / denominator
                } else {
                    0.0
                };
                (position, score)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&(self.dimension as u32).to_le_bytes())?;
        writer.write_all(&(self.len() as u32).to_le_bytes())?;
        for value in &self.data {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(IndexError::Corrupt("bad magic".into()));
        }
        let version = read_u32(&mut reader)?;
        if version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {version}"
            )));
        }
        let dimension = read_u32(&mut reader)? as usize;
        let count = read_u32(&mut reader)? as usize;
        if dimension == 0 {
            return Err(IndexError::Corrupt("zero dimension".into()));
        }

        let mut data = vec![0.0f32; count * dimension];
        let mut buf = [0u8; 4];
        for value in &mut data {
            reader.read_exact(&mut buf).map_err(|_| {
                IndexError::Corrupt("file shorter than declared vector count".into())
            })?;
            *value = f32::from_le_bytes(buf);
        }
        if reader.bytes().next().is_some() {
            return Err(IndexError::Corrupt(
                "trailing bytes after declared vector count".into(),
            ));
        }

        Ok(Self::from_data(dimension, data))
    }
}

fn read_u32(reader: &mut impl Read) -> Result<u32, IndexError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
