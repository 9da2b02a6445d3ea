//! Flat (brute-force) L2 vector index.
//!
//! Vectors are kept in insertion order in one contiguous buffer; position `i`
//! is the join key to the document table. Search compares the query against
//! every stored vector and returns squared Euclidean distances, lower is closer.


use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

/// File magic for serialized indexes
const INDEX_MAGIC: &[u8; 4] = b"HDIX";
const FORMAT_VERSION: u32 = 1;
/// magic + version + dimension + ntotal
const HEADER_LEN: usize = 4 + 4 + 4 + 8;
const FOOTER_LEN: usize = 4;

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("Index dimension must be greater than zero")]
    ZeroDimension,
    #[error("Vector dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Corrupt index data: {0}")]
    Corrupt(String),
    #[error("Unsupported index format version: {0}")]
    UnsupportedVersion(u32),
    #[error("Index checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
}

/// One search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    /// Squared L2 distance to the query
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    #[inline]
    pub fn new(dimension: usize) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    #[inline]
    pub fn ntotal(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Vector stored at `position`
    #[inline]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.data.get(start..end)
    }

    /// Append vectors in order. Either all vectors are added or none are.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }

        debug!(
            "Added {} vectors, index now holds {}",
            vectors.len(),
            self.ntotal()
        );
        Ok(())
    }

    /// The `k` nearest vectors to `query`, closest first.
    ///
    /// Equal distances are ordered by position so results are deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, stored)| Neighbor {
                position,
                distance: euclidean_sq(query, stored),
            })
            .collect();

        neighbors.sort_by(compare_neighbors);
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Serialize as `[magic][version][dimension][ntotal][f32 LE data][crc32]`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.data.len() * 4 + FOOTER_LEN);
        out.extend_from_slice(INDEX_MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        out.extend_from_slice(&(self.ntotal() as u64).to_le_bytes());
        for value in &self.data {
            out.extend_from_slice(&value.to_le_bytes());
        }
        let crc = crc32fast::hash(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() < HEADER_LEN + FOOTER_LEN {
            return Err(IndexError::Corrupt(format!(
                "file is {} bytes, shorter than the header",
                bytes.len()
            )));
        }

        if &bytes[..4] != INDEX_MAGIC {
            return Err(IndexError::Corrupt("bad magic bytes".to_string()));
        }

        let (payload, footer) = bytes.split_at(bytes.len() - FOOTER_LEN);
        let stored = u32::from_le_bytes(read_array(footer, 0));
        let computed = crc32fast::hash(payload);
        if stored != computed {
            return Err(IndexError::ChecksumMismatch { stored, computed });
        }

        let version = u32::from_le_bytes(read_array(payload, 4));
        if version != FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion(version));
        }

        let dimension = u32::from_le_bytes(read_array(payload, 8)) as usize;
        let ntotal = u64::from_le_bytes(read_array(payload, 12));

        let expected_len = usize::try_from(ntotal)
            .ok()
            .and_then(|n| n.checked_mul(dimension))
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| n.checked_add(HEADER_LEN))
            .ok_or_else(|| IndexError::Corrupt("vector count overflows".to_string()))?;
        if payload.len() != expected_len {
            return Err(IndexError::Corrupt(format!(
                "expected {} bytes of header and vectors, found {}",
                expected_len,
                payload.len()
            )));
        }

        let mut index = Self::new(dimension)?;
        index.data = payload[HEADER_LEN..]
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(read_array(chunk, 0)))
            .collect();

        Ok(index)
    }
}

/// Squared Euclidean distance between two equal-length slices
#[inline]
pub fn euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.position.cmp(&b.position))
}

// Callers check lengths before reading
fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}
