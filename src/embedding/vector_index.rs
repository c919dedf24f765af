/// Flat L2 vector index for exact nearest-neighbour search
use ndarray::{Array1, Array2, ArrayView1, Axis};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Invalid dimension at position {position}: expected {expected}, got {actual}")]
    InvalidDimension {
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Cannot build an index with zero-length vectors")]
    ZeroDimension,

    #[error("Vector at position {0} contains a non-finite value")]
    NonFinite(usize),

    #[error("Index construction failed: {0}")]
    Shape(String),
}

/// One search hit: position of the vector at build time and its distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    /// Euclidean distance (lower is closer)
    pub distance: f32,
}

/// Exhaustive L2 index
///
/// The guideline corpus holds tens of documents, so every query is compared
/// against every stored vector. Rows keep insertion order, which doubles as
/// the tie-break for equal distances.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Array2<f32>,
}

impl FlatIndex {
    /// Build an index from equally sized vectors
    pub fn build(embeddings: &[Vec<f32>]) -> Result<Self, VectorIndexError> {
        let Some(first) = embeddings.first() else {
            return Ok(Self {
                vectors: Array2::zeros((0, 0)),
            });
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(VectorIndexError::ZeroDimension);
        }

        let mut flat = Vec::with_capacity(embeddings.len() * dimension);
        for (position, vector) in embeddings.iter().enumerate() {
            if vector.len() != dimension {
                return Err(VectorIndexError::InvalidDimension {
                    position,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(VectorIndexError::NonFinite(position));
            }
            flat.extend_from_slice(vector);
        }

        let vectors = Array2::from_shape_vec((embeddings.len(), dimension), flat)
            .map_err(|e| VectorIndexError::Shape(e.to_string()))?;

        Ok(Self { vectors })
    }

    /// Return up to `k` nearest vectors by ascending distance
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorIndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension() {
            return Err(VectorIndexError::InvalidDimension {
                position: 0,
                expected: self.dimension(),
                actual: query.len(),
            });
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(VectorIndexError::NonFinite(0));
        }

        let query = ArrayView1::from(query);
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: l2_distance(row, query),
            })
            .collect();

        // Stable sort keeps insertion order among equal distances.
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);

        Ok(neighbors)
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension (0 for an empty index)
    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }
}

fn l2_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    let diff: Array1<f32> = &a - &b;
    diff.dot(&diff).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_orders_by_distance() {
        let index = FlatIndex::build(&[
            vec![0.0, 0.0],
            vec![3.0, 4.0],
            vec![1.0, 0.0],
        ])
        .unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.dimension(), 2);

        let results = index.search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = results.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 2, 1]);
        assert!((results[2].distance - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = FlatIndex::build(&[vec![1.0, 0.0], vec![-1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let results = index.search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = results.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = FlatIndex::build(&[vec![1.0], vec![2.0]]).unwrap();
        assert_eq!(index.search(&[0.0], 10).unwrap().len(), 2);
        assert!(index.search(&[0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = FlatIndex::build(&[]).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_validation() {
        let err = FlatIndex::build(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            VectorIndexError::InvalidDimension { position: 1, .. }
        ));

        let index = FlatIndex::build(&[vec![1.0, 2.0]]).unwrap();
        assert!(index.search(&[1.0], 1).is_err());
        assert!(index.search(&[f32::NAN, 0.0], 1).is_err());
    }
}
