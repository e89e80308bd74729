use serde::Serialize;

use crate::RegistryError;

/// Chunk size for the distance loop; keeps the accumulators in registers and
/// lets the compiler vectorize the inner products.
const DISTANCE_CHUNK_SIZE: usize = 32;

/// Face embedding produced by the external embedder.
///
/// Values are opaque apart from distance computation. A valid embedding is
/// non-empty, finite, and has a non-zero norm (cosine distance is undefined
/// for the zero vector).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Result<Self, RegistryError> {
        if values.is_empty() {
            return Err(RegistryError::InvalidEmbedding(
                "embedding must not be empty".into(),
            ));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(RegistryError::InvalidEmbedding(format!(
                "embedding value at position {pos} is not finite"
            )));
        }
        if values.iter().all(|&v| v == 0.0) {
            return Err(RegistryError::InvalidEmbedding(
                "embedding has zero norm".into(),
            ));
        }
        Ok(Self(values))
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }

    /// Cosine distance to `other`, see [`cosine_distance`].
    pub fn distance(&self, other: &Embedding) -> f64 {
        cosine_distance(&self.0, &other.0)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Cosine distance (`1 - cosine similarity`) in `[0, 2]`; lower is more similar.
///
/// Accumulates in `f64`. Identical inputs return exactly `0.0`. Slices of
/// different length or with a zero norm return `1.0` (orthogonal), which
/// callers prevent by validating dimensions up front.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    if a == b {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (chunk_a, chunk_b) in a
        .chunks(DISTANCE_CHUNK_SIZE)
        .zip(b.chunks(DISTANCE_CHUNK_SIZE))
    {
        let (d, na, nb) = accumulate_chunk(chunk_a, chunk_b);
        dot += d;
        norm_a += na;
        norm_b += nb;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    let similarity = (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0);
    1.0 - similarity
}

#[inline(always)]
fn accumulate_chunk(a: &[f32], b: &[f32]) -> (f64, f64, f64) {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    (dot, norm_a, norm_b)
}

/// Similarity score shown to callers: `1 - distance`, clamped to `[0, 1]`.
/// Display only; threshold decisions use the raw distance.
pub fn similarity_score(distance: f64) -> f64 {
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Identities are case-sensitive registration keys and must contain at
/// least one non-whitespace character.
pub fn validate_identity(identity: &str) -> Result<(), RegistryError> {
    if identity.trim().is_empty() {
        return Err(RegistryError::InvalidIdentity(
            "identity must not be empty".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_zero_distance() {
        let v: Vec<f32> = (0..128).map(|i| (i as f32 * 0.37).sin()).collect();
        assert_eq!(cosine_distance(&v, &v), 0.0);
        assert_eq!(similarity_score(0.0), 1.0);
    }

    #[test]
    fn scaled_vectors_are_near_zero() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![2.0, 4.0, 6.0];
        assert!(cosine_distance(&a, &b) < 1e-12);
    }

    #[test]
    fn opposite_and_orthogonal_vectors() {
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distance_spans_multiple_chunks() {
        let a: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let mut b = a.clone();
        b[99] = -b[99];
        let d = cosine_distance(&a, &b);
        assert!(d > 0.0 && d < 2.0);
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(similarity_score(1.5), 0.0);
        assert_eq!(similarity_score(-0.1), 1.0);
        assert!((similarity_score(0.25) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn embedding_rejects_degenerate_values() {
        assert!(matches!(
            Embedding::new(vec![]),
            Err(RegistryError::InvalidEmbedding(_))
        ));
        assert!(matches!(
            Embedding::new(vec![0.0, 0.0]),
            Err(RegistryError::InvalidEmbedding(_))
        ));
        assert!(matches!(
            Embedding::new(vec![1.0, f32::NAN]),
            Err(RegistryError::InvalidEmbedding(_))
        ));
        assert_eq!(Embedding::new(vec![0.0, 1.0]).unwrap().dimension(), 2);
    }

    #[test]
    fn identity_must_not_be_blank() {
        assert!(validate_identity("alice").is_ok());
        assert!(validate_identity("Alice").is_ok());
        assert!(validate_identity("").is_err());
        assert!(validate_identity("   ").is_err());
    }
}
