//! Boundary to the external face-embedding model.

use registry::Embedding;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbedError {
    #[error("no face detected")]
    NoFaceDetected,
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("embedder backend failed: {0}")]
    Backend(String),
}

/// Turns an encoded image into a face embedding.
///
/// Output length must always equal [`Embedder::dimension`]. Values may vary
/// slightly between calls for the same face.
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    fn embed(&self, image: &[u8]) -> Result<Embedding, EmbedError>;
}
