//! Deterministic bag-of-words embeddings.

use async_trait::async_trait;
use shakescript_error::ShakescriptResult;
use shakescript_interface::Embeddings;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Feature-hashing embedder.
///
/// Each lowercase word is hashed (FNV-1a) into one of `dimensions` buckets
/// with a hash-derived sign; the vector is L2-normalized. Needs no model
/// and gives the same vector for the same text on every run.
///
/// # Examples
///
/// ```
/// use shakescript_narrative::HashedEmbedder;
///
/// let embedder = HashedEmbedder::new(64);
/// let a = embedder.embed_text("The lighthouse keeper");
/// let b = embedder.embed_text("the LIGHTHOUSE keeper!");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashedEmbedder {
    dimensions: usize,
}

impl HashedEmbedder {
    /// Embedder producing vectors of `dimensions` entries (at least one).
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed one text.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(&token.to_lowercase());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl Embeddings for HashedEmbedder {
    async fn embed(&self, inputs: &[String]) -> ShakescriptResult<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|text| self.embed_text(text)).collect())
    }

    fn embedding_dimensions(&self) -> usize {
        self.dimensions
    }
}
