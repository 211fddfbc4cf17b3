// Embeddings module
// Deterministic text -> vector function shared by every writer and reader of a collection


use tracing::debug;

/// Vector length used when the configuration does not override it.
pub const DEFAULT_VECTOR_SIZE: usize = 384;

/// Identifier of the hashing scheme below. Changing the algorithm requires a new
/// identifier and a full recreate of every collection.
pub const EMBEDDING_SCHEME: &str = "md5-hash-v1";

const U32_RANGE: f64 = u32::MAX as f64;

/// Hash-based pseudo-embedding generator.
///
/// Every output dimension `i` is seeded by `MD5(text ++ i)`, so the vector is a
/// pure function of the input text and stable across process restarts. The
/// result is normalized to unit length unless its norm is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Embedder {
    dimension: usize,
}

impl Embedder {
    #[inline]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    #[inline]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub const fn scheme(&self) -> &'static str {
        EMBEDDING_SCHEME
    }

    /// Generate the embedding vector for `text`
    #[inline]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let raw: Vec<f64> = (0..self.dimension)
            .map(|index| dimension_value(text, index))
            .collect();

        let norm = raw.iter().map(|value| value * value).sum::<f64>().sqrt();
        debug!(
            "Embedded text (length: {}) into {} dimensions",
            text.len(),
            self.dimension
        );

        if norm > 0.0 {
            raw.iter().map(|value| (value / norm) as f32).collect()
        } else {
            raw.iter().map(|&value| value as f32).collect()
        }
    }
}

impl Default for Embedder {
    fn default() -> Self {
        Self::new(DEFAULT_VECTOR_SIZE)
    }
}

/// Map `MD5(text ++ decimal(index))` onto `[-1, 1]` using the first four digest bytes.
fn dimension_value(text: &str, index: usize) -> f64 {
    let mut context = md5::Context::new();
    context.consume(text.as_bytes());
    context.consume(index.to_string().as_bytes());
    let digest = context.compute();

    let seed = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (f64::from(seed) / U32_RANGE).mul_add(2.0, -1.0)
}
