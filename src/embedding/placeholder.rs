//! Deterministic placeholder embeddings.
//!
//! Used when no embedding provider is configured: the vectors are not
//! semantically meaningful, but they are reproducible for the same text and
//! dimension count, which keeps re-upserts idempotent and the system
//! functional offline.

/// Generate a deterministic, L2-normalized placeholder vector for `text`.
pub fn placeholder_embedding(text: &str, dims: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dims];
    if dims == 0 {
        return v;
    }

    for (i, ch) in text.chars().enumerate() {
        let code = ch as usize;
        v[i % dims] += code as f32 / 1000.0;
        v[(i + code) % dims] += 0.01;
    }

    let magnitude = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    // The zero vector maps to itself instead of dividing by zero
    let divisor = if magnitude == 0.0 { 1.0 } else { magnitude };
    for x in v.iter_mut() {
        *x /= divisor;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = placeholder_embedding("fn main() {}", 64);
        let b = placeholder_embedding("fn main() {}", 64);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_texts_differ() {
        let a = placeholder_embedding("alpha", 64);
        let b = placeholder_embedding("beta", 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_unit_norm_for_nonempty_text() {
        let v = placeholder_embedding("some nontrivial input text", 128);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = placeholder_embedding("", 16);
        assert_eq!(v, vec![0.0; 16]);
    }

    #[test]
    fn test_dimension_respected() {
        assert_eq!(placeholder_embedding("abc", 1536).len(), 1536);
        assert_eq!(placeholder_embedding("abc", 8).len(), 8);
        assert!(placeholder_embedding("abc", 0).is_empty());
    }
}
