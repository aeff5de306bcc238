// ============================================================
// Layer 3 — Similarity Mode
// ============================================================
// Which features the pair scorer projects:
//
//   Bilinear  → [a ; b]
//   Trilinear → [a ; b ; a ⊙ b]
//
// A closed enum chosen once at construction time. Serialised in
// lowercase so configs and reports read "trilinear".

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMode {
    Bilinear,
    #[default]
    Trilinear,
}

impl SimilarityMode {
    /// Number of `d_model`-wide blocks concatenated before projection
    pub fn blocks(self) -> usize {
        match self {
            SimilarityMode::Bilinear  => 2,
            SimilarityMode::Trilinear => 3,
        }
    }
}

impl std::fmt::Display for SimilarityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityMode::Bilinear  => write!(f, "bilinear"),
            SimilarityMode::Trilinear => write!(f, "trilinear"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&SimilarityMode::Bilinear).unwrap(), "\"bilinear\"");
        let parsed: SimilarityMode = serde_json::from_str("\"trilinear\"").unwrap();
        assert_eq!(parsed, SimilarityMode::default());
        assert_eq!(parsed.to_string(), "trilinear");
    }

    #[test]
    fn test_block_counts() {
        assert_eq!(SimilarityMode::Bilinear.blocks(), 2);
        assert_eq!(SimilarityMode::Trilinear.blocks(), 3);
    }
}
