// ============================================================
// Layer 3 — FusionExample Domain Type
// ============================================================
// One document/query pair BEFORE padding, in plain Rust.
//
// The document is a list of sentences, each a list of token
// feature vectors; the query is a flat list of token feature
// vectors. Lengths are ragged; the batcher (Layer 4) pads
// them into fixed-capacity tensors and builds the masks.
//
//   document[sentence][token][feature]
//   query[token][feature]
//
// Feature vectors come from an upstream encoder. This crate
// never looks inside them except to check their width.

use serde::{Deserialize, Serialize};

use crate::domain::error::FusionError;

/// Fixed padded capacity of a batch. Examples larger than this
/// are a caller error and are rejected, never truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub max_sentences:    usize,
    pub max_sentence_len: usize,
    pub max_query_len:    usize,
}

impl Capacity {
    pub fn new(max_sentences: usize, max_sentence_len: usize, max_query_len: usize) -> Self {
        Self { max_sentences, max_sentence_len, max_query_len }
    }

    /// Padded document positions per example (sentences × tokens)
    pub fn document_slots(&self) -> usize {
        self.max_sentences * self.max_sentence_len
    }

    pub fn check(&self, example: &FusionExample) -> Result<(), FusionError> {
        let limits = [
            ("sentence count",  self.max_sentences,    example.num_sentences()),
            ("sentence length", self.max_sentence_len, example.longest_sentence()),
            ("query length",    self.max_query_len,    example.query_len()),
        ];
        for (axis, limit, found) in limits {
            if found > limit {
                return Err(FusionError::CapacityExceeded {
                    example: example.id.clone(),
                    axis,
                    limit,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// A single ragged document/query pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionExample {
    /// Identifier carried through to the fusion report
    pub id: String,

    /// Sentences → tokens → features
    pub document: Vec<Vec<Vec<f32>>>,

    /// Tokens → features
    pub query: Vec<Vec<f32>>,
}

impl FusionExample {
    pub fn new(
        id:       impl Into<String>,
        document: Vec<Vec<Vec<f32>>>,
        query:    Vec<Vec<f32>>,
    ) -> Self {
        Self { id: id.into(), document, query }
    }

    pub fn num_sentences(&self) -> usize {
        self.document.len()
    }

    /// Length of the longest sentence (0 for an empty document)
    pub fn longest_sentence(&self) -> usize {
        self.document.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn query_len(&self) -> usize {
        self.query.len()
    }

    /// Number of real (unpadded) document tokens across all sentences
    pub fn document_tokens(&self) -> usize {
        self.document.iter().map(Vec::len).sum()
    }

    /// Returns the first feature vector whose width differs from `width`,
    /// as (side, sentence, token, found_width). Query tokens report
    /// sentence 0.
    pub fn first_width_violation(&self, width: usize) -> Option<(&'static str, usize, usize, usize)> {
        for (s, sentence) in self.document.iter().enumerate() {
            for (t, token) in sentence.iter().enumerate() {
                if token.len() != width {
                    return Some(("document", s, t, token.len()));
                }
            }
        }
        self.query
            .iter()
            .enumerate()
            .find(|(_, token)| token.len() != width)
            .map(|(t, token)| ("query", 0, t, token.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FusionExample {
        FusionExample::new(
            "ex",
            vec![
                vec![vec![1.0, 0.0], vec![2.0, 0.0]],
                vec![vec![3.0, 0.0], vec![4.0, 0.0], vec![5.0, 0.0]],
            ],
            vec![vec![0.5, 0.5]],
        )
    }

    #[test]
    fn test_ragged_lengths() {
        let ex = sample();
        assert_eq!(ex.num_sentences(), 2);
        assert_eq!(ex.longest_sentence(), 3);
        assert_eq!(ex.document_tokens(), 5);
        assert_eq!(ex.query_len(), 1);
    }

    #[test]
    fn test_width_violation_is_located() {
        let mut ex = sample();
        assert_eq!(ex.first_width_violation(2), None);

        ex.document[1][2] = vec![1.0];
        assert_eq!(ex.first_width_violation(2), Some(("document", 1, 2, 1)));

        ex.document[1][2] = vec![1.0, 1.0];
        ex.query.push(vec![0.0, 0.0, 0.0]);
        assert_eq!(ex.first_width_violation(2), Some(("query", 0, 1, 3)));
    }

    #[test]
    fn test_capacity_check() {
        let ex = sample();
        assert!(Capacity::new(2, 3, 1).check(&ex).is_ok());
        assert_eq!(Capacity::new(2, 3, 1).document_slots(), 6);

        let err = Capacity::new(2, 2, 1).check(&ex).unwrap_err();
        assert_eq!(
            err,
            FusionError::CapacityExceeded { example: "ex".into(), axis: "sentence length", limit: 2, found: 3 }
        );
        assert!(Capacity::new(1, 3, 1).check(&ex).is_err());
        assert!(Capacity::new(2, 3, 0).check(&ex).is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"id":"a","document":[[[1.0]]],"query":[[2.0]]}"#;
        let ex: FusionExample = serde_json::from_str(json).unwrap();
        assert_eq!(ex.document_tokens(), 1);
        assert_eq!(ex.query[0], vec![2.0]);
    }
}
