// ============================================================
// Layer 4 — Synthetic Example Source
// ============================================================
// Generates random ragged document/query pairs that fit a given
// capacity. Used by `fuse --synthetic N` for smoke runs and by
// tests that need realistic padding patterns.
//
// Every example draws:
//   sentences       uniform in 1..=max_sentences
//   sentence length uniform in 1..=max_sentence_len (per sentence)
//   query length    uniform in 1..=max_query_len
//   features        uniform in [-1, 1)
//
// The generator is seeded (StdRng::seed_from_u64) so the same
// seed always yields the same examples.
//
// Reference: rand crate documentation

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::example::{Capacity, FusionExample};
use crate::domain::traits::ExampleSource;

pub struct SyntheticSource {
    count:    usize,
    d_model:  usize,
    capacity: Capacity,
    seed:     u64,
}

impl SyntheticSource {
    pub fn new(count: usize, d_model: usize, capacity: Capacity, seed: u64) -> Self {
        Self { count, d_model, capacity, seed }
    }

    fn features(&self, rng: &mut StdRng) -> Vec<f32> {
        (0..self.d_model).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
    }

    fn example(&self, index: usize, rng: &mut StdRng) -> FusionExample {
        let Capacity { max_sentences, max_sentence_len, max_query_len } = self.capacity;

        let num_sentences = rng.gen_range(1..=max_sentences);
        let document = (0..num_sentences)
            .map(|_| {
                let len = rng.gen_range(1..=max_sentence_len);
                (0..len).map(|_| self.features(rng)).collect()
            })
            .collect();

        let query_len = rng.gen_range(1..=max_query_len);
        let query = (0..query_len).map(|_| self.features(rng)).collect();

        FusionExample::new(format!("synthetic-{index}"), document, query)
    }
}

impl ExampleSource for SyntheticSource {
    fn describe(&self) -> String {
        format!("{} synthetic examples (seed {})", self.count, self.seed)
    }

    fn load_all(&self) -> Result<Vec<FusionExample>> {
        let Capacity { max_sentences, max_sentence_len, max_query_len } = self.capacity;
        ensure!(
            max_sentences > 0 && max_sentence_len > 0 && max_query_len > 0,
            "Synthetic examples need a non-zero capacity, got {:?}",
            self.capacity
        );
        ensure!(self.d_model > 0, "Synthetic examples need d_model > 0");

        let mut rng = StdRng::seed_from_u64(self.seed);
        let examples: Vec<_> = (0..self.count).map(|i| self.example(i, &mut rng)).collect();

        tracing::info!(
            "Generated {} synthetic examples (d_model={}, seed={})",
            examples.len(), self.d_model, self.seed
        );
        Ok(examples)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn source(seed: u64) -> SyntheticSource {
        SyntheticSource::new(12, 5, Capacity::new(3, 4, 2), seed)
    }

    #[test]
    fn test_same_seed_same_examples() {
        assert_eq!(source(7).load_all().unwrap(), source(7).load_all().unwrap());
    }

    #[test]
    fn test_different_seed_different_examples() {
        assert_ne!(source(1).load_all().unwrap(), source(2).load_all().unwrap());
    }

    #[test]
    fn test_examples_fit_capacity_and_width() {
        let src = source(42);
        for ex in src.load_all().unwrap() {
            assert!(src.capacity.check(&ex).is_ok());
            assert_eq!(ex.first_width_violation(5), None);
            assert!(ex.num_sentences() >= 1);
            assert!(ex.query_len() >= 1);
            assert!(ex.document.iter().all(|s| !s.is_empty()));
        }
    }

    #[test]
    fn test_ids_are_sequential() {
        let ids: Vec<_> = source(3).load_all().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids[0], "synthetic-0");
        assert_eq!(ids[11], "synthetic-11");
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let src = SyntheticSource::new(1, 4, Capacity::new(0, 4, 2), 0);
        assert!(src.load_all().is_err());
    }
}
