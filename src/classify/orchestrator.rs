//! Confidence-gated interpretation of raw model output.
//!
//! The orchestrator is the only consumer of `ModelManager::predict`. It
//! reduces the raw per-label probabilities to a single outcome: pick the
//! top entry (first-encountered wins on ties, deterministically), express
//! its probability as a two-decimal percentage, translate the label, and
//! gate the claim behind the confidence policy. Results carry a sequence
//! number so a slow prediction can never overwrite the outcome of a newer
//! image selection.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use super::TranslationTable;
use crate::ingest::ImageAsset;
use crate::model::{ModelError, ModelManager, RawPrediction};

/// Below this percentage the result makes no species claim.
const LOW_CONFIDENCE_FLOOR: f64 = 50.0;

/// Above this percentage the UI may emphasize the result. Advisory only.
const HIGH_CONFIDENCE_FLOOR: f64 = 80.0;

/// Vocabulary sentinel for "none of the known species".
const UNKNOWN_SENTINEL: &str = "unknown";

/// Interpreted classification result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// A species claim: original label, localized display name, and the
    /// two-decimal percentage. `high_confidence` is UI emphasis only.
    #[serde(rename_all = "camelCase")]
    Recognized {
        label: String,
        display_name: String,
        percentage: String,
        high_confidence: bool,
    },
    /// No species claim — percentage only.
    #[serde(rename_all = "camelCase")]
    LowConfidence { percentage: String },
}

pub struct InferenceOrchestrator {
    table: TranslationTable,
    /// Highest sequence number issued so far. A completed classification
    /// whose sequence is older than this is discarded (last-write-wins).
    latest_issued: AtomicU64,
}

impl InferenceOrchestrator {
    pub fn new(table: TranslationTable) -> Self {
        Self {
            table,
            latest_issued: AtomicU64::new(0),
        }
    }

    /// Classify a canonical image. Returns `Ok(None)` when the result was
    /// superseded by a newer request while inference was in flight.
    pub fn classify(
        &self,
        manager: &ModelManager,
        asset: &ImageAsset,
    ) -> Result<Option<Outcome>, ModelError> {
        if !manager.is_ready() {
            return Err(ModelError::NotReady);
        }

        let sequence = asset.sequence();
        self.note_issued(sequence);

        let raw = manager.predict(asset)?;
        let outcome = self.interpret(&raw)?;

        if !self.is_latest(sequence) {
            debug!(sequence, "stale classification discarded");
            return Ok(None);
        }

        info!(sequence, outcome = ?outcome, "classification complete");
        Ok(Some(outcome))
    }

    /// Record that a request with this sequence number has been issued.
    pub fn note_issued(&self, sequence: u64) {
        self.latest_issued.fetch_max(sequence, Ordering::SeqCst);
    }

    /// Whether this sequence number is still the latest issued.
    pub fn is_latest(&self, sequence: u64) -> bool {
        self.latest_issued.load(Ordering::SeqCst) == sequence
    }

    /// Reduce a raw prediction to an outcome. Pure — no model involved.
    pub fn interpret(&self, raw: &RawPrediction) -> Result<Outcome, ModelError> {
        let mut entries = raw.entries.iter();
        let mut top = entries
            .next()
            .ok_or_else(|| ModelError::Inference("empty prediction".into()))?;
        for entry in entries {
            // Strict comparison keeps the first-encountered maximum on ties.
            if entry.probability > top.probability {
                top = entry;
            }
        }

        let percent = round_two(f64::from(top.probability) * 100.0);
        let percentage = format!("{percent:.2}");

        let is_unknown = top.label.trim().eq_ignore_ascii_case(UNKNOWN_SENTINEL);
        if is_unknown || percent < LOW_CONFIDENCE_FLOOR {
            return Ok(Outcome::LowConfidence { percentage });
        }

        Ok(Outcome::Recognized {
            label: top.label.clone(),
            display_name: self.table.resolve(&top.label),
            percentage,
            high_confidence: percent > HIGH_CONFIDENCE_FLOOR,
        })
    }
}

impl Default for InferenceOrchestrator {
    fn default() -> Self {
        Self::new(TranslationTable::builtin())
    }
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LabelScore;

    fn raw(pairs: &[(&str, f32)]) -> RawPrediction {
        RawPrediction::new(
            pairs
                .iter()
                .map(|(label, probability)| LabelScore {
                    label: label.to_string(),
                    probability: *probability,
                })
                .collect(),
        )
    }

    fn orchestrator() -> InferenceOrchestrator {
        InferenceOrchestrator::default()
    }

    #[test]
    fn recognized_perch_with_high_confidence() {
        let outcome = orchestrator()
            .interpret(&raw(&[("Perch", 0.91), ("Catfish", 0.05), ("unknown", 0.04)]))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Recognized {
                label: "Perch".into(),
                display_name: "окунь".into(),
                percentage: "91.00".into(),
                high_confidence: true,
            }
        );
    }

    #[test]
    fn unknown_top_entry_is_low_confidence_regardless_of_percentage() {
        let outcome = orchestrator()
            .interpret(&raw(&[("unknown", 0.60), ("Perch", 0.40)]))
            .unwrap();
        assert_eq!(outcome, Outcome::LowConfidence { percentage: "60.00".into() });
    }

    #[test]
    fn below_fifty_percent_is_low_confidence_regardless_of_label() {
        let outcome = orchestrator()
            .interpret(&raw(&[("Perch", 0.49), ("Catfish", 0.31), ("Gourami", 0.20)]))
            .unwrap();
        assert_eq!(outcome, Outcome::LowConfidence { percentage: "49.00".into() });
    }

    #[test]
    fn exactly_fifty_percent_is_recognized_without_emphasis() {
        let outcome = orchestrator()
            .interpret(&raw(&[("Catfish", 0.50), ("Perch", 0.50)]))
            .unwrap();
        // Tie: first-encountered entry wins.
        assert_eq!(
            outcome,
            Outcome::Recognized {
                label: "Catfish".into(),
                display_name: "сом".into(),
                percentage: "50.00".into(),
                high_confidence: false,
            }
        );
    }

    #[test]
    fn tie_break_is_deterministic_across_runs() {
        let input = raw(&[("Gourami", 0.45), ("Perch", 0.45), ("Catfish", 0.10)]);
        let orchestrator = orchestrator();
        for _ in 0..10 {
            let outcome = orchestrator.interpret(&input).unwrap();
            assert_eq!(outcome, Outcome::LowConfidence { percentage: "45.00".into() });
        }
        // Same tie above the floor resolves to the first entry every time.
        let input = raw(&[("Gourami", 0.50), ("Perch", 0.50)]);
        for _ in 0..10 {
            match orchestrator.interpret(&input).unwrap() {
                Outcome::Recognized { label, .. } => assert_eq!(label, "Gourami"),
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }

    #[test]
    fn percentage_is_rounded_to_two_decimals_within_bounds() {
        let orchestrator = orchestrator();
        for &p in &[0.0f32, 0.123_456, 0.499_99, 0.5, 0.805, 0.999_99, 1.0] {
            let outcome = orchestrator.interpret(&raw(&[("Perch", p)])).unwrap();
            let text = match outcome {
                Outcome::Recognized { percentage, .. } => percentage,
                Outcome::LowConfidence { percentage } => percentage,
            };
            let value: f64 = text.parse().unwrap();
            assert!((0.0..=100.0).contains(&value), "{value} out of range");
            assert_eq!(text, format!("{value:.2}"));
        }
    }

    #[test]
    fn empty_prediction_is_an_inference_error() {
        assert!(matches!(
            orchestrator().interpret(&raw(&[])),
            Err(ModelError::Inference(_))
        ));
    }

    #[test]
    fn last_write_wins_sequencing() {
        let orchestrator = orchestrator();
        orchestrator.note_issued(3);
        assert!(orchestrator.is_latest(3));

        // A newer request supersedes the in-flight one.
        orchestrator.note_issued(5);
        assert!(!orchestrator.is_latest(3));
        assert!(orchestrator.is_latest(5));

        // An out-of-order older issue never regresses the watermark.
        orchestrator.note_issued(4);
        assert!(orchestrator.is_latest(5));
    }
}
