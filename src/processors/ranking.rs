//! Top-N ranking of classifier output against a label table.

use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::utils::LabelTable;
use std::cmp::Ordering;

/// One ranked prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub class_index: usize,
    pub label: String,
    pub probability: f32,
}

impl std::fmt::Display for RankedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" with confidence of {}", self.label, self.probability)
    }
}

/// Returns the `min(top_n, N)` highest-scoring classes, best first.
///
/// The sort is stable, so equal scores keep ascending index order. NaN scores
/// rank below every real score. Fails with `IndexMismatch` when the output
/// length differs from the label count.
pub fn rank(output: &[f32], labels: &LabelTable, top_n: usize) -> ClassifyResult<Vec<RankedResult>> {
    if output.len() != labels.len() {
        return Err(ClassifyError::index_mismatch(output.len(), labels.len()));
    }

    let mut indexed: Vec<(usize, f32)> = output.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| descending(a.1, b.1));

    indexed
        .into_iter()
        .take(top_n)
        .map(|(class_index, probability)| {
            let label = labels
                .get(class_index)
                .ok_or_else(|| ClassifyError::index_mismatch(output.len(), labels.len()))?;
            Ok(RankedResult {
                class_index,
                label: label.to_string(),
                probability,
            })
        })
        .collect()
}

fn descending(a: f32, b: f32) -> Ordering {
    a.is_nan()
        .cmp(&b.is_nan())
        .then_with(|| sort_key(b).total_cmp(&sort_key(a)))
}

fn sort_key(score: f32) -> f32 {
    if score == 0.0 {
        // Folds -0.0 into 0.0 so the two compare equal.
        0.0
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> LabelTable {
        LabelTable::new((0..n).map(|i| format!("class_{i}")).collect())
    }

    #[test]
    fn test_top1_of_thousand_classes() {
        let mut output = vec![0.0002_f32; 1000];
        output[281] = 0.82;
        output[285] = 0.1;
        output[287] = 0.05;

        let ranked = rank(&output, &labels(1000), 3).unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(
            ranked[0],
            RankedResult {
                class_index: 281,
                label: "class_281".to_string(),
                probability: 0.82,
            }
        );
        assert_eq!(ranked[1].class_index, 285);
        assert_eq!(ranked[2].class_index, 287);
        assert_eq!(ranked[0].to_string(), "\"class_281\" with confidence of 0.82");
    }

    #[test]
    fn test_length_mismatch() {
        let err = rank(&[0.001; 1000], &labels(999), 3).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::IndexMismatch {
                outputs: 1000,
                labels: 999
            }
        ));
    }

    #[test]
    fn test_ties_keep_index_order() {
        let mut output = vec![0.0_f32; 10];
        output[7] = 0.5;
        output[5] = 0.5;
        let ranked = rank(&output, &labels(10), 2).unwrap();
        assert_eq!(ranked[0].class_index, 5);
        assert_eq!(ranked[1].class_index, 7);
    }

    #[test]
    fn test_returns_min_of_top_n_and_classes() {
        let output = [0.2, 0.7, 0.1];
        assert_eq!(rank(&output, &labels(3), 5).unwrap().len(), 3);
        assert!(rank(&output, &labels(3), 0).unwrap().is_empty());

        let ranked = rank(&output, &labels(3), 3).unwrap();
        let order: Vec<_> = ranked.iter().map(|r| r.class_index).collect();
        assert_eq!(order, vec![1, 0, 2]);
        assert!(ranked.windows(2).all(|w| w[0].probability >= w[1].probability));
    }

    #[test]
    fn test_nan_ranks_last() {
        let output = [f32::NAN, -1.0, 0.3, -0.0, 0.0, f32::NEG_INFINITY, f32::NAN];
        let ranked = rank(&output, &labels(7), 7).unwrap();
        let order: Vec<_> = ranked.iter().map(|r| r.class_index).collect();
        assert_eq!(order, vec![2, 3, 4, 1, 5, 0, 6]);

        let ranked = rank(&[f32::NAN, f32::NEG_INFINITY], &labels(2), 2).unwrap();
        assert_eq!(ranked[0].class_index, 1);
    }
}
