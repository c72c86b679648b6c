//! Evaluation metrics: Hit@K, Recall@K, Mean Reciprocal Rank (MRR), and pooled nDCG@K.

use super::ExecutionResult;
use serde::Serialize;

/// Aggregate retrieval quality over all eligible cases
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub hit_at_k: f64,
    pub recall_at_k: f64,
    pub mrr: f64,
    pub ndcg_at_k: f64,
}

/// A case participates in metrics only if it succeeded and has ground truth.
pub fn is_eligible(case: &ExecutionResult) -> bool {
    case.error.is_none() && !case.expected.is_empty()
}

/// True if any normalized hit is in the expected set.
pub fn case_hit_at_k(case: &ExecutionResult) -> bool {
    case.hits.iter().any(|h| case.expected.contains(&h.id))
}

/// 1-based rank of the first relevant hit, 0 if none.
pub fn first_hit_rank(case: &ExecutionResult) -> usize {
    case.hits
        .iter()
        .position(|h| case.expected.contains(&h.id))
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Binary-relevance gain `2^rel - 1` discounted by `log2(i + 2)` for 0-based position `i`.
fn discounted_gain(rel: f64, position: usize) -> f64 {
    (2f64.powf(rel) - 1.0) / ((position + 2) as f64).log2()
}

/// Compute pooled metrics over `cases` with nominal cutoff `k`.
///
/// Hit@K, Recall@K and MRR are means over eligible cases. nDCG@K is the ratio
/// of summed DCG to summed ideal DCG across eligible cases, so cases with more
/// expected documents weigh more. The ideal DCG of a case is cut at that case's
/// K (`k` is used only when a case carries none). Returns all zeros when
/// nothing is eligible.
pub fn calc_metrics(cases: &[ExecutionResult], k: usize) -> Metrics {
    let mut total = 0usize;
    let mut hit_n = 0usize;
    let mut recall_sum = 0.0;
    let mut rr_sum = 0.0;
    let mut dcg_sum = 0.0;
    let mut idcg_sum = 0.0;

    for case in cases.iter().filter(|c| is_eligible(c)) {
        total += 1;
        let expected = &case.expected;

        if case_hit_at_k(case) {
            hit_n += 1;
        }

        let matched = case.hits.iter().filter(|h| expected.contains(&h.id)).count();
        recall_sum += (matched as f64 / expected.len() as f64).min(1.0);

        let rank = first_hit_rank(case);
        if rank > 0 {
            rr_sum += 1.0 / rank as f64;
        }

        let dcg: f64 = case
            .hits
            .iter()
            .enumerate()
            .filter(|(_, h)| expected.contains(&h.id))
            .map(|(i, _)| discounted_gain(1.0, i))
            .sum();
        // Hits were cut at the case's own K; the ideal ranking gets the same cutoff.
        let cutoff = if case.k > 0 { case.k } else { k };
        let mut idcg: f64 = (0..expected.len().min(cutoff))
            .map(|i| discounted_gain(1.0, i))
            .sum();
        if idcg == 0.0 {
            idcg = 1.0;
        }
        dcg_sum += dcg;
        idcg_sum += idcg;
    }

    if total == 0 {
        return Metrics::default();
    }
    let total = total as f64;
    Metrics {
        hit_at_k: hit_n as f64 / total,
        recall_at_k: recall_sum / total,
        mrr: rr_sum / total,
        ndcg_at_k: dcg_sum / idcg_sum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::normalize::dedup_top_k;
    use crate::bench::test_support::{case, err_result, hit, ok_result};
    use crate::error::CaseError;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_second_rank_hit() {
        let result = ok_result("s", &["doc1"], &["doc2", "doc1", "doc3"], 5);
        assert!(case_hit_at_k(&result));
        assert_eq!(first_hit_rank(&result), 2);

        let m = calc_metrics(&[result], 3);
        assert!(approx(m.hit_at_k, 1.0));
        assert!(approx(m.recall_at_k, 1.0));
        assert!(approx(m.mrr, 0.5));
        // DCG = 1/log2(3), IDCG = 1
        assert!(approx(m.ndcg_at_k, 1.0 / 3f64.log2()));
    }

    #[test]
    fn test_empty_expected_is_excluded() {
        let only = ok_result("e", &[], &["a", "b"], 5);
        assert!(!is_eligible(&only));
        assert_eq!(calc_metrics(&[only.clone()], 5), Metrics::default());

        // A second, eligible case is scored alone: the empty one doesn't dilute it.
        let good = ok_result("g", &["a"], &["a"], 5);
        let m = calc_metrics(&[only, good], 5);
        assert!(approx(m.hit_at_k, 1.0));
        assert!(approx(m.mrr, 1.0));
    }

    #[test]
    fn test_errors_are_excluded() {
        let failed = err_result(
            "f",
            &["a"],
            CaseError::Status {
                status: 500,
                body: "boom".into(),
            },
            12,
        );
        let miss = ok_result("m", &["a"], &["x"], 5);
        let m = calc_metrics(&[failed.clone(), miss], 5);
        assert!(approx(m.hit_at_k, 0.0));
        assert_eq!(calc_metrics(&[failed], 5), Metrics::default());
    }

    #[test]
    fn test_ndcg_is_pooled_not_averaged() {
        // Fully matched at rank 1 with one expected doc: DCG = 1, IDCG = 1.
        let perfect = ok_result("p", &["a"], &["a", "x"], 5);
        // Two expected docs, none retrieved: DCG = 0, IDCG = 1 + 1/log2(3).
        let miss = ok_result("m", &["b", "c"], &["x", "y"], 5);

        let m = calc_metrics(&[perfect, miss], 2);
        let idcg_miss = 1.0 + 1.0 / 3f64.log2();
        let pooled = 1.0 / (1.0 + idcg_miss);
        let averaged = (1.0 + 0.0) / 2.0;

        assert!(approx(m.ndcg_at_k, pooled));
        assert!(!approx(m.ndcg_at_k, averaged));
        assert!(approx(m.hit_at_k, 0.5));
        assert!(approx(m.recall_at_k, 0.5));
        assert!(approx(m.mrr, 0.5));
    }

    #[test]
    fn test_ideal_dcg_capped_by_k() {
        // Three expected, K = 2: ideal places only two relevant docs.
        let result = ok_result("c", &["a", "b", "c"], &["a", "b"], 5);
        let m = calc_metrics(&[result], 2);
        assert!(approx(m.ndcg_at_k, 1.0));
        assert!(approx(m.recall_at_k, 2.0 / 3.0));
    }

    #[test]
    fn test_ideal_dcg_follows_case_k_override() {
        // Case asks for 10 results while the suite K is 5.
        let expected: Vec<String> = (0..10).map(|i| format!("d{}", i)).collect();
        let expected_refs: Vec<&str> = expected.iter().map(String::as_str).collect();
        let hits: Vec<_> = expected_refs.iter().map(|id| hit(id)).collect();
        let result = ExecutionResult::success(case("wide", 10, &expected_refs), hits, 3);

        let m = calc_metrics(&[result], 5);
        assert!(m.ndcg_at_k <= 1.0, "ndcg {} above 1", m.ndcg_at_k);
        assert!(approx(m.ndcg_at_k, 1.0));
        assert!(approx(m.recall_at_k, 1.0));
    }

    #[test]
    fn test_hit_at_k_monotonic_in_k() {
        let raw = vec![hit("x"), hit("y"), hit("rel1"), hit("z"), hit("rel2")];
        let expected = ["rel1", "rel2"];
        let mut last = 0.0;
        for k in 1..=5 {
            let hits = dedup_top_k(raw.clone(), k);
            let result = ExecutionResult::success(case("q", k, &expected), hits, 1);
            let m = calc_metrics(&[result], k);
            assert!(m.hit_at_k >= last);
            last = m.hit_at_k;
        }
        assert!(approx(last, 1.0));
    }

    #[test]
    fn test_metrics_within_unit_interval() {
        let fixtures: [(&str, &[&str], &[&str]); 4] = [
            ("a", &["1"], &["1", "2", "3"]),
            ("b", &["1", "2"], &["2", "2", "1"]),
            ("c", &["9"], &["1", "2"]),
            ("d", &["1", "2", "3", "4"], &["4"]),
        ];
        for k in 1..=4 {
            let cases: Vec<ExecutionResult> = fixtures
                .iter()
                .map(|(id, expected, raw)| {
                    let raw: Vec<_> = raw.iter().map(|h| hit(h)).collect();
                    ExecutionResult::success(case(id, k, expected), dedup_top_k(raw, k), 1)
                })
                .collect();
            let m = calc_metrics(&cases, k);
            for v in [m.hit_at_k, m.recall_at_k, m.mrr, m.ndcg_at_k] {
                assert!((0.0..=1.0).contains(&v), "value {} out of range at k={}", v, k);
            }
        }
    }

    #[test]
    fn test_no_cases() {
        assert_eq!(calc_metrics(&[], 5), Metrics::default());
    }
}
