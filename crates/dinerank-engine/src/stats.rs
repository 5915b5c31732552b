use dinerank_core::Score;

const BUCKETS: usize = Score::MAX_HUNDREDTHS as usize + 1;

/// Per-score counts of rated restaurants plus a running sum.
///
/// Scores are exact hundredths, so one bucket per representable score keeps
/// every aggregate exact and each mutation O(1).
#[derive(Debug, Clone)]
pub struct ScoreHistogram {
    buckets: Box<[u32; BUCKETS]>,
    count: usize,
    sum: u64,
}

impl Default for ScoreHistogram {
    fn default() -> Self {
        Self {
            buckets: Box::new([0; BUCKETS]),
            count: 0,
            sum: 0,
        }
    }
}

impl ScoreHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, score: Score) {
        self.buckets[usize::from(score.hundredths())] += 1;
        self.count += 1;
        self.sum += u64::from(score.hundredths());
    }

    pub fn remove(&mut self, score: Score) {
        let bucket = &mut self.buckets[usize::from(score.hundredths())];
        if *bucket == 0 {
            return;
        }
        *bucket -= 1;
        self.count -= 1;
        self.sum -= u64::from(score.hundredths());
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Sum of all scores, in hundredths.
    pub fn sum_hundredths(&self) -> u64 {
        self.sum
    }

    /// Unrounded mean rating, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64 / 100.0)
    }

    /// Number of rated restaurants scoring at or below `score`.
    pub fn at_or_below(&self, score: Score) -> usize {
        self.buckets[..=usize::from(score.hundredths())]
            .iter()
            .map(|&n| n as usize)
            .sum()
    }

    /// `score - mean`, computed in hundredths to avoid accumulating error.
    pub fn delta_from_mean(&self, score: Score) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as i128;
        let scaled = i128::from(score.hundredths()) * n - i128::from(self.sum);
        Some(scaled as f64 / n as f64 / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: f64) -> Score {
        Score::from_f64(v).unwrap()
    }

    #[test]
    fn mean_of_sample_set() {
        let mut h = ScoreHistogram::new();
        for v in [4.9, 4.8, 4.8, 4.5] {
            h.add(s(v));
        }
        assert_eq!(h.count(), 4);
        assert_eq!(h.sum_hundredths(), 1900);
        assert_eq!(h.mean(), Some(4.75));
    }

    #[test]
    fn empty_histogram_has_no_mean() {
        let h = ScoreHistogram::new();
        assert_eq!(h.mean(), None);
        assert_eq!(h.delta_from_mean(s(3.0)), None);
        assert_eq!(h.at_or_below(Score::MAX), 0);
    }

    #[test]
    fn at_or_below_counts_ties() {
        let mut h = ScoreHistogram::new();
        for v in [4.9, 4.8, 4.8, 4.5] {
            h.add(s(v));
        }
        assert_eq!(h.at_or_below(s(4.8)), 3);
        assert_eq!(h.at_or_below(s(4.9)), 4);
        assert_eq!(h.at_or_below(s(4.4)), 0);
    }

    #[test]
    fn remove_reverses_add() {
        let mut h = ScoreHistogram::new();
        h.add(s(2.0));
        h.add(s(3.0));
        h.remove(s(2.0));
        assert_eq!(h.count(), 1);
        assert_eq!(h.mean(), Some(3.0));
        // removing an absent score is a no-op
        h.remove(s(1.0));
        assert_eq!(h.count(), 1);
    }

    #[test]
    fn delta_is_exact_in_hundredths() {
        let mut h = ScoreHistogram::new();
        for v in [4.9, 4.8, 4.8, 4.5] {
            h.add(s(v));
        }
        let delta = h.delta_from_mean(s(4.9)).unwrap();
        assert!((delta - 0.15).abs() < 1e-9);
        let delta = h.delta_from_mean(s(4.5)).unwrap();
        assert!((delta + 0.25).abs() < 1e-9);
    }
}
