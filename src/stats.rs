/// Average and quartile means of one sampled metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntervalStats {
    pub avg: f64,
    pub p25: f64,
    pub p75: f64,
}

impl IntervalStats {
    /// Summarize `samples`. Returns `None` when there is nothing to summarize.
    ///
    /// `p75` is the mean of the top quarter of sorted values and `p25` the mean of the
    /// bottom quarter. With fewer than four values the bottom quarter would be empty, so it
    /// is widened to the single smallest value.
    pub fn from_samples(samples: &[f64]) -> Option<IntervalStats> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let upper_start = n * 3 / 4;
        let lower_end = (n / 4).max(1);

        Some(IntervalStats {
            avg: mean(&sorted),
            p25: mean(&sorted[..lower_end]),
            p75: mean(&sorted[upper_start..]),
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
