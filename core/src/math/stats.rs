pub struct StatsHelper;

impl StatsHelper {
    /// Median of the samples; averages the two middle values for even counts.
    /// NaN samples are ignored.
    pub fn median(samples: impl IntoIterator<Item = f32>) -> Option<f32> {
        let mut values: Vec<f32> = samples.into_iter().filter(|v| !v.is_nan()).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));
        let mid = values.len() / 2;
        if values.len() % 2 == 0 {
            Some((values[mid - 1] + values[mid]) / 2.0)
        } else {
            Some(values[mid])
        }
    }
}
