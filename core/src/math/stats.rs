pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| f64::from(v) * f64::from(v)).sum();
        (sum_sq / samples.len() as f64).sqrt() as f32
    }

    /// Mean of the finite samples, `None` when there are none.
    pub fn mean<I>(samples: I) -> Option<f64>
    where
        I: IntoIterator<Item = f32>,
    {
        let (sum, count) = samples
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((0.0_f64, 0_usize), |(sum, count), v| (sum + f64::from(v), count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Median of the finite samples, averaging the middle pair for even counts.
    pub fn median<I>(samples: I) -> Option<f64>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut values: Vec<f32> = samples.into_iter().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f32::total_cmp);
        let mid = values.len() / 2;
        let median = if values.len() % 2 == 0 {
            (f64::from(values[mid - 1]) + f64::from(values[mid])) / 2.0
        } else {
            f64::from(values[mid])
        };
        Some(median)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_zero_sequence_yields_zero() {
        assert_eq!(StatsHelper::rms(&[]), 0.0);
        assert_eq!(StatsHelper::rms(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn rms_handles_single_value() {
        assert_eq!(StatsHelper::rms(&[4.0]), 4.0);
    }

    #[test]
    fn median_skips_nans_and_averages_even_counts() {
        assert_eq!(StatsHelper::median([3.0, f32::NAN, 1.0, 2.0]), Some(2.0));
        assert_eq!(StatsHelper::median([4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(StatsHelper::median([f32::NAN]), None);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(StatsHelper::mean(Vec::<f32>::new()), None);
        assert_eq!(StatsHelper::mean([1.0, 2.0, 6.0]), Some(3.0));
    }
}
