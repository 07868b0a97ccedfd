pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    pub fn max(values: &[f64]) -> Option<f64> {
        values.iter().copied().fold(None, |acc, value| match acc {
            Some(current) if current >= value => Some(current),
            _ => Some(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(StatsHelper::mean(&[]), None);
    }

    #[test]
    fn mean_and_max_of_distances() {
        let values = [0.5, 1.5, 1.0];
        assert_eq!(StatsHelper::mean(&values), Some(1.0));
        assert_eq!(StatsHelper::max(&values), Some(1.5));
    }
}
