use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{DataError, LabeledExample};

/// Fractions of each category assigned to train and validation; the rest goes to test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train: f64,
    pub validation: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.8,
            validation: 0.1,
        }
    }
}

impl SplitRatios {
    pub fn test(&self) -> f64 {
        1.0 - self.train - self.validation
    }

    pub fn validate(&self) -> Result<(), DataError> {
        let in_range = |f: f64| (0.0..=1.0).contains(&f);
        if !in_range(self.train) || !in_range(self.validation) {
            return Err(DataError::InvalidSplit(format!(
                "fractions must lie in [0, 1], got train={} validation={}",
                self.train, self.validation
            )));
        }
        if self.train + self.validation > 1.0 + 1e-9 {
            return Err(DataError::InvalidSplit(format!(
                "train + validation exceeds 1 ({} + {})",
                self.train, self.validation
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Splits {
    pub train: Vec<LabeledExample>,
    pub validation: Vec<LabeledExample>,
    pub test: Vec<LabeledExample>,
}

/// Partitions `examples` so that every category keeps its share in each part.
///
/// The overall sizes are fixed first: train gets `round(N · train)` rows and
/// validation `round(N · validation)`, test receives the rest. Each category
/// with `n` rows then gets the floor of `n · fraction`, and the rows still
/// owed go one at a time to the categories with the largest fractional
/// remainders. Rounding each category on its own would instead let many
/// tiny categories inflate train at the expense of the large ones.
///
/// Categories are visited in name order and every shuffle draws from one
/// generator seeded with `seed`, so the result is reproducible.
pub fn stratified_split(
    examples: &[LabeledExample],
    ratios: SplitRatios,
    seed: u64,
) -> Result<Splits, DataError> {
    ratios.validate()?;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut by_category: BTreeMap<&str, Vec<&LabeledExample>> = BTreeMap::new();
    for example in examples {
        by_category.entry(example.emotion.as_str()).or_default().push(example);
    }
    let mut groups: Vec<Vec<&LabeledExample>> = by_category.into_values().collect();
    for group in groups.iter_mut() {
        group.shuffle(&mut rng);
    }

    let total = examples.len();
    let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();

    let train_total = (((total as f64) * ratios.train).round() as usize).min(total);
    let train_counts = apportion(&sizes, ratios.train, &sizes, train_total);

    let left: Vec<usize> = sizes.iter().zip(&train_counts).map(|(n, t)| n - t).collect();
    let validation_total =
        (((total as f64) * ratios.validation).round() as usize).min(total - train_total);
    let validation_counts = apportion(&sizes, ratios.validation, &left, validation_total);

    let mut splits = Splits::default();
    for ((group, n_train), n_validation) in groups.iter().zip(train_counts).zip(validation_counts) {
        let (train, rest) = group.split_at(n_train);
        let (validation, test) = rest.split_at(n_validation);
        splits.train.extend(train.iter().map(|e| (*e).clone()));
        splits.validation.extend(validation.iter().map(|e| (*e).clone()));
        splits.test.extend(test.iter().map(|e| (*e).clone()));
    }

    splits.train.shuffle(&mut rng);
    splits.validation.shuffle(&mut rng);
    splits.test.shuffle(&mut rng);
    Ok(splits)
}

/// Largest-remainder allocation of `target` rows across categories, taking
/// `sizes[i] · fraction` from each but never more than `caps[i]`.
fn apportion(sizes: &[usize], fraction: f64, caps: &[usize], target: usize) -> Vec<usize> {
    let quotas: Vec<f64> = sizes.iter().map(|&n| n as f64 * fraction).collect();
    let mut counts: Vec<usize> = quotas
        .iter()
        .zip(caps)
        .map(|(q, &cap)| (q.floor() as usize).min(cap))
        .collect();

    // Stable sort keeps name order among equal remainders.
    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra)
    });

    let mut owed = target.saturating_sub(counts.iter().sum());
    while owed > 0 {
        let mut progressed = false;
        for &i in &order {
            if owed == 0 {
                break;
            }
            if counts[i] < caps[i] {
                counts[i] += 1;
                owed -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(counts: &[(&str, usize)]) -> Vec<LabeledExample> {
        counts
            .iter()
            .flat_map(|(emotion, n)| {
                (0..*n).map(move |i| LabeledExample::new(format!("{} text {}", emotion, i), *emotion))
            })
            .collect()
    }

    fn count(rows: &[LabeledExample], emotion: &str) -> usize {
        rows.iter().filter(|e| e.emotion == emotion).count()
    }

    #[test]
    fn test_split_sizes_follow_ratios() {
        let data = corpus(&[("joy", 100), ("anger", 60), ("fear", 40)]);
        let splits = stratified_split(&data, SplitRatios::default(), 42).unwrap();
        assert_eq!(splits.train.len(), 160);
        assert_eq!(splits.validation.len(), 20);
        assert_eq!(splits.test.len(), 20);
        assert_eq!(count(&splits.train, "joy"), 80);
        assert_eq!(count(&splits.validation, "anger"), 6);
        assert_eq!(count(&splits.test, "fear"), 4);
    }

    #[test]
    fn test_split_preserves_proportions() {
        let data = corpus(&[("joy", 313), ("anger", 127), ("fear", 61), ("grief", 19)]);
        let splits = stratified_split(&data, SplitRatios::default(), 7).unwrap();
        for emotion in ["joy", "anger", "fear", "grief"] {
            let full = count(&data, emotion) as f64 / data.len() as f64;
            let train = count(&splits.train, emotion) as f64 / splits.train.len() as f64;
            assert!((train - full).abs() < 0.02, "{}: {} vs {}", emotion, train, full);
        }
    }

    #[test]
    fn test_many_small_categories_do_not_inflate_train() {
        let minors: Vec<String> = (0..27).map(|i| format!("minor{:02}", i)).collect();
        let mut counts = vec![("joy", 100)];
        counts.extend(minors.iter().map(|name| (name.as_str(), 2)));
        let data = corpus(&counts);

        let splits = stratified_split(&data, SplitRatios::default(), 42).unwrap();
        assert_eq!(splits.train.len(), 123);
        assert_eq!(splits.validation.len(), 15);
        assert_eq!(splits.test.len(), 16);

        let full = 100.0 / data.len() as f64;
        let train = count(&splits.train, "joy") as f64 / splits.train.len() as f64;
        assert!((train - full).abs() < 0.02, "joy: {} vs {}", train, full);
        for name in &minors {
            assert!(count(&splits.train, name) >= 1, "{} missing from train", name);
        }
    }

    #[test]
    fn test_split_is_reproducible_and_lossless() {
        let data = corpus(&[("joy", 30), ("anger", 20)]);
        let a = stratified_split(&data, SplitRatios::default(), 42).unwrap();
        let b = stratified_split(&data, SplitRatios::default(), 42).unwrap();
        assert_eq!(a, b);
        let mut all: Vec<_> = a.train.iter().chain(&a.validation).chain(&a.test).cloned().collect();
        let mut original = data.clone();
        all.sort_by(|x, y| x.text.cmp(&y.text));
        original.sort_by(|x, y| x.text.cmp(&y.text));
        assert_eq!(all, original);
    }

    #[test]
    fn test_invalid_ratios() {
        let data = corpus(&[("joy", 3)]);
        let bad = SplitRatios { train: 0.9, validation: 0.2 };
        assert!(stratified_split(&data, bad, 1).is_err());
        let bad = SplitRatios { train: -0.1, validation: 0.2 };
        assert!(stratified_split(&data, bad, 1).is_err());
    }
}
