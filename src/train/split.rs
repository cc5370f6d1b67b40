//! Stratified train/validation split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Split row indices into `(train, validation)`, preserving the class
/// balance of `y` in both folds. Each class is shuffled with the seed and
/// split independently; at least one row per non-empty class lands in each
/// fold when the class has two or more rows.
#[must_use]
pub fn stratified_split(y: &[u8], validation_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut validation = Vec::new();

    for class in [0u8, 1] {
        let mut indices: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        if indices.is_empty() {
            continue;
        }
        indices.shuffle(&mut rng);

        let mut n_validation = (indices.len() as f64 * validation_fraction).round() as usize;
        if indices.len() >= 2 {
            n_validation = n_validation.clamp(1, indices.len() - 1);
        } else {
            n_validation = 0;
        }

        validation.extend_from_slice(&indices[..n_validation]);
        train.extend_from_slice(&indices[n_validation..]);
    }

    train.sort_unstable();
    validation.sort_unstable();
    (train, validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn folds_partition_the_rows() {
        let y: Vec<u8> = (0..100).map(|i| u8::from(i % 10 == 0)).collect();
        let (train, validation) = stratified_split(&y, 0.2, 42);

        assert_eq!(train.len() + validation.len(), y.len());
        let mut all: Vec<usize> = train.iter().chain(&validation).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..y.len()).collect::<Vec<_>>());
    }

    #[test]
    fn both_folds_keep_both_classes() {
        // 10% positives, enough rows that each fold must see some
        let y: Vec<u8> = (0..100).map(|i| u8::from(i % 10 == 0)).collect();
        let (train, validation) = stratified_split(&y, 0.2, 42);

        for fold in [&train, &validation] {
            assert!(fold.iter().any(|&i| y[i] == 1), "fold lost the positives");
            assert!(fold.iter().any(|&i| y[i] == 0), "fold lost the negatives");
        }
        // validation holds roughly 20 rows: 2 positive, 18 negative
        assert_eq!(validation.len(), 20);
        assert_eq!(validation.iter().filter(|&&i| y[i] == 1).count(), 2);
    }

    #[test]
    fn split_is_seeded() {
        let y: Vec<u8> = (0..50).map(|i| (i % 2) as u8).collect();
        assert_eq!(stratified_split(&y, 0.3, 7), stratified_split(&y, 0.3, 7));
        assert_ne!(stratified_split(&y, 0.3, 7), stratified_split(&y, 0.3, 8));
    }

    #[test]
    fn tiny_classes_stay_in_training() {
        // a single positive row cannot be spared for validation
        let y = [0, 0, 0, 0, 1];
        let (train, validation) = stratified_split(&y, 0.2, 1);
        assert!(train.contains(&4));
        assert!(!validation.contains(&4));
    }

    proptest! {
        #[test]
        fn never_loses_or_duplicates_rows(
            y in prop::collection::vec(0u8..2, 1..200),
            fraction in 0.05f64..0.5,
            seed in any::<u64>()
        ) {
            let (train, validation) = stratified_split(&y, fraction, seed);
            let mut all: Vec<usize> = train.iter().chain(&validation).copied().collect();
            all.sort_unstable();
            all.dedup();
            prop_assert_eq!(all.len(), y.len());
        }
    }
}
