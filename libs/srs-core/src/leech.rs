//! Leech detection.

/// Whether a card with `lapses` lapses should be flagged as a leech.
///
/// Fires when the lapse count first reaches `threshold` and again every
/// `ceil(threshold / 2)` lapses after that. A threshold of zero disables
/// detection.
pub fn is_leech(lapses: u32, threshold: u32) -> bool {
    if threshold == 0 || lapses < threshold {
        return false;
    }
    (lapses - threshold) % threshold.div_ceil(2) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_threshold_then_every_half_threshold() {
        let hits: Vec<u32> = (0..=20).filter(|&lapses| is_leech(lapses, 8)).collect();
        assert_eq!(hits, vec![8, 12, 16, 20]);
    }

    #[test]
    fn odd_threshold_rounds_cadence_up() {
        let hits: Vec<u32> = (0..=15).filter(|&lapses| is_leech(lapses, 5)).collect();
        assert_eq!(hits, vec![5, 8, 11, 14]);
    }

    #[test]
    fn threshold_one_fires_every_lapse() {
        assert!(is_leech(1, 1));
        assert!(is_leech(2, 1));
        assert!(!is_leech(0, 1));
    }

    #[test]
    fn zero_threshold_disables() {
        assert!(!is_leech(0, 0));
        assert!(!is_leech(10, 0));
    }
}
