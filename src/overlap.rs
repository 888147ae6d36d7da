//! Half-open interval overlap for same-day time windows.
//!
//! Every conflict query in the crate reduces to [`overlaps`] after the rows
//! have been narrowed to one resource and one day.

/// Returns `true` when `[a_start, a_end)` and `[b_start, b_end)` share at
/// least one instant.
///
/// Windows that only touch (`a_end == b_start`) do not overlap, so
/// back-to-back classes in the same room are allowed.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // The three-clause test this replaces, kept here to pin equivalence.
    fn legacy_overlap(s: u32, e: u32, s2: u32, e2: u32) -> bool {
        (s <= s2 && e > s2) || (s < e2 && e >= e2) || (s >= s2 && e <= e2)
    }

    #[test]
    fn abutting_windows_do_not_overlap() {
        assert!(!overlaps(t(9, 0), t(10, 0), t(10, 0), t(11, 0)));
        assert!(!overlaps(t(10, 0), t(11, 0), t(9, 0), t(10, 0)));
    }

    #[test]
    fn partial_and_nested_windows_overlap() {
        assert!(overlaps(t(9, 0), t(10, 0), t(9, 30), t(10, 30)));
        assert!(overlaps(t(9, 0), t(12, 0), t(10, 0), t(11, 0)));
        assert!(overlaps(t(10, 0), t(11, 0), t(9, 0), t(12, 0)));
        assert!(overlaps(t(9, 0), t(10, 0), t(9, 0), t(10, 0)));
    }

    #[test]
    fn matches_legacy_test_for_well_formed_windows() {
        for s in 0..6u32 {
            for e in (s + 1)..7 {
                for s2 in 0..6u32 {
                    for e2 in (s2 + 1)..7 {
                        assert_eq!(
                            overlaps(s, e, s2, e2),
                            legacy_overlap(s, e, s2, e2),
                            "[{s},{e}) vs [{s2},{e2})"
                        );
                    }
                }
            }
        }
    }
}
