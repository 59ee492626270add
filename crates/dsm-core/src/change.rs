use std::collections::BTreeSet;

use tracing::info;

/// Change ratio between two versions of a system: elements added plus
/// elements removed, relative to the size of the earlier version.
///
/// Membership is by element name only; dependency changes between surviving
/// elements do not count. An empty earlier version yields 0.0 when the
/// later one is empty too, otherwise 1.0 (everything is new).
pub fn change_ratio(before: &[String], after: &[String]) -> f64 {
    let before: BTreeSet<&str> = before.iter().map(String::as_str).collect();
    let after: BTreeSet<&str> = after.iter().map(String::as_str).collect();

    let added = after.difference(&before).count();
    let removed = before.difference(&after).count();

    let ratio = if before.is_empty() {
        if after.is_empty() {
            0.0
        } else {
            1.0
        }
    } else {
        (added + removed) as f64 / before.len() as f64
    };
    info!(added, removed, ratio, "computed change ratio");
    ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identical_sets_have_zero_ratio() {
        let v = names(&["a", "b", "c"]);
        assert_eq!(change_ratio(&v, &v), 0.0);
    }

    #[test]
    fn test_added_and_removed_both_count() {
        // One removed (c), two added (d, e) against three originals.
        let before = names(&["a", "b", "c"]);
        let after = names(&["a", "b", "d", "e"]);
        assert_eq!(change_ratio(&before, &after), 1.0);
    }

    #[test]
    fn test_pure_addition() {
        let before = names(&["a", "b"]);
        let after = names(&["a", "b", "c"]);
        assert_eq!(change_ratio(&before, &after), 0.5);
    }

    #[test]
    fn test_complete_replacement_exceeds_one() {
        let before = names(&["a"]);
        let after = names(&["b", "c"]);
        assert_eq!(change_ratio(&before, &after), 3.0);
    }

    #[test]
    fn test_empty_before() {
        assert_eq!(change_ratio(&[], &names(&["a"])), 1.0);
        assert_eq!(change_ratio(&[], &[]), 0.0);
    }
}
