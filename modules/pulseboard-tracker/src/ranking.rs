//! Pure leaderboard aggregation over suggestion rows.
//!
//! The Postgres store expresses the same semantics in SQL; this function is
//! the in-memory mirror used by `MemoryStore` and by deterministic tests,
//! which need an explicit `now` to pin the time-window boundary.

use chrono::{DateTime, Utc};

use pulseboard_common::{points, LeaderboardEntry, LeaderboardQuery};

use crate::store::Suggestion;

/// Aggregate, filter, and rank suggestion rows.
///
/// Rows are admitted when `first_seen_at >= now - window` (inclusive) and,
/// if a search term is present, when the author handle contains it
/// case-insensitively. Groups keep first-encounter order; the sort by points
/// descending is stable, so ties stay in that order. `rank` is the 1-based
/// position in the final limited sequence.
pub fn rank_suggestions(
    rows: &[Suggestion],
    query: &LeaderboardQuery,
    now: DateTime<Utc>,
) -> Vec<LeaderboardEntry> {
    let cutoff = query.time_range.cutoff(now);
    let needle = query.search.as_ref().map(|s| s.to_lowercase());

    // Group by handle in first-encounter order.
    let mut groups: Vec<(String, i64, i64)> = Vec::new();
    for row in rows {
        if let Some(cutoff) = cutoff {
            if row.first_seen_at < cutoff {
                continue;
            }
        }
        if let Some(needle) = &needle {
            if !row.author_handle.to_lowercase().contains(needle.as_str()) {
                continue;
            }
        }
        match groups.iter_mut().find(|(h, _, _)| *h == row.author_handle) {
            Some((_, comments, likes)) => {
                *comments += 1;
                *likes += row.like_count;
            }
            None => groups.push((row.author_handle.clone(), 1, row.like_count)),
        }
    }

    groups.sort_by(|a, b| points(b.1, b.2).cmp(&points(a.1, a.2)));

    groups
        .into_iter()
        .take(query.limit.max(0) as usize)
        .enumerate()
        .map(|(i, (handle, comments, likes))| LeaderboardEntry {
            rank: i + 1,
            handle,
            comments,
            likes,
            points: points(comments, likes),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pulseboard_common::TimeRange;

    use crate::testing::make_suggestion;

    fn query(limit: i64, search: Option<&str>, time_range: TimeRange) -> LeaderboardQuery {
        LeaderboardQuery {
            limit,
            search: search.map(str::to_string),
            time_range,
        }
    }

    #[test]
    fn groups_and_scores_by_handle() {
        let now = Utc::now();
        let rows = vec![
            make_suggestion("1", "bob", 5, now),
            make_suggestion("2", "carol", 3, now),
            make_suggestion("3", "bob", 2, now),
        ];

        let entries = rank_suggestions(&rows, &query(50, None, TimeRange::All), now);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].handle, "bob");
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].comments, 2);
        assert_eq!(entries[0].likes, 7);
        assert_eq!(entries[0].points, 11);
        assert_eq!(entries[1].handle, "carol");
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[1].points, 5);
    }

    #[test]
    fn score_formula_is_likes_plus_double_comments() {
        let now = Utc::now();
        let rows: Vec<_> = [("a", 4), ("b", 3), ("c", 3)]
            .iter()
            .map(|(id, likes)| make_suggestion(id, "alice", *likes, now))
            .collect();

        let entries = rank_suggestions(&rows, &query(50, None, TimeRange::All), now);
        assert_eq!(entries[0].comments, 3);
        assert_eq!(entries[0].likes, 10);
        assert_eq!(entries[0].points, 16);
    }

    #[test]
    fn ordering_is_deterministic() {
        let now = Utc::now();
        let rows = vec![
            make_suggestion("1", "x", 4, now),
            make_suggestion("2", "y", 4, now),
            make_suggestion("3", "z", 9, now),
        ];

        let q = query(50, None, TimeRange::All);
        let first = rank_suggestions(&rows, &q, now);
        let second = rank_suggestions(&rows, &q, now);
        assert_eq!(first, second);
        // x and y tie at 6 points; first-encounter order breaks the tie.
        assert_eq!(first[0].handle, "z");
        assert_eq!(first[1].handle, "x");
        assert_eq!(first[2].handle, "y");
    }

    #[test]
    fn time_window_boundary_is_inclusive() {
        let now = Utc::now();
        let rows = vec![
            make_suggestion("1", "edge", 1, now - Duration::hours(24)),
            make_suggestion("2", "stale", 1, now - Duration::hours(24) - Duration::seconds(1)),
        ];

        let entries = rank_suggestions(&rows, &query(50, None, TimeRange::Day), now);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].handle, "edge");
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let now = Utc::now();
        let rows = vec![
            make_suggestion("1", "Alice42", 1, now),
            make_suggestion("2", "bob", 1, now),
        ];

        let entries = rank_suggestions(&rows, &query(50, Some("alice"), TimeRange::All), now);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].handle, "Alice42");
    }

    #[test]
    fn limit_caps_entries_and_rank_follows_position() {
        let now = Utc::now();
        let rows: Vec<_> = (0..5)
            .map(|i| make_suggestion(&i.to_string(), &format!("user{i}"), 10 - i, now))
            .collect();

        let entries = rank_suggestions(&rows, &query(3, None, TimeRange::All), now);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].rank, 3);
    }

    #[test]
    fn empty_store_yields_empty_leaderboard() {
        let entries = rank_suggestions(&[], &query(50, None, TimeRange::All), Utc::now());
        assert!(entries.is_empty());
    }
}
