//! Plain orderings over the hearing log and the omit window shared by all
//! rankings.

use crate::algorithm::{rank_descending, Ranked};
use crate::song::SongHearing;
use chrono::{DateTime, Duration, FixedOffset};
use log::trace;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Drop every hearing younger than `window`, measured back from `now`.
///
/// A hearing is omitted when `now - heard_at < window`. `None`, a zero or a
/// negative window omit nothing. Used so that the song that is playing right
/// now does not dominate its own rankings.
#[must_use]
pub fn apply_omit_window(
    mut hearings: Vec<SongHearing>,
    now: DateTime<FixedOffset>,
    window: Option<Duration>,
) -> Vec<SongHearing> {
    let Some(window) = window.filter(|window| *window > Duration::zero()) else {
        return hearings;
    };

    let before = hearings.len();
    hearings.retain(|hearing| now - hearing.heard_at >= window);
    trace!(
        "Omit window of {}s dropped {} of {before} hearings.",
        window.num_seconds(),
        before - hearings.len()
    );
    hearings
}

/// Songs by number of hearings, most heard first.
#[must_use]
pub fn favourite(hearings: &[SongHearing]) -> Vec<Ranked<usize>> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for hearing in hearings {
        *counts.entry(hearing.name.as_str()).or_default() += 1;
    }
    rank_descending(counts)
}

/// Songs by their latest hearing, most recently heard first.
///
/// Hearings are compared as instants, so a song heard in another time zone
/// is placed by when it actually happened.
#[must_use]
pub fn last_heard(hearings: &[SongHearing]) -> Vec<Ranked<DateTime<FixedOffset>>> {
    let mut latest: HashMap<&str, DateTime<FixedOffset>> = HashMap::new();
    for hearing in hearings {
        match latest.entry(hearing.name.as_str()) {
            Entry::Occupied(mut entry) => {
                if hearing.heard_at > *entry.get() {
                    entry.insert(hearing.heard_at);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(hearing.heard_at);
            }
        }
    }
    rank_descending(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-01T21:00:00+01:00").unwrap()
    }

    fn names<S>(ranked: &[Ranked<S>]) -> Vec<&str> {
        ranked.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[test]
    fn test_omit_window_drops_young_hearings() {
        let now = t0() + Duration::minutes(30);
        let hearings = vec![
            SongHearing::new(1, "old", t0()),
            SongHearing::new(2, "edge", now - Duration::minutes(10)),
            SongHearing::new(3, "young", now - Duration::minutes(9)),
        ];
        let kept = apply_omit_window(hearings, now, Some(Duration::minutes(10)));

        let kept: Vec<_> = kept.iter().map(|hearing| hearing.name.as_str()).collect();
        assert_eq!(kept, ["old", "edge"]);
    }

    #[test]
    fn test_empty_omit_window_keeps_everything() {
        let hearings = vec![
            SongHearing::new(1, "now", t0()),
            SongHearing::new(2, "future", t0() + Duration::minutes(1)),
        ];

        assert_eq!(apply_omit_window(hearings.clone(), t0(), None).len(), 2);
        assert_eq!(apply_omit_window(hearings.clone(), t0(), Some(Duration::zero())).len(), 2);
        assert_eq!(apply_omit_window(hearings, t0(), Some(Duration::minutes(-5))).len(), 2);
    }

    #[test]
    fn test_favourite_counts_hearings() {
        let hearings = vec![
            SongHearing::new(1, "A", t0()),
            SongHearing::new(2, "B", t0()),
            SongHearing::new(2, "B", t0()),
            SongHearing::new(3, "C", t0()),
        ];
        let ranked = favourite(&hearings);

        assert_eq!(names(&ranked), ["B", "A", "C"]);
        assert_eq!(ranked[0].score, 2);
    }

    #[test]
    fn test_last_heard_uses_latest_instant() {
        // 20:30Z is later than 21:00+01:00.
        let abroad = DateTime::parse_from_rfc3339("2024-03-01T20:30:00Z").unwrap();
        let hearings = vec![
            SongHearing::new(1, "A", t0() - Duration::hours(2)),
            SongHearing::new(2, "B", t0()),
            SongHearing::new(1, "A", abroad),
            SongHearing::new(3, "C", t0() - Duration::hours(1)),
        ];
        let ranked = last_heard(&hearings);

        assert_eq!(names(&ranked), ["A", "B", "C"]);
        assert_eq!(ranked[0].score, abroad);
    }
}
