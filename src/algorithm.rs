//! Ranking algorithms over the hearing log.
//!
//! Both rankings sum exponentially decaying contributions, one per hearing,
//! and differ only in what the decay is measured against:
//!
//! - **Frecency** decays with the age of a hearing. A hearing's weight halves
//!   every `frecency_half_life_hours` (30 days by default), so songs heard
//!   recently *and* often float to the top while old habits fade out.
//! - **Suggestions** decay with the distance between a hearing and the
//!   nearest hearing of a reference song. The weight halves every
//!   `suggestion_half_life_minutes` (one hour by default), so songs usually
//!   played in the same session as the reference score highest.
//!
//! ```text
//! frecency(s)      = Σ exp(-λ · age_hours(h))             over hearings h of s
//! suggestion(s, R) = Σ exp(-λ2 · min_τ∈T_R |t(h) - τ|)    over hearings h of s ≠ R
//! λ = ln 2 / half-life
//! ```
//!
//! Scores are collected in unordered maps and then sorted. Equal scores are
//! ordered by song name so every listing is reproducible.

use crate::song::SongHearing;
use anyhow::{ensure, Result};
use chrono::{DateTime, FixedOffset};
use log::trace;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::f64::consts::LN_2;

const MILLIS_PER_MINUTE: f64 = 60_000.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Tunable decay parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingContext {
    pub frecency_half_life_hours: f64,
    pub suggestion_half_life_minutes: f64,
}

impl Default for RankingContext {
    fn default() -> Self {
        Self {
            frecency_half_life_hours: 30.0 * 24.0,
            suggestion_half_life_minutes: 60.0,
        }
    }
}

impl RankingContext {
    /// Decay constant per hour of hearing age.
    #[must_use]
    pub fn frecency_lambda(&self) -> f64 {
        LN_2 / self.frecency_half_life_hours
    }

    /// Decay constant per minute of distance to the reference song.
    #[must_use]
    pub fn suggestion_lambda(&self) -> f64 {
        LN_2 / self.suggestion_half_life_minutes
    }

    /// Half-lives must be positive and finite, otherwise every score
    /// collapses to 0, 1 or NaN.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.frecency_half_life_hours.is_finite() && self.frecency_half_life_hours > 0.0,
            "frecency half-life must be a positive number of hours, got {}",
            self.frecency_half_life_hours
        );
        ensure!(
            self.suggestion_half_life_minutes.is_finite()
                && self.suggestion_half_life_minutes > 0.0,
            "suggestion half-life must be a positive number of minutes, got {}",
            self.suggestion_half_life_minutes
        );
        Ok(())
    }
}

/// A song name with the value it was ranked by.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<S> {
    pub name: String,
    pub score: S,
}

/// A value songs can be ranked by. The order has to be total, so a stray
/// NaN still sorts the same way every time.
pub trait Score {
    fn total_order(&self, other: &Self) -> Ordering;
}

impl Score for f64 {
    fn total_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl Score for usize {
    fn total_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl Score for DateTime<FixedOffset> {
    fn total_order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

/// Sort `(name, score)` pairs by descending score, then ascending name.
pub(crate) fn rank_descending<K, S, I>(scores: I) -> Vec<Ranked<S>>
where
    K: Into<String>,
    S: Score,
    I: IntoIterator<Item = (K, S)>,
{
    let mut ranked: Vec<Ranked<S>> = scores
        .into_iter()
        .map(|(name, score)| Ranked {
            name: name.into(),
            score,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_order(&a.score)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked
}

#[inline]
fn decay(lambda: f64, distance: f64) -> f64 {
    (-lambda * distance).exp()
}

/// Frecency of every song in `hearings`, most frecent first.
///
/// Songs without hearings simply do not show up. Ages are wall-clock
/// durations, so the offsets the hearings were stored with do not matter.
///
/// # Examples
///
/// ```
/// use chrono::{DateTime, Duration};
/// use earmark::algorithm::{frecency, RankingContext};
/// use earmark::song::SongHearing;
///
/// let now = DateTime::parse_from_rfc3339("2024-03-01T21:00:00+01:00").unwrap();
/// let hearings = vec![
///     SongHearing::new(1, "old", now - Duration::days(60)),
///     SongHearing::new(2, "new", now - Duration::days(1)),
/// ];
///
/// let ranked = frecency(&hearings, now, &RankingContext::default());
/// assert_eq!(ranked[0].name, "new");
/// assert!((ranked[1].score - 0.25).abs() < 1e-9); // two half-lives
/// ```
#[must_use]
pub fn frecency(
    hearings: &[SongHearing],
    now: DateTime<FixedOffset>,
    context: &RankingContext,
) -> Vec<Ranked<f64>> {
    let lambda = context.frecency_lambda();
    let mut scores: HashMap<&str, f64> = HashMap::new();

    for hearing in hearings {
        #[allow(clippy::cast_precision_loss)]
        let age_hours = (now - hearing.heard_at).num_milliseconds() as f64 / MILLIS_PER_HOUR;
        *scores.entry(hearing.name.as_str()).or_default() += decay(lambda, age_hours);
    }

    trace!(
        "Calculated frecency of {} songs from {} hearings.",
        scores.len(),
        hearings.len()
    );
    rank_descending(scores)
}

/// Songs ordered by how closely their hearings cluster around the hearings
/// of the song with id `reference`. The reference itself is never listed.
///
/// Returns `None` when `hearings` contains no hearing of the reference song,
/// since there is nothing to correlate against.
#[must_use]
pub fn suggestions(
    hearings: &[SongHearing],
    reference: i64,
    context: &RankingContext,
) -> Option<Vec<Ranked<f64>>> {
    let mut reference_times: Vec<i64> = hearings
        .iter()
        .filter(|hearing| hearing.song_id == reference)
        .map(|hearing| hearing.heard_at.timestamp_millis())
        .collect();

    if reference_times.is_empty() {
        return None;
    }
    reference_times.sort_unstable();

    let lambda = context.suggestion_lambda();
    let mut scores: HashMap<&str, f64> = HashMap::new();

    for hearing in hearings.iter().filter(|hearing| hearing.song_id != reference) {
        let span = nearest_span_millis(&reference_times, hearing.heard_at.timestamp_millis());
        #[allow(clippy::cast_precision_loss)]
        let span_minutes = span as f64 / MILLIS_PER_MINUTE;
        *scores.entry(hearing.name.as_str()).or_default() += decay(lambda, span_minutes);
    }

    trace!(
        "Correlated {} songs against {} reference hearings.",
        scores.len(),
        reference_times.len()
    );
    Some(rank_descending(scores))
}

/// Distance from `at` to the closest entry of the sorted, non-empty
/// `reference_times`.
fn nearest_span_millis(reference_times: &[i64], at: i64) -> i64 {
    let idx = reference_times.partition_point(|&time| time < at);
    let after = reference_times.get(idx).map(|&time| time - at);
    let before = idx
        .checked_sub(1)
        .and_then(|prev| reference_times.get(prev))
        .map(|&time| at - time);

    after.into_iter().chain(before).min().unwrap_or(i64::MAX)
}
