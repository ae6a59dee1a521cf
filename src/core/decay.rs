//! Exponential decay of the display score.

use chrono::{DateTime, Duration, Utc};

/// Default half-life of the display score.
pub const DEFAULT_HALF_LIFE_MS: i64 = 30_000;

/// Decay `score` over `elapsed` with the given half-life.
///
/// Never negative; non-positive elapsed time leaves the score unchanged.
pub fn decay_score(score: f64, elapsed: Duration, half_life: Duration) -> f64 {
    let elapsed_ms = elapsed.num_milliseconds();
    let half_life_ms = half_life.num_milliseconds();
    if !score.is_finite() || score <= 0.0 {
        return 0.0;
    }
    if elapsed_ms <= 0 || half_life_ms <= 0 {
        return score;
    }
    let factor = 0.5_f64.powf(elapsed_ms as f64 / half_life_ms as f64);
    f64::max(0.0, score * factor)
}

/// Decays a score on its own cadence.
#[derive(Debug, Clone)]
pub struct ScoreDecay {
    half_life: Duration,
    last_decay: Option<DateTime<Utc>>,
}

impl ScoreDecay {
    pub fn new(half_life: Duration) -> Self {
        Self {
            half_life,
            last_decay: None,
        }
    }

    pub fn last_decay(&self) -> Option<DateTime<Utc>> {
        self.last_decay
    }

    /// Apply decay for the time since the previous call.
    ///
    /// The first call only anchors the clock.
    pub fn apply(&mut self, score: f64, now: DateTime<Utc>) -> f64 {
        let decayed = match self.last_decay {
            Some(last) => decay_score(score, now - last, self.half_life),
            None => score,
        };
        self.last_decay = Some(now);
        decayed
    }

    pub fn reset(&mut self) {
        self.last_decay = None;
    }
}

impl Default for ScoreDecay {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_HALF_LIFE_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_life() -> Duration {
        Duration::milliseconds(DEFAULT_HALF_LIFE_MS)
    }

    #[test]
    fn test_one_half_life_halves_score() {
        let s = decay_score(10.0, Duration::milliseconds(30_000), half_life());
        assert!((s - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_half_lives_quarter_score() {
        let s = decay_score(8.0, Duration::milliseconds(60_000), half_life());
        assert!((s - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_decay_never_negative() {
        assert_eq!(decay_score(-1.0, Duration::seconds(5), half_life()), 0.0);
        assert_eq!(decay_score(f64::NAN, Duration::seconds(5), half_life()), 0.0);
        let s = decay_score(10.0, Duration::days(30), half_life());
        assert!(s >= 0.0);
        assert!(s < 1e-6);
    }

    #[test]
    fn test_stepwise_decay_matches_single_step() {
        let t0 = DateTime::parse_from_rfc3339("2024-01-22T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut decay = ScoreDecay::default();
        let mut score = decay.apply(10.0, t0);
        for i in 1..=6 {
            score = decay.apply(score, t0 + Duration::seconds(5 * i));
        }
        assert!((score - 5.0).abs() < 1e-9);
    }
}
