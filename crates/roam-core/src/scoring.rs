//! # Candidate Scoring
//!
//! Three ordered gates decide whether an idle access point is worth roaming
//! to; the first failing gate rejects it:
//!
//! 1. **Latency**: a candidate measured slower than the active link is out.
//!    Candidates without a measurement pass.
//! 2. **Quality**: the candidate must beat the active quality by strictly
//!    more than `quality_penalty`. This hysteresis keeps the controller from
//!    flapping between near-equal radios.
//! 3. **Rate**: never roam to a slower link class (equal rate is fine).
//!
//! Accepted candidates score `candidate.quality - active.quality`.

use crate::config::ScoringConfig;
use crate::registry::ConnectionEntry;

/// Which gate turned a candidate down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Latency,
    Quality,
    Rate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted { score: i32 },
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }

    /// Comparable score; rejected candidates score zero.
    pub fn score(&self) -> i32 {
        match self {
            Verdict::Accepted { score } => *score,
            Verdict::Rejected(_) => 0,
        }
    }
}

/// An accepted candidate together with its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice<'a> {
    pub entry: &'a ConnectionEntry,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateScorer {
    config: ScoringConfig,
}

impl CandidateScorer {
    pub fn new(config: ScoringConfig) -> Self {
        CandidateScorer { config }
    }

    pub fn evaluate(&self, candidate: &ConnectionEntry, active: &ConnectionEntry) -> Verdict {
        if let (Some(candidate_ms), Some(active_ms)) = (candidate.latency_ms, active.latency_ms) {
            if candidate_ms > active_ms {
                return Verdict::Rejected(Rejection::Latency);
            }
        }
        if candidate.quality <= active.quality.saturating_add(self.config.quality_penalty) {
            return Verdict::Rejected(Rejection::Quality);
        }
        if candidate.rate < active.rate {
            return Verdict::Rejected(Rejection::Rate);
        }
        Verdict::Accepted {
            score: candidate.quality - active.quality,
        }
    }

    /// Evaluate every candidate against `active` and pick the winner.
    pub fn best<'a, I>(&self, active: &ConnectionEntry, candidates: I) -> Option<Choice<'a>>
    where
        I: IntoIterator<Item = &'a ConnectionEntry>,
    {
        let accepted = candidates.into_iter().filter_map(|candidate| {
            let verdict = self.evaluate(candidate, active);
            tracing::debug!(
                bssid = %candidate.bssid,
                quality = candidate.quality,
                rate = candidate.rate,
                ?verdict,
                "candidate evaluated"
            );
            match verdict {
                Verdict::Accepted { score } => Some(Choice {
                    entry: candidate,
                    score,
                }),
                Verdict::Rejected(_) => None,
            }
        });
        select(accepted)
    }
}

/// Highest score wins; ties go to the lexicographically smaller BSSID.
pub fn select<'a, I>(choices: I) -> Option<Choice<'a>>
where
    I: IntoIterator<Item = Choice<'a>>,
{
    let mut ranked: Vec<Choice<'a>> = choices.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.entry.bssid.cmp(&b.entry.bssid))
    });
    ranked.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Observation;

    fn entry(bssid: &str, quality: i32, rate: u32, latency_ms: Option<f64>) -> ConnectionEntry {
        let mut e = ConnectionEntry::from(Observation {
            in_use: false,
            bssid: bssid.into(),
            ssid: "home".into(),
            quality,
            rate,
        });
        e.latency_ms = latency_ms;
        e
    }

    fn active() -> ConnectionEntry {
        let mut e = entry("AA", 50, 100, Some(20.0));
        e.in_use = true;
        e
    }

    fn scorer() -> CandidateScorer {
        CandidateScorer::default()
    }

    // ─── Gates ──────────────────────────────────────────────────────────

    #[test]
    fn clearly_better_candidate_is_accepted() {
        let verdict = scorer().evaluate(&entry("BB", 65, 100, None), &active());
        assert_eq!(verdict, Verdict::Accepted { score: 15 });
        assert!(verdict.is_accepted());
        assert_eq!(verdict.score(), 15);
    }

    #[test]
    fn quality_within_penalty_is_rejected() {
        let verdict = scorer().evaluate(&entry("CC", 58, 100, None), &active());
        assert_eq!(verdict, Verdict::Rejected(Rejection::Quality));
        assert_eq!(verdict.score(), 0);
    }

    #[test]
    fn quality_exactly_at_threshold_is_rejected() {
        let verdict = scorer().evaluate(&entry("CC", 60, 100, None), &active());
        assert_eq!(verdict, Verdict::Rejected(Rejection::Quality));
        let verdict = scorer().evaluate(&entry("CC", 61, 100, None), &active());
        assert_eq!(verdict, Verdict::Accepted { score: 11 });
    }

    #[test]
    fn worse_quality_is_never_accepted() {
        let verdict = scorer().evaluate(&entry("CC", 45, 300, None), &active());
        assert_eq!(verdict, Verdict::Rejected(Rejection::Quality));
    }

    #[test]
    fn slower_rate_is_rejected() {
        let verdict = scorer().evaluate(&entry("DD", 90, 54, None), &active());
        assert_eq!(verdict, Verdict::Rejected(Rejection::Rate));
    }

    #[test]
    fn equal_rate_passes() {
        let verdict = scorer().evaluate(&entry("DD", 90, 100, None), &active());
        assert_eq!(verdict, Verdict::Accepted { score: 40 });
    }

    #[test]
    fn measured_slower_candidate_is_rejected_first() {
        let verdict = scorer().evaluate(&entry("EE", 90, 54, Some(25.0)), &active());
        assert_eq!(verdict, Verdict::Rejected(Rejection::Latency));
    }

    #[test]
    fn measured_faster_candidate_passes_latency_gate() {
        let verdict = scorer().evaluate(&entry("EE", 90, 100, Some(15.0)), &active());
        assert_eq!(verdict, Verdict::Accepted { score: 40 });
    }

    #[test]
    fn custom_penalty() {
        let strict = CandidateScorer::new(ScoringConfig { quality_penalty: 30 });
        assert!(!strict.evaluate(&entry("BB", 65, 100, None), &active()).is_accepted());
        assert!(strict.evaluate(&entry("BB", 81, 100, None), &active()).is_accepted());
    }

    // ─── Selection ──────────────────────────────────────────────────────

    #[test]
    fn best_picks_highest_score() {
        let candidates = [
            entry("BB", 65, 100, None),
            entry("CC", 58, 100, None),
            entry("DD", 75, 100, None),
        ];
        let active = active();
        let choice = scorer().best(&active, candidates.iter()).unwrap();
        assert_eq!(choice.entry.bssid, "DD");
        assert_eq!(choice.score, 25);
    }

    #[test]
    fn ties_break_on_smaller_bssid() {
        let candidates = [entry("ZZ", 60, 100, None), entry("AA", 60, 100, None)];
        let choices = candidates.iter().map(|entry| Choice { entry, score: 10 });
        assert_eq!(select(choices).unwrap().entry.bssid, "AA");
    }

    #[test]
    fn no_accepted_candidates_means_no_winner() {
        let candidates = [entry("CC", 58, 100, None), entry("DD", 90, 10, None)];
        let active = active();
        assert!(scorer().best(&active, candidates.iter()).is_none());
        assert!(select(Vec::new()).is_none());
    }
}
