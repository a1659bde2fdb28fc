//! Consensus analysis over per-pass OCR readings.
//!
//! Individual recognition passes disagree constantly; a score is only
//! trusted when enough independent passes land within a small tolerance of
//! each other. The grouping is a greedy single pass over readings in arrival
//! order: each reading joins the first group whose key is close enough, or
//! opens a new group. Group creation order and first-match assignment are
//! part of the observable contract, not an implementation detail - a
//! different scan order over the same multiset can produce different groups.

/// One candidate reading produced by a (preprocessing, PSM) pass.
/// A value of 0 means "nothing recognized", never a genuine 0% score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub value: u8,
    /// Tag identifying which preprocessing+PSM pair produced this reading
    pub source: String,
}

impl Reading {
    pub fn new(value: u8, source: impl Into<String>) -> Self {
        Self {
            value,
            source: source.into(),
        }
    }
}

/// A tolerance-bounded cluster of mutually corroborating readings.
#[derive(Debug)]
struct Group {
    /// The value of the reading that opened the group
    key: u8,
    values: Vec<u8>,
    sources: Vec<String>,
}

impl Group {
    fn mean(&self) -> f64 {
        self.values.iter().map(|&v| v as f64).sum::<f64>() / self.values.len() as f64
    }
}

/// Result of consensus analysis over one image's readings.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsensusOutcome {
    Accepted {
        /// Mean of the winning group, rounded half-to-even
        score: u8,
        /// Unrounded mean, kept for the rationale string
        mean: f64,
        group_size: usize,
        /// Source tags of the readings that agreed
        sources: Vec<String>,
    },
    /// Fewer than the quorum of non-zero readings existed at all
    Insufficient { count: usize },
    /// Groups formed, but none reached the quorum
    NoConsensus { largest_group: usize },
}

/// Rounds half-to-even. Group means are exact multiples of 1/n, so the .5
/// case is representable and the comparison is safe.
fn round_half_even(value: f64) -> u8 {
    let floor = value.floor();
    if (value - floor - 0.5).abs() < 1e-9 {
        let floor = floor as u8;
        if floor % 2 == 0 {
            floor
        } else {
            floor + 1
        }
    } else {
        value.round() as u8
    }
}

/// Reduces the full reading set from one image to a single trusted score.
///
/// Zero-valued readings are discarded first: they signal a pass that
/// recognized nothing. Among groups reaching the quorum, the one with the
/// highest average wins even if a larger group exists; ties go to the group
/// created first.
pub fn analyze(readings: &[Reading], min_results: usize, tolerance: u32) -> ConsensusOutcome {
    let nonzero: Vec<&Reading> = readings.iter().filter(|r| r.value > 0).collect();

    if nonzero.len() < min_results {
        return ConsensusOutcome::Insufficient {
            count: nonzero.len(),
        };
    }

    // Greedy single-pass grouping, first match wins
    let mut groups: Vec<Group> = Vec::new();
    for reading in &nonzero {
        let slot = groups
            .iter_mut()
            .find(|g| (g.key as i32 - reading.value as i32).unsigned_abs() <= tolerance);
        match slot {
            Some(group) => {
                group.values.push(reading.value);
                group.sources.push(reading.source.clone());
            }
            None => groups.push(Group {
                key: reading.value,
                values: vec![reading.value],
                sources: vec![reading.source.clone()],
            }),
        }
    }

    let largest_group = groups.iter().map(|g| g.values.len()).max().unwrap_or(0);

    // Strictly-greater comparison keeps the first group on mean ties
    let winner = groups
        .iter()
        .filter(|g| g.values.len() >= min_results)
        .fold(None::<&Group>, |best, g| match best {
            Some(b) if g.mean() <= b.mean() => Some(b),
            _ => Some(g),
        });

    match winner {
        Some(group) => {
            let mean = group.mean();
            ConsensusOutcome::Accepted {
                score: round_half_even(mean),
                mean,
                group_size: group.values.len(),
                sources: group.sources.clone(),
            }
        }
        None => ConsensusOutcome::NoConsensus { largest_group },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(values: &[u8]) -> Vec<Reading> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Reading::new(v, format!("pass-{}", i)))
            .collect()
    }

    #[test]
    fn test_insufficient_nonzero_readings() {
        let outcome = analyze(&readings(&[75, 75, 0, 0, 0]), 3, 2);
        assert_eq!(outcome, ConsensusOutcome::Insufficient { count: 2 });
    }

    #[test]
    fn test_zero_readings_never_group() {
        // Three zeros plus two 75s: zeros must not count toward quorum
        let outcome = analyze(&readings(&[0, 0, 0, 75, 75]), 3, 2);
        assert_eq!(outcome, ConsensusOutcome::Insufficient { count: 2 });
    }

    #[test]
    fn test_simple_quorum_accepts_rounded_mean() {
        let outcome = analyze(&readings(&[74, 75, 76]), 3, 2);
        match outcome {
            ConsensusOutcome::Accepted {
                score, group_size, ..
            } => {
                assert_eq!(score, 75);
                assert_eq!(group_size, 3);
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_half_mean_rounds_to_even() {
        // mean 74.5 -> 74 (down to even), mean 75.5 -> 76 (up to even)
        for (values, expected) in [(&[74u8, 74, 75, 75], 74u8), (&[75, 75, 76, 76], 76)] {
            match analyze(&readings(values), 3, 2) {
                ConsensusOutcome::Accepted { score, mean, .. } => {
                    assert_eq!(mean, values[1] as f64 + 0.5);
                    assert_eq!(score, expected);
                }
                other => panic!("expected acceptance, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(74.5), 74);
        assert_eq!(round_half_even(75.5), 76);
        assert_eq!(round_half_even(75.0), 75);
        assert_eq!(round_half_even(75.4), 75);
        assert_eq!(round_half_even(75.6), 76);
        assert_eq!(round_half_even(0.5), 0);
    }

    #[test]
    fn test_greedy_grouping_order() {
        // Readings [50, 52, 90, 91, 92], tolerance 2, quorum 2
        // Groups: {50, 52} and {90, 91, 92}; higher-mean group wins -> 91
        let outcome = analyze(&readings(&[50, 52, 90, 91, 92]), 2, 2);
        match outcome {
            ConsensusOutcome::Accepted {
                score, group_size, ..
            } => {
                assert_eq!(score, 91);
                assert_eq!(group_size, 3);
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_higher_mean_beats_larger_group() {
        // {60 x4} vs {95 x3}: smaller group has the higher mean and wins
        let outcome = analyze(&readings(&[60, 60, 60, 60, 95, 95, 95]), 3, 2);
        match outcome {
            ConsensusOutcome::Accepted {
                score, group_size, ..
            } => {
                assert_eq!(score, 95);
                assert_eq!(group_size, 3);
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_no_group_reaches_quorum() {
        let outcome = analyze(&readings(&[10, 40, 70, 95]), 3, 2);
        assert_eq!(outcome, ConsensusOutcome::NoConsensus { largest_group: 1 });
    }

    #[test]
    fn test_largest_group_reported_on_failure() {
        // {80, 81} is the biggest cluster but quorum is 3
        let outcome = analyze(&readings(&[80, 81, 20, 50]), 3, 2);
        assert_eq!(outcome, ConsensusOutcome::NoConsensus { largest_group: 2 });
    }

    #[test]
    fn test_first_match_wins_assignment() {
        // 52 is within tolerance of both the 50-group and a later 54-group,
        // but it joins the first group, so no 54-keyed group ever forms
        let outcome = analyze(&readings(&[50, 52, 52, 54]), 3, 2);
        match outcome {
            ConsensusOutcome::Accepted {
                score, group_size, ..
            } => {
                // 54 differs from key 50 by 4, so it opens its own group of 1
                assert_eq!(group_size, 3);
                assert_eq!(score, 51); // round(mean(50, 52, 52))
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_membership_uses_group_key_not_members() {
        // Key stays at the founding value: 70, 72, 74 -> 74 is outside
        // tolerance of key 70 even though it is within 2 of member 72
        let outcome = analyze(&readings(&[70, 72, 74, 74, 74]), 3, 2);
        match outcome {
            ConsensusOutcome::Accepted {
                score, group_size, ..
            } => {
                assert_eq!(group_size, 3);
                assert_eq!(score, 74);
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_sources_follow_winning_group() {
        let input = vec![
            Reading::new(90, "stretch+PSM 6"),
            Reading::new(91, "equalize+PSM 7"),
            Reading::new(90, "otsu+PSM 11"),
            Reading::new(30, "high-contrast+PSM 3"),
        ];
        match analyze(&input, 3, 2) {
            ConsensusOutcome::Accepted { sources, .. } => {
                assert_eq!(
                    sources,
                    vec!["stretch+PSM 6", "equalize+PSM 7", "otsu+PSM 11"]
                );
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }
}
