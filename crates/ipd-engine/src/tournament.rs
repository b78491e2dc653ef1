//! Round-robin tournament

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TournamentConfig;
use crate::error::Result;
use crate::game;
use crate::strategy::{Strategy, StrategyBase};

/// One roster entry's place in the final ranking
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based
    pub rank: usize,
    pub roster_index: usize,
    pub strategy: StrategyBase,
    pub total_score: i64,
    pub matches_played: u32,
    pub average_score: f64,
}

/// Scores of one played match, by roster index
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub index_a: usize,
    pub index_b: usize,
    pub score_a: i64,
    pub score_b: i64,
}

impl MatchRecord {
    pub fn is_self_play(&self) -> bool {
        self.index_a == self.index_b
    }
}

/// Ranked standings plus every match that produced them
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub standings: Vec<Standing>,
    pub matches: Vec<MatchRecord>,
}

impl Leaderboard {
    pub fn winner(&self) -> Option<&Standing> {
        self.standings.first()
    }

    /// Standing of a roster entry, regardless of rank
    pub fn entry(&self, roster_index: usize) -> Option<&Standing> {
        self.standings.iter().find(|s| s.roster_index == roster_index)
    }
}

/// Running score of one roster entry
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Tally {
    pub total: i64,
    pub matches: u32,
}

impl Tally {
    pub fn average(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            self.total as f64 / self.matches as f64
        }
    }
}

/// Play every pairing once and tally per entry
///
/// Pairings run in roster order: (0,0), (0,1), ... (1,1), (1,2), ... so the
/// random stream is consumed identically for a given roster and seed. A
/// self-play match credits the entry with side A's score only.
pub(crate) fn play_round_robin<R: Rng + ?Sized>(
    roster: &[Strategy],
    config: &TournamentConfig,
    rng: &mut R,
) -> (Vec<Tally>, Vec<MatchRecord>) {
    let n = roster.len();
    let mut tallies = vec![Tally::default(); n];
    let mut records = Vec::with_capacity(n * (n + 1) / 2);

    for i in 0..n {
        let first_opponent = if config.self_play { i } else { i + 1 };
        for j in first_opponent..n {
            let result = game::play(&roster[i], &roster[j], &config.match_config, rng);

            tallies[i].total += result.total_score_a;
            tallies[i].matches += 1;
            if i != j {
                tallies[j].total += result.total_score_b;
                tallies[j].matches += 1;
            }

            records.push(MatchRecord {
                index_a: i,
                index_b: j,
                score_a: result.total_score_a,
                score_b: result.total_score_b,
            });
        }
    }

    (tallies, records)
}

/// Run a round-robin tournament over `roster`
///
/// Every unordered pair meets exactly once, each entry also meets a fresh copy
/// of itself when `self_play` is set. Standings are ranked by descending
/// average score; ties keep roster order.
///
/// # Arguments
/// * `roster` - Entries, duplicates allowed
/// * `config` - Match settings and self-play switch
/// * `rng` - Source for every match in the tournament
pub fn run_round_robin<R: Rng + ?Sized>(
    roster: &[Strategy],
    config: &TournamentConfig,
    rng: &mut R,
) -> Result<Leaderboard> {
    config.validate()?;
    for strategy in roster {
        strategy.validate()?;
    }

    let (tallies, matches) = play_round_robin(roster, config, rng);

    let mut standings: Vec<Standing> = tallies
        .iter()
        .enumerate()
        .map(|(roster_index, tally)| Standing {
            rank: 0,
            roster_index,
            strategy: roster[roster_index].base,
            total_score: tally.total,
            matches_played: tally.matches,
            average_score: tally.average(),
        })
        .collect();

    // sort_by is stable, so equal averages keep roster order
    standings.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));
    for (i, standing) in standings.iter_mut().enumerate() {
        standing.rank = i + 1;
    }

    debug!(
        entries = roster.len(),
        matches = matches.len(),
        winner = ?standings.first().map(|s| s.strategy),
        "round robin finished"
    );

    Ok(Leaderboard { standings, matches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::error::{ConfigError, EngineError};
    use crate::noise::Noise;
    use crate::random::SeededRng;
    use approx::assert_relative_eq;

    fn roster(bases: &[StrategyBase]) -> Vec<Strategy> {
        bases.iter().map(|b| Strategy::new(*b)).collect()
    }

    fn clean(rounds: u32) -> TournamentConfig {
        TournamentConfig::new(MatchConfig::new(rounds, Noise::NONE))
    }

    #[test]
    fn test_empty_roster() {
        let mut rng = SeededRng::new(42);
        let board = run_round_robin(&[], &clean(10), &mut rng).unwrap();
        assert!(board.standings.is_empty());
        assert!(board.matches.is_empty());
        assert!(board.winner().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut rng = SeededRng::new(42);
        let err = run_round_robin(&roster(&[StrategyBase::TitForTat]), &clean(0), &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(ConfigError::ZeroRounds)));
    }

    #[test]
    fn test_match_count() {
        let mut rng = SeededRng::new(42);
        let entries = roster(&StrategyBase::ALL);
        let n = entries.len();

        let board = run_round_robin(&entries, &clean(20), &mut rng).unwrap();
        assert_eq!(board.matches.len(), n * (n + 1) / 2);
        assert_eq!(board.matches.iter().filter(|m| m.is_self_play()).count(), n);
        for standing in &board.standings {
            assert_eq!(standing.matches_played as usize, n);
        }

        let no_self = TournamentConfig { self_play: false, ..clean(20) };
        let board = run_round_robin(&entries, &no_self, &mut rng).unwrap();
        assert_eq!(board.matches.len(), n * (n - 1) / 2);
        assert!(board.matches.iter().all(|m| !m.is_self_play()));
    }

    #[test]
    fn test_leaderboard_self_consistency() {
        let mut rng = SeededRng::new(7);
        let entries = roster(&StrategyBase::ALL);
        let config = TournamentConfig::new(MatchConfig::new(50, Noise::flip(0.05)));
        let board = run_round_robin(&entries, &config, &mut rng).unwrap();

        for standing in &board.standings {
            let idx = standing.roster_index;
            let mut total = 0i64;
            let mut played = 0u32;
            for m in &board.matches {
                if m.index_a == idx {
                    total += m.score_a;
                    played += 1;
                } else if m.index_b == idx {
                    total += m.score_b;
                    played += 1;
                }
            }
            assert_eq!(standing.total_score, total, "total for entry {}", idx);
            assert_eq!(standing.matches_played, played);
            assert_relative_eq!(standing.average_score, total as f64 / played as f64);
        }
    }

    #[test]
    fn test_ranking_descending_with_ranks() {
        let mut rng = SeededRng::new(3);
        let board = run_round_robin(&roster(&StrategyBase::ALL), &clean(30), &mut rng).unwrap();

        for (i, pair) in board.standings.windows(2).enumerate() {
            assert!(pair[0].average_score >= pair[1].average_score);
            assert_eq!(pair[0].rank, i + 1);
        }
    }

    #[test]
    fn test_always_defect_beats_always_cooperate() {
        let mut rng = SeededRng::new(42);
        let entries = roster(&[StrategyBase::AlwaysCooperate, StrategyBase::AlwaysDefect]);
        let board = run_round_robin(&entries, &clean(200), &mut rng).unwrap();

        let head_to_head = board
            .matches
            .iter()
            .find(|m| !m.is_self_play())
            .unwrap();
        assert_eq!((head_to_head.score_a, head_to_head.score_b), (0, 1000));

        let winner = board.winner().unwrap();
        assert_eq!(winner.strategy, StrategyBase::AlwaysDefect);
        assert_eq!(winner.rank, 1);
        // 1000 against AllC, 200 against itself
        assert_eq!(winner.total_score, 1200);
        assert_eq!(board.entry(0).unwrap().total_score, 600);
    }

    #[test]
    fn test_ties_keep_roster_order() {
        let mut rng = SeededRng::new(42);
        let entries = roster(&[StrategyBase::TitForTat, StrategyBase::AlwaysCooperate, StrategyBase::TitForTat]);
        let board = run_round_robin(&entries, &clean(10), &mut rng).unwrap();

        // Everyone cooperates throughout, so all averages are equal
        let order: Vec<usize> = board.standings.iter().map(|s| s.roster_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_single_entry_without_self_play() {
        let mut rng = SeededRng::new(42);
        let config = TournamentConfig { self_play: false, ..clean(10) };
        let board = run_round_robin(&roster(&[StrategyBase::Pavlov]), &config, &mut rng).unwrap();

        assert_eq!(board.standings.len(), 1);
        assert_eq!(board.standings[0].matches_played, 0);
        assert_eq!(board.standings[0].average_score, 0.0);
    }

    #[test]
    fn test_tournament_determinism() {
        let entries = roster(&StrategyBase::ALL);
        let config = TournamentConfig::new(MatchConfig::new(40, Noise::flip(0.1)));

        let board1 = run_round_robin(&entries, &config, &mut SeededRng::new(99)).unwrap();
        let board2 = run_round_robin(&entries, &config, &mut SeededRng::new(99)).unwrap();
        assert_eq!(board1, board2);

        let board3 = run_round_robin(&entries, &config, &mut SeededRng::new(100)).unwrap();
        assert_ne!(board1.matches, board3.matches);
    }
}
