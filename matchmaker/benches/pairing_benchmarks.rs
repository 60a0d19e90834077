use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use matchmaker::strategy::{
    MatchmakingStrategy, PairingContext, RoundRobinStrategy, SwissStrategy,
};
use matchmaker::tournament::{HistoryEntry, PlayerId, PlayerStats, RoundConfig};
use std::collections::HashMap;
use std::hint::black_box;
use uuid::Uuid;

/// Owned data behind a pairing context
struct Pool {
    tournament_id: Uuid,
    players: Vec<PlayerId>,
    history: Vec<HistoryEntry>,
    stats: HashMap<PlayerId, PlayerStats>,
}

impl Pool {
    fn new(n: usize) -> Self {
        Self {
            tournament_id: Uuid::new_v4(),
            players: (0..n).map(|_| Uuid::new_v4()).collect(),
            history: Vec::new(),
            stats: HashMap::new(),
        }
    }

    fn ctx<'a>(&'a self, config: &'a RoundConfig, ordinal: u32) -> PairingContext<'a> {
        PairingContext {
            tournament_id: self.tournament_id,
            round_id: Uuid::new_v4(),
            ordinal,
            available: &self.players,
            config,
            history: &self.history,
            stats: &self.stats,
            carried: &[],
        }
    }

    /// Play `rounds` rounds where the first participant always wins
    fn play(&mut self, strategy: &dyn MatchmakingStrategy, config: &RoundConfig, rounds: u32) {
        for ordinal in 1..=rounds {
            let proposal = match strategy.create_matches(&self.ctx(config, ordinal)) {
                Ok(proposal) => proposal,
                Err(_) => return,
            };
            for game in proposal.matches {
                let winner = game.participants[0];
                self.stats
                    .entry(winner)
                    .or_insert_with(|| PlayerStats::new(self.tournament_id, winner))
                    .points += 1.0;
                self.history.push(HistoryEntry {
                    participants: game.participants,
                    round_ordinal: ordinal,
                });
            }
        }
    }
}

/// Benchmark Swiss pairing after several scored rounds
fn bench_swiss(c: &mut Criterion) {
    let config = RoundConfig::swiss();
    let mut group = c.benchmark_group("swiss_pairing");

    for n in [16, 64, 128] {
        let mut pool = Pool::new(n);
        pool.play(&SwissStrategy, &config, 5);

        group.bench_with_input(BenchmarkId::from_parameter(n), &pool, |b, pool| {
            b.iter(|| SwissStrategy.create_matches(black_box(&pool.ctx(&config, 6))));
        });
    }
    group.finish();
}

/// Benchmark round robin rotation search mid-tournament
fn bench_round_robin(c: &mut Criterion) {
    let config = RoundConfig::round_robin();
    let mut group = c.benchmark_group("round_robin_pairing");

    for n in [16, 64] {
        let mut pool = Pool::new(n);
        pool.play(&RoundRobinStrategy, &config, (n / 2) as u32);

        group.bench_with_input(BenchmarkId::from_parameter(n), &pool, |b, pool| {
            b.iter(|| RoundRobinStrategy.create_matches(black_box(&pool.ctx(&config, 1))));
        });
    }
    group.finish();
}

criterion_group!(pairing, bench_swiss, bench_round_robin);

criterion_main!(pairing);
