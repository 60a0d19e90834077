//! Round robin via the circle method, generalised to groups of `k`.
//!
//! The pool is seated around a ring (padded with empty seats up to a multiple
//! of `k`). Seat 0 stays fixed while the others rotate one position per
//! rotation, and each rotation is folded into `k` rows to form groups; for
//! `k = 2` seat `i` meets seat `m - 1 - i`. Every round picks the rotation that
//! yields the most groups without a repeated pair.

use super::{
    MatchmakingStrategy, PairingContext, RoundProposal, ensure_supported, greedy_groups,
};
use crate::tournament::{ExhaustionPolicy, Match, Metadata, PlayerId, TournamentResult};
use serde_json::json;
use std::collections::HashSet;

type Seat = Option<PlayerId>;

/// Everyone meets everyone once
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinStrategy;

impl RoundRobinStrategy {
    pub const NAME: &'static str = "roundrobin";
}

fn seat_ring(pool: &[PlayerId], k: usize) -> Vec<Seat> {
    let mut seats: Vec<Seat> = pool.iter().copied().map(Some).collect();
    while seats.len() % k != 0 {
        seats.push(None);
    }
    seats
}

fn rotate(seats: &[Seat], r: usize) -> Vec<Seat> {
    let mut tail = seats[1..].to_vec();
    if !tail.is_empty() {
        let len = tail.len();
        tail.rotate_right(r % len);
    }
    let mut ring = Vec::with_capacity(seats.len());
    ring.push(seats[0]);
    ring.extend(tail);
    ring
}

fn fold(ring: &[Seat], k: usize) -> Vec<Vec<Seat>> {
    let width = ring.len() / k;
    (0..width)
        .map(|col| {
            (0..k)
                .map(|row| {
                    let offset = if row % 2 == 0 { col } else { width - 1 - col };
                    ring[row * width + offset]
                })
                .collect()
        })
        .collect()
}

/// Groups of a rotation that have no empty seat
fn seated_groups(seats: &[Seat], k: usize, r: usize) -> Vec<Vec<PlayerId>> {
    fold(&rotate(seats, r), k)
        .into_iter()
        .filter_map(|group| group.into_iter().collect::<Option<Vec<_>>>())
        .collect()
}

impl MatchmakingStrategy for RoundRobinStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supports_players_per_match(&self, n: usize) -> bool {
        n >= 2
    }

    fn create_matches(&self, ctx: &PairingContext<'_>) -> TournamentResult<RoundProposal> {
        ensure_supported(self, ctx)?;
        let k = ctx.players_per_match();
        if ctx.available.len() < k {
            return Err(ctx.insufficient(k));
        }

        let played = ctx.played_pairs();
        let seats = seat_ring(ctx.available, k);
        let rotations = (seats.len() - 1).max(1);

        let mut best: Option<(usize, Vec<Vec<PlayerId>>)> = None;
        for r in 0..rotations {
            let legal: Vec<Vec<PlayerId>> = seated_groups(&seats, k, r)
                .into_iter()
                .filter(|group| played.is_fresh(group))
                .collect();
            if !legal.is_empty() && best.as_ref().is_none_or(|(_, b)| legal.len() > b.len()) {
                best = Some((r, legal));
            }
        }

        if best.is_none() {
            let (loose, _) = greedy_groups(ctx.available, k, &played);
            if !loose.is_empty() {
                best = Some((rotations, loose));
            }
        }

        let (rotation, mut groups, rematch) = match best {
            Some((r, legal)) => (r, legal, false),
            None => match ctx.config.options.exhaustion {
                ExhaustionPolicy::Fail => return Err(ctx.exhausted(ctx.available.to_vec())),
                ExhaustionPolicy::Rematch => {
                    let r = ctx.ordinal.saturating_sub(1) as usize % rotations;
                    log::debug!("Round robin exhausted; repeating rotation {}", r);
                    (r, seated_groups(&seats, k, r), true)
                }
            },
        };

        let seated: HashSet<PlayerId> = groups.iter().flatten().copied().collect();
        let leftover: Vec<PlayerId> = ctx
            .available
            .iter()
            .copied()
            .filter(|p| !seated.contains(p))
            .collect();

        let (regrouped, mut waiting) = if rematch {
            (Vec::new(), leftover)
        } else {
            greedy_groups(&leftover, k, &played)
        };
        let regrouped_count = regrouped.len();
        groups.extend(regrouped);

        let mut matches: Vec<Match> = groups.into_iter().map(|g| ctx.schedule(g)).collect();
        if ctx.config.options.award_byes && waiting.len() == 1 {
            if let Some(player) = waiting.pop() {
                matches.push(ctx.bye(player));
            }
        }

        let mut metadata = Metadata::new();
        metadata.insert("rotation".into(), json!(rotation));
        metadata.insert("rotations".into(), json!(rotations));
        metadata.insert("regrouped".into(), json!(regrouped_count));
        metadata.insert("rematch".into(), json!(rematch));

        Ok(RoundProposal {
            matches,
            waiting,
            metadata,
        })
    }
}
