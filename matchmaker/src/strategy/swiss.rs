//! Swiss system pairing.
//!
//! The pool is split into score groups (points descending, join order inside a
//! group). In an odd pool one player from the lowest group sits out first,
//! preferring someone who has not had a bye yet. The rest are paired from the
//! lowest group upwards; within a group a bounded depth-first search looks for
//! the pairing that leaves the fewest players unpaired, trying opponents in
//! "fold" order (top half against bottom half) first. Players that cannot be
//! paired float up into the next group.

use super::{
    MatchmakingStrategy, PairingContext, PlayedPairs, RoundProposal, ensure_supported,
    greedy_groups,
};
use crate::tournament::{ExhaustionPolicy, Metadata, PlayerId, TournamentResult};
use serde_json::json;
use std::collections::HashSet;

/// Upper bound on search steps for one pairing attempt
const SEARCH_LIMIT: usize = 200_000;

/// Players with equal scores meet players they have not played yet
#[derive(Debug, Clone, Copy, Default)]
pub struct SwissStrategy;

impl SwissStrategy {
    pub const NAME: &'static str = "swiss";
}

/// Active players grouped by points, highest group first
fn score_groups(ctx: &PairingContext<'_>) -> Vec<Vec<PlayerId>> {
    let mut ordered = ctx.available.to_vec();
    ordered.sort_by(|a, b| ctx.points_of(*b).total_cmp(&ctx.points_of(*a)));

    let mut groups: Vec<Vec<PlayerId>> = Vec::new();
    let mut last = None;
    for player in ordered {
        let points = ctx.points_of(player);
        match groups.last_mut() {
            Some(group) if last == Some(points) => group.push(player),
            _ => groups.push(vec![player]),
        }
        last = Some(points);
    }
    groups
}

/// The player who sits out an odd pool: the lowest scorer without an earlier
/// bye, latest joiner first
fn odd_one_out(ctx: &PairingContext<'_>, groups: &[Vec<PlayerId>]) -> Option<PlayerId> {
    if ctx.available.len() % 2 == 0 {
        return None;
    }
    let had_bye: HashSet<PlayerId> = ctx
        .history
        .iter()
        .filter(|entry| entry.participants.len() == 1)
        .map(|entry| entry.participants[0])
        .collect();

    let fallback = groups.last().and_then(|g| g.last().copied());
    groups
        .iter()
        .rev()
        .flat_map(|g| g.iter().rev().copied())
        .find(|p| !had_bye.contains(p))
        .or(fallback)
}

struct PairSearch<'a> {
    members: &'a [PlayerId],
    played: &'a PlayedPairs,
    used: Vec<bool>,
    pairs: Vec<(usize, usize)>,
    skipped: Vec<usize>,
    steps: usize,
}

impl<'a> PairSearch<'a> {
    fn new(members: &'a [PlayerId], played: &'a PlayedPairs) -> Self {
        Self {
            members,
            played,
            used: vec![false; members.len()],
            pairs: Vec::new(),
            skipped: Vec::new(),
            steps: 0,
        }
    }

    fn reset(&mut self) {
        self.used.iter_mut().for_each(|u| *u = false);
        self.pairs.clear();
        self.skipped.clear();
    }

    /// `Some(found)`, or `None` once the step limit is hit
    fn solve(&mut self, budget: usize) -> Option<bool> {
        self.steps += 1;
        if self.steps > SEARCH_LIMIT {
            return None;
        }

        let free: Vec<usize> = (0..self.members.len()).filter(|i| !self.used[*i]).collect();
        let Some(&first) = free.first() else {
            return Some(true);
        };
        if budget < free.len() % 2 {
            return Some(false);
        }

        self.used[first] = true;
        for candidate in fold_order(&free) {
            if self.played.contains(self.members[first], self.members[candidate]) {
                continue;
            }
            self.used[candidate] = true;
            self.pairs.push((first, candidate));
            match self.solve(budget) {
                Some(true) => return Some(true),
                None => return None,
                Some(false) => {}
            }
            self.pairs.pop();
            self.used[candidate] = false;
        }

        if budget > 0 {
            self.skipped.push(first);
            match self.solve(budget - 1) {
                Some(true) => return Some(true),
                None => return None,
                Some(false) => {}
            }
            self.skipped.pop();
        }

        self.used[first] = false;
        Some(false)
    }
}

/// Opponents for `free[0]`, starting at the middle of the list
fn fold_order(free: &[usize]) -> Vec<usize> {
    let half = free.len() / 2;
    let mut order: Vec<usize> = free[half.max(1)..].to_vec();
    order.extend(free[1..half.max(1)].iter().rev());
    order
}

/// Pair `members` without rematches, leaving as few unpaired as possible
fn pair_group(members: &[PlayerId], played: &PlayedPairs) -> (Vec<[PlayerId; 2]>, Vec<PlayerId>) {
    let mut search = PairSearch::new(members, played);
    let mut budget = members.len() % 2;
    while budget <= members.len() {
        search.reset();
        match search.solve(budget) {
            Some(true) => {
                let pairs = search
                    .pairs
                    .iter()
                    .map(|(a, b)| [members[*a], members[*b]])
                    .collect();
                let mut skipped = search.skipped.clone();
                skipped.sort_unstable();
                return (pairs, skipped.into_iter().map(|i| members[i]).collect());
            }
            Some(false) => budget += 2,
            None => break,
        }
    }

    log::debug!("Swiss search limit reached for {} players; pairing greedily", members.len());
    let (groups, leftover) = greedy_groups(members, 2, played);
    let pairs = groups.into_iter().map(|g| [g[0], g[1]]).collect();
    (pairs, leftover)
}

impl MatchmakingStrategy for SwissStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supports_players_per_match(&self, n: usize) -> bool {
        n == 2
    }

    fn create_matches(&self, ctx: &PairingContext<'_>) -> TournamentResult<RoundProposal> {
        ensure_supported(self, ctx)?;
        if ctx.available.len() < 2 {
            return Err(ctx.insufficient(2));
        }

        let played = ctx.played_pairs();
        let groups = score_groups(ctx);
        let sitting_out = odd_one_out(ctx, &groups);

        let mut pairs: Vec<[PlayerId; 2]> = Vec::new();
        let mut floaters: Vec<PlayerId> = Vec::new();
        for group in groups.iter().rev() {
            let mut members: Vec<PlayerId> =
                group.iter().copied().filter(|p| Some(*p) != sitting_out).collect();
            members.append(&mut floaters);
            let (found, unpaired) = pair_group(&members, &played);
            pairs.extend(found);
            floaters = unpaired;
        }
        // Last in line, so it is the one left over below
        floaters.extend(sitting_out);

        let mut collapsed = false;
        if floaters.len() > 1 {
            let whole: Vec<PlayerId> = groups.concat();
            let (found, unpaired) = pair_group(&whole, &played);
            if unpaired.len() < floaters.len() {
                pairs = found.into_iter().rev().collect();
                floaters = unpaired;
                collapsed = true;
            }
        }

        let mut rematches = 0;
        if floaters.len() > 1 {
            match ctx.config.options.exhaustion {
                ExhaustionPolicy::Fail => return Err(ctx.exhausted(floaters)),
                ExhaustionPolicy::Rematch => {
                    let odd = if floaters.len() % 2 == 1 { floaters.pop() } else { None };
                    for pair in floaters.chunks(2) {
                        pairs.push([pair[0], pair[1]]);
                        rematches += 1;
                    }
                    floaters = odd.into_iter().collect();
                }
            }
        }

        // Top score group first
        pairs.reverse();
        let mut matches: Vec<_> = pairs.into_iter().map(|p| ctx.schedule(p.to_vec())).collect();

        let mut waiting = floaters;
        if ctx.config.options.award_byes {
            if let Some(player) = waiting.pop() {
                matches.push(ctx.bye(player));
            }
        }

        let mut metadata = Metadata::new();
        metadata.insert("score_groups".into(), json!(groups.len()));
        metadata.insert("collapsed".into(), json!(collapsed));
        metadata.insert("rematches".into(), json!(rematches));

        Ok(RoundProposal {
            matches,
            waiting,
            metadata,
        })
    }
}
