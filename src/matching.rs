//! Parallel Iterative Matching
//!
//! Each tick the matcher runs up to `pim_iters` request/grant/accept rounds.
//! A round only sees ports that no earlier round of the same tick has matched:
//!
//! 1. Request: every unmatched output `o` collects the unmatched inputs whose
//!    VOQ for `o` is non-empty.
//! 2. Grant: every output with at least one request picks one requester
//!    uniformly at random.
//! 3. Accept: every input holding at least one grant picks one of them
//!    uniformly at random. The pair is confirmed, both ports leave the pool,
//!    and the head-of-line packet of that VOQ departs.
//!
//! Rounds stop early once no unmatched output has a pending request.
//! Granted-but-declined ports stay unmatched and may request again next round.
//!
//! Random draws happen in a fixed order (grants by ascending output, then
//! accepts by ascending input) so a seed fully determines the outcome.

use log::trace;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::stats::DelayAccumulator;
use crate::voq::VoqStore;

/// A confirmed (input, output) pair and the packet delay it produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub input: usize,
    pub output: usize,
    pub delay: u64,
}

/// What happened in one round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Request edges (input, output) seen this round
    pub requests: usize,
    /// Outputs that issued a grant
    pub grants: usize,
    pub matches: Vec<MatchedPair>,
}

/// Matching decisions of a whole tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickMatching {
    pub tick: u64,
    pub rounds: Vec<RoundOutcome>,
}

impl TickMatching {
    pub fn pairs(&self) -> impl Iterator<Item = &MatchedPair> {
        self.rounds.iter().flat_map(|r| r.matches.iter())
    }

    /// Number of packets that crossed the fabric this tick
    pub fn len(&self) -> usize {
        self.rounds.iter().map(|r| r.matches.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if no input and no output appears in more than one pair
    pub fn is_valid(&self, num_ports: usize) -> bool {
        let mut inputs = vec![false; num_ports];
        let mut outputs = vec![false; num_ports];
        for pair in self.pairs() {
            if pair.input >= num_ports || pair.output >= num_ports {
                return false;
            }
            if inputs[pair.input] || outputs[pair.output] {
                return false;
            }
            inputs[pair.input] = true;
            outputs[pair.output] = true;
        }
        true
    }
}

/// The PIM arbiter for an N×N crossbar
#[derive(Debug, Clone)]
pub struct PimMatcher {
    num_ports: usize,
    pim_iters: usize,

    // Per-tick matching state
    matched_inputs: Vec<bool>,
    matched_outputs: Vec<bool>,

    // Per-round scratch, indexed by port number
    requests: Vec<Vec<usize>>, // output -> requesting inputs
    grants: Vec<Vec<usize>>,   // input -> granting outputs
}

impl PimMatcher {
    pub fn new(num_ports: usize, pim_iters: usize) -> Self {
        PimMatcher {
            num_ports,
            pim_iters,
            matched_inputs: vec![false; num_ports],
            matched_outputs: vec![false; num_ports],
            requests: vec![Vec::with_capacity(num_ports); num_ports],
            grants: vec![Vec::with_capacity(num_ports); num_ports],
        }
    }

    pub fn pim_iters(&self) -> usize {
        self.pim_iters
    }

    /// Compute this tick's matching, dequeue every matched head-of-line
    /// packet and record its delay.
    pub fn run_tick<R: Rng + ?Sized>(
        &mut self,
        tick: u64,
        voqs: &mut VoqStore,
        delays: &mut DelayAccumulator,
        rng: &mut R,
    ) -> TickMatching {
        self.matched_inputs.fill(false);
        self.matched_outputs.fill(false);

        let mut result = TickMatching {
            tick,
            rounds: Vec::new(),
        };

        for round in 0..self.pim_iters {
            let requests = self.request_phase(voqs);
            if requests == 0 {
                trace!("tick {} round {}: no pending requests", tick, round);
                break;
            }
            let grants = self.grant_phase(rng);
            let accepted = self.accept_phase(rng);

            let mut matches = Vec::with_capacity(accepted.len());
            for (input, output) in accepted {
                matches.push(self.commit(tick, input, output, voqs, delays));
            }
            trace!(
                "tick {} round {}: {} requests, {} grants, matched {:?}",
                tick,
                round,
                requests,
                grants,
                matches.iter().map(|m| (m.input, m.output)).collect::<Vec<_>>()
            );

            result.rounds.push(RoundOutcome {
                requests,
                grants,
                matches,
            });
        }

        result
    }

    /// Fill `requests[o]` for every unmatched output. Returns the number of
    /// request edges.
    fn request_phase(&mut self, voqs: &VoqStore) -> usize {
        let mut edges = 0;
        for output in 0..self.num_ports {
            let requesters = &mut self.requests[output];
            requesters.clear();
            if self.matched_outputs[output] {
                continue;
            }
            for input in 0..self.num_ports {
                if !self.matched_inputs[input] && !voqs.is_empty(input, output) {
                    requesters.push(input);
                }
            }
            edges += requesters.len();
        }
        edges
    }

    /// Each requested output grants one requester. Returns the number of grants.
    fn grant_phase<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        for granted in self.grants.iter_mut() {
            granted.clear();
        }

        let mut issued = 0;
        for output in 0..self.num_ports {
            let requesters = &self.requests[output];
            if requesters.is_empty() {
                continue;
            }
            let input = requesters[rng.gen_range(0..requesters.len())];
            self.grants[input].push(output);
            issued += 1;
        }
        issued
    }

    /// Each input holding grants accepts one, in ascending input order
    fn accept_phase<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<(usize, usize)> {
        let mut accepted = Vec::new();
        for input in 0..self.num_ports {
            let offers = &self.grants[input];
            if offers.is_empty() {
                continue;
            }
            let output = offers[rng.gen_range(0..offers.len())];
            accepted.push((input, output));
        }
        accepted
    }

    fn commit(
        &mut self,
        tick: u64,
        input: usize,
        output: usize,
        voqs: &mut VoqStore,
        delays: &mut DelayAccumulator,
    ) -> MatchedPair {
        debug_assert!(!self.matched_inputs[input] && !self.matched_outputs[output]);
        self.matched_inputs[input] = true;
        self.matched_outputs[output] = true;

        // The request phase only admitted non-empty queues
        let packet = voqs
            .dequeue_head(input, output)
            .unwrap_or_else(|e| panic!("PIM matched an empty queue: {}", e));
        let delay = packet.delay_at(tick);
        delays.record(delay as f64);

        MatchedPair {
            input,
            output,
            delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fill(voqs: &mut VoqStore, input: usize, output: usize, tick: u64) {
        voqs.enqueue(input, output, Packet::new(input, output, tick)).unwrap();
    }

    #[test]
    fn test_empty_switch_is_noop() {
        let mut matcher = PimMatcher::new(4, 3);
        let mut voqs = VoqStore::new(4);
        let mut delays = DelayAccumulator::new();
        let mut rng = StdRng::seed_from_u64(1);

        let result = matcher.run_tick(0, &mut voqs, &mut delays, &mut rng);
        assert!(result.rounds.is_empty());
        assert!(result.is_empty());
        assert_eq!(delays.sample_count(), 0);
    }

    #[test]
    fn test_single_packet_always_matches() {
        let mut matcher = PimMatcher::new(4, 1);
        let mut voqs = VoqStore::new(4);
        let mut delays = DelayAccumulator::new();
        let mut rng = StdRng::seed_from_u64(2);
        fill(&mut voqs, 2, 1, 5);

        let result = matcher.run_tick(9, &mut voqs, &mut delays, &mut rng);
        assert_eq!(
            result.pairs().copied().collect::<Vec<_>>(),
            vec![MatchedPair { input: 2, output: 1, delay: 4 }]
        );
        assert_eq!(delays.average(), Ok(4.0));
        assert_eq!(voqs.backlog(), 0);
    }

    #[test]
    fn test_output_contention_one_winner() {
        // Every input wants output 0; only one can win per tick
        let mut matcher = PimMatcher::new(4, 4);
        let mut voqs = VoqStore::new(4);
        let mut delays = DelayAccumulator::new();
        let mut rng = StdRng::seed_from_u64(3);
        for input in 0..4 {
            fill(&mut voqs, input, 0, 0);
        }

        let result = matcher.run_tick(0, &mut voqs, &mut delays, &mut rng);
        assert_eq!(result.len(), 1);
        assert_eq!(voqs.backlog(), 3);
        // Round 2 finds output 0 matched and nothing else requested
        assert_eq!(result.rounds.len(), 1);
    }

    #[test]
    fn test_full_load_permutation_matches_fully() {
        // Disjoint demand: input i only wants output i
        let mut matcher = PimMatcher::new(5, 1);
        let mut voqs = VoqStore::new(5);
        let mut delays = DelayAccumulator::new();
        let mut rng = StdRng::seed_from_u64(4);
        for port in 0..5 {
            fill(&mut voqs, port, port, 0);
        }

        let result = matcher.run_tick(0, &mut voqs, &mut delays, &mut rng);
        assert_eq!(result.len(), 5);
        assert!(result.is_valid(5));
    }

    #[test]
    fn test_later_rounds_fill_leftovers() {
        // All-to-all demand: enough rounds always reach a perfect matching
        let n = 6;
        let mut matcher = PimMatcher::new(n, n);
        let mut delays = DelayAccumulator::new();
        let mut rng = StdRng::seed_from_u64(5);

        for tick in 0..50 {
            let mut voqs = VoqStore::new(n);
            for input in 0..n {
                for output in 0..n {
                    fill(&mut voqs, input, output, tick);
                }
            }
            let result = matcher.run_tick(tick, &mut voqs, &mut delays, &mut rng);
            assert!(result.is_valid(n));
            assert_eq!(result.len(), n, "tick {}", tick);
            assert!(result.rounds.len() <= n);
        }
    }

    #[test]
    fn test_rounds_bounded_by_iters() {
        let n = 8;
        let mut matcher = PimMatcher::new(n, 2);
        let mut delays = DelayAccumulator::new();
        let mut rng = StdRng::seed_from_u64(6);
        let mut voqs = VoqStore::new(n);
        for input in 0..n {
            for output in 0..n {
                fill(&mut voqs, input, output, 0);
            }
        }

        for tick in 0..20 {
            let result = matcher.run_tick(tick, &mut voqs, &mut delays, &mut rng);
            assert!(result.rounds.len() <= 2);
            assert!(result.is_valid(n));
            for round in &result.rounds {
                assert!(!round.matches.is_empty());
                assert!(round.matches.len() <= round.grants);
            }
        }
    }

    #[test]
    fn test_dequeues_head_of_line() {
        let mut matcher = PimMatcher::new(1, 1);
        let mut voqs = VoqStore::new(1);
        let mut delays = DelayAccumulator::new();
        let mut rng = StdRng::seed_from_u64(7);
        fill(&mut voqs, 0, 0, 1);
        fill(&mut voqs, 0, 0, 2);

        matcher.run_tick(4, &mut voqs, &mut delays, &mut rng);
        assert_eq!(delays.average(), Ok(3.0));
        assert_eq!(voqs.peek_head(0, 0).map(|p| p.arrival_tick), Some(2));
    }

    #[test]
    fn test_invalid_matching_detected() {
        let bad = TickMatching {
            tick: 0,
            rounds: vec![
                RoundOutcome {
                    requests: 1,
                    grants: 1,
                    matches: vec![MatchedPair { input: 0, output: 1, delay: 0 }],
                },
                RoundOutcome {
                    requests: 1,
                    grants: 1,
                    matches: vec![MatchedPair { input: 1, output: 1, delay: 0 }],
                },
            ],
        };
        assert!(!bad.is_valid(2));
    }
}
