//! Bernoulli arrival process with uniformly distributed destinations

use rand::Rng;

use crate::packet::Packet;
use crate::voq::VoqStore;

#[derive(Debug, Clone)]
pub struct ArrivalGenerator {
    pub num_ports: usize,
    pub arrival_prob: f64,
}

impl ArrivalGenerator {
    pub fn new(num_ports: usize, arrival_prob: f64) -> Self {
        ArrivalGenerator {
            num_ports,
            arrival_prob,
        }
    }

    /// Draw this tick's arrivals at every input, in port order, and enqueue
    /// them. Returns the number of packets that arrived.
    pub fn generate<R: Rng + ?Sized>(&self, tick: u64, voqs: &mut VoqStore, rng: &mut R) -> usize {
        let mut arrivals = 0;
        for input in 0..self.num_ports {
            if rng.gen::<f64>() >= self.arrival_prob {
                continue;
            }
            let output = rng.gen_range(0..self.num_ports);
            // Both indices come from 0..num_ports
            voqs.enqueue(input, output, Packet::new(input, output, tick))
                .unwrap_or_else(|e| panic!("arrival addressed outside the switch: {}", e));
            arrivals += 1;
        }
        arrivals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_no_arrivals() {
        let gen = ArrivalGenerator::new(4, 0.0);
        let mut voqs = VoqStore::new(4);
        let mut rng = StdRng::seed_from_u64(7);
        for tick in 0..100 {
            assert_eq!(gen.generate(tick, &mut voqs, &mut rng), 0);
        }
        assert_eq!(voqs.backlog(), 0);
    }

    #[test]
    fn test_saturated_arrivals() {
        let gen = ArrivalGenerator::new(4, 1.0);
        let mut voqs = VoqStore::new(4);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(gen.generate(3, &mut voqs, &mut rng), 4);

        // Exactly one packet per input, stamped with the current tick
        for input in 0..4 {
            assert_eq!(voqs.input_backlog(input), 1);
            let head = (0..4).find_map(|o| voqs.peek_head(input, o)).unwrap();
            assert_eq!(head.input_port, input);
            assert_eq!(head.arrival_tick, 3);
        }
    }

    #[test]
    #[should_panic(expected = "arrival addressed outside the switch")]
    fn test_generator_larger_than_store_panics() {
        let gen = ArrivalGenerator::new(4, 1.0);
        let mut voqs = VoqStore::new(2);
        let mut rng = StdRng::seed_from_u64(7);
        for tick in 0..50 {
            gen.generate(tick, &mut voqs, &mut rng);
        }
    }

    #[test]
    fn test_arrival_rate() {
        let gen = ArrivalGenerator::new(8, 0.25);
        let mut voqs = VoqStore::new(8);
        let mut rng = StdRng::seed_from_u64(11);
        let total: usize = (0..2000).map(|t| gen.generate(t, &mut voqs, &mut rng)).sum();
        let rate = total as f64 / (2000.0 * 8.0);
        assert!((rate - 0.25).abs() < 0.02, "rate {}", rate);
    }
}
