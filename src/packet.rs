//! Packet records

use serde::{Deserialize, Serialize};

/// A fixed-size cell waiting to cross the fabric.
///
/// Immutable once created: the only thing the switch ever does with a packet
/// is move it from the tail of its VOQ to the head and then out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub input_port: usize,
    pub output_port: usize,
    pub arrival_tick: u64,
}

impl Packet {
    pub fn new(input_port: usize, output_port: usize, arrival_tick: u64) -> Self {
        Packet {
            input_port,
            output_port,
            arrival_tick,
        }
    }

    /// Ticks spent queued if the packet departs at `tick`
    pub fn delay_at(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.arrival_tick)
    }
}
