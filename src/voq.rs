//! Virtual Output Queues
//!
//! One FIFO per (input, output) pair, stored row-major so that
//! `queues[input * N + output]` is the VOQ at `input` holding traffic for
//! `output`. Packets enter at the tail on arrival and leave from the head on a
//! confirmed match; nothing else ever touches the order.

use std::collections::VecDeque;

use crate::error::VoqError;
use crate::packet::Packet;

#[derive(Debug, Clone)]
pub struct VoqStore {
    num_ports: usize,
    queues: Vec<VecDeque<Packet>>,

    /// Lifetime counters per queue, same layout as `queues`
    enqueued: Vec<u64>,
    dequeued: Vec<u64>,
}

impl VoqStore {
    pub fn new(num_ports: usize) -> Self {
        let cells = num_ports * num_ports;
        VoqStore {
            num_ports,
            queues: vec![VecDeque::new(); cells],
            enqueued: vec![0; cells],
            dequeued: vec![0; cells],
        }
    }

    pub fn num_ports(&self) -> usize {
        self.num_ports
    }

    fn index(&self, input: usize, output: usize) -> Result<usize, VoqError> {
        if input >= self.num_ports || output >= self.num_ports {
            return Err(VoqError::PortOutOfRange {
                input,
                output,
                num_ports: self.num_ports,
            });
        }
        Ok(input * self.num_ports + output)
    }

    /// Append `packet` to the tail of VOQ[input][output].
    ///
    /// The packet must be addressed to exactly this queue.
    pub fn enqueue(&mut self, input: usize, output: usize, packet: Packet) -> Result<(), VoqError> {
        let idx = self.index(input, output)?;
        debug_assert_eq!((packet.input_port, packet.output_port), (input, output));
        self.queues[idx].push_back(packet);
        self.enqueued[idx] += 1;
        Ok(())
    }

    /// Head-of-line packet, if any, without removing it
    pub fn peek_head(&self, input: usize, output: usize) -> Option<&Packet> {
        let idx = self.index(input, output).ok()?;
        self.queues[idx].front()
    }

    /// Remove and return the head-of-line packet
    pub fn dequeue_head(&mut self, input: usize, output: usize) -> Result<Packet, VoqError> {
        let idx = self.index(input, output)?;
        let packet = self.queues[idx]
            .pop_front()
            .ok_or(VoqError::Empty { input, output })?;
        self.dequeued[idx] += 1;
        Ok(packet)
    }

    pub fn is_empty(&self, input: usize, output: usize) -> bool {
        self.peek_head(input, output).is_none()
    }

    pub fn len(&self, input: usize, output: usize) -> usize {
        self.index(input, output)
            .map(|idx| self.queues[idx].len())
            .unwrap_or(0)
    }

    /// Packets currently queued across the whole switch
    pub fn backlog(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Packets queued at one input across all of its VOQs
    pub fn input_backlog(&self, input: usize) -> usize {
        (0..self.num_ports).map(|output| self.len(input, output)).sum()
    }

    pub fn enqueued(&self, input: usize, output: usize) -> u64 {
        self.index(input, output).map(|idx| self.enqueued[idx]).unwrap_or(0)
    }

    pub fn dequeued(&self, input: usize, output: usize) -> u64 {
        self.index(input, output).map(|idx| self.dequeued[idx]).unwrap_or(0)
    }

    /// Queue lengths as an N×N matrix indexed `[input][output]`
    pub fn occupancy(&self) -> Vec<Vec<usize>> {
        self.queues
            .chunks(self.num_ports.max(1))
            .map(|row| row.iter().map(VecDeque::len).collect())
            .collect()
    }
}
