//! Chaos links
//!
//! The peer channel promises nothing beyond eventual, at-least-once
//! delivery while a peer stays connected. A chaos link exercises exactly
//! that: it drops, duplicates and reorders, with a seeded RNG so failures
//! reproduce.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Link misbehaviour
#[derive(Clone, Debug)]
pub struct ChaosConfig {
    /// Payload loss rate (0.0 - 1.0)
    pub loss_rate: f64,
    /// Duplicate probability
    pub duplicate_prob: f64,
    /// Reorder probability
    pub reorder_prob: f64,
    /// Reorder depth (max payloads jumped)
    pub reorder_depth: usize,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self::perfect()
    }
}

impl ChaosConfig {
    /// Every payload delivered once, in order
    pub fn perfect() -> Self {
        ChaosConfig {
            loss_rate: 0.0,
            duplicate_prob: 0.0,
            reorder_prob: 0.0,
            reorder_depth: 0,
        }
    }

    /// Reorders and duplicates, never loses
    pub fn unordered() -> Self {
        ChaosConfig {
            loss_rate: 0.0,
            duplicate_prob: 0.2,
            reorder_prob: 0.3,
            reorder_depth: 4,
        }
    }

    /// Crowded radio
    pub fn hostile() -> Self {
        ChaosConfig {
            loss_rate: 0.15,
            duplicate_prob: 0.1,
            reorder_prob: 0.3,
            reorder_depth: 6,
        }
    }
}

/// Chaos link statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChaosStats {
    pub sent: u64,
    pub delivered: u64,
    pub lost: u64,
    pub reordered: u64,
    pub duplicated: u64,
}

/// One direction of a peer-to-peer channel
#[derive(Debug)]
pub struct ChaosLink {
    config: ChaosConfig,
    rng: StdRng,
    in_flight: VecDeque<Vec<u8>>,
    stats: ChaosStats,
}

impl ChaosLink {
    pub fn new(config: ChaosConfig, seed: u64) -> Self {
        ChaosLink {
            config,
            rng: StdRng::seed_from_u64(seed),
            in_flight: VecDeque::new(),
            stats: ChaosStats::default(),
        }
    }

    pub fn send(&mut self, data: Vec<u8>) {
        self.stats.sent += 1;

        if self.rng.gen::<f64>() < self.config.loss_rate {
            self.stats.lost += 1;
            return;
        }

        if self.rng.gen::<f64>() < self.config.duplicate_prob {
            self.in_flight.push_back(data.clone());
            self.stats.duplicated += 1;
        }

        if self.config.reorder_depth > 0
            && !self.in_flight.is_empty()
            && self.rng.gen::<f64>() < self.config.reorder_prob
        {
            let depth = self.config.reorder_depth.min(self.in_flight.len());
            let jump = self.rng.gen_range(1..=depth);
            let pos = self.in_flight.len() - jump;
            self.in_flight.insert(pos, data);
            self.stats.reordered += 1;
        } else {
            self.in_flight.push_back(data);
        }
    }

    /// Everything currently in flight, in delivery order
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        self.stats.delivered += self.in_flight.len() as u64;
        self.in_flight.drain(..).collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> &ChaosStats {
        &self.stats
    }
}
