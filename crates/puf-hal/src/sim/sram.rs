// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Statistical SRAM cell model
//!
//! Every bit gets a fixed probability of powering up as 1. Most cells are
//! strongly skewed to one value; a configurable share is metastable. The
//! model is deterministic for a given seed.

use std::vec::Vec;

/// Probability scale: a cell with bias `BIAS_ONE` always powers up as 1
pub const BIAS_ONE: u16 = u16::MAX;

/// Xorshift64 generator
#[derive(Debug, Clone)]
pub struct XorShift64(u64);

impl XorShift64 {
    /// Create a generator; a zero seed is replaced by a fixed constant
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    /// Next 64-bit value
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform value in `0..bound`
    pub fn below(&mut self, bound: u32) -> u32 {
        ((self.next_u64() >> 32) * u64::from(bound) >> 32) as u32
    }
}

/// Parameters of a simulated SRAM array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellProfile {
    /// Share of metastable cells, in per mille
    pub unstable_per_mille: u32,
    /// Share of skewed cells that prefer 1, in per mille
    pub ones_per_mille: u32,
    /// Flip probability of a skewed cell on each power-up, in ppm
    pub noise_ppm: u32,
}

impl CellProfile {
    /// A healthy array: 5 % metastable cells, balanced polarity, no noise on
    /// skewed cells
    pub const HEALTHY: Self = Self {
        unstable_per_mille: 50,
        ones_per_mille: 500,
        noise_ppm: 0,
    };

    /// Same array with its skewed cells mostly powering up as 0
    #[must_use]
    pub const fn degraded(mut self) -> Self {
        self.ones_per_mille = 300;
        self
    }

    /// Same array with noisy skewed cells
    #[must_use]
    pub const fn noisy(mut self, noise_ppm: u32) -> Self {
        self.noise_ppm = noise_ppm;
        self
    }
}

impl Default for CellProfile {
    fn default() -> Self {
        Self::HEALTHY
    }
}

/// Simulated SRAM array
#[derive(Debug, Clone)]
pub struct SramModel {
    bias: Vec<u16>,
    noise_ppm: u32,
    rng: XorShift64,
}

impl SramModel {
    /// Build an array of `size` bytes from `seed`
    #[must_use]
    pub fn new(seed: u64, size: usize, profile: CellProfile) -> Self {
        let mut rng = XorShift64::new(seed);
        let bias = (0..size * 8)
            .map(|_| {
                if rng.below(1000) < profile.unstable_per_mille {
                    // Metastable: 20 % to 80 % chance of a 1
                    (13_107 + rng.below(39_321)) as u16
                } else if rng.below(1000) < profile.ones_per_mille {
                    BIAS_ONE
                } else {
                    0
                }
            })
            .collect();
        Self {
            bias,
            noise_ppm: profile.noise_ppm,
            rng,
        }
    }

    /// Number of bytes in the array
    #[must_use]
    pub fn size(&self) -> usize {
        self.bias.len() / 8
    }

    /// Change the noise level of skewed cells
    pub fn set_noise_ppm(&mut self, noise_ppm: u32) {
        self.noise_ppm = noise_ppm;
    }

    /// Value a skewed cell settles to, or `None` for a metastable cell
    #[must_use]
    pub fn preferred(&self, bit: usize) -> Option<bool> {
        match self.bias.get(bit).copied() {
            Some(0) => Some(false),
            Some(BIAS_ONE) => Some(true),
            _ => None,
        }
    }

    /// Sample one power-up pattern into `out` (LSB-first bit order)
    pub fn power_up(&mut self, out: &mut [u8]) {
        for (byte_idx, byte) in out.iter_mut().enumerate() {
            let mut value = 0u8;
            for bit in 0..8 {
                let Some(&bias) = self.bias.get(byte_idx * 8 + bit) else {
                    break;
                };
                let one = match bias {
                    0 | BIAS_ONE => {
                        let flip = self.noise_ppm > 0 && self.rng.below(1_000_000) < self.noise_ppm;
                        (bias == BIAS_ONE) != flip
                    }
                    _ => self.rng.below(u32::from(BIAS_ONE)) < u32::from(bias),
                };
                if one {
                    value |= 1 << bit;
                }
            }
            *byte = value;
        }
    }
}
