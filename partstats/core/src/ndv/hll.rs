// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Dense HyperLogLog sketch of a column's distinct values.
//!
//! Values are hashed to 64 bits; the low `p` bits pick one of `2^p`
//! registers and each register keeps the longest run of leading zeros seen
//! in the remaining bits. Two sketches merge by taking the register-wise
//! maximum, which makes the estimate of a merged sketch identical to the
//! estimate of a sketch built from the union of the inputs.

use std::any::Any;
use std::hash::{BuildHasher, Hash, Hasher};

use ahash::RandomState;

use partstats_common::{Result, StatsError};

use super::NdvEstimator;

/// Leading bytes of a serialized sketch.
pub(super) const MAGIC: &[u8] = b"HLL";

/// One byte per register.
const DENSE_ENCODING: u8 = 1;

/// Smallest supported precision (16 registers).
pub const MIN_PRECISION: u8 = 4;
/// Largest supported precision (65536 registers).
pub const MAX_PRECISION: u8 = 16;
/// Default precision; 2^14 registers keep the relative error under one
/// percent.
pub const DEFAULT_PRECISION: u8 = 14;

// Fixed hash keys: sketches built in different processes must place equal
// values into equal registers.
const HASH_KEYS: (u64, u64, u64, u64) = (
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);

/// Dense HyperLogLog distinct value sketch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperLogLog {
    precision: u8,
    registers: Vec<u8>,
}

impl HyperLogLog {
    /// Creates an empty sketch with `2^precision` registers.
    pub fn try_new(precision: u8) -> Result<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(StatsError::MalformedInput(format!(
                "sketch precision must be between {} and {}, got {}",
                MIN_PRECISION, MAX_PRECISION, precision
            )));
        }
        Ok(Self {
            precision,
            registers: vec![0; 1 << precision],
        })
    }

    /// Records one value in the sketch.
    pub fn add<T: Hash + ?Sized>(&mut self, value: &T) {
        let hash = hash_value(value);
        let index = (hash & ((1 << self.precision) - 1)) as usize;
        let rest = hash >> self.precision;
        let rho = if rest == 0 {
            64 - self.precision + 1
        } else {
            (rest << self.precision).leading_zeros() as u8 + 1
        };
        if rho > self.registers[index] {
            self.registers[index] = rho;
        }
    }

    /// Restores a sketch from its serialized form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = MAGIC.len() + 2;
        if bytes.len() < header || &bytes[..MAGIC.len()] != MAGIC {
            return Err(StatsError::MalformedInput(format!(
                "not a distinct value sketch ({} bytes)",
                bytes.len()
            )));
        }
        let encoding = bytes[MAGIC.len()];
        if encoding != DENSE_ENCODING {
            return Err(StatsError::MalformedInput(format!(
                "unsupported sketch encoding {}",
                encoding
            )));
        }
        let precision = bytes[MAGIC.len() + 1];
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(StatsError::MalformedInput(format!(
                "sketch precision must be between {} and {}, got {}",
                MIN_PRECISION, MAX_PRECISION, precision
            )));
        }
        let registers = &bytes[header..];
        if registers.len() != 1 << precision {
            return Err(StatsError::MalformedInput(format!(
                "sketch of precision {} must carry {} registers, got {}",
                precision,
                1usize << precision,
                registers.len()
            )));
        }
        let max_rho = 64 - precision + 1;
        if registers.iter().any(|&r| r > max_rho) {
            return Err(StatsError::MalformedInput(format!(
                "sketch register exceeds the maximum rank {} for precision {}",
                max_rho, precision
            )));
        }
        Ok(Self {
            precision,
            registers: registers.to_vec(),
        })
    }

    /// Precision parameter of this sketch.
    pub fn precision(&self) -> u8 {
        self.precision
    }
}

impl Default for HyperLogLog {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            registers: vec![0; 1 << DEFAULT_PRECISION],
        }
    }
}

impl NdvEstimator for HyperLogLog {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn can_merge(&self, other: &dyn NdvEstimator) -> bool {
        match other.as_any().downcast_ref::<HyperLogLog>() {
            Some(other) => self.precision == other.precision,
            None => false,
        }
    }

    fn merge(&mut self, other: &dyn NdvEstimator) -> Result<()> {
        let other = other
            .as_any()
            .downcast_ref::<HyperLogLog>()
            .filter(|other| self.precision == other.precision)
            .ok_or_else(|| {
                StatsError::Internal(
                    "merging incompatible distinct value sketches".to_string(),
                )
            })?;
        for (register, &incoming) in self.registers.iter_mut().zip(&other.registers) {
            if incoming > *register {
                *register = incoming;
            }
        }
        Ok(())
    }

    fn estimate(&self) -> u64 {
        let m = self.registers.len() as f64;
        let mut sum = 0.0;
        let mut zero_registers = 0u64;
        for &register in &self.registers {
            sum += 1.0 / (1u64 << register) as f64;
            if register == 0 {
                zero_registers += 1;
            }
        }
        let alpha = match self.registers.len() {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / m),
        };
        let mut estimate = alpha * m * m / sum;
        // Small range correction: linear counting is more accurate while
        // empty registers remain.
        if estimate <= 2.5 * m && zero_registers > 0 {
            estimate = m * (m / zero_registers as f64).ln();
        }
        estimate as u64
    }

    fn empty_like(&self) -> Box<dyn NdvEstimator> {
        Box::new(Self {
            precision: self.precision,
            registers: vec![0; self.registers.len()],
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(MAGIC.len() + 2 + self.registers.len());
        bytes.extend_from_slice(MAGIC);
        bytes.push(DENSE_ENCODING);
        bytes.push(self.precision);
        bytes.extend_from_slice(&self.registers);
        bytes
    }
}

fn hash_value<T: Hash + ?Sized>(value: &T) -> u64 {
    let (k0, k1, k2, k3) = HASH_KEYS;
    let mut hasher = RandomState::with_seeds(k0, k1, k2, k3).build_hasher();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn sketch_of(values: impl IntoIterator<Item = String>) -> HyperLogLog {
        let mut sketch = HyperLogLog::default();
        for value in values {
            sketch.add(&value);
        }
        sketch
    }

    #[test]
    fn repeated_values_count_once() {
        let mut sketch = HyperLogLog::default();
        for _ in 0..1000 {
            sketch.add(&"only");
        }
        assert_eq!(1, sketch.estimate());
    }

    #[test]
    fn small_cardinalities_are_near_exact() {
        let sketch = sketch_of((0..100).map(|i| format!("value-{}", i)));
        let estimate = sketch.estimate();
        assert!(
            (97..=103).contains(&estimate),
            "estimate {} too far from 100",
            estimate
        );
    }

    #[test]
    fn accuracy_stays_within_a_few_percent() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut sketch = HyperLogLog::default();
        let mut exact = HashSet::new();
        for _ in 0..10_000 {
            let value: u64 = rng.gen();
            sketch.add(&value);
            exact.insert(value);
        }
        let estimate = sketch.estimate() as f64;
        let error = (estimate - exact.len() as f64).abs() / exact.len() as f64;
        assert!(error < 0.04, "relative error {} too large", error);
    }

    #[test]
    fn merge_equals_union() -> Result<()> {
        let mut left = sketch_of((0..500).map(|i| format!("v{}", i)));
        let right = sketch_of((250..750).map(|i| format!("v{}", i)));
        let union = sketch_of((0..750).map(|i| format!("v{}", i)));
        left.merge(&right)?;
        assert_eq!(union.estimate(), left.estimate());
        Ok(())
    }

    #[test]
    fn empty_sketch_is_merge_identity() -> Result<()> {
        let mut sketch = sketch_of((0..50).map(|i| format!("v{}", i)));
        let before = sketch.clone();
        let empty = sketch.empty_like();
        sketch.merge(empty.as_ref())?;
        assert_eq!(before, sketch);
        Ok(())
    }

    #[test]
    fn serialization_round_trips() -> Result<()> {
        let sketch = sketch_of((0..300).map(|i| format!("v{}", i)));
        let restored = HyperLogLog::from_bytes(&sketch.serialize())?;
        assert_eq!(sketch, restored);
        Ok(())
    }

    #[test]
    fn can_merge_requires_equal_precision() -> Result<()> {
        let small = HyperLogLog::try_new(10)?;
        let large = HyperLogLog::try_new(12)?;
        assert!(small.can_merge(&small));
        assert!(!small.can_merge(&large));
        assert!(!large.can_merge(&small));
        Ok(())
    }

    #[test]
    fn merge_rejects_incompatible_sketches() -> Result<()> {
        let mut small = HyperLogLog::try_new(10)?;
        let large = HyperLogLog::try_new(12)?;
        assert!(small.merge(&large).is_err());
        Ok(())
    }

    #[test]
    fn from_bytes_rejects_malformed_blobs() {
        // Truncated header.
        assert!(HyperLogLog::from_bytes(b"HL").is_err());
        // Unknown encoding.
        assert!(HyperLogLog::from_bytes(b"HLL\x02\x0a").is_err());
        // Precision out of range.
        assert!(HyperLogLog::from_bytes(b"HLL\x01\x03").is_err());
        // Register payload does not match the precision.
        let mut bytes = HyperLogLog::default().serialize();
        bytes.pop();
        assert!(HyperLogLog::from_bytes(&bytes).is_err());
        // Register rank out of range for the precision.
        let mut bytes = HyperLogLog::default().serialize();
        let last = bytes.len() - 1;
        bytes[last] = 64;
        assert!(HyperLogLog::from_bytes(&bytes).is_err());
    }
}
