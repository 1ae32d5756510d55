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

//! Mergeable distinct value estimators.
//!
//! A per-partition summary may carry a serialized sketch of the column's
//! distinct values in its `bitvectors` field. Sketches of the same family
//! with the same parameters merge, so the distinct value count of a set of
//! partitions can be estimated without rescanning any rows. Sketches are
//! opaque to the aggregation code, which only relies on the
//! [`NdvEstimator`] contract.

pub mod hll;

pub use hll::HyperLogLog;

use std::any::Any;
use std::fmt::Debug;

use partstats_common::{Result, StatsError};

/// A mergeable estimate of the number of distinct values in a column.
///
/// Merging is associative and commutative and the estimate depends only on
/// the multiset of merged inputs. An [`empty_like`](NdvEstimator::empty_like)
/// sketch is the identity for merge.
pub trait NdvEstimator: Debug + Send + Sync {
    /// Returns a reference to Any that can be used for downcasting to the
    /// concrete sketch type.
    fn as_any(&self) -> &dyn Any;

    /// True iff `other` is the same sketch family with the same parameters,
    /// so that [`merge`](NdvEstimator::merge) is well defined. Symmetric and
    /// reflexive.
    fn can_merge(&self, other: &dyn NdvEstimator) -> bool;

    /// Folds `other` into `self`. Fails if the sketches are not mergeable.
    fn merge(&mut self, other: &dyn NdvEstimator) -> Result<()>;

    /// Current distinct value estimate.
    fn estimate(&self) -> u64;

    /// A zeroed sketch of the same family with the same parameters as
    /// `self`.
    fn empty_like(&self) -> Box<dyn NdvEstimator>;

    /// Serialized form of the sketch, suitable for a summary's `bitvectors`
    /// field and for [`from_bytes`].
    fn serialize(&self) -> Vec<u8>;
}

/// Deserializes a sketch from its `bitvectors` form, dispatching on the
/// leading magic bytes.
pub fn from_bytes(bytes: &[u8]) -> Result<Box<dyn NdvEstimator>> {
    if bytes.starts_with(hll::MAGIC) {
        return Ok(Box::new(HyperLogLog::from_bytes(bytes)?));
    }
    Err(StatsError::MalformedInput(format!(
        "unrecognized distinct value sketch ({} bytes)",
        bytes.len()
    )))
}
