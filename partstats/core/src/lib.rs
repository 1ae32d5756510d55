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

//! Partition-level column statistics aggregation.
//!
//! Statistics are collected independently on each partition of a table and
//! stored as [`PartitionStatistics`] records. When a table-level summary is
//! needed for a set of partitions, a [`aggregate::ColumnStatsAggregator`]
//! folds the per-partition records into a single [`ColumnStatistics`]:
//! directly when every requested partition carries statistics, or by linear
//! extrapolation from the observed partitions when some are missing.
//! Distinct value counts ride on mergeable sketches (see [`ndv`]) whenever
//! every input carries a compatible one.

pub mod aggregate;
pub mod ndv;

pub use partstats_common::{
    ColumnStatistics, ColumnSummary, ColumnType, PartitionStatistics, Result, StatsError,
    StringColumnSummary,
};
