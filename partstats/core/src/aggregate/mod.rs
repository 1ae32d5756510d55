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

//! Aggregation of per-partition column statistics.
//!
//! An aggregation call names one column, an ordered list of requested
//! partitions and the per-partition statistics that exist for them. The
//! position of a partition in the requested list is its canonical index;
//! inputs may cover only a subset of the requested partitions, but every
//! input must name a requested partition.

mod extrapolate;
mod string;

pub use string::StringColumnStatsAggregator;

use std::collections::HashMap;

use partstats_common::{ColumnStatistics, PartitionStatistics, Result, StatsError};

/// Merges the per-partition statistics of one column into a single summary
/// covering the requested partitions.
///
/// One implementation exists per column type; they all share this entry
/// point.
pub trait ColumnStatsAggregator {
    /// Aggregates `inputs` into one summary for `column_name` over
    /// `requested_partitions`.
    fn aggregate(
        &self,
        column_name: &str,
        requested_partitions: &[String],
        inputs: &[PartitionStatistics],
    ) -> Result<ColumnStatistics>;
}

/// One validated input: the partition's single column statistics entry
/// paired with the partition's canonical index.
pub(crate) struct CheckedInput<'a> {
    pub partition_name: &'a str,
    pub index: usize,
    pub column: &'a ColumnStatistics,
}

/// Validates the aggregation inputs and resolves each partition to its
/// canonical index.
pub(crate) fn check_inputs<'a>(
    requested_partitions: &[String],
    inputs: &'a [PartitionStatistics],
) -> Result<Vec<CheckedInput<'a>>> {
    if inputs.is_empty() {
        return Err(StatsError::MalformedInput(
            "no partition statistics to aggregate".to_string(),
        ));
    }
    let index_map: HashMap<&str, usize> = requested_partitions
        .iter()
        .enumerate()
        .map(|(index, name)| (name.as_str(), index))
        .collect();
    let mut checked = Vec::with_capacity(inputs.len());
    for input in inputs {
        let column = match input.columns.as_slice() {
            [column] => column,
            columns => {
                return Err(StatsError::MalformedInput(format!(
                    "partition {} carries {} column statistics entries, expected exactly one",
                    input.partition_name,
                    columns.len()
                )))
            }
        };
        let index = *index_map
            .get(input.partition_name.as_str())
            .ok_or_else(|| {
                StatsError::MalformedInput(format!(
                    "partition {} is not in the requested partition list",
                    input.partition_name
                ))
            })?;
        checked.push(CheckedInput {
            partition_name: &input.partition_name,
            index,
            column,
        });
    }
    Ok(checked)
}
