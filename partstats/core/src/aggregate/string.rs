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

//! String column statistics aggregation.

use std::collections::HashMap;

use log::{debug, trace};

use partstats_common::{
    ColumnStatistics, ColumnSummary, PartitionStatistics, Result, StatsError, StringColumnSummary,
};

use crate::aggregate::extrapolate::extrapolate_string;
use crate::aggregate::{check_inputs, CheckedInput, ColumnStatsAggregator};
use crate::ndv::{self, NdvEstimator};

/// Aggregates string column statistics over a requested set of partitions.
///
/// When every requested partition has statistics, or when only a single
/// input exists, the summaries are merged directly. Otherwise the observed
/// partitions become samples on the canonical partition axis and the
/// summary for the full set is imputed by linear extrapolation. If every
/// input carries a compatible distinct value sketch, contiguous runs of
/// observed partitions are first collapsed into pseudo partitions whose
/// merged sketch yields the run's distinct value count.
#[derive(Debug, Default)]
pub struct StringColumnStatsAggregator;

impl StringColumnStatsAggregator {
    pub fn new() -> Self {
        Self
    }
}

impl ColumnStatsAggregator for StringColumnStatsAggregator {
    fn aggregate(
        &self,
        column_name: &str,
        requested_partitions: &[String],
        inputs: &[PartitionStatistics],
    ) -> Result<ColumnStatistics> {
        let inputs = check_inputs(requested_partitions, inputs)?;

        // The output record carries the column type declared by the first
        // input.
        let mut output = ColumnStatistics::empty(column_name, inputs[0].column.column_type)?;

        let accumulator = sketch_accumulator(&inputs)?;
        let all_present = requested_partitions.len() == inputs.len();
        debug!(
            "aggregating string column {}: {} of {} partitions with statistics, sketch mode {}",
            column_name,
            inputs.len(),
            requested_partitions.len(),
            if accumulator.is_some() { "on" } else { "off" }
        );

        let data = if all_present || inputs.len() < 2 {
            merge_all(&inputs, accumulator)?
        } else {
            group_and_extrapolate(requested_partitions.len(), &inputs, accumulator)?
        };
        output.data = ColumnSummary::String(data);
        Ok(output)
    }
}

fn string_summary<'a>(input: &CheckedInput<'a>) -> &'a StringColumnSummary {
    let ColumnSummary::String(summary) = &input.column.data;
    summary
}

/// Scans the inputs for distinct value sketches. Returns an empty
/// accumulator with the common sketch parameters if every input carries one
/// and they all merge, and `None` otherwise. An undecodable sketch fails
/// the scan.
fn sketch_accumulator(inputs: &[CheckedInput<'_>]) -> Result<Option<Box<dyn NdvEstimator>>> {
    let mut template: Option<Box<dyn NdvEstimator>> = None;
    for input in inputs {
        let bytes = match string_summary(input).sketch_bytes() {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let estimator = ndv::from_bytes(bytes)?;
        match &template {
            Some(template) if !template.can_merge(estimator.as_ref()) => return Ok(None),
            Some(_) => {}
            None => template = Some(estimator),
        }
    }
    Ok(template.map(|template| template.empty_like()))
}

/// Direct merge across all inputs; taken when every requested partition has
/// statistics or when too few inputs exist to extrapolate.
fn merge_all(
    inputs: &[CheckedInput<'_>],
    mut accumulator: Option<Box<dyn NdvEstimator>>,
) -> Result<StringColumnSummary> {
    let mut aggregate = string_summary(&inputs[0]).clone();
    if let Some(estimator) = accumulator.as_mut() {
        merge_sketch(estimator.as_mut(), string_summary(&inputs[0]))?;
    }
    for input in &inputs[1..] {
        let summary = string_summary(input);
        aggregate.max_col_len = aggregate.max_col_len.max(summary.max_col_len);
        // The full merge keeps the larger average length; the grouped
        // sparse path below keeps the smaller one.
        aggregate.avg_col_len = aggregate.avg_col_len.max(summary.avg_col_len);
        aggregate.num_nulls += summary.num_nulls;
        aggregate.num_dvs = aggregate.num_dvs.max(summary.num_dvs);
        if let Some(estimator) = accumulator.as_mut() {
            merge_sketch(estimator.as_mut(), summary)?;
        }
    }
    if let Some(estimator) = &accumulator {
        // The merged sketch carries the distinct count for the whole input
        // set.
        aggregate.num_dvs = estimator.estimate();
    }
    aggregate.bitvectors = None;
    Ok(aggregate)
}

/// Sparse path: turns the observed partitions into samples on the canonical
/// partition axis and extrapolates them to the full requested set.
fn group_and_extrapolate(
    num_parts: usize,
    inputs: &[CheckedInput<'_>],
    accumulator: Option<Box<dyn NdvEstimator>>,
) -> Result<StringColumnSummary> {
    let mut adjusted_index: HashMap<String, f64> = HashMap::new();
    let mut adjusted_stats: HashMap<String, StringColumnSummary> = HashMap::new();
    match accumulator {
        None => {
            // Without mergeable sketches every observed partition is its own
            // sample.
            for input in inputs {
                adjusted_index.insert(input.partition_name.to_string(), input.index as f64);
                adjusted_stats
                    .insert(input.partition_name.to_string(), string_summary(input).clone());
            }
        }
        Some(mut estimator) => {
            // Contiguous runs of observed partitions collapse into pseudo
            // partitions; each run's merged sketch yields one distinct value
            // sample.
            let mut group: Option<StringGroup> = None;
            for input in inputs {
                let summary = string_summary(input);
                if let Some(running) = group.take() {
                    if input.index == running.next_index {
                        group = Some(running);
                    } else {
                        // A gap in the canonical order closes the run.
                        estimator =
                            running.close(estimator, &mut adjusted_index, &mut adjusted_stats);
                    }
                }
                match group.as_mut() {
                    Some(running) => running.push(input, summary),
                    None => group = Some(StringGroup::start(input, summary)),
                }
                merge_sketch(estimator.as_mut(), summary)?;
            }
            if let Some(running) = group {
                running.close(estimator, &mut adjusted_index, &mut adjusted_stats);
            }
        }
    }
    Ok(extrapolate_string(
        num_parts,
        inputs.len(),
        &adjusted_index,
        &adjusted_stats,
        -1.0,
    ))
}

/// Running state of one pseudo partition: a contiguous run of observed
/// partitions folded into a single sample.
struct StringGroup {
    /// Concatenation of the member partition names.
    pseudo_name: String,
    /// Sum of the member canonical indexes.
    index_sum: f64,
    /// Number of members.
    length: usize,
    /// Canonical index the next input must have to extend the run.
    next_index: usize,
    summary: StringColumnSummary,
}

impl StringGroup {
    fn start(input: &CheckedInput<'_>, summary: &StringColumnSummary) -> Self {
        Self {
            pseudo_name: input.partition_name.to_string(),
            index_sum: input.index as f64,
            length: 1,
            next_index: input.index + 1,
            summary: summary.clone(),
        }
    }

    fn push(&mut self, input: &CheckedInput<'_>, summary: &StringColumnSummary) {
        self.pseudo_name.push_str(input.partition_name);
        self.index_sum += input.index as f64;
        self.length += 1;
        self.next_index = input.index + 1;
        // The grouped sparse path keeps the smaller average length; the
        // full merge keeps the larger one.
        self.summary.avg_col_len = self.summary.avg_col_len.min(summary.avg_col_len);
        self.summary.max_col_len = self.summary.max_col_len.max(summary.max_col_len);
        self.summary.num_nulls += summary.num_nulls;
    }

    /// Emits this run as one sample, with the accumulated sketch estimate
    /// as its distinct value count, and returns a fresh accumulator for the
    /// next run.
    fn close(
        mut self,
        estimator: Box<dyn NdvEstimator>,
        adjusted_index: &mut HashMap<String, f64>,
        adjusted_stats: &mut HashMap<String, StringColumnSummary>,
    ) -> Box<dyn NdvEstimator> {
        trace!(
            "pseudo partition {} of {} members at index {}",
            self.pseudo_name,
            self.length,
            self.index_sum / self.length as f64
        );
        self.summary.num_dvs = estimator.estimate();
        self.summary.bitvectors = None;
        adjusted_index.insert(self.pseudo_name.clone(), self.index_sum / self.length as f64);
        adjusted_stats.insert(self.pseudo_name, self.summary);
        estimator.empty_like()
    }
}

fn merge_sketch(accumulator: &mut dyn NdvEstimator, summary: &StringColumnSummary) -> Result<()> {
    let bytes = summary.sketch_bytes().ok_or_else(|| {
        StatsError::Internal("sketch mode is on but a summary carries no sketch".to_string())
    })?;
    let estimator = ndv::from_bytes(bytes)?;
    accumulator.merge(estimator.as_ref())
}

#[cfg(test)]
mod tests {
    use partstats_common::ColumnType;

    use crate::ndv::HyperLogLog;

    use super::*;

    fn requested(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn partition(
        name: &str,
        max: u64,
        avg: f64,
        nulls: u64,
        ndv: u64,
        bitvectors: Option<Vec<u8>>,
    ) -> PartitionStatistics {
        PartitionStatistics::new(
            name,
            vec![ColumnStatistics {
                column_name: "c".to_string(),
                column_type: ColumnType::String,
                data: ColumnSummary::String(StringColumnSummary {
                    max_col_len: max,
                    avg_col_len: avg,
                    num_nulls: nulls,
                    num_dvs: ndv,
                    bitvectors,
                }),
            }],
        )
    }

    fn sketch(values: impl IntoIterator<Item = String>) -> Vec<u8> {
        let mut sketch = HyperLogLog::default();
        for value in values {
            sketch.add(&value);
        }
        sketch.serialize()
    }

    fn output_summary(stats: &ColumnStatistics) -> &StringColumnSummary {
        stats.data.as_string().unwrap()
    }

    #[test]
    fn missing_sketch_falls_back_to_max_of_counts() -> Result<()> {
        let with_sketch = sketch((0..9).map(|i| format!("v{}", i)));
        let inputs = vec![
            partition("p0", 10, 5.0, 3, 9, Some(with_sketch)),
            partition("p1", 20, 4.0, 2, 4, None),
        ];
        let aggregator = StringColumnStatsAggregator::new();
        let stats = aggregator.aggregate("c", &requested(&["p0", "p1"]), &inputs)?;
        assert_eq!(9, output_summary(&stats).num_dvs);
        Ok(())
    }

    #[test]
    fn incompatible_sketches_fall_back_to_max_of_counts() -> Result<()> {
        let mut narrow = HyperLogLog::try_new(10)?;
        let mut wide = HyperLogLog::try_new(12)?;
        narrow.add(&"a");
        wide.add(&"b");
        let inputs = vec![
            partition("p0", 10, 5.0, 3, 7, Some(narrow.serialize())),
            partition("p1", 20, 4.0, 2, 4, Some(wide.serialize())),
        ];
        let aggregator = StringColumnStatsAggregator::new();
        let stats = aggregator.aggregate("c", &requested(&["p0", "p1"]), &inputs)?;
        assert_eq!(7, output_summary(&stats).num_dvs);
        Ok(())
    }

    #[test]
    fn undecodable_sketch_fails_the_call() {
        let inputs = vec![
            partition("p0", 10, 5.0, 3, 7, Some(b"bogus".to_vec())),
            partition("p1", 20, 4.0, 2, 4, None),
        ];
        let aggregator = StringColumnStatsAggregator::new();
        let result = aggregator.aggregate("c", &requested(&["p0", "p1"]), &inputs);
        assert!(matches!(result, Err(StatsError::MalformedInput(_))));
    }

    #[test]
    fn single_input_short_circuits_to_direct_merge() -> Result<()> {
        let inputs = vec![partition("p0", 10, 5.0, 3, 7, None)];
        let aggregator = StringColumnStatsAggregator::new();
        let stats = aggregator.aggregate("c", &requested(&["p0", "p1"]), &inputs)?;
        let summary = output_summary(&stats);
        assert_eq!(10, summary.max_col_len);
        assert_eq!(5.0, summary.avg_col_len);
        assert_eq!(3, summary.num_nulls);
        assert_eq!(7, summary.num_dvs);
        Ok(())
    }

    #[test]
    fn output_is_tagged_with_the_declared_type() -> Result<()> {
        let inputs = vec![partition("p0", 1, 1.0, 0, 1, None)];
        let aggregator = StringColumnStatsAggregator::new();
        let stats = aggregator.aggregate("c", &requested(&["p0"]), &inputs)?;
        assert_eq!("c", stats.column_name);
        assert_eq!(ColumnType::String, stats.column_type);
        Ok(())
    }
}
