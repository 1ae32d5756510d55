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

//! Linear extrapolation of observed partition statistics.
//!
//! Each observed sample pairs a position on the canonical partition axis
//! with a summary; pseudo partitions produced by sketch grouping sit at the
//! mean index of their members. Every scalar field is extrapolated
//! independently: the samples are ordered by the field's value and the line
//! through the lowest and highest valued samples is extended to the right
//! border of the requested partition range.

use std::collections::HashMap;

use ordered_float::OrderedFloat;

use partstats_common::StringColumnSummary;

/// One observed sample on the canonical partition axis.
struct Sample<'a> {
    index: f64,
    summary: &'a StringColumnSummary,
}

/// Imputes a summary for all `num_parts` partitions from the observed
/// samples in `adjusted_stats`, whose positions are given by
/// `adjusted_index` under the same keys.
///
/// `density_avg` is accepted for signature parity with the aggregators of
/// the other column types and is unused for string columns.
pub(crate) fn extrapolate_string(
    num_parts: usize,
    num_parts_with_stats: usize,
    adjusted_index: &HashMap<String, f64>,
    adjusted_stats: &HashMap<String, StringColumnSummary>,
    _density_avg: f64,
) -> StringColumnSummary {
    let right_border = num_parts as f64;
    let mut samples: Vec<Sample<'_>> = adjusted_stats
        .iter()
        .map(|(name, summary)| Sample {
            index: adjusted_index[name],
            summary,
        })
        .collect();

    let avg_col_len = extrapolate_field(
        &mut samples,
        right_border,
        |summary| summary.avg_col_len,
        |summary| summary.avg_col_len,
    );
    // The length endpoints intentionally read the average length even though
    // the samples are ordered by the maximum length.
    let max_col_len = extrapolate_field(
        &mut samples,
        right_border,
        |summary| summary.max_col_len as f64,
        |summary| summary.avg_col_len,
    ) as u64;
    let num_dvs = extrapolate_field(
        &mut samples,
        right_border,
        |summary| summary.num_dvs as f64,
        |summary| summary.num_dvs as f64,
    ) as u64;

    // Null counts scale up uniformly with the partition count instead of
    // following a line fit.
    let observed_nulls: u128 = samples
        .iter()
        .map(|sample| u128::from(sample.summary.num_nulls))
        .sum();
    let num_nulls = (observed_nulls * num_parts as u128 / num_parts_with_stats as u128) as u64;

    StringColumnSummary {
        max_col_len,
        avg_col_len,
        num_nulls,
        num_dvs,
        bitvectors: None,
    }
}

/// Extends the line through the lowest and highest valued samples to
/// `right_border`. Samples are ordered by `sort_key`; the endpoint values
/// are read through `value`, which usually but not always matches the sort
/// key.
fn extrapolate_field(
    samples: &mut [Sample<'_>],
    right_border: f64,
    sort_key: impl Fn(&StringColumnSummary) -> f64,
    value: impl Fn(&StringColumnSummary) -> f64,
) -> f64 {
    samples.sort_by_key(|sample| OrderedFloat(sort_key(sample.summary)));
    let first = &samples[0];
    let last = &samples[samples.len() - 1];
    let min_ind = first.index;
    let max_ind = last.index;
    let lo = value(first.summary);
    let hi = value(last.summary);
    if min_ind == max_ind {
        lo
    } else if min_ind < max_ind {
        // The highest value sits towards the right border.
        lo + (hi - lo) * (right_border - min_ind) / (max_ind - min_ind)
    } else {
        // The highest value sits towards the left border.
        lo + (hi - lo) * min_ind / (min_ind - max_ind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(max: u64, avg: f64, nulls: u64, ndv: u64) -> StringColumnSummary {
        StringColumnSummary {
            max_col_len: max,
            avg_col_len: avg,
            num_nulls: nulls,
            num_dvs: ndv,
            bitvectors: None,
        }
    }

    fn maps(
        samples: Vec<(&str, f64, StringColumnSummary)>,
    ) -> (HashMap<String, f64>, HashMap<String, StringColumnSummary>) {
        let mut adjusted_index = HashMap::new();
        let mut adjusted_stats = HashMap::new();
        for (name, index, sample) in samples {
            adjusted_index.insert(name.to_string(), index);
            adjusted_stats.insert(name.to_string(), sample);
        }
        (adjusted_index, adjusted_stats)
    }

    #[test]
    fn single_sample_collapses_to_its_own_values() {
        let (index, stats) = maps(vec![("p0p1", 0.5, summary(12, 3.5, 4, 15))]);
        let result = extrapolate_string(4, 2, &index, &stats, -1.0);
        assert_eq!(3.5, result.avg_col_len);
        assert_eq!(15, result.num_dvs);
        // The max length endpoints read the average length, so a lone sample
        // reports its truncated average length here.
        assert_eq!(3, result.max_col_len);
        // Null counts still scale with the partition count.
        assert_eq!(8, result.num_nulls);
    }

    #[test]
    fn ascending_values_extend_to_the_right_border() {
        let (index, stats) = maps(vec![
            ("p0", 0.0, summary(10, 6.0, 4, 8)),
            ("p2", 2.0, summary(30, 2.0, 6, 20)),
        ]);
        let result = extrapolate_string(4, 2, &index, &stats, -1.0);
        // Distinct values grow from 8 at index 0 to 20 at index 2; the line
        // reaches 32 at the right border.
        assert_eq!(32, result.num_dvs);
        assert_eq!(20, result.num_nulls);
        // Average lengths shrink towards the right, so the left border holds
        // the largest value: 2.0 + (6.0 - 2.0) * 2 / 2.
        assert_eq!(6.0, result.avg_col_len);
        // Ordered by maximum length the endpoint values are the average
        // lengths 6.0 and 2.0, extended to -2 and clamped by the cast.
        assert_eq!(0, result.max_col_len);
    }

    #[test]
    fn max_len_endpoints_read_the_average_length() {
        let (index, stats) = maps(vec![
            ("p0", 0.0, summary(10, 6.0, 0, 5)),
            ("p2", 2.0, summary(30, 5.0, 0, 5)),
        ]);
        let result = extrapolate_string(4, 2, &index, &stats, -1.0);
        // Sorted by max length the endpoints are (index 0, avg 6.0) and
        // (index 2, avg 5.0): 6.0 + (5.0 - 6.0) * (4 - 0) / (2 - 0) = 4.
        assert_eq!(4, result.max_col_len);
    }

    #[test]
    fn null_scale_up_uses_integer_arithmetic() {
        let (index, stats) = maps(vec![
            ("p0", 0.0, summary(1, 1.0, 3, 1)),
            ("p1", 1.0, summary(1, 1.0, 4, 1)),
        ]);
        let result = extrapolate_string(3, 2, &index, &stats, -1.0);
        // (3 + 4) * 3 / 2 truncates to 10.
        assert_eq!(10, result.num_nulls);
    }
}
