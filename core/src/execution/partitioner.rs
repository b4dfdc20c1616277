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

use crate::config::{JobConf, QUANTILES_LOCATION_KEY};
use crate::errors::{QuillError, QuillResult};
use crate::execution::boundary_table::read_boundary_table;
use crate::execution::sort::{KeyComparator, SortSpec};
use log::info;
use quill_types::Tuple;
use std::cmp::Ordering;

/// Routes records to output partitions using a boundary table computed by
/// [`crate::execution::sampler::QuantileSampler`].
///
/// Partition `p` receives the keys `k` with `boundaries[p - 1] <= k < boundaries[p]`,
/// so a key equal to a boundary goes to the upper partition. Immutable once
/// built and safe to share between threads.
#[derive(Debug, Clone)]
pub struct SortPartitioner {
    spec: SortSpec,
    comparator: KeyComparator,
    boundaries: Vec<Tuple>,
}

impl SortPartitioner {
    /// Loads the boundary table from the location configured under
    /// `quill.sort.quantiles.location`.
    ///
    /// A missing key, an unreadable or corrupt table, or a table written for
    /// another sort key is a configuration error.
    pub fn configure(conf: &JobConf, spec: SortSpec) -> QuillResult<Self> {
        let location = conf.get_required(QUANTILES_LOCATION_KEY)?;
        let boundaries = read_boundary_table(location, spec.key_schema()).map_err(|e| {
            QuillError::Config(format!(
                "Unable to read partition boundaries from {location}: {e}"
            ))
        })?;
        let partitioner = Self::from_boundaries(spec, boundaries).map_err(|e| {
            QuillError::Config(format!("Corrupt boundary table at {location}: {e}"))
        })?;
        info!(
            "Loaded {} partition boundaries from {location}",
            partitioner.boundaries.len()
        );
        Ok(partitioner)
    }

    /// Builds a partitioner over an in-memory boundary table, which must be
    /// sorted under the sort key.
    pub fn from_boundaries(spec: SortSpec, boundaries: Vec<Tuple>) -> QuillResult<Self> {
        let comparator = spec.comparator();
        if let Some(i) = boundaries
            .windows(2)
            .position(|w| comparator.compare(&w[0], &w[1]) == Ordering::Greater)
        {
            return Err(QuillError::Internal(format!(
                "Boundaries are not sorted: {} is followed by {}",
                boundaries[i],
                boundaries[i + 1]
            )));
        }
        Ok(Self {
            spec,
            comparator,
            boundaries,
        })
    }

    pub fn boundaries(&self) -> &[Tuple] {
        &self.boundaries
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.spec
    }

    /// Partition in `[0, num_partitions)` for a sort-key projection.
    ///
    /// Keys above the table's range are clamped to the last partition, and an
    /// empty table sends every key to partition 0.
    pub fn get_partition(&self, key: &Tuple, num_partitions: usize) -> usize {
        let partition = self
            .boundaries
            .partition_point(|bound| self.comparator.compare(bound, key) != Ordering::Greater);
        partition.min(num_partitions.saturating_sub(1))
    }

    /// Partition of a full record.
    pub fn partition_of(&self, record: &Tuple, num_partitions: usize) -> usize {
        self.get_partition(&self.spec.project(record), num_partitions)
    }

    /// Assigns every record of `records` and groups the row indices by partition.
    pub fn partition_records(
        &self,
        records: &[Tuple],
        num_partitions: usize,
    ) -> PartitionAssignment {
        let partition_ids: Vec<u32> = records
            .iter()
            .map(|record| self.partition_of(record, num_partitions) as u32)
            .collect();
        PartitionAssignment::from_partition_ids(partition_ids, num_partitions.max(1))
    }
}

/// Row indices of a batch grouped by output partition.
///
/// `partition_row_indices[partition_starts[K]..partition_starts[K + 1]]` holds
/// the rows of partition K, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionAssignment {
    partition_ids: Vec<u32>,
    partition_starts: Vec<u32>,
    partition_row_indices: Vec<u32>,
}

impl PartitionAssignment {
    fn from_partition_ids(partition_ids: Vec<u32>, num_partitions: usize) -> Self {
        // count each partition size, while leaving the last extra element as 0
        let mut partition_ends = vec![0u32; num_partitions + 1];
        partition_ids
            .iter()
            .for_each(|partition_id| partition_ends[*partition_id as usize] += 1);

        // accumulate partition counters into partition ends
        // e.g. partition counter: [1, 3, 2, 1, 0] => [1, 4, 6, 7, 7]
        let mut accum = 0;
        partition_ends.iter_mut().for_each(|v| {
            *v += accum;
            accum = *v;
        });

        // e.g. partition ids: [3, 1, 1, 1, 2, 2, 0] produce
        //  partition_row_indices: [6, 1, 2, 3, 4, 5, 0]
        //  partition_starts: [0, 1, 4, 6, 7]
        let mut partition_row_indices = vec![0u32; partition_ids.len()];
        for (index, partition_id) in partition_ids.iter().enumerate().rev() {
            partition_ends[*partition_id as usize] -= 1;
            let end = partition_ends[*partition_id as usize];
            partition_row_indices[end as usize] = index as u32;
        }

        // after calculating, partition ends become partition starts
        Self {
            partition_ids,
            partition_starts: partition_ends,
            partition_row_indices,
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.partition_starts.len() - 1
    }

    /// Partition of every input row, in input order.
    pub fn partition_ids(&self) -> &[u32] {
        &self.partition_ids
    }

    pub fn partition_starts(&self) -> &[u32] {
        &self.partition_starts
    }

    /// Input rows routed to `partition`.
    pub fn rows(&self, partition: usize) -> &[u32] {
        match (
            self.partition_starts.get(partition),
            self.partition_starts.get(partition + 1),
        ) {
            (Some(start), Some(end)) => {
                &self.partition_row_indices[*start as usize..*end as usize]
            }
            _ => &[],
        }
    }
}
