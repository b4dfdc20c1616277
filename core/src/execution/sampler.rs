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
use crate::execution::boundary_table::{boundaries_to_batch, write_boundary_table};
use crate::execution::sort::SortSpec;
use arrow::util::pretty::pretty_format_batches;
use log::{debug, log_enabled, Level};
use quill_types::Tuple;
use rand::Rng;

/// Computes the quantile boundaries of a sample under a sort key.
#[derive(Debug, Clone)]
pub struct QuantileSampler {
    spec: SortSpec,
}

impl QuantileSampler {
    pub fn new(spec: SortSpec) -> Self {
        Self { spec }
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.spec
    }

    /// Returns the `num_partitions - 1` keys that split `records` into
    /// `num_partitions` buckets of roughly equal size.
    ///
    /// Boundary `i` is the key at offset `floor(i * size / num_partitions)` of the
    /// sorted sample projections, so skew in the sample carries over to the
    /// partitions. An empty sample yields no boundaries.
    pub fn determine_boundaries(
        &self,
        records: &[Tuple],
        num_partitions: usize,
    ) -> QuillResult<Vec<Tuple>> {
        if num_partitions == 0 {
            return Err(QuillError::Config(
                "Number of partitions must be positive".to_string(),
            ));
        }
        if records.is_empty() {
            debug!("Empty sample, no partition boundaries");
            return Ok(vec![]);
        }

        let comparator = self.spec.comparator();
        let mut keys: Vec<Tuple> = records.iter().map(|r| self.spec.project(r)).collect();
        keys.sort_by(|a, b| comparator.compare(a, b));

        let size = keys.len();
        let boundaries: Vec<Tuple> = (1..num_partitions)
            .map(|i| keys[i * size / num_partitions].clone())
            .collect();
        debug!(
            "Computed {} partition boundaries from {} sampled records",
            boundaries.len(),
            size
        );
        Ok(boundaries)
    }

    /// Computes the boundaries from a uniform random sample of at most
    /// `sample_size` records, for inputs too large to sort whole.
    ///
    /// When `records` fits in the sample the result is the same as
    /// [`QuantileSampler::determine_boundaries`] over all of it.
    pub fn sample_boundaries(
        &self,
        records: &[Tuple],
        sample_size: usize,
        num_partitions: usize,
    ) -> QuillResult<Vec<Tuple>> {
        let sample = reservoir_sample(records, sample_size);
        debug!("Sampled {} of {} records", sample.len(), records.len());
        self.determine_boundaries(&sample, num_partitions)
    }

    /// Persists `boundaries` to the location configured under
    /// `quill.sort.quantiles.location`.
    pub fn write_boundaries(&self, conf: &JobConf, boundaries: &[Tuple]) -> QuillResult<()> {
        let location = conf.get_required(QUANTILES_LOCATION_KEY)?;
        if log_enabled!(Level::Trace) {
            let batch = boundaries_to_batch(self.spec.key_schema(), boundaries)?;
            log::trace!("Boundary table:\n{}", pretty_format_batches(&[batch])?);
        }
        write_boundary_table(location, self.spec.key_schema(), boundaries)?;
        debug!("Wrote {} partition boundaries to {location}", boundaries.len());
        Ok(())
    }
}

/// Draws up to `sample_size` records uniformly at random, keeping their input order.
pub fn reservoir_sample(records: &[Tuple], sample_size: usize) -> Vec<Tuple> {
    reservoir_sample_with(&mut rand::rng(), records, sample_size)
}

/// [`reservoir_sample`] driven by a caller-supplied generator.
pub fn reservoir_sample_with<R: Rng>(
    rng: &mut R,
    records: &[Tuple],
    sample_size: usize,
) -> Vec<Tuple> {
    sample_positions(rng, records.len(), sample_size)
        .into_iter()
        .map(|row| records[row].clone())
        .collect()
}

/// Picks `min(sample_size, num_rows)` distinct row positions, each subset equally
/// likely, and returns them in ascending order.
///
/// This is Algorithm L (Li, 1994): rather than drawing once per row, it draws the
/// length of the run of rows to skip before the next replacement, so the work is
/// proportional to `sample_size * log(num_rows / sample_size)`.
fn sample_positions<R: Rng>(
    rng: &mut R,
    num_rows: usize,
    sample_size: usize,
) -> Vec<usize> {
    if sample_size >= num_rows {
        return (0..num_rows).collect();
    }
    if sample_size == 0 {
        return vec![];
    }

    let k = sample_size as f64;
    // largest of k uniform draws, shrunk on every replacement
    let mut threshold = (rng.random::<f64>().ln() / k).exp();
    let mut reservoir: Vec<usize> = (0..sample_size).collect();
    let mut row = sample_size - 1;
    loop {
        let skip = (rng.random::<f64>().ln() / (1.0 - threshold).ln()).floor() as usize;
        row = match row.checked_add(skip.saturating_add(1)) {
            Some(next) if next < num_rows => next,
            _ => break,
        };
        reservoir[rng.random_range(0..sample_size)] = row;
        threshold *= (rng.random::<f64>().ln() / k).exp();
    }

    reservoir.sort_unstable();
    debug_assert!(reservoir.windows(2).all(|w| w[0] < w[1]));
    reservoir
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::sort::SortColumn;
    use crate::schema::{Order, ResourceFieldSchema, ResourceSchema};
    use quill_types::{DataType, Datum};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sampler(order: Order) -> QuantileSampler {
        let schema = ResourceSchema::new(vec![
            ResourceFieldSchema::new("k", DataType::Int),
            ResourceFieldSchema::new("v", DataType::Text),
        ])
        .unwrap();
        let spec = SortSpec::try_new(&schema, vec![SortColumn::new(vec![0], order)]).unwrap();
        QuantileSampler::new(spec)
    }

    fn records(keys: impl IntoIterator<Item = i32>) -> Vec<Tuple> {
        keys.into_iter()
            .map(|k| Tuple::new(vec![Datum::Int(k), Datum::from(format!("v{k}"))]))
            .collect()
    }

    fn keys(values: &[i32]) -> Vec<Tuple> {
        values
            .iter()
            .map(|k| Tuple::new(vec![Datum::Int(*k)]))
            .collect()
    }

    #[test]
    fn boundaries_at_quantile_offsets() {
        let sampler = sampler(Order::Ascending);
        // shuffled 1..=10
        let sample = records([7, 2, 10, 4, 1, 9, 3, 6, 8, 5]);
        assert_eq!(
            sampler.determine_boundaries(&sample, 4).unwrap(),
            keys(&[3, 6, 8])
        );
        // floor(1 * 10 / 2) = 5
        assert_eq!(
            sampler.determine_boundaries(&sample, 2).unwrap(),
            keys(&[6])
        );
        assert!(sampler.determine_boundaries(&sample, 1).unwrap().is_empty());
    }

    #[test]
    fn descending_boundaries() {
        let sampler = sampler(Order::Descending);
        let sample = records(1..=10);
        assert_eq!(
            sampler.determine_boundaries(&sample, 4).unwrap(),
            keys(&[8, 5, 3])
        );
    }

    #[test]
    fn duplicates_and_nulls_in_sample() {
        let sampler = sampler(Order::Ascending);
        let mut sample = records([5, 5, 5, 5, 5, 5]);
        sample.push(Tuple::new(vec![Datum::Null, Datum::Null]));
        sample.push(Tuple::new(vec![]));
        let boundaries = sampler.determine_boundaries(&sample, 4).unwrap();
        assert_eq!(boundaries.len(), 3);
        assert_eq!(boundaries[0], keys(&[5])[0]);
        assert!(boundaries.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn more_partitions_than_samples() {
        let sampler = sampler(Order::Ascending);
        let boundaries = sampler.determine_boundaries(&records([1, 2]), 5).unwrap();
        assert_eq!(boundaries, keys(&[1, 1, 2, 2]));
    }

    #[test]
    fn empty_sample_and_zero_partitions() {
        let sampler = sampler(Order::Ascending);
        assert!(sampler.determine_boundaries(&[], 8).unwrap().is_empty());
        assert!(sampler
            .determine_boundaries(&records([1]), 0)
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn write_boundaries_requires_location() {
        let sampler = sampler(Order::Ascending);
        let err = sampler
            .write_boundaries(&JobConf::new(), &keys(&[1]))
            .unwrap_err();
        assert!(err.to_string().contains(QUANTILES_LOCATION_KEY), "{err}");
    }

    #[test]
    fn sample_sizes() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            sample_positions(&mut rng, 100, 150),
            (0..100).collect::<Vec<_>>()
        );
        assert_eq!(sample_positions(&mut rng, 100, 100).len(), 100);
        let sample = sample_positions(&mut rng, 100, 10);
        assert_eq!(sample.len(), 10);
        assert!(sample.iter().all(|i| *i < 100));
        assert!(sample.windows(2).all(|w| w[0] < w[1]));
        assert!(sample_positions(&mut rng, 100, 0).is_empty());
        assert!(sample_positions(&mut rng, 0, 5).is_empty());

        let sample = reservoir_sample(&records(0..50), 5);
        assert_eq!(sample.len(), 5);
        assert!(sample.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn seeded_sample_is_reproducible() {
        let input = records(0..1000);
        let a = reservoir_sample_with(&mut StdRng::seed_from_u64(7), &input, 20);
        let b = reservoir_sample_with(&mut StdRng::seed_from_u64(7), &input, 20);
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn every_row_is_equally_likely() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut counts = [0u32; 10];
        for _ in 0..10_000 {
            for row in sample_positions(&mut rng, 10, 3) {
                counts[row] += 1;
            }
        }
        // each row is expected 3000 times
        assert!(counts.iter().all(|c| (2700..3300).contains(c)), "{counts:?}");
    }

    #[test]
    fn one_of_two_rows() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut counts = [0i32; 2];
        for _ in 0..500 {
            let result = sample_positions(&mut rng, 2, 1);
            assert_eq!(result.len(), 1);
            counts[result[0]] += 1;
        }
        assert!((counts[0] - counts[1]).abs() <= 100, "{counts:?}");
    }

    #[test]
    fn boundaries_from_a_sample() {
        let sampler = sampler(Order::Ascending);
        let input = records(1..=10);
        // a sample that covers the input sorts all of it
        assert_eq!(
            sampler.sample_boundaries(&input, 100, 4).unwrap(),
            keys(&[3, 6, 8])
        );

        let input = records(0..10_000);
        let boundaries = sampler.sample_boundaries(&input, 500, 4).unwrap();
        assert_eq!(boundaries.len(), 3);
        assert!(boundaries.windows(2).all(|w| w[0] < w[1]));
        // quartiles of 0..10000 with some sampling slack
        for (boundary, quartile) in boundaries.iter().zip([2500, 5000, 7500]) {
            let Some(Datum::Int(k)) = boundary.get(0) else {
                panic!("unexpected boundary {boundary}");
            };
            assert!((k - quartile).abs() < 1000, "{boundary}");
        }
        assert!(sampler.sample_boundaries(&input, 0, 4).unwrap().is_empty());
    }
}
