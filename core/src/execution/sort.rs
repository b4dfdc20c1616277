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

//! Total order over sort-key projections, shared by the sampler and the partitioner.

use crate::errors::{QuillError, QuillResult};
use crate::schema::{Order, ResourceFieldSchema, ResourceSchema};
use quill_types::{DataType, Datum, Tuple};
use std::cmp::Ordering;

/// One position of a sort key: a path of field offsets and a direction.
///
/// The first offset selects a top-level field; any following offsets select a
/// field inside the tuple found at the previous step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortColumn {
    pub path: Vec<usize>,
    pub order: Order,
}

impl SortColumn {
    pub fn new(path: Vec<usize>, order: Order) -> Self {
        Self { path, order }
    }

    pub fn ascending(offset: usize) -> Self {
        Self::new(vec![offset], Order::Ascending)
    }

    pub fn descending(offset: usize) -> Self {
        Self::new(vec![offset], Order::Descending)
    }
}

/// Validated sort key definition of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    columns: Vec<SortColumn>,
    key_schema: ResourceSchema,
}

impl SortSpec {
    /// Builds the sort key from the schema's own sort keys and orders.
    pub fn from_schema(schema: &ResourceSchema) -> QuillResult<Self> {
        let columns = schema
            .sort_keys()
            .iter()
            .zip(schema.sort_key_orders())
            .map(|(offset, order)| SortColumn::new(vec![*offset], *order))
            .collect();
        Self::try_new(schema, columns)
    }

    /// Builds a sort key from explicit, possibly nested, column paths.
    pub fn try_new(schema: &ResourceSchema, columns: Vec<SortColumn>) -> QuillResult<Self> {
        let key_fields = columns
            .iter()
            .map(|column| resolve_path(schema, &column.path).cloned())
            .collect::<QuillResult<Vec<_>>>()?;
        let mut key_schema = ResourceSchema::new(key_fields)?;
        let offsets: Vec<usize> = (0..columns.len()).collect();
        let orders: Vec<Order> = columns.iter().map(|c| c.order).collect();
        key_schema.set_sort_keys(&offsets, &orders)?;
        Ok(Self {
            columns,
            key_schema,
        })
    }

    pub fn columns(&self) -> &[SortColumn] {
        &self.columns
    }

    /// Schema of the projections produced by [`SortSpec::project`].
    pub fn key_schema(&self) -> &ResourceSchema {
        &self.key_schema
    }

    pub fn comparator(&self) -> KeyComparator {
        KeyComparator::new(self.columns.iter().map(|c| c.order).collect())
    }

    /// Extracts the sort-key projection of a record. Fields that are missing from
    /// the record, or sit below a null tuple, project to null.
    pub fn project(&self, record: &Tuple) -> Tuple {
        self.columns
            .iter()
            .map(|column| project_path(record, &column.path))
            .collect::<Vec<_>>()
            .into()
    }
}

fn resolve_path<'a>(
    schema: &'a ResourceSchema,
    path: &[usize],
) -> QuillResult<&'a ResourceFieldSchema> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| QuillError::Schema("Empty sort key path".to_string()))?;
    let mut field = schema.field(*first).ok_or_else(|| {
        QuillError::Schema(format!(
            "Sort key {path:?} is out of range for a schema with {} field(s)",
            schema.len()
        ))
    })?;
    for offset in rest {
        if field.data_type() != DataType::Tuple {
            return Err(QuillError::Schema(format!(
                "Sort key {path:?} descends into field '{}' of type {}, only tuples can be traversed",
                field.name().unwrap_or_default(),
                field.data_type()
            )));
        }
        field = field
            .schema()
            .and_then(|nested| nested.field(*offset))
            .ok_or_else(|| {
                QuillError::Schema(format!(
                    "Sort key {path:?} has no field at offset {offset} of '{}'",
                    field.name().unwrap_or_default()
                ))
            })?;
    }
    if field.data_type() == DataType::Map {
        return Err(QuillError::Schema(format!(
            "Field '{}' of type map cannot be used as a sort key",
            field.name().unwrap_or_default()
        )));
    }
    Ok(field)
}

fn project_path(record: &Tuple, path: &[usize]) -> Datum {
    let mut current = record;
    for (depth, offset) in path.iter().enumerate() {
        match current.get(*offset) {
            Some(value) if depth + 1 == path.len() => return value.clone(),
            Some(Datum::Tuple(nested)) => current = nested,
            _ => return Datum::Null,
        }
    }
    Datum::Null
}

/// Compares sort-key projections position by position.
///
/// Each position uses the natural ordering of [`Datum`], in which null is less
/// than any value, and is reversed for descending positions. The first unequal
/// position decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyComparator {
    orders: Vec<Order>,
}

impl KeyComparator {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    pub fn compare(&self, a: &Tuple, b: &Tuple) -> Ordering {
        for (i, order) in self.orders.iter().enumerate() {
            let left = a.get(i).unwrap_or(&Datum::Null);
            let right = b.get(i).unwrap_or(&Datum::Null);
            let ordering = match order {
                Order::Ascending => left.cmp(right),
                Order::Descending => right.cmp(left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
