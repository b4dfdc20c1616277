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

//! Persistence of the boundary table as an Arrow IPC stream.
//!
//! The stream schema is the sort-key schema and every row holds one boundary.
//! Locations are object store URLs (`file:///...`) or plain local paths.

use crate::errors::{QuillError, QuillResult};
use crate::schema::ResourceSchema;
use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Float32Array, Float64Array, Int32Array,
    Int64Array, ListArray, RecordBatch, StringArray, StructArray,
};
use arrow::buffer::{NullBuffer, OffsetBuffer};
use arrow::datatypes::{
    DataType as ArrowDataType, Float32Type, Float64Type, Int32Type, Int64Type, Schema,
    SchemaRef,
};
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use object_store::path::Path;
use object_store::{parse_url, ObjectStore, PutPayload};
use quill_types::{Datum, Tuple};
use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::thread;
use tokio::runtime::{Builder, Handle};
use url::Url;

/// Writes `boundaries`, laid out as `key_schema`, to `location`.
pub fn write_boundary_table(
    location: &str,
    key_schema: &ResourceSchema,
    boundaries: &[Tuple],
) -> QuillResult<()> {
    let batch = boundaries_to_batch(key_schema, boundaries)?;
    let mut buf = vec![];
    {
        let mut writer = StreamWriter::try_new(&mut buf, &batch.schema())?;
        writer.write(&batch)?;
        writer.finish()?;
    }
    let (store, path) = resolve_location(location)?;
    block_on(async { store.put(&path, PutPayload::from(buf)).await })??;
    Ok(())
}

/// Reads all boundaries stored at `location`, in stream order.
///
/// The stored columns must have the types of `key_schema`; a table written for
/// another sort key is a configuration error.
pub fn read_boundary_table(
    location: &str,
    key_schema: &ResourceSchema,
) -> QuillResult<Vec<Tuple>> {
    let (store, path) = resolve_location(location)?;
    let bytes = block_on(async {
        let result = store.get(&path).await?;
        result.bytes().await
    })??;
    let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
    check_key_types(location, &reader.schema(), &key_schema.to_arrow_schema()?)?;

    let mut boundaries = vec![];
    for batch in reader {
        boundaries.extend(batch_to_boundaries(&batch?)?);
    }
    Ok(boundaries)
}

/// Column types of the keys held by a table with `schema`, looking through a
/// single bag column the same way [`batch_to_boundaries`] does.
fn key_types(schema: &Schema) -> Vec<&ArrowDataType> {
    if let [field] = &schema.fields()[..] {
        if let ArrowDataType::List(element) = field.data_type() {
            if let ArrowDataType::Struct(fields) = element.data_type() {
                return fields.iter().map(|f| f.data_type()).collect();
            }
        }
    }
    schema.fields().iter().map(|f| f.data_type()).collect()
}

fn check_key_types(location: &str, stored: &Schema, expected: &Schema) -> QuillResult<()> {
    let stored = key_types(stored);
    let expected = key_types(expected);
    // Field names are not part of the key
    let matches = stored.len() == expected.len()
        && stored
            .iter()
            .zip(&expected)
            .all(|(s, e)| s.equals_datatype(e));
    if matches {
        Ok(())
    } else {
        Err(QuillError::Config(format!(
            "Boundary table at {location} holds keys of types {stored:?} but the sort key has types {expected:?}"
        )))
    }
}

fn resolve_location(location: &str) -> QuillResult<(Box<dyn ObjectStore>, Path)> {
    let url = match Url::parse(location) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = std::path::absolute(location)?;
            Url::from_file_path(&path).map_err(|_| {
                QuillError::Config(format!("Invalid boundary table path {location}"))
            })?
        }
        Err(e) => return Err(e.into()),
    };
    Ok(parse_url(&url)?)
}

fn block_on<F>(future: F) -> QuillResult<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    // Runtime::block_on panics on a thread that is already driving a runtime
    if Handle::try_current().is_ok() {
        return thread::scope(|scope| scope.spawn(|| run_to_completion(future)).join())
            .map_err(|_| QuillError::Internal("Boundary table I/O thread panicked".to_string()))?;
    }
    run_to_completion(future)
}

fn run_to_completion<F: Future>(future: F) -> QuillResult<F::Output> {
    let runtime = Builder::new_current_thread().build()?;
    Ok(runtime.block_on(future))
}

pub(crate) fn boundaries_to_batch(
    key_schema: &ResourceSchema,
    boundaries: &[Tuple],
) -> QuillResult<RecordBatch> {
    let schema: SchemaRef = Arc::new(key_schema.to_arrow_schema()?);
    let columns = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let values: Vec<Datum> = boundaries
                .iter()
                .map(|key| key.get(i).cloned().unwrap_or_default())
                .collect();
            to_array(field.data_type(), &values)
        })
        .collect::<QuillResult<Vec<_>>>()?;
    Ok(RecordBatch::try_new(schema, columns)?)
}

fn type_mismatch(expected: &ArrowDataType, value: &Datum) -> QuillError {
    QuillError::Schema(format!(
        "Cannot store value {value} of type {} in a column of type {expected}",
        value.data_type()
    ))
}

macro_rules! collect_values {
    ($arrow_type:expr, $values:expr, $variant:ident, $map:expr) => {
        $values
            .iter()
            .map(|value| match value {
                Datum::$variant(v) => Ok(Some($map(v))),
                Datum::Null => Ok(None),
                other => Err(type_mismatch($arrow_type, other)),
            })
            .collect::<QuillResult<Vec<_>>>()?
    };
}

fn to_array(arrow_type: &ArrowDataType, values: &[Datum]) -> QuillResult<ArrayRef> {
    let array: ArrayRef = match arrow_type {
        ArrowDataType::Boolean => Arc::new(BooleanArray::from(collect_values!(
            arrow_type,
            values,
            Boolean,
            |v: &bool| *v
        ))),
        ArrowDataType::Int32 => Arc::new(Int32Array::from(collect_values!(
            arrow_type,
            values,
            Int,
            |v: &i32| *v
        ))),
        ArrowDataType::Int64 => Arc::new(Int64Array::from(collect_values!(
            arrow_type,
            values,
            Long,
            |v: &i64| *v
        ))),
        ArrowDataType::Float32 => Arc::new(Float32Array::from(collect_values!(
            arrow_type,
            values,
            Float,
            |v: &f32| *v
        ))),
        ArrowDataType::Float64 => Arc::new(Float64Array::from(collect_values!(
            arrow_type,
            values,
            Double,
            |v: &f64| *v
        ))),
        ArrowDataType::Utf8 => Arc::new(StringArray::from(collect_values!(
            arrow_type,
            values,
            Text,
            String::as_str
        ))),
        ArrowDataType::Binary => Arc::new(BinaryArray::from(collect_values!(
            arrow_type,
            values,
            Bytes,
            Vec::as_slice
        ))),
        ArrowDataType::Struct(fields) => {
            let validity = values
                .iter()
                .map(|value| match value {
                    Datum::Tuple(_) => Ok(true),
                    Datum::Null => Ok(false),
                    other => Err(type_mismatch(arrow_type, other)),
                })
                .collect::<QuillResult<Vec<_>>>()?;
            let nulls = Some(NullBuffer::from(validity));
            if fields.is_empty() {
                Arc::new(StructArray::new_empty_fields(values.len(), nulls))
            } else {
                let children = fields
                    .iter()
                    .enumerate()
                    .map(|(i, field)| {
                        let child: Vec<Datum> = values
                            .iter()
                            .map(|value| match value {
                                Datum::Tuple(t) => t.get(i).cloned().unwrap_or_default(),
                                _ => Datum::Null,
                            })
                            .collect();
                        to_array(field.data_type(), &child)
                    })
                    .collect::<QuillResult<Vec<_>>>()?;
                Arc::new(StructArray::try_new(fields.clone(), children, nulls)?)
            }
        }
        ArrowDataType::List(element) => {
            let mut lengths = Vec::with_capacity(values.len());
            let mut validity = Vec::with_capacity(values.len());
            let mut items = vec![];
            for value in values {
                match value {
                    Datum::Bag(bag) => {
                        lengths.push(bag.len());
                        validity.push(true);
                        items.extend(bag.iter().cloned().map(Datum::Tuple));
                    }
                    Datum::Null => {
                        lengths.push(0);
                        validity.push(false);
                    }
                    other => return Err(type_mismatch(arrow_type, other)),
                }
            }
            let items = to_array(element.data_type(), &items)?;
            Arc::new(ListArray::try_new(
                Arc::clone(element),
                OffsetBuffer::from_lengths(lengths),
                items,
                Some(NullBuffer::from(validity)),
            )?)
        }
        other => {
            return Err(QuillError::Schema(format!(
                "Unsupported boundary column type {other}"
            )))
        }
    };
    Ok(array)
}

fn batch_to_boundaries(batch: &RecordBatch) -> QuillResult<Vec<Tuple>> {
    // A table holding one bag of keys is flattened into the keys themselves
    if let [column] = batch.columns() {
        if let ArrowDataType::List(_) = column.data_type() {
            let mut boundaries = vec![];
            for row in 0..batch.num_rows() {
                if let Datum::Bag(bag) = to_datum(column.as_ref(), row)? {
                    boundaries.extend(bag.iter().cloned());
                }
            }
            return Ok(boundaries);
        }
    }

    (0..batch.num_rows())
        .map(|row| {
            batch
                .columns()
                .iter()
                .map(|column| to_datum(column.as_ref(), row))
                .collect::<QuillResult<Vec<_>>>()
                .map(Tuple::new)
        })
        .collect()
}

fn to_datum(array: &dyn Array, row: usize) -> QuillResult<Datum> {
    if array.is_null(row) {
        return Ok(Datum::Null);
    }
    let datum = match array.data_type() {
        ArrowDataType::Boolean => Datum::Boolean(array.as_boolean().value(row)),
        ArrowDataType::Int32 => Datum::Int(array.as_primitive::<Int32Type>().value(row)),
        ArrowDataType::Int64 => Datum::Long(array.as_primitive::<Int64Type>().value(row)),
        ArrowDataType::Float32 => Datum::Float(array.as_primitive::<Float32Type>().value(row)),
        ArrowDataType::Float64 => Datum::Double(array.as_primitive::<Float64Type>().value(row)),
        ArrowDataType::Utf8 => Datum::Text(array.as_string::<i32>().value(row).to_string()),
        ArrowDataType::Binary => Datum::Bytes(array.as_binary::<i32>().value(row).to_vec()),
        ArrowDataType::Struct(_) => Datum::Tuple(struct_row(array.as_struct(), row)?),
        ArrowDataType::List(_) => {
            let items = array.as_list::<i32>().value(row);
            let tuples = (0..items.len())
                .map(|i| match to_datum(items.as_ref(), i)? {
                    Datum::Tuple(t) => Ok(t),
                    other => Err(QuillError::Schema(format!(
                        "Bag elements must be tuples, found {}",
                        other.data_type()
                    ))),
                })
                .collect::<QuillResult<Vec<_>>>()?;
            Datum::Bag(tuples.into())
        }
        other => {
            return Err(QuillError::Schema(format!(
                "Unsupported boundary column type {other}"
            )))
        }
    };
    Ok(datum)
}

fn struct_row(array: &StructArray, row: usize) -> QuillResult<Tuple> {
    array
        .columns()
        .iter()
        .map(|column| to_datum(column.as_ref(), row))
        .collect::<QuillResult<Vec<_>>>()
        .map(Tuple::new)
}
