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

use crate::errors::{QuillError, QuillResult};
use crate::schema::{ResourceFieldSchema, ResourceSchema};
use arrow::datatypes::{DataType as ArrowDataType, Field, Fields, Schema};
use quill_types::DataType;
use std::sync::Arc;

impl ResourceSchema {
    /// Arrow schema used to persist rows of this schema. Unnamed fields are named
    /// after their position (`_0`, `_1`, ...) and every field is nullable.
    pub fn to_arrow_schema(&self) -> QuillResult<Schema> {
        Ok(Schema::new(self.to_arrow_fields()?))
    }

    pub(crate) fn to_arrow_fields(&self) -> QuillResult<Fields> {
        self.fields()
            .iter()
            .enumerate()
            .map(|(i, field)| to_arrow_field(i, field))
            .collect::<QuillResult<Vec<_>>>()
            .map(Fields::from)
    }
}

fn to_arrow_field(index: usize, field: &ResourceFieldSchema) -> QuillResult<Field> {
    let name = field
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("_{index}"));
    Ok(Field::new(name, to_arrow_type(field)?, true))
}

fn to_arrow_type(field: &ResourceFieldSchema) -> QuillResult<ArrowDataType> {
    let arrow_type = match field.data_type() {
        DataType::Boolean => ArrowDataType::Boolean,
        DataType::Int => ArrowDataType::Int32,
        DataType::Long => ArrowDataType::Int64,
        DataType::Float => ArrowDataType::Float32,
        DataType::Double => ArrowDataType::Float64,
        DataType::Text => ArrowDataType::Utf8,
        DataType::Bytes | DataType::Unknown => ArrowDataType::Binary,
        DataType::Tuple => ArrowDataType::Struct(nested_fields(field.schema())?),
        DataType::Bag => {
            // The element tuple lives in the single nested field of the bag
            let element = field
                .schema()
                .and_then(|schema| schema.field(0))
                .and_then(ResourceFieldSchema::schema);
            ArrowDataType::List(Arc::new(Field::new_struct(
                "item",
                nested_fields(element)?,
                true,
            )))
        }
        DataType::Map => {
            return Err(QuillError::Schema(format!(
                "Unsupported sort key type map for field '{}'",
                field.name().unwrap_or_default()
            )))
        }
    };
    Ok(arrow_type)
}

fn nested_fields(schema: Option<&ResourceSchema>) -> QuillResult<Fields> {
    match schema {
        Some(schema) => schema.to_arrow_fields(),
        None => Ok(Fields::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_atomic_types() {
        let schema = ResourceSchema::new(vec![
            ResourceFieldSchema::new("a", DataType::Int),
            ResourceFieldSchema::new("b", DataType::Long),
            ResourceFieldSchema::new("c", DataType::Text),
            ResourceFieldSchema::new("d", DataType::Double),
            ResourceFieldSchema::new("e", DataType::Bytes),
        ])
        .unwrap();
        let arrow_schema = schema.to_arrow_schema().unwrap();
        let types: Vec<_> = arrow_schema
            .fields()
            .iter()
            .map(|f| f.data_type().clone())
            .collect();
        assert_eq!(
            types,
            vec![
                ArrowDataType::Int32,
                ArrowDataType::Int64,
                ArrowDataType::Utf8,
                ArrowDataType::Float64,
                ArrowDataType::Binary
            ]
        );
        assert!(arrow_schema.fields().iter().all(|f| f.is_nullable()));
    }

    #[test]
    fn maps_nested_types() {
        let element = ResourceSchema::new(vec![ResourceFieldSchema::new("x", DataType::Int)])
            .unwrap();
        let bag_schema = ResourceSchema::new(vec![
            ResourceFieldSchema::new("t", DataType::Tuple).with_schema(element.clone())
        ])
        .unwrap();
        let mut unnamed = ResourceFieldSchema::new("", DataType::Tuple).with_schema(element);
        unnamed.set_name(None);
        let schema = ResourceSchema::new(vec![
            ResourceFieldSchema::new("b", DataType::Bag).with_schema(bag_schema),
            unnamed,
        ])
        .unwrap();

        let arrow_schema = schema.to_arrow_schema().unwrap();
        let x = Fields::from(vec![Field::new("x", ArrowDataType::Int32, true)]);
        assert_eq!(
            arrow_schema.field(0).data_type(),
            &ArrowDataType::List(Arc::new(Field::new_struct("item", x.clone(), true)))
        );
        assert_eq!(arrow_schema.field(1).name(), "_1");
        assert_eq!(arrow_schema.field(1).data_type(), &ArrowDataType::Struct(x));
    }

    #[test]
    fn map_is_not_supported() {
        let schema =
            ResourceSchema::new(vec![ResourceFieldSchema::new("m", DataType::Map)]).unwrap();
        assert!(schema.to_arrow_schema().unwrap_err().is_schema());
    }
}
