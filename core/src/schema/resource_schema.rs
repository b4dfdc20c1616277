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
use crate::schema::logical::{LogicalFieldSchema, LogicalSchema};
use quill_types::{DataType, Datum, Tuple, Utf8StorageConverter};
use std::fmt::{self, Display, Formatter, Write};

const GENERATED_DESCRIPTION: &str = "autogenerated from logical schema";

/// Sort direction of a sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// Schema of a dataset: an ordered list of fields plus optional sort keys.
///
/// # Aliasing contract
///
/// Getters hand out borrowed views of the live internal storage, and
/// [`ResourceSchema::fields_mut`] / [`ResourceSchema::sort_key_orders_mut`] allow
/// in-place updates without copying. Those views cannot change the number of
/// fields or sort keys, so they cannot break the sort-key invariant.
///
/// Setters ([`ResourceSchema::set_fields`], [`ResourceSchema::set_sort_keys`])
/// always copy their argument. The schema never shares storage with a slice owned
/// by the caller, and mutating the caller's slice afterwards has no effect on the
/// schema.
///
/// `sort_keys` and `sort_key_orders` always have the same length and every sort
/// key is a valid offset into `fields`.
#[derive(Debug, Clone, Default)]
pub struct ResourceSchema {
    /// Layout version, bumped by writers whose output format changes. Starts at 0.
    version: i32,
    fields: Vec<ResourceFieldSchema>,
    sort_keys: Vec<usize>,
    sort_key_orders: Vec<Order>,
}

/// A single field of a [`ResourceSchema`].
///
/// Tuple and bag fields own their nested schema. The nested schema of a bag holds
/// exactly one tuple field describing the shape of its elements (or nothing at all
/// when the layout is unknown).
#[derive(Debug, Clone, Default)]
pub struct ResourceFieldSchema {
    name: Option<String>,
    data_type: DataType,
    description: Option<String>,
    schema: Option<ResourceSchema>,
}

impl ResourceFieldSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: Some(name.into()),
            data_type,
            description: None,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: ResourceSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) -> &mut Self {
        self.name = name;
        self
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn set_data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = data_type;
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) -> &mut Self {
        self.description = description;
        self
    }

    pub fn schema(&self) -> Option<&ResourceSchema> {
        self.schema.as_ref()
    }

    pub fn schema_mut(&mut self) -> Option<&mut ResourceSchema> {
        self.schema.as_mut()
    }

    pub fn set_schema(&mut self, schema: Option<ResourceSchema>) -> &mut Self {
        self.schema = schema;
        self
    }

    /// Checks the nesting rules recursively.
    pub fn validate(&self) -> QuillResult<()> {
        match (&self.schema, self.data_type) {
            (Some(schema), DataType::Bag) => {
                if !schema.is_empty() {
                    check_bag_element(
                        self.name(),
                        schema.fields.len(),
                        schema.fields.first().map(|f| f.data_type),
                    )?;
                }
                schema.validate()
            }
            (Some(schema), DataType::Tuple) => schema.validate(),
            (Some(_), other) => Err(QuillError::Schema(format!(
                "Field '{}' of type {other} cannot have a nested schema",
                self.name().unwrap_or_default()
            ))),
            (None, _) => Ok(()),
        }
    }
}

fn check_bag_element(
    name: Option<&str>,
    num_fields: usize,
    first_type: Option<DataType>,
) -> QuillResult<()> {
    if num_fields != 1 || first_type != Some(DataType::Tuple) {
        return Err(QuillError::Schema(format!(
            "Invalid schema for bag '{}': bag schema must have tuple as its only field, found {} field(s)",
            name.unwrap_or_default(),
            num_fields
        )));
    }
    Ok(())
}

impl TryFrom<&LogicalFieldSchema> for ResourceFieldSchema {
    type Error = QuillError;

    fn try_from(field: &LogicalFieldSchema) -> QuillResult<Self> {
        if field.data_type == DataType::Bag {
            if let Some(nested) = &field.schema {
                check_bag_element(
                    field.alias.as_deref(),
                    nested.fields.len(),
                    nested.fields.first().map(|f| f.data_type),
                )?;
            }
        }
        // Partial schemas are accepted: a missing nested schema becomes an empty one.
        let schema = if field.data_type.is_nested() {
            Some(match &field.schema {
                Some(nested) => ResourceSchema::try_from(nested)?,
                None => ResourceSchema::default(),
            })
        } else {
            None
        };
        Ok(Self {
            name: field.alias.clone(),
            data_type: field.data_type,
            description: Some(GENERATED_DESCRIPTION.to_string()),
            schema,
        })
    }
}

impl TryFrom<&LogicalSchema> for ResourceSchema {
    type Error = QuillError;

    fn try_from(schema: &LogicalSchema) -> QuillResult<Self> {
        let fields = schema
            .fields
            .iter()
            .map(ResourceFieldSchema::try_from)
            .collect::<QuillResult<Vec<_>>>()?;
        Ok(Self {
            fields,
            ..Self::default()
        })
    }
}

impl ResourceSchema {
    pub fn new(fields: Vec<ResourceFieldSchema>) -> QuillResult<Self> {
        let schema = Self {
            fields,
            ..Self::default()
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn set_version(&mut self, version: i32) -> &mut Self {
        self.version = version;
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[ResourceFieldSchema] {
        &self.fields
    }

    /// In-place access to the fields, see the aliasing contract on the type.
    pub fn fields_mut(&mut self) -> &mut [ResourceFieldSchema] {
        &mut self.fields
    }

    pub fn field(&self, index: usize) -> Option<&ResourceFieldSchema> {
        self.fields.get(index)
    }

    pub fn field_names(&self) -> Vec<Option<&str>> {
        self.fields.iter().map(ResourceFieldSchema::name).collect()
    }

    /// Replaces the fields with a copy of `fields`.
    ///
    /// Fails when an existing sort key would no longer reference a field, or when a
    /// field breaks the nesting rules.
    pub fn set_fields(&mut self, fields: &[ResourceFieldSchema]) -> QuillResult<&mut Self> {
        if let Some(key) = self.sort_keys.iter().find(|k| **k >= fields.len()) {
            return Err(QuillError::Schema(format!(
                "Sort key {key} is out of range for a schema with {} field(s)",
                fields.len()
            )));
        }
        for field in fields {
            field.validate()?;
        }
        self.fields = fields.to_vec();
        Ok(self)
    }

    pub fn sort_keys(&self) -> &[usize] {
        &self.sort_keys
    }

    pub fn sort_key_orders(&self) -> &[Order] {
        &self.sort_key_orders
    }

    /// In-place access to the sort orders, see the aliasing contract on the type.
    pub fn sort_key_orders_mut(&mut self) -> &mut [Order] {
        &mut self.sort_key_orders
    }

    /// Replaces the sort keys and their orders with copies of the arguments.
    pub fn set_sort_keys(&mut self, keys: &[usize], orders: &[Order]) -> QuillResult<&mut Self> {
        if keys.len() != orders.len() {
            return Err(QuillError::Schema(format!(
                "Got {} sort key(s) but {} sort order(s)",
                keys.len(),
                orders.len()
            )));
        }
        if let Some(key) = keys.iter().find(|k| **k >= self.fields.len()) {
            return Err(QuillError::Schema(format!(
                "Sort key {key} is out of range for a schema with {} field(s)",
                self.fields.len()
            )));
        }
        self.sort_keys = keys.to_vec();
        self.sort_key_orders = orders.to_vec();
        Ok(self)
    }

    pub fn validate(&self) -> QuillResult<()> {
        self.fields.iter().try_for_each(ResourceFieldSchema::validate)
    }

    /// Converts a row of raw fields into typed values following this schema.
    ///
    /// Numeric fields that cannot be interpreted become null (and are reported to
    /// the converter's warning sink); a malformed composite field fails the whole
    /// row. Raw fields beyond the schema are kept as bytes, missing ones are null.
    pub fn coerce_row(
        &self,
        converter: &mut Utf8StorageConverter,
        raw: &[Option<&[u8]>],
    ) -> QuillResult<Tuple> {
        let width = raw.len().max(self.fields.len());
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            let bytes = raw.get(i).copied().flatten();
            let datum = match self.fields.get(i) {
                Some(field) => converter.bytes_to(bytes, field.data_type)?,
                None => Datum::from(bytes.map(<[u8]>::to_vec)),
            };
            values.push(datum);
        }
        Ok(Tuple::new(values))
    }
}

impl PartialEq for ResourceFieldSchema {
    fn eq(&self, other: &Self) -> bool {
        // description is diagnostic only
        self.name == other.name && self.data_type == other.data_type && self.schema == other.schema
    }
}

impl Eq for ResourceFieldSchema {}

impl PartialEq for ResourceSchema {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.sort_keys == other.sort_keys
            && self.sort_key_orders == other.sort_key_orders
            && self.fields == other.fields
    }
}

impl Eq for ResourceSchema {}

fn write_schema(
    f: &mut Formatter<'_>,
    schema: Option<&ResourceSchema>,
    data_type: DataType,
) -> fmt::Result {
    let (open, close) = match data_type {
        DataType::Bag => ('{', '}'),
        DataType::Tuple => ('(', ')'),
        _ => ('<', '>'),
    };
    f.write_char(open)?;
    if let Some(schema) = schema {
        for (i, field) in schema.fields.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            Display::fmt(field, f)?;
        }
    }
    f.write_char(close)
}

impl Display for ResourceFieldSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name().unwrap_or_default())?;
        if self.data_type.is_nested() {
            write_schema(f, self.schema.as_ref(), self.data_type)
        } else {
            write!(f, "{}", self.data_type)
        }
    }
}

impl Display for ResourceSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_schema(f, Some(self), DataType::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_types::{CollectingWarningSink, WarningSink};
    use std::sync::Arc;

    fn logical_bag(alias: &str, element: LogicalSchema) -> LogicalFieldSchema {
        LogicalFieldSchema::nested(
            alias,
            DataType::Bag,
            LogicalSchema::new(vec![LogicalFieldSchema::anonymous(
                DataType::Tuple,
                Some(element),
            )]),
        )
    }

    fn sample_logical() -> LogicalSchema {
        LogicalSchema::new(vec![
            LogicalFieldSchema::new("id", DataType::Long),
            LogicalFieldSchema::new("name", DataType::Text),
            logical_bag(
                "scores",
                LogicalSchema::new(vec![
                    LogicalFieldSchema::new("subject", DataType::Text),
                    LogicalFieldSchema::new("score", DataType::Double),
                ]),
            ),
            LogicalFieldSchema::nested(
                "address",
                DataType::Tuple,
                LogicalSchema::new(vec![LogicalFieldSchema::new("zip", DataType::Int)]),
            ),
            LogicalFieldSchema::new("attrs", DataType::Map),
        ])
    }

    #[test]
    fn builds_from_logical_schema() {
        let schema = ResourceSchema::try_from(&sample_logical()).unwrap();
        assert_eq!(schema.len(), 5);
        assert_eq!(
            schema.field_names(),
            vec![
                Some("id"),
                Some("name"),
                Some("scores"),
                Some("address"),
                Some("attrs")
            ]
        );
        let scores = schema.field(2).unwrap().schema().unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores.field(0).unwrap().data_type(), DataType::Tuple);
        assert!(schema.field(4).unwrap().schema().is_none());
        assert!(schema.field(0).unwrap().schema().is_none());
    }

    #[test]
    fn bag_with_two_fields_is_rejected() {
        let logical = LogicalSchema::new(vec![LogicalFieldSchema::nested(
            "b",
            DataType::Bag,
            LogicalSchema::new(vec![
                LogicalFieldSchema::new("x", DataType::Int),
                LogicalFieldSchema::new("y", DataType::Int),
            ]),
        )]);
        let err = ResourceSchema::try_from(&logical).unwrap_err();
        assert!(err.is_schema(), "{err}");
    }

    #[test]
    fn bag_of_non_tuple_is_rejected() {
        let logical = LogicalSchema::new(vec![LogicalFieldSchema::nested(
            "b",
            DataType::Bag,
            LogicalSchema::new(vec![LogicalFieldSchema::new("x", DataType::Int)]),
        )]);
        assert!(ResourceSchema::try_from(&logical).unwrap_err().is_schema());
    }

    #[test]
    fn partial_nested_schema_becomes_empty() {
        let logical = LogicalSchema::new(vec![
            LogicalFieldSchema::anonymous(DataType::Bag, None),
            LogicalFieldSchema::anonymous(DataType::Tuple, None),
        ]);
        let schema = ResourceSchema::try_from(&logical).unwrap();
        assert!(schema.field(0).unwrap().schema().unwrap().is_empty());
        assert!(schema.field(1).unwrap().schema().unwrap().is_empty());
        assert_eq!(schema.to_string(), "<:{},:()>");
    }

    #[test]
    fn stringify() {
        let schema = ResourceSchema::try_from(&sample_logical()).unwrap();
        assert_eq!(
            schema.to_string(),
            "<id:long,name:chararray,scores:{:(subject:chararray,score:double)},address:(zip:int),attrs:map>"
        );
    }

    #[test]
    fn equality_is_structural() {
        let a = ResourceSchema::try_from(&sample_logical()).unwrap();
        let mut b = ResourceSchema::try_from(&sample_logical()).unwrap();
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);

        b.fields_mut()[0].set_description(Some("something else".to_string()));
        assert_eq!(a, b);

        b.fields_mut()[3]
            .schema_mut()
            .unwrap()
            .fields_mut()[0]
            .set_data_type(DataType::Long);
        assert_ne!(a, b);
    }

    #[test]
    fn equality_includes_sort_keys() {
        let a = ResourceSchema::try_from(&sample_logical()).unwrap();
        let mut b = a.clone();
        b.set_sort_keys(&[0], &[Order::Ascending]).unwrap();
        assert_ne!(a, b);
        let mut c = b.clone();
        c.sort_key_orders_mut()[0] = Order::Descending;
        assert_ne!(b, c);
    }

    #[test]
    fn equality_includes_version() {
        let a = ResourceSchema::try_from(&sample_logical()).unwrap();
        assert_eq!(a.version(), 0);
        let mut b = a.clone();
        b.set_version(2);
        assert_eq!(b.version(), 2);
        assert_ne!(a, b);
        b.set_version(0);
        assert_eq!(a, b);
    }

    #[test]
    fn setters_copy_their_argument() {
        let mut schema = ResourceSchema::default();
        let mut fields = vec![
            ResourceFieldSchema::new("a", DataType::Int),
            ResourceFieldSchema::new("b", DataType::Text),
        ];
        schema.set_fields(&fields).unwrap();
        fields[0].set_name(Some("changed".to_string()));
        fields.push(ResourceFieldSchema::new("c", DataType::Int));
        assert_eq!(schema.fields()[0].name(), Some("a"));
        assert_eq!(schema.len(), 2);

        let mut keys = vec![1];
        schema.set_sort_keys(&keys, &[Order::Descending]).unwrap();
        keys[0] = 0;
        assert_eq!(schema.sort_keys(), &[1]);
    }

    #[test]
    fn sort_key_invariants() {
        let mut schema = ResourceSchema::new(vec![ResourceFieldSchema::new("a", DataType::Int)])
            .unwrap();
        assert!(schema
            .set_sort_keys(&[0, 0], &[Order::Ascending])
            .unwrap_err()
            .is_schema());
        assert!(schema
            .set_sort_keys(&[1], &[Order::Ascending])
            .unwrap_err()
            .is_schema());
        schema.set_sort_keys(&[0], &[Order::Ascending]).unwrap();
        // Shrinking the fields would leave the sort key dangling
        assert!(schema.set_fields(&[]).unwrap_err().is_schema());
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn nested_schema_on_atomic_field_is_invalid() {
        let field = ResourceFieldSchema::new("a", DataType::Int).with_schema(ResourceSchema::default());
        assert!(ResourceSchema::new(vec![field]).unwrap_err().is_schema());
    }

    #[test]
    fn coerce_row_follows_schema() {
        let schema = ResourceSchema::try_from(&sample_logical()).unwrap();
        let sink = Arc::new(CollectingWarningSink::new());
        let mut converter =
            Utf8StorageConverter::new(Arc::clone(&sink) as Arc<dyn WarningSink>);
        let raw = vec![
            Some("12".as_bytes()),
            Some("ada".as_bytes()),
            Some("{(math,9.5)}".as_bytes()),
            None,
            Some("[k#v]".as_bytes()),
            Some("extra".as_bytes()),
        ];
        let row = schema.coerce_row(&mut converter, &raw).unwrap();
        assert_eq!(row.len(), 6);
        assert_eq!(row.get(0), Some(&Datum::Long(12)));
        assert_eq!(row.get(1), Some(&Datum::Text("ada".to_string())));
        assert_eq!(row.get(2).unwrap().as_bag().unwrap().len(), 1);
        assert_eq!(row.get(3), Some(&Datum::Null));
        assert_eq!(row.get(5), Some(&Datum::Bytes(b"extra".to_vec())));
        assert!(sink.is_empty());

        let bad_number = vec![Some("twelve".as_bytes())];
        let row = schema.coerce_row(&mut converter, &bad_number).unwrap();
        assert_eq!(row.get(0), Some(&Datum::Null));
        assert_eq!(sink.len(), 1);

        let bad_bag = vec![None, None, Some("{(math,9.5)".as_bytes())];
        assert!(matches!(
            schema.coerce_row(&mut converter, &bad_bag),
            Err(QuillError::IO { .. })
        ));
    }
}
