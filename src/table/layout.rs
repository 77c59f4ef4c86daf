//! Binary body layout for table encoding.
//!
//! Properties are appended in call order, each aligned to its component
//! width, and the header entry of each is rewritten to point at its new
//! offset. The finished JSON is space-padded to end on an 8-byte boundary
//! relative to the start of the tile, and the binary body is zero-padded
//! to a multiple of 8 bytes.

use std::marker::PhantomData;

use byteorder::ByteOrder;
use serde_json::Value;

use super::{header_to_json, BinaryBodyReference, BinaryProperty, HeaderValue, TableHeader};
use crate::util::{
    calc_padding, pad_to, to_u32, Result, BINARY_PADDING, JSON_PADDING, SECTION_ALIGNMENT,
};

/// Serialized table sections plus the header they were produced from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EncodedTable {
    /// Header with every reference rewritten to its written offset.
    pub header: TableHeader,
    /// Padded JSON header bytes.
    pub json: Vec<u8>,
    /// Padded binary body bytes.
    pub binary: Vec<u8>,
}

impl EncodedTable {
    /// Total bytes of both sections.
    #[inline]
    pub fn len(&self) -> usize {
        self.json.len() + self.binary.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which type fields a written reference carries.
///
/// Readers fill omitted fields from the property's implied types, so a
/// field may only be dropped when the value matches that implied type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReferenceForm {
    /// `{byteOffset, componentType, type}`.
    #[default]
    Full,
    /// `{byteOffset, type}`.
    NoComponent,
    /// `{byteOffset, componentType}`.
    NoContainer,
    /// `{byteOffset}`.
    OffsetOnly,
}

impl ReferenceForm {
    /// Form with exactly the fields `declared` carried.
    pub fn of(declared: &BinaryBodyReference) -> Self {
        match (declared.component_type, declared.container_type) {
            (Some(_), Some(_)) => Self::Full,
            (None, Some(_)) => Self::NoComponent,
            (Some(_), None) => Self::NoContainer,
            (None, None) => Self::OffsetOnly,
        }
    }

    fn omits_component(self) -> bool {
        matches!(self, Self::NoComponent | Self::OffsetOnly)
    }

    fn omits_container(self) -> bool {
        matches!(self, Self::NoContainer | Self::OffsetOnly)
    }
}

/// Accumulates header entries and binary body bytes.
#[derive(Debug)]
pub struct BinaryBodyBuilder<B: ByteOrder> {
    header: TableHeader,
    body: Vec<u8>,
    _order: PhantomData<B>,
}

impl<B: ByteOrder> Default for BinaryBodyBuilder<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ByteOrder> BinaryBodyBuilder<B> {
    pub fn new() -> Self {
        Self {
            header: TableHeader::new(),
            body: Vec::new(),
            _order: PhantomData,
        }
    }

    /// Current size of the binary body.
    #[inline]
    pub fn offset(&self) -> usize {
        self.body.len()
    }

    /// Record a JSON literal.
    pub fn add_literal(&mut self, name: &str, value: Value) {
        self.header.insert(name.to_string(), HeaderValue::Literal(value));
    }

    /// Append a property to the binary body and record its reference.
    pub fn add_property(&mut self, name: &str, property: &BinaryProperty) -> Result<()> {
        self.add_property_as(name, property, ReferenceForm::Full)
    }

    /// Append a property, writing its reference in the given `form`.
    pub fn add_property_as(&mut self, name: &str, property: &BinaryProperty, form: ReferenceForm) -> Result<()> {
        let width = property.component_type().num_bytes();
        let padding = calc_padding(self.body.len(), width);
        self.body.resize(self.body.len() + padding, BINARY_PADDING);

        let byte_offset = to_u32(self.body.len(), "binary body")?;
        tracing::trace!(property = name, byte_offset, data_type = %property.data_type(), "layout");
        let reference = BinaryBodyReference::new(
            byte_offset,
            (!form.omits_component()).then(|| property.component_type()),
            (!form.omits_container()).then_some(property.container),
        );
        self.header.insert(name.to_string(), HeaderValue::Reference(reference));
        property.values.write::<B>(&mut self.body);
        Ok(())
    }

    /// Serialize the header and pad both sections.
    ///
    /// `start_offset` is the tile-relative position of the JSON header. An
    /// empty table produces no bytes at all.
    pub fn finish(self, start_offset: usize) -> Result<EncodedTable> {
        if self.header.is_empty() {
            return Ok(EncodedTable::default());
        }
        self.finish_object(start_offset)
    }

    /// Like [`finish`](Self::finish), but an empty table is still written as
    /// a padded `{}`, so the section ends 8-byte aligned after any header.
    pub fn finish_object(mut self, start_offset: usize) -> Result<EncodedTable> {
        let mut json = serde_json::to_vec(&header_to_json(&self.header))?;
        pad_to(&mut json, start_offset, SECTION_ALIGNMENT, JSON_PADDING);
        pad_to(&mut self.body, 0, SECTION_ALIGNMENT, BINARY_PADDING);
        Ok(EncodedTable {
            header: self.header,
            json,
            binary: self.body,
        })
    }
}
