//! Typed access to table literals and properties.

use serde_json::Value;

use super::{BinaryProperty, HeaderValue, PropertyValue, TableData, TableHeader};
use crate::util::{DVec3, Error, Result, Vec3};

/// Accessors shared by feature and batch tables.
pub trait TableAccess {
    fn table_header(&self) -> &TableHeader;
    fn table_header_mut(&mut self) -> &mut TableHeader;
    fn table_data(&self) -> &TableData;
    fn table_data_mut(&mut self) -> &mut TableData;

    /// Literal JSON value of a header entry.
    fn literal(&self, name: &str) -> Option<&Value> {
        match self.table_header().get(name) {
            Some(HeaderValue::Literal(v)) => Some(v),
            _ => None,
        }
    }

    fn literal_u32(&self, name: &str) -> Result<Option<u32>> {
        let Some(value) = self.literal(name) else {
            return Ok(None);
        };
        value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| Error::schema(format!("{name} must be an unsigned 32-bit integer, got {value}")))
    }

    fn literal_bool(&self, name: &str) -> Result<Option<bool>> {
        let Some(value) = self.literal(name) else {
            return Ok(None);
        };
        value
            .as_bool()
            .map(Some)
            .ok_or_else(|| Error::schema(format!("{name} must be a boolean, got {value}")))
    }

    /// Fixed-length numeric array literal, e.g. `RTC_CENTER`.
    fn literal_f64s<const N: usize>(&self, name: &str) -> Result<Option<[f64; N]>> {
        let Some(value) = self.literal(name) else {
            return Ok(None);
        };
        let bad = || Error::schema(format!("{name} must be an array of {N} numbers, got {value}"));
        let items = value.as_array().filter(|a| a.len() == N).ok_or_else(bad)?;
        let mut out = [0.0; N];
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = item.as_f64().ok_or_else(bad)?;
        }
        Ok(Some(out))
    }

    /// Fixed-length byte array literal, e.g. `CONSTANT_RGBA`.
    fn literal_u8s<const N: usize>(&self, name: &str) -> Result<Option<[u8; N]>> {
        let Some(value) = self.literal(name) else {
            return Ok(None);
        };
        let bad = || Error::schema(format!("{name} must be an array of {N} bytes, got {value}"));
        let items = value.as_array().filter(|a| a.len() == N).ok_or_else(bad)?;
        let mut out = [0u8; N];
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = item.as_u64().and_then(|v| u8::try_from(v).ok()).ok_or_else(bad)?;
        }
        Ok(Some(out))
    }

    fn literal_dvec3(&self, name: &str) -> Result<Option<DVec3>> {
        Ok(self.literal_f64s::<3>(name)?.map(DVec3::from_array))
    }

    /// Tile-global vector stored either as a literal or as a one-element
    /// binary property.
    fn global_dvec3(&self, name: &str) -> Result<Option<DVec3>> {
        if let Some(v) = self.literal_dvec3(name)? {
            return Ok(Some(v));
        }
        Ok(self.binary(name).and_then(BinaryProperty::to_dvec3).and_then(|v| v.first().copied()))
    }

    fn literal_vec3(&self, name: &str) -> Result<Option<Vec3>> {
        Ok(self.literal_dvec3(name)?.map(|v| v.as_vec3()))
    }

    /// Set a header literal, replacing any property of the same name.
    fn set_literal(&mut self, name: &str, value: Value) {
        self.table_data_mut().remove(name);
        self.table_header_mut().insert(name.to_string(), HeaderValue::Literal(value));
    }

    /// Set a header literal when `value` is present, remove it otherwise.
    fn set_optional_literal(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(v) => self.set_literal(name, v),
            None => self.remove_property(name),
        }
    }

    fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.table_data().get(name)
    }

    fn binary(&self, name: &str) -> Option<&BinaryProperty> {
        self.property(name).and_then(PropertyValue::as_binary)
    }

    /// Set a property. Its header entry is regenerated on encode.
    fn set_property(&mut self, name: &str, value: PropertyValue) {
        self.table_header_mut().remove(name);
        self.table_data_mut().insert(name.to_string(), value);
    }

    fn set_binary(&mut self, name: &str, property: BinaryProperty) {
        self.set_property(name, PropertyValue::Binary(property));
    }

    /// Set a binary property when present, remove it otherwise.
    fn set_optional_binary(&mut self, name: &str, property: Option<BinaryProperty>) {
        match property {
            Some(p) => self.set_binary(name, p),
            None => self.remove_property(name),
        }
    }

    fn remove_property(&mut self, name: &str) {
        self.table_header_mut().remove(name);
        self.table_data_mut().remove(name);
    }
}

/// JSON array literal for a double-precision vector.
pub fn dvec3_json(v: DVec3) -> Value {
    Value::from(v.to_array().to_vec())
}
