//! Typed view of the `3DTILES_batch_table_hierarchy` extension.
//!
//! The extension travels through decode and encode as an opaque JSON literal
//! under the batch table's `extensions` key; this module only interprets it
//! on request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::util::{Error, Result};

pub const EXTENSIONS: &str = "extensions";
pub const BATCH_TABLE_HIERARCHY: &str = "3DTILES_batch_table_hierarchy";

/// One class of the hierarchy: a name, an instance count and per-instance
/// properties (arrays, or binary references into the batch table body).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyClass {
    pub name: String,
    pub length: u32,
    #[serde(default)]
    pub instances: Map<String, Value>,
}

/// Class and parent links for every instance in a tile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTableHierarchy {
    pub classes: Vec<HierarchyClass>,
    pub instances_length: u32,
    pub class_ids: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_counts: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ids: Option<Vec<u32>>,
}

impl BatchTableHierarchy {
    /// Parse from the extension JSON object.
    pub fn from_json(value: &Value) -> Result<Self> {
        Self::deserialize(value)
            .map_err(|e| Error::schema(format!("{BATCH_TABLE_HIERARCHY}: {e}")))
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Class of `instance`.
    pub fn class_of(&self, instance: usize) -> Option<&HierarchyClass> {
        let class_id = *self.class_ids.get(instance)? as usize;
        self.classes.get(class_id)
    }

    /// Index of `instance` among the instances of its class.
    pub fn index_in_class(&self, instance: usize) -> Option<usize> {
        let class_id = *self.class_ids.get(instance)?;
        Some(self.class_ids[..instance].iter().filter(|&&c| c == class_id).count())
    }

    /// Direct parents of `instance`.
    ///
    /// Without `parentCounts` every instance has at most one parent; an
    /// instance listed as its own parent is a root.
    pub fn parents_of(&self, instance: usize) -> Vec<u32> {
        let Some(parent_ids) = &self.parent_ids else {
            return Vec::new();
        };
        match &self.parent_counts {
            Some(counts) => {
                let Some(&count) = counts.get(instance) else {
                    return Vec::new();
                };
                let start: usize = counts[..instance].iter().map(|&c| c as usize).sum();
                parent_ids
                    .iter()
                    .skip(start)
                    .take(count as usize)
                    .copied()
                    .filter(|&p| p as usize != instance)
                    .collect()
            }
            None => parent_ids
                .get(instance)
                .copied()
                .filter(|&p| p as usize != instance)
                .into_iter()
                .collect(),
        }
    }

    /// Check that class ids and parent ids point at existing entries.
    pub fn validate(&self) -> Result<()> {
        let instances = self.instances_length as usize;
        if self.class_ids.len() != instances {
            return Err(Error::schema(format!(
                "classIds holds {} entries, instancesLength is {instances}",
                self.class_ids.len()
            )));
        }
        if let Some(bad) = self.class_ids.iter().find(|&&c| c as usize >= self.classes.len()) {
            return Err(Error::schema(format!("classId {bad} has no class")));
        }
        if let Some(parents) = &self.parent_ids {
            if let Some(bad) = parents.iter().find(|&&p| p as usize >= instances) {
                return Err(Error::schema(format!("parentId {bad} is not an instance")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> BatchTableHierarchy {
        BatchTableHierarchy::from_json(&json!({
            "classes": [
                {"name": "Wall", "length": 2, "instances": {"color": ["white", "red"]}},
                {"name": "Building", "length": 1, "instances": {"name": ["unit29"]}}
            ],
            "instancesLength": 3,
            "classIds": [0, 0, 1],
            "parentIds": [2, 2, 2]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_and_lookup() {
        let h = sample();
        h.validate().unwrap();
        assert_eq!(h.class_of(1).unwrap().name, "Wall");
        assert_eq!(h.class_of(2).unwrap().name, "Building");
        assert_eq!(h.index_in_class(1), Some(1));
        assert_eq!(h.parents_of(0), vec![2]);
        assert!(h.parents_of(2).is_empty());
    }

    #[test]
    fn test_parent_counts() {
        let mut h = sample();
        h.parent_counts = Some(vec![1, 1, 0]);
        assert_eq!(h.parents_of(1), vec![2]);
        assert!(h.parents_of(2).is_empty());
    }

    #[test]
    fn test_json_shape() {
        let v = sample().to_json().unwrap();
        assert_eq!(v["instancesLength"], json!(3));
        assert_eq!(v["classIds"], json!([0, 0, 1]));
        assert!(v.get("parentCounts").is_none());
    }

    #[test]
    fn test_validate_rejects_dangling_class() {
        let mut h = sample();
        h.class_ids[0] = 7;
        assert!(matches!(h.validate(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_reject_binary_class_ids() {
        let err = BatchTableHierarchy::from_json(&json!({
            "classes": [], "instancesLength": 0, "classIds": {"byteOffset": 0}
        }))
        .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }
}
