use serde::{Deserialize, Serialize};

/// A top-level project and its Synapse identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub synapse_id: String,
}

/// Child header returned when listing a container's folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildFolder {
    pub id: String,
    pub name: String,
}

/// An entity as stored by the platform. Fields this crate does not touch are
/// carried in `extra` so an update round-trips them unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub concrete_type: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAccess {
    pub principal_id: u64,
    pub access_type: Vec<String>,
}

/// Access control list of an entity. `id` names the entity that owns the
/// list, which differs from the queried entity when the ACL is inherited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acl {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub resource_access: Vec<ResourceAccess>,
}

impl Acl {
    #[must_use]
    pub fn entry(&self, principal_id: u64) -> Option<&ResourceAccess> {
        self.resource_access
            .iter()
            .find(|ra| ra.principal_id == principal_id)
    }

    /// Replaces the entry for `principal_id`, or appends one.
    pub fn upsert(&mut self, principal_id: u64, access_type: Vec<String>) {
        match self
            .resource_access
            .iter_mut()
            .find(|ra| ra.principal_id == principal_id)
        {
            Some(ra) => ra.access_type = access_type,
            None => self.resource_access.push(ResourceAccess {
                principal_id,
                access_type,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
}

/// A file that currently fails validation against its container's schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidFile {
    pub object_id: String,
    #[serde(default)]
    pub validation_error_message: String,
    #[serde(default)]
    pub all_validation_messages: Vec<String>,
    #[serde(default)]
    pub validated_on: String,
}

/// A row of a file view reduced to the columns the reporter needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    String,
    Integer,
    Double,
    Boolean,
    StringList,
}

impl ColumnType {
    /// Maps a JSON-schema primitive type name to a view column type.
    #[must_use]
    pub fn from_json_type(json_type: &str) -> Self {
        match json_type {
            "integer" => Self::Integer,
            "number" => Self::Double,
            "boolean" => Self::Boolean,
            "array" => Self::StringList,
            _ => Self::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wiki {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub title: String,
    pub markdown: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acl_upsert_replaces_existing_entry() {
        let mut acl = Acl {
            id: "syn1".into(),
            etag: None,
            resource_access: vec![ResourceAccess {
                principal_id: 7,
                access_type: vec!["READ".into()],
            }],
        };
        acl.upsert(7, vec!["READ".into(), "UPDATE".into()]);
        acl.upsert(8, vec!["READ".into()]);
        assert_eq!(acl.resource_access.len(), 2);
        assert_eq!(acl.entry(7).unwrap().access_type.len(), 2);
    }

    #[test]
    fn test_column_type_mapping() {
        assert_eq!(ColumnType::from_json_type("string"), ColumnType::String);
        assert_eq!(ColumnType::from_json_type("integer"), ColumnType::Integer);
        assert_eq!(ColumnType::from_json_type("number"), ColumnType::Double);
        assert_eq!(ColumnType::from_json_type("boolean"), ColumnType::Boolean);
        assert_eq!(ColumnType::from_json_type("array"), ColumnType::StringList);
        assert_eq!(ColumnType::from_json_type("object"), ColumnType::String);
        assert_eq!(ColumnType::from_json_type("mystery"), ColumnType::String);
    }

    #[test]
    fn test_entity_round_trips_unknown_fields() {
        let raw = r#"{"id":"syn1","name":"a","parentId":"syn0","etag":"e","concreteType":"org.sagebionetworks.repo.model.Folder","modifiedOn":"x"}"#;
        let entity: Entity = serde_json::from_str(raw).unwrap();
        let back = serde_json::to_value(&entity).unwrap();
        assert_eq!(back["modifiedOn"], "x");
        assert_eq!(back["parentId"], "syn0");
    }
}
