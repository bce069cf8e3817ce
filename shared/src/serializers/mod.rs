//! JSON:API style documents for every resource type.
//!
//! A resource type is described declaratively by a [`ResourceDescriptor`];
//! one pair of functions projects records into documents and client payloads
//! back into writable attribute hashes.

pub mod host_profile;
pub mod resident_profile;
pub mod user;
pub mod validation;

use crate::error::ApiError;
use crate::types::Document;
use serde_json::{json, Map, Value};

/// How a resource names its attributes internally. Public names are always
/// camelCase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    /// `given_name`, as the identity provider stores user attributes.
    Snake,
    /// `profilePic`, as the profile tables store them.
    Camel,
}

impl KeyStyle {
    pub fn to_public(self, internal: &str) -> String {
        match self {
            KeyStyle::Snake => camel_case(internal),
            KeyStyle::Camel => internal.to_string(),
        }
    }

    pub fn to_internal(self, public: &str) -> String {
        match self {
            KeyStyle::Snake => snake_case(public),
            KeyStyle::Camel => camel_case(public),
        }
    }
}

pub struct ResourceDescriptor {
    /// JSON:API `type`.
    pub type_name: &'static str,
    /// Internal attribute holding the resource id.
    pub id_field: &'static str,
    /// Internal names of the attributes that may be read, in output order.
    pub attributes: &'static [&'static str],
    /// Allow-listed attributes clients may never write.
    pub read_only: &'static [&'static str],
    pub key_style: KeyStyle,
    /// Applied to a record before projection.
    pub transform: fn(Document) -> Document,
}

impl ResourceDescriptor {
    pub fn is_writable(&self, internal: &str) -> bool {
        internal != self.id_field
            && self.attributes.contains(&internal)
            && !self.read_only.contains(&internal)
    }
}

/// Records embedded under a relationship.
pub enum Related {
    One(Option<Document>),
    Many(Vec<Document>),
}

pub struct Relationship {
    pub name: &'static str,
    pub descriptor: &'static ResourceDescriptor,
    pub related: Related,
}

/// A record and whatever it embeds.
pub struct Resource {
    pub attributes: Document,
    pub relationships: Vec<Relationship>,
}

impl Resource {
    pub fn new(attributes: Document) -> Self {
        Self {
            attributes,
            relationships: Vec::new(),
        }
    }

    pub fn with(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }
}

/// `{ data: {...}, included: [...] }`
pub fn serialize_one(descriptor: &ResourceDescriptor, resource: Resource) -> Value {
    let mut included = Vec::new();
    let data = resource_object(descriptor, resource, &mut included);
    document(data, included)
}

/// `{ data: [...], included: [...] }`
pub fn serialize_many(descriptor: &ResourceDescriptor, resources: Vec<Resource>) -> Value {
    let mut included = Vec::new();
    let data = resources
        .into_iter()
        .map(|resource| resource_object(descriptor, resource, &mut included))
        .collect();
    document(Value::Array(data), included)
}

/// Extracts the writable attributes of a client payload. The resource id,
/// read-only keys and anything not allow-listed are dropped silently.
pub fn deserialize(descriptor: &ResourceDescriptor, payload: &Value) -> Result<Document, ApiError> {
    let data = payload
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| ApiError::BadRequest("Request body must contain a data object".into()))?;

    let attributes = match data.get("attributes") {
        None | Some(Value::Null) => return Ok(Document::new()),
        Some(Value::Object(attributes)) => attributes,
        Some(_) => {
            return Err(ApiError::BadRequest(
                "data.attributes must be an object".into(),
            ))
        }
    };

    Ok(attributes
        .iter()
        .map(|(key, value)| (descriptor.key_style.to_internal(key), value))
        .filter(|(key, _)| descriptor.is_writable(key))
        .map(|(key, value)| (key, value.clone()))
        .collect())
}

/// [`deserialize`] straight from a request body.
pub fn deserialize_body(descriptor: &ResourceDescriptor, body: &[u8]) -> Result<Document, ApiError> {
    let payload: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    deserialize(descriptor, &payload)
}

fn document(data: Value, included: Vec<Value>) -> Value {
    let mut doc = Map::new();
    doc.insert("data".to_string(), data);
    if !included.is_empty() {
        doc.insert("included".to_string(), Value::Array(included));
    }
    Value::Object(doc)
}

fn resource_object(
    descriptor: &ResourceDescriptor,
    resource: Resource,
    included: &mut Vec<Value>,
) -> Value {
    let (mut object, _) = project(descriptor, resource.attributes);

    let mut relationships = Map::new();
    for relationship in resource.relationships {
        let related = relationship.descriptor;
        let linkage = match relationship.related {
            Related::One(Some(record)) => {
                let (object, identifier) = project(related, record);
                include(included, object);
                identifier
            }
            Related::Many(records) if !records.is_empty() => Value::Array(
                records
                    .into_iter()
                    .map(|record| {
                        let (object, identifier) = project(related, record);
                        include(included, object);
                        identifier
                    })
                    .collect(),
            ),
            Related::One(None) | Related::Many(_) => continue,
        };
        relationships.insert(relationship.name.to_string(), json!({ "data": linkage }));
    }

    if !relationships.is_empty() {
        object.insert("relationships".to_string(), Value::Object(relationships));
    }
    Value::Object(object)
}

/// Transforms and projects one record. Returns the resource object and its
/// `{type, id}` identifier.
fn project(descriptor: &ResourceDescriptor, record: Document) -> (Map<String, Value>, Value) {
    let record = (descriptor.transform)(record);
    let id = match record.get(descriptor.id_field) {
        Some(Value::String(id)) => Value::String(id.clone()),
        Some(Value::Number(n)) => Value::String(n.to_string()),
        _ => Value::Null,
    };

    let attributes: Map<String, Value> = descriptor
        .attributes
        .iter()
        .filter_map(|name| {
            record
                .get(*name)
                .map(|value| (descriptor.key_style.to_public(name), value.clone()))
        })
        .collect();

    let identifier = json!({ "type": descriptor.type_name, "id": id });
    let mut object = Map::new();
    object.insert("type".to_string(), json!(descriptor.type_name));
    object.insert("id".to_string(), id);
    object.insert("attributes".to_string(), Value::Object(attributes));
    (object, identifier)
}

fn include(included: &mut Vec<Value>, object: Map<String, Value>) {
    let duplicate = included
        .iter()
        .any(|existing| existing["type"] == object["type"] && existing["id"] == object["id"]);
    if !duplicate {
        included.push(Value::Object(object));
    }
}

pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for (i, c) in name.chars().enumerate() {
        if c == '_' || c == '-' {
            upper = i > 0;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else if i == 0 {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}
