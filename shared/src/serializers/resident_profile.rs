use super::{KeyStyle, ResourceDescriptor};
use crate::types::{Document, ProfileKey};
use serde_json::Value;

const ID_SEPARATOR: char = ':';

pub static RESIDENT_PROFILE: ResourceDescriptor = ResourceDescriptor {
    type_name: "resident-profiles",
    id_field: "id",
    attributes: &[
        "creationTime",
        "caseworker",
        "matchedHost",
        "profilePic",
        "firstName",
        "lastName",
        "email",
        "phoneNumber",
        "age",
        "gender",
        "occupation",
        "languages",
        "kidCount",
        "petCount",
        "petBreed",
        "freeTime",
        "favoriteFood",
        "funFact",
        "hostSubstances",
        "neighborhoods",
        "lightRail",
        "busses",
        "neighborhoodFeatures",
        "relationship",
        "question",
        "additionalNote",
    ],
    read_only: &["creationTime", "caseworker"],
    key_style: KeyStyle::Camel,
    transform,
};

/// Exposes the composite key as `"{caseworker}:{id}"`.
fn transform(mut record: Document) -> Document {
    let caseworker = record.get("caseworker").and_then(Value::as_str);
    let id = record.get("id").and_then(Value::as_str);
    if let (Some(caseworker), Some(id)) = (caseworker, id) {
        let compound = format!("{}{}{}", caseworker, ID_SEPARATOR, id);
        record.insert("id".to_string(), Value::String(compound));
    }
    record
}

/// Resolves a client supplied id within the caller's own profiles. Accepts the
/// compound form and the bare per-caseworker id; a compound id naming another
/// caseworker resolves to nothing.
pub fn resident_key(caseworker: &str, raw_id: &str) -> Option<ProfileKey> {
    let id = match raw_id.split_once(ID_SEPARATOR) {
        Some((owner, id)) if owner == caseworker => id,
        Some(_) => return None,
        None => raw_id,
    };
    (!id.is_empty()).then(|| ProfileKey::Resident {
        caseworker: caseworker.to_string(),
        id: id.to_string(),
    })
}
