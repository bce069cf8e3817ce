use super::{KeyStyle, ResourceDescriptor};
use crate::types::Document;
use serde_json::Value;

pub static HOST_PROFILE: ResourceDescriptor = ResourceDescriptor {
    type_name: "host-profiles",
    id_field: "host",
    attributes: &[
        "host",
        "visible",
        "profilePic",
        "profileName",
        "greeting",
        "age",
        "gender",
        "occupation",
        "languages",
        "adultCount",
        "kidCount",
        "petCount",
        "petBreed",
        "freeTime",
        "favoriteFood",
        "mySubstances",
        "neighborhood",
        "address",
        "lightRailStation",
        "busses",
        "neighborhoodFeatures",
        "neighborhoodDescription",
        "backyardActivities",
        "backyardDescription",
        "photo1",
        "photo2",
        "photo3",
        "photo4",
        "relationship",
        "question",
        "additionalNote",
    ],
    read_only: &["host"],
    key_style: KeyStyle::Camel,
    transform,
};

/// `visible` may have been stored as a number or string; clients always get a
/// boolean.
fn transform(mut record: Document) -> Document {
    if let Some(visible) = record.get("visible").map(truthy) {
        record.insert("visible".to_string(), Value::Bool(visible));
    }
    record
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
