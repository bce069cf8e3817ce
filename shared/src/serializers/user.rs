use super::host_profile::HOST_PROFILE;
use super::resident_profile::RESIDENT_PROFILE;
use super::{KeyStyle, Related, Relationship, Resource, ResourceDescriptor};
use crate::attributes::{phone_for_display, to_hash};
use crate::types::{Document, Role, User};
use chrono::SecondsFormat;
use serde_json::Value;

/// Identity attributes shared by every user type.
pub const USER_ATTRIBUTES: &[&str] = &[
    "creation_time",
    "email",
    "given_name",
    "family_name",
    "phone_number",
    "birthdate",
];

const READ_ONLY: &[&str] = &["creation_time"];

pub static ADMIN: ResourceDescriptor = ResourceDescriptor {
    type_name: "admins",
    id_field: "id",
    attributes: USER_ATTRIBUTES,
    read_only: READ_ONLY,
    key_style: KeyStyle::Snake,
    transform,
};

pub static HOST: ResourceDescriptor = ResourceDescriptor {
    type_name: "hosts",
    id_field: "id",
    attributes: USER_ATTRIBUTES,
    read_only: READ_ONLY,
    key_style: KeyStyle::Snake,
    transform,
};

pub static CASEWORKER: ResourceDescriptor = ResourceDescriptor {
    type_name: "caseworkers",
    id_field: "id",
    attributes: USER_ATTRIBUTES,
    read_only: READ_ONLY,
    key_style: KeyStyle::Snake,
    transform,
};

pub fn descriptor(role: Role) -> &'static ResourceDescriptor {
    match role {
        Role::Admin => &ADMIN,
        Role::Host => &HOST,
        Role::Caseworker => &CASEWORKER,
    }
}

/// Flattens an account into a record keyed by attribute name.
pub fn user_record(user: &User) -> Document {
    let mut record: Document = to_hash(&user.attributes)
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect();
    record.insert("id".to_string(), Value::String(user.username.clone()));
    if let Some(created_at) = user.created_at {
        record.insert(
            "creation_time".to_string(),
            Value::String(created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
    record
}

fn transform(mut record: Document) -> Document {
    let display = record
        .get("phone_number")
        .and_then(Value::as_str)
        .map(|phone| phone_for_display(phone).to_string());
    if let Some(display) = display {
        record.insert("phone_number".to_string(), Value::String(display));
    }
    record
}

pub fn admin_resource(user: &User) -> Resource {
    Resource::new(user_record(user))
}

pub fn host_resource(user: &User, profile: Option<Document>) -> Resource {
    Resource::new(user_record(user)).with(Relationship {
        name: "profile",
        descriptor: &HOST_PROFILE,
        related: Related::One(profile),
    })
}

pub fn caseworker_resource(user: &User, residents: Vec<Document>) -> Resource {
    Resource::new(user_record(user)).with(Relationship {
        name: "residents",
        descriptor: &RESIDENT_PROFILE,
        related: Related::Many(residents),
    })
}
