//! Conversions between the identity provider's `{Name, Value}` lists and
//! plain hashes, plus phone number normalization.

use crate::types::Attribute;
use std::collections::BTreeMap;

pub type AttributeHash = BTreeMap<String, String>;

const PHONE_PREFIX: &str = "+1";
const PHONE_DIGITS: usize = 10;

/// Converts an attribute list to a hash. Later duplicates win.
///
/// ```text
/// [{ first_name: Jeff }, { last_name: Bezos }]  =>  { first_name: Jeff, last_name: Bezos }
/// ```
pub fn to_hash(attributes: &[Attribute]) -> AttributeHash {
    attributes
        .iter()
        .map(|attr| (attr.name.clone(), attr.value.clone()))
        .collect()
}

/// Converts a hash back to an attribute list, one entry per key.
pub fn to_attribute_list(hash: &AttributeHash) -> Vec<Attribute> {
    hash.iter()
        .map(|(name, value)| Attribute::new(name.as_str(), value.as_str()))
        .collect()
}

/// Drops every attribute whose name is listed.
pub fn remove_attributes(attributes: &mut Vec<Attribute>, names: &[&str]) {
    attributes.retain(|attr| !names.contains(&attr.name.as_str()));
}

/// Stored phone numbers carry a `+1` prefix that clients never see.
pub fn phone_for_display(stored: &str) -> &str {
    stored.strip_prefix(PHONE_PREFIX).unwrap_or(stored)
}

/// Accepts exactly ten digits and returns the stored form.
pub fn phone_for_storage(input: &str) -> Option<String> {
    let valid = input.len() == PHONE_DIGITS && input.bytes().all(|b| b.is_ascii_digit());
    valid.then(|| format!("{}{}", PHONE_PREFIX, input))
}
