use crate::error::ApiError;
use crate::types::Role;
use lambda_http::{Request, RequestExt};
use std::collections::HashMap;

const USERNAME_CLAIM: &str = "cognito:username";
const GROUPS_CLAIM: &str = "cognito:groups";

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub username: String,
    pub groups: Vec<String>,
}

impl Caller {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            groups: vec![role.group_name().to_string()],
        }
    }

    /// Reads the caller from the claims of a token the API Gateway JWT
    /// authorizer has already validated.
    pub fn from_request(event: &Request) -> Result<Self, ApiError> {
        let claims = event
            .request_context_ref()
            .and_then(|context| context.authorizer())
            .and_then(|auth| auth.jwt.as_ref())
            .map(|jwt| &jwt.claims)
            .ok_or_else(|| ApiError::Unauthenticated("Access token missing".to_string()))?;
        Self::from_claims(claims)
    }

    pub fn from_claims(claims: &HashMap<String, String>) -> Result<Self, ApiError> {
        let username = claims
            .get(USERNAME_CLAIM)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::Unauthenticated("Token has no username".to_string()))?;
        let groups = claims
            .get(GROUPS_CLAIM)
            .map(|raw| parse_groups(raw))
            .unwrap_or_default();

        Ok(Self {
            username: username.clone(),
            groups,
        })
    }

    /// The role-group the caller belongs to. A user has exactly one, so the
    /// first recognised group is authoritative.
    pub fn role(&self) -> Option<Role> {
        self.groups
            .iter()
            .find_map(|group| Role::from_group_name(group))
    }
}

/// API Gateway flattens array claims to strings; depending on the API flavor
/// that is a JSON array or a bracketed, space separated list.
fn parse_groups(raw: &str) -> Vec<String> {
    if let Ok(groups) = serde_json::from_str::<Vec<String>>(raw) {
        return groups;
    }
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|group| !group.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reads_username_and_bracketed_groups() {
        let caller = Caller::from_claims(&claims(&[
            ("cognito:username", "fakeuser0"),
            ("cognito:groups", "[caseworkers]"),
        ]))
        .unwrap();

        assert_eq!(caller.username, "fakeuser0");
        assert_eq!(caller.role(), Some(Role::Caseworker));
    }

    #[test]
    fn test_reads_json_array_groups() {
        let caller = Caller::from_claims(&claims(&[
            ("cognito:username", "u"),
            ("cognito:groups", r#"["admins"]"#),
        ]))
        .unwrap();
        assert_eq!(caller.groups, vec!["admins".to_string()]);
    }

    #[test]
    fn test_first_known_group_wins() {
        assert_eq!(
            parse_groups("[beta-testers hosts admins]"),
            vec!["beta-testers", "hosts", "admins"]
        );
        let caller = Caller {
            username: "u".to_string(),
            groups: parse_groups("[beta-testers hosts admins]"),
        };
        assert_eq!(caller.role(), Some(Role::Host));
    }

    #[test]
    fn test_no_groups_means_no_role() {
        let caller = Caller::from_claims(&claims(&[("cognito:username", "u")])).unwrap();
        assert_eq!(caller.role(), None);
    }

    #[test]
    fn test_missing_username_is_unauthenticated() {
        let err = Caller::from_claims(&claims(&[("cognito:groups", "[admins]")])).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn test_request_without_authorizer_is_unauthenticated() {
        let err = Caller::from_request(&Request::default()).unwrap_err();
        assert_eq!(err.status(), 401);
    }
}
