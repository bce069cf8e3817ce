//! Who may do what to which resource.
//!
//! Every route asks [`authorize`] before touching a backend. The rules are a
//! single table keyed by resource, operation and caller role; ownership is
//! expressed through [`Target`], which names the user the record belongs to.

use crate::auth::Caller;
use crate::error::ApiError;
use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Admins,
    Hosts,
    Caseworkers,
    HostProfiles,
    ResidentProfiles,
    UserStats,
}

impl Resource {
    pub fn users(role: Role) -> Self {
        match role {
            Role::Admin => Resource::Admins,
            Role::Host => Resource::Hosts,
            Role::Caseworker => Resource::Caseworkers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    List,
    Get,
    Update,
    Delete,
    View,
}

/// What the operation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Collection,
    /// A user id, or the owning user's id for profiles.
    Owner(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Allowed, but these identity attributes must be stripped first.
    AllowWithRedactions(&'static [&'static str]),
    Deny,
}

impl Decision {
    pub fn redactions(self) -> &'static [&'static str] {
        match self {
            Decision::AllowWithRedactions(fields) => fields,
            Decision::Allow | Decision::Deny => &[],
        }
    }
}

const HIDDEN_FROM_CASEWORKERS: &[&str] = &["email"];

pub fn authorize(
    caller: &Caller,
    resource: Resource,
    operation: Operation,
    target: Target<'_>,
) -> Decision {
    use Operation::*;
    use Resource::*;

    let Some(role) = caller.role() else {
        return Decision::Deny;
    };
    let is_self = matches!(target, Target::Owner(id) if id == caller.username);

    match (resource, operation, role) {
        (UserStats, View, Role::Admin) => Decision::Allow,

        (Admins | Hosts | Caseworkers, Create | List | Get | Update, Role::Admin) => {
            Decision::Allow
        }
        (Hosts, List | Get, Role::Caseworker) => {
            Decision::AllowWithRedactions(HIDDEN_FROM_CASEWORKERS)
        }
        (Hosts, Get, Role::Host) if is_self => Decision::Allow,
        (Caseworkers, Get, Role::Caseworker) if is_self => Decision::Allow,
        (Admins | Hosts | Caseworkers, Update, _) if is_self => Decision::Allow,

        (HostProfiles, Create | Update | Delete, Role::Host) if is_self => Decision::Allow,
        (ResidentProfiles, Create | Update | Delete, Role::Caseworker) if is_self => {
            Decision::Allow
        }

        _ => Decision::Deny,
    }
}

/// [`authorize`], with a denial turned into a 403.
pub fn require(
    caller: &Caller,
    resource: Resource,
    operation: Operation,
    target: Target<'_>,
) -> Result<Decision, ApiError> {
    match authorize(caller, resource, operation, target) {
        Decision::Deny => {
            tracing::info!(
                "Denied {:?} {:?} for {} ({:?})",
                operation,
                resource,
                caller.username,
                caller.role()
            );
            Err(ApiError::Forbidden)
        }
        decision => Ok(decision),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Decision::*;
    use Operation::*;
    use Resource::*;

    const ME: &str = "me";
    const OTHER: &str = "someone-else";
    const REDACT: Decision = AllowWithRedactions(&["email"]);

    #[derive(Clone, Copy)]
    enum T {
        Coll,
        Mine,
        Theirs,
    }

    fn check(role: Role, resource: Resource, op: Operation, target: T, expected: Decision) {
        let caller = Caller::new(ME, role);
        let target = match target {
            T::Coll => Target::Collection,
            T::Mine => Target::Owner(ME),
            T::Theirs => Target::Owner(OTHER),
        };
        assert_eq!(
            authorize(&caller, resource, op, target),
            expected,
            "{:?} {:?} {:?} as {:?}",
            op,
            resource,
            target,
            role
        );
    }

    #[test]
    fn test_create_users_is_admin_only() {
        for resource in [Admins, Hosts, Caseworkers] {
            check(Role::Admin, resource, Create, T::Coll, Allow);
            check(Role::Caseworker, resource, Create, T::Coll, Deny);
            check(Role::Host, resource, Create, T::Coll, Deny);
        }
    }

    #[test]
    fn test_admins_visible_to_admins_only() {
        check(Role::Admin, Admins, List, T::Coll, Allow);
        check(Role::Admin, Admins, Get, T::Theirs, Allow);
        for role in [Role::Caseworker, Role::Host] {
            check(role, Admins, List, T::Coll, Deny);
            check(role, Admins, Get, T::Theirs, Deny);
            check(role, Admins, Get, T::Mine, Deny);
        }
    }

    #[test]
    fn test_hosts_visibility() {
        check(Role::Admin, Hosts, List, T::Coll, Allow);
        check(Role::Admin, Hosts, Get, T::Theirs, Allow);

        check(Role::Caseworker, Hosts, List, T::Coll, REDACT);
        check(Role::Caseworker, Hosts, Get, T::Theirs, REDACT);

        check(Role::Host, Hosts, Get, T::Mine, Allow);
        check(Role::Host, Hosts, Get, T::Theirs, Deny);
        check(Role::Host, Hosts, List, T::Coll, Deny);
    }

    #[test]
    fn test_caseworkers_visibility() {
        check(Role::Admin, Caseworkers, List, T::Coll, Allow);
        check(Role::Admin, Caseworkers, Get, T::Theirs, Allow);

        check(Role::Caseworker, Caseworkers, Get, T::Mine, Allow);
        check(Role::Caseworker, Caseworkers, Get, T::Theirs, Deny);
        check(Role::Caseworker, Caseworkers, List, T::Coll, Deny);

        check(Role::Host, Caseworkers, Get, T::Theirs, Deny);
        check(Role::Host, Caseworkers, List, T::Coll, Deny);
    }

    #[test]
    fn test_update_users() {
        for resource in [Admins, Hosts, Caseworkers] {
            check(Role::Admin, resource, Update, T::Theirs, Allow);
            check(Role::Admin, resource, Update, T::Mine, Allow);
            for role in [Role::Caseworker, Role::Host] {
                check(role, resource, Update, T::Mine, Allow);
                check(role, resource, Update, T::Theirs, Deny);
            }
        }
    }

    #[test]
    fn test_host_profiles_belong_to_their_host() {
        for op in [Create, Update, Delete] {
            check(Role::Host, HostProfiles, op, T::Mine, Allow);
            check(Role::Host, HostProfiles, op, T::Theirs, Deny);
            check(Role::Admin, HostProfiles, op, T::Theirs, Deny);
            check(Role::Caseworker, HostProfiles, op, T::Mine, Deny);
        }
    }

    #[test]
    fn test_resident_profiles_belong_to_their_caseworker() {
        for op in [Create, Update, Delete] {
            check(Role::Caseworker, ResidentProfiles, op, T::Mine, Allow);
            check(Role::Caseworker, ResidentProfiles, op, T::Theirs, Deny);
            check(Role::Admin, ResidentProfiles, op, T::Theirs, Deny);
            check(Role::Host, ResidentProfiles, op, T::Mine, Deny);
        }
    }

    #[test]
    fn test_stats_are_admin_only() {
        check(Role::Admin, UserStats, View, T::Coll, Allow);
        check(Role::Caseworker, UserStats, View, T::Coll, Deny);
        check(Role::Host, UserStats, View, T::Coll, Deny);
    }

    #[test]
    fn test_caller_without_role_is_always_denied() {
        let caller = Caller {
            username: ME.to_string(),
            groups: vec![],
        };
        for resource in [Admins, Hosts, Caseworkers, HostProfiles, ResidentProfiles, UserStats] {
            for op in [Create, List, Get, Update, Delete, View] {
                for target in [Target::Collection, Target::Owner(ME)] {
                    assert_eq!(authorize(&caller, resource, op, target), Deny);
                }
            }
        }
    }

    #[test]
    fn test_require_maps_deny_to_forbidden() {
        let host = Caller::new(ME, Role::Host);
        let err = require(&host, UserStats, View, Target::Collection).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        let caseworker = Caller::new(ME, Role::Caseworker);
        let decision = require(&caseworker, Hosts, List, Target::Collection).unwrap();
        assert_eq!(decision.redactions(), &["email"]);
    }
}
