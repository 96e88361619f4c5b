use ferrule_protocol::{Action, Permissions, ResourceKey};
use std::collections::BTreeMap;

/// What a resource declares about itself to the middleware.
///
/// `additional_permissions` lists, per action the resource handles, the
/// permissions its callers' sessions are extended with when this resource
/// in turn calls other resources over a serialization boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDeclaration {
    /// The declared resource
    pub key: ResourceKey,
    /// Extra permissions needed while handling each action
    pub additional_permissions: BTreeMap<Action, Permissions>,
}

impl InterfaceDeclaration {
    /// Declaration needing no extra permissions
    pub fn new(key: ResourceKey) -> Self {
        Self {
            key,
            additional_permissions: BTreeMap::new(),
        }
    }

    /// Declare extra permissions used while handling `action`
    pub fn with_additional_permissions(mut self, action: Action, permissions: Permissions) -> Self {
        self.additional_permissions.insert(action, permissions);
        self
    }

    /// Extra permissions for `action`, if declared and non-empty.
    pub fn additional_permissions_for(&self, action: Action) -> Option<&Permissions> {
        self.additional_permissions
            .get(&action)
            .filter(|permissions| !permissions.is_empty())
    }
}
