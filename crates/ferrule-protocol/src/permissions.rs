//! Permission decision trees
//!
//! A session's permissions are a two-level tree: a default rule that applies
//! to every resource, and per-resource rules. Each rule has an optional
//! per-action decision and an optional `else` fallback. A lookup walks the
//! tree from most to least specific:
//!
//! 1. the resource's decision for the action
//! 2. the resource's `else`
//! 3. the default decision for the action
//! 4. the default `else`
//! 5. [`PermissionDecision::Deny`]

use crate::error::ProtocolError;
use crate::resource::Action;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Outcome of a permission lookup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    /// Allow the action
    Allow,

    /// Deny the action
    Deny,

    /// Allow the action, subject to checks by the implementation
    Ask,
}

impl PermissionDecision {
    /// Anything other than an outright deny.
    pub fn is_permitted(self) -> bool {
        !matches!(self, PermissionDecision::Deny)
    }
}

impl fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PermissionDecision::Allow => "allow",
            PermissionDecision::Deny => "deny",
            PermissionDecision::Ask => "ask",
        })
    }
}

impl FromStr for PermissionDecision {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(PermissionDecision::Allow),
            "deny" => Ok(PermissionDecision::Deny),
            "ask" => Ok(PermissionDecision::Ask),
            _ => Err(ProtocolError::UnknownDecision(s.to_string())),
        }
    }
}

/// Decisions for one level of the tree
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionRule {
    /// Fallback when the action has no explicit decision
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<PermissionDecision>,

    /// Explicit per-action decisions
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<Action, PermissionDecision>,
}

impl PermissionRule {
    /// Rule with only a fallback decision
    pub fn fallback(decision: PermissionDecision) -> Self {
        Self {
            fallback: Some(decision),
            actions: BTreeMap::new(),
        }
    }

    /// Set the decision for one action
    pub fn with_action(mut self, action: Action, decision: PermissionDecision) -> Self {
        self.actions.insert(action, decision);
        self
    }

    fn lookup(&self, action: Action) -> Option<PermissionDecision> {
        self.actions.get(&action).copied().or(self.fallback)
    }

    fn overlay(&mut self, other: &PermissionRule) {
        if other.fallback.is_some() {
            self.fallback = other.fallback;
        }
        self.actions
            .extend(other.actions.iter().map(|(action, decision)| (*action, *decision)));
    }

    fn is_empty(&self) -> bool {
        self.fallback.is_none() && self.actions.is_empty()
    }
}

/// A complete permission tree
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permissions {
    /// Rule applying to every resource
    #[serde(default, skip_serializing_if = "PermissionRule::is_empty")]
    pub default: PermissionRule,

    /// Per-resource rules keyed by resource name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, PermissionRule>,
}

impl Permissions {
    /// Empty tree; every lookup resolves to deny.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree allowing everything.
    pub fn allow_all() -> Self {
        Self::new().with_default(PermissionDecision::Allow)
    }

    /// Set the default `else` decision
    pub fn with_default(mut self, decision: PermissionDecision) -> Self {
        self.default.fallback = Some(decision);
        self
    }

    /// Set the default decision for one action
    pub fn with_default_action(mut self, action: Action, decision: PermissionDecision) -> Self {
        self.default.actions.insert(action, decision);
        self
    }

    /// Set a resource's `else` decision
    pub fn with_resource(mut self, resource: impl Into<String>, decision: PermissionDecision) -> Self {
        self.resources.entry(resource.into()).or_default().fallback = Some(decision);
        self
    }

    /// Set a resource's decision for one action
    pub fn with_resource_action(
        mut self,
        resource: impl Into<String>,
        action: Action,
        decision: PermissionDecision,
    ) -> Self {
        self.resources
            .entry(resource.into())
            .or_default()
            .actions
            .insert(action, decision);
        self
    }

    /// Resolve the decision for `action` on `resource`.
    pub fn permitted(&self, resource: &str, action: Action) -> PermissionDecision {
        self.resources
            .get(resource)
            .and_then(|rule| rule.lookup(action))
            .or_else(|| self.default.lookup(action))
            .unwrap_or(PermissionDecision::Deny)
    }

    /// Overlay `other` onto a copy of this tree. Where both trees set the
    /// same leaf, `other` wins.
    pub fn merge(&self, other: &Permissions) -> Permissions {
        let mut merged = self.clone();
        merged.default.overlay(&other.default);
        for (resource, rule) in &other.resources {
            merged.resources.entry(resource.clone()).or_default().overlay(rule);
        }
        merged
    }

    /// Whether the tree has no decisions at all.
    pub fn is_empty(&self) -> bool {
        self.default.is_empty() && self.resources.values().all(PermissionRule::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::PermissionDecision::{Allow, Ask, Deny};
    use rstest::rstest;

    fn tree() -> Permissions {
        Permissions::new()
            .with_default(Deny)
            .with_default_action(Action::List, Ask)
            .with_resource("Purchase", Allow)
            .with_resource_action("Purchase", Action::Delete, Deny)
            .with_resource_action("Widget", Action::Show, Allow)
    }

    #[rstest]
    #[case("Purchase", Action::Delete, Deny)] // resource action
    #[case("Purchase", Action::Show, Allow)] // resource else
    #[case("Widget", Action::List, Ask)] // default action
    #[case("Widget", Action::Show, Allow)]
    #[case("Widget", Action::Create, Deny)] // default else
    #[case("Unknown", Action::Update, Deny)]
    fn precedence(#[case] resource: &str, #[case] action: Action, #[case] expected: PermissionDecision) {
        assert_eq!(tree().permitted(resource, action), expected);
    }

    #[test]
    fn empty_tree_denies() {
        assert_eq!(Permissions::new().permitted("Anything", Action::Show), Deny);
        assert!(Permissions::new().is_empty());
    }

    #[test]
    fn merge_lets_other_win() {
        let extra = Permissions::new()
            .with_resource_action("Purchase", Action::Delete, Allow)
            .with_resource("Invoice", Ask);

        let merged = tree().merge(&extra);
        assert_eq!(merged.permitted("Purchase", Action::Delete), Allow);
        assert_eq!(merged.permitted("Purchase", Action::Show), Allow);
        assert_eq!(merged.permitted("Invoice", Action::Create), Ask);
        assert_eq!(merged.permitted("Widget", Action::List), Ask);
        // the original is untouched
        assert_eq!(tree().permitted("Purchase", Action::Delete), Deny);
    }

    #[test]
    fn serializes_with_else_keys() {
        let json = serde_json::to_value(tree()).unwrap();
        assert_eq!(json["default"]["else"], "deny");
        assert_eq!(json["resources"]["Purchase"]["actions"]["delete"], "deny");

        let back: Permissions = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree());
    }
}
