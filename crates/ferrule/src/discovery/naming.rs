//! Path and queue naming conventions.

use ferrule_protocol::ResourceKey;
use heck::ToSnakeCase;

/// Plural of an English noun, for the common regular forms.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_ascii_lowercase();
    let ends_with_consonant_y = lower.ends_with('y')
        && !lower
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));

    if ends_with_consonant_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

/// Snake-case plural of a resource name: `PurchaseItem` becomes
/// `purchase_items`.
pub fn collection_name(resource: &str) -> String {
    let snake = resource.to_snake_case();
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", pluralize(last)),
        None => pluralize(&snake),
    }
}

/// Conventional path of a resource: `/v<version>/<collection>`.
pub fn resource_path(key: &ResourceKey) -> String {
    format!("/v{}/{}", key.version, collection_name(&key.resource))
}

/// Queue a resource is served on: `service.<snake name>`.
pub fn queue_name(key: &ResourceKey) -> String {
    format!("service.{}", key.resource.to_snake_case())
}

/// Service name derived from the resources a process hosts: `service.`
/// followed by the sorted, de-duplicated snake-case names joined with `_`.
pub fn service_name<'a>(keys: impl IntoIterator<Item = &'a ResourceKey>) -> String {
    let mut names: Vec<String> = keys.into_iter().map(|key| key.resource.to_snake_case()).collect();
    names.sort();
    names.dedup();
    format!("service.{}", names.join("_"))
}
