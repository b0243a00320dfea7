//! Frontmatter checks.

use crate::{
    probe::{UrlProbe, is_ok_status},
    utils::frontmatter::{get_str, get_str_list, is_empty_value},
};
use serde_yaml::Mapping;
use std::collections::HashMap;

const REQUIRED_FIELDS: &[&str] = &["title", "description", "tags", "permalink"];

pub fn required_fields(mapping: &Mapping) -> Vec<String> {
    if mapping.is_empty() {
        return vec!["No valid frontmatter found".to_owned()];
    }

    REQUIRED_FIELDS
        .iter()
        .filter_map(|field| match mapping.get(*field) {
            None => Some(format!("Missing {field} field")),
            Some(value) if is_empty_value(value) => Some(format!("Empty {field} field")),
            Some(_) => None,
        })
        .collect()
}

/// Permalink followed by aliases.
pub fn post_urls(mapping: &Mapping) -> Vec<String> {
    get_str(mapping, "permalink")
        .map(str::to_owned)
        .into_iter()
        .chain(get_str_list(mapping, "aliases"))
        .collect()
}

/// URLs already claimed by an earlier file.
///
/// `existing` maps each URL to the display path of the file that claimed it
/// and is extended with this file's URLs.
pub fn duplicate_urls(
    mapping: &Mapping,
    display_path: &str,
    existing: &mut HashMap<String, String>,
) -> Vec<String> {
    let urls = post_urls(mapping);
    let duplicates = urls
        .iter()
        .filter_map(|url| {
            existing
                .get(url)
                .map(|owner| format!("URL '{url}' already used in: {owner}"))
        })
        .collect();

    for url in urls {
        existing.entry(url).or_insert_with(|| display_path.to_owned());
    }
    duplicates
}

/// The social card image must be remote and reachable.
pub fn card_image(mapping: &Mapping, probe: &dyn UrlProbe) -> Vec<String> {
    let Some(url) = get_str(mapping, "card_image").filter(|u| !u.is_empty()) else {
        return Vec::new();
    };
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return vec![format!("Card image URL '{url}' must be a remote URL")];
    }

    match probe.head(url) {
        Ok(status) if is_ok_status(status) => Vec::new(),
        Ok(status) => vec![format!("Card image URL '{url}' returned status {status}")],
        Err(err) => vec![format!("Failed to load card image URL '{url}': {err}")],
    }
}
