//! Next/previous post links between sources.
//!
//! Every permalink and alias of a post maps to one shared [`SequenceEntry`],
//! so two keys name the same post exactly when their entries are the same
//! allocation.

use super::super::CheckError;
use crate::utils::frontmatter::{get_str, get_str_list, split_yaml};
use anyhow::Result;
use regex::Regex;
use serde_yaml::Mapping;
use std::{collections::HashMap, path::PathBuf, rc::Rc, sync::LazyLock};

const SEQUENCE_KEYS: &[&str] = &[
    "title",
    "next-post-slug",
    "prev-post-slug",
    "next-post-title",
    "prev-post-title",
];

/// The frontmatter subset needed to follow post sequences.
pub type SequenceEntry = Rc<Mapping>;

pub type SequenceData = HashMap<String, SequenceEntry>;

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap());

fn slug(s: &str) -> String {
    s.trim_matches('/').to_owned()
}

pub fn build_sequence_data(files: &[PathBuf]) -> Result<SequenceData> {
    let mut data = SequenceData::new();
    for file in files {
        let (mapping, _) = split_yaml(file)?;
        let Some(permalink) = get_str(&mapping, "permalink") else {
            continue;
        };

        let entry: Mapping = SEQUENCE_KEYS
            .iter()
            .filter_map(|key| Some(((*key).into(), mapping.get(*key)?.clone())))
            .collect();
        let entry = Rc::new(entry);

        let keys = std::iter::once(permalink.to_owned()).chain(get_str_list(&mapping, "aliases"));
        for key in keys.map(|k| slug(&k)).filter(|k| !k.is_empty()) {
            data.insert(key, Rc::clone(&entry));
        }
    }
    Ok(data)
}

fn simplify(title: &str) -> String {
    NON_ALNUM.replace_all(title, "").to_lowercase()
}

/// Direction-specific frontmatter keys.
struct Link {
    direction: &'static str,
    slug_key: &'static str,
    back_key: &'static str,
    title_key: &'static str,
}

const LINKS: [Link; 2] = [
    Link {
        direction: "next",
        slug_key: "next-post-slug",
        back_key: "prev-post-slug",
        title_key: "next-post-title",
    },
    Link {
        direction: "prev",
        slug_key: "prev-post-slug",
        back_key: "next-post-slug",
        title_key: "prev-post-title",
    },
];

/// Sequence links must resolve, point back, and carry the target's title.
pub fn post_slug_relationships(mapping: &Mapping, data: &SequenceData) -> Result<Vec<String>> {
    let Some(permalink) = get_str(mapping, "permalink") else {
        return Ok(Vec::new());
    };
    let permalink = slug(permalink);
    let current = data
        .get(&permalink)
        .ok_or_else(|| CheckError::UnknownPermalink(permalink.clone()))?;
    let own_ids: Vec<&str> = data
        .iter()
        .filter(|(_, entry)| Rc::ptr_eq(entry, current))
        .map(|(key, _)| key.as_str())
        .collect();

    let mut issues = Vec::new();
    for link in &LINKS {
        let Some(target_slug) = get_str(mapping, link.slug_key).filter(|s| !s.is_empty()) else {
            continue;
        };
        let Some(target) = data.get(&slug(target_slug)) else {
            issues.push(format!("Could not find post with permalink {target_slug}"));
            continue;
        };

        let back = get_str(target, link.back_key);
        if back.is_none_or(|b| !own_ids.contains(&slug(b).as_str())) {
            issues.push(format!(
                "Post {target_slug} should have {}={permalink}; currently has {}",
                link.back_key,
                back.unwrap_or("None")
            ));
        }

        if let Some(expected) = get_str(mapping, link.title_key) {
            let actual = get_str(target, "title").unwrap_or_default();
            if simplify(expected) != simplify(actual) {
                issues.push(format!(
                    "{}-post-title mismatch: expected '{expected}', but {target_slug} has title '{actual}'",
                    link.direction
                ));
            }
        }
    }
    Ok(issues)
}
