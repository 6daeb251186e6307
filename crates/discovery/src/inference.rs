//! Capability inference from tool descriptors.
//!
//! Category and mutation flags are resolved in this order: explicit
//! `category` / `mutates` fields on the descriptor, then the configured
//! [`CapabilityInference`] strategy, then the defaults (`analysis`,
//! non-mutating).

use codeguard_protocol::{Capability, Category};
use serde_json::Value;
use std::collections::HashSet;

/// Heuristic strategy used when a server does not describe a tool fully.
pub trait CapabilityInference: Send + Sync {
    fn category(&self, name: &str, description: &str) -> Option<Category>;

    fn mutates(&self, name: &str, description: &str) -> Option<bool>;

    /// Category for the synthesized capability of a server that advertises
    /// no tools.
    fn server_category(&self, server_name: &str) -> Option<Category>;
}

/// Keyword matching over lowercase name and description.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordInference;

const CATEGORY_KEYWORDS: &[(&str, Category)] = &[
    ("lint", Category::Linting),
    ("format", Category::Formatting),
    ("test", Category::Testing),
    ("security", Category::Security),
    ("dependency", Category::Dependencies),
    ("complexity", Category::Analysis),
    ("duplicate", Category::Analysis),
];

const MUTATING_KEYWORDS: &[&str] = &["format", "fix", "auto"];

const SERVER_KEYWORDS: &[(&[&str], Category)] = &[
    (&["eslint", "lint"], Category::Linting),
    (&["prettier", "format"], Category::Formatting),
    (&["test", "jest"], Category::Testing),
    (&["security", "audit"], Category::Security),
    (&["dep", "npm"], Category::Dependencies),
];

impl CapabilityInference for KeywordInference {
    fn category(&self, name: &str, description: &str) -> Option<Category> {
        let (name, description) = (name.to_lowercase(), description.to_lowercase());
        CATEGORY_KEYWORDS
            .iter()
            .find(|(kw, _)| name.contains(kw) || description.contains(kw))
            .map(|(_, category)| *category)
    }

    fn mutates(&self, name: &str, description: &str) -> Option<bool> {
        let (name, description) = (name.to_lowercase(), description.to_lowercase());
        Some(
            MUTATING_KEYWORDS
                .iter()
                .any(|kw| name.contains(kw) || description.contains(kw)),
        )
    }

    fn server_category(&self, server_name: &str) -> Option<Category> {
        let name = server_name.to_lowercase();
        SERVER_KEYWORDS
            .iter()
            .find(|(kws, _)| kws.iter().any(|kw| name.contains(kw)))
            .map(|(_, category)| *category)
    }
}

/// Disables heuristics; only explicit metadata and defaults apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInference;

impl CapabilityInference for NoInference {
    fn category(&self, _name: &str, _description: &str) -> Option<Category> {
        None
    }

    fn mutates(&self, _name: &str, _description: &str) -> Option<bool> {
        None
    }

    fn server_category(&self, _server_name: &str) -> Option<Category> {
        None
    }
}

/// Lowercase, every character outside `[a-z0-9]` replaced by `-`.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect()
}

/// Map a server's `capabilities` object onto capabilities.
///
/// Every entry of `capabilities.tools` with a name becomes one capability
/// (first occurrence of an id wins). A server advertising no usable tools
/// gets one capability synthesized from its name.
pub fn map_capabilities(
    capabilities: &Value,
    server_name: &str,
    inference: &dyn CapabilityInference,
) -> Vec<Capability> {
    let tools = capabilities
        .get("tools")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut seen = HashSet::new();
    let mut mapped = Vec::new();
    for tool in tools {
        let Some(name) = tool.get("name").and_then(Value::as_str).filter(|n| !n.is_empty()) else {
            log::debug!("Skipping unnamed tool advertised by {server_name}");
            continue;
        };
        if !seen.insert(name.to_string()) {
            continue;
        }
        let description = tool.get("description").and_then(Value::as_str).unwrap_or("");

        let category = tool
            .get("category")
            .and_then(Value::as_str)
            .and_then(|c| c.parse::<Category>().ok())
            .or_else(|| inference.category(name, description))
            .unwrap_or(Category::Analysis);
        let mutates = tool
            .get("mutates")
            .and_then(Value::as_bool)
            .or_else(|| inference.mutates(name, description))
            .unwrap_or(false);
        let commands: Vec<String> = tool
            .get("commands")
            .and_then(Value::as_array)
            .map(|cmds| {
                cmds.iter()
                    .filter_map(Value::as_str)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .filter(|cmds: &Vec<String>| !cmds.is_empty())
            .unwrap_or_else(|| vec![name.to_string()]);

        mapped.push(Capability::new(name, category, mutates, commands));
    }

    if mapped.is_empty() {
        let category = inference
            .server_category(server_name)
            .unwrap_or(Category::Analysis);
        mapped.push(Capability::new(slugify(server_name), category, true, ["run"]));
    }
    mapped
}
