//! Domain classification.
//!
//! Maps a page URL to a [`DomainCategory`]. Classification is total: any input,
//! including empty or malformed URLs, yields exactly one category.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category of the page a tab is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainCategory {
    Productive,
    Distraction,
    #[default]
    Unknown,
}

/// Built-in productive domains. Subdomains of these also match.
pub const BUILTIN_PRODUCTIVE: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "stackoverflow.com",
    "stackexchange.com",
    "coursera.org",
    "edx.org",
    "khanacademy.org",
    "udemy.com",
    "wikipedia.org",
    "arxiv.org",
    "scholar.google.com",
    "docs.google.com",
    "developer.mozilla.org",
    "docs.rs",
    "crates.io",
    "rust-lang.org",
    "notion.so",
    "leetcode.com",
    "overleaf.com",
];

/// Built-in distraction domains. Exact host match only.
pub const BUILTIN_DISTRACTION: &[&str] = &[
    "youtube.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "reddit.com",
    "tiktok.com",
    "netflix.com",
    "twitch.tv",
    "pinterest.com",
    "tumblr.com",
    "9gag.com",
    "primevideo.com",
    "hulu.com",
];

/// Academic and government suffixes treated as productive.
pub const ACADEMIC_SUFFIXES: &[&str] = &[
    ".edu", ".ac.uk", ".ac.in", ".ac.jp", ".edu.au", ".gov", ".gov.uk",
];

/// Built-in and user-maintained domain lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLists {
    /// User-added productive hosts
    pub custom_productive: BTreeSet<String>,
    /// User-added distraction hosts
    pub custom_distraction: BTreeSet<String>,
}

impl DomainLists {
    /// Build lists from persisted custom entries, normalizing every entry.
    pub fn from_custom<I, J>(productive: I, distraction: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        let mut lists = Self::default();
        lists.replace_custom(Some(productive), Some(distraction));
        lists
    }

    /// Classify a URL.
    pub fn classify(&self, url: &str) -> DomainCategory {
        match extract_hostname(url) {
            Some(host) => self.classify_host(&host),
            None => DomainCategory::Unknown,
        }
    }

    /// Classify an already-normalized hostname.
    pub fn classify_host(&self, host: &str) -> DomainCategory {
        if self.custom_distraction.contains(host) {
            return DomainCategory::Distraction;
        }
        if self.custom_productive.contains(host) {
            return DomainCategory::Productive;
        }
        if BUILTIN_DISTRACTION.contains(&host) {
            return DomainCategory::Distraction;
        }
        if BUILTIN_PRODUCTIVE
            .iter()
            .any(|d| host == *d || is_subdomain_of(host, d))
        {
            return DomainCategory::Productive;
        }
        if ACADEMIC_SUFFIXES.iter().any(|s| host.ends_with(s)) {
            return DomainCategory::Productive;
        }
        DomainCategory::Unknown
    }

    /// Add a host to the custom productive list, removing it from the other list.
    ///
    /// Returns false when the entry does not contain a usable hostname.
    pub fn add_productive(&mut self, entry: &str) -> bool {
        match extract_hostname(entry) {
            Some(host) => {
                self.custom_distraction.remove(&host);
                self.custom_productive.insert(host);
                true
            }
            None => {
                tracing::warn!(entry, "ignoring invalid productive domain");
                false
            }
        }
    }

    /// Add a host to the custom distraction list, removing it from the other list.
    pub fn add_distraction(&mut self, entry: &str) -> bool {
        match extract_hostname(entry) {
            Some(host) => {
                self.custom_productive.remove(&host);
                self.custom_distraction.insert(host);
                true
            }
            None => {
                tracing::warn!(entry, "ignoring invalid distraction domain");
                false
            }
        }
    }

    /// Remove a host from both custom lists.
    pub fn remove(&mut self, entry: &str) -> bool {
        let Some(host) = extract_hostname(entry) else {
            return false;
        };
        let a = self.custom_productive.remove(&host);
        let b = self.custom_distraction.remove(&host);
        a || b
    }

    /// Replace one or both custom lists wholesale.
    ///
    /// A list given as `None` is left untouched. When a host appears in both
    /// incoming lists, the distraction entry wins, matching lookup priority.
    pub fn replace_custom<I, J>(&mut self, productive: Option<I>, distraction: Option<J>)
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        if let Some(entries) = productive {
            self.custom_productive = entries
                .into_iter()
                .filter_map(|e| extract_hostname(&e))
                .collect();
        }
        if let Some(entries) = distraction {
            self.custom_distraction = entries
                .into_iter()
                .filter_map(|e| extract_hostname(&e))
                .collect();
        }
        let overlap: Vec<String> = self
            .custom_productive
            .intersection(&self.custom_distraction)
            .cloned()
            .collect();
        for host in overlap {
            self.custom_productive.remove(&host);
        }
    }
}

fn is_subdomain_of(host: &str, domain: &str) -> bool {
    host.len() > domain.len() + 1
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

/// Extract a normalized hostname from a URL or bare host.
///
/// Strips the scheme, userinfo, port, path, query, fragment and a leading
/// `www.`, and lowercases the result. Returns `None` when nothing usable remains.
pub fn extract_hostname(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let rest = match trimmed.find("://") {
        Some(idx) => &trimmed[idx + 3..],
        None => trimmed,
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let authority = authority.rsplit('@').next().unwrap_or("");
    let host = authority.split(':').next().unwrap_or("");

    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let valid = !host.is_empty()
        && !host.starts_with('.')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');

    valid.then(|| host.to_string())
}
