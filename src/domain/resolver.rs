//! Participant identity resolution.
//!
//! Maps opaque `thread_users` keys (e.g. `FACEBOOK:12345`) to display
//! names. Built once per run and passed by reference into every component
//! that needs it; there is no ambient global contact table.

use std::collections::HashMap;

/// Sentinel returned for any key not present in the contacts source.
pub const UNKNOWN_CONTACT: &str = "unknown";

/// Key prefix used by the messages table when referencing a participant
/// by bare numeric ID.
pub const CONTACT_KEY_PREFIX: &str = "FACEBOOK:";

/// Read-only contact lookup table.
///
/// Lookups are total: unseen keys resolve to [`UNKNOWN_CONTACT`] rather
/// than failing.
#[derive(Debug, Default)]
pub struct ContactResolver {
    names: HashMap<String, String>,
}

impl ContactResolver {
    /// Builds the resolver from `(user_key, name)` pairs.
    pub fn build(rows: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            names: rows.into_iter().collect(),
        }
    }

    /// Resolves a full participant key to a display name.
    #[must_use]
    pub fn resolve(&self, key: &str) -> &str {
        self.names.get(key).map_or(UNKNOWN_CONTACT, String::as_str)
    }

    /// Resolves a bare participant ID by prepending the platform prefix.
    #[must_use]
    pub fn resolve_id(&self, id: &str) -> &str {
        self.resolve(&format!("{CONTACT_KEY_PREFIX}{id}"))
    }

    /// Number of contacts loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All `(key, name)` pairs, unordered.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
