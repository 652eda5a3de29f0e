//! Subscription and collection records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::store::Named;

/// Where a subscription's content comes from.
///
/// Only `local` is significant; any other stored tag (or none) is remote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Source {
    /// Content is fetched from `url`.
    #[default]
    Remote,
    /// Content is stored inline; there is nothing to fetch.
    Local,
}

/// A named proxy subscription.
///
/// Fields other than `name` and `url` (source tag, process rules, update
/// interval, inline content, ...) are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique name.
    pub name: String,
    /// Remote URL, for remote subscriptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Everything else, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subscription {
    /// Create a remote subscription.
    pub fn remote(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_source(name, Some(url.into()), Source::Remote)
    }

    /// Create a local subscription.
    pub fn local(name: impl Into<String>) -> Self {
        Self::with_source(name, None, Source::Local)
    }

    fn with_source(name: impl Into<String>, url: Option<String>, source: Source) -> Self {
        let mut extra = Map::new();
        extra.insert(SOURCE_FIELD.to_string(), Value::String(source.to_string()));
        Self {
            name: name.into(),
            url,
            extra,
        }
    }

    /// Content origin, read from the stored `source` tag.
    pub fn source(&self) -> Source {
        self.extra
            .get(SOURCE_FIELD)
            .and_then(Value::as_str)
            .and_then(|tag| tag.parse().ok())
            .unwrap_or_default()
    }

    /// Whether the subscription has no remote counterpart.
    pub fn is_local(&self) -> bool {
        self.source() == Source::Local
    }

    /// Apply `patch` over this record. `name` and `url` win when set; extra
    /// fields, including `source`, merge key by key.
    pub fn merged(&self, patch: SubscriptionPatch) -> Subscription {
        let mut extra = self.extra.clone();
        extra.extend(patch.extra);

        Subscription {
            name: patch.name.unwrap_or_else(|| self.name.clone()),
            url: patch.url.or_else(|| self.url.clone()),
            extra,
        }
    }
}

const SOURCE_FIELD: &str = "source";

impl Named for Subscription {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Partial update of a [`Subscription`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubscriptionPatch {
    /// New name; renames cascade into collections.
    #[serde(default)]
    pub name: Option<String>,
    /// New URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Other fields to overwrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SubscriptionPatch {
    /// The new name, when it differs from `current`.
    pub fn rename_from(&self, current: &str) -> Option<&str> {
        self.name.as_deref().filter(|new| *new != current)
    }
}

/// A named group of subscriptions, referenced by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Unique name.
    pub name: String,
    /// Member subscription names, in display order.
    #[serde(default)]
    pub subscriptions: Vec<String>,
    /// Everything else, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Collection {
    /// Create a collection over `subscriptions`.
    pub fn new<I, S>(name: impl Into<String>, subscriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            subscriptions: subscriptions.into_iter().map(Into::into).collect(),
            extra: Map::new(),
        }
    }

    /// Replace every reference to `old` with `new`. Returns whether any changed.
    pub fn rename_member(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        for member in self.subscriptions.iter_mut().filter(|m| m.as_str() == old) {
            *member = new.to_string();
            changed = true;
        }
        changed
    }

    /// Drop every reference to `name`. Returns whether any were dropped.
    pub fn remove_member(&mut self, name: &str) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|m| m != name);
        self.subscriptions.len() != before
    }
}

impl Named for Collection {
    fn name(&self) -> &str {
        &self.name
    }
}
