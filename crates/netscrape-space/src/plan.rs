//! Resource registry.
//!
//! A [`Plan`] is the fixed set of resource descriptors a run populates. It is
//! built once before any entity is constructed and only read afterwards.

use crate::error::SpaceError;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conjunction of optional predicates over a resource's identifying tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    name: Option<String>,
    group: Option<String>,
    version: Option<String>,
    kind: Option<String>,
}

impl ResourceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn matches(&self, r: &Resource) -> bool {
        fn eq(want: &Option<String>, got: &str) -> bool {
            want.as_deref().map_or(true, |w| w == got)
        }
        eq(&self.name, r.name())
            && eq(&self.group, r.group())
            && eq(&self.version, r.version())
            && eq(&self.kind, r.kind())
    }
}

impl fmt::Display for ResourceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("name", &self.name),
            ("group", &self.group),
            ("version", &self.version),
            ("kind", &self.kind),
        ]
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| format!("{k}={v}")))
        .collect();
        if parts.is_empty() {
            f.write_str("{*}")
        } else {
            write!(f, "{{{}}}", parts.join(", "))
        }
    }
}

/// The resource descriptors of one origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    origin: String,
    resources: Vec<Resource>,
}

impl Plan {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            resources: Vec::new(),
        }
    }

    /// Where the resources come from (e.g. `https://api.github.com/users/<user>/starred`).
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Register a descriptor. Each (name, group, version, kind) tuple may be
    /// registered once.
    pub fn add(&mut self, resource: Resource) -> Result<(), SpaceError> {
        if self.resources.iter().any(|r| r.uid() == resource.uid()) {
            return Err(SpaceError::ResourceExists(resource.key()));
        }
        tracing::debug!(resource = %resource.key(), "plan resource added");
        self.resources.push(resource);
        Ok(())
    }

    /// The single descriptor matching `query`.
    pub fn get(&self, query: &ResourceQuery) -> Result<&Resource, SpaceError> {
        let mut matches = self.resources.iter().filter(|r| query.matches(r));
        let first = matches
            .next()
            .ok_or_else(|| SpaceError::ResourceNotFound(query.to_string()))?;
        let rest = matches.count();
        if rest > 0 {
            return Err(SpaceError::AmbiguousQuery {
                query: query.to_string(),
                matches: rest + 1,
            });
        }
        Ok(first)
    }

    /// Every registered descriptor, in registration order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }
}
