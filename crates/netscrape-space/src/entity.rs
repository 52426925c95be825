//! Entities (instances of a [`Resource`]) and their outgoing links.

use crate::attrs::{self, Attrs};
use crate::error::SpaceError;
use crate::resource::Resource;
use crate::uid::Uid;
use serde::{Deserialize, Serialize};

/// Relation used when none is given.
pub const DEFAULT_RELATION: &str = "Unknown";
/// Weight used when none (or zero) is given.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Facets of a link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOptions {
    pub relation: String,
    pub weight: f64,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            relation: DEFAULT_RELATION.to_string(),
            weight: DEFAULT_WEIGHT,
        }
    }
}

impl LinkOptions {
    pub fn relation(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            ..Self::default()
        }
        .normalized()
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self.normalized()
    }

    /// Read `relation` / `weight` from link attributes.
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_attrs(a: &Attrs) -> Self {
        let relation = a.get(attrs::RELATION).unwrap_or_default().to_string();
        let weight = a
            .get(attrs::WEIGHT)
            .and_then(|w| w.parse::<f64>().ok())
            .unwrap_or(DEFAULT_WEIGHT);
        Self { relation, weight }.normalized()
    }

    fn normalized(mut self) -> Self {
        if self.relation.is_empty() {
            self.relation = DEFAULT_RELATION.to_string();
        }
        if self.weight == 0.0 || !self.weight.is_finite() {
            self.weight = DEFAULT_WEIGHT;
        }
        self
    }
}

/// A directed edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub from: Uid,
    pub to: Uid,
    pub relation: String,
    pub weight: f64,
}

impl Link {
    pub fn new(from: Uid, to: Uid, opts: LinkOptions) -> Self {
        let opts = opts.normalized();
        Self {
            from,
            to,
            relation: opts.relation,
            weight: opts.weight,
        }
    }

    /// Identity of a link inside its source's link set.
    pub fn key(&self) -> (&Uid, &str) {
        (&self.to, &self.relation)
    }
}

/// An instance of a [`Resource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    uid: Uid,
    name: String,
    namespace: String,
    resource: Resource,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    links: Vec<Link>,
}

impl Entity {
    /// Create an entity with a random uid; use [`Entity::with_uid`] to give it
    /// a natural one.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        resource: Resource,
    ) -> Result<Self, SpaceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SpaceError::invalid("entity name", "must not be empty"));
        }
        Ok(Self {
            uid: Uid::random(),
            name,
            namespace: namespace.into(),
            resource,
            attrs: Attrs::new(),
            links: Vec::new(),
        })
    }

    /// Replace the uid. Links already attached are re-pointed at the new source.
    pub fn with_uid(mut self, uid: Uid) -> Self {
        for link in &mut self.links {
            link.from = uid.clone();
        }
        self.uid = uid;
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Attrs {
        &mut self.attrs
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Link this entity to `to`.
    ///
    /// Links are a set keyed by `(to, relation)`: re-linking updates the
    /// weight of the existing link instead of appending a duplicate.
    pub fn link(&mut self, to: Uid, opts: LinkOptions) -> &mut Self {
        let link = Link::new(self.uid.clone(), to, opts);
        self.upsert_link(link);
        self
    }

    pub fn link_to<'a>(&'a self, to: &'a Uid) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| &l.to == to)
    }

    /// Remove every link to `to`; returns how many were removed.
    pub fn unlink(&mut self, to: &Uid) -> usize {
        let before = self.links.len();
        self.links.retain(|l| &l.to != to);
        before - self.links.len()
    }

    /// Keep only the links for which `keep` returns true.
    pub fn retain_links(&mut self, keep: impl FnMut(&Link) -> bool) {
        self.links.retain(keep);
    }

    /// Merge a later observation of the same entity into this one.
    ///
    /// Name, namespace and resource follow `other`; attributes merge with
    /// `other` winning per key. With `merge_links` the link sets are unioned,
    /// otherwise `other`'s links replace ours.
    pub fn merge(&mut self, other: Entity, merge_links: bool) {
        self.name = other.name;
        self.namespace = other.namespace;
        self.resource = other.resource;
        self.attrs.merge(&other.attrs);
        if merge_links {
            for mut link in other.links {
                link.from = self.uid.clone();
                self.upsert_link(link);
            }
        } else {
            self.links = other
                .links
                .into_iter()
                .map(|mut l| {
                    l.from = self.uid.clone();
                    l
                })
                .collect();
        }
    }

    fn upsert_link(&mut self, link: Link) {
        match self.links.iter_mut().find(|l| l.key() == link.key()) {
            Some(existing) => existing.weight = link.weight,
            None => self.links.push(link),
        }
    }
}
