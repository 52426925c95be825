//! The topology container: a deduplicated graph of resources, entities and links.
//!
//! [`Topology`] is the seam the ingestion pipeline writes through. Two
//! implementations exist: [`MemoryTopology`] here, and the store adapter in
//! `netscrape-store`, which persists every call as one conditional upsert.

use crate::entity::{Entity, LinkOptions};
use crate::error::StoreError;
use crate::object::{Object, ObjectKind};
use crate::resource::Resource;
use crate::uid::Uid;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Options for [`Topology::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOptions {
    /// Union new links into the existing link set instead of replacing it.
    pub merge_links: bool,
}

impl AddOptions {
    pub fn merge() -> Self {
        Self { merge_links: true }
    }

    pub fn replace() -> Self {
        Self { merge_links: false }
    }
}

impl Default for AddOptions {
    fn default() -> Self {
        Self::merge()
    }
}

/// Graph of resources and entities, safe for concurrent use.
#[async_trait]
pub trait Topology: Send + Sync {
    /// Create `object`, or merge it into the node with the same uid.
    async fn add(&self, object: Object, opts: AddOptions) -> Result<(), StoreError>;

    /// Link two entities. A no-op when either endpoint is missing.
    async fn link(&self, from: &Uid, to: &Uid, opts: LinkOptions) -> Result<(), StoreError>;

    /// Remove every link from `from` to `to`. A no-op when there is none.
    async fn unlink(&self, from: &Uid, to: &Uid) -> Result<(), StoreError>;

    async fn get(&self, uid: &Uid) -> Result<Object, StoreError>;

    /// Delete a node. Refused for resources that still have instances.
    async fn delete(&self, uid: &Uid) -> Result<(), StoreError>;
}

/// Node and edge counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub resources: usize,
    pub entities: usize,
    pub edges: usize,
}

impl Stats {
    pub fn nodes(&self) -> usize {
        self.resources + self.entities
    }
}

/// Order-independent view of a topology, used to compare runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<SnapshotNode>,
    pub edges: Vec<SnapshotEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub uid: Uid,
    pub kind: ObjectKind,
    pub name: String,
    pub attrs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub from: Uid,
    pub to: Uid,
    pub relation: String,
    pub weight: f64,
}

/// In-memory [`Topology`].
///
/// One lock guards the whole node map so every operation observes and
/// mutates a consistent graph.
#[derive(Debug, Default)]
pub struct MemoryTopology {
    nodes: RwLock<BTreeMap<Uid, Object>>,
}

impl MemoryTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Stats {
        let nodes = self.nodes.read();
        let mut stats = Stats::default();
        for obj in nodes.values() {
            match obj {
                Object::Resource(_) => stats.resources += 1,
                Object::Entity(e) => {
                    stats.entities += 1;
                    stats.edges += e.links().len();
                }
            }
        }
        stats
    }

    pub fn snapshot(&self) -> Snapshot {
        let nodes = self.nodes.read();
        let mut snapshot = Snapshot::default();
        for obj in nodes.values() {
            snapshot.nodes.push(SnapshotNode {
                uid: obj.uid().clone(),
                kind: obj.kind(),
                name: obj.name().to_string(),
                attrs: obj.attrs().as_map().clone(),
            });
            if let Object::Entity(e) = obj {
                snapshot.edges.extend(e.links().iter().map(|l| SnapshotEdge {
                    from: l.from.clone(),
                    to: l.to.clone(),
                    relation: l.relation.clone(),
                    weight: l.weight,
                }));
            }
        }
        snapshot
            .edges
            .sort_by(|a, b| (&a.from, &a.to, &a.relation).cmp(&(&b.from, &b.to, &b.relation)));
        snapshot
    }

    fn add_resource(nodes: &mut BTreeMap<Uid, Object>, r: Resource) -> Result<(), StoreError> {
        match nodes.get_mut(r.uid()) {
            Some(Object::Resource(existing)) => {
                let mut attrs = existing.attrs().clone();
                attrs.merge(r.attrs());
                *existing = r.with_attrs(attrs);
                Ok(())
            }
            Some(Object::Entity(_)) => Err(StoreError::precondition(
                r.uid(),
                "uid already names an entity",
            )),
            None => {
                nodes.insert(r.uid().clone(), Object::Resource(r));
                Ok(())
            }
        }
    }

    fn add_entity(
        nodes: &mut BTreeMap<Uid, Object>,
        mut e: Entity,
        opts: AddOptions,
    ) -> Result<(), StoreError> {
        if matches!(nodes.get(e.uid()), Some(Object::Resource(_))) {
            return Err(StoreError::precondition(e.uid(), "uid already names a resource"));
        }
        if !nodes.contains_key(e.resource().uid()) {
            Self::add_resource(nodes, e.resource().clone())?;
        } else if matches!(nodes.get(e.resource().uid()), Some(Object::Entity(_))) {
            return Err(StoreError::precondition(
                e.resource().uid(),
                "resource uid names an entity",
            ));
        }

        let uid = e.uid().clone();
        e.retain_links(|l| {
            l.to == uid || matches!(nodes.get(&l.to), Some(Object::Entity(_)))
        });

        match nodes.get_mut(&uid) {
            Some(Object::Entity(existing)) => existing.merge(e, opts.merge_links),
            _ => {
                nodes.insert(uid, Object::Entity(e));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Topology for MemoryTopology {
    async fn add(&self, object: Object, opts: AddOptions) -> Result<(), StoreError> {
        let mut nodes = self.nodes.write();
        match object {
            Object::Resource(r) => Self::add_resource(&mut nodes, r),
            Object::Entity(e) => Self::add_entity(&mut nodes, e, opts),
        }
    }

    async fn link(&self, from: &Uid, to: &Uid, opts: LinkOptions) -> Result<(), StoreError> {
        let mut nodes = self.nodes.write();
        if !matches!(nodes.get(to), Some(Object::Entity(_))) {
            tracing::trace!(%from, %to, "link target missing; skipped");
            return Ok(());
        }
        if let Some(Object::Entity(e)) = nodes.get_mut(from) {
            e.link(to.clone(), opts);
        }
        Ok(())
    }

    async fn unlink(&self, from: &Uid, to: &Uid) -> Result<(), StoreError> {
        if let Some(Object::Entity(e)) = self.nodes.write().get_mut(from) {
            e.unlink(to);
        }
        Ok(())
    }

    async fn get(&self, uid: &Uid) -> Result<Object, StoreError> {
        self.nodes
            .read()
            .get(uid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(uid.clone()))
    }

    async fn delete(&self, uid: &Uid) -> Result<(), StoreError> {
        let mut nodes = self.nodes.write();
        let kind = match nodes.get(uid) {
            None => return Ok(()),
            Some(obj) => obj.kind(),
        };
        match kind {
            ObjectKind::Resource => {
                let instances = nodes
                    .values()
                    .filter_map(Object::as_entity)
                    .filter(|e| e.resource().uid() == uid)
                    .count();
                if instances > 0 {
                    return Err(StoreError::precondition(
                        uid,
                        format!("resource still has {instances} instance(s)"),
                    ));
                }
                nodes.remove(uid);
            }
            ObjectKind::Entity => {
                nodes.remove(uid);
                for obj in nodes.values_mut() {
                    if let Object::Entity(e) = obj {
                        e.unlink(uid);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_resource() -> Resource {
        Resource::new("repo", "repos", "v3", "starred", true).unwrap()
    }

    fn repo(name: &str) -> Entity {
        Entity::new(name, "global", repo_resource())
            .unwrap()
            .with_uid(Uid::derive(name, "repo").unwrap())
    }

    #[tokio::test]
    async fn add_creates_resource_and_merges_entities() {
        let top = MemoryTopology::new();
        let mut e = repo("netscrape");
        e.attrs_mut().set("git_url", "a");
        top.add(e.clone().into(), AddOptions::merge()).await.unwrap();

        let mut again = repo("netscrape");
        again.attrs_mut().set("starred_at", "b");
        top.add(again.into(), AddOptions::merge()).await.unwrap();

        let stats = top.stats();
        assert_eq!(stats, Stats { resources: 1, entities: 1, edges: 0 });

        let got = top.get(e.uid()).await.unwrap();
        let got = got.as_entity().unwrap();
        assert_eq!(got.attrs().get("git_url"), Some("a"));
        assert_eq!(got.attrs().get("starred_at"), Some("b"));
    }

    #[tokio::test]
    async fn links_to_missing_targets_are_dropped() {
        let top = MemoryTopology::new();
        let mut e = repo("a");
        e.link(Uid::derive("ghost", "repo").unwrap(), LinkOptions::default());
        top.add(e.clone().into(), AddOptions::merge()).await.unwrap();
        assert_eq!(top.stats().edges, 0);

        top.link(e.uid(), &Uid::derive("ghost", "repo").unwrap(), LinkOptions::default())
            .await
            .unwrap();
        assert_eq!(top.stats().edges, 0);
    }

    #[tokio::test]
    async fn link_unlink_round() {
        let top = MemoryTopology::new();
        let (a, b) = (repo("a"), repo("b"));
        top.add(a.clone().into(), AddOptions::merge()).await.unwrap();
        top.add(b.clone().into(), AddOptions::merge()).await.unwrap();

        top.link(a.uid(), b.uid(), LinkOptions::relation("forks")).await.unwrap();
        top.link(a.uid(), b.uid(), LinkOptions::relation("forks")).await.unwrap();
        assert_eq!(top.stats().edges, 1);

        top.unlink(a.uid(), b.uid()).await.unwrap();
        top.unlink(a.uid(), b.uid()).await.unwrap();
        assert_eq!(top.stats().edges, 0);
    }

    #[tokio::test]
    async fn resource_delete_is_refused_while_referenced() {
        let top = MemoryTopology::new();
        let e = repo("a");
        let res_uid = e.resource().uid().clone();
        top.add(e.clone().into(), AddOptions::merge()).await.unwrap();

        let err = top.delete(&res_uid).await.unwrap_err();
        assert!(matches!(err, StoreError::PreconditionNotMet { .. }));

        top.delete(e.uid()).await.unwrap();
        top.delete(&res_uid).await.unwrap();
        assert!(matches!(top.get(&res_uid).await, Err(StoreError::NotFound(_))));
        // deleting again is a no-op
        top.delete(&res_uid).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_an_entity_drops_incoming_links() {
        let top = MemoryTopology::new();
        let (a, b) = (repo("a"), repo("b"));
        top.add(b.clone().into(), AddOptions::merge()).await.unwrap();
        let mut a_linked = a.clone();
        a_linked.link(b.uid().clone(), LinkOptions::default());
        top.add(a_linked.into(), AddOptions::merge()).await.unwrap();
        assert_eq!(top.stats().edges, 1);

        top.delete(b.uid()).await.unwrap();
        assert_eq!(top.stats(), Stats { resources: 1, entities: 1, edges: 0 });
    }

    #[tokio::test]
    async fn kind_clash_is_a_precondition_failure() {
        let top = MemoryTopology::new();
        let r = repo_resource();
        top.add(r.clone().into(), AddOptions::merge()).await.unwrap();

        let clash = Entity::new("x", "global", repo_resource())
            .unwrap()
            .with_uid(r.uid().clone());
        let err = top.add(clash.into(), AddOptions::merge()).await.unwrap_err();
        assert!(matches!(err, StoreError::PreconditionNotMet { .. }));
    }
}
