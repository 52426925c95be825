//! Record → graph mapping.

use crate::config::{ResourceSpec, Vocabulary};
use crate::error::MapError;
use crate::record::StarredRepo;
use async_trait::async_trait;
use netscrape_space::{
    AddOptions, Attrs, Entity, LinkOptions, Plan, Resource, SpaceError, Topology, Uid,
};
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Turns one record into topology writes.
#[async_trait]
pub trait RecordMapper: Send + Sync {
    type Record: Send + 'static;

    async fn map(&self, record: Self::Record, topology: &dyn Topology) -> Result<(), MapError>;
}

/// Attribute keys written on repo nodes.
pub const STARRED_AT: &str = "starred_at";
pub const GIT_URL: &str = "git_url";

/// Maps a [`StarredRepo`] to a repo node plus its owner, topic and language
/// nodes.
///
/// Write order per record: adjacent nodes, then the repo with its outgoing
/// links, then back-links into the repo. Each write is an idempotent merge,
/// so records may be mapped concurrently and in any order.
#[derive(Debug, Clone)]
pub struct StarMapper {
    vocabulary: Vocabulary,
    owner: Resource,
    repo: Resource,
    topic: Resource,
    lang: Resource,
}

impl StarMapper {
    /// Resolve every resource the mapper writes from `plan`.
    pub fn new(vocabulary: Vocabulary, plan: &Plan) -> Result<Self, SpaceError> {
        let resolve = |spec: &ResourceSpec| plan.get(&vocabulary.query(spec)).cloned();
        Ok(Self {
            owner: resolve(&vocabulary.owner)?,
            repo: resolve(&vocabulary.repo)?,
            topic: resolve(&vocabulary.topic)?,
            lang: resolve(&vocabulary.lang)?,
            vocabulary,
        })
    }

    /// Entity whose uid is derived from its name, so every record naming it
    /// lands on the same node. The name is lowercased like the uid, so the
    /// stored name does not depend on which record was mapped last.
    fn named(&self, name: &str, resource: &Resource) -> Result<Entity, SpaceError> {
        let name = name.to_lowercase();
        let uid = Uid::derive(&name, resource.name())?;
        Ok(Entity::new(name, &self.vocabulary.namespace, resource.clone())?.with_uid(uid))
    }

    fn repo_attrs(&self, record: &StarredRepo) -> Result<Attrs, MapError> {
        let mut starred_at = String::new();
        write!(
            starred_at,
            "{}",
            record.starred_at.format(&self.vocabulary.time_format)
        )
        .map_err(|_| MapError::Record {
            record: record.node_id.clone(),
            reason: format!("invalid time format `{}`", self.vocabulary.time_format),
        })?;
        Ok(Attrs::new()
            .with(STARRED_AT, starred_at)
            .with(GIT_URL, record.url.clone()))
    }
}

#[async_trait]
impl RecordMapper for StarMapper {
    type Record = StarredRepo;

    async fn map(&self, record: StarredRepo, topology: &dyn Topology) -> Result<(), MapError> {
        let vocab = &self.vocabulary;
        let repo_uid = Uid::from_external(record.node_id.as_str())?;

        let topics: BTreeSet<String> = record
            .topics
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        let lang = record
            .language
            .as_deref()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty());

        let mut adjacent = Vec::with_capacity(topics.len() + 1);
        for t in &topics {
            adjacent.push((self.named(t, &self.topic)?, &vocab.has_topic));
        }
        if let Some(l) = &lang {
            adjacent.push((self.named(l, &self.lang)?, &vocab.is_lang));
        }
        let owner = self.named(record.owner_login(), &self.owner)?;

        for (entity, _) in &adjacent {
            topology.add(entity.clone().into(), AddOptions::merge()).await?;
        }
        topology.add(owner.clone().into(), AddOptions::merge()).await?;

        let mut repo = Entity::new(record.name.as_str(), &vocab.namespace, self.repo.clone())?
            .with_uid(repo_uid.clone())
            .with_attrs(self.repo_attrs(&record)?);
        for (entity, relation) in &adjacent {
            repo.link(entity.uid().clone(), LinkOptions::relation(relation.as_str()));
        }
        topology.add(repo.into(), AddOptions::merge()).await?;

        for (entity, relation) in &adjacent {
            topology
                .link(entity.uid(), &repo_uid, LinkOptions::relation(relation.as_str()))
                .await?;
        }
        topology
            .link(owner.uid(), &repo_uid, LinkOptions::relation(vocab.owns.as_str()))
            .await?;

        tracing::debug!(
            repo = %repo_uid,
            owner = record.owner_login(),
            topics = topics.len(),
            lang = lang.as_deref().unwrap_or("-"),
            "record mapped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use netscrape_space::{MemoryTopology, Object, Stats};

    fn record(id: &str, topics: &[&str], language: Option<&str>) -> StarredRepo {
        StarredRepo {
            node_id: id.into(),
            name: format!("repo-{id}"),
            owner: "Alice".into(),
            organization: None,
            topics: topics.iter().map(|t| t.to_string()).collect(),
            language: language.map(str::to_string),
            url: format!("https://api.github.com/repos/alice/{id}"),
            starred_at: chrono::Utc.with_ymd_and_hms(2020, 5, 1, 10, 30, 0).unwrap(),
        }
    }

    fn mapper() -> StarMapper {
        let vocab = Vocabulary::default();
        let plan = vocab.plan(vocab.origin("alice")).unwrap();
        StarMapper::new(vocab, &plan).unwrap()
    }

    #[tokio::test]
    async fn record_maps_to_repo_and_neighbours() {
        let top = MemoryTopology::new();
        let m = mapper();
        m.map(record("R_1", &["Go", "graph"], Some("Go")), &top)
            .await
            .unwrap();

        // repo, owner, 2 topics, 1 lang; resources are added on first use
        assert_eq!(
            top.stats(),
            Stats {
                resources: 4,
                entities: 5,
                edges: 3 + 3 + 1
            }
        );

        let repo = match top.get(&Uid::from_external("R_1").unwrap()).await.unwrap() {
            Object::Entity(e) => e,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(repo.attrs().get(STARRED_AT), Some("2020-05-01T10:30:00"));
        assert_eq!(repo.links().len(), 3);

        let owner = top.get(&Uid::derive("alice", "owner").unwrap()).await.unwrap();
        let owns = &owner.as_entity().unwrap().links()[0];
        assert_eq!((owns.to.as_str(), owns.relation.as_str()), ("R_1", "owns"));
    }

    #[tokio::test]
    async fn shared_topics_are_one_node() {
        let top = MemoryTopology::new();
        let m = mapper();
        m.map(record("R_1", &["go"], None), &top).await.unwrap();
        m.map(record("R_2", &["GO"], None), &top).await.unwrap();

        let go = top.get(&Uid::derive("go", "topic").unwrap()).await.unwrap();
        let back: Vec<&str> = go
            .as_entity()
            .unwrap()
            .links()
            .iter()
            .map(|l| l.to.as_str())
            .collect();
        assert_eq!(back, vec!["R_1", "R_2"]);
    }

    #[tokio::test]
    async fn mapping_twice_changes_nothing() {
        let top = MemoryTopology::new();
        let m = mapper();
        let r = record("R_1", &["go", "graph"], Some("Rust"));
        m.map(r.clone(), &top).await.unwrap();
        let once = top.snapshot();
        m.map(r, &top).await.unwrap();
        assert_eq!(top.snapshot(), once);
    }

    #[tokio::test]
    async fn owner_case_does_not_depend_on_mapping_order() {
        let m = mapper();
        let mut upper = record("R_2", &[], None);
        upper.owner = "ALICE".into();
        let lower = {
            let mut r = record("R_1", &[], None);
            r.owner = "alice".into();
            r
        };

        let forward = MemoryTopology::new();
        m.map(lower.clone(), &forward).await.unwrap();
        m.map(upper.clone(), &forward).await.unwrap();
        let backward = MemoryTopology::new();
        m.map(upper, &backward).await.unwrap();
        m.map(lower, &backward).await.unwrap();

        assert_eq!(forward.snapshot(), backward.snapshot());
        let owner = forward
            .get(&Uid::derive("alice", "owner").unwrap())
            .await
            .unwrap();
        assert_eq!(owner.name(), "alice");
    }

    #[tokio::test]
    async fn bad_record_id_is_a_mapping_error() {
        let top = MemoryTopology::new();
        let err = mapper().map(record("", &[], None), &top).await.unwrap_err();
        assert!(matches!(err, MapError::Space(_)));
    }
}
