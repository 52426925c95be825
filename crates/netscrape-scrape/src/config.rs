//! Run configuration and the vocabulary of the GitHub stars graph.

use netscrape_space::{Plan, Resource, ResourceQuery, SpaceError};
use serde::{Deserialize, Serialize};

/// Page size used when the configured value is not positive.
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Worker count used when the configured value is not positive.
pub const DEFAULT_WORKERS: usize = 5;

/// Scrape parameters as configured (file or flags). Values are validated by
/// [`ScrapeConfig::resolved`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Whose stars are scraped.
    pub user: String,
    /// Records per page; `<= 0` selects [`DEFAULT_PAGE_SIZE`].
    pub page_size: i64,
    /// Mapper workers; `<= 0` selects [`DEFAULT_WORKERS`].
    pub workers: i64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            page_size: DEFAULT_PAGE_SIZE as i64,
            workers: DEFAULT_WORKERS as i64,
        }
    }
}

impl ScrapeConfig {
    pub fn resolved(&self) -> ResolvedConfig {
        fn positive(v: i64, fallback: usize) -> usize {
            usize::try_from(v).ok().filter(|v| *v > 0).unwrap_or(fallback)
        }
        ResolvedConfig {
            user: self.user.clone(),
            page_size: positive(self.page_size, DEFAULT_PAGE_SIZE),
            workers: positive(self.workers, DEFAULT_WORKERS),
        }
    }
}

/// Validated [`ScrapeConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub user: String,
    pub page_size: usize,
    pub workers: usize,
}

/// Name, group and scoping of one resource in the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub name: String,
    pub group: String,
    #[serde(default)]
    pub namespaced: bool,
}

impl ResourceSpec {
    fn new(name: &str, group: &str, namespaced: bool) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            namespaced,
        }
    }
}

/// Resource names, relation labels and formats used by the plan and mapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub owner: ResourceSpec,
    pub repo: ResourceSpec,
    pub topic: ResourceSpec,
    pub lang: ResourceSpec,
    /// owner → repo
    pub owns: String,
    /// repo → topic
    pub has_topic: String,
    /// repo → lang
    pub is_lang: String,
    /// chrono format of the `starred_at` attribute.
    pub time_format: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            version: "v3".into(),
            kind: "starred".into(),
            namespace: "global".into(),
            owner: ResourceSpec::new("owner", "owners", true),
            repo: ResourceSpec::new("repo", "repos", true),
            topic: ResourceSpec::new("topic", "topics", true),
            lang: ResourceSpec::new("lang", "langs", false),
            owns: "owns".into(),
            has_topic: "hasTopic".into(),
            is_lang: "isLang".into(),
            time_format: "%Y-%m-%dT%H:%M:%S".into(),
        }
    }
}

impl Vocabulary {
    pub fn specs(&self) -> [&ResourceSpec; 4] {
        [&self.owner, &self.repo, &self.topic, &self.lang]
    }

    /// Origin of a user's stars.
    pub fn origin(&self, user: &str) -> String {
        format!("https://api.github.com/users/{user}/starred")
    }

    /// Register every resource of the vocabulary.
    pub fn plan(&self, origin: impl Into<String>) -> Result<Plan, SpaceError> {
        let mut plan = Plan::new(origin);
        for spec in self.specs() {
            plan.add(Resource::new(
                &spec.name,
                &spec.group,
                &self.version,
                &self.kind,
                spec.namespaced,
            )?)?;
        }
        Ok(plan)
    }

    /// Query selecting exactly `spec`.
    pub fn query(&self, spec: &ResourceSpec) -> ResourceQuery {
        ResourceQuery::new()
            .name(&spec.name)
            .group(&spec.group)
            .version(&self.version)
            .kind(&self.kind)
    }
}

/// Everything a run needs, as read from a JSON config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetscrapeConfig {
    pub scrape: ScrapeConfig,
    pub vocabulary: Vocabulary,
}

impl NetscrapeConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_values_fall_back() {
        let cfg = ScrapeConfig {
            user: "octocat".into(),
            page_size: 0,
            workers: -3,
        };
        let r = cfg.resolved();
        assert_eq!((r.page_size, r.workers), (DEFAULT_PAGE_SIZE, DEFAULT_WORKERS));

        let cfg = ScrapeConfig {
            page_size: 7,
            workers: 1,
            ..ScrapeConfig::default()
        };
        assert_eq!(cfg.resolved().page_size, 7);
        assert_eq!(cfg.resolved().workers, 1);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = NetscrapeConfig::from_json(r#"{"scrape": {"user": "octocat"}}"#).unwrap();
        assert_eq!(cfg.scrape.user, "octocat");
        assert_eq!(cfg.scrape.workers, DEFAULT_WORKERS as i64);
        assert_eq!(cfg.vocabulary, Vocabulary::default());

        let cfg =
            NetscrapeConfig::from_json(r#"{"vocabulary": {"has_topic": "tagged"}}"#).unwrap();
        assert_eq!(cfg.vocabulary.has_topic, "tagged");
        assert_eq!(cfg.vocabulary.owns, "owns");
    }

    #[test]
    fn default_plan_resolves_every_resource() {
        let vocab = Vocabulary::default();
        let plan = vocab.plan(vocab.origin("octocat")).unwrap();
        assert_eq!(plan.resources().len(), 4);
        for spec in vocab.specs() {
            let r = plan.get(&vocab.query(spec)).unwrap();
            assert_eq!(r.namespaced(), spec.namespaced);
        }
        assert!(!plan.get(&vocab.query(&vocab.lang)).unwrap().namespaced());
    }
}
