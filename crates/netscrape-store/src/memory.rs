//! In-process [`Executor`].
//!
//! ```text
//! Request ──► parse mutations ──► lock graph ──► evaluate query blocks
//!                                                   │ vars: name -> [node]
//!                                                   ▼
//!                                  for each mutation whose @if holds:
//!                                      set JSON / delete JSON
//!                                                   │
//!                                                   ▼
//!                                  Response { named rows, blank uids }
//! ```
//!
//! Everything happens under one lock, so a request is atomic with respect to
//! every other request. Payloads are parsed before the lock is taken; a
//! malformed mutation rejects the whole request without touching the graph.
//!
//! `uid(v)` with `v` empty refers to a fresh node, allocated once per variable
//! per request, so several mutations of one request address the same new node.

use crate::executor::{Executor, ExecutorError};
use crate::query::{Cond, Filter, Func, Label, Query, Selection};
use crate::request::{Request, Response};
use crate::schema;
use async_trait::async_trait;
use netscrape_space::{
    ObjectKind, Snapshot, SnapshotEdge, SnapshotNode, Stats, Uid, DEFAULT_RELATION,
    DEFAULT_WEIGHT,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

type NodeId = u64;

fn hex(id: NodeId) -> String {
    format!("{id:#x}")
}

fn invalid(reason: impl Into<String>) -> ExecutorError {
    ExecutorError::InvalidRequest(reason.into())
}

// ============================================================================
// Graph
// ============================================================================

#[derive(Debug, Clone)]
struct Edge {
    to: NodeId,
    relation: String,
    weight: f64,
}

#[derive(Debug, Clone, Default)]
struct StoredNode {
    xid: Option<String>,
    types: BTreeSet<String>,
    scalars: BTreeMap<String, Value>,
    attrs: BTreeSet<NodeId>,
    resource: Option<NodeId>,
    links: Vec<Edge>,
}

impl StoredNode {
    fn is(&self, kind: ObjectKind) -> bool {
        self.types.contains(kind.as_str())
    }
}

#[derive(Debug, Default)]
struct Graph {
    next: NodeId,
    nodes: BTreeMap<NodeId, StoredNode>,
    by_xid: HashMap<String, BTreeSet<NodeId>>,
    fail_next: Option<ExecutorError>,
}

impl Graph {
    fn allocate(&mut self) -> NodeId {
        self.next += 1;
        self.nodes.insert(self.next, StoredNode::default());
        self.next
    }

    fn set_xid(&mut self, id: NodeId, xid: &str) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if let Some(old) = node.xid.replace(xid.to_string()) {
            if let Some(ids) = self.by_xid.get_mut(&old) {
                ids.remove(&id);
            }
        }
        self.by_xid.entry(xid.to_string()).or_default().insert(id);
    }

    fn remove(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        if let Some(xid) = node.xid {
            if let Some(ids) = self.by_xid.get_mut(&xid) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.by_xid.remove(&xid);
                }
            }
        }
        for other in self.nodes.values_mut() {
            other.links.retain(|e| e.to != id);
            other.attrs.remove(&id);
            if other.resource == Some(id) {
                other.resource = None;
            }
        }
    }

    fn matches(&self, id: NodeId, filter: &Filter) -> bool {
        match filter {
            Filter::Type(kind) => self.nodes.get(&id).map_or(false, |n| n.is(*kind)),
            Filter::NoInstances => !self.nodes.values().any(|n| n.resource == Some(id)),
            Filter::Not(inner) => !self.matches(id, inner),
            Filter::And(a, b) => self.matches(id, a) && self.matches(id, b),
            Filter::Or(a, b) => self.matches(id, a) || self.matches(id, b),
        }
    }

    fn evaluate(
        &self,
        query: &Query,
    ) -> Result<(HashMap<String, Vec<NodeId>>, Map<String, Value>), ExecutorError> {
        let mut vars: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut json = Map::new();
        for block in query.blocks() {
            let Func::EqXid(param) = &block.func;
            let xid = query
                .value(param)
                .ok_or_else(|| invalid(format!("unbound variable {}", param.name())))?;
            let ids: Vec<NodeId> = self
                .by_xid
                .get(xid)
                .into_iter()
                .flatten()
                .copied()
                .filter(|id| block.filter.as_ref().map_or(true, |f| self.matches(*id, f)))
                .collect();

            if let Some(var) = &block.bind {
                vars.entry(var.clone()).or_default().extend(ids.iter().copied());
            }
            if let Label::Named(name) = &block.label {
                let rows = ids.iter().map(|id| self.row(*id, block.select)).collect();
                json.insert(name.clone(), Value::Array(rows));
            }
        }
        Ok((vars, json))
    }

    /// Key/value pairs of the attribute nodes hanging off `node`.
    fn attr_pairs(&self, node: &StoredNode) -> BTreeMap<String, String> {
        let text = |n: &StoredNode, k: &str| {
            n.scalars.get(k).and_then(Value::as_str).map(str::to_string)
        };
        node.attrs
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter_map(|a| Some((text(a, schema::KEY)?, text(a, schema::VALUE)?)))
            .collect()
    }

    fn summary(&self, id: NodeId) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("uid".into(), Value::String(hex(id)));
        let Some(node) = self.nodes.get(&id) else {
            return row;
        };
        if let Some(xid) = &node.xid {
            row.insert(schema::XID.into(), Value::String(xid.clone()));
        }
        for (k, v) in &node.scalars {
            row.insert(k.clone(), v.clone());
        }
        if !node.attrs.is_empty() {
            let attrs = node
                .attrs
                .iter()
                .filter_map(|a| Some((*a, self.nodes.get(a)?)))
                .map(|(a, attr)| {
                    let mut child = Map::new();
                    child.insert("uid".into(), Value::String(hex(a)));
                    for k in [schema::KEY, schema::VALUE] {
                        if let Some(v) = attr.scalars.get(k) {
                            child.insert(k.into(), v.clone());
                        }
                    }
                    Value::Object(child)
                })
                .collect();
            row.insert(schema::ATTRS.into(), Value::Array(attrs));
        }
        let types = node.types.iter().cloned().map(Value::String).collect();
        row.insert(schema::TYPE.into(), Value::Array(types));
        row
    }

    fn row(&self, id: NodeId, select: Selection) -> Value {
        if select == Selection::Uid {
            let mut row = Map::new();
            row.insert("uid".into(), Value::String(hex(id)));
            return Value::Object(row);
        }
        let mut row = self.summary(id);
        let Some(node) = self.nodes.get(&id) else {
            return Value::Object(row);
        };
        if let Some(r) = node.resource {
            row.insert(schema::RESOURCE.into(), Value::Object(self.summary(r)));
        }
        if !node.links.is_empty() {
            let links = node
                .links
                .iter()
                .map(|e| {
                    let mut target = Map::new();
                    target.insert("uid".into(), Value::String(hex(e.to)));
                    if let Some(t) = self.nodes.get(&e.to) {
                        if let Some(xid) = &t.xid {
                            target.insert(schema::XID.into(), Value::String(xid.clone()));
                        }
                        let types = t.types.iter().cloned().map(Value::String).collect();
                        target.insert(schema::TYPE.into(), Value::Array(types));
                    }
                    target.insert(
                        schema::RELATION_FACET.into(),
                        Value::String(e.relation.clone()),
                    );
                    target.insert(schema::WEIGHT_FACET.into(), Value::from(e.weight));
                    Value::Object(target)
                })
                .collect();
            row.insert(schema::LINKS.into(), Value::Array(links));
        }
        Value::Object(row)
    }
}

// ============================================================================
// Mutation payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Ref {
    Var(String),
    Blank(String),
    Id(NodeId),
    Fresh,
}

#[derive(Debug, Clone)]
struct NodeDoc {
    target: Ref,
    bare: bool,
    xid: Option<String>,
    types: Vec<String>,
    scalars: Vec<(String, Value)>,
    attrs: Vec<NodeDoc>,
    resource: Option<Box<NodeDoc>>,
    links: Vec<NodeDoc>,
    clear_links: bool,
    relation: Option<String>,
    weight: Option<f64>,
}

fn parse_ref(v: Option<&Value>) -> Result<Ref, ExecutorError> {
    let Some(v) = v else {
        return Ok(Ref::Fresh);
    };
    let s = v
        .as_str()
        .ok_or_else(|| invalid(format!("uid must be a string, got {v}")))?;
    if let Some(var) = s.strip_prefix("uid(").and_then(|r| r.strip_suffix(')')) {
        return Ok(Ref::Var(var.to_string()));
    }
    if let Some(blank) = s.strip_prefix("_:") {
        return Ok(Ref::Blank(blank.to_string()));
    }
    s.strip_prefix("0x")
        .and_then(|h| NodeId::from_str_radix(h, 16).ok())
        .map(Ref::Id)
        .ok_or_else(|| invalid(format!("malformed uid `{s}`")))
}

fn parse_docs(v: &Value) -> Result<Vec<NodeDoc>, ExecutorError> {
    match v {
        Value::Array(items) => items.iter().map(parse_node).collect(),
        other => Ok(vec![parse_node(other)?]),
    }
}

fn parse_node(v: &Value) -> Result<NodeDoc, ExecutorError> {
    let obj = v
        .as_object()
        .ok_or_else(|| invalid(format!("mutation node must be an object, got {v}")))?;
    let mut doc = NodeDoc {
        target: parse_ref(obj.get("uid"))?,
        bare: obj.len() == 1 && obj.contains_key("uid"),
        xid: None,
        types: Vec::new(),
        scalars: Vec::new(),
        attrs: Vec::new(),
        resource: None,
        links: Vec::new(),
        clear_links: false,
        relation: None,
        weight: None,
    };
    for (key, value) in obj {
        match key.as_str() {
            "uid" => {}
            schema::XID => {
                let xid = value
                    .as_str()
                    .ok_or_else(|| invalid("xid must be a string"))?;
                doc.xid = Some(xid.to_string());
            }
            schema::TYPE => match value {
                Value::String(t) => doc.types.push(t.clone()),
                Value::Array(ts) => {
                    for t in ts {
                        let t = t.as_str().ok_or_else(|| invalid("type tags must be strings"))?;
                        doc.types.push(t.to_string());
                    }
                }
                _ => return Err(invalid("type tags must be strings")),
            },
            schema::ATTRS => match value {
                Value::Null => {}
                other => doc.attrs = parse_docs(other)?,
            },
            schema::RESOURCE => doc.resource = Some(Box::new(parse_node(value)?)),
            schema::LINKS => match value {
                Value::Null => doc.clear_links = true,
                other => doc.links = parse_docs(other)?,
            },
            schema::RELATION_FACET => {
                let r = value
                    .as_str()
                    .ok_or_else(|| invalid("relation facet must be a string"))?;
                doc.relation = Some(r.to_string());
            }
            schema::WEIGHT_FACET => {
                doc.weight = Some(
                    value
                        .as_f64()
                        .ok_or_else(|| invalid("weight facet must be a number"))?,
                );
            }
            _ => match value {
                Value::Object(_) | Value::Array(_) => {
                    return Err(invalid(format!("unknown edge predicate `{key}`")))
                }
                scalar => doc.scalars.push((key.clone(), scalar.clone())),
            },
        }
    }
    Ok(doc)
}

#[derive(Debug)]
struct ParsedMutation<'a> {
    cond: Option<&'a Cond>,
    set: Vec<NodeDoc>,
    delete: Vec<NodeDoc>,
}

// ============================================================================
// Transaction
// ============================================================================

struct Txn<'a> {
    graph: &'a mut Graph,
    vars: &'a HashMap<String, Vec<NodeId>>,
    blanks: BTreeMap<String, NodeId>,
}

impl Txn<'_> {
    fn resolve(&mut self, target: &Ref, create: bool) -> Vec<NodeId> {
        match target {
            Ref::Var(var) => match self.vars.get(var) {
                Some(ids) if !ids.is_empty() => ids.clone(),
                _ => self.blank(var.clone(), create),
            },
            Ref::Blank(name) => self.blank(format!("_:{name}"), create),
            Ref::Id(id) if self.graph.nodes.contains_key(id) => vec![*id],
            Ref::Id(id) if create => {
                self.graph.nodes.insert(*id, StoredNode::default());
                self.graph.next = self.graph.next.max(*id);
                vec![*id]
            }
            Ref::Id(_) => Vec::new(),
            Ref::Fresh if create => vec![self.graph.allocate()],
            Ref::Fresh => Vec::new(),
        }
    }

    fn blank(&mut self, key: String, create: bool) -> Vec<NodeId> {
        if let Some(id) = self.blanks.get(&key) {
            return vec![*id];
        }
        if !create {
            return Vec::new();
        }
        let id = self.graph.allocate();
        self.blanks.insert(key, id);
        vec![id]
    }

    fn set(&mut self, doc: &NodeDoc) -> Vec<NodeId> {
        let ids = self.resolve(&doc.target, true);
        let resource = doc
            .resource
            .as_ref()
            .and_then(|r| self.set(r).first().copied());
        let mut attrs = Vec::new();
        for attr in &doc.attrs {
            attrs.extend(self.set(attr));
        }
        let mut links = Vec::new();
        for link in &doc.links {
            let relation = link
                .relation
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_RELATION.to_string());
            let weight = link
                .weight
                .filter(|w| *w != 0.0 && w.is_finite())
                .unwrap_or(DEFAULT_WEIGHT);
            for to in self.set(link) {
                links.push(Edge {
                    to,
                    relation: relation.clone(),
                    weight,
                });
            }
        }

        for id in &ids {
            if let Some(xid) = &doc.xid {
                self.graph.set_xid(*id, xid);
            }
            let Some(node) = self.graph.nodes.get_mut(id) else {
                continue;
            };
            node.types.extend(doc.types.iter().cloned());
            for (k, v) in &doc.scalars {
                node.scalars.insert(k.clone(), v.clone());
            }
            node.attrs.extend(attrs.iter().copied());
            if resource.is_some() {
                node.resource = resource;
            }
            for edge in &links {
                match node
                    .links
                    .iter_mut()
                    .find(|e| e.to == edge.to && e.relation == edge.relation)
                {
                    Some(existing) => existing.weight = edge.weight,
                    None => node.links.push(edge.clone()),
                }
            }
        }
        ids
    }

    fn delete(&mut self, doc: &NodeDoc) {
        let ids = self.resolve(&doc.target, false);
        let mut targets = BTreeSet::new();
        for link in &doc.links {
            targets.extend(self.resolve(&link.target, false));
        }
        let mut attrs = BTreeSet::new();
        for attr in &doc.attrs {
            attrs.extend(self.resolve(&attr.target, false));
        }
        for id in ids {
            if doc.bare {
                self.graph.remove(id);
                continue;
            }
            let Some(node) = self.graph.nodes.get_mut(&id) else {
                continue;
            };
            if doc.clear_links {
                node.links.clear();
            }
            node.links.retain(|e| !targets.contains(&e.to));
            for (k, _) in &doc.scalars {
                node.scalars.remove(k);
            }
            node.attrs.retain(|a| !attrs.contains(a));
            if doc.resource.is_some() {
                node.resource = None;
            }
        }
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Graph-database stand-in that evaluates requests in process.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    graph: Mutex<Graph>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next request fail with `error` without touching the graph.
    pub fn fail_next(&self, error: ExecutorError) {
        self.graph.lock().fail_next = Some(error);
    }

    /// Number of nodes carrying `xid`. Anything above one is a duplicate.
    pub fn count_xid(&self, xid: &str) -> usize {
        self.graph.lock().by_xid.get(xid).map_or(0, BTreeSet::len)
    }

    pub fn stats(&self) -> Stats {
        let graph = self.graph.lock();
        let mut stats = Stats::default();
        for node in graph.nodes.values() {
            if node.is(ObjectKind::Entity) {
                stats.entities += 1;
                stats.edges += node.links.len();
            } else if node.is(ObjectKind::Resource) {
                stats.resources += 1;
            }
        }
        stats
    }

    /// Same shape as [`MemoryTopology::snapshot`](netscrape_space::MemoryTopology::snapshot),
    /// keyed by external id.
    pub fn snapshot(&self) -> Snapshot {
        let graph = self.graph.lock();
        let xid_of = |id: &NodeId| {
            graph
                .nodes
                .get(id)
                .and_then(|n| n.xid.as_deref())
                .and_then(|x| Uid::from_external(x).ok())
        };
        let mut snapshot = Snapshot::default();
        for (id, node) in &graph.nodes {
            let kind = if node.is(ObjectKind::Entity) {
                ObjectKind::Entity
            } else if node.is(ObjectKind::Resource) {
                ObjectKind::Resource
            } else {
                continue;
            };
            let Some(uid) = xid_of(id) else {
                continue;
            };
            let name = node
                .scalars
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            for edge in &node.links {
                if let Some(to) = xid_of(&edge.to) {
                    snapshot.edges.push(SnapshotEdge {
                        from: uid.clone(),
                        to,
                        relation: edge.relation.clone(),
                        weight: edge.weight,
                    });
                }
            }
            snapshot.nodes.push(SnapshotNode {
                uid,
                kind,
                name,
                attrs: graph.attr_pairs(node),
            });
        }
        snapshot.nodes.sort_by(|a, b| a.uid.cmp(&b.uid));
        snapshot
            .edges
            .sort_by(|a, b| (&a.from, &a.to, &a.relation).cmp(&(&b.from, &b.to, &b.relation)));
        snapshot
    }
}

#[async_trait]
impl Executor for MemoryExecutor {
    async fn execute(&self, request: Request) -> Result<Response, ExecutorError> {
        if request.read_only && !request.mutations.is_empty() {
            return Err(invalid("read-only request carries mutations"));
        }
        let mut parsed = Vec::with_capacity(request.mutations.len());
        for m in &request.mutations {
            parsed.push(ParsedMutation {
                cond: m.cond.as_ref(),
                set: m.set_json.as_ref().map(parse_docs).transpose()?.unwrap_or_default(),
                delete: m
                    .delete_json
                    .as_ref()
                    .map(parse_docs)
                    .transpose()?
                    .unwrap_or_default(),
            });
        }

        let mut graph = self.graph.lock();
        if let Some(error) = graph.fail_next.take() {
            return Err(error);
        }
        let (vars, json) = graph.evaluate(&request.query)?;
        let mut txn = Txn {
            graph: &mut *graph,
            vars: &vars,
            blanks: BTreeMap::new(),
        };
        for m in &parsed {
            let len = |v: &str| vars.get(v).map_or(0, Vec::len);
            if m.cond.map_or(false, |c| !c.holds(&len)) {
                continue;
            }
            for doc in &m.set {
                txn.set(doc);
            }
            for doc in &m.delete {
                txn.delete(doc);
            }
        }
        let uids = txn
            .blanks
            .into_iter()
            .map(|(name, id)| (name, hex(id)))
            .collect();
        Ok(Response {
            json: Value::Object(json),
            uids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Mutation, Op};
    use serde_json::json;

    fn uid(s: &str) -> Uid {
        Uid::from_external(s).unwrap()
    }

    fn upsert_entity(xid: &str) -> Request {
        let mut q = Query::builder();
        q.bind("u", &uid(xid), Some(Filter::is(ObjectKind::Entity)));
        let payload = json!({"uid": "uid(u)", "xid": xid, "name": xid, "dgraph.type": ["Entity"]});
        Request::upsert(
            q.build(),
            vec![Mutation::for_op(Op::Add, &payload, None).unwrap()],
        )
    }

    #[tokio::test]
    async fn upsert_reuses_the_bound_node() {
        let exec = MemoryExecutor::new();
        let first = exec.execute(upsert_entity("a")).await.unwrap();
        assert_eq!(first.uids.len(), 1, "fresh node allocated for empty var");
        let second = exec.execute(upsert_entity("a")).await.unwrap();
        assert!(second.uids.is_empty());
        assert_eq!(exec.count_xid("a"), 1);
        assert_eq!(exec.stats().entities, 1);
    }

    #[tokio::test]
    async fn failed_condition_skips_the_mutation() {
        let exec = MemoryExecutor::new();
        exec.execute(upsert_entity("a")).await.unwrap();

        let mut q = Query::builder();
        q.bind("from", &uid("a"), None).bind("to", &uid("missing"), None);
        let payload = json!({"uid": "uid(from)", "links": [{"uid": "uid(to)"}]});
        let cond = Cond::All(vec![Cond::non_empty("from"), Cond::non_empty("to")]);
        let req = Request::upsert(
            q.build(),
            vec![Mutation::for_op(Op::Link, &payload, Some(cond)).unwrap()],
        );
        let resp = exec.execute(req).await.unwrap();
        assert!(resp.uids.is_empty());
        assert_eq!(exec.stats().edges, 0);
        assert_eq!(exec.stats().nodes(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_rejects_whole_request() {
        let exec = MemoryExecutor::new();
        let mut req = upsert_entity("a");
        req.mutations.push(Mutation {
            cond: None,
            set_json: Some(json!({"uid": "not-a-uid"})),
            delete_json: None,
        });
        assert!(matches!(
            exec.execute(req).await,
            Err(ExecutorError::InvalidRequest(_))
        ));
        assert_eq!(exec.count_xid("a"), 0);
    }

    #[tokio::test]
    async fn deleting_a_node_drops_incoming_edges() {
        let exec = MemoryExecutor::new();
        exec.execute(upsert_entity("a")).await.unwrap();
        exec.execute(upsert_entity("b")).await.unwrap();

        let mut q = Query::builder();
        q.bind("from", &uid("a"), None).bind("to", &uid("b"), None);
        let link = json!({"uid": "uid(from)", "links": [{"uid": "uid(to)", "links|relation": "owns"}]});
        exec.execute(Request::upsert(
            q.build(),
            vec![Mutation::for_op(Op::Link, &link, None).unwrap()],
        ))
        .await
        .unwrap();
        assert_eq!(exec.stats().edges, 1);

        let mut q = Query::builder();
        q.bind("u", &uid("b"), None);
        exec.execute(Request::upsert(
            q.build(),
            vec![Mutation::for_op(Op::Delete, &json!({"uid": "uid(u)"}), None).unwrap()],
        ))
        .await
        .unwrap();
        assert_eq!(exec.stats(), Stats { resources: 0, entities: 1, edges: 0 });
    }

    fn set_attr(owner: &str, key: &str, value: &str) -> Request {
        let xid = format!("{owner}/attrs/{key}");
        let mut q = Query::builder();
        q.bind("u", &uid(owner), None).bind("a", &uid(&xid), None);
        let payload = json!({
            "uid": "uid(u)",
            "attrs": [{"uid": "uid(a)", "xid": xid, "key": key, "value": value,
                       "dgraph.type": ["Attr"]}]
        });
        Request::upsert(
            q.build(),
            vec![Mutation::for_op(Op::Add, &payload, None).unwrap()],
        )
    }

    #[tokio::test]
    async fn attribute_nodes_merge_per_key() {
        let exec = MemoryExecutor::new();
        exec.execute(upsert_entity("a")).await.unwrap();
        exec.execute(set_attr("a", "k", "1")).await.unwrap();
        exec.execute(set_attr("a", "j", "2")).await.unwrap();
        exec.execute(set_attr("a", "k", "3")).await.unwrap();

        assert_eq!(exec.count_xid("a/attrs/k"), 1);
        let attrs = &exec.snapshot().nodes[0].attrs;
        assert_eq!(attrs.get("k").map(String::as_str), Some("3"));
        assert_eq!(attrs.get("j").map(String::as_str), Some("2"));
        assert_eq!(exec.stats().nodes(), 1, "attribute nodes are not entities");

        let mut q = Query::builder();
        q.named("node", None, &uid("a"), None, Selection::Node);
        let resp = exec.execute(Request::read(q.build())).await.unwrap();
        let rows = resp.rows("node")[0]["attrs"].as_array().unwrap().len();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn read_only_requests_refuse_mutations_and_injected_failures_surface() {
        let exec = MemoryExecutor::new();
        let mut req = upsert_entity("a");
        req.read_only = true;
        assert!(exec.execute(req).await.is_err());

        exec.fail_next(ExecutorError::Transport("down".into()));
        assert_eq!(
            exec.execute(upsert_entity("a")).await,
            Err(ExecutorError::Transport("down".into()))
        );
        assert!(exec.execute(upsert_entity("a")).await.is_ok());
    }
}
