//! [`Topology`] over an [`Executor`].
//!
//! Every operation is a single request: lookup blocks bind variables, and
//! each mutation is gated with `@if(...)` on those variables, so the decision
//! and the write happen in the same transaction.

use crate::decode::decode_object;
use crate::executor::Executor;
use crate::nodes::{attr_xid, var_ref, AttrNode, EntityNode, ResourceNode};
use crate::query::{Cond, Filter, Query, QueryBuilder, Selection};
use crate::request::{Mutation, Op, Request, Response};
use crate::schema;
use async_trait::async_trait;
use netscrape_space::{
    AddOptions, Attrs, Entity, LinkOptions, Object, ObjectKind, Resource, StoreError, Topology,
    Uid,
};
use std::sync::Arc;

const NODE: &str = "node";
const CLASH: &str = "clash";
const RESOURCE: &str = "resource";
const RESOURCE_CLASH: &str = "resource_clash";
const TARGET: &str = "target";

/// Bind one `{prefix}{i}` variable per attribute of `owner` and return the
/// attribute payloads addressed through them.
fn attr_nodes(
    q: &mut QueryBuilder,
    owner: &Uid,
    attrs: &Attrs,
    prefix: &str,
) -> Result<Vec<AttrNode>, StoreError> {
    let mut nodes = Vec::with_capacity(attrs.len());
    for (i, (key, value)) in attrs.iter().enumerate() {
        let xid = attr_xid(owner, key)?;
        let var = format!("{prefix}{i}");
        q.bind(&var, &xid, None);
        nodes.push(AttrNode {
            uid: Some(var_ref(&var)),
            xid: Some(xid.to_string()),
            key: Some(key.to_string()),
            value: Some(value.to_string()),
            types: vec![schema::ATTR.to_string()],
        });
    }
    Ok(nodes)
}

fn resource_payload(r: &Resource, handle: String, attrs: Vec<AttrNode>) -> ResourceNode {
    ResourceNode {
        uid: Some(handle),
        xid: Some(r.uid().to_string()),
        name: Some(r.name().to_string()),
        group: Some(r.group().to_string()),
        version: Some(r.version().to_string()),
        kind: Some(r.kind().to_string()),
        namespaced: Some(r.namespaced()),
        attrs,
        types: vec![ObjectKind::Resource.to_string()],
    }
}

/// Store adapter. Cheap to clone; clones share the executor.
#[derive(Debug)]
pub struct Store<E> {
    executor: Arc<E>,
}

impl<E> Clone for Store<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<E: Executor> Store<E> {
    pub fn new(executor: E) -> Self {
        Self::from_shared(Arc::new(executor))
    }

    pub fn from_shared(executor: Arc<E>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    async fn run(&self, op: Op, uid: &Uid, request: Request) -> Result<Response, StoreError> {
        tracing::trace!(%op, %uid, query = %request.query.render(), "store request");
        Ok(self.executor.execute(request).await?)
    }

    fn add_resource_request(r: &Resource) -> Result<Request, StoreError> {
        let mut q = Query::builder();
        q.named(NODE, Some("r"), r.uid(), Some(Filter::is(ObjectKind::Resource)), Selection::Uid)
            .named(
                CLASH,
                Some("c"),
                r.uid(),
                Some(Filter::is(ObjectKind::Resource).not()),
                Selection::Uid,
            );
        let attrs = attr_nodes(&mut q, r.uid(), r.attrs(), "a")?;
        let set = Mutation::for_op(
            Op::Add,
            &resource_payload(r, var_ref("r"), attrs),
            Some(Cond::All(vec![Cond::empty("c"), Cond::at_most_one("r")])),
        )?;
        Ok(Request::upsert(q.build(), vec![set]))
    }

    fn add_entity_request(e: &Entity, opts: AddOptions) -> Result<Request, StoreError> {
        let resource = e.resource();
        let mut q = Query::builder();
        q.named(NODE, Some("e"), e.uid(), Some(Filter::is(ObjectKind::Entity)), Selection::Uid)
            .named(
                CLASH,
                Some("c"),
                e.uid(),
                Some(Filter::is(ObjectKind::Entity).not()),
                Selection::Uid,
            )
            .named(
                RESOURCE,
                Some("r"),
                resource.uid(),
                Some(Filter::is(ObjectKind::Resource)),
                Selection::Uid,
            )
            .named(
                RESOURCE_CLASH,
                Some("rc"),
                resource.uid(),
                Some(Filter::is(ObjectKind::Resource).not()),
                Selection::Uid,
            );

        let resource_attrs = attr_nodes(&mut q, resource.uid(), resource.attrs(), "ra")?;
        let attrs = attr_nodes(&mut q, e.uid(), e.attrs(), "a")?;

        // Nothing is written when either uid already matches duplicates.
        let guard = || {
            vec![
                Cond::empty("c"),
                Cond::empty("rc"),
                Cond::at_most_one("e"),
                Cond::at_most_one("r"),
            ]
        };
        let mut mutations = Vec::new();

        // Descriptor first, only when absent; later mutations see it via uid(r).
        let mut create_resource = guard();
        create_resource.push(Cond::empty("r"));
        mutations.push(Mutation::for_op(
            Op::Add,
            &resource_payload(resource, var_ref("r"), resource_attrs),
            Some(Cond::All(create_resource)),
        )?);

        if !opts.merge_links {
            let mut existing = guard();
            existing.push(Cond::non_empty("e"));
            mutations.push(Mutation::for_op(
                Op::Delete,
                &serde_json::json!({ "uid": var_ref("e"), "links": null }),
                Some(Cond::All(existing)),
            )?);
        }

        let node = EntityNode {
            uid: Some(var_ref("e")),
            xid: Some(e.uid().to_string()),
            name: Some(e.name().to_string()),
            namespace: Some(e.namespace().to_string()),
            resource: Some(ResourceNode {
                uid: Some(var_ref("r")),
                ..ResourceNode::default()
            }),
            attrs,
            types: vec![ObjectKind::Entity.to_string()],
            ..EntityNode::default()
        };
        mutations.push(Mutation::for_op(Op::Add, &node, Some(Cond::All(guard())))?);

        for (i, link) in e.links().iter().enumerate() {
            let mut cond = guard();
            let target = if &link.to == e.uid() {
                "e".to_string()
            } else {
                let var = format!("l{i}");
                q.bind(&var, &link.to, Some(Filter::is(ObjectKind::Entity)));
                cond.push(Cond::non_empty(&var));
                var
            };
            let mut edge = EntityNode::handle(var_ref("e"));
            edge.links.push(EntityNode {
                relation: Some(link.relation.clone()),
                weight: Some(link.weight),
                ..EntityNode::handle(var_ref(&target))
            });
            mutations.push(Mutation::for_op(Op::Add, &edge, Some(Cond::All(cond)))?);
        }

        Ok(Request::upsert(q.build(), mutations))
    }

    fn edge_request(
        op: Op,
        from: &Uid,
        to: &Uid,
        opts: Option<LinkOptions>,
    ) -> Result<Request, StoreError> {
        let mut q = Query::builder();
        q.bind("from", from, Some(Filter::is(ObjectKind::Entity)))
            .bind("to", to, Some(Filter::is(ObjectKind::Entity)));
        let mut target = EntityNode::handle(var_ref("to"));
        if let Some(opts) = opts {
            target.relation = Some(opts.relation);
            target.weight = Some(opts.weight);
        }
        let mut edge = EntityNode::handle(var_ref("from"));
        edge.links.push(target);
        let cond = Cond::All(vec![Cond::non_empty("from"), Cond::non_empty("to")]);
        Ok(Request::upsert(
            q.build(),
            vec![Mutation::for_op(op, &edge, Some(cond))?],
        ))
    }
}

#[async_trait]
impl<E: Executor> Topology for Store<E> {
    async fn add(&self, object: Object, opts: AddOptions) -> Result<(), StoreError> {
        let uid = object.uid().clone();
        let request = match &object {
            Object::Resource(r) => Self::add_resource_request(r)?,
            Object::Entity(e) => Self::add_entity_request(e, opts)?,
        };
        let resp = self.run(Op::Add, &uid, request).await?;

        let count = resp.rows(NODE).len();
        if count > 1 {
            return Err(StoreError::DuplicateNode { uid, count });
        }
        if let Object::Entity(e) = &object {
            let count = resp.rows(RESOURCE).len();
            if count > 1 {
                return Err(StoreError::DuplicateNode {
                    uid: e.resource().uid().clone(),
                    count,
                });
            }
        }
        if !resp.rows(CLASH).is_empty() {
            return Err(StoreError::precondition(
                &uid,
                format!("uid already names a node that is not a {}", object.kind()),
            ));
        }
        if let Object::Entity(e) = &object {
            if !resp.rows(RESOURCE_CLASH).is_empty() {
                return Err(StoreError::precondition(
                    e.resource().uid(),
                    "resource uid names a node that is not a Resource",
                ));
            }
        }
        Ok(())
    }

    async fn link(&self, from: &Uid, to: &Uid, opts: LinkOptions) -> Result<(), StoreError> {
        let request = Self::edge_request(Op::Link, from, to, Some(opts))?;
        self.run(Op::Link, from, request).await?;
        Ok(())
    }

    async fn unlink(&self, from: &Uid, to: &Uid) -> Result<(), StoreError> {
        let request = Self::edge_request(Op::Unlink, from, to, None)?;
        self.run(Op::Unlink, from, request).await?;
        Ok(())
    }

    async fn get(&self, uid: &Uid) -> Result<Object, StoreError> {
        let mut q = Query::builder();
        q.named(NODE, None, uid, None, Selection::Node);
        let resp = self.run(Op::Get, uid, Request::read(q.build())).await?;
        decode_object(uid, resp.rows(NODE))
    }

    async fn delete(&self, uid: &Uid) -> Result<(), StoreError> {
        let mut q = Query::builder();
        q.named(
            NODE,
            Some("u"),
            uid,
            Some(Filter::is(ObjectKind::Resource).not().or(Filter::NoInstances)),
            Selection::Uid,
        )
        .named(TARGET, Some("t"), uid, None, Selection::Uid);
        let del = Mutation::for_op(
            Op::Delete,
            &serde_json::json!({ "uid": var_ref("u") }),
            Some(Cond::All(vec![Cond::non_empty("u"), Cond::at_most_one("t")])),
        )?;
        let resp = self
            .run(Op::Delete, uid, Request::upsert(q.build(), vec![del]))
            .await?;

        match resp.rows(TARGET).len() {
            0 => Ok(()),
            1 if resp.rows(NODE).is_empty() => Err(StoreError::precondition(
                uid,
                "resource still has instances",
            )),
            1 => Ok(()),
            count => Err(StoreError::DuplicateNode {
                uid: uid.clone(),
                count,
            }),
        }
    }
}
