//! Turn query rows back into domain objects, dispatching on the type tag.

use crate::nodes::{attr_map, EntityNode, ResourceNode};
use crate::schema;
use netscrape_space::{
    Attrs, Entity, LinkOptions, Object, ObjectKind, Resource, StoreError, Uid, DEFAULT_RELATION,
    DEFAULT_WEIGHT,
};
use serde_json::Value;

/// Decode the single row stored under `uid`.
pub fn decode_object(uid: &Uid, rows: &[Value]) -> Result<Object, StoreError> {
    let row = match rows {
        [] => return Err(StoreError::NotFound(uid.clone())),
        [row] => row,
        _ => {
            return Err(StoreError::DuplicateNode {
                uid: uid.clone(),
                count: rows.len(),
            })
        }
    };
    match kind_of(row)? {
        ObjectKind::Resource => {
            let node: ResourceNode = serde_json::from_value(row.clone())?;
            Ok(Object::Resource(resource_from_node(node)?))
        }
        ObjectKind::Entity => {
            let node: EntityNode = serde_json::from_value(row.clone())?;
            Ok(Object::Entity(entity_from_node(node)?))
        }
    }
}

fn kind_of(row: &Value) -> Result<ObjectKind, StoreError> {
    let tags: Vec<&str> = match row.get(schema::TYPE) {
        Some(Value::Array(tags)) => tags.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(tag)) => vec![tag.as_str()],
        _ => Vec::new(),
    };
    tags.iter()
        .find_map(|t| t.parse::<ObjectKind>().ok())
        .ok_or_else(|| StoreError::Unsupported(format!("type tags {tags:?}")))
}

fn required(field: Option<String>, what: &str) -> Result<String, StoreError> {
    field.ok_or_else(|| StoreError::Unsupported(format!("stored node without {what}")))
}

fn resource_from_node(node: ResourceNode) -> Result<Resource, StoreError> {
    let xid = required(node.xid, schema::XID)?;
    let resource = Resource::new(
        required(node.name, "name")?,
        node.group.unwrap_or_default(),
        node.version.unwrap_or_default(),
        node.kind.unwrap_or_default(),
        node.namespaced.unwrap_or(false),
    )?
    .with_uid(Uid::from_external(xid)?)
    .with_attrs(Attrs::from(attr_map(node.attrs)));
    Ok(resource)
}

fn entity_from_node(node: EntityNode) -> Result<Entity, StoreError> {
    let xid = Uid::from_external(required(node.xid, schema::XID)?)?;
    let resource = node
        .resource
        .ok_or_else(|| StoreError::Unsupported(format!("entity {xid} without resource")))?;
    let mut entity = Entity::new(
        required(node.name, "name")?,
        node.namespace.unwrap_or_default(),
        resource_from_node(resource)?,
    )?
    .with_uid(xid)
    .with_attrs(Attrs::from(attr_map(node.attrs)));

    for link in node.links {
        let to = Uid::from_external(required(link.xid, "link target")?)?;
        let opts = LinkOptions::relation(link.relation.unwrap_or_else(|| DEFAULT_RELATION.into()))
            .with_weight(link.weight.unwrap_or(DEFAULT_WEIGHT));
        entity.link(to, opts);
    }
    Ok(entity)
}
