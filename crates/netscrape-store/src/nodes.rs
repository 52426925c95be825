//! Wire shapes of persisted nodes.
//!
//! Every field is optional so the same structs serve as mutation payloads
//! (only what is being written) and as decoded query rows.

use netscrape_space::{SpaceError, Uid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `uid(var)` reference to a node bound in the request's query.
pub fn var_ref(var: &str) -> String {
    format!("uid({var})")
}

/// External id of the `key` attribute node of `owner`.
pub fn attr_xid(owner: &Uid, key: &str) -> Result<Uid, SpaceError> {
    Uid::from_external(format!("{owner}/attrs/{key}"))
}

/// One attribute, stored as its own node so that writing a key replaces
/// only that key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "dgraph.type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

/// Key/value pairs of decoded attribute rows; rows missing either half are skipped.
pub fn attr_map(nodes: Vec<AttrNode>) -> BTreeMap<String, String> {
    nodes
        .into_iter()
        .filter_map(|a| Some((a.key?, a.value?)))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaced: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<AttrNode>,
    #[serde(rename = "dgraph.type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<AttrNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<EntityNode>,
    #[serde(rename = "dgraph.type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(rename = "links|relation", default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(rename = "links|weight", default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl EntityNode {
    /// A node referenced only by handle.
    pub fn handle(uid: String) -> Self {
        Self {
            uid: Some(uid),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn facets_and_type_tags_use_wire_names() {
        let mut from = EntityNode::handle(var_ref("from"));
        from.links.push(EntityNode {
            relation: Some("owns".into()),
            weight: Some(1.0),
            ..EntityNode::handle(var_ref("to"))
        });
        let v = serde_json::to_value(&from).unwrap();
        assert_eq!(
            v,
            json!({
                "uid": "uid(from)",
                "links": [{"uid": "uid(to)", "links|relation": "owns", "links|weight": 1.0}]
            })
        );

        let decoded: ResourceNode =
            serde_json::from_value(json!({"xid": "r", "dgraph.type": ["Resource"]})).unwrap();
        assert_eq!(decoded.types, vec!["Resource".to_string()]);
    }

    #[test]
    fn attrs_decode_from_child_rows() {
        let decoded: EntityNode = serde_json::from_value(json!({
            "xid": "R_1",
            "attrs": [
                {"uid": "0x7", "key": "git_url", "value": "git://x"},
                {"uid": "0x8", "key": "orphan"}
            ]
        }))
        .unwrap();
        let attrs = attr_map(decoded.attrs);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["git_url"], "git://x");

        let owner = Uid::from_external("R_1").unwrap();
        assert_eq!(attr_xid(&owner, "git_url").unwrap().as_str(), "R_1/attrs/git_url");
    }
}
