//! Persisted predicate names and the store schema.

/// External (natural) id of every node.
pub const XID: &str = "xid";
/// Type tag predicate.
pub const TYPE: &str = "dgraph.type";
/// Entity → resource edge.
pub const RESOURCE: &str = "resource";
/// Entity → entity edge.
pub const LINKS: &str = "links";
/// Node → attribute edge; each attribute is its own `Attr` node.
pub const ATTRS: &str = "attrs";
pub const KEY: &str = "key";
pub const VALUE: &str = "value";
/// Type tag of attribute nodes.
pub const ATTR: &str = "Attr";
pub const RELATION_FACET: &str = "links|relation";
pub const WEIGHT_FACET: &str = "links|weight";

/// Fields returned for a [`Selection::Node`](crate::query::Selection::Node) block.
pub(crate) const NODE_SELECTION: &str = "    xid
    name
    namespace
    group
    version
    kind
    namespaced
    attrs {
      key
      value
    }
    dgraph.type
    resource {
      uid
      xid
      name
      group
      version
      kind
      namespaced
      attrs {
        key
        value
      }
      dgraph.type
    }
    links @facets(relation, weight) {
      uid
      xid
      dgraph.type
    }
";

/// Schema to install before first use.
pub const SCHEMA: &str = r#"xid: string @index(exact) @upsert .
name: string @index(exact) .
namespace: string @index(exact) .
group: string @index(exact) .
version: string @index(exact) .
kind: string @index(exact) .
namespaced: bool .
attrs: [uid] @count .
key: string @index(exact) .
value: string .
resource: uid @reverse @count .
links: [uid] @reverse @count .

type Resource {
  xid
  name
  group
  version
  kind
  namespaced
  attrs
}

type Entity {
  xid
  name
  namespace
  resource
  attrs
  links
}

type Attr {
  xid
  key
  value
}
"#;
