//! netscrape space: the typed graph model
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          TOPOLOGY                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │   Plan ──registers──► Resource ("repo", "topic", ...)        │
//! │                          ▲                                   │
//! │                          │ typed by                          │
//! │                          │                                   │
//! │   Entity ──Link{relation, weight}──► Entity                  │
//! │     uid = lowercase(name) + "-" + resource                   │
//! │        | external id (e.g. GitHub node id)                   │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identity is deterministic ([`Uid`]), so concurrent writers that observe the
//! same record merge into one node instead of duplicating it.

pub mod attrs;
pub mod entity;
pub mod error;
pub mod object;
pub mod plan;
pub mod resource;
pub mod topology;
pub mod uid;

pub use attrs::Attrs;
pub use entity::{Entity, Link, LinkOptions, DEFAULT_RELATION, DEFAULT_WEIGHT};
pub use error::{SpaceError, StoreError};
pub use object::{Object, ObjectKind};
pub use plan::{Plan, ResourceQuery};
pub use resource::Resource;
pub use topology::{
    AddOptions, MemoryTopology, Snapshot, SnapshotEdge, SnapshotNode, Stats, Topology,
};
pub use uid::Uid;
