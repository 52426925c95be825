//! netscrape store: the topology over a transactional graph database
//!
//! ```text
//! ┌──────────────┐  Request { query, mutations }   ┌────────────────────┐
//! │  Store<E>    │ ──────────────────────────────► │  E: Executor       │
//! │  (Topology)  │                                 │  DQL client or     │
//! │              │ ◄────────────────────────────── │  MemoryExecutor    │
//! └──────────────┘  Response { rows, blank uids }  └────────────────────┘
//! ```
//!
//! Each topology operation is one request. The query looks nodes up by
//! external id and binds variables; mutations are gated on those variables
//! with `@if(...)`, so existence checks and writes commit together.

pub mod decode;
pub mod executor;
pub mod memory;
pub mod nodes;
pub mod query;
pub mod request;
pub mod schema;
pub mod store;

pub use executor::{Executor, ExecutorError};
pub use memory::MemoryExecutor;
pub use query::{Cond, Filter, Query, QueryBuilder, Selection};
pub use request::{Mutation, Op, Request, Response};
pub use schema::SCHEMA;
pub use store::Store;
