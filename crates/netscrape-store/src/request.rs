//! Atomic request envelope: one query, then conditional mutations.

use crate::query::{Cond, Query};
use netscrape_space::StoreError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Store operation a mutation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Delete,
    Get,
    Link,
    Unlink,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Add => "add",
            Op::Delete => "delete",
            Op::Get => "get",
            Op::Link => "link",
            Op::Unlink => "unlink",
        };
        f.write_str(s)
    }
}

/// A JSON mutation, optionally gated by a condition over query variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub cond: Option<Cond>,
    pub set_json: Option<Value>,
    pub delete_json: Option<Value>,
}

impl Mutation {
    /// Encode `payload` as set JSON (add, link) or delete JSON (delete, unlink).
    pub fn for_op<T: Serialize>(
        op: Op,
        payload: &T,
        cond: Option<Cond>,
    ) -> Result<Self, StoreError> {
        let json = serde_json::to_value(payload)?;
        let (set_json, delete_json) = match op {
            Op::Add | Op::Link => (Some(json), None),
            Op::Delete | Op::Unlink => (None, Some(json)),
            Op::Get => {
                return Err(StoreError::Unsupported(format!("{op} carries no mutation")));
            }
        };
        Ok(Self {
            cond,
            set_json,
            delete_json,
        })
    }
}

/// What an [`Executor`](crate::Executor) runs atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub query: Query,
    pub mutations: Vec<Mutation>,
    pub commit_now: bool,
    pub read_only: bool,
}

impl Request {
    /// Query plus mutations, committed immediately.
    pub fn upsert(query: Query, mutations: Vec<Mutation>) -> Self {
        Self {
            query,
            mutations,
            commit_now: true,
            read_only: false,
        }
    }

    pub fn read(query: Query) -> Self {
        Self {
            query,
            mutations: Vec::new(),
            commit_now: false,
            read_only: true,
        }
    }
}

/// Result of a request: named query blocks and blank-node allocations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub json: Value,
    pub uids: BTreeMap<String, String>,
}

impl Response {
    /// Rows returned under a named block; empty when the block matched nothing.
    pub fn rows(&self, block: &str) -> &[Value] {
        self.json
            .get(block)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
