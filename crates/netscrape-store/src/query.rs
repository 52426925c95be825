//! Parameterized query builder.
//!
//! Queries are built as a small IR of lookup blocks. Every untrusted value
//! (an external id) becomes a `$pN` variable; [`Query::render`] only ever
//! emits identifiers chosen by this crate, so the DQL text cannot be steered
//! by input. Executors either send `render()` + `variables()` to a database,
//! or evaluate the IR directly (see [`MemoryExecutor`](crate::MemoryExecutor)).

use crate::schema;
use netscrape_space::{ObjectKind, Uid};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A query variable reference (`$p0`, `$p1`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Param(String);

impl Param {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Root function of a block. Only exact external-id lookups are needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Func {
    EqXid(Param),
}

/// `@filter(...)` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Type(ObjectKind),
    /// `eq(count(~resource), 0)`: a resource node with no instances.
    NoInstances,
    Not(Box<Filter>),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    pub fn is(kind: ObjectKind) -> Self {
        Filter::Type(kind)
    }

    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }

    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    fn render(&self, out: &mut String) {
        match self {
            Filter::Type(kind) => {
                let _ = write!(out, "type({})", kind.as_str());
            }
            Filter::NoInstances => {
                let _ = write!(out, "eq(count(~{}), 0)", schema::RESOURCE);
            }
            Filter::Not(inner) => {
                out.push_str("NOT ");
                inner.render_grouped(out);
            }
            Filter::And(a, b) => {
                a.render_grouped(out);
                out.push_str(" AND ");
                b.render_grouped(out);
            }
            Filter::Or(a, b) => {
                a.render_grouped(out);
                out.push_str(" OR ");
                b.render_grouped(out);
            }
        }
    }

    fn render_grouped(&self, out: &mut String) {
        match self {
            Filter::And(..) | Filter::Or(..) => {
                out.push('(');
                self.render(out);
                out.push(')');
            }
            _ => self.render(out),
        }
    }
}

/// What a block returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Only the node handle (enough to bind a variable or count matches).
    Uid,
    /// The node, its resource and its outgoing links with facets.
    Node,
}

/// How a block appears in the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// Returned under this key.
    Named(String),
    /// `var(...)`: binds variables, returns nothing.
    Var,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub label: Label,
    pub bind: Option<String>,
    pub func: Func,
    pub filter: Option<Filter>,
    pub select: Selection,
}

/// A read query: lookup blocks plus their variable values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    blocks: Vec<Block>,
    params: BTreeMap<Param, String>,
}

impl Query {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Value bound to `param`.
    pub fn value(&self, param: &Param) -> Option<&str> {
        self.params.get(param).map(String::as_str)
    }

    /// Variables map to send alongside [`Query::render`].
    pub fn variables(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .map(|(p, v)| (p.0.clone(), v.clone()))
            .collect()
    }

    /// DQL text with `$pN` placeholders.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.params.is_empty() {
            out.push_str("{\n");
        } else {
            let decls: Vec<String> = self
                .params
                .keys()
                .map(|p| format!("{}: string", p.0))
                .collect();
            let _ = writeln!(out, "query q({}) {{", decls.join(", "));
        }
        for block in &self.blocks {
            render_block(block, &mut out);
        }
        out.push('}');
        out
    }
}

fn render_block(block: &Block, out: &mut String) {
    let label = match &block.label {
        Label::Named(name) => name.as_str(),
        Label::Var => "var",
    };
    let Func::EqXid(param) = &block.func;
    let _ = write!(out, "  {label}(func: eq({}, {}))", schema::XID, param.0);
    if let Some(filter) = &block.filter {
        out.push_str(" @filter(");
        filter.render(out);
        out.push(')');
    }
    out.push_str(" {\n");
    match &block.bind {
        Some(var) => {
            let _ = writeln!(out, "    {var} as uid");
        }
        None => out.push_str("    uid\n"),
    }
    if block.select == Selection::Node {
        out.push_str(schema::NODE_SELECTION);
    }
    out.push_str("  }\n");
}

/// Accumulates blocks and allocates a fresh variable per untrusted value.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    blocks: Vec<Block>,
    params: BTreeMap<Param, String>,
}

impl QueryBuilder {
    fn param(&mut self, value: &Uid) -> Param {
        let param = Param(format!("$p{}", self.params.len()));
        self.params.insert(param.clone(), value.as_str().to_string());
        param
    }

    /// `var(func: eq(xid, $pN)) @filter(..) { <var> as uid }`
    pub fn bind(&mut self, var: &str, xid: &Uid, filter: Option<Filter>) -> &mut Self {
        let param = self.param(xid);
        self.blocks.push(Block {
            label: Label::Var,
            bind: Some(var.to_string()),
            func: Func::EqXid(param),
            filter,
            select: Selection::Uid,
        });
        self
    }

    /// A block returned in the response under `label`, optionally binding `var`.
    pub fn named(
        &mut self,
        label: &str,
        var: Option<&str>,
        xid: &Uid,
        filter: Option<Filter>,
        select: Selection,
    ) -> &mut Self {
        let param = self.param(xid);
        self.blocks.push(Block {
            label: Label::Named(label.to_string()),
            bind: var.map(str::to_string),
            func: Func::EqXid(param),
            filter,
            select,
        });
        self
    }

    pub fn build(self) -> Query {
        Query {
            blocks: self.blocks,
            params: self.params,
        }
    }
}

/// Condition gating a mutation on the cardinality of bound variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cond {
    /// `gt(len(v), 0)`
    NonEmpty(String),
    /// `eq(len(v), 0)`
    Empty(String),
    /// `le(len(v), 1)`: the variable did not match duplicates.
    AtMostOne(String),
    All(Vec<Cond>),
}

impl Cond {
    pub fn non_empty(var: &str) -> Self {
        Cond::NonEmpty(var.to_string())
    }

    pub fn empty(var: &str) -> Self {
        Cond::Empty(var.to_string())
    }

    pub fn at_most_one(var: &str) -> Self {
        Cond::AtMostOne(var.to_string())
    }

    /// `@if(...)` text.
    pub fn render(&self) -> String {
        format!("@if({})", self.render_expr())
    }

    fn render_expr(&self) -> String {
        match self {
            Cond::NonEmpty(v) => format!("gt(len({v}), 0)"),
            Cond::Empty(v) => format!("eq(len({v}), 0)"),
            Cond::AtMostOne(v) => format!("le(len({v}), 1)"),
            Cond::All(conds) => conds
                .iter()
                .map(Cond::render_expr)
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }

    /// Evaluate against the number of uids bound to each variable.
    pub fn holds(&self, len: &dyn Fn(&str) -> usize) -> bool {
        match self {
            Cond::NonEmpty(v) => len(v) > 0,
            Cond::Empty(v) => len(v) == 0,
            Cond::AtMostOne(v) => len(v) <= 1,
            Cond::All(conds) => conds.iter().all(|c| c.holds(len)),
        }
    }
}
