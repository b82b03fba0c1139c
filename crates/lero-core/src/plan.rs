//! # Plan and Access-Path Types
//!
//! This module defines the two tree shapes the exploration engine exchanges with the
//! host planner.
//!
//! ## Access Paths (`AccessPath`)
//! An access path is the host's candidate strategy for producing a relation *before*
//! the plan is finalized. The host passes the cheapest path of each join input to the
//! join-estimation hook, and the recording round walks it to find out which base tables
//! feed the join.
//!
//! ## Finalized Plans (`PlannedStatement`, `PlanNode`, `PlanOp`)
//! A finalized plan is what the host's planning entry point returns. Scan nodes refer
//! to relations indirectly, through an index into the statement's range table, the same
//! way the host's executor does. Each node carries the host's row, width and cost
//! estimates.
//!
//! ## Closed Operator Sets
//! Both `PlanOp` and `AccessPath` are closed enums. Operators the engine understands get
//! a dedicated variant carrying only the fields that matter to it. Operators that are
//! valid in the host but not described to the scoring service are grouped under
//! `UnhandledKind`, so an operator outside the host's vocabulary cannot be constructed
//! at all.

use std::fmt;

/// The host's internal identifier for a relation or an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelId(pub u32);

impl fmt::Display for RelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a statement's range table: the relation a scan reads and the alias it
/// was given in the query text.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeTableEntry {
    pub relation: RelId,
    pub alias: String,
}

impl RangeTableEntry {
    pub fn new(relation: RelId, alias: impl Into<String>) -> Self {
        Self {
            relation,
            alias: alias.into(),
        }
    }
}

/// A finalized plan as returned by the host's planning entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStatement {
    pub root: PlanNode,
    /// Relations referenced by scan nodes. Scan nodes store a zero-based index into
    /// this list.
    pub range_table: Vec<RangeTableEntry>,
}

impl PlannedStatement {
    pub fn new(root: PlanNode, range_table: Vec<RangeTableEntry>) -> Self {
        Self { root, range_table }
    }

    pub fn range_entry(&self, scan: usize) -> Option<&RangeTableEntry> {
        self.range_table.get(scan)
    }
}

/// A node of a finalized plan: the operator plus the host's estimates for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub op: PlanOp,
    /// Estimated output rows.
    pub rows: f64,
    /// Estimated average output row width in bytes.
    pub width: i32,
    pub startup_cost: f64,
    pub total_cost: f64,
}

impl PlanNode {
    pub fn new(op: PlanOp, rows: f64, width: i32, startup_cost: f64, total_cost: f64) -> Self {
        Self {
            op,
            rows,
            width,
            startup_cost,
            total_cost,
        }
    }

    /// Direct children in plan order (outer before inner for joins).
    pub fn children(&self) -> Vec<&PlanNode> {
        match &self.op {
            PlanOp::SeqScan { .. }
            | PlanOp::IndexScan { .. }
            | PlanOp::IndexOnlyScan { .. }
            | PlanOp::BitmapIndexScan { .. }
            | PlanOp::BitmapHeapScan { .. } => vec![],
            PlanOp::HashJoin { outer, inner }
            | PlanOp::MergeJoin { outer, inner }
            | PlanOp::NestedLoop { outer, inner } => vec![outer.as_ref(), inner.as_ref()],
            PlanOp::Hash { input }
            | PlanOp::Materialize { input }
            | PlanOp::Sort { input }
            | PlanOp::Aggregate { input }
            | PlanOp::IncrementalSort { input }
            | PlanOp::Limit { input } => vec![input.as_ref()],
            PlanOp::Unhandled { children, .. } => children.iter().collect(),
        }
    }
}

/// Finalized plan operators.
///
/// `scan` fields are zero-based indexes into `PlannedStatement::range_table`; `index`
/// fields are catalog identifiers of the index being used.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOp {
    SeqScan {
        scan: usize,
    },
    IndexScan {
        scan: usize,
        index: RelId,
    },
    IndexOnlyScan {
        scan: usize,
        index: RelId,
    },
    /// Produces a bitmap for a parent `BitmapHeapScan`; it names only its index.
    BitmapIndexScan {
        index: RelId,
    },
    BitmapHeapScan {
        scan: usize,
    },
    HashJoin {
        outer: Box<PlanNode>,
        inner: Box<PlanNode>,
    },
    MergeJoin {
        outer: Box<PlanNode>,
        inner: Box<PlanNode>,
    },
    NestedLoop {
        outer: Box<PlanNode>,
        inner: Box<PlanNode>,
    },
    /// Hash-table build feeding the inner side of a hash join.
    Hash {
        input: Box<PlanNode>,
    },
    Materialize {
        input: Box<PlanNode>,
    },
    Sort {
        input: Box<PlanNode>,
    },
    Aggregate {
        input: Box<PlanNode>,
    },
    IncrementalSort {
        input: Box<PlanNode>,
    },
    Limit {
        input: Box<PlanNode>,
    },
    /// A valid host operator that is not described to the scoring service beyond its
    /// label and estimates.
    Unhandled {
        kind: UnhandledKind,
        children: Vec<PlanNode>,
    },
}

impl PlanOp {
    /// The host's EXPLAIN label for this operator.
    pub fn label(&self) -> &'static str {
        match self {
            PlanOp::SeqScan { .. } => "Seq Scan",
            PlanOp::IndexScan { .. } => "Index Scan",
            PlanOp::IndexOnlyScan { .. } => "Index Only Scan",
            PlanOp::BitmapIndexScan { .. } => "Bitmap Index Scan",
            PlanOp::BitmapHeapScan { .. } => "Bitmap Heap Scan",
            PlanOp::HashJoin { .. } => "Hash Join",
            PlanOp::MergeJoin { .. } => "Merge Join",
            PlanOp::NestedLoop { .. } => "Nested Loop",
            PlanOp::Hash { .. } => "Hash",
            PlanOp::Materialize { .. } => "Materialize",
            PlanOp::Sort { .. } => "Sort",
            PlanOp::Aggregate { .. } => "Aggregate",
            PlanOp::IncrementalSort { .. } => "Incremental Sort",
            PlanOp::Limit { .. } => "Limit",
            PlanOp::Unhandled { kind, .. } => kind.label(),
        }
    }
}

/// Host operators that are valid but carry no type-specific description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnhandledKind {
    SampleScan,
    TidScan,
    SubqueryScan,
    FunctionScan,
    TableFuncScan,
    ValuesScan,
    CteScan,
    WorkTableScan,
    NamedTuplestoreScan,
    ForeignScan,
    CustomScan,
    Append,
    MergeAppend,
    Result,
    ProjectSet,
    Unique,
    Gather,
    Group,
    WindowAgg,
    RecursiveUnion,
    LockRows,
    ModifyTable,
    GatherMerge,
}

impl UnhandledKind {
    pub fn label(&self) -> &'static str {
        match self {
            UnhandledKind::SampleScan => "Sample Scan",
            UnhandledKind::TidScan => "Tid Scan",
            UnhandledKind::SubqueryScan => "Subquery Scan",
            UnhandledKind::FunctionScan => "Function Scan",
            UnhandledKind::TableFuncScan => "Table Function Scan",
            UnhandledKind::ValuesScan => "Values Scan",
            UnhandledKind::CteScan => "CTE Scan",
            UnhandledKind::WorkTableScan => "WorkTable Scan",
            UnhandledKind::NamedTuplestoreScan => "Named Tuplestore Scan",
            UnhandledKind::ForeignScan => "Foreign Scan",
            UnhandledKind::CustomScan => "Custom Scan",
            UnhandledKind::Append => "Append",
            UnhandledKind::MergeAppend => "Merge Append",
            UnhandledKind::Result => "Result",
            UnhandledKind::ProjectSet => "ProjectSet",
            UnhandledKind::Unique => "Unique",
            UnhandledKind::Gather => "Gather",
            UnhandledKind::Group => "Group",
            UnhandledKind::WindowAgg => "WindowAgg",
            UnhandledKind::RecursiveUnion => "Recursive Union",
            UnhandledKind::LockRows => "LockRows",
            UnhandledKind::ModifyTable => "ModifyTable",
            UnhandledKind::GatherMerge => "Gather Merge",
        }
    }
}

/// Scan strategies that read a single base relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanKind {
    Seq,
    Index,
    IndexOnly,
    BitmapHeap,
}

/// Physical join algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Hash,
    Merge,
    NestedLoop,
}

/// The host's pre-finalization strategy for producing a relation.
///
/// Unlike finalized scans, path scans name their relation directly.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessPath {
    Scan {
        kind: ScanKind,
        relation: RelId,
    },
    Join {
        kind: JoinKind,
        outer: Box<AccessPath>,
        inner: Box<AccessPath>,
    },
    Materialize {
        sub: Box<AccessPath>,
    },
    Sort {
        sub: Box<AccessPath>,
    },
    Aggregate {
        sub: Box<AccessPath>,
    },
    IncrementalSort {
        sub: Box<AccessPath>,
    },
    Limit {
        sub: Box<AccessPath>,
    },
    Unhandled(UnhandledKind),
}

impl AccessPath {
    pub fn scan(kind: ScanKind, relation: RelId) -> Self {
        AccessPath::Scan { kind, relation }
    }

    pub fn join(kind: JoinKind, outer: AccessPath, inner: AccessPath) -> Self {
        AccessPath::Join {
            kind,
            outer: Box::new(outer),
            inner: Box::new(inner),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccessPath::Scan { kind, .. } => match kind {
                ScanKind::Seq => "Seq Scan",
                ScanKind::Index => "Index Scan",
                ScanKind::IndexOnly => "Index Only Scan",
                ScanKind::BitmapHeap => "Bitmap Heap Scan",
            },
            AccessPath::Join { kind, .. } => match kind {
                JoinKind::Hash => "Hash Join",
                JoinKind::Merge => "Merge Join",
                JoinKind::NestedLoop => "Nested Loop",
            },
            AccessPath::Materialize { .. } => "Materialize",
            AccessPath::Sort { .. } => "Sort",
            AccessPath::Aggregate { .. } => "Aggregate",
            AccessPath::IncrementalSort { .. } => "Incremental Sort",
            AccessPath::Limit { .. } => "Limit",
            AccessPath::Unhandled(kind) => kind.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_children_are_outer_then_inner() {
        let outer = PlanNode::new(PlanOp::SeqScan { scan: 0 }, 10.0, 8, 0.0, 1.0);
        let inner = PlanNode::new(PlanOp::SeqScan { scan: 1 }, 20.0, 8, 0.0, 2.0);
        let join = PlanNode::new(
            PlanOp::HashJoin {
                outer: Box::new(outer.clone()),
                inner: Box::new(inner.clone()),
            },
            5.0,
            16,
            2.0,
            4.0,
        );

        let children = join.children();
        assert_eq!(children, vec![&outer, &inner]);
    }

    #[test]
    fn test_labels_follow_explain_vocabulary() {
        assert_eq!(PlanOp::SeqScan { scan: 0 }.label(), "Seq Scan");
        assert_eq!(
            PlanOp::Unhandled {
                kind: UnhandledKind::GatherMerge,
                children: vec![]
            }
            .label(),
            "Gather Merge"
        );
        assert_eq!(
            AccessPath::scan(ScanKind::IndexOnly, RelId(1)).label(),
            "Index Only Scan"
        );
    }
}
