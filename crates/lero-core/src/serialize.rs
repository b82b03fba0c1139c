//! # Plan Serialization
//!
//! This module converts a finalized `PlannedStatement` into the EXPLAIN-style document
//! the scoring service consumes. The document is a recursive `PlanDocument` whose field
//! names match the host's JSON EXPLAIN output (`"Node Type"`, `"Plan Rows"`, ...), so a
//! model trained on EXPLAIN output can score it directly.
//!
//! ## Conversion Strategy
//!
//! The serializer walks the plan tree recursively:
//!
//! - **Scans** resolve their range-table entry: `Relation Name` comes from the catalog
//!   and `Alias` from the entry. Index-using scans add `Index Name`. A bitmap index scan
//!   names only its index; its parent bitmap heap scan names the table.
//! - **Joins** (hash, merge, nested loop) emit exactly two children as
//!   `[outer, inner]`, regardless of which side the host builds its hash table on.
//! - **Unary operators** (hash, materialize, sort, aggregate, incremental sort, limit)
//!   emit their single input.
//! - **Unhandled operators** emit only their label and the common numeric fields. Each
//!   one is reported in `Serialized::unhandled` so the caller can warn about it.
//!
//! Row, width and cost estimates are always emitted, so no node is ever lossy for them.
//!
//! ## Error Handling
//!
//! The operator set is closed, so an unknown operator cannot reach the serializer. The
//! one remaining inconsistency, a scan pointing outside the statement's range table,
//! is rejected with `PlanShapeError`.

use crate::catalog::Catalog;
use crate::plan::{PlanNode, PlanOp, PlannedStatement};
use serde::{Deserialize, Serialize};

/// Serialized plan node, in the host's EXPLAIN JSON vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(rename = "Node Type")]
    pub node_type: String,
    #[serde(rename = "Relation Name", default, skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
    #[serde(rename = "Alias", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(rename = "Index Name", default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(rename = "Plans", default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<PlanDocument>,
    #[serde(rename = "Plan Rows")]
    pub plan_rows: f64,
    #[serde(rename = "Plan Width")]
    pub plan_width: i32,
    #[serde(rename = "Startup Cost")]
    pub startup_cost: f64,
    #[serde(rename = "Total Cost")]
    pub total_cost: f64,
}

/// Output of `serialize_plan`: the document plus the labels of every node that was
/// emitted without its type-specific fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Serialized {
    pub document: PlanDocument,
    pub unhandled: Vec<&'static str>,
}

/// Errors that make a plan impossible to describe.
#[derive(Debug, thiserror::Error)]
pub enum PlanShapeError {
    #[error("{node} references range-table entry {index}, but the range table has {len} entries")]
    DanglingRangeEntry {
        node: &'static str,
        index: usize,
        len: usize,
    },
}

/// Serialize a finalized plan.
pub fn serialize_plan(
    stmt: &PlannedStatement,
    catalog: &dyn Catalog,
) -> Result<Serialized, PlanShapeError> {
    let mut unhandled = Vec::new();
    let document = serialize_node(stmt, &stmt.root, catalog, &mut unhandled)?;
    Ok(Serialized { document, unhandled })
}

fn serialize_node(
    stmt: &PlannedStatement,
    node: &PlanNode,
    catalog: &dyn Catalog,
    unhandled: &mut Vec<&'static str>,
) -> Result<PlanDocument, PlanShapeError> {
    let label = node.op.label();
    let mut doc = PlanDocument {
        node_type: label.to_string(),
        relation_name: None,
        alias: None,
        index_name: None,
        plans: Vec::new(),
        plan_rows: node.rows,
        plan_width: node.width,
        startup_cost: node.startup_cost,
        total_cost: node.total_cost,
    };

    match &node.op {
        PlanOp::SeqScan { scan } | PlanOp::BitmapHeapScan { scan } => {
            describe_scan(stmt, *scan, label, catalog, &mut doc)?;
        }
        PlanOp::IndexScan { scan, index } | PlanOp::IndexOnlyScan { scan, index } => {
            describe_scan(stmt, *scan, label, catalog, &mut doc)?;
            doc.index_name = catalog.relation_name(*index);
        }
        PlanOp::BitmapIndexScan { index } => {
            doc.index_name = catalog.relation_name(*index);
        }
        PlanOp::Unhandled { .. } => {
            unhandled.push(label);
            return Ok(doc);
        }
        _ => {}
    }

    // Joins yield [outer, inner]; unary operators their single input.
    for child in node.children() {
        doc.plans.push(serialize_node(stmt, child, catalog, unhandled)?);
    }

    Ok(doc)
}

fn describe_scan(
    stmt: &PlannedStatement,
    scan: usize,
    node: &'static str,
    catalog: &dyn Catalog,
    doc: &mut PlanDocument,
) -> Result<(), PlanShapeError> {
    let entry = stmt.range_entry(scan).ok_or(PlanShapeError::DanglingRangeEntry {
        node,
        index: scan,
        len: stmt.range_table.len(),
    })?;
    doc.relation_name = catalog.relation_name(entry.relation);
    doc.alias = Some(entry.alias.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::plan::{RangeTableEntry, RelId, UnhandledKind};

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_relation(RelId(10), "customer")
            .with_relation(RelId(11), "orders")
            .with_relation(RelId(12), "orders_custkey_idx")
    }

    fn range_table() -> Vec<RangeTableEntry> {
        vec![
            RangeTableEntry::new(RelId(10), "c"),
            RangeTableEntry::new(RelId(11), "o"),
        ]
    }

    fn leaf(op: PlanOp, rows: f64) -> PlanNode {
        PlanNode::new(op, rows, 12, 0.0, rows / 100.0)
    }

    #[test]
    fn test_hash_join_emits_outer_then_inner() {
        // The host builds the hash table on `customer`, which is the inner input.
        let root = PlanNode::new(
            PlanOp::HashJoin {
                outer: Box::new(leaf(PlanOp::SeqScan { scan: 1 }, 1500.0)),
                inner: Box::new(PlanNode::new(
                    PlanOp::Hash {
                        input: Box::new(leaf(PlanOp::SeqScan { scan: 0 }, 150.0)),
                    },
                    150.0,
                    12,
                    1.5,
                    1.5,
                )),
            },
            1500.0,
            24,
            1.5,
            33.25,
        );
        let stmt = PlannedStatement::new(root, range_table());

        let out = serialize_plan(&stmt, &catalog()).unwrap();
        assert!(out.unhandled.is_empty());
        let doc = out.document;
        assert_eq!(doc.node_type, "Hash Join");
        assert_eq!(doc.plans.len(), 2);
        assert_eq!(doc.plans[0].relation_name.as_deref(), Some("orders"));
        assert_eq!(doc.plans[0].alias.as_deref(), Some("o"));
        assert_eq!(doc.plans[1].node_type, "Hash");
        assert_eq!(doc.plans[1].plans[0].relation_name.as_deref(), Some("customer"));
    }

    #[test]
    fn test_index_scan_names_index() {
        let stmt = PlannedStatement::new(
            leaf(
                PlanOp::IndexScan {
                    scan: 1,
                    index: RelId(12),
                },
                42.0,
            ),
            range_table(),
        );

        let doc = serialize_plan(&stmt, &catalog()).unwrap().document;
        assert_eq!(doc.node_type, "Index Scan");
        assert_eq!(doc.relation_name.as_deref(), Some("orders"));
        assert_eq!(doc.index_name.as_deref(), Some("orders_custkey_idx"));
        assert!(doc.plans.is_empty());
    }

    #[test]
    fn test_bitmap_index_scan_names_only_index() {
        let stmt = PlannedStatement::new(
            leaf(PlanOp::BitmapIndexScan { index: RelId(12) }, 42.0),
            range_table(),
        );

        let doc = serialize_plan(&stmt, &catalog()).unwrap().document;
        assert_eq!(doc.index_name.as_deref(), Some("orders_custkey_idx"));
        assert_eq!(doc.relation_name, None);
        assert_eq!(doc.alias, None);
    }

    #[test]
    fn test_unhandled_node_keeps_numeric_fields() {
        let root = PlanNode::new(
            PlanOp::Unhandled {
                kind: UnhandledKind::Gather,
                children: vec![leaf(PlanOp::SeqScan { scan: 0 }, 10.0)],
            },
            10.0,
            12,
            1000.0,
            1011.5,
        );
        let stmt = PlannedStatement::new(root, range_table());

        let out = serialize_plan(&stmt, &catalog()).unwrap();
        assert_eq!(out.unhandled, vec!["Gather"]);
        assert_eq!(out.document.node_type, "Gather");
        assert!(out.document.plans.is_empty());
        assert_eq!(out.document.plan_rows, 10.0);
        assert_eq!(out.document.total_cost, 1011.5);
    }

    #[test]
    fn test_dangling_range_entry_is_rejected() {
        let stmt = PlannedStatement::new(leaf(PlanOp::SeqScan { scan: 7 }, 1.0), range_table());
        let err = serialize_plan(&stmt, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            PlanShapeError::DanglingRangeEntry { index: 7, len: 2, .. }
        ));
    }

    #[test]
    fn test_numeric_fields_survive_json() {
        let node = PlanNode::new(
            PlanOp::SeqScan { scan: 0 },
            0.1 + 0.2,
            37,
            1.0 / 3.0,
            123_456_789.123_456_78,
        );
        let stmt = PlannedStatement::new(node.clone(), range_table());

        let doc = serialize_plan(&stmt, &catalog()).unwrap().document;
        let text = serde_json::to_string(&doc).unwrap();
        let parsed: PlanDocument = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed.plan_rows.to_bits(), node.rows.to_bits());
        assert_eq!(parsed.plan_width, node.width);
        assert_eq!(parsed.startup_cost.to_bits(), node.startup_cost.to_bits());
        assert_eq!(parsed.total_cost.to_bits(), node.total_cost.to_bits());
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let stmt = PlannedStatement::new(
            PlanNode::new(
                PlanOp::Limit {
                    input: Box::new(leaf(PlanOp::SeqScan { scan: 0 }, 10.0)),
                },
                1.0,
                12,
                0.0,
                0.01,
            ),
            range_table(),
        );

        let doc = serialize_plan(&stmt, &catalog()).unwrap().document;
        let value = serde_json::to_value(&doc).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("Relation Name"));
        assert!(!obj.contains_key("Index Name"));
        assert_eq!(obj["Plans"][0]["Relation Name"], "customer");
        assert_eq!(obj["Plan Width"], 12);
    }
}
