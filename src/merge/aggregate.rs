//! Merging procedure bodies from many migrations into one
//!
//! Each contributing migration's body is wrapped in its own `{ ... }` block.
//! The block is what keeps identically named locals from different migrations
//! apart once they share a method.

use std::fmt;

use super::imports::{collect_imports, ImportSet};
use crate::migration::{MigrationId, Order, Procedure, Unit};
use crate::scanner::{dedent_region, extract_region, indent_block, Region};
use crate::util::INDENT;

/// One contributing migration's body, already wrapped in its block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub source: MigrationId,
    pub text: String,
}

/// Concatenated blocks of a merged procedure, in contribution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedBody {
    pub blocks: Vec<Block>,
}

impl MergedBody {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl fmt::Display for MergedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Result of aggregating one procedure across units
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub body: MergedBody,
    pub imports: ImportSet,
}

/// Provenance comment placed at the top of each block
pub fn provenance_comment(id: &MigrationId) -> String {
    format!("// Squashed from {}", id)
}

/// Wrap a region's text in a provenance-annotated block
fn wrap_block(id: &MigrationId, region: &Region) -> String {
    let mut lines = Vec::new();
    lines.push("{".to_string());
    lines.push(format!("{}{}", INDENT, provenance_comment(id)));
    let body = dedent_region(&region.text, region.indent).join("\n");
    lines.extend(indent_block(&body, INDENT));
    lines.push("}".to_string());
    lines.join("\n")
}

/// Merge `procedure` across `units` in the given order.
///
/// Units whose procedure is missing or empty contribute no block, but their
/// imports are still collected.
pub fn aggregate(units: &[Unit], procedure: Procedure, order: Order) -> Aggregate {
    let ordered: Vec<&Unit> = match order {
        Order::Chronological => units.iter().collect(),
        Order::ReverseChronological => units.iter().rev().collect(),
    };

    let mut result = Aggregate::default();
    for unit in ordered {
        result.imports.merge(&collect_imports(unit.lines()));

        let region = extract_region(unit.lines(), procedure.signature());
        if region.is_empty() {
            continue;
        }
        result.body.blocks.push(Block {
            source: unit.id.clone(),
            text: wrap_block(&unit.id, &region),
        });
    }
    result
}
