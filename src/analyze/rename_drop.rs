//! Detecting rename-then-drop sequences in a squashed migration
//!
//! A migration that renames `A` to `B` and later drops `B` works as a sequence
//! of separate migrations but becomes unsafe once squashed and re-generated as
//! a single script against a fresh database. Every rename produces an event
//! for its resulting name, so chained renames (`A -> B -> C`) are each checked
//! independently and a later drop of `C` is still caught.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::call_args::{bind, literal_value, parse_arguments};

/// Kinds of entity the analyzer tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Table,
    Column,
    Index,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Table => write!(f, "table"),
            EntityKind::Column => write!(f, "column"),
            EntityKind::Index => write!(f, "index"),
        }
    }
}

/// Parameter shape of one rename/drop method pair
struct OperationShape {
    kind: EntityKind,
    rename: &'static Regex,
    rename_params: &'static [&'static str],
    /// Scope of the renamed entity after the rename, most specific first
    rename_scope: &'static [&'static str],
    drop: &'static Regex,
    drop_params: &'static [&'static str],
    drop_scope: &'static str,
}

static RENAME_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s*RenameTable\s*\(").expect("valid RenameTable regex"));
static DROP_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s*DropTable\s*\(").expect("valid DropTable regex"));
static RENAME_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s*RenameColumn\s*\(").expect("valid RenameColumn regex"));
static DROP_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s*DropColumn\s*\(").expect("valid DropColumn regex"));
static RENAME_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s*RenameIndex\s*\(").expect("valid RenameIndex regex"));
static DROP_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s*DropIndex\s*\(").expect("valid DropIndex regex"));

/// Parameter orders follow the `MigrationBuilder` method signatures
fn shapes() -> [OperationShape; 3] {
    [
        OperationShape {
            kind: EntityKind::Table,
            rename: &RENAME_TABLE,
            rename_params: &["name", "schema", "newName", "newSchema"],
            rename_scope: &["newSchema", "schema"],
            drop: &DROP_TABLE,
            drop_params: &["name", "schema"],
            drop_scope: "schema",
        },
        OperationShape {
            kind: EntityKind::Column,
            rename: &RENAME_COLUMN,
            rename_params: &["name", "table", "newName", "schema"],
            rename_scope: &["table"],
            drop: &DROP_COLUMN,
            drop_params: &["name", "table", "schema"],
            drop_scope: "table",
        },
        OperationShape {
            kind: EntityKind::Index,
            rename: &RENAME_INDEX,
            rename_params: &["name", "newName", "table", "schema"],
            rename_scope: &["table"],
            drop: &DROP_INDEX,
            drop_params: &["name", "table", "schema"],
            drop_scope: "table",
        },
    ]
}

/// A rename call and the name it produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEvent {
    pub kind: EntityKind,
    pub scope: Option<String>,
    pub original_name: Option<String>,
    pub resulting_name: String,
    /// Byte offset of the call in the scanned text
    pub position: usize,
}

/// A drop call and the name it removes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropEvent {
    pub kind: EntityKind,
    pub scope: Option<String>,
    pub dropped_name: String,
    pub position: usize,
}

/// A drop that follows a rename producing the same name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hazard {
    pub rename: RenameEvent,
    pub drop: DropEvent,
}

impl fmt::Display for Hazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' is renamed from '{}' and later dropped",
            self.drop.kind,
            self.drop.dropped_name,
            self.rename.original_name.as_deref().unwrap_or("?")
        )?;
        if let Some(scope) = &self.drop.scope {
            write!(f, " (in '{}')", scope)?;
        }
        Ok(())
    }
}

impl Hazard {
    /// The hazard rule: same kind, same name, compatible scope, drop later
    fn applies(rename: &RenameEvent, drop: &DropEvent) -> bool {
        rename.kind == drop.kind
            && drop.position > rename.position
            && drop.dropped_name.eq_ignore_ascii_case(&rename.resulting_name)
            && scopes_match(rename.scope.as_deref(), drop.scope.as_deref())
    }
}

/// Scopes match case-insensitively; an absent scope on either side matches
fn scopes_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => true,
    }
}

fn calls(text: &str, pattern: &Regex, params: &[&str]) -> Vec<(usize, Vec<Option<String>>)> {
    let mut out = Vec::new();
    for m in pattern.find_iter(text) {
        let open = m.end() - 1;
        let Some((args, _)) = parse_arguments(text, open) else {
            continue;
        };
        let slots = bind(&args, params)
            .into_iter()
            .map(|slot| slot.and_then(literal_value))
            .collect();
        out.push((m.start(), slots));
    }
    out
}

fn slot<'a>(slots: &'a [Option<String>], params: &[&str], name: &str) -> Option<&'a String> {
    let idx = params.iter().position(|p| *p == name)?;
    slots.get(idx)?.as_ref()
}

/// All rename events in `text`
pub fn rename_events(text: &str) -> Vec<RenameEvent> {
    let mut events = Vec::new();
    for shape in &shapes() {
        for (position, slots) in calls(text, shape.rename, shape.rename_params) {
            let original = slot(&slots, shape.rename_params, "name").cloned();
            let resulting = slot(&slots, shape.rename_params, "newName")
                .cloned()
                .or_else(|| original.clone());
            let Some(resulting_name) = resulting else {
                continue;
            };
            let scope = shape
                .rename_scope
                .iter()
                .find_map(|p| slot(&slots, shape.rename_params, p))
                .cloned();
            events.push(RenameEvent {
                kind: shape.kind,
                scope,
                original_name: original,
                resulting_name,
                position,
            });
        }
    }
    events.sort_by_key(|e| e.position);
    events
}

/// All drop events in `text`
pub fn drop_events(text: &str) -> Vec<DropEvent> {
    let mut events = Vec::new();
    for shape in &shapes() {
        for (position, slots) in calls(text, shape.drop, shape.drop_params) {
            let Some(dropped_name) = slot(&slots, shape.drop_params, "name").cloned() else {
                continue;
            };
            events.push(DropEvent {
                kind: shape.kind,
                scope: slot(&slots, shape.drop_params, shape.drop_scope).cloned(),
                dropped_name,
                position,
            });
        }
    }
    events.sort_by_key(|e| e.position);
    events
}

/// Every rename/drop pair that violates the hazard rule
pub fn find_hazards(text: &str) -> Vec<Hazard> {
    let renames = rename_events(text);
    let drops = drop_events(text);

    let mut hazards = Vec::new();
    for rename in &renames {
        for drop in &drops {
            if Hazard::applies(rename, drop) {
                hazards.push(Hazard {
                    rename: rename.clone(),
                    drop: drop.clone(),
                });
            }
        }
    }
    hazards
}

/// Whether any drop follows a rename that produced the dropped name
pub fn has_hazard(text: &str) -> bool {
    let renames = rename_events(text);
    let drops = drop_events(text);
    renames
        .iter()
        .any(|rename| drops.iter().any(|drop| Hazard::applies(rename, drop)))
}
