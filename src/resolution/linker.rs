use tracing::debug;

use crate::graph::DeclarationTable;
use crate::types::{CallId, CallSite, DeclId, LinkStats};

/// Second pass that matches call sites to declarations.
///
/// Runs once every unit has been merged. An unresolved call site is normal
/// data (calls into external packages, method calls through variables,
/// chained calls) and never an error.
pub struct CallLinker;

impl CallLinker {
    /// Declaration a call site refers to, if the table has one.
    ///
    /// Explicit type arguments are dropped first. The callee is then tried
    /// as written, then qualified with the call's own package unless it
    /// already carries that prefix or names an import.
    pub fn resolve_one(table: &DeclarationTable, site: &CallSite) -> Option<DeclId> {
        let callee = strip_type_args(&site.callee);
        if let Some(id) = table.lookup_id(callee) {
            return Some(id);
        }
        if site.imported || site.package.is_empty() {
            return None;
        }
        let prefix = format!("{}.", site.package);
        if callee.starts_with(&prefix) {
            return None;
        }
        table.lookup_id(&format!("{}{}", prefix, callee))
    }

    /// Links every call site in the table and attaches source positions.
    ///
    /// Running it again over an unchanged table changes nothing.
    pub fn link_all(table: &mut DeclarationTable) -> LinkStats {
        let mut stats = LinkStats::default();

        let view: &DeclarationTable = table;
        let plan: Vec<(CallId, Option<DeclId>, usize)> = view
            .all_calls()
            .map(|(id, site)| (id, Self::resolve_one(view, site), site.offset))
            .collect();

        for (call, target, offset) in plan {
            let position = table.source_map().position(offset);
            if table.relink(call, target, position) {
                stats.changed += 1;
            }
            stats.total += 1;
            if target.is_some() {
                stats.resolved += 1;
            } else {
                stats.unresolved += 1;
            }
        }

        debug!(
            total = stats.total,
            resolved = stats.resolved,
            unresolved = stats.unresolved,
            changed = stats.changed,
            "linked call sites"
        );
        stats
    }
}

/// `p.Map[int, string]` -> `p.Map`. Only a trailing bracket group is removed.
fn strip_type_args(callee: &str) -> &str {
    if !callee.ends_with(']') {
        return callee;
    }
    let mut depth = 0usize;
    for (i, c) in callee.char_indices().rev() {
        match c {
            ']' => depth += 1,
            '[' => {
                depth -= 1;
                if depth == 0 {
                    return &callee[..i];
                }
            }
            _ => {}
        }
    }
    callee
}
