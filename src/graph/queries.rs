use std::collections::{HashSet, VecDeque};

use crate::graph::DeclarationTable;
use crate::types::*;

/// Read-only queries over a linked [`DeclarationTable`].
pub struct GraphQueries<'a> {
    table: &'a DeclarationTable,
}

impl<'a> GraphQueries<'a> {
    pub fn new(table: &'a DeclarationTable) -> Self {
        Self { table }
    }

    /// Declarations that transitively call `id`, up to `max_depth` hops.
    ///
    /// Each entry pairs the calling declaration with the call site that
    /// reached it. Call sites outside any declaration are skipped.
    pub fn callers(&self, id: DeclId, max_depth: usize) -> Vec<(DeclId, CallId)> {
        self.walk(id, max_depth, |decl| {
            decl.inbound
                .iter()
                .filter_map(|call| {
                    let site = self.table.call(*call)?;
                    Some((site.caller?, *call))
                })
                .collect()
        })
    }

    /// Declarations that `id` transitively calls, up to `max_depth` hops.
    pub fn callees(&self, id: DeclId, max_depth: usize) -> Vec<(DeclId, CallId)> {
        self.walk(id, max_depth, |decl| {
            decl.outbound
                .iter()
                .filter_map(|call| {
                    let site = self.table.call(*call)?;
                    Some((site.resolved?, *call))
                })
                .collect()
        })
    }

    /// Live declarations with no inbound calls, sorted by identity.
    ///
    /// Excludes:
    /// - `main` and `init` (run by the runtime).
    /// - `Test*`, `Benchmark*`, `Example*` and `Fuzz*` functions.
    /// - Exported names outside package `main` (part of the package API).
    pub fn unreferenced(&self) -> Vec<(DeclId, &'a Declaration)> {
        self.table
            .sorted_declarations()
            .into_iter()
            .filter(|(_, decl)| decl.inbound.is_empty())
            .filter(|(_, decl)| !is_entry_point(decl))
            .filter(|(_, decl)| decl.package == "main" || !is_exported(&decl.name))
            .collect()
    }

    fn walk<F>(&self, start: DeclId, max_depth: usize, neighbours: F) -> Vec<(DeclId, CallId)>
    where
        F: Fn(&Declaration) -> Vec<(DeclId, CallId)>,
    {
        let mut visited: HashSet<DeclId> = HashSet::new();
        let mut result = Vec::new();
        let mut queue: VecDeque<(DeclId, usize)> = VecDeque::new();

        visited.insert(start);
        queue.push_back((start, 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(decl) = self.table.get(current) else {
                continue;
            };
            for (next, call) in neighbours(decl) {
                if visited.insert(next) {
                    result.push((next, call));
                    queue.push_back((next, depth + 1));
                }
            }
        }
        result
    }
}

fn is_entry_point(decl: &Declaration) -> bool {
    if decl.is_method() {
        return false;
    }
    matches!(decl.name.as_str(), "main" | "init")
        || ["Test", "Benchmark", "Example", "Fuzz"]
            .iter()
            .any(|prefix| decl.name.starts_with(prefix))
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}
