use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::syntax::SourceMap;
use crate::traversal::UnitTable;
use crate::types::*;

/// Arena of declarations and call sites addressed by [`DeclId`] / [`CallId`].
///
/// The identity index maps `package.receiverType.name` to the live entry.
/// Inserting a duplicate identity appends a new arena slot and repoints the
/// index (last wins). The shadowed entry stays in the arena so handles held
/// by call sites remain valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarationTable {
    declarations: Vec<Declaration>,
    index: HashMap<String, DeclId>,
    calls: Vec<CallSite>,
    structures: Vec<StructureRecord>,
    structure_index: HashMap<String, usize>,
    /// Imports per unit name.
    imports: BTreeMap<String, Vec<Import>>,
    source_map: SourceMap,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_map(source_map: SourceMap) -> Self {
        Self {
            source_map,
            ..Self::default()
        }
    }

    /// Inserts a declaration, replacing any live entry with the same identity.
    pub fn insert(&mut self, declaration: Declaration) -> DeclId {
        let id = DeclId(self.declarations.len());
        let identifier = declaration.identifier();
        self.declarations.push(declaration);
        if let Some(previous) = self.index.insert(identifier.clone(), id) {
            debug!(
                identifier = %identifier,
                previous = previous.index(),
                current = id.index(),
                "duplicate declaration, keeping the latest"
            );
        }
        id
    }

    pub fn lookup(&self, identifier: &str) -> Option<&Declaration> {
        self.lookup_id(identifier).and_then(|id| self.get(id))
    }

    pub fn lookup_id(&self, identifier: &str) -> Option<DeclId> {
        self.index.get(identifier).copied()
    }

    /// Any arena entry, shadowed or live.
    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(id.0)
    }

    pub fn call(&self, id: CallId) -> Option<&CallSite> {
        self.calls.get(id.0)
    }

    /// Whether `id` is the entry the index currently returns for its identity.
    pub fn is_live(&self, id: DeclId) -> bool {
        self.get(id)
            .map(|decl| self.index.get(&decl.identifier()) == Some(&id))
            .unwrap_or(false)
    }

    /// Live declarations with their handles, in no particular order.
    pub fn all_declarations(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.index
            .values()
            .filter_map(move |id| self.get(*id).map(|decl| (*id, decl)))
    }

    /// Live declarations ordered by identity key.
    pub fn sorted_declarations(&self) -> Vec<(DeclId, &Declaration)> {
        let mut entries: Vec<(&String, DeclId)> =
            self.index.iter().map(|(key, id)| (key, *id)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .filter_map(|(_, id)| self.get(id).map(|decl| (id, decl)))
            .collect()
    }

    pub fn declaration_count(&self) -> usize {
        self.index.len()
    }

    /// Every call site in arena order.
    pub fn all_calls(&self) -> impl Iterator<Item = (CallId, &CallSite)> {
        self.calls
            .iter()
            .enumerate()
            .map(|(index, site)| (CallId(index), site))
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    /// Stores a call site and appends it to its caller's outbound list.
    pub fn add_call(&mut self, site: CallSite) -> CallId {
        let id = CallId(self.calls.len());
        if let Some(decl) = site.caller.and_then(|c| self.declarations.get_mut(c.0)) {
            decl.outbound.push(id);
        }
        self.calls.push(site);
        id
    }

    /// Records a type declaration. A later record with the same identity wins.
    pub fn insert_structure(&mut self, structure: StructureRecord) {
        let key = structure.identifier();
        match self.structure_index.get(&key) {
            Some(&slot) => self.structures[slot] = structure,
            None => {
                self.structure_index.insert(key, self.structures.len());
                self.structures.push(structure);
            }
        }
    }

    pub fn all_structures(&self) -> &[StructureRecord] {
        &self.structures
    }

    pub fn structure(&self, identifier: &str) -> Option<&StructureRecord> {
        self.structure_index
            .get(identifier)
            .and_then(|slot| self.structures.get(*slot))
    }

    /// Attaches every live method to the structure record named by its
    /// receiver type. Methods whose receiver type has no record stay ungrouped.
    pub fn group_by_receiver(&mut self) {
        for structure in &mut self.structures {
            structure.methods.clear();
        }

        let mut grouped = 0usize;
        let methods: Vec<(DeclId, String)> = self
            .sorted_declarations()
            .into_iter()
            .filter_map(|(id, decl)| {
                decl.receiver_type()
                    .map(|receiver| (id, format!("{}.{}", decl.package, receiver)))
            })
            .collect();

        for (id, key) in methods {
            if let Some(&slot) = self.structure_index.get(&key) {
                self.structures[slot].methods.push(id);
                grouped += 1;
            }
        }
        debug!(
            structures = self.structures.len(),
            methods = grouped,
            "grouped methods by receiver"
        );
    }

    /// Call sites linked to `id`.
    pub fn inbound(&self, id: DeclId) -> Vec<&CallSite> {
        self.get(id)
            .map(|decl| decl.inbound.iter().filter_map(|c| self.call(*c)).collect())
            .unwrap_or_default()
    }

    /// Call sites written inside `id`'s body.
    pub fn outbound(&self, id: DeclId) -> Vec<&CallSite> {
        self.get(id)
            .map(|decl| decl.outbound.iter().filter_map(|c| self.call(*c)).collect())
            .unwrap_or_default()
    }

    /// Moves a unit's declarations, call sites, structures and imports into
    /// the table, remapping unit-local handles onto the global arenas.
    pub fn merge(&mut self, unit: UnitTable) {
        let decl_base = self.declarations.len();
        let call_base = self.calls.len();
        let declaration_count = unit.declarations.len();
        let call_count = unit.calls.len();

        for mut decl in unit.declarations {
            decl.outbound = decl
                .outbound
                .iter()
                .map(|c| CallId(c.0 + call_base))
                .collect();
            decl.inbound.clear();
            self.insert(decl);
        }

        for mut site in unit.calls {
            site.caller = site.caller.map(|d| DeclId(d.0 + decl_base));
            site.resolved = None;
            self.calls.push(site);
        }

        for structure in unit.structures {
            self.insert_structure(structure);
        }

        if !unit.imports.is_empty() {
            self.imports
                .entry(unit.name.clone())
                .or_default()
                .extend(unit.imports);
        }

        debug!(
            unit = %unit.name,
            declarations = declaration_count,
            calls = call_count,
            "merged unit"
        );
    }

    /// Imports declared by one unit.
    pub fn imports_for(&self, unit: &str) -> &[Import] {
        self.imports.get(unit).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Points `call` at `target` and sets its position, keeping inbound
    /// lists consistent. Returns whether the resolution changed.
    pub(crate) fn relink(
        &mut self,
        call: CallId,
        target: Option<DeclId>,
        position: Option<Position>,
    ) -> bool {
        let Some(site) = self.calls.get_mut(call.0) else {
            return false;
        };
        site.position = position;
        let previous = site.resolved;
        if previous == target {
            return false;
        }
        site.resolved = target;

        if let Some(old) = previous.and_then(|d| self.declarations.get_mut(d.0)) {
            old.inbound.retain(|c| *c != call);
        }
        if let Some(new) = target.and_then(|d| self.declarations.get_mut(d.0)) {
            new.inbound.push(call);
        }
        true
    }
}
