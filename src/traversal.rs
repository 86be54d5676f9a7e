//! Scope-tracking walk over one unit.
//!
//! The walker visits every node of a [`SourceFile`] in pre-order, keeps the
//! enclosing declarations on an explicit stack, and accumulates declarations,
//! call sites, type records and imports in a [`UnitTable`] whose handles are
//! local to the unit. The coordinator later merges unit tables into the
//! global [`crate::graph::DeclarationTable`].

use tracing::debug;

use crate::resolution::ExprResolver;
use crate::syntax::{CallExpr, FuncDecl, Node, SourceFile, TypeSpec};
use crate::types::*;

/// Everything one unit contributes, with unit-local handles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitTable {
    pub name: String,
    pub package: String,
    pub declarations: Vec<Declaration>,
    pub calls: Vec<CallSite>,
    pub structures: Vec<StructureRecord>,
    pub imports: Vec<Import>,
    pub diagnostics: Vec<Diagnostic>,
}

impl UnitTable {
    /// Unit-local declaration by name, first match.
    pub fn declaration(&self, name: &str) -> Option<(DeclId, &Declaration)> {
        self.declarations
            .iter()
            .enumerate()
            .find(|(_, decl)| decl.name == name)
            .map(|(index, decl)| (DeclId(index), decl))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Store each declaration's source text.
    pub capture_source: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            capture_source: true,
        }
    }
}

/// Walks a unit with default options.
pub fn walk_unit(file: &SourceFile) -> UnitTable {
    walk_unit_with(file, &WalkOptions::default())
}

pub fn walk_unit_with(file: &SourceFile, options: &WalkOptions) -> UnitTable {
    let mut walker = UnitWalker::new(file, *options);
    for decl in &file.decls {
        walker.visit(decl);
    }
    walker.finish()
}

struct UnitWalker<'a> {
    file: &'a SourceFile,
    options: WalkOptions,
    resolver: ExprResolver<'a>,
    /// Enclosing declarations, innermost last.
    scope: Vec<DeclId>,
    table: UnitTable,
}

impl<'a> UnitWalker<'a> {
    fn new(file: &'a SourceFile, options: WalkOptions) -> Self {
        let imports: Vec<Import> = file
            .imports
            .iter()
            .map(|spec| Import::new(&spec.path, spec.alias.as_deref()))
            .collect();
        Self {
            file,
            options,
            resolver: ExprResolver::new(&file.package, &file.name).with_imports(imports.clone()),
            scope: Vec::new(),
            table: UnitTable {
                name: file.name.clone(),
                package: file.package.clone(),
                imports,
                ..UnitTable::default()
            },
        }
    }

    fn visit(&mut self, node: &Node) {
        let pushed = self.enter(node);
        for child in node.children() {
            self.visit(child);
        }
        if pushed {
            self.scope.pop();
        }
    }

    /// Handles a node on the way down. Returns whether it pushed a scope.
    fn enter(&mut self, node: &Node) -> bool {
        match node {
            Node::FuncDecl(decl) => {
                let id = self.declare(decl);
                self.scope.push(id);
                true
            }
            Node::TypeSpec(spec) => {
                self.record_type(spec);
                false
            }
            Node::Call(call) => {
                self.record_call(call);
                false
            }
            Node::Ident(_)
            | Node::BasicLit(_)
            | Node::Star(_)
            | Node::Unary(_)
            | Node::Binary(_)
            | Node::Paren(_)
            | Node::Selector(_)
            | Node::Index(_)
            | Node::Slice(_)
            | Node::TypeAssert(_)
            | Node::CompositeLit(_)
            | Node::KeyValue(_)
            | Node::FuncLit(_)
            | Node::FuncType(_)
            | Node::ArrayType(_)
            | Node::MapType(_)
            | Node::ChanType(_)
            | Node::StructType(_)
            | Node::InterfaceType(_)
            | Node::Ellipsis(_)
            | Node::Other(_) => false,
        }
    }

    fn declare(&mut self, decl: &FuncDecl) -> DeclId {
        let receiver = decl
            .receiver
            .as_ref()
            .and_then(|list| self.resolver.parameters(list).0.into_iter().next());
        let parameters = self.resolver.parameters(&decl.ty.params);
        let returns = self.resolver.parameters(&decl.ty.results);
        let source_text = if self.options.capture_source {
            self.file.text(decl.span).map(str::to_string)
        } else {
            None
        };

        let id = DeclId(self.table.declarations.len());
        self.table.declarations.push(Declaration {
            package: self.file.package.clone(),
            receiver,
            name: decl.name.name.clone(),
            parameters,
            returns,
            span: decl.span,
            file: self.file.name.clone(),
            source_text,
            outbound: Vec::new(),
            inbound: Vec::new(),
        });
        id
    }

    fn record_call(&mut self, call: &CallExpr) {
        let (callee, imported) = self.resolver.callee(&call.fun);
        let arguments = self.resolver.arguments(&call.args);
        let caller = self.scope.last().copied();
        let id = CallId(self.table.calls.len());

        self.table.calls.push(CallSite {
            package: self.file.package.clone(),
            callee,
            arguments,
            caller,
            resolved: None,
            offset: call.span.start,
            position: None,
            imported,
        });
        if let Some(decl) = caller.and_then(|c| self.table.declarations.get_mut(c.0)) {
            decl.outbound.push(id);
        }
    }

    fn record_type(&mut self, spec: &TypeSpec) {
        let (kind, fields) = match spec.ty.as_ref() {
            _ if spec.is_alias => (TypeKind::Alias, ParameterList::new()),
            Node::StructType(st) => (TypeKind::Struct, self.resolver.parameters(&st.fields)),
            Node::InterfaceType(iface) => {
                (TypeKind::Interface, self.resolver.parameters(&iface.methods))
            }
            _ => (TypeKind::Named, ParameterList::new()),
        };
        self.table.structures.push(StructureRecord {
            package: self.file.package.clone(),
            name: spec.name.name.clone(),
            kind,
            fields,
            methods: Vec::new(),
        });
    }

    fn finish(mut self) -> UnitTable {
        debug_assert!(self.scope.is_empty(), "scope stack not empty after walk");
        self.table.diagnostics = self.resolver.take_diagnostics();
        debug!(
            unit = %self.table.name,
            declarations = self.table.declarations.len(),
            calls = self.table.calls.len(),
            diagnostics = self.table.diagnostics.len(),
            "walked unit"
        );
        self.table
    }
}
