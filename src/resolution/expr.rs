use tracing::warn;

use crate::syntax::{ChanDir, Field, FieldList, FuncType, Node};
use crate::types::{CanonicalType, Diagnostic, Import, Parameter, ParameterList};

/// Reduces expression and type nodes to canonical textual signatures.
///
/// Resolution is a pure function of the package context and the node. The
/// only state is the diagnostics sink, which collects a note for every node
/// kind that cannot be reduced. Such nodes resolve to an empty type and the
/// surrounding resolution carries on.
pub struct ExprResolver<'a> {
    package: &'a str,
    file: &'a str,
    imports: Vec<Import>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ExprResolver<'a> {
    pub fn new(package: &'a str, file: &'a str) -> Self {
        Self {
            package,
            file,
            imports: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Imports of the unit, used to rewrite selectors on package names.
    pub fn with_imports(mut self, imports: Vec<Import>) -> Self {
        self.imports = imports;
        self
    }

    pub fn package(&self) -> &str {
        self.package
    }

    /// Canonical type of an arbitrary expression or type node.
    pub fn resolve(&mut self, node: &Node) -> CanonicalType {
        CanonicalType::new(self.render(node))
    }

    /// Name of a call's callee. A bare identifier is qualified with the
    /// package, explicit type arguments included (`Map[int]` becomes
    /// `p.Map[int]`); every other shape resolves as a plain expression.
    pub fn call_target(&mut self, fun: &Node) -> String {
        self.callee(fun).0
    }

    /// Callee name and whether it goes through an import. A selector on an
    /// imported package name is rewritten to the package's declared name
    /// (`t.Contains` with `import t "strings"` becomes `strings.Contains`).
    pub fn callee(&mut self, fun: &Node) -> (String, bool) {
        match fun {
            Node::Ident(ident) => (format!("{}.{}", self.package, ident.name), false),
            Node::Index(index)
                if matches!(index.x.as_ref(), Node::Ident(_) | Node::Selector(_)) =>
            {
                let (base, imported) = self.callee(&index.x);
                let indices = self.render_all(&index.indices, ", ");
                (format!("{}[{}]", base, indices), imported)
            }
            Node::Selector(selector) => {
                if let Node::Ident(base) = selector.x.as_ref() {
                    let import = self
                        .imports
                        .iter()
                        .find(|import| import.reference_name() == base.name);
                    if let Some(import) = import {
                        return (format!("{}.{}", import.name, selector.sel.name), true);
                    }
                }
                (self.render(fun), false)
            }
            other => (self.render(other), false),
        }
    }

    /// Call arguments, each resolved independently.
    pub fn arguments(&mut self, args: &[Node]) -> ParameterList {
        let mut list = ParameterList::new();
        for arg in args {
            let text = self.render(arg);
            list.push(Parameter {
                package: self.package.to_string(),
                name: text,
                is_argument: true,
                ..Parameter::default()
            });
        }
        list
    }

    /// Parameters of a whole field list, in declaration order.
    pub fn parameters(&mut self, list: &FieldList) -> ParameterList {
        let mut params = ParameterList::new();
        for field in &list.fields {
            params.extend(self.field(field));
        }
        params
    }

    /// Parameters declared by one field. Names sharing the field's type are
    /// grouped with their successor; the last name carries the type.
    pub fn field(&mut self, field: &Field) -> ParameterList {
        let (is_pointer, canonical_type) = match field.ty.as_ref() {
            Node::Star(star) => (true, self.resolve(&star.x)),
            other => (false, self.resolve(other)),
        };
        let template = Parameter {
            package: self.package.to_string(),
            is_pointer,
            canonical_type,
            ..Parameter::default()
        };

        if field.names.is_empty() {
            return ParameterList(vec![template]);
        }

        let count = field.names.len();
        let params = field
            .names
            .iter()
            .enumerate()
            .map(|(index, name)| Parameter {
                name: name.name.clone(),
                grouped_with_next: index + 1 != count,
                ..template.clone()
            })
            .collect();
        ParameterList(params)
    }

    /// `(params) returns` for a function type, without the `func` keyword.
    pub fn signature(&mut self, ty: &FuncType) -> String {
        let params = self.parameters(&ty.params);
        let results = self.parameters(&ty.results);
        format!("{}{}", params, results.render_returns())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn render(&mut self, node: &Node) -> String {
        match node {
            Node::Ident(ident) => ident.name.clone(),
            Node::BasicLit(lit) => lit.value.clone(),
            Node::Star(star) => self.render(&star.x),
            Node::Unary(unary) => format!("{}{}", unary.op, self.render(&unary.x)),
            Node::Binary(binary) => {
                let x = self.render(&binary.x);
                let y = self.render(&binary.y);
                format!("{} {} {}", x, binary.op, y)
            }
            Node::Paren(paren) => format!("({})", self.render(&paren.x)),
            Node::Selector(selector) => {
                format!("{}.{}", self.render(&selector.x), selector.sel.name)
            }
            Node::Call(call) => {
                let target = self.call_target(&call.fun);
                let args = self.arguments(&call.args);
                format!("{}{}", target, args)
            }
            Node::Index(index) => {
                let base = self.render(&index.x);
                let indices = self.render_all(&index.indices, ", ");
                format!("{}[{}]", base, indices)
            }
            Node::Slice(slice) => {
                let base = self.render(&slice.x);
                let low = self.render_opt(slice.low.as_deref());
                let high = self.render_opt(slice.high.as_deref());
                let mut bounds = format!("{}:{}", low, high);
                if slice.slice3 {
                    bounds.push(':');
                    bounds.push_str(&self.render_opt(slice.max.as_deref()));
                }
                format!("{}[{}]", base, bounds)
            }
            Node::TypeAssert(assert) => match &assert.ty {
                Some(ty) => self.render(ty),
                None => format!("{}.(type)", self.render(&assert.x)),
            },
            Node::CompositeLit(lit) => {
                format!("{}{{}}", self.render_opt(lit.ty.as_deref()))
            }
            Node::KeyValue(kv) => {
                let key = self.render(&kv.key);
                let value = self.render(&kv.value);
                format!("{}: {}", key, value)
            }
            Node::FuncLit(lit) => format!("func{}", self.signature(&lit.ty)),
            Node::FuncType(ty) => format!("func{}", self.signature(ty)),
            Node::ArrayType(array) => {
                let len = self.render_opt(array.len.as_deref());
                format!("[{}]{}", len, self.render(&array.elt))
            }
            Node::MapType(map) => {
                let key = self.render(&map.key);
                format!("map[{}]{}", key, self.render(&map.value))
            }
            Node::ChanType(chan) => {
                let value = self.render(&chan.value);
                match chan.dir {
                    ChanDir::Both => format!("chan {}", value),
                    ChanDir::Send => format!("chan<- {}", value),
                    ChanDir::Recv => format!("<-chan {}", value),
                }
            }
            Node::StructType(st) => {
                let fields = self.parameters(&st.fields);
                format!("struct{{{}}}", fields.join("; "))
            }
            Node::InterfaceType(iface) => {
                let mut elems = Vec::new();
                for field in &iface.methods.fields {
                    match (field.names.first(), field.ty.as_ref()) {
                        (Some(name), Node::FuncType(ty)) => {
                            elems.push(format!("{}{}", name.name, self.signature(ty)));
                        }
                        (_, embedded) => elems.push(self.render(embedded)),
                    }
                }
                format!("interface{{{}}}", elems.join("; "))
            }
            Node::Ellipsis(ellipsis) => {
                format!("...{}", self.render_opt(ellipsis.elt.as_deref()))
            }
            Node::FuncDecl(_) | Node::TypeSpec(_) | Node::Other(_) => {
                self.unsupported(node);
                String::new()
            }
        }
    }

    fn render_opt(&mut self, node: Option<&Node>) -> String {
        node.map(|n| self.render(n)).unwrap_or_default()
    }

    fn render_all(&mut self, nodes: &[Node], sep: &str) -> String {
        nodes
            .iter()
            .map(|n| self.render(n))
            .collect::<Vec<_>>()
            .join(sep)
    }

    fn unsupported(&mut self, node: &Node) {
        let diagnostic = Diagnostic {
            file: self.file.to_string(),
            offset: node.span().start,
            node_kind: node.kind_name().to_string(),
            message: "cannot reduce node to a canonical type".to_string(),
        };
        warn!(
            file = %diagnostic.file,
            offset = diagnostic.offset,
            kind = %diagnostic.node_kind,
            "unsupported expression node"
        );
        self.diagnostics.push(diagnostic);
    }
}
