/// Tree-sitter based Go front end.
///
/// Parses Go source files and lowers the concrete syntax tree into
/// [`crate::syntax`] nodes.
use tracing::debug;
use tree_sitter::{Node as TsNode, Parser, Tree};

use crate::errors::{CallScopeError, Result};
use crate::syntax::{
    ArrayType, BasicLit, BinaryExpr, CallExpr, ChanDir, ChanType, CompositeLit, Ellipsis, Field,
    FieldList, FuncDecl, FuncLit, FuncType, Ident, ImportSpec, IndexExpr, InterfaceType,
    KeyValueExpr, MapType, Node, OtherNode, ParenExpr, SelectorExpr, SliceExpr, SourceFile, Span,
    StarExpr, StructType, TypeAssertExpr, TypeSpec, UnaryExpr,
};

/// Lowers Go source files into the syntax tree using tree-sitter-go.
pub struct GoExtractor;

/// Per-file lowering context.
struct Lowering<'a> {
    source: &'a [u8],
    base: usize,
}

impl GoExtractor {
    /// Parse and lower one Go source file.
    pub fn extract_source(file_path: &str, source: &str, base: usize) -> Result<SourceFile> {
        let tree = Self::parse_source(file_path, source)?;
        let root = tree.root_node();

        if root.has_error() {
            let line = find_error(root).map(|n| n.start_position().row as u32 + 1);
            return Err(CallScopeError::Parse {
                message: "source contains syntax errors".to_string(),
                path: file_path.to_string(),
                line,
            });
        }

        let lowering = Lowering {
            source: source.as_bytes(),
            base,
        };

        let mut package = None;
        let mut imports = Vec::new();
        let mut decls = Vec::new();

        for child in named_children(root) {
            match child.kind() {
                "package_clause" => {
                    package = named_children(child).first().map(|n| lowering.text(*n));
                }
                "import_declaration" => lowering.lower_imports(child, &mut imports),
                "function_declaration" | "method_declaration" => {
                    decls.push(Node::FuncDecl(lowering.lower_func_decl(child)));
                }
                "type_declaration" => {
                    for spec in named_children(child) {
                        match spec.kind() {
                            "type_spec" => decls.push(lowering.lower_type_spec(spec, false)),
                            "type_alias" => decls.push(lowering.lower_type_spec(spec, true)),
                            _ => {}
                        }
                    }
                }
                _ => decls.push(lowering.lower(child)),
            }
        }

        let package = package.ok_or_else(|| CallScopeError::Parse {
            message: "missing package clause".to_string(),
            path: file_path.to_string(),
            line: None,
        })?;

        debug!(
            file = file_path,
            package = %package,
            decls = decls.len(),
            imports = imports.len(),
            "lowered go source"
        );

        Ok(SourceFile {
            name: file_path.to_string(),
            package,
            imports,
            decls,
            base,
            source: source.to_string(),
        })
    }

    /// Parse source code into a tree-sitter tree.
    fn parse_source(file_path: &str, source: &str) -> Result<Tree> {
        let mut parser = Parser::new();
        let language = tree_sitter_go::LANGUAGE;
        parser
            .set_language(&language.into())
            .map_err(|e| CallScopeError::Parse {
                message: format!("failed to load Go grammar: {e}"),
                path: file_path.to_string(),
                line: None,
            })?;
        parser
            .parse(source, None)
            .ok_or_else(|| CallScopeError::Parse {
                message: "tree-sitter parse returned None".to_string(),
                path: file_path.to_string(),
                line: None,
            })
    }
}

impl crate::extraction::LanguageExtractor for GoExtractor {
    fn extensions(&self) -> &[&str] {
        &["go"]
    }

    fn language_name(&self) -> &str {
        "Go"
    }

    fn extract(&self, file_path: &str, source: &str, base: usize) -> Result<SourceFile> {
        GoExtractor::extract_source(file_path, source, base)
    }
}

impl Lowering<'_> {
    fn span(&self, node: TsNode<'_>) -> Span {
        Span::new(self.base + node.start_byte(), self.base + node.end_byte())
    }

    fn text(&self, node: TsNode<'_>) -> String {
        node.utf8_text(self.source)
            .unwrap_or("<invalid utf8>")
            .to_string()
    }

    fn ident(&self, node: TsNode<'_>) -> Ident {
        Ident {
            span: self.span(node),
            name: self.text(node),
        }
    }

    fn boxed(&self, node: Option<TsNode<'_>>, owner: TsNode<'_>) -> Box<Node> {
        Box::new(match node {
            Some(n) => self.lower(n),
            None => self.missing(owner),
        })
    }

    fn boxed_opt(&self, node: Option<TsNode<'_>>) -> Option<Box<Node>> {
        node.map(|n| Box::new(self.lower(n)))
    }

    /// Placeholder for a child the grammar marks optional but a construct needs.
    fn missing(&self, owner: TsNode<'_>) -> Node {
        Node::Other(OtherNode {
            span: Span::new(self.base + owner.end_byte(), self.base + owner.end_byte()),
            kind: "missing".to_string(),
            children: Vec::new(),
        })
    }

    /// Collect import specs from `import "x"` or `import ( ... )`.
    fn lower_imports(&self, node: TsNode<'_>, out: &mut Vec<ImportSpec>) {
        for child in named_children(node) {
            match child.kind() {
                "import_spec" => {
                    let alias = child.child_by_field_name("name").map(|n| self.text(n));
                    let path = child
                        .child_by_field_name("path")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    out.push(ImportSpec {
                        span: self.span(child),
                        alias,
                        path: path.trim_matches(|c| c == '"' || c == '`').to_string(),
                    });
                }
                "import_spec_list" => self.lower_imports(child, out),
                _ => {}
            }
        }
    }

    fn lower_func_decl(&self, node: TsNode<'_>) -> FuncDecl {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.ident(n))
            .unwrap_or_else(|| Ident {
                span: self.span(node),
                name: "<anonymous>".to_string(),
            });
        FuncDecl {
            span: self.span(node),
            receiver: node
                .child_by_field_name("receiver")
                .map(|r| self.lower_field_list(r)),
            name,
            ty: self.lower_func_type(node),
            body: self.boxed_opt(node.child_by_field_name("body")),
        }
    }

    fn lower_type_spec(&self, node: TsNode<'_>, is_alias: bool) -> Node {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.ident(n))
            .unwrap_or_else(|| Ident {
                span: self.span(node),
                name: "<anonymous>".to_string(),
            });
        Node::TypeSpec(TypeSpec {
            span: self.span(node),
            name,
            is_alias,
            ty: self.boxed(node.child_by_field_name("type"), node),
        })
    }

    /// Parameters and result of anything carrying `parameters`/`result` fields.
    fn lower_func_type(&self, node: TsNode<'_>) -> FuncType {
        FuncType {
            span: self.span(node),
            params: node
                .child_by_field_name("parameters")
                .map(|p| self.lower_field_list(p))
                .unwrap_or_default(),
            results: self.lower_results(node.child_by_field_name("result")),
        }
    }

    fn lower_results(&self, node: Option<TsNode<'_>>) -> FieldList {
        match node {
            None => FieldList::default(),
            Some(n) if n.kind() == "parameter_list" => self.lower_field_list(n),
            Some(n) => FieldList {
                span: self.span(n),
                fields: vec![Field {
                    names: Vec::new(),
                    ty: Box::new(self.lower(n)),
                    tag: None,
                }],
            },
        }
    }

    fn lower_field_list(&self, node: TsNode<'_>) -> FieldList {
        let mut fields = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "parameter_declaration" => fields.push(Field {
                    names: self.field_names(child),
                    ty: self.boxed(child.child_by_field_name("type"), child),
                    tag: None,
                }),
                "variadic_parameter_declaration" => fields.push(Field {
                    names: self.field_names(child),
                    ty: Box::new(Node::Ellipsis(Ellipsis {
                        span: self.span(child),
                        elt: self.boxed_opt(child.child_by_field_name("type")),
                    })),
                    tag: None,
                }),
                _ => {}
            }
        }
        FieldList {
            span: self.span(node),
            fields,
        }
    }

    fn field_names(&self, node: TsNode<'_>) -> Vec<Ident> {
        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .map(|n| self.ident(n))
            .collect();
        names
    }

    fn lower_struct_fields(&self, node: TsNode<'_>) -> FieldList {
        let Some(list) = named_children(node)
            .into_iter()
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return FieldList {
                span: self.span(node),
                fields: Vec::new(),
            };
        };

        let mut fields = Vec::new();
        for decl in named_children(list) {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let names = self.field_names(decl);
            let mut ty = self.lower_field(decl, "type");
            if names.is_empty() && has_token(decl, "*") {
                ty = Node::Star(StarExpr {
                    span: self.span(decl),
                    x: Box::new(ty),
                });
            }
            fields.push(Field {
                names,
                ty: Box::new(ty),
                tag: decl.child_by_field_name("tag").map(|t| self.text(t)),
            });
        }
        FieldList {
            span: self.span(list),
            fields,
        }
    }

    fn lower_interface(&self, node: TsNode<'_>) -> FieldList {
        let mut fields = Vec::new();
        for elem in named_children(node) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let names = elem
                        .child_by_field_name("name")
                        .map(|n| vec![self.ident(n)])
                        .unwrap_or_default();
                    fields.push(Field {
                        names,
                        ty: Box::new(Node::FuncType(self.lower_func_type(elem))),
                        tag: None,
                    });
                }
                _ => fields.push(Field {
                    names: Vec::new(),
                    ty: Box::new(self.lower(elem)),
                    tag: None,
                }),
            }
        }
        FieldList {
            span: self.span(node),
            fields,
        }
    }

    fn lower_elements(&self, body: Option<TsNode<'_>>) -> Vec<Node> {
        body.map(|b| named_children(b).into_iter().map(|e| self.lower(e)).collect())
            .unwrap_or_default()
    }

    fn lower_all(&self, nodes: Vec<TsNode<'_>>) -> Vec<Node> {
        nodes.into_iter().map(|n| self.lower(n)).collect()
    }

    /// Lower an expression, type or statement node.
    fn lower(&self, node: TsNode<'_>) -> Node {
        let span = self.span(node);
        match node.kind() {
            "identifier" | "type_identifier" | "field_identifier" | "package_identifier"
            | "blank_identifier" | "label_name" | "dot" | "true" | "false" | "nil" | "iota" => {
                Node::Ident(self.ident(node))
            }
            "int_literal" | "float_literal" | "imaginary_literal" | "rune_literal"
            | "interpreted_string_literal" | "raw_string_literal" => Node::BasicLit(BasicLit {
                span,
                value: self.text(node),
            }),
            "pointer_type" => Node::Star(StarExpr {
                span,
                x: self.boxed(named_children(node).first().copied(), node),
            }),
            "unary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let x = self.boxed(node.child_by_field_name("operand"), node);
                if op == "*" {
                    Node::Star(StarExpr { span, x })
                } else {
                    Node::Unary(UnaryExpr { span, op, x })
                }
            }
            "negated_type" => Node::Unary(UnaryExpr {
                span,
                op: "~".to_string(),
                x: self.boxed(named_children(node).first().copied(), node),
            }),
            "binary_expression" => Node::Binary(BinaryExpr {
                span,
                x: self.boxed(node.child_by_field_name("left"), node),
                op: node
                    .child_by_field_name("operator")
                    .map(|n| self.text(n))
                    .unwrap_or_default(),
                y: self.boxed(node.child_by_field_name("right"), node),
            }),
            "parenthesized_expression" | "parenthesized_type" => Node::Paren(ParenExpr {
                span,
                x: self.boxed(named_children(node).first().copied(), node),
            }),
            "selector_expression" => Node::Selector(SelectorExpr {
                span,
                x: self.boxed(node.child_by_field_name("operand"), node),
                sel: self.field_ident(node, "field"),
            }),
            "qualified_type" => Node::Selector(SelectorExpr {
                span,
                x: self.boxed(node.child_by_field_name("package"), node),
                sel: self.field_ident(node, "name"),
            }),
            "call_expression" => {
                let mut fun = self.boxed(node.child_by_field_name("function"), node);
                if let Some(type_args) = node.child_by_field_name("type_arguments") {
                    fun = Box::new(Node::Index(IndexExpr {
                        span: Span::new(fun.span().start, self.span(type_args).end),
                        x: fun,
                        indices: self.lower_all(named_children(type_args)),
                    }));
                }
                Node::Call(CallExpr {
                    span,
                    fun,
                    args: self.lower_elements(node.child_by_field_name("arguments")),
                })
            }
            "type_conversion_expression" => Node::Call(CallExpr {
                span,
                fun: self.boxed(node.child_by_field_name("type"), node),
                args: vec![self.lower_field(node, "operand")],
            }),
            "index_expression" => {
                let mut cursor = node.walk();
                let indices: Vec<TsNode<'_>> =
                    node.children_by_field_name("index", &mut cursor).collect();
                Node::Index(IndexExpr {
                    span,
                    x: self.boxed(node.child_by_field_name("operand"), node),
                    indices: self.lower_all(indices),
                })
            }
            "generic_type" => Node::Index(IndexExpr {
                span,
                x: self.boxed(node.child_by_field_name("type"), node),
                indices: node
                    .child_by_field_name("type_arguments")
                    .map(|args| self.lower_all(named_children(args)))
                    .unwrap_or_default(),
            }),
            "type_instantiation_expression" => {
                let mut parts = named_children(node).into_iter();
                let x = self.boxed(parts.next(), node);
                Node::Index(IndexExpr {
                    span,
                    x,
                    indices: self.lower_all(parts.collect()),
                })
            }
            "slice_expression" => {
                let max = self.boxed_opt(node.child_by_field_name("capacity"));
                Node::Slice(SliceExpr {
                    span,
                    x: self.boxed(node.child_by_field_name("operand"), node),
                    low: self.boxed_opt(node.child_by_field_name("start")),
                    high: self.boxed_opt(node.child_by_field_name("end")),
                    slice3: max.is_some(),
                    max,
                })
            }
            "type_assertion_expression" => Node::TypeAssert(TypeAssertExpr {
                span,
                x: self.boxed(node.child_by_field_name("operand"), node),
                ty: self.boxed_opt(node.child_by_field_name("type")),
            }),
            "composite_literal" => Node::CompositeLit(CompositeLit {
                span,
                ty: self.boxed_opt(node.child_by_field_name("type")),
                elements: self.lower_elements(node.child_by_field_name("body")),
            }),
            "literal_value" => Node::CompositeLit(CompositeLit {
                span,
                ty: None,
                elements: self.lower_elements(Some(node)),
            }),
            "keyed_element" => {
                let parts = named_children(node);
                Node::KeyValue(KeyValueExpr {
                    span,
                    key: self.boxed(parts.first().copied(), node),
                    value: self.boxed(parts.get(1).copied(), node),
                })
            }
            "literal_element" => {
                let parts = named_children(node);
                match parts.as_slice() {
                    [single] => self.lower(*single),
                    _ => self.other(node),
                }
            }
            // `~int | ~float64` folds left into `|` binaries.
            "type_elem" | "type_constraint" => {
                let mut terms = named_children(node).into_iter();
                match terms.next() {
                    Some(first) => terms.fold(self.lower(first), |x, term| {
                        Node::Binary(BinaryExpr {
                            span,
                            x: Box::new(x),
                            op: "|".to_string(),
                            y: Box::new(self.lower(term)),
                        })
                    }),
                    None => self.other(node),
                }
            }
            "func_literal" => Node::FuncLit(FuncLit {
                span,
                ty: self.lower_func_type(node),
                body: self.boxed(node.child_by_field_name("body"), node),
            }),
            "function_type" => Node::FuncType(self.lower_func_type(node)),
            "array_type" => Node::ArrayType(ArrayType {
                span,
                len: self.boxed_opt(node.child_by_field_name("length")),
                elt: self.boxed(node.child_by_field_name("element"), node),
            }),
            "implicit_length_array_type" => Node::ArrayType(ArrayType {
                span,
                len: Some(Box::new(Node::Ellipsis(Ellipsis { span, elt: None }))),
                elt: self.boxed(node.child_by_field_name("element"), node),
            }),
            "slice_type" => Node::ArrayType(ArrayType {
                span,
                len: None,
                elt: self.boxed(node.child_by_field_name("element"), node),
            }),
            "map_type" => Node::MapType(MapType {
                span,
                key: self.boxed(node.child_by_field_name("key"), node),
                value: self.boxed(node.child_by_field_name("value"), node),
            }),
            "channel_type" => Node::ChanType(ChanType {
                span,
                dir: chan_dir(node),
                value: self.boxed(node.child_by_field_name("value"), node),
            }),
            "struct_type" => Node::StructType(StructType {
                span,
                fields: self.lower_struct_fields(node),
            }),
            "interface_type" => Node::InterfaceType(InterfaceType {
                span,
                methods: self.lower_interface(node),
            }),
            "variadic_argument" => Node::Ellipsis(Ellipsis {
                span,
                elt: self.boxed_opt(named_children(node).first().copied()),
            }),
            _ => self.other(node),
        }
    }

    fn lower_field(&self, node: TsNode<'_>, field: &str) -> Node {
        match node.child_by_field_name(field) {
            Some(n) => self.lower(n),
            None => self.missing(node),
        }
    }

    fn field_ident(&self, node: TsNode<'_>, field: &str) -> Ident {
        node.child_by_field_name(field)
            .map(|n| self.ident(n))
            .unwrap_or_else(|| Ident {
                span: self.span(node),
                name: String::new(),
            })
    }

    fn other(&self, node: TsNode<'_>) -> Node {
        Node::Other(OtherNode {
            span: self.span(node),
            kind: node.kind().to_string(),
            children: self.lower_all(named_children(node)),
        })
    }
}

/// Named children of a node, skipping comments.
fn named_children(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    children
}

/// Whether an anonymous token of the given kind is a direct child.
fn has_token(node: TsNode<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == token);
    found
}

/// Direction of a `channel_type`: `<-chan T` receives, `chan<- T` sends.
fn chan_dir(node: TsNode<'_>) -> ChanDir {
    let mut cursor = node.walk();
    let tokens: Vec<&str> = node
        .children(&mut cursor)
        .filter(|c| !c.is_named())
        .map(|c| c.kind())
        .collect();
    match tokens.as_slice() {
        ["<-", ..] => ChanDir::Recv,
        t if t.contains(&"<-") => ChanDir::Send,
        _ => ChanDir::Both,
    }
}

/// First ERROR or MISSING node in document order.
fn find_error(node: TsNode<'_>) -> Option<TsNode<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<TsNode<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(find_error)
}
