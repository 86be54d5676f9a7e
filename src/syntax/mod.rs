/// Language-neutral syntax tree consumed by the resolver and the traversal
/// driver.
///
/// Front ends lower their parser's output into these nodes. Every node kind the
/// resolver understands has its own variant; anything else is carried as
/// [`Node::Other`] so that its children can still be walked.
mod source_map;

pub use source_map::SourceMap;

use serde::{Deserialize, Serialize};

/// Half-open byte range in the global offset space of a [`SourceMap`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// One parsed translation unit.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub package: String,
    pub imports: Vec<ImportSpec>,
    /// Top-level declarations in source order.
    pub decls: Vec<Node>,
    /// Global offset of the first byte of `source`.
    pub base: usize,
    pub source: String,
}

impl SourceFile {
    /// Source text covered by a global span, if it lies inside this file.
    pub fn text(&self, span: Span) -> Option<&str> {
        let start = span.start.checked_sub(self.base)?;
        let end = span.end.checked_sub(self.base)?;
        self.source.get(start..end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub span: Span,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    pub span: Span,
    pub alias: Option<String>,
    pub path: String,
}

/// One entry of a parameter, result, receiver or struct field list.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub names: Vec<Ident>,
    pub ty: Box<Node>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldList {
    pub span: Span,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub span: Span,
    pub receiver: Option<FieldList>,
    pub name: Ident,
    pub ty: FuncType,
    pub body: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub span: Span,
    pub name: Ident,
    pub is_alias: bool,
    pub ty: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicLit {
    pub span: Span,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StarExpr {
    pub span: Span,
    pub x: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub span: Span,
    pub op: String,
    pub x: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub span: Span,
    pub x: Box<Node>,
    pub op: String,
    pub y: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParenExpr {
    pub span: Span,
    pub x: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorExpr {
    pub span: Span,
    pub x: Box<Node>,
    pub sel: Ident,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub span: Span,
    pub fun: Box<Node>,
    pub args: Vec<Node>,
}

/// `x[i]`, or a generic instantiation `x[A, B]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub span: Span,
    pub x: Box<Node>,
    pub indices: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliceExpr {
    pub span: Span,
    pub x: Box<Node>,
    pub low: Option<Box<Node>>,
    pub high: Option<Box<Node>>,
    pub max: Option<Box<Node>>,
    pub slice3: bool,
}

/// `x.(T)`; `ty` is `None` for a type switch guard `x.(type)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAssertExpr {
    pub span: Span,
    pub x: Box<Node>,
    pub ty: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeLit {
    pub span: Span,
    pub ty: Option<Box<Node>>,
    pub elements: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueExpr {
    pub span: Span,
    pub key: Box<Node>,
    pub value: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncLit {
    pub span: Span,
    pub ty: FuncType,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncType {
    pub span: Span,
    pub params: FieldList,
    pub results: FieldList,
}

/// `[N]T` when `len` is set, `[]T` otherwise. `[...]T` carries an
/// [`Node::Ellipsis`] without element as its length.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub span: Span,
    pub len: Option<Box<Node>>,
    pub elt: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapType {
    pub span: Span,
    pub key: Box<Node>,
    pub value: Box<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChanType {
    pub span: Span,
    pub dir: ChanDir,
    pub value: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub span: Span,
    pub fields: FieldList,
}

/// Methods carry one name and a [`Node::FuncType`]; embedded types carry no name.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceType {
    pub span: Span,
    pub methods: FieldList,
}

/// `...T` in a variadic parameter or spread argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipsis {
    pub span: Span,
    pub elt: Option<Box<Node>>,
}

/// Statement, block or any construct without a dedicated variant.
#[derive(Debug, Clone, PartialEq)]
pub struct OtherNode {
    pub span: Span,
    pub kind: String,
    pub children: Vec<Node>,
}

/// Closed set of syntax node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    FuncDecl(FuncDecl),
    TypeSpec(TypeSpec),
    Ident(Ident),
    BasicLit(BasicLit),
    Star(StarExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Paren(ParenExpr),
    Selector(SelectorExpr),
    Call(CallExpr),
    Index(IndexExpr),
    Slice(SliceExpr),
    TypeAssert(TypeAssertExpr),
    CompositeLit(CompositeLit),
    KeyValue(KeyValueExpr),
    FuncLit(FuncLit),
    FuncType(FuncType),
    ArrayType(ArrayType),
    MapType(MapType),
    ChanType(ChanType),
    StructType(StructType),
    InterfaceType(InterfaceType),
    Ellipsis(Ellipsis),
    Other(OtherNode),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::FuncDecl(n) => n.span,
            Node::TypeSpec(n) => n.span,
            Node::Ident(n) => n.span,
            Node::BasicLit(n) => n.span,
            Node::Star(n) => n.span,
            Node::Unary(n) => n.span,
            Node::Binary(n) => n.span,
            Node::Paren(n) => n.span,
            Node::Selector(n) => n.span,
            Node::Call(n) => n.span,
            Node::Index(n) => n.span,
            Node::Slice(n) => n.span,
            Node::TypeAssert(n) => n.span,
            Node::CompositeLit(n) => n.span,
            Node::KeyValue(n) => n.span,
            Node::FuncLit(n) => n.span,
            Node::FuncType(n) => n.span,
            Node::ArrayType(n) => n.span,
            Node::MapType(n) => n.span,
            Node::ChanType(n) => n.span,
            Node::StructType(n) => n.span,
            Node::InterfaceType(n) => n.span,
            Node::Ellipsis(n) => n.span,
            Node::Other(n) => n.span,
        }
    }

    /// Short tag naming the node kind, used in diagnostics.
    pub fn kind_name(&self) -> &str {
        match self {
            Node::FuncDecl(_) => "func_decl",
            Node::TypeSpec(_) => "type_spec",
            Node::Ident(_) => "ident",
            Node::BasicLit(_) => "basic_lit",
            Node::Star(_) => "star",
            Node::Unary(_) => "unary",
            Node::Binary(_) => "binary",
            Node::Paren(_) => "paren",
            Node::Selector(_) => "selector",
            Node::Call(_) => "call",
            Node::Index(_) => "index",
            Node::Slice(_) => "slice",
            Node::TypeAssert(_) => "type_assert",
            Node::CompositeLit(_) => "composite_lit",
            Node::KeyValue(_) => "key_value",
            Node::FuncLit(_) => "func_lit",
            Node::FuncType(_) => "func_type",
            Node::ArrayType(_) => "array_type",
            Node::MapType(_) => "map_type",
            Node::ChanType(_) => "chan_type",
            Node::StructType(_) => "struct_type",
            Node::InterfaceType(_) => "interface_type",
            Node::Ellipsis(_) => "ellipsis",
            Node::Other(n) => &n.kind,
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        match self {
            Node::FuncDecl(n) => {
                if let Some(receiver) = &n.receiver {
                    push_fields(&mut out, receiver);
                }
                push_func_type(&mut out, &n.ty);
                if let Some(body) = &n.body {
                    out.push(body.as_ref());
                }
            }
            Node::TypeSpec(n) => out.push(n.ty.as_ref()),
            Node::Ident(_) | Node::BasicLit(_) => {}
            Node::Star(n) => out.push(n.x.as_ref()),
            Node::Unary(n) => out.push(n.x.as_ref()),
            Node::Binary(n) => {
                out.push(n.x.as_ref());
                out.push(n.y.as_ref());
            }
            Node::Paren(n) => out.push(n.x.as_ref()),
            Node::Selector(n) => out.push(n.x.as_ref()),
            Node::Call(n) => {
                out.push(n.fun.as_ref());
                out.extend(n.args.iter());
            }
            Node::Index(n) => {
                out.push(n.x.as_ref());
                out.extend(n.indices.iter());
            }
            Node::Slice(n) => {
                out.push(n.x.as_ref());
                for bound in [&n.low, &n.high, &n.max].into_iter().flatten() {
                    out.push(bound.as_ref());
                }
            }
            Node::TypeAssert(n) => {
                out.push(n.x.as_ref());
                if let Some(ty) = &n.ty {
                    out.push(ty.as_ref());
                }
            }
            Node::CompositeLit(n) => {
                if let Some(ty) = &n.ty {
                    out.push(ty.as_ref());
                }
                out.extend(n.elements.iter());
            }
            Node::KeyValue(n) => {
                out.push(n.key.as_ref());
                out.push(n.value.as_ref());
            }
            Node::FuncLit(n) => {
                push_func_type(&mut out, &n.ty);
                out.push(n.body.as_ref());
            }
            Node::FuncType(n) => push_func_type(&mut out, n),
            Node::ArrayType(n) => {
                if let Some(len) = &n.len {
                    out.push(len.as_ref());
                }
                out.push(n.elt.as_ref());
            }
            Node::MapType(n) => {
                out.push(n.key.as_ref());
                out.push(n.value.as_ref());
            }
            Node::ChanType(n) => out.push(n.value.as_ref()),
            Node::StructType(n) => push_fields(&mut out, &n.fields),
            Node::InterfaceType(n) => push_fields(&mut out, &n.methods),
            Node::Ellipsis(n) => {
                if let Some(elt) = &n.elt {
                    out.push(elt.as_ref());
                }
            }
            Node::Other(n) => out.extend(n.children.iter()),
        }
        out
    }
}

fn push_fields<'a>(out: &mut Vec<&'a Node>, list: &'a FieldList) {
    out.extend(list.fields.iter().map(|f| f.ty.as_ref()));
}

fn push_func_type<'a>(out: &mut Vec<&'a Node>, ty: &'a FuncType) {
    push_fields(out, &ty.params);
    push_fields(out, &ty.results);
}
