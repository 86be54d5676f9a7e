use std::fmt;

use serde::{Deserialize, Serialize};

use crate::syntax::Span;

/// Handle to a declaration stored in a declaration arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub(crate) usize);

impl DeclId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a call site stored in a call-site arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallId(pub(crate) usize);

impl CallId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Deterministic textual reduction of an expression or type node.
///
/// Only the expression resolver builds non-empty values. An empty value is a
/// degraded result for a node the resolver does not understand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalType(String);

impl CanonicalType {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One parameter, result, struct field, receiver or call argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub package: String,
    pub name: String,
    pub is_pointer: bool,
    pub canonical_type: CanonicalType,
    /// Shares the type annotation written on a later parameter (`a` in `a, b int`).
    pub grouped_with_next: bool,
    /// Call argument: `name` holds the argument's canonical text, the type is empty.
    pub is_argument: bool,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.grouped_with_next {
            return f.write_str(&self.name);
        }
        if !self.name.is_empty() && !self.canonical_type.is_empty() {
            write!(f, "{} ", self.name)?;
        } else {
            f.write_str(&self.name)?;
        }
        if self.is_pointer {
            f.write_str("*")?;
        }
        write!(f, "{}", self.canonical_type)
    }
}

/// Ordered parameter sequence, rendered as `(p1, p2, ...)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterList(pub Vec<Parameter>);

impl ParameterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.0.iter()
    }

    pub fn push(&mut self, parameter: Parameter) {
        self.0.push(parameter);
    }

    pub fn extend(&mut self, other: ParameterList) {
        self.0.extend(other.0);
    }

    /// Renders the list as it appears after a signature: nothing when empty,
    /// a bare type for one unnamed result, otherwise the parenthesized list.
    pub fn render_returns(&self) -> String {
        match self.0.as_slice() {
            [] => String::new(),
            [single] if single.name.is_empty() => format!(" {}", single),
            _ => format!(" {}", self),
        }
    }

    /// Renders the entries joined by `sep` without surrounding parentheses.
    pub fn join(&self, sep: &str) -> String {
        self.0
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

impl fmt::Display for ParameterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.join(", "))
    }
}

impl<'a> IntoIterator for &'a ParameterList {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub package: String,
    pub receiver: Option<Parameter>,
    pub name: String,
    pub parameters: ParameterList,
    pub returns: ParameterList,
    pub span: Span,
    pub file: String,
    pub source_text: Option<String>,
    /// Call sites written inside this declaration's body.
    pub outbound: Vec<CallId>,
    /// Call sites linked to this declaration.
    pub inbound: Vec<CallId>,
}

impl Declaration {
    /// Receiver type used in the identity key, with type arguments removed.
    pub fn receiver_type(&self) -> Option<&str> {
        let receiver = self.receiver.as_ref()?;
        let base = receiver
            .canonical_type
            .as_str()
            .split('[')
            .next()
            .unwrap_or_default();
        if base.is_empty() {
            None
        } else {
            Some(base)
        }
    }

    /// Identity key: `package.receiverType.name`, receiver segment omitted when absent.
    pub fn identifier(&self) -> String {
        match self.receiver_type() {
            Some(receiver) => format!("{}.{}.{}", self.package, receiver, self.name),
            None => format!("{}.{}", self.package, self.name),
        }
    }

    pub fn is_method(&self) -> bool {
        self.receiver_type().is_some()
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func ")?;
        if let Some(receiver) = self.receiver.as_ref().filter(|_| self.is_method()) {
            write!(f, "({}) ", receiver)?;
        }
        write!(
            f,
            "{}{}{}",
            self.name,
            self.parameters,
            self.returns.render_returns()
        )
    }
}

/// Resolved source location of a call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub file: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based byte column.
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One syntactic invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSite {
    pub package: String,
    /// Canonical callee name, e.g. `p.getA`, `strings.Contains`, `x.getA`.
    pub callee: String,
    pub arguments: ParameterList,
    /// Enclosing declaration, `None` for package-level initializers.
    pub caller: Option<DeclId>,
    /// Declaration the callee links to, `None` while unresolved.
    pub resolved: Option<DeclId>,
    /// Global byte offset of the call expression.
    pub offset: usize,
    pub position: Option<Position>,
    /// The callee's base names an imported package.
    pub imported: bool,
}

impl CallSite {
    pub fn identifier(&self) -> &str {
        &self.callee
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.callee, self.arguments)
    }
}

/// What a top-level type declaration defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Struct,
    Interface,
    Named,
    Alias,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
            TypeKind::Named => "named",
            TypeKind::Alias => "alias",
        }
    }
}

/// A type declaration together with the methods whose receiver names it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRecord {
    pub package: String,
    pub name: String,
    pub kind: TypeKind,
    pub fields: ParameterList,
    pub methods: Vec<DeclId>,
}

impl StructureRecord {
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

/// An import spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Last segment of the import path.
    pub name: String,
    pub alias: Option<String>,
    pub path: String,
}

impl Import {
    pub fn new(path: &str, alias: Option<&str>) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        Self {
            name,
            alias: alias.map(str::to_string),
            path: path.to_string(),
        }
    }

    /// Name the importing file uses to refer to the package.
    pub fn reference_name(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() && alias != "_" => alias,
            _ => &self.name,
        }
    }
}

/// Non-fatal note from the resolver about a node it could not reduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub offset: usize,
    pub node_kind: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}: {} ({})",
            self.file, self.offset, self.message, self.node_kind
        )
    }
}

/// Summary of a linking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Call sites whose edge was created or moved by this pass.
    pub changed: usize,
}
