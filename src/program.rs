use crate::{
    memory::Value,
    span::Span,
    symbol::{canonical, fx_map, FxMap},
};

/// Stack size used when `.stack` is absent or has no operand.
pub const DEFAULT_STACK_SIZE: u16 = 0x100;

/// A code segment line, kept as written. Decoded when executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    pub text: String,
    pub span: Span,
}

/// A `name db value` line from the data segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataDecl {
    pub name: String,
    pub value: Value,
    pub span: Span,
}

/// Everything the loader extracts from a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub(crate) model: Option<String>,
    pub(crate) stack_size: u16,
    pub(crate) data: Vec<DataDecl>,
    pub(crate) stmts: Vec<Stmt>,
    /// Label -> index of the instruction following it
    pub(crate) labels: FxMap<String, usize>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    pub fn new() -> Self {
        Program {
            model: None,
            stack_size: DEFAULT_STACK_SIZE,
            data: Vec::new(),
            stmts: Vec::new(),
            labels: fx_map(),
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn stack_size(&self) -> u16 {
        self.stack_size
    }

    pub fn data(&self) -> &[DataDecl] {
        &self.data
    }

    pub fn get(&self, idx: usize) -> Option<&Stmt> {
        self.stmts.get(idx)
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stmt> {
        self.stmts.iter()
    }

    /// Instruction index recorded for `name`.
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(&canonical(name)).copied()
    }

    /// Labels in definition order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.iter().map(|(name, idx)| (name.as_str(), *idx))
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Stmt;
    type IntoIter = std::slice::Iter<'a, Stmt>;
    fn into_iter(self) -> Self::IntoIter {
        self.stmts.iter()
    }
}
