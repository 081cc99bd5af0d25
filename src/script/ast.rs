// AST definitions for stack trace scripts

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// One script statement. Every address and size is kept as `u64` here and
/// narrowed to the machine's pointer width at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `memory <pages>`
    Memory { pages: u64, location: SourceLocation },
    /// `layout high=<addr> low=<addr>`
    Layout {
        high: u64,
        low: u64,
        location: SourceLocation,
    },
    /// `init`
    Init { location: SourceLocation },
    /// `call <name> <bytes>`
    Call {
        name: String,
        size: u64,
        location: SourceLocation,
    },
    /// `ret`
    Ret { location: SourceLocation },
    /// `alloc <bytes>`
    Alloc { size: u64, location: SourceLocation },
    /// `save`
    Save { location: SourceLocation },
    /// `restore`
    Restore { location: SourceLocation },
    /// `sp <addr>`
    SetStackPointer {
        address: u64,
        location: SourceLocation,
    },
    /// `limits base=<addr> end=<addr>`
    Limits {
        base: u64,
        end: u64,
        location: SourceLocation,
    },
    /// `fiber <name> base=<addr> end=<addr>`
    Fiber {
        name: String,
        base: u64,
        end: u64,
        location: SourceLocation,
    },
    /// `switch <name>`
    Switch {
        name: String,
        location: SourceLocation,
    },
    /// `report`
    Report { location: SourceLocation },
}

impl Statement {
    pub fn location(&self) -> SourceLocation {
        match self {
            Statement::Memory { location, .. }
            | Statement::Layout { location, .. }
            | Statement::Init { location }
            | Statement::Call { location, .. }
            | Statement::Ret { location }
            | Statement::Alloc { location, .. }
            | Statement::Save { location }
            | Statement::Restore { location }
            | Statement::SetStackPointer { location, .. }
            | Statement::Limits { location, .. }
            | Statement::Fiber { location, .. }
            | Statement::Switch { location, .. }
            | Statement::Report { location } => *location,
        }
    }

    /// The script keyword that introduces this statement
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Memory { .. } => "memory",
            Statement::Layout { .. } => "layout",
            Statement::Init { .. } => "init",
            Statement::Call { .. } => "call",
            Statement::Ret { .. } => "ret",
            Statement::Alloc { .. } => "alloc",
            Statement::Save { .. } => "save",
            Statement::Restore { .. } => "restore",
            Statement::SetStackPointer { .. } => "sp",
            Statement::Limits { .. } => "limits",
            Statement::Fiber { .. } => "fiber",
            Statement::Switch { .. } => "switch",
            Statement::Report { .. } => "report",
        }
    }
}

/// Keywords recognized at the start of a statement
pub const KEYWORDS: &[&str] = &[
    "memory", "layout", "init", "call", "ret", "alloc", "save", "restore", "sp", "limits",
    "fiber", "switch", "report",
];

/// A parsed script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new() -> Self {
        Program {
            statements: Vec::new(),
        }
    }
}
