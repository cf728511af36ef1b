//! Abstract Syntax Tree definitions for Xi Script
//!
//! Nodes are stored in flat arenas inside a [`Program`] and refer to each
//! other by id. A `Program` is immutable once the parser hands it out, so it
//! can be wrapped in an `Rc` and executed by any number of interpreters.

use crate::frontend::token::TokenKind;

/// Index of an expression in [`Program::exprs`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

/// Index of a statement in [`Program::stmts`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(u32);

/// Index of a function definition in [`Program::functions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(u32);

/// A sequence of statements
pub type Block = Vec<StmtId>;

/// A parsed compilation unit
#[derive(Debug, Clone, Default)]
pub struct Program {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    functions: Vec<FunctionDef>,
    /// Top-level statements in source order
    pub body: Block,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0 as usize]
    }

    pub fn function(&self, id: FuncId) -> &FunctionDef {
        &self.functions[id.0 as usize]
    }

    pub fn add_expr(&mut self, kind: ExprKind, line: usize) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr { kind, line });
        id
    }

    pub fn add_stmt(&mut self, kind: StmtKind, line: usize) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(Stmt { kind, line });
        id
    }

    pub fn add_function(&mut self, def: FunctionDef) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(def);
        id
    }

    /// True when there are no top-level statements
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Number of function literals and declarations in the program
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

// ==================== Expressions ====================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
    Identifier(String),
    Binary { op: BinOp, left: ExprId, right: ExprId },
    Unary { op: UnaryOp, operand: ExprId },
    Call { callee: ExprId, args: Vec<ExprId> },
    Index { object: ExprId, index: ExprId },
    Member { object: ExprId, name: String },
    /// Key/value pairs in source order
    Table(Vec<(ExprId, ExprId)>),
    Function(FuncId),
}

/// Parameters and body shared by function literals and declarations
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub params: Vec<String>,
    pub body: Block,
    pub line: usize,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn from_token(kind: TokenKind) -> Option<BinOp> {
        Some(match kind {
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            TokenKind::Percent => BinOp::Mod,
            TokenKind::Caret => BinOp::Pow,
            TokenKind::Concat => BinOp::Concat,
            TokenKind::EqualEqual => BinOp::Eq,
            TokenKind::NotEqual => BinOp::Ne,
            TokenKind::Less => BinOp::Lt,
            TokenKind::LessEqual => BinOp::Le,
            TokenKind::Greater => BinOp::Gt,
            TokenKind::GreaterEqual => BinOp::Ge,
            TokenKind::And => BinOp::And,
            TokenKind::Or => BinOp::Or,
            _ => return None,
        })
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// -
    Neg,
    /// not
    Not,
    /// #
    Len,
}

impl UnaryOp {
    pub fn from_token(kind: TokenKind) -> Option<UnaryOp> {
        match kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Hash => Some(UnaryOp::Len),
            _ => None,
        }
    }
}

// ==================== Statements ====================

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(ExprId),
    Local {
        name: String,
        init: Option<ExprId>,
    },
    /// Target is an Identifier, Index or Member expression
    Assign {
        target: ExprId,
        value: ExprId,
    },
    If {
        cond: ExprId,
        then_body: Block,
        elseifs: Vec<(ExprId, Block)>,
        else_body: Option<Block>,
    },
    While {
        cond: ExprId,
        body: Block,
    },
    Repeat {
        body: Block,
        cond: ExprId,
    },
    NumericFor {
        var: String,
        start: ExprId,
        end: ExprId,
        step: Option<ExprId>,
        body: Block,
    },
    GenericFor {
        vars: Vec<String>,
        iterator: ExprId,
        body: Block,
    },
    FunctionDecl {
        name: String,
        func: FuncId,
        is_local: bool,
    },
    Return(Vec<ExprId>),
    Break,
    Block(Block),
}
