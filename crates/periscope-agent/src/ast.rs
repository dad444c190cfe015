//! AST for the condition/expression dialect.
//!
//! The tree covers more than the validator accepts: assignment, update,
//! call, `new`, declarations, and statement forms all parse so that the
//! validator can reject them by name rather than by parse failure.

use crate::token::Span;

/// A parsed program: the statement list of one condition or expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements.
    pub statements: Vec<Stmt>,
}

/// Statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// Statement kind.
    pub kind: StmtKind,
    /// Source range.
    pub span: Span,
}

/// Statement kinds.
///
/// Everything except `Expr` and `Empty` exists only to be rejected with a
/// precise message; payloads are not retained beyond what parsing needs.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression statement.
    Expr(Expr),
    /// Bare `;`.
    Empty,
    /// `var`/`let`/`const` declaration.
    VarDecl,
    /// `function name(...) {...}` declaration.
    FunctionDecl,
    /// `return ...`.
    Return,
    /// `throw ...`.
    Throw,
    /// `debugger`.
    Debugger,
    /// `{ ... }` block.
    Block,
    /// `if (...) ... else ...`.
    If,
    /// `while (...) ...`.
    While,
    /// `do ... while (...)`.
    DoWhile,
    /// `for (...) ...` (classic and for-in forms).
    For,
    /// `try { ... } catch/finally`.
    Try,
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Expression kind.
    pub kind: ExprKind,
    /// Source range.
    pub span: Span,
}

/// Object-literal property key.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// `{ f: ... }`
    Ident(String),
    /// `{ "f": ... }`
    String(String),
    /// `{ 1: ... }`
    Number(f64),
}

impl PropertyKey {
    /// The key as a member name.
    pub fn as_name(&self) -> String {
        match self {
            PropertyKey::Ident(name) | PropertyKey::String(name) => name.clone(),
            PropertyKey::Number(n) => crate::value::render_number(*n),
        }
    }
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal.
    Number(f64),
    /// String literal.
    String(String),
    /// Boolean literal.
    Bool(bool),
    /// `null`.
    Null,
    /// `undefined`.
    Undefined,
    /// `this`.
    This,
    /// Identifier read.
    Ident(String),
    /// `[a, b, ...]`.
    Array(Vec<Expr>),
    /// `{ k: v, ... }`.
    Object(Vec<(PropertyKey, Expr)>),
    /// `obj.prop`.
    Member {
        /// Object expression.
        object: Box<Expr>,
        /// Property name.
        property: String,
    },
    /// `obj[index]`.
    Index {
        /// Object expression.
        object: Box<Expr>,
        /// Subscript expression.
        index: Box<Expr>,
    },
    /// Prefix unary operator.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Binary operator.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Short-circuit logical operator.
    Logical {
        /// Operator.
        op: LogicalOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `test ? consequent : alternate`.
    Conditional {
        /// Test expression.
        test: Box<Expr>,
        /// Value when truthy.
        consequent: Box<Expr>,
        /// Value when falsy.
        alternate: Box<Expr>,
    },
    /// `a, b, c` comma sequence.
    Sequence(Vec<Expr>),
    /// Any assignment form, including compound assignment.
    Assign {
        /// Assignment target.
        target: Box<Expr>,
        /// Assigned value.
        value: Box<Expr>,
    },
    /// `++`/`--`, prefix or postfix.
    Update {
        /// Operand.
        operand: Box<Expr>,
    },
    /// Function invocation.
    Call {
        /// Callee expression.
        callee: Box<Expr>,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// `new Callee(...)`.
    New {
        /// Constructed expression.
        callee: Box<Expr>,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// `function (...) { ... }` expression.
    Function,
    /// `(...) => ...` arrow expression.
    Arrow,
}

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `+`
    Plus,
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `typeof`
    Typeof,
    /// `void`
    Void,
    /// `delete`
    Delete,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>`
    UShr,
    /// `in`
    In,
    /// `instanceof`
    Instanceof,
}

/// Short-circuit logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
}
