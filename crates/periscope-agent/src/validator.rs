//! Side-effect validation for conditions and watch expressions.
//!
//! A parsed program is accepted only when it is empty (always true) or a
//! single read-only expression: every node must fall into the whitelist of
//! literals, reads, operators, grouping, and literal containers. Anything
//! that can write, transfer control, or run user code is rejected by name.

use thiserror::Error;

use crate::ast::{Expr, ExprKind, Program, StmtKind, UnaryOp};

/// Rejection produced by the whitelist walk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// What was rejected.
    pub message: String,
}

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Reduce a program to its single read-only expression.
///
/// Returns `None` for an empty program (empty string or bare `;`), which
/// callers treat as "always true".
pub fn validate_program(program: Program) -> Result<Option<Expr>, ValidationError> {
    let mut expression = None;
    for stmt in program.statements {
        match stmt.kind {
            StmtKind::Empty => {}
            StmtKind::Expr(expr) => {
                if expression.is_some() {
                    return Err(ValidationError::new("only a single expression is allowed"));
                }
                check_expr(&expr)?;
                expression = Some(expr);
            }
            StmtKind::VarDecl => {
                return Err(ValidationError::new("variable declarations are not allowed"))
            }
            StmtKind::FunctionDecl => {
                return Err(ValidationError::new("function declarations are not allowed"))
            }
            StmtKind::Return => return Err(ValidationError::new("`return` is not allowed")),
            StmtKind::Throw => return Err(ValidationError::new("`throw` is not allowed")),
            StmtKind::Debugger => {
                return Err(ValidationError::new("`debugger` is not allowed"))
            }
            StmtKind::Block => return Err(ValidationError::new("blocks are not allowed")),
            StmtKind::If => return Err(ValidationError::new("`if` statements are not allowed")),
            StmtKind::While | StmtKind::DoWhile | StmtKind::For => {
                return Err(ValidationError::new("loops are not allowed"))
            }
            StmtKind::Try => return Err(ValidationError::new("`try` is not allowed")),
        }
    }
    Ok(expression)
}

fn check_expr(expr: &Expr) -> Result<(), ValidationError> {
    match &expr.kind {
        ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Undefined
        | ExprKind::This
        | ExprKind::Ident(_) => Ok(()),
        ExprKind::Array(elements) => {
            for element in elements {
                check_expr(element)?;
            }
            Ok(())
        }
        ExprKind::Object(properties) => {
            for (_, value) in properties {
                check_expr(value)?;
            }
            Ok(())
        }
        ExprKind::Member { object, .. } => check_expr(object),
        ExprKind::Index { object, index } => {
            check_expr(object)?;
            check_expr(index)
        }
        ExprKind::Unary { op, operand } => {
            if *op == UnaryOp::Delete {
                return Err(ValidationError::new("`delete` is not allowed"));
            }
            check_expr(operand)
        }
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            check_expr(left)?;
            check_expr(right)
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            check_expr(test)?;
            check_expr(consequent)?;
            check_expr(alternate)
        }
        ExprKind::Sequence(parts) => {
            for part in parts {
                check_expr(part)?;
            }
            Ok(())
        }
        ExprKind::Assign { .. } => Err(ValidationError::new("assignment is not allowed")),
        ExprKind::Update { .. } => {
            Err(ValidationError::new("increment/decrement is not allowed"))
        }
        ExprKind::Call { .. } => Err(ValidationError::new("function calls are not allowed")),
        ExprKind::New { .. } => Err(ValidationError::new("`new` is not allowed")),
        ExprKind::Function => {
            Err(ValidationError::new("function expressions are not allowed"))
        }
        ExprKind::Arrow => Err(ValidationError::new("arrow functions are not allowed")),
    }
}
