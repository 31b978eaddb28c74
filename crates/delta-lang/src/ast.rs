//! Syntax tree of the associative language
//!
//! [`AstNode`] is the unit a graph subtree is made of. Every node renders
//! back to parseable source through [`std::fmt::Display`], which is how the
//! graph compiler turns subtrees into source fragments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstNode {
    /// `target = value;`
    Assign(Assignment),
    /// `def name(params) = body;`
    Function(FunctionDef),
}

impl AstNode {
    /// Name this statement binds (variable or function)
    #[must_use]
    pub fn bound_name(&self) -> &str {
        match self {
            Self::Assign(assign) => &assign.target,
            Self::Function(def) => &def.name,
        }
    }

    /// Assignment target, if this is an assignment
    #[must_use]
    pub fn assigned_variable(&self) -> Option<&str> {
        match self {
            Self::Assign(assign) => Some(&assign.target),
            Self::Function(_) => None,
        }
    }

    /// Shorthand for an assignment node
    #[must_use]
    pub fn assign(target: impl Into<String>, value: Expr) -> Self {
        Self::Assign(Assignment {
            target: target.into(),
            value,
        })
    }
}

/// Variable assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned variable
    pub target: String,
    /// Right-hand side
    pub value: Expr,
}

/// Single-expression function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Function name
    pub name: String,
    /// Parameter names, in call order
    pub params: Vec<String>,
    /// Body expression; its value is the return value
    pub body: Expr,
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Double(f64),
    /// String literal
    Str(String),
    /// Variable or function name
    Ident(String),
    /// `{a, b, c}`
    Array(Vec<Expr>),
    /// `target[index]`
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    /// `callee(args)`
    Call { callee: String, args: Vec<Expr> },
    /// Prefix operator
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Infix operator
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `cond ? then : otherwise`
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    /// Build a binary expression
    #[must_use]
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Build an identifier expression
    #[must_use]
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Conditional { .. } => 0,
            Self::Binary { op, .. } => op.precedence(),
            Self::Unary { .. } => 7,
            _ => 8,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
}

impl UnaryOp {
    /// Source symbol
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Source symbol
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Binding strength; higher binds tighter
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Mod => 6,
        }
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign(assign) => write!(f, "{} = {};", assign.target, assign.value),
            Self::Function(def) => {
                write!(f, "def {}({}) = {};", def.name, def.params.join(", "), def.body)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            // Debug formatting keeps the fractional part (`2.0`, not `2`)
            Self::Double(value) => write!(f, "{value:?}"),
            Self::Str(value) => write_quoted(f, value),
            Self::Ident(name) => write!(f, "{name}"),
            Self::Array(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Self::Index { target, index } => {
                target.fmt_child(f, 8)?;
                write!(f, "[{index}]")
            }
            Self::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::Unary { op, operand } => {
                write!(f, "{}", op.symbol())?;
                operand.fmt_child(f, 7)
            }
            Self::Binary { op, lhs, rhs } => {
                let precedence = op.precedence();
                lhs.fmt_child(f, precedence)?;
                write!(f, " {} ", op.symbol())?;
                // Left associative: an equal-precedence right child needs parens
                rhs.fmt_child(f, precedence + 1)
            }
            Self::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.fmt_child(f, 1)?;
                write!(f, " ? ")?;
                then.fmt_child(f, 1)?;
                write!(f, " : ")?;
                otherwise.fmt_child(f, 0)
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in value.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            other => write!(f, "{other}")?,
        }
    }
    write!(f, "\"")
}
