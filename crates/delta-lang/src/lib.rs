//! Delta Lang - source language of live fragments
//!
//! A small associative (dataflow) language: every statement is either an
//! assignment `name = expr;` or a single-expression function definition
//! `def f(a, b) = expr;`. The graph compiler renders subtrees into this
//! language and the front-end compiler parses it back.
//!
//! # Example
//! ```
//! use delta_lang::{parse_program, AstNode};
//!
//! let program = parse_program("a = 2; b = a + 1;").unwrap();
//! assert_eq!(program.len(), 2);
//! assert!(matches!(&program[0], AstNode::Assign(a) if a.target == "a"));
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Assignment, AstNode, BinaryOp, Expr, FunctionDef, UnaryOp};
pub use error::{ParseError, Span};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse_expression, parse_program};
