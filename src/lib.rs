//! ChatJinja is the runtime core of a [Jinja](https://jinja.palletsprojects.com/)
//! compatible template interpreter aimed at rendering chat-message and
//! prompt templates for model inference.  It is a tree-walking evaluator:
//! a front end (lexer and parser live outside this crate) hands it a
//! parsed [`ast::Program`] and rendering produces a single string.
//!
//! The runtime implements the dynamically typed value model those
//! templates rely on — Python flavored truthiness, loose equality,
//! insertion-ordered objects, an undefined value distinct from none —
//! together with filters, tests, macros with call-site scoping, loop
//! metadata with `break`/`continue`, and slicing with negative steps.
//!
//! # Usage
//!
//! Context data is seeded through [serde](https://serde.rs/) and
//! programs are built from [`ast`] nodes:
//!
//! ```
//! use chatjinja::ast::{BinOp, BinOpKind, Const, Expr, Program, Stmt, Var};
//! use chatjinja::{setup_globals, Environment, Interpreter};
//!
//! let env = Environment::new();
//! setup_globals(&env);
//! env.set("name", "World");
//!
//! // {{ "Hello " ~ name ~ "!" }}
//! let program = Program {
//!     children: vec![Stmt::Emit(Expr::BinOp(Box::new(BinOp {
//!         op: BinOpKind::Concat,
//!         left: Expr::BinOp(Box::new(BinOp {
//!             op: BinOpKind::Concat,
//!             left: Expr::Const(Box::new(Const { value: "Hello ".into() })),
//!             right: Expr::Var(Box::new(Var { id: "name".into() })),
//!         })),
//!         right: Expr::Const(Box::new(Const { value: "!".into() })),
//!     })))],
//! };
//!
//! let interpreter = Interpreter::new(Some(env));
//! assert_eq!(interpreter.run(&program).unwrap().to_string(), "Hello World!");
//! ```
//!
//! # Learn more
//!
//! - [`value`]: the runtime value object and JSON rendering.
//! - [`filters`]: the built-in filters.
//! - [`tests`]: the built-in `is` tests.
//! - [`functions`]: the default globals (`range`, `namespace`, ...).
//! - [`Environment`]: scope chain and context seeding.
#[macro_use]
mod macros;

mod environment;
mod error;
mod interpreter;

pub mod ast;
pub mod filters;
pub mod functions;
pub mod value;

pub use self::environment::{EnvRef, Environment};
pub use self::error::{Error, ErrorKind};
pub use self::functions::setup_globals;
pub use self::interpreter::Interpreter;
pub use self::value::Value;
