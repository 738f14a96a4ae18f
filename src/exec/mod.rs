// src/exec/mod.rs

//! Compile execution layer.
//!
//! - [`request`] defines what is handed to a compiler and what comes back.
//! - [`command`] provides the `Compiler` trait and `CommandCompiler`, which
//!   runs an external command per asset type using `tokio::process::Command`.
//! - [`backend`] provides the `ExecutorBackend` trait and the `WorkerPool`
//!   that the runtime uses in production, and which tests can replace with a
//!   fake implementation.

pub mod backend;
pub mod command;
pub mod request;

pub use backend::{ExecutorBackend, WorkerPool};
pub use command::{CommandCompiler, CompileCommand, CompileFuture, Compiler};
pub use request::{CompileRequest, CompileResult};
