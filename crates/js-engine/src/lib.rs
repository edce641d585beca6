//! Embedded JavaScript engine for the SFC compiler.
//!
//! This crate runs a bundled third-party compiler script inside QuickJS:
//! - [`CompilerCache`] compiles the script to bytecode once per process
//! - [`QuickJsEngine`] evaluates that bytecode in a fresh context, with the
//!   `compilerFs` host functions installed
//! - [`JsExecutor`] owns a pool of engines, one per worker thread, and
//!   serves [`JsRequest`]s by calling the named guest service

pub mod bridge;
pub mod cache;
pub mod engine;
pub mod error;
pub mod executor;
pub mod protocol;

pub use cache::CompilerCache;
pub use engine::{EngineFactory, EngineInit, EngineLimits, JsEngine, QuickJsEngine, QuickJsFactory};
pub use error::{EngineError, EngineResult};
pub use executor::{JsExecutor, JsExecutorOptions, ServiceExecutor};
pub use protocol::{services, JsRequest, JsResponse};
