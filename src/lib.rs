//! # v8core-host
//!
//! Scope-safe host bindings for an embedded V8 runtime exposed through a vtable ABI.
//!
//! ## Features
//!
//! - **Vtable Registry**: One process-wide, read-only set of function tables, loaded from a
//!   native library or installed from a static root table
//! - **Owned Handles**: Isolates, platforms and scopes release their native object exactly once
//! - **Scope Discipline**: Child scopes and local handles borrow their parent, so the borrow
//!   checker rejects out-of-order teardown and escaping locals
//! - **Conversion Helpers**: UTF-16 string round trips, script compile/run, value probes
//! - **Reference Engine**: An in-process implementation of the root table for tests and
//!   environments without the native library (feature `reference-engine`, on by default).
//!   It is only used after an explicit `reference::install()`; an unconfigured registry
//!   reports `RegistryError::NotConfigured` instead of falling back
//!
//! ## Architecture Design
//!
//! - **ABI (`abi`)**: `#[repr(C)]` opaque handles, slices and vtables
//! - **Registry (`registry`)**: Resolves and publishes the tables once
//! - **Runtime (`runtime`)**: Safe owned/borrowed wrappers over the tables
//!
//! ### Example
//!
//! ```rust
//! use v8core_host::{ContextScope, HandleScope, Isolate, LocalContext, LocalJsString, LocalScript, V8, WriteOptions};
//!
//! # fn main() -> v8core_host::V8Result<()> {
//! v8core_host::reference::install()?;
//! V8::auto_ensures_init()?;
//! let mut isolate = Isolate::create_on_current_thread()?;
//! let scope = HandleScope::new(&mut isolate)?;
//! let ctx_scope = ContextScope::new(&scope, LocalContext::create(&scope));
//!
//! let code = LocalJsString::create(&ctx_scope, "1+1")?;
//! let value = LocalScript::compile(&ctx_scope, code)?.run(&ctx_scope)?;
//! let text = value.as_js_string(&ctx_scope)?;
//! assert_eq!(text.to_string(&ctx_scope, WriteOptions::NO_OPTIONS), "2");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`abi`]: Native ABI description
//! - [`config`]: Configuration system
//! - [`core`]: Errors, logging and macros
//! - [`registry`]: Vtable registry
//! - [`runtime`]: Host-side handle API

/// Native ABI: opaque handles, slices and function tables
pub mod abi;
/// Configuration system
pub mod config;
/// Errors, logging and shared macros
#[macro_use]
pub mod core;
/// Process-wide vtable registry
pub mod registry;
/// Host-side handle API
pub mod runtime;
/// In-process implementation of the root vtable
#[cfg(feature = "reference-engine")]
pub mod reference;

pub use crate::config::{BindingConfig, ConfigError, ConfigResult, LogLevel, LoggingConfig};
pub use crate::core::{RegistryError, RegistryResult, V8Error, V8Result};
pub use crate::registry::{Registry, RegistrySource};
pub use crate::runtime::*;
