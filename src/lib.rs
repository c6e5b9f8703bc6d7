//! tyro - Typed JSON-RPC 2.0 over HTTP
//!
//! This is the main convenience crate that re-exports all tyro sub-crates.
//! Use this crate if you want a single dependency for declaring methods,
//! serving them and generating clients for them.
//!
//! # Architecture
//!
//! tyro is organized into modular crates:
//!
//! - **tyro-core**: Wire types, codec, schema algebra, method specs, errors, observability
//! - **tyro-server**: Method registry, dispatcher, batch processor, HTTP adapter
//! - **tyro-codegen**: TypeScript client generator and the `tyro` CLI
//!
//! # Quick Start - Server
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde::Deserialize;
//! use tyro::{from_typed_fn, MethodSpec, Registry, Schema, ServiceBuilder};
//!
//! #[derive(Deserialize)]
//! struct AddParams { a: i64, b: i64 }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::<()>::new().method(
//!         MethodSpec::new("add")
//!             .param("a", Schema::Integer)
//!             .param("b", Schema::Integer)
//!             .returns(Schema::Integer),
//!         from_typed_fn(|p: AddParams, _ctx: Arc<()>| async move { Ok(p.a + p.b) }),
//!     )?;
//!
//!     let service = ServiceBuilder::new(registry).default_context().build()?;
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, service.router("/rpc")).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Client
//!
//! Export the manifest from the running service, then generate TypeScript:
//!
//! ```rust
//! use tyro::{generate_client, CodegenOptions, MethodSpec, Schema, SpecManifest};
//!
//! let manifest = SpecManifest::new(vec![MethodSpec::new("ping").returns(Schema::String)]);
//! let client = generate_client(&manifest.methods, &CodegenOptions::default()).unwrap();
//! assert!(client.code.contains("export function ping(): Promise<string>"));
//! ```

// Re-export all public APIs from sub-crates
pub use tyro_codegen as codegen;
pub use tyro_core as core;
pub use tyro_server as server;

// Convenience re-exports of the most commonly used types
pub use tyro_codegen::{generate_client, CodegenOptions, GeneratedClient};
pub use tyro_core::{MethodSpec, Schema, SpecManifest};
pub use tyro_server::{
    from_fn, from_typed_fn, BatchMode, MethodError, MethodResult, Registry, RpcService,
    ServiceBuilder,
};
