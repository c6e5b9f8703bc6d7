//! TypeScript client generation for tyro services
//!
//! The generator reads a [`SpecManifest`](tyro_core::SpecManifest), the JSON
//! document a server produces with `RpcService::manifest`, and writes a
//! TypeScript module with one typed function per method. The `tyro` binary in
//! this crate wraps it as `tyro codegen`.
//!
//! # Examples
//!
//! ```rust
//! use tyro_codegen::{generate_client, CodegenOptions};
//! use tyro_core::{MethodSpec, Schema};
//!
//! let specs = vec![MethodSpec::new("double")
//!     .param("x", Schema::Number)
//!     .returns(Schema::Number)];
//!
//! let options = CodegenOptions {
//!     endpoint: "/api/rpc".to_string(),
//!     with_dataloader: true,
//! };
//! let client = generate_client(&specs, &options).unwrap();
//! assert!(client.code.contains("export function double(params: { x: number }): Promise<number>"));
//! ```

mod generator;

pub use generator::{generate_client, CodegenError, CodegenOptions, GeneratedClient, Generator, Result};
