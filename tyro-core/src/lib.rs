//! Core types for tyro, a typed JSON-RPC 2.0 boundary
//!
//! This crate holds everything that both sides of the boundary share:
//!
//! - **Types**: JSON-RPC 2.0 wire structures (requests, responses, replies)
//! - **Codec**: Batch detection and per-entry request validation
//! - **Schema**: A small schema algebra with a path-reporting validator
//! - **Specs**: Method declarations and the manifest the code generator reads
//! - **Errors**: Error types and the stable error code table
//! - **Observability**: Structured logging and OpenTelemetry setup
//!
//! The `tyro-server` crate builds the method registry, dispatcher and HTTP
//! adapter on top of these; `tyro-codegen` turns specs into TypeScript clients.
//!
//! # Example
//!
//! ```rust
//! use tyro_core::{codec, MethodSpec, Schema};
//! use serde_json::json;
//!
//! let spec = MethodSpec::new("double")
//!     .param("x", Schema::Number)
//!     .returns(Schema::Number);
//!
//! let request = codec::parse_request(json!({
//!     "jsonrpc": "2.0",
//!     "method": "double",
//!     "params": {"x": 7},
//!     "id": 1
//! }))
//! .unwrap();
//!
//! assert_eq!(request.method, spec.name);
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod schema;
pub mod spec;
pub mod types;

pub use error::{codes, ConfigError, Error, JsonRpcErrorData, Result};
pub use observability::{init_telemetry, shutdown_telemetry, TelemetryConfig};
pub use schema::{FieldMode, Schema, Violation};
pub use spec::{MethodMetadata, MethodSpec, SpecManifest};
pub use types::{Id, JsonRpcReply, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
