//! Method declarations
//!
//! A [`MethodSpec`] is everything known about a method apart from its
//! implementation: its name, the shapes of its parameters and result, and
//! free-form metadata. Specs are what the server validates against and what
//! the code generator renders, usually by way of a [`SpecManifest`].
//!
//! # Examples
//!
//! ```rust
//! use tyro_core::{MethodSpec, Schema};
//!
//! let spec = MethodSpec::new("double")
//!     .param("x", Schema::Number)
//!     .optional_param("factor", Schema::Number)
//!     .returns(Schema::Number);
//!
//! assert!(spec.is_identifier_safe());
//! assert!(spec.overlapping_params().is_empty());
//! assert_eq!(spec.params_type_name(), "{ x: number; factor?: number }");
//! ```

use crate::schema::{object_type_name, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Current manifest format version
pub const MANIFEST_VERSION: u32 = 1;

/// Open-ended method flags
///
/// Known flags get typed fields; anything else is kept in `extra` and written
/// back unchanged, so adding a flag never breaks an older manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadata {
    /// Generated clients must never coalesce calls to this method
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_batch: bool,

    /// Flags this version does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Declaration of one RPC method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSpec {
    /// Method name as sent on the wire
    pub name: String,

    /// Parameters that must be present
    #[serde(default)]
    pub params: BTreeMap<String, Schema>,

    /// Parameters that may be absent
    #[serde(default)]
    pub optional_params: BTreeMap<String, Schema>,

    /// Shape of the handler's result
    #[serde(default = "default_returns")]
    pub returns: Schema,

    /// Method flags
    #[serde(default)]
    pub metadata: MethodMetadata,
}

fn default_returns() -> Schema {
    Schema::Void
}

impl MethodSpec {
    /// Start a spec with no parameters and a `void` result
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
            optional_params: BTreeMap::new(),
            returns: Schema::Void,
            metadata: MethodMetadata::default(),
        }
    }

    /// Declare a mandatory parameter
    pub fn param(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.params.insert(name.into(), schema);
        self
    }

    /// Declare an optional parameter
    pub fn optional_param(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.optional_params.insert(name.into(), schema);
        self
    }

    /// Set the result schema
    pub fn returns(mut self, schema: Schema) -> Self {
        self.returns = schema;
        self
    }

    /// Mark the method as ineligible for client-side batching
    pub fn no_batch(mut self) -> Self {
        self.metadata.no_batch = true;
        self
    }

    /// Attach an uninterpreted metadata flag
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.extra.insert(key.into(), value);
        self
    }

    /// Whether the name can be used verbatim as a generated function name
    ///
    /// True for non-empty names made only of ASCII letters, digits and `_`.
    pub fn is_identifier_safe(&self) -> bool {
        !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// Names declared both as mandatory and optional, sorted
    pub fn overlapping_params(&self) -> Vec<String> {
        self.params
            .keys()
            .filter(|name| self.optional_params.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Whether the method takes any parameter at all
    pub fn has_params(&self) -> bool {
        !self.params.is_empty() || !self.optional_params.is_empty()
    }

    /// TypeScript type of the parameter object
    pub fn params_type_name(&self) -> String {
        object_type_name(&self.params, &self.optional_params)
    }
}

/// Serializable snapshot of a registry's specs
///
/// This is the document the `tyro codegen` command reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecManifest {
    /// Format version
    pub version: u32,
    /// Specs in registration order
    pub methods: Vec<MethodSpec>,
}

impl SpecManifest {
    /// Wrap specs in a manifest of the current version
    pub fn new(methods: Vec<MethodSpec>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            methods,
        }
    }
}
