//! Method registry
//!
//! The registry maps method names to their spec and handler. It is filled once
//! while the application is wired and then moved into a service, after which
//! it is shared read-only behind an `Arc`: there is no removal and no locking.
//!
//! Registration mistakes are configuration errors. They are returned
//! synchronously so startup can abort; they never become RPC responses.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tyro_server::{from_fn, Registry};
//! use tyro_core::{MethodSpec, Schema};
//!
//! let registry = Registry::<()>::new()
//!     .method(
//!         MethodSpec::new("ping").returns(Schema::String),
//!         from_fn(|_, _| async { Ok(serde_json::json!("pong")) }),
//!     )
//!     .unwrap();
//!
//! assert!(registry.has_method("ping"));
//! assert_eq!(registry.manifest().methods.len(), 1);
//! ```

use crate::handler::MethodHandler;
use std::collections::HashMap;
use std::sync::Arc;
use tyro_core::{ConfigError, MethodSpec, SpecManifest};

/// A registered method: its declaration and implementation
pub struct RegisteredMethod<C> {
    spec: MethodSpec,
    handler: Arc<dyn MethodHandler<C>>,
}

impl<C> RegisteredMethod<C> {
    /// The method's declaration
    pub fn spec(&self) -> &MethodSpec {
        &self.spec
    }

    /// A shared handle to the method's handler
    pub fn handler(&self) -> Arc<dyn MethodHandler<C>> {
        Arc::clone(&self.handler)
    }
}

/// Name-indexed set of methods for context type `C`
pub struct Registry<C> {
    methods: HashMap<String, RegisteredMethod<C>>,
    order: Vec<String>,
}

impl<C> Registry<C> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a method
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicateMethod`] if the name is taken; the first
    ///   registration stays in place
    /// - [`ConfigError::OverlappingParams`] if a parameter is declared both
    ///   mandatory and optional
    ///
    /// Nothing is stored when an error is returned.
    pub fn register(
        &mut self,
        spec: MethodSpec,
        handler: Box<dyn MethodHandler<C>>,
    ) -> Result<&mut Self, ConfigError> {
        if self.methods.contains_key(&spec.name) {
            return Err(ConfigError::DuplicateMethod(spec.name));
        }

        let overlap = spec.overlapping_params();
        if !overlap.is_empty() {
            return Err(ConfigError::OverlappingParams {
                method: spec.name,
                params: overlap,
            });
        }

        tracing::debug!(method = %spec.name, "Registered method");
        self.order.push(spec.name.clone());
        self.methods.insert(
            spec.name.clone(),
            RegisteredMethod {
                spec,
                handler: Arc::from(handler),
            },
        );
        Ok(self)
    }

    /// Register a method, consuming and returning the registry
    ///
    /// Same rules as [`Registry::register`]; convenient for building a
    /// registry in one expression.
    pub fn method(
        mut self,
        spec: MethodSpec,
        handler: Box<dyn MethodHandler<C>>,
    ) -> Result<Self, ConfigError> {
        self.register(spec, handler)?;
        Ok(self)
    }

    /// Look up a method by exact name
    pub fn get(&self, name: &str) -> Option<&RegisteredMethod<C>> {
        self.methods.get(name)
    }

    /// Check if a method is registered
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered method names, in registration order
    pub fn methods(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered methods
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no method is registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Copy of every spec, in registration order
    pub fn specs_snapshot(&self) -> Vec<MethodSpec> {
        self.order
            .iter()
            .filter_map(|name| self.methods.get(name))
            .map(|method| method.spec.clone())
            .collect()
    }

    /// Snapshot wrapped as a serializable manifest
    pub fn manifest(&self) -> SpecManifest {
        SpecManifest::new(self.specs_snapshot())
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}
