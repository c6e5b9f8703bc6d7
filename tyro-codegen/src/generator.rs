//! TypeScript client generation
//!
//! Every method in a manifest becomes one exported function that sends the
//! call through a shared `call` helper. With DataLoader enabled, calls made in
//! the same tick are coalesced into a single batch request; methods flagged
//! `noBatch` go through `callSingle` instead.

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tyro_core::MethodSpec;

const HEADER: &str = "/* eslint-disable @typescript-eslint/no-unused-vars */";

/// Result type for code generation
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Code generation failure
#[derive(Debug, Error)]
pub enum CodegenError {
    /// A template failed to load or render
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

/// Options for [`generate_client`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// URL the generated client posts to
    pub endpoint: String,
    /// Batch calls through DataLoader
    pub with_dataloader: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            endpoint: "/rpc".to_string(),
            with_dataloader: false,
        }
    }
}

/// Generated client source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedClient {
    /// TypeScript source
    pub code: String,
    /// Methods left out because their names are not valid identifiers
    pub skipped: Vec<String>,
}

impl GeneratedClient {
    /// Number of lines in the source, counting the empty line after the final newline
    pub fn line_count(&self) -> usize {
        self.code.split('\n').count()
    }
}

#[derive(Serialize)]
struct MethodView<'a> {
    name: &'a str,
    args: String,
    params: &'static str,
    returns: String,
    call: &'static str,
}

impl<'a> MethodView<'a> {
    fn new(spec: &'a MethodSpec, options: &CodegenOptions) -> Self {
        let (args, params) = if spec.has_params() {
            (format!("params: {}", spec.params_type_name()), "params")
        } else {
            (String::new(), "{}")
        };
        let call = if options.with_dataloader && spec.metadata.no_batch {
            "callSingle"
        } else {
            "call"
        };

        Self {
            name: &spec.name,
            args,
            params,
            returns: spec.returns.type_name(),
            call,
        }
    }
}

/// Template-backed client generator
pub struct Generator {
    tera: Tera,
}

impl Generator {
    /// Load the embedded templates
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("method.ts", include_str!("../templates/method.ts.tera")),
            ("call_fetch.ts", include_str!("../templates/call_fetch.ts.tera")),
            (
                "call_dataloader.ts",
                include_str!("../templates/call_dataloader.ts.tera"),
            ),
        ])?;
        Ok(Self { tera })
    }

    /// Generate a client for `specs`
    pub fn generate(&self, specs: &[MethodSpec], options: &CodegenOptions) -> Result<GeneratedClient> {
        let mut lines = vec![HEADER.to_string(), String::new(), self.render_call(options)?, String::new()];
        let mut skipped = Vec::new();

        for spec in specs {
            if !spec.is_identifier_safe() {
                tracing::warn!("`{}' is not a valid method name. Skipping", spec.name);
                skipped.push(spec.name.clone());
                continue;
            }
            lines.push(self.render_method(spec, options)?);
            lines.push(String::new());
        }

        tracing::debug!(
            methods = specs.len() - skipped.len(),
            skipped = skipped.len(),
            dataloader = options.with_dataloader,
            "Generated client"
        );

        Ok(GeneratedClient {
            code: lines.join("\n"),
            skipped,
        })
    }

    fn render_call(&self, options: &CodegenOptions) -> Result<String> {
        let template = if options.with_dataloader {
            "call_dataloader.ts"
        } else {
            "call_fetch.ts"
        };
        let mut context = Context::new();
        context.insert("endpoint", &options.endpoint);
        Ok(self.tera.render(template, &context)?.trim().to_string())
    }

    fn render_method(&self, spec: &MethodSpec, options: &CodegenOptions) -> Result<String> {
        let context = Context::from_serialize(MethodView::new(spec, options))?;
        Ok(self.tera.render("method.ts", &context)?.trim().to_string())
    }
}

/// Generate a TypeScript client for `specs`
///
/// # Examples
///
/// ```rust
/// use tyro_codegen::{generate_client, CodegenOptions};
/// use tyro_core::{MethodSpec, Schema};
///
/// let specs = vec![MethodSpec::new("ping").returns(Schema::String)];
/// let client = generate_client(&specs, &CodegenOptions::default()).unwrap();
/// assert!(client.code.contains("export function ping(): Promise<string>"));
/// ```
pub fn generate_client(specs: &[MethodSpec], options: &CodegenOptions) -> Result<GeneratedClient> {
    Generator::new()?.generate(specs, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyro_core::Schema;

    fn double() -> MethodSpec {
        MethodSpec::new("double")
            .param("x", Schema::Number)
            .optional_param("factor", Schema::Number)
            .returns(Schema::Number)
    }

    #[test]
    fn test_method_with_params() {
        let client = generate_client(&[double()], &CodegenOptions::default()).unwrap();

        let expected = [
            "export function double(params: { x: number; factor?: number }): Promise<number> {",
            "  return call({",
            "    method: \"double\",",
            "    params: params,",
            "  }) as Promise<number>;",
            "}",
        ]
        .join("\n");
        assert!(client.code.contains(&expected), "{}", client.code);
        assert!(client.skipped.is_empty());
    }

    #[test]
    fn test_method_without_params() {
        let specs = [MethodSpec::new("now").returns(Schema::Integer)];
        let client = generate_client(&specs, &CodegenOptions::default()).unwrap();

        assert!(client.code.contains("export function now(): Promise<number> {"));
        assert!(client.code.contains("    params: {},"));
    }

    #[test]
    fn test_layout() {
        let client = generate_client(&[double()], &CodegenOptions::default()).unwrap();
        let lines: Vec<&str> = client.code.split('\n').collect();

        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "function call(method: any) {");
        assert_eq!(lines[3], "  return fetch(\"/rpc\", {");
        assert!(client.code.ends_with("}\n"));
        assert_eq!(client.line_count(), lines.len());
    }

    #[test]
    fn test_custom_endpoint() {
        let options = CodegenOptions {
            endpoint: "https://api.example.com/rpc".to_string(),
            with_dataloader: false,
        };
        let client = generate_client(&[], &options).unwrap();
        assert!(client.code.contains("fetch(\"https://api.example.com/rpc\", {"));
    }

    #[test]
    fn test_dataloader_prelude() {
        let options = CodegenOptions {
            with_dataloader: true,
            ..CodegenOptions::default()
        };
        let specs = [double(), MethodSpec::new("upload").no_batch()];
        let client = generate_client(&specs, &options).unwrap();

        assert!(client.code.contains("import DataLoader from \"dataloader\";"));
        assert!(client.code.contains("function callSingle(method: any) {"));
        assert!(client.code.contains("  return call({\n    method: \"double\""));
        assert!(client.code.contains("  return callSingle({\n    method: \"upload\""));
        assert!(client.code.contains("export function upload(): Promise<void> {"));
    }

    #[test]
    fn test_no_batch_ignored_without_dataloader() {
        let specs = [MethodSpec::new("upload").no_batch()];
        let client = generate_client(&specs, &CodegenOptions::default()).unwrap();

        assert!(!client.code.contains("callSingle"));
        assert!(!client.code.contains("DataLoader"));
    }

    #[test]
    fn test_unsafe_names_skipped() {
        let specs = [
            MethodSpec::new("users.list"),
            double(),
            MethodSpec::new("delete-all"),
        ];
        let client = generate_client(&specs, &CodegenOptions::default()).unwrap();

        assert_eq!(client.skipped, vec!["users.list", "delete-all"]);
        assert!(client.code.contains("export function double("));
        assert!(!client.code.contains("users.list"));
        assert_eq!(client.code.matches("export function").count(), 1);
    }

    #[test]
    fn test_nested_types() {
        let spec = MethodSpec::new("search")
            .param("filter", Schema::object([("tags", Schema::array(Schema::String))]))
            .returns(Schema::array(Schema::optional(Schema::Any)));
        let client = generate_client(&[spec], &CodegenOptions::default()).unwrap();

        assert!(client
            .code
            .contains("export function search(params: { filter: { tags: Array<string> } }): Promise<Array<unknown | null>> {"));
    }
}
