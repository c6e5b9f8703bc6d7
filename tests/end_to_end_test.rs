//! Server-to-client integration tests

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tyro::core::{Id, JsonRpcRequest};
use tyro::{
    from_typed_fn, generate_client, CodegenOptions, MethodSpec, Registry, Schema, ServiceBuilder,
    SpecManifest,
};

#[derive(Deserialize)]
struct DoubleParams {
    x: f64,
    factor: Option<f64>,
}

fn service() -> tyro::RpcService<()> {
    let registry = Registry::<()>::new()
        .method(
            MethodSpec::new("double")
                .param("x", Schema::Number)
                .optional_param("factor", Schema::Number)
                .returns(Schema::Number),
            from_typed_fn(|p: DoubleParams, _ctx: Arc<()>| async move {
                Ok(p.factor.unwrap_or(1.0) * p.x)
            }),
        )
        .unwrap();

    ServiceBuilder::new(registry).default_context().build().unwrap()
}

#[tokio::test]
async fn test_dispatch_through_facade() {
    let request = JsonRpcRequest::new("double", Some(json!({"x": 21, "factor": 2})), Id::from(1i64));

    let response = service().dispatcher().dispatch(request, Arc::new(())).await.unwrap();

    assert!(response.is_success());
    assert_eq!(response.result.and_then(|r| r.as_f64()), Some(42.0));
}

#[tokio::test]
async fn test_manifest_drives_codegen() {
    let manifest = service().manifest();

    let text = serde_json::to_string(&manifest).unwrap();
    let reloaded: SpecManifest = serde_json::from_str(&text).unwrap();
    assert_eq!(reloaded, manifest);

    let client = generate_client(&reloaded.methods, &CodegenOptions::default()).unwrap();
    assert!(client
        .code
        .contains("export function double(params: { x: number; factor?: number }): Promise<number> {"));
}
