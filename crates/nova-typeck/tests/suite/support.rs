use nova_typeck::hir::{Body, ExprId};
use nova_typeck::{check_body, BodyTypeckResult, TypeckConfig};
use nova_types::{Type, TypeStore};

pub fn check(env: &TypeStore, body: &Body) -> BodyTypeckResult {
    check_body(env, body, &TypeckConfig::default())
}

/// The raw class type of `name`, e.g. `java.util.Map$Entry`.
pub fn class(env: &TypeStore, name: &str) -> Type {
    let id = env
        .class_id(name)
        .unwrap_or_else(|| panic!("{name} is not declared"));
    Type::class(id, vec![])
}

pub fn string(env: &TypeStore) -> Type {
    class(env, "java.lang.String")
}

pub fn show(env: &TypeStore, result: &BodyTypeckResult, expr: ExprId) -> String {
    result.display_type(env, result.type_of(expr))
}

pub fn codes(result: &BodyTypeckResult) -> Vec<&'static str> {
    result.diagnostics.iter().map(|d| d.code).collect()
}

#[track_caller]
pub fn assert_clean(result: &BodyTypeckResult) {
    assert!(
        result.diagnostics.is_empty(),
        "unexpected diagnostics: {:#?}",
        result.diagnostics
    );
}
