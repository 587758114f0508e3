use nova_typeck::hir::{BodyBuilder, LocalTy};
use nova_typeck::{check_body, TypeckConfig};
use nova_types::{Type, TypeEnv, TypeStore};

use pretty_assertions::assert_eq;

use super::support::{assert_clean, check, class, codes, string};

#[test]
fn var_over_a_wildcard_iterable_projects_the_captured_element() {
    // <T> void take5(Iterable<? extends T> iter) { for (var x : iter) {} }
    let mut env = TypeStore::with_minimal_jdk();
    let object = Type::class(env.well_known().object, vec![]);
    let t = env.add_type_param("T", vec![object]);
    let iterable = env.class_id("java.lang.Iterable").unwrap();

    let mut b = BodyBuilder::new();
    let iter = b.param(
        "iter",
        Type::class(iterable, vec![Type::extends(Type::TypeVar(t))]),
    );
    let iter_ref = b.local_ref(iter);
    let x = b.local("x", LocalTy::Var);
    let loop_body = b.block(vec![]);
    let loop_stmt = b.for_each(x, iter_ref, loop_body);
    b.push(loop_stmt);
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(*result.local_type(x), Type::TypeVar(t));
}

#[test]
fn var_keeps_wildcards_instead_of_capture_variables() {
    // List<? extends Number> numbers; var copy = numbers; var first = numbers.get(0);
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let number = Type::class(env.well_known().number, vec![]);
    let wildcard_list = Type::class(list, vec![Type::extends(number.clone())]);

    let mut b = BodyBuilder::new();
    let numbers = b.param("numbers", wildcard_list.clone());
    let numbers_ref = b.local_ref(numbers);
    let copy = b.declare("copy", LocalTy::Var, Some(numbers_ref));
    let numbers_ref = b.local_ref(numbers);
    let zero = b.int(0);
    let get = b.call(Some(numbers_ref), "get", vec![zero]);
    let first = b.declare("first", LocalTy::Var, Some(get));
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(*result.local_type(copy), wildcard_list);
    assert!(matches!(result.type_of(get), Type::TypeVar(_)));
    assert!(result.display_type(&env, result.type_of(get)).starts_with("CAP#"));
    assert_eq!(*result.local_type(first), number);
}

#[test]
fn for_each_over_an_array_uses_the_component_type() {
    let env = TypeStore::with_minimal_jdk();
    let mut b = BodyBuilder::new();
    let words = b.param("words", Type::array(string(&env)));
    let words_ref = b.local_ref(words);
    let word = b.local("word", LocalTy::Declared(string(&env)));
    let loop_body = b.block(vec![]);
    let loop_stmt = b.for_each(word, words_ref, loop_body);
    b.push(loop_stmt);
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(*result.local_type(word), string(&env));
}

#[test]
fn for_each_rejects_non_iterable_expressions() {
    let env = TypeStore::with_minimal_jdk();
    let mut b = BodyBuilder::new();
    let text = b.string("abc");
    let c = b.local("c", LocalTy::Var);
    let loop_body = b.block(vec![]);
    let loop_stmt = b.for_each(c, text, loop_body);
    b.push(loop_stmt);
    let body = b.finish();

    let result = check(&env, &body);
    assert_eq!(codes(&result), vec!["foreach-not-iterable"]);
}

#[test]
fn var_declarations_without_a_standalone_type_are_rejected() {
    let env = TypeStore::with_minimal_jdk();
    let mut b = BodyBuilder::new();
    let no_init = b.declare("a", LocalTy::Var, None);
    let null = b.null();
    let null_init = b.declare("b", LocalTy::Var, Some(null));
    let lambda_body = b.int(1);
    let lambda = b.lambda(vec![], lambda_body);
    let lambda_init = b.declare("c", LocalTy::Var, Some(lambda));
    let body = b.finish();

    let result = check(&env, &body);
    assert_eq!(
        codes(&result),
        vec![
            "var-without-initializer",
            "var-null-initializer",
            "var-lambda-initializer",
        ]
    );
    for local in [no_init, null_init, lambda_init] {
        assert_eq!(*result.local_type(local), Type::Error);
    }
}

#[test]
fn var_with_a_void_initializer_is_rejected() {
    let env = TypeStore::with_minimal_jdk();
    let mut b = BodyBuilder::new();
    let task = b.param("task", class(&env, "java.lang.Runnable"));
    let receiver = b.local_ref(task);
    let run = b.call(Some(receiver), "run", vec![]);
    b.declare("v", LocalTy::Var, Some(run));
    let body = b.finish();

    let result = check(&env, &body);
    assert_eq!(codes(&result), vec!["var-void-initializer"]);
}

#[test]
fn var_before_release_ten_is_reported() {
    let env = TypeStore::with_minimal_jdk();
    let config = TypeckConfig::load_from_str("release = 9").unwrap();
    let mut b = BodyBuilder::new();
    let one = b.int(1);
    let x = b.declare("x", LocalTy::Var, Some(one));
    let body = b.finish();

    let result = check_body(&env, &body, &config);
    assert_eq!(codes(&result), vec!["var-not-supported"]);
    assert!(result.diagnostics[0].message.contains("release 9"));
    assert_eq!(*result.local_type(x), Type::Error);
    // The initializer is still typed.
    assert_eq!(*result.type_of(one), Type::int());
}

#[test]
fn declared_local_rejects_an_incompatible_initializer() {
    let env = TypeStore::with_minimal_jdk();
    let mut b = BodyBuilder::new();
    let text = b.string("x");
    b.declare("n", LocalTy::Declared(Type::int()), Some(text));
    let body = b.finish();

    let result = check(&env, &body);
    assert_eq!(codes(&result), vec!["incompatible-types"]);
    assert_eq!(
        result.diagnostics[0].message,
        "incompatible types: `String` cannot be converted to `int`"
    );
}
