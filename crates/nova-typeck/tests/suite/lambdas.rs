use nova_typeck::hir::{BinaryOp, BodyBuilder, LocalTy};
use nova_types::{ClassKind, Type, TypeStore};

use pretty_assertions::assert_eq;

use super::support::{assert_clean, check, class, codes, show, string};

fn owner_with_id(env: &mut TypeStore) -> Type {
    let id = env
        .build_class("com.example.Lambdas", ClassKind::Class, "Ljava/lang/Object;")
        .static_method("id", "<T:Ljava/lang/Object;>(TT;)TT;")
        .static_method(
            "apply",
            "<T:Ljava/lang/Object;R:Ljava/lang/Object;>(TT;Ljava/util/function/Function<TT;TR;>;)TR;",
        )
        .finish()
        .unwrap();
    Type::class(id, vec![])
}

#[test]
fn conditional_with_null_and_lambda_targets_runnable() {
    // Runnable pr = cond ? null : () -> id(true);
    let mut env = TypeStore::with_minimal_jdk();
    let owner = owner_with_id(&mut env);
    let runnable = class(&env, "java.lang.Runnable");

    let mut b = BodyBuilder::static_in(owner);
    let cond = b.param("cond", Type::boolean());
    let cond_ref = b.local_ref(cond);
    let null = b.null();
    let flag = b.bool(true);
    let call = b.call(None, "id", vec![flag]);
    let lambda = b.lambda(vec![], call);
    let conditional = b.conditional(cond_ref, null, lambda);
    let pr = b.declare("pr", LocalTy::Declared(runnable.clone()), Some(conditional));
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(*result.type_of(lambda), runnable);
    assert_eq!(*result.type_of(conditional), runnable);
    assert_eq!(*result.local_type(pr), runnable);
    assert_eq!(result.functional_method(lambda).unwrap().name, "run");
    assert_eq!(show(&env, &result, call), "Boolean");
}

#[test]
fn lambda_result_type_flows_into_the_generic_return() {
    // apply("x", s -> s.length())
    let mut env = TypeStore::with_minimal_jdk();
    let owner = owner_with_id(&mut env);

    let mut b = BodyBuilder::static_in(owner);
    let x = b.string("x");
    let s = b.lambda_param("s");
    let s_ref = b.local_ref(s);
    let length = b.call(Some(s_ref), "length", vec![]);
    let lambda = b.lambda(vec![s], length);
    let call = b.call(None, "apply", vec![x, lambda]);
    let n = b.declare("n", LocalTy::Var, Some(call));
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(*result.local_type(s), string(&env));
    assert_eq!(show(&env, &result, lambda), "Function<String, Integer>");
    assert_eq!(show(&env, &result, call), "Integer");
    assert_eq!(result.display_type(&env, result.local_type(n)), "Integer");
}

#[test]
fn block_lambda_returns_are_collected_for_inference() {
    // Optional.of("a").map(v -> { return v.length() + 1; })
    let env = TypeStore::with_minimal_jdk();
    let mut b = BodyBuilder::new();
    let a = b.string("a");
    let optional = b.static_call(class(&env, "java.util.Optional"), "of", vec![a]);
    let v = b.lambda_param("v");
    let v_ref = b.local_ref(v);
    let length = b.call(Some(v_ref), "length", vec![]);
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, length, one);
    let ret = b.return_stmt(Some(sum));
    let block = b.block(vec![ret]);
    let lambda = b.block_lambda(vec![v], block);
    let map = b.call(Some(optional), "map", vec![lambda]);
    b.eval(map);
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(show(&env, &result, map), "Optional<Integer>");
    assert_eq!(show(&env, &result, lambda), "Function<String, Integer>");
}

#[test]
fn constructor_reference_uses_the_target_parameterization() {
    // Supplier<ArrayList<String>> make = ArrayList::new;
    let env = TypeStore::with_minimal_jdk();
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let list_of_strings = Type::class(array_list, vec![string(&env)]);
    let supplier = Type::class(
        env.class_id("java.util.function.Supplier").unwrap(),
        vec![list_of_strings.clone()],
    );

    let mut b = BodyBuilder::new();
    let receiver = b.type_ref(Type::class(array_list, vec![]));
    let mref = b.method_ref(receiver, "new");
    b.declare("make", LocalTy::Declared(supplier.clone()), Some(mref));
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(*result.type_of(mref), supplier);
    let ctor = result.resolved_call(mref).unwrap();
    assert_eq!(ctor.name, "<init>");
    assert_eq!(ctor.return_type, list_of_strings);
}

#[test]
fn array_constructor_reference_produces_the_array_type() {
    let env = TypeStore::with_minimal_jdk();
    let function = Type::class(
        env.class_id("java.util.function.Function").unwrap(),
        vec![class(&env, "java.lang.Integer"), Type::array(string(&env))],
    );

    let mut b = BodyBuilder::new();
    let receiver = b.type_ref(Type::array(string(&env)));
    let mref = b.method_ref(receiver, "new");
    b.declare("make", LocalTy::Declared(function.clone()), Some(mref));
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(*result.type_of(mref), function);
}

#[test]
fn bound_method_reference_checks_its_return_against_the_target() {
    // Supplier<Integer> size = text::length;  Supplier<String> bad = text::length;
    let env = TypeStore::with_minimal_jdk();
    let supplier = env.class_id("java.util.function.Supplier").unwrap();

    let mut b = BodyBuilder::new();
    let text = b.param("text", string(&env));
    let receiver = b.local_ref(text);
    let good = b.method_ref(receiver, "length");
    b.declare(
        "size",
        LocalTy::Declared(Type::class(supplier, vec![class(&env, "java.lang.Integer")])),
        Some(good),
    );
    let receiver = b.local_ref(text);
    let bad = b.method_ref(receiver, "length");
    b.declare(
        "bad",
        LocalTy::Declared(Type::class(supplier, vec![string(&env)])),
        Some(bad),
    );
    let body = b.finish();

    let result = check(&env, &body);
    assert_eq!(codes(&result), vec!["bad-method-ref"]);
    assert!(result.resolved_call(good).is_some());
}

#[test]
fn void_lambda_needs_a_statement_expression_body() {
    // Runnable r = () -> 1;
    let env = TypeStore::with_minimal_jdk();
    let mut b = BodyBuilder::new();
    let one = b.int(1);
    let lambda = b.lambda(vec![], one);
    b.declare("r", LocalTy::Declared(class(&env, "java.lang.Runnable")), Some(lambda));
    let body = b.finish();

    let result = check(&env, &body);
    assert_eq!(codes(&result), vec!["bad-lambda-body"]);
}

#[test]
fn lambda_parameter_count_must_match_the_function_type() {
    let env = TypeStore::with_minimal_jdk();
    let mut b = BodyBuilder::new();
    let x = b.lambda_param("x");
    let y = b.lambda_param("y");
    let x_ref = b.local_ref(x);
    let lambda = b.lambda(vec![x, y], x_ref);
    let function = Type::class(
        env.class_id("java.util.function.Function").unwrap(),
        vec![string(&env), string(&env)],
    );
    b.declare("f", LocalTy::Declared(function), Some(lambda));
    let body = b.finish();

    let result = check(&env, &body);
    assert_eq!(codes(&result), vec!["lambda-arity-mismatch"]);
    assert_eq!(*result.type_of(lambda), Type::Unknown);
}

#[test]
fn lambda_target_must_be_a_functional_interface() {
    let env = TypeStore::with_minimal_jdk();
    let mut b = BodyBuilder::new();
    let one = b.int(1);
    let lambda = b.lambda(vec![], one);
    b.declare("s", LocalTy::Declared(string(&env)), Some(lambda));
    let body = b.finish();

    let result = check(&env, &body);
    assert_eq!(codes(&result), vec!["not-functional-interface"]);
}
