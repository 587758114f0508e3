use nova_types::{
    resolve_method_call, CallKind, ClassId, ClassKind, InvocationPhase, MethodCall,
    MethodResolution, ResolvedMethod, TyContext, Type, TypeEnv, TypeStore, TypeWarning,
    UncheckedReason,
};

use pretty_assertions::assert_eq;

const UNCHECKED_VARARGS: TypeWarning = TypeWarning::Unchecked(UncheckedReason::UncheckedVarargs);

fn varargs_class(env: &mut TypeStore) -> ClassId {
    env.build_class("com.example.Varargs", ClassKind::Class, "Ljava/lang/Object;")
        // <T> void m(T... xs)
        .static_method("m", "<T:Ljava/lang/Object;>([TT;)V")
        .varargs()
        // void n(String... xs)
        .static_method("n", "([Ljava/lang/String;)V")
        .varargs()
        // void join(int sep, String... parts)
        .static_method("join", "(I[Ljava/lang/String;)Ljava/lang/String;")
        .varargs()
        .finish()
        .unwrap()
}

fn resolve(env: &TypeStore, class: ClassId, name: &str, args: Vec<Type>) -> ResolvedMethod {
    let call = MethodCall {
        receiver: Type::class(class, vec![]),
        call_kind: CallKind::Static,
        name,
        args,
        expected_return: None,
        explicit_type_args: vec![],
    };
    let mut ctx = TyContext::new(env);
    match resolve_method_call(&mut ctx, &call) {
        MethodResolution::Found(found) => found,
        other => panic!("expected {name} to resolve, got {other:?}"),
    }
}

#[test]
fn warns_for_non_reifiable_component_in_variable_arity_form() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = varargs_class(&mut env);
    let string = Type::class(env.well_known().string, vec![]);

    let found = resolve(&env, class, "m", vec![string.clone(), string.clone()]);
    assert!(found.used_varargs);
    assert_eq!(found.phase, InvocationPhase::Varargs);
    assert_eq!(found.inferred_type_args, vec![string.clone()]);
    assert_eq!(found.params, vec![string.clone(), string]);
    assert!(found.warnings.contains(&UNCHECKED_VARARGS));
}

#[test]
fn no_warning_for_reifiable_component() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = varargs_class(&mut env);
    let string = Type::class(env.well_known().string, vec![]);

    let found = resolve(&env, class, "n", vec![string.clone(), string]);
    assert!(found.used_varargs);
    assert!(!found.warnings.contains(&UNCHECKED_VARARGS));
}

#[test]
fn array_argument_uses_fixed_arity_form() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = varargs_class(&mut env);
    let strings = Type::array(Type::class(env.well_known().string, vec![]));

    let found = resolve(&env, class, "n", vec![strings.clone()]);
    assert!(!found.used_varargs);
    assert_eq!(found.phase, InvocationPhase::Strict);
    assert_eq!(found.params, vec![strings]);
}

#[test]
fn empty_variable_arity_tail() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = varargs_class(&mut env);

    let found = resolve(&env, class, "join", vec![Type::int()]);
    assert!(found.used_varargs);
    assert_eq!(found.params, vec![Type::int()]);
    assert_eq!(found.formals.len(), 2);

    let found = resolve(&env, class, "n", vec![]);
    assert!(found.used_varargs);
    assert!(found.params.is_empty());
}
