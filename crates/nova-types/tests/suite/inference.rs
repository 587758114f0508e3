use nova_types::{
    resolve_constructor, resolve_method_call, CallKind, ClassId, ClassKind, ConstructorCall,
    InferenceContext, InferenceError, MethodCall, MethodResolution, TyContext, Type, TypeEnv,
    TypeStore,
};

use pretty_assertions::assert_eq;

fn static_call<'a>(receiver: ClassId, name: &'a str, args: Vec<Type>) -> MethodCall<'a> {
    MethodCall {
        receiver: Type::class(receiver, vec![]),
        call_kind: CallKind::Static,
        name,
        args,
        expected_return: None,
        explicit_type_args: vec![],
    }
}

fn generics(env: &mut TypeStore) -> ClassId {
    env.build_class("com.example.Generics", ClassKind::Class, "Ljava/lang/Object;")
        .static_method("id", "<T:Ljava/lang/Object;>(TT;)TT;")
        .static_method("empty", "<T:Ljava/lang/Object;>()Ljava/util/List<TT;>;")
        .static_method("ints", "<N:Ljava/lang/Integer;>(TN;)V")
        .static_method("pair", "<T:Ljava/lang/Object;>(TT;TT;)TT;")
        .static_method(
            "max",
            "<T::Ljava/lang/Comparable<-TT;>;>(Ljava/util/List<+TT;>;)TT;",
        )
        .finish()
        .unwrap()
}

fn found(res: MethodResolution) -> nova_types::ResolvedMethod {
    match res {
        MethodResolution::Found(found) => found,
        other => panic!("expected a resolved method, got {other:?}"),
    }
}

#[test]
fn identity_infers_argument_type() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = generics(&mut env);
    let string = Type::class(env.well_known().string, vec![]);

    let res = found(resolve_method_call(
        &mut env,
        &static_call(class, "id", vec![string.clone()]),
    ));
    assert_eq!(res.inferred_type_args, vec![string.clone()]);
    assert_eq!(res.return_type, string);
}

#[test]
fn return_context_drives_inference() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = generics(&mut env);
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);
    let expected = Type::class(list, vec![string.clone()]);

    let mut call = static_call(class, "empty", vec![]);
    call.expected_return = Some(expected.clone());
    let res = found(resolve_method_call(&mut env, &call));
    assert_eq!(res.inferred_type_args, vec![string]);
    assert_eq!(res.return_type, expected);
}

#[test]
fn unusable_return_context_is_ignored() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = generics(&mut env);
    let string = Type::class(env.well_known().string, vec![]);
    let integer = Type::class(env.well_known().integer, vec![]);

    let mut call = static_call(class, "id", vec![string.clone()]);
    call.expected_return = Some(integer);
    let res = found(resolve_method_call(&mut env, &call));
    assert_eq!(res.return_type, string);
}

#[test]
fn inferred_type_respects_declared_bound() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = generics(&mut env);
    let integer = Type::class(env.well_known().integer, vec![]);
    let string = Type::class(env.well_known().string, vec![]);

    let res = found(resolve_method_call(
        &mut env,
        &static_call(class, "ints", vec![integer.clone()]),
    ));
    assert_eq!(res.inferred_type_args, vec![integer]);

    let res = resolve_method_call(&mut env, &static_call(class, "ints", vec![string]));
    assert!(matches!(res, MethodResolution::NotFound(_)), "{res:?}");
}

#[test]
fn unrelated_arguments_infer_their_lub() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = generics(&mut env);
    let integer = Type::class(env.well_known().integer, vec![]);
    let double = Type::class(env.well_known().double, vec![]);
    let number = Type::class(env.well_known().number, vec![]);

    let res = found(resolve_method_call(
        &mut env,
        &static_call(class, "pair", vec![integer, double]),
    ));
    let Type::Intersection(parts) = &res.return_type else {
        panic!("expected an intersection, got {:?}", res.return_type);
    };
    assert_eq!(parts[0], number);
    assert_eq!(parts.len(), 2);
}

#[test]
fn primitive_arguments_box_in_loose_phase() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = generics(&mut env);
    let integer = Type::class(env.well_known().integer, vec![]);

    let res = found(resolve_method_call(
        &mut env,
        &static_call(class, "id", vec![Type::int()]),
    ));
    assert_eq!(res.phase, nova_types::InvocationPhase::Loose);
    assert_eq!(res.return_type, integer);
}

#[test]
fn recursive_bound_is_satisfied_by_comparable_element() {
    let mut env = TypeStore::with_minimal_jdk();
    let class = generics(&mut env);
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);

    let res = found(resolve_method_call(
        &mut env,
        &static_call(
            class,
            "max",
            vec![Type::class(list, vec![string.clone()])],
        ),
    ));
    assert_eq!(res.return_type, string);
}

#[test]
fn inherited_generic_member_is_opened_through_the_supertype_view() {
    // class Base<K extends List<O>, O> { K get(); }  class Derived extends Base<List<String>, String>
    let mut env = TypeStore::with_minimal_jdk();
    env.build_class(
        "com.example.Base",
        ClassKind::Class,
        "<K:Ljava/util/List<TO;>;O:Ljava/lang/Object;>Ljava/lang/Object;",
    )
    .method("get", "()TK;")
    .method("first", "<R:Ljava/lang/Object;>(Ljava/util/function/Function<-TO;+TR;>;)TR;")
    .finish()
    .unwrap();
    let derived = env
        .build_class(
            "com.example.Derived",
            ClassKind::Class,
            "Lcom/example/Base<Ljava/util/List<Ljava/lang/String;>;Ljava/lang/String;>;",
        )
        .finish()
        .unwrap();
    let list = env.class_id("java.util.List").unwrap();
    let function = env.class_id("java.util.function.Function").unwrap();
    let string = Type::class(env.well_known().string, vec![]);
    let integer = Type::class(env.well_known().integer, vec![]);

    let mut ctx = TyContext::new(&env);
    let mut call = static_call(derived, "get", vec![]);
    call.call_kind = CallKind::Instance;
    let res = found(resolve_method_call(&mut ctx, &call));
    assert_eq!(res.return_type, Type::class(list, vec![string.clone()]));

    let mut call = static_call(
        derived,
        "first",
        vec![Type::class(function, vec![string, integer.clone()])],
    );
    call.call_kind = CallKind::Instance;
    let res = found(resolve_method_call(&mut ctx, &call));
    assert_eq!(res.inferred_type_args, vec![integer.clone()]);
    assert_eq!(res.return_type, integer);
}

#[test]
fn diamond_constructor_infers_from_arguments() {
    let env = TypeStore::with_minimal_jdk();
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);

    let mut ctx = TyContext::new(&env);
    let res = found(resolve_constructor(
        &mut ctx,
        &ConstructorCall {
            class: Type::class(array_list, vec![]),
            args: vec![Type::class(list, vec![string.clone()])],
            expected: None,
            diamond: true,
            explicit_type_args: vec![],
        },
    ));
    assert_eq!(res.return_type, Type::class(array_list, vec![string]));
}

#[test]
fn inference_context_reports_conflicting_equalities() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);
    let integer = Type::class(env.well_known().integer, vec![]);

    let mut ic = InferenceContext::new();
    let alpha = Type::Infer(ic.fresh_var(None));
    ic.add_compatible(
        &env,
        &Type::class(list, vec![string]),
        &Type::class(list, vec![alpha.clone()]),
        false,
    )
    .unwrap();
    let err = ic
        .add_compatible(
            &env,
            &Type::class(list, vec![integer]),
            &Type::class(list, vec![alpha]),
            false,
        )
        .unwrap_err();
    assert!(matches!(err, InferenceError::Incompatible { .. }), "{err:?}");
}

#[test]
fn inherited_method_type_parameter_bounds_follow_the_subclass_view() {
    // class Scratch<O> { <K extends List<O>> K inherited(K k) }  class Inner<T> extends Scratch<T>
    let mut env = TypeStore::with_minimal_jdk();
    let scratch = env
        .build_class(
            "com.example.Scratch",
            ClassKind::Class,
            "<O:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .method("inherited", "<K::Ljava/util/List<TO;>;>(TK;)TK;")
        .finish()
        .unwrap();
    let inner = env
        .build_class(
            "com.example.Scratch$Inner",
            ClassKind::Class,
            "<T:Ljava/lang/Object;>Lcom/example/Scratch<TT;>;",
        )
        .finish()
        .unwrap();
    let t = env.class(inner).unwrap().type_params[0];
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let arg = Type::class(array_list, vec![Type::TypeVar(t)]);

    let mut ctx = TyContext::new(&env);
    let mut call = static_call(inner, "inherited", vec![arg.clone()]);
    call.receiver = Type::class(inner, vec![Type::TypeVar(t)]);
    call.call_kind = CallKind::Instance;
    let res = found(resolve_method_call(&mut ctx, &call));
    assert_eq!(res.return_type, arg);
    assert_eq!(res.declaring_type.as_class().map(|ct| ct.def), Some(scratch));
}
