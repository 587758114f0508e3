use nova_types::{
    is_assignable, resolve_method_call, CallKind, ClassKind, ClassType, MethodCall,
    MethodResolution, TyContext, Type, TypeEnv, TypeStore, TypeVarId,
};

use pretty_assertions::assert_eq;

fn captured_arg(ty: &Type, idx: usize) -> TypeVarId {
    let Type::Class(ClassType { args, .. }) = ty else {
        panic!("expected captured class type, got {ty:?}");
    };
    let Type::TypeVar(cap) = args[idx] else {
        panic!("expected capture variable, got {:?}", args[idx]);
    };
    cap
}

fn instance_call<'a>(receiver: Type, name: &'a str, args: Vec<Type>) -> MethodCall<'a> {
    MethodCall {
        receiver,
        call_kind: CallKind::Instance,
        name,
        args,
        expected_return: None,
        explicit_type_args: vec![],
    }
}

#[test]
fn extends_wildcard_capture_drops_implied_object_bound() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let integer = Type::class(env.well_known().integer, vec![]);

    let mut ctx = TyContext::new(&env);
    let captured = ctx.capture_conversion(&Type::class(list, vec![Type::extends(integer.clone())]));
    let cap = captured_arg(&captured, 0);

    let def = ctx.type_param(cap).unwrap();
    assert_eq!(def.name, "CAP#1");
    assert_eq!(def.upper_bounds, vec![integer]);
    assert_eq!(def.lower_bound, None);
}

#[test]
fn capture_substitutes_self_referential_bounds() {
    let mut env = TypeStore::with_minimal_jdk();
    let enum_like = env
        .build_class(
            "com.example.EnumLike",
            ClassKind::Class,
            "<E:Lcom/example/EnumLike<TE;>;>Ljava/lang/Object;",
        )
        .finish()
        .unwrap();

    let mut ctx = TyContext::new(&env);
    let captured = ctx.capture_conversion(&Type::class(enum_like, vec![Type::unbounded()]));
    let cap = captured_arg(&captured, 0);

    let def = ctx.type_param(cap).unwrap();
    assert_eq!(
        def.upper_bounds,
        vec![Type::class(enum_like, vec![Type::TypeVar(cap)])]
    );
    assert_eq!(def.lower_bound, None);
}

#[test]
fn capture_upper_bounds_are_sorted_independently_of_declaration_order() {
    let mut env = TypeStore::with_minimal_jdk();
    let cloneable = Type::class(env.well_known().cloneable, vec![]);
    let serializable = Type::class(env.well_known().serializable, vec![]);

    let foo1 = env
        .build_class(
            "com.example.Foo1",
            ClassKind::Class,
            "<T1::Ljava/lang/Cloneable;:Ljava/io/Serializable;>Ljava/lang/Object;",
        )
        .finish()
        .unwrap();
    let foo2 = env
        .build_class(
            "com.example.Foo2",
            ClassKind::Class,
            "<T2::Ljava/io/Serializable;:Ljava/lang/Cloneable;>Ljava/lang/Object;",
        )
        .finish()
        .unwrap();

    let mut ctx = TyContext::new(&env);
    let cap1 = captured_arg(
        &ctx.capture_conversion(&Type::class(foo1, vec![Type::unbounded()])),
        0,
    );
    let cap2 = captured_arg(
        &ctx.capture_conversion(&Type::class(foo2, vec![Type::unbounded()])),
        0,
    );

    let expected = vec![serializable, cloneable];
    assert_eq!(ctx.type_param(cap1).unwrap().upper_bounds, expected);
    assert_eq!(ctx.type_param(cap2).unwrap().upper_bounds, expected);
    assert_eq!(ctx.type_param(cap2).unwrap().name, "CAP#2");
}

#[test]
fn capture_variables_are_local_to_their_context() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let before = env.type_param_count();

    let mut ctx = TyContext::new(&env);
    let captured = ctx.capture_conversion(&Type::class(list, vec![Type::unbounded()]));
    let cap = captured_arg(&captured, 0);
    assert!(ctx.type_param(cap).is_some());
    assert!(env.type_param(cap).is_none());
    assert_eq!(env.type_param_count(), before);

    ctx.reset();
    assert!(ctx.type_param(cap).is_none());
}

#[test]
fn captures_survive_a_round_trip_through_their_owner() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let number = Type::class(env.well_known().number, vec![]);

    let mut ctx = TyContext::new(&env);
    let captured = ctx.capture_conversion(&Type::class(list, vec![Type::extends(number.clone())]));
    let cap = captured_arg(&captured, 0);
    let captures = ctx.into_captures();
    assert_eq!(captures.len(), 1);

    let restored = TyContext::with_captures(&env, captures);
    assert_eq!(restored.type_param(cap).unwrap().upper_bounds, vec![number]);
    assert_eq!(nova_types::format_type(&restored, &captured), "List<CAP#1>");
}

#[test]
fn capture_converts_the_enclosing_instance_type() {
    let mut env = TypeStore::with_minimal_jdk();
    let outer = env
        .build_class(
            "com.example.Outer",
            ClassKind::Class,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .finish()
        .unwrap();
    let inner = env
        .build_inner_class(outer, "Inner", ClassKind::Class, "Ljava/lang/Object;")
        .method("get", "()TT;")
        .finish()
        .unwrap();
    let number = Type::class(env.well_known().number, vec![]);

    let receiver = Type::inner_class(
        Type::class(outer, vec![Type::extends(number.clone())]),
        inner,
        vec![],
    );
    let mut ctx = TyContext::new(&env);
    let MethodResolution::Found(found) =
        resolve_method_call(&mut ctx, &instance_call(receiver, "get", vec![]))
    else {
        panic!("expected Outer<? extends Number>.Inner.get()");
    };
    let Type::TypeVar(cap) = found.return_type else {
        panic!("expected a capture variable, got {:?}", found.return_type);
    };
    assert_eq!(ctx.type_param(cap).unwrap().upper_bounds, vec![number]);
}

#[test]
fn extends_wildcard_receiver_returns_capture_variable() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);

    let mut ctx = TyContext::new(&env);
    let call = instance_call(
        Type::class(list, vec![Type::extends(string.clone())]),
        "get",
        vec![Type::int()],
    );
    let MethodResolution::Found(resolved) = resolve_method_call(&mut ctx, &call) else {
        panic!("expected List<? extends String>.get(int)");
    };

    let Type::TypeVar(cap) = resolved.return_type else {
        panic!("expected capture variable, got {:?}", resolved.return_type);
    };
    assert_eq!(ctx.type_param(cap).unwrap().upper_bounds, vec![string.clone()]);
    assert!(is_assignable(&ctx, &resolved.return_type, &string));
}

#[test]
fn super_wildcard_receiver_accepts_lower_bound_only() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);
    let object = Type::class(env.well_known().object, vec![]);
    let receiver = Type::class(list, vec![Type::super_of(string.clone())]);

    let mut ctx = TyContext::new(&env);
    let ok = instance_call(receiver.clone(), "add", vec![string.clone()]);
    let MethodResolution::Found(resolved) = resolve_method_call(&mut ctx, &ok) else {
        panic!("expected List<? super String>.add(String)");
    };
    let Type::TypeVar(cap) = resolved.params[0] else {
        panic!("expected capture parameter, got {:?}", resolved.params[0]);
    };
    assert_eq!(ctx.type_param(cap).unwrap().lower_bound, Some(string));

    let mut ctx = TyContext::new(&env);
    let bad = instance_call(receiver, "add", vec![object]);
    let MethodResolution::NotFound(not_found) = resolve_method_call(&mut ctx, &bad) else {
        panic!("List<? super String>.add(Object) must not resolve");
    };
    assert!(not_found.capture_related);
}

#[test]
fn type_var_receiver_prefers_class_bound() {
    let mut env = TypeStore::with_minimal_jdk();
    let iface = env
        .build_class("com.example.I", ClassKind::Interface, "Ljava/lang/Object;")
        .abstract_method("foo", "()Ljava/lang/Object;")
        .static_field("foo", "Ljava/lang/Object;")
        .finish()
        .unwrap();
    let class = env
        .build_class("com.example.A", ClassKind::Class, "Ljava/lang/Object;Lcom/example/I;")
        .method("foo", "()Ljava/lang/String;")
        .field("foo", "Ljava/lang/String;")
        .finish()
        .unwrap();
    let string = Type::class(env.well_known().string, vec![]);

    // Interface bound first on purpose.
    let tv = env.add_type_param("T", vec![Type::class(iface, vec![]), Type::class(class, vec![])]);

    let mut ctx = TyContext::new(&env);
    let MethodResolution::Found(res) =
        resolve_method_call(&mut ctx, &instance_call(Type::TypeVar(tv), "foo", vec![]))
    else {
        panic!("expected T.foo()");
    };
    assert_eq!(res.return_type, string);

    let field = ctx
        .resolve_field(&Type::TypeVar(tv), "foo", CallKind::Instance)
        .expect("field should resolve");
    assert_eq!(field.ty, string);
    assert!(!field.is_static);
}

#[test]
fn type_var_receiver_ignores_unknown_bounds() {
    let mut env = TypeStore::with_minimal_jdk();
    let iface = env
        .build_class("com.example.IUnknownBound", ClassKind::Interface, "Ljava/lang/Object;")
        .abstract_method("foo", "()Ljava/lang/String;")
        .finish()
        .unwrap();
    let string = Type::class(env.well_known().string, vec![]);

    let t1 = env.add_type_param("T1", vec![Type::Unknown, Type::class(iface, vec![])]);
    let t2 = env.add_type_param("T2", vec![Type::class(iface, vec![]), Type::Unknown]);

    for tv in [t1, t2] {
        let mut ctx = TyContext::new(&env);
        let MethodResolution::Found(res) =
            resolve_method_call(&mut ctx, &instance_call(Type::TypeVar(tv), "foo", vec![]))
        else {
            panic!("expected foo() through the interface bound");
        };
        assert_eq!(res.return_type, string);
    }
}

#[test]
fn field_access_through_wildcards_is_capture_converted() {
    let mut env = TypeStore::with_minimal_jdk();
    let boxed = env
        .build_class(
            "com.example.Box",
            ClassKind::Class,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .field("value", "TT;")
        .finish()
        .unwrap();
    let number = Type::class(env.well_known().number, vec![]);
    let integer = Type::class(env.well_known().integer, vec![]);
    let object = Type::class(env.well_known().object, vec![]);

    let mut ctx = TyContext::new(&env);
    let read = ctx
        .resolve_field(
            &Type::class(boxed, vec![Type::extends(number.clone())]),
            "value",
            CallKind::Instance,
        )
        .expect("field should resolve");
    let Type::TypeVar(cap) = read.ty else {
        panic!("expected capture variable, got {:?}", read.ty);
    };
    assert_eq!(ctx.type_param(cap).unwrap().upper_bounds, vec![number.clone()]);
    assert!(is_assignable(&ctx, &read.ty, &number));
    assert!(!is_assignable(&ctx, &number, &read.ty));

    let write = ctx
        .resolve_field(
            &Type::class(boxed, vec![Type::super_of(integer.clone())]),
            "value",
            CallKind::Instance,
        )
        .expect("field should resolve");
    let Type::TypeVar(cap) = write.ty else {
        panic!("expected capture variable, got {:?}", write.ty);
    };
    let def = ctx.type_param(cap).unwrap();
    assert_eq!(def.upper_bounds, vec![object.clone()]);
    assert_eq!(def.lower_bound, Some(integer.clone()));
    assert!(is_assignable(&ctx, &write.ty, &object));
    assert!(!is_assignable(&ctx, &write.ty, &integer));
    assert!(is_assignable(&ctx, &integer, &write.ty));
}

#[test]
fn resolution_is_deterministic_across_contexts() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);
    let integer = Type::class(env.well_known().integer, vec![]);

    let get = |elem: &Type| {
        let call = instance_call(
            Type::class(list, vec![Type::extends(elem.clone())]),
            "get",
            vec![Type::int()],
        );
        let mut ctx = TyContext::new(&env);
        match resolve_method_call(&mut ctx, &call) {
            MethodResolution::Found(found) => found,
            other => panic!("expected List.get, got {other:?}"),
        }
    };

    let a1 = get(&string);
    let b1 = get(&integer);
    let b2 = get(&integer);
    let a2 = get(&string);
    assert_eq!(a1, a2);
    assert_eq!(b1, b2);
}
