use nova_types::{
    instantiate_supertype, is_assignable, is_loose_compatible, is_strict_compatible, is_subtype,
    ClassKind, Type, TypeEnv, TypeStore,
};

#[test]
fn inheritance_substitutes_type_arguments() {
    let env = TypeStore::with_minimal_jdk();
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);
    let object = Type::class(env.well_known().object, vec![]);

    let array_list_string = Type::class(array_list, vec![string.clone()]);
    assert!(is_subtype(&env, &array_list_string, &Type::class(list, vec![string])));
    // Invariant without wildcards.
    assert!(!is_subtype(&env, &array_list_string, &Type::class(list, vec![object])));
}

#[test]
fn wildcard_containment() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);
    let object = Type::class(env.well_known().object, vec![]);

    let extends_string = Type::class(list, vec![Type::extends(string.clone())]);
    let extends_object = Type::class(list, vec![Type::extends(object.clone())]);
    assert!(is_subtype(&env, &extends_string, &extends_object));
    assert!(!is_subtype(&env, &extends_object, &extends_string));

    let super_object = Type::class(list, vec![Type::super_of(object)]);
    let super_string = Type::class(list, vec![Type::super_of(string.clone())]);
    assert!(is_subtype(&env, &super_object, &super_string));
    assert!(!is_subtype(&env, &super_string, &super_object));

    let unbounded = Type::class(list, vec![Type::unbounded()]);
    assert!(is_subtype(&env, &Type::class(list, vec![string]), &unbounded));
}

#[test]
fn intersection_subtyping_is_order_independent() {
    let env = TypeStore::with_minimal_jdk();
    let cloneable = Type::class(env.well_known().cloneable, vec![]);
    let serializable = Type::class(env.well_known().serializable, vec![]);

    let ab = Type::Intersection(vec![cloneable.clone(), serializable.clone()]);
    let ba = Type::Intersection(vec![serializable.clone(), cloneable.clone()]);
    assert!(is_subtype(&env, &ab, &ba));
    assert!(is_subtype(&env, &ba, &ab));
    assert!(is_subtype(&env, &ab, &cloneable));
    assert!(!is_subtype(&env, &cloneable, &ab));
    assert!(!is_subtype(&env, &serializable, &ab));
}

#[test]
fn primitive_widening_and_boxing() {
    let env = TypeStore::with_minimal_jdk();
    let integer = Type::class(env.well_known().integer, vec![]);
    let long = Type::Primitive(nova_types::PrimitiveType::Long);
    let object = Type::class(env.well_known().object, vec![]);

    assert!(is_subtype(&env, &Type::int(), &long));
    assert!(!is_subtype(&env, &long, &Type::int()));
    assert!(is_strict_compatible(&env, &Type::int(), &long));
    assert!(!is_strict_compatible(&env, &Type::int(), &integer));
    assert!(is_loose_compatible(&env, &Type::int(), &integer));
    assert!(is_loose_compatible(&env, &Type::int(), &object));
    assert!(is_loose_compatible(&env, &integer, &long));
    assert!(is_assignable(&env, &Type::Null, &integer));
    assert!(!is_assignable(&env, &Type::Null, &Type::int()));
}

#[test]
fn raw_types_convert_unchecked() {
    let env = TypeStore::with_minimal_jdk();
    let list = env.class_id("java.util.List").unwrap();
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let string = Type::class(env.well_known().string, vec![]);

    let raw = Type::class(array_list, vec![]);
    let list_string = Type::class(list, vec![string]);
    assert!(!is_subtype(&env, &raw, &list_string));
    assert!(is_assignable(&env, &raw, &list_string));
    assert!(is_subtype(&env, &list_string, &Type::class(list, vec![])));
}

#[test]
fn instantiate_supertype_is_order_independent_for_conflicting_bounds() {
    let mut env = TypeStore::with_minimal_jdk();
    let iface = env
        .build_class(
            "com.example.I",
            ClassKind::Interface,
            "<X:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .finish()
        .unwrap();
    let a = env
        .build_class(
            "com.example.A",
            ClassKind::Class,
            "Ljava/lang/Object;Lcom/example/I<Ljava/lang/String;>;",
        )
        .finish()
        .unwrap();
    let b = env
        .build_class(
            "com.example.B",
            ClassKind::Class,
            "Ljava/lang/Object;Lcom/example/I<Ljava/lang/Integer;>;",
        )
        .finish()
        .unwrap();
    let (a, b) = (Type::class(a, vec![]), Type::class(b, vec![]));

    let t1 = env.add_type_param("T1", vec![a.clone(), b.clone()]);
    let t2 = env.add_type_param("T2", vec![b.clone(), a.clone()]);
    assert_eq!(instantiate_supertype(&env, &Type::TypeVar(t1), iface), None);
    assert_eq!(instantiate_supertype(&env, &Type::TypeVar(t2), iface), None);

    let i1 = Type::Intersection(vec![b.clone(), a.clone()]);
    let i2 = Type::Intersection(vec![a.clone(), b]);
    assert_eq!(instantiate_supertype(&env, &i1, iface), None);
    assert_eq!(instantiate_supertype(&env, &i2, iface), None);

    let string = Type::class(env.well_known().string, vec![]);
    assert_eq!(instantiate_supertype(&env, &a, iface), Some(vec![string]));
}
