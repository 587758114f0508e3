use nova_types::{
    is_subtype, ClassDef, ClassKind, MethodDef, PrimitiveType, Type, TypeEnv, TypeStore,
    TypeVarId,
};

use pretty_assertions::assert_eq;

fn class(name: &str, kind: ClassKind, methods: Vec<MethodDef>) -> ClassDef {
    ClassDef {
        name: name.to_string(),
        kind,
        outer: None,
        type_params: vec![],
        super_class: None,
        interfaces: vec![],
        fields: vec![],
        constructors: vec![],
        methods,
    }
}

fn method(name: &str, is_abstract: bool) -> MethodDef {
    MethodDef {
        name: name.to_string(),
        type_params: vec![],
        params: vec![],
        return_type: Type::Void,
        is_static: false,
        is_varargs: false,
        is_abstract,
    }
}

#[test]
fn default_store_defines_core_types() {
    let env = TypeStore::default();
    let object = env.lookup_class("Object").expect("java.lang.Object");
    let cloneable = env.lookup_class("Cloneable").expect("java.lang.Cloneable");
    let serializable = env
        .lookup_class("java.io.Serializable")
        .expect("java.io.Serializable");

    let int_array = Type::array(Type::Primitive(PrimitiveType::Int));
    for sup in [object, cloneable, serializable] {
        assert!(is_subtype(&env, &int_array, &Type::class(sup, vec![])));
    }
}

#[test]
fn interning_and_defining_share_one_id() {
    let mut store = TypeStore::default();
    let id = store.intern_class_id("com.example.Foo");
    assert_eq!(store.intern_class_id("com.example.Foo"), id);
    assert!(store.class(id).is_none());

    let mut def = class("com.example.Foo", ClassKind::Class, vec![method("m", false)]);
    def.type_params = vec![store.add_type_param("T", vec![Type::Named("java.lang.Object".into())])];
    store.define_class(id, def.clone());
    assert_eq!(store.class_id("com.example.Foo"), Some(id));
    assert_eq!(store.class(id), Some(&def));
}

#[test]
fn upsert_and_remove_keep_ids_stable() {
    let mut store = TypeStore::default();
    let first = store.upsert_class(class("com.example.Bar", ClassKind::Class, vec![]));
    let second = store.upsert_class(class(
        "com.example.Bar",
        ClassKind::Interface,
        vec![method("f", true)],
    ));
    assert_eq!(first, second);
    assert_eq!(store.class(first).unwrap().kind, ClassKind::Interface);

    assert_eq!(store.remove_class("com.example.Bar"), Some(first));
    assert_eq!(store.lookup_class("com.example.Bar"), None);
    let again = store.add_class(class("com.example.Bar", ClassKind::Class, vec![]));
    assert_eq!(again, first);
}

#[test]
fn clone_preserves_ids_and_is_independent() {
    let mut store = TypeStore::with_minimal_jdk();
    let object = Type::class(store.well_known().object, vec![]);
    let foo = store
        .build_class(
            "com.example.Foo",
            ClassKind::Class,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .method("foo", "(I)V")
        .finish()
        .unwrap();
    let bar = store.upsert_class(class("com.example.Bar", ClassKind::Class, vec![method("bar", false)]));
    store.remove_class("com.example.Bar");

    let count = store.type_param_count();
    let mut cloned = store.clone();

    assert_eq!(store.well_known(), cloned.well_known());
    for idx in 0..count {
        let id = TypeVarId(idx as u32);
        assert_eq!(store.type_param(id), cloned.type_param(id));
    }
    for name in ["java.lang.Object", "java.util.List", "com.example.Foo"] {
        assert_eq!(store.lookup_class(name), cloned.lookup_class(name));
    }

    // The tombstone survives cloning.
    let reinserted = cloned.upsert_class(class("com.example.Bar", ClassKind::Class, vec![]));
    assert_eq!(reinserted, bar);
    assert_eq!(store.lookup_class("com.example.Bar"), None);

    let added = cloned.add_type_param("U", vec![object]);
    assert_eq!(cloned.type_param_count(), count + 1);
    assert_eq!(store.type_param_count(), count);
    assert!(store.type_param(added).is_none());

    assert_eq!(cloned.remove_class("com.example.Foo"), Some(foo));
    assert_eq!(store.lookup_class("com.example.Foo"), Some(foo));
    assert_eq!(store.class(foo).unwrap().methods[0].name, "foo");
}

#[test]
fn minimal_jdk_declares_enum_record_and_annotation() {
    let env = TypeStore::with_minimal_jdk();
    let object = Type::class(env.well_known().object, vec![]);
    for name in ["java.lang.Enum", "java.lang.Record"] {
        let id = env.class_id(name).unwrap_or_else(|| panic!("{name} missing"));
        assert!(is_subtype(&env, &Type::class(id, vec![]), &object), "{name}");
    }
    let annotation = env.class_id("java.lang.annotation.Annotation").unwrap();
    assert_eq!(env.class(annotation).unwrap().kind, ClassKind::Interface);
}

#[test]
fn store_round_trips_through_json() {
    let store = TypeStore::with_minimal_jdk();
    let json = serde_json::to_string(&store).unwrap();
    let back: TypeStore = serde_json::from_str(&json).unwrap();
    let list = store.class_id("java.util.List").unwrap();
    assert_eq!(back.class_id("java.util.List"), Some(list));
    assert_eq!(back.class(list), store.class(list));
}
