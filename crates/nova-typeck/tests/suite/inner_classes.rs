use nova_typeck::hir::{BodyBuilder, Expr, LocalTy};
use nova_types::{ClassKind, Span, Type, TypeEnv, TypeStore};

use pretty_assertions::assert_eq;

use super::support::{assert_clean, check, show};

/// `class MyMap<K, V>` with an inner `Entry implements Map.Entry<K, V>` and an inner `KeyIter`
/// whose constructor takes two entries.
fn my_map(env: &mut TypeStore) -> (Type, Type, Type) {
    let outer = env
        .build_class(
            "com.example.MyMap",
            ClassKind::Class,
            "<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .method("lo", "()Lcom/example/MyMap<TK;TV;>.Entry;")
        .method("hi", "()Lcom/example/MyMap<TK;TV;>.Entry;")
        .finish()
        .unwrap();
    let entry = env
        .build_inner_class(
            outer,
            "Entry",
            ClassKind::Class,
            "Ljava/lang/Object;Ljava/util/Map$Entry<TK;TV;>;",
        )
        .finish()
        .unwrap();
    let key_iter = env
        .build_inner_class(outer, "KeyIter", ClassKind::Class, "Ljava/lang/Object;")
        .constructor("<E::Ljava/util/Map$Entry<+TK;+TV;>;>(TE;TE;)V")
        .method("next", "()TK;")
        .finish()
        .unwrap();

    let type_params = env.class(outer).unwrap().type_params.clone();
    let this = Type::class(
        outer,
        type_params.iter().map(|tp| Type::TypeVar(*tp)).collect(),
    );
    let entry_ty = Type::inner_class(this.clone(), entry, vec![]);
    (this, entry_ty, Type::class(key_iter, vec![]))
}

#[test]
fn inner_constructor_substitutes_the_enclosing_type_arguments() {
    // class MyMap<K, V> { ... new KeyIter(lo(), hi()) ... }
    let mut env = TypeStore::with_minimal_jdk();
    let (this, entry, key_iter) = my_map(&mut env);

    let mut b = BodyBuilder::instance(this.clone());
    let lo = b.call(None, "lo", vec![]);
    let hi = b.call(None, "hi", vec![]);
    let new_iter = b.new_object(key_iter, vec![lo, hi]);
    b.eval(new_iter);
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(*result.type_of(lo), entry);
    assert_eq!(show(&env, &result, lo), "MyMap<K, V>.Entry");

    let ctor = result.resolved_call(new_iter).unwrap();
    assert_eq!(ctor.formals, vec![entry.clone(), entry.clone()]);
    assert_eq!(ctor.inferred_type_args, vec![entry]);
    assert_eq!(show(&env, &result, new_iter), "MyMap<K, V>.KeyIter");
    let Type::Class(constructed) = result.type_of(new_iter) else {
        panic!("expected a class type");
    };
    assert_eq!(constructed.outer.as_deref(), Some(&this));
}

#[test]
fn inner_class_members_see_the_receiver_outer_arguments() {
    // MyMap<String, Integer> map; map.new KeyIter(map.lo(), map.hi()).next()
    let mut env = TypeStore::with_minimal_jdk();
    let (this, _, key_iter) = my_map(&mut env);
    let Type::Class(my_map) = this else {
        unreachable!()
    };
    let string = Type::class(env.well_known().string, vec![]);
    let integer = Type::class(env.well_known().integer, vec![]);
    let map_ty = Type::class(my_map.def, vec![string.clone(), integer]);

    let mut b = BodyBuilder::new();
    let map = b.param("map", map_ty);
    let qualifier = b.local_ref(map);
    let receiver = b.local_ref(map);
    let lo = b.call(Some(receiver), "lo", vec![]);
    let receiver = b.local_ref(map);
    let hi = b.call(Some(receiver), "hi", vec![]);
    let new_iter = b.alloc_expr(Expr::New {
        class: key_iter,
        diamond: false,
        outer: Some(qualifier),
        explicit_type_args: Vec::new(),
        args: vec![lo, hi],
        range: Span::new(100, 120),
    });
    let next = b.call(Some(new_iter), "next", vec![]);
    b.eval(next);
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(show(&env, &result, lo), "MyMap<String, Integer>.Entry");
    assert_eq!(show(&env, &result, new_iter), "MyMap<String, Integer>.KeyIter");
    assert_eq!(*result.type_of(next), string);
}

#[test]
fn inherited_generic_member_is_opened_through_the_substituted_supertype() {
    // class Scratch<O> { <B> Map<O, B> wrap(B b); class Inner<T> extends Scratch<List<T>> { ... } }
    let mut env = TypeStore::with_minimal_jdk();
    let scratch = env
        .build_class(
            "com.example.Scratch",
            ClassKind::Class,
            "<O:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .method("wrap", "<B:Ljava/lang/Object;>(TB;)Ljava/util/Map<TO;TB;>;")
        .finish()
        .unwrap();
    let inner = env
        .build_inner_class(
            scratch,
            "Inner",
            ClassKind::Class,
            "<T:Ljava/lang/Object;>Lcom/example/Scratch<Ljava/util/List<TT;>;>;",
        )
        .finish()
        .unwrap();
    let o = env.class(scratch).unwrap().type_params[0];
    let t = env.class(inner).unwrap().type_params[0];
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let this = Type::inner_class(
        Type::class(scratch, vec![Type::TypeVar(o)]),
        inner,
        vec![Type::TypeVar(t)],
    );

    let mut b = BodyBuilder::instance(this);
    let x = b.string("x");
    let wrap = b.call(None, "wrap", vec![x]);
    b.eval(wrap);
    let new_list = b.new_diamond(Type::class(array_list, vec![]), vec![]);
    let list_of_t = Type::class(array_list, vec![Type::TypeVar(t)]);
    let local = b.declare("t", LocalTy::Declared(list_of_t.clone()), Some(new_list));
    let body = b.finish();

    let result = check(&env, &body);
    assert_clean(&result);
    assert_eq!(show(&env, &result, wrap), "Map<List<T>, String>");
    assert_eq!(*result.type_of(new_list), list_of_t);
    assert_eq!(*result.local_type(local), list_of_t);
}
