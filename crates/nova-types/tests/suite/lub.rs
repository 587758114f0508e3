use nova_types::{format_type, glb, lub, lub_all, make_intersection, Type, TypeEnv, TypeStore};

use pretty_assertions::assert_eq;

#[test]
fn lub_of_collections_is_their_common_generic_supertype() {
    let env = TypeStore::with_minimal_jdk();
    let array_list = env.class_id("java.util.ArrayList").unwrap();
    let list = env.class_id("java.util.List").unwrap();
    let string = Type::class(env.well_known().string, vec![]);

    let a = Type::class(array_list, vec![string.clone()]);
    let b = Type::class(list, vec![string.clone()]);
    assert_eq!(lub(&env, &a, &b), b);
}

#[test]
fn lub_of_boxed_numbers_renders_like_javac() {
    let env = TypeStore::with_minimal_jdk();
    let integer = Type::class(env.well_known().integer, vec![]);
    let long = Type::class(env.well_known().long, vec![]);

    let joined = lub(&env, &integer, &long);
    assert_eq!(
        format_type(&env, &joined),
        "Number & Comparable<? extends Number & Comparable<?>>"
    );
}

#[test]
fn lub_all_skips_null_and_handles_arrays() {
    let env = TypeStore::with_minimal_jdk();
    let string = Type::class(env.well_known().string, vec![]);
    let object = Type::class(env.well_known().object, vec![]);
    let serializable = Type::class(env.well_known().serializable, vec![]);

    assert_eq!(lub_all(&env, &[Type::Null, string.clone()]), string);
    assert_eq!(lub_all(&env, &[Type::Null]), Type::Null);
    assert_eq!(lub_all(&env, &[]), Type::Unknown);

    let strings = Type::array(string.clone());
    let objects = Type::array(object.clone());
    assert_eq!(lub(&env, &strings, &objects), objects);
    assert_eq!(lub(&env, &strings, &string), serializable);
}

#[test]
fn intersections_are_normalized() {
    let env = TypeStore::with_minimal_jdk();
    let cloneable = Type::class(env.well_known().cloneable, vec![]);
    let serializable = Type::class(env.well_known().serializable, vec![]);
    let number = Type::class(env.well_known().number, vec![]);
    let integer = Type::class(env.well_known().integer, vec![]);
    let object = Type::class(env.well_known().object, vec![]);

    let nested = Type::Intersection(vec![cloneable.clone(), serializable.clone()]);
    assert_eq!(
        make_intersection(&env, vec![nested, number.clone(), serializable.clone()]),
        Type::Intersection(vec![number.clone(), cloneable.clone()])
    );
    assert_eq!(make_intersection(&env, vec![]), object);
    assert_eq!(make_intersection(&env, vec![Type::Unknown, integer.clone()]), integer);

    assert_eq!(glb(&env, &integer, &number), integer);
    assert_eq!(
        glb(&env, &serializable, &cloneable),
        Type::Intersection(vec![serializable, cloneable])
    );
}
