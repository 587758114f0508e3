use nova_typeck::hir::{Body, BodyBuilder, LocalTy};
use nova_typeck::{check_bodies, check_body, TypeckConfig};
use nova_types::TypeStore;

use pretty_assertions::assert_eq;

use super::support::{class, string};

fn bodies(env: &TypeStore) -> Vec<Body> {
    (0..16)
        .map(|idx| {
            let mut b = BodyBuilder::new();
            let text = b.string("a");
            let of = b.static_call(class(env, "java.util.stream.Stream"), "of", vec![text]);
            let it = b.lambda_param("it");
            let it_ref = b.local_ref(it);
            let length = b.call(Some(it_ref), "length", vec![]);
            let lambda = b.lambda(vec![it], length);
            let map = b.call(Some(of), "map", vec![lambda]);
            let to_list =
                b.static_call(class(env, "java.util.stream.Collectors"), "toList", vec![]);
            let collect = b.call(Some(map), "collect", vec![to_list]);
            b.declare("list", LocalTy::Var, Some(collect));
            if idx % 2 == 1 {
                // Every other body also carries an error.
                let n = b.int(1);
                b.declare("s", LocalTy::Declared(string(env)), Some(n));
            }
            b.finish()
        })
        .collect()
}

#[test]
fn parallel_checking_matches_one_body_at_a_time() {
    let env = TypeStore::with_minimal_jdk();
    let config = TypeckConfig::default();
    let bodies = bodies(&env);

    let parallel = check_bodies(&env, &bodies, &config);
    let sequential: Vec<_> = bodies
        .iter()
        .map(|body| check_body(&env, body, &config))
        .collect();

    assert_eq!(parallel.len(), bodies.len());
    assert_eq!(parallel, sequential);
    assert_eq!(
        parallel.iter().filter(|r| r.errors().count() > 0).count(),
        bodies.len() / 2
    );
}
