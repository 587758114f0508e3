//! Declarations of the JDK subset known without a classpath.

use crate::{ClassKind, SignatureError, TypeStore};

use ClassKind::{Class, Interface};

const OBJECT: &str = "Ljava/lang/Object;";

/// `java.lang` / `java.io` types referenced by [`crate::WellKnownTypes`] and by core algorithms
/// (array supertypes, boxing, `Iterable` for for-each).
pub(crate) fn define_core(store: &mut TypeStore) -> Result<(), SignatureError> {
    store
        .build_class("java.lang.Object", Class, "")
        .constructor("()V")
        .method("equals", "(Ljava/lang/Object;)Z")
        .method("hashCode", "()I")
        .method("toString", "()Ljava/lang/String;")
        .method("getClass", "()Ljava/lang/Class<*>;")
        .finish()?;
    store.build_class("java.lang.Cloneable", Interface, OBJECT).finish()?;
    store.build_class("java.io.Serializable", Interface, OBJECT).finish()?;
    store
        .build_class(
            "java.lang.Comparable",
            Interface,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .abstract_method("compareTo", "(TT;)I")
        .finish()?;
    store
        .build_class("java.lang.CharSequence", Interface, OBJECT)
        .abstract_method("length", "()I")
        .abstract_method("charAt", "(I)C")
        .finish()?;
    store
        .build_class(
            "java.lang.String",
            Class,
            "Ljava/lang/Object;Ljava/io/Serializable;Ljava/lang/Comparable<Ljava/lang/String;>;Ljava/lang/CharSequence;",
        )
        .constructor("()V")
        .constructor("(Ljava/lang/String;)V")
        .method("length", "()I")
        .method("isEmpty", "()Z")
        .method("charAt", "(I)C")
        .method("substring", "(I)Ljava/lang/String;")
        .method("substring", "(II)Ljava/lang/String;")
        .method("concat", "(Ljava/lang/String;)Ljava/lang/String;")
        .method("contains", "(Ljava/lang/CharSequence;)Z")
        .method("startsWith", "(Ljava/lang/String;)Z")
        .method("toUpperCase", "()Ljava/lang/String;")
        .method("trim", "()Ljava/lang/String;")
        .method("compareTo", "(Ljava/lang/String;)I")
        .static_method("valueOf", "(Ljava/lang/Object;)Ljava/lang/String;")
        .static_method("valueOf", "(I)Ljava/lang/String;")
        .static_method("valueOf", "(J)Ljava/lang/String;")
        .static_method("valueOf", "(D)Ljava/lang/String;")
        .static_method("valueOf", "(Z)Ljava/lang/String;")
        .static_method("valueOf", "(C)Ljava/lang/String;")
        .static_method(
            "join",
            "(Ljava/lang/CharSequence;[Ljava/lang/CharSequence;)Ljava/lang/String;",
        )
        .varargs()
        .static_method(
            "format",
            "(Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/String;",
        )
        .varargs()
        .finish()?;
    store
        .build_class(
            "java.lang.Iterable",
            Interface,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .abstract_method("iterator", "()Ljava/util/Iterator<TT;>;")
        .method("forEach", "(Ljava/util/function/Consumer<-TT;>;)V")
        .finish()?;
    store
        .build_class("java.lang.Number", Class, "Ljava/lang/Object;Ljava/io/Serializable;")
        .abstract_method("intValue", "()I")
        .abstract_method("longValue", "()J")
        .abstract_method("floatValue", "()F")
        .abstract_method("doubleValue", "()D")
        .finish()?;

    for (name, desc, parse) in [
        ("Integer", "I", "parseInt"),
        ("Long", "J", "parseLong"),
        ("Float", "F", "parseFloat"),
        ("Double", "D", "parseDouble"),
        ("Short", "S", "parseShort"),
        ("Byte", "B", "parseByte"),
    ] {
        store
            .build_class(
                &format!("java.lang.{name}"),
                Class,
                &format!("Ljava/lang/Number;Ljava/lang/Comparable<Ljava/lang/{name};>;"),
            )
            .constructor(&format!("({desc})V"))
            .static_method("valueOf", &format!("({desc})Ljava/lang/{name};"))
            .static_method(parse, &format!("(Ljava/lang/String;){desc}"))
            .static_method("toString", &format!("({desc})Ljava/lang/String;"))
            .method("compareTo", &format!("(Ljava/lang/{name};)I"))
            .static_field("MAX_VALUE", desc)
            .static_field("MIN_VALUE", desc)
            .finish()?;
    }
    store
        .build_class(
            "java.lang.Boolean",
            Class,
            "Ljava/lang/Object;Ljava/io/Serializable;Ljava/lang/Comparable<Ljava/lang/Boolean;>;",
        )
        .static_method("valueOf", "(Z)Ljava/lang/Boolean;")
        .static_method("parseBoolean", "(Ljava/lang/String;)Z")
        .method("booleanValue", "()Z")
        .static_field("TRUE", "Ljava/lang/Boolean;")
        .static_field("FALSE", "Ljava/lang/Boolean;")
        .finish()?;
    store
        .build_class(
            "java.lang.Character",
            Class,
            "Ljava/lang/Object;Ljava/io/Serializable;Ljava/lang/Comparable<Ljava/lang/Character;>;",
        )
        .static_method("valueOf", "(C)Ljava/lang/Character;")
        .static_method("isDigit", "(C)Z")
        .method("charValue", "()C")
        .finish()?;

    store
        .build_class("java.lang.reflect.Type", Interface, OBJECT)
        .method("getTypeName", "()Ljava/lang/String;")
        .finish()?;
    store
        .build_class(
            "java.lang.Class",
            Class,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/io/Serializable;Ljava/lang/reflect/Type;",
        )
        .method("getName", "()Ljava/lang/String;")
        .method("getSimpleName", "()Ljava/lang/String;")
        .method("getTypeName", "()Ljava/lang/String;")
        .method("cast", "(Ljava/lang/Object;)TT;")
        .method("isInstance", "(Ljava/lang/Object;)Z")
        .finish()?;
    store
        .build_class(
            "java.lang.Enum",
            Class,
            "<E:Ljava/lang/Enum<TE;>;>Ljava/lang/Object;Ljava/lang/Comparable<TE;>;Ljava/io/Serializable;",
        )
        .method("name", "()Ljava/lang/String;")
        .method("ordinal", "()I")
        .method("compareTo", "(TE;)I")
        .finish()?;
    store.build_class("java.lang.Record", Class, OBJECT).finish()?;
    store
        .build_class("java.lang.Runnable", Interface, OBJECT)
        .abstract_method("run", "()V")
        .finish()?;
    store
        .build_class("java.lang.annotation.Annotation", Interface, OBJECT)
        .abstract_method(
            "annotationType",
            "()Ljava/lang/Class<+Ljava/lang/annotation/Annotation;>;",
        )
        .finish()?;
    store
        .build_class("java.lang.Math", Class, OBJECT)
        .static_method("max", "(II)I")
        .static_method("max", "(JJ)J")
        .static_method("max", "(DD)D")
        .static_method("abs", "(I)I")
        .static_method("abs", "(D)D")
        .finish()?;
    Ok(())
}

pub(crate) fn define_minimal_jdk(store: &mut TypeStore) -> Result<(), SignatureError> {
    define_collections(store)?;
    define_functions(store)?;
    define_streams(store)?;
    Ok(())
}

fn define_collections(store: &mut TypeStore) -> Result<(), SignatureError> {
    const E: &str = "<E:Ljava/lang/Object;>";
    const KV: &str = "<K:Ljava/lang/Object;V:Ljava/lang/Object;>";

    store
        .build_class("java.util.Iterator", Interface, &format!("{E}{OBJECT}"))
        .abstract_method("hasNext", "()Z")
        .abstract_method("next", "()TE;")
        .finish()?;
    store
        .build_class(
            "java.util.Collection",
            Interface,
            &format!("{E}{OBJECT}Ljava/lang/Iterable<TE;>;"),
        )
        .abstract_method("size", "()I")
        .abstract_method("isEmpty", "()Z")
        .abstract_method("contains", "(Ljava/lang/Object;)Z")
        .abstract_method("add", "(TE;)Z")
        .abstract_method("remove", "(Ljava/lang/Object;)Z")
        .abstract_method("addAll", "(Ljava/util/Collection<+TE;>;)Z")
        .abstract_method("iterator", "()Ljava/util/Iterator<TE;>;")
        .abstract_method("toArray", "()[Ljava/lang/Object;")
        .method("stream", "()Ljava/util/stream/Stream<TE;>;")
        .finish()?;
    store
        .build_class(
            "java.util.List",
            Interface,
            &format!("{E}{OBJECT}Ljava/util/Collection<TE;>;"),
        )
        .abstract_method("get", "(I)TE;")
        .abstract_method("add", "(TE;)Z")
        .abstract_method("add", "(ITE;)V")
        .abstract_method("set", "(ITE;)TE;")
        .abstract_method("remove", "(I)TE;")
        .abstract_method("indexOf", "(Ljava/lang/Object;)I")
        .abstract_method("subList", "(II)Ljava/util/List<TE;>;")
        .method("sort", "(Ljava/util/Comparator<-TE;>;)V")
        .static_method("of", "<E:Ljava/lang/Object;>()Ljava/util/List<TE;>;")
        .static_method("of", "<E:Ljava/lang/Object;>(TE;)Ljava/util/List<TE;>;")
        .static_method("of", "<E:Ljava/lang/Object;>(TE;TE;)Ljava/util/List<TE;>;")
        .static_method("of", "<E:Ljava/lang/Object;>([TE;)Ljava/util/List<TE;>;")
        .varargs()
        .static_method(
            "copyOf",
            "<E:Ljava/lang/Object;>(Ljava/util/Collection<+TE;>;)Ljava/util/List<TE;>;",
        )
        .finish()?;
    store
        .build_class(
            "java.util.ArrayList",
            Class,
            &format!(
                "{E}{OBJECT}Ljava/util/List<TE;>;Ljava/lang/Cloneable;Ljava/io/Serializable;"
            ),
        )
        .constructor("()V")
        .constructor("(I)V")
        .constructor("(Ljava/util/Collection<+TE;>;)V")
        .method("get", "(I)TE;")
        .method("add", "(TE;)Z")
        .method("size", "()I")
        .finish()?;
    store
        .build_class(
            "java.util.Set",
            Interface,
            &format!("{E}{OBJECT}Ljava/util/Collection<TE;>;"),
        )
        .static_method("of", "<E:Ljava/lang/Object;>([TE;)Ljava/util/Set<TE;>;")
        .varargs()
        .finish()?;
    store
        .build_class(
            "java.util.HashSet",
            Class,
            &format!("{E}{OBJECT}Ljava/util/Set<TE;>;Ljava/lang/Cloneable;Ljava/io/Serializable;"),
        )
        .constructor("()V")
        .constructor("(Ljava/util/Collection<+TE;>;)V")
        .finish()?;
    store
        .build_class("java.util.Map", Interface, &format!("{KV}{OBJECT}"))
        .abstract_method("get", "(Ljava/lang/Object;)TV;")
        .abstract_method("put", "(TK;TV;)TV;")
        .abstract_method("containsKey", "(Ljava/lang/Object;)Z")
        .abstract_method("size", "()I")
        .abstract_method("keySet", "()Ljava/util/Set<TK;>;")
        .abstract_method("values", "()Ljava/util/Collection<TV;>;")
        .abstract_method("entrySet", "()Ljava/util/Set<Ljava/util/Map$Entry<TK;TV;>;>;")
        .method("getOrDefault", "(Ljava/lang/Object;TV;)TV;")
        .static_method(
            "of",
            "<K:Ljava/lang/Object;V:Ljava/lang/Object;>()Ljava/util/Map<TK;TV;>;",
        )
        .static_method(
            "of",
            "<K:Ljava/lang/Object;V:Ljava/lang/Object;>(TK;TV;)Ljava/util/Map<TK;TV;>;",
        )
        .finish()?;
    store
        .build_class("java.util.Map$Entry", Interface, &format!("{KV}{OBJECT}"))
        .abstract_method("getKey", "()TK;")
        .abstract_method("getValue", "()TV;")
        .abstract_method("setValue", "(TV;)TV;")
        .finish()?;
    store
        .build_class(
            "java.util.HashMap",
            Class,
            &format!(
                "{KV}{OBJECT}Ljava/util/Map<TK;TV;>;Ljava/lang/Cloneable;Ljava/io/Serializable;"
            ),
        )
        .constructor("()V")
        .constructor("(I)V")
        .constructor("(Ljava/util/Map<+TK;+TV;>;)V")
        .method("get", "(Ljava/lang/Object;)TV;")
        .method("put", "(TK;TV;)TV;")
        .method("entrySet", "()Ljava/util/Set<Ljava/util/Map$Entry<TK;TV;>;>;")
        .finish()?;
    store
        .build_class(
            "java.util.Comparator",
            Interface,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .abstract_method("compare", "(TT;TT;)I")
        .method("reversed", "()Ljava/util/Comparator<TT;>;")
        .static_method(
            "comparing",
            "<T:Ljava/lang/Object;U::Ljava/lang/Comparable<-TU;>;>(Ljava/util/function/Function<-TT;+TU;>;)Ljava/util/Comparator<TT;>;",
        )
        .static_method(
            "naturalOrder",
            "<T::Ljava/lang/Comparable<-TT;>;>()Ljava/util/Comparator<TT;>;",
        )
        .finish()?;
    store
        .build_class(
            "java.util.Optional",
            Class,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .static_method("of", "<T:Ljava/lang/Object;>(TT;)Ljava/util/Optional<TT;>;")
        .static_method("ofNullable", "<T:Ljava/lang/Object;>(TT;)Ljava/util/Optional<TT;>;")
        .static_method("empty", "<T:Ljava/lang/Object;>()Ljava/util/Optional<TT;>;")
        .method(
            "map",
            "<U:Ljava/lang/Object;>(Ljava/util/function/Function<-TT;+TU;>;)Ljava/util/Optional<TU;>;",
        )
        .method("orElse", "(TT;)TT;")
        .method("get", "()TT;")
        .method("isPresent", "()Z")
        .finish()?;
    store
        .build_class("java.util.Arrays", Class, OBJECT)
        .static_method(
            "asList",
            "<T:Ljava/lang/Object;>([TT;)Ljava/util/List<TT;>;",
        )
        .varargs()
        .static_method(
            "stream",
            "<T:Ljava/lang/Object;>([TT;)Ljava/util/stream/Stream<TT;>;",
        )
        .static_method("toString", "([Ljava/lang/Object;)Ljava/lang/String;")
        .static_method("toString", "([I)Ljava/lang/String;")
        .finish()?;
    store
        .build_class("java.util.Collections", Class, OBJECT)
        .static_method("emptyList", "<T:Ljava/lang/Object;>()Ljava/util/List<TT;>;")
        .static_method(
            "singletonList",
            "<T:Ljava/lang/Object;>(TT;)Ljava/util/List<TT;>;",
        )
        .static_method(
            "unmodifiableList",
            "<T:Ljava/lang/Object;>(Ljava/util/List<+TT;>;)Ljava/util/List<TT;>;",
        )
        .static_method(
            "sort",
            "<T::Ljava/lang/Comparable<-TT;>;>(Ljava/util/List<TT;>;)V",
        )
        .static_method(
            "max",
            "<T:Ljava/lang/Object;:Ljava/lang/Comparable<-TT;>;>(Ljava/util/Collection<+TT;>;)TT;",
        )
        .finish()?;
    Ok(())
}

fn define_functions(store: &mut TypeStore) -> Result<(), SignatureError> {
    const T: &str = "<T:Ljava/lang/Object;>Ljava/lang/Object;";

    store
        .build_class(
            "java.util.function.Function",
            Interface,
            "<T:Ljava/lang/Object;R:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .abstract_method("apply", "(TT;)TR;")
        .method(
            "andThen",
            "<V:Ljava/lang/Object;>(Ljava/util/function/Function<-TR;+TV;>;)Ljava/util/function/Function<TT;TV;>;",
        )
        .static_method(
            "identity",
            "<T:Ljava/lang/Object;>()Ljava/util/function/Function<TT;TT;>;",
        )
        .finish()?;
    store
        .build_class("java.util.function.Consumer", Interface, T)
        .abstract_method("accept", "(TT;)V")
        .finish()?;
    store
        .build_class("java.util.function.Supplier", Interface, T)
        .abstract_method("get", "()TT;")
        .finish()?;
    store
        .build_class("java.util.function.Predicate", Interface, T)
        .abstract_method("test", "(TT;)Z")
        .method("negate", "()Ljava/util/function/Predicate<TT;>;")
        .finish()?;
    store
        .build_class(
            "java.util.function.BiFunction",
            Interface,
            "<T:Ljava/lang/Object;U:Ljava/lang/Object;R:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .abstract_method("apply", "(TT;TU;)TR;")
        .finish()?;
    store
        .build_class(
            "java.util.function.UnaryOperator",
            Interface,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/function/Function<TT;TT;>;",
        )
        .static_method(
            "identity",
            "<T:Ljava/lang/Object;>()Ljava/util/function/UnaryOperator<TT;>;",
        )
        .finish()?;
    store
        .build_class(
            "java.util.function.BinaryOperator",
            Interface,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/function/BiFunction<TT;TT;TT;>;",
        )
        .finish()?;
    Ok(())
}

fn define_streams(store: &mut TypeStore) -> Result<(), SignatureError> {
    store
        .build_class(
            "java.util.stream.Stream",
            Interface,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .static_method("of", "<T:Ljava/lang/Object;>(TT;)Ljava/util/stream/Stream<TT;>;")
        .static_method("of", "<T:Ljava/lang/Object;>([TT;)Ljava/util/stream/Stream<TT;>;")
        .varargs()
        .static_method("empty", "<T:Ljava/lang/Object;>()Ljava/util/stream/Stream<TT;>;")
        .abstract_method(
            "map",
            "<R:Ljava/lang/Object;>(Ljava/util/function/Function<-TT;+TR;>;)Ljava/util/stream/Stream<TR;>;",
        )
        .abstract_method(
            "flatMap",
            "<R:Ljava/lang/Object;>(Ljava/util/function/Function<-TT;+Ljava/util/stream/Stream<+TR;>;>;)Ljava/util/stream/Stream<TR;>;",
        )
        .abstract_method(
            "filter",
            "(Ljava/util/function/Predicate<-TT;>;)Ljava/util/stream/Stream<TT;>;",
        )
        .abstract_method(
            "collect",
            "<R:Ljava/lang/Object;A:Ljava/lang/Object;>(Ljava/util/stream/Collector<-TT;TA;TR;>;)TR;",
        )
        .abstract_method("forEach", "(Ljava/util/function/Consumer<-TT;>;)V")
        .abstract_method("reduce", "(TT;Ljava/util/function/BinaryOperator<TT;>;)TT;")
        .abstract_method("count", "()J")
        .abstract_method("sorted", "()Ljava/util/stream/Stream<TT;>;")
        .abstract_method(
            "sorted",
            "(Ljava/util/Comparator<-TT;>;)Ljava/util/stream/Stream<TT;>;",
        )
        .abstract_method("findFirst", "()Ljava/util/Optional<TT;>;")
        .method("toList", "()Ljava/util/List<TT;>;")
        .finish()?;
    store
        .build_class(
            "java.util.stream.Collector",
            Interface,
            "<T:Ljava/lang/Object;A:Ljava/lang/Object;R:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .finish()?;
    store
        .build_class("java.util.stream.Collectors", Class, OBJECT)
        .static_method(
            "toList",
            "<T:Ljava/lang/Object;>()Ljava/util/stream/Collector<TT;*Ljava/util/List<TT;>;>;",
        )
        .static_method(
            "toSet",
            "<T:Ljava/lang/Object;>()Ljava/util/stream/Collector<TT;*Ljava/util/Set<TT;>;>;",
        )
        .static_method(
            "joining",
            "()Ljava/util/stream/Collector<Ljava/lang/CharSequence;*Ljava/lang/String;>;",
        )
        .static_method(
            "joining",
            "(Ljava/lang/CharSequence;)Ljava/util/stream/Collector<Ljava/lang/CharSequence;*Ljava/lang/String;>;",
        )
        .static_method(
            "toMap",
            "<T:Ljava/lang/Object;K:Ljava/lang/Object;U:Ljava/lang/Object;>(Ljava/util/function/Function<-TT;+TK;>;Ljava/util/function/Function<-TT;+TU;>;)Ljava/util/stream/Collector<TT;*Ljava/util/Map<TK;TU;>;>;",
        )
        .static_method(
            "groupingBy",
            "<T:Ljava/lang/Object;K:Ljava/lang/Object;>(Ljava/util/function/Function<-TT;+TK;>;)Ljava/util/stream/Collector<TT;*Ljava/util/Map<TK;Ljava/util/List<TT;>;>;>;",
        )
        .static_method(
            "counting",
            "<T:Ljava/lang/Object;>()Ljava/util/stream/Collector<TT;*Ljava/lang/Long;>;",
        )
        .finish()?;
    Ok(())
}
