use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::signature::{SignatureParser, SignatureScope};
use crate::{
    ClassDef, ClassId, ClassKind, ConstructorDef, FieldDef, MethodDef, SignatureError, Type,
    TypeEnv, TypeParamDef, TypeVarId, WellKnownTypes,
};

/// Owned table of classes and type parameters.
///
/// Class ids are stable: removing a class leaves a tombstone and re-inserting a class with the
/// same binary name reuses the old id. Cloning produces an independent store with identical ids.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeStore {
    classes: Vec<Option<ClassDef>>,
    names: HashMap<String, ClassId>,
    type_params: Vec<TypeParamDef>,
    well_known: WellKnownTypes,
}

impl Default for TypeStore {
    /// A store with the core `java.lang` / `java.io` types every algorithm relies on.
    fn default() -> Self {
        let mut classes = Vec::new();
        let mut names = HashMap::new();
        let mut intern = |name: &str| {
            let id = ClassId::from_raw(classes.len() as u32);
            classes.push(None);
            names.insert(name.to_string(), id);
            id
        };
        let well_known = WellKnownTypes {
            object: intern("java.lang.Object"),
            string: intern("java.lang.String"),
            cloneable: intern("java.lang.Cloneable"),
            serializable: intern("java.io.Serializable"),
            number: intern("java.lang.Number"),
            comparable: intern("java.lang.Comparable"),
            char_sequence: intern("java.lang.CharSequence"),
            iterable: intern("java.lang.Iterable"),
            boolean: intern("java.lang.Boolean"),
            byte: intern("java.lang.Byte"),
            short: intern("java.lang.Short"),
            character: intern("java.lang.Character"),
            integer: intern("java.lang.Integer"),
            long: intern("java.lang.Long"),
            float: intern("java.lang.Float"),
            double: intern("java.lang.Double"),
        };
        let mut store = TypeStore {
            classes,
            names,
            type_params: Vec::new(),
            well_known,
        };
        // The core declarations are fixed strings; a parse failure is a bug caught by tests.
        if let Err(err) = crate::minimal_jdk::define_core(&mut store) {
            tracing::error!(%err, "failed to define core java.lang types");
        }
        store
    }
}

impl TypeStore {
    /// A store with the core types plus a small model of `java.util`, `java.util.function`,
    /// `java.util.stream` and reflection types.
    pub fn with_minimal_jdk() -> Self {
        let mut store = TypeStore::default();
        if let Err(err) = crate::minimal_jdk::define_minimal_jdk(&mut store) {
            tracing::error!(%err, "failed to define minimal JDK types");
        }
        store
    }

    /// Returns the id for `name`, allocating an undefined placeholder if needed.
    pub fn intern_class_id(&mut self, name: &str) -> ClassId {
        if let Some(id) = self.names.get(name) {
            return *id;
        }
        let id = ClassId::from_raw(self.classes.len() as u32);
        self.classes.push(None);
        self.names.insert(name.to_string(), id);
        id
    }

    /// Id of a defined class with exactly this binary name.
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        let id = *self.names.get(name)?;
        self.classes[id.idx()].as_ref().map(|_| id)
    }

    pub fn define_class(&mut self, id: ClassId, def: ClassDef) {
        if let Some(slot) = self.classes.get_mut(id.idx()) {
            self.names.insert(def.name.clone(), id);
            *slot = Some(def);
        }
    }

    pub fn add_class(&mut self, def: ClassDef) -> ClassId {
        self.upsert_class(def)
    }

    /// Inserts or replaces a class by binary name, keeping its id.
    pub fn upsert_class(&mut self, def: ClassDef) -> ClassId {
        let id = self.intern_class_id(&def.name);
        self.define_class(id, def);
        id
    }

    /// Removes a class, leaving a tombstone so the id is reused on re-insertion.
    pub fn remove_class(&mut self, name: &str) -> Option<ClassId> {
        let id = *self.names.get(name)?;
        self.classes[id.idx()].take().map(|_| id)
    }

    pub fn class_mut(&mut self, id: ClassId) -> Option<&mut ClassDef> {
        self.classes.get_mut(id.idx())?.as_mut()
    }

    pub fn add_type_param(&mut self, name: impl Into<String>, upper_bounds: Vec<Type>) -> TypeVarId {
        let id = TypeVarId(self.type_params.len() as u32);
        self.type_params.push(TypeParamDef::new(name, upper_bounds));
        id
    }

    pub fn define_type_param(&mut self, id: TypeVarId, def: TypeParamDef) {
        if let Some(slot) = self.type_params.get_mut(id.0 as usize) {
            *slot = def;
        }
    }

    pub fn type_param_count(&self) -> usize {
        self.type_params.len()
    }

    /// Parses a JVM type signature (`Ljava/util/List<TT;>;`) with `scope` in effect.
    pub fn parse_type(&mut self, sig: &str, scope: &SignatureScope) -> Result<Type, SignatureError> {
        SignatureParser::new(self, sig).parse_field_type(scope)
    }

    /// Starts declaring a top-level or static nested class from a class signature
    /// (`<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/lang/Iterable<TT;>;`).
    pub fn build_class(&mut self, name: &str, kind: ClassKind, sig: &str) -> ClassBuilder<'_> {
        ClassBuilder::new(self, name.to_string(), kind, None, SignatureScope::new(), sig)
    }

    /// Starts declaring an inner (non-static member) class of `outer`. The outer class's type
    /// parameters are in scope for every signature of the inner class.
    pub fn build_inner_class(
        &mut self,
        outer: ClassId,
        simple_name: &str,
        kind: ClassKind,
        sig: &str,
    ) -> ClassBuilder<'_> {
        let scope = self.scope_of(outer);
        let name = match self.class(outer) {
            Some(def) => format!("{}${simple_name}", def.name),
            None => simple_name.to_string(),
        };
        ClassBuilder::new(self, name, kind, Some(outer), scope, sig)
    }

    /// Type parameters visible inside `class`, including those of enclosing instances.
    pub fn scope_of(&self, class: ClassId) -> SignatureScope {
        let mut chain = Vec::new();
        let mut current = Some(class);
        while let Some(id) = current {
            let Some(def) = self.class(id) else { break };
            chain.push(id);
            current = def.outer;
        }
        let mut scope = SignatureScope::new();
        for id in chain.into_iter().rev() {
            if let Some(def) = self.class(id) {
                for tp in &def.type_params {
                    if let Some(param) = self.type_param(*tp) {
                        scope.push(param.name.clone(), *tp);
                    }
                }
            }
        }
        scope
    }
}

impl TypeEnv for TypeStore {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.idx())?.as_ref()
    }

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef> {
        self.type_params.get(id.0 as usize)
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        if let Some(id) = self.class_id(name) {
            return Some(id);
        }
        if !name.contains('.') {
            return self.class_id(&format!("java.lang.{name}"));
        }
        None
    }

    fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LastMember {
    Method(usize),
    Constructor(usize),
}

/// Declares one class from signature strings. The first parse error is kept and reported by
/// [`ClassBuilder::finish`].
pub struct ClassBuilder<'s> {
    store: &'s mut TypeStore,
    id: ClassId,
    def: ClassDef,
    scope: SignatureScope,
    last: Option<LastMember>,
    error: Option<SignatureError>,
}

impl<'s> ClassBuilder<'s> {
    fn new(
        store: &'s mut TypeStore,
        name: String,
        kind: ClassKind,
        outer: Option<ClassId>,
        mut scope: SignatureScope,
        sig: &str,
    ) -> Self {
        let id = store.intern_class_id(&name);
        let mut error = None;
        let parsed = SignatureParser::new(store, sig).parse_class(&mut scope);
        let (type_params, super_class, interfaces) = match parsed {
            Ok(parsed) => (parsed.type_params, parsed.super_class, parsed.interfaces),
            Err(err) => {
                error = Some(err);
                (Vec::new(), None, Vec::new())
            }
        };
        let object = store.well_known().object;
        // Interfaces list `Object` as their nominal superclass in signatures.
        let super_class = match kind {
            ClassKind::Interface => None,
            ClassKind::Class if id == object => None,
            ClassKind::Class => super_class.or(Some(Type::class(object, vec![]))),
        };
        let def = ClassDef {
            name,
            kind,
            outer,
            type_params,
            super_class,
            interfaces,
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
        };
        // Define early so members can refer back to the class (and its scope) while building.
        store.define_class(id, def.clone());
        Self {
            store,
            id,
            def,
            scope,
            last: None,
            error,
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    fn push_method(mut self, name: &str, sig: &str, is_static: bool, is_abstract: bool) -> Self {
        match SignatureParser::new(self.store, sig).parse_method(&self.scope) {
            Ok(parsed) => {
                self.def.methods.push(MethodDef {
                    name: name.to_string(),
                    type_params: parsed.type_params,
                    params: parsed.params,
                    return_type: parsed.return_type,
                    is_static,
                    is_varargs: false,
                    is_abstract,
                });
                self.last = Some(LastMember::Method(self.def.methods.len() - 1));
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    pub fn method(self, name: &str, sig: &str) -> Self {
        self.push_method(name, sig, false, false)
    }

    pub fn abstract_method(self, name: &str, sig: &str) -> Self {
        self.push_method(name, sig, false, true)
    }

    pub fn static_method(self, name: &str, sig: &str) -> Self {
        self.push_method(name, sig, true, false)
    }

    /// Declares a constructor from a method signature whose return type is `V`.
    pub fn constructor(mut self, sig: &str) -> Self {
        match SignatureParser::new(self.store, sig).parse_method(&self.scope) {
            Ok(parsed) => {
                self.def.constructors.push(ConstructorDef {
                    type_params: parsed.type_params,
                    params: parsed.params,
                    is_varargs: false,
                    is_accessible: true,
                });
                self.last = Some(LastMember::Constructor(self.def.constructors.len() - 1));
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Marks the most recently declared method or constructor as variable-arity.
    pub fn varargs(mut self) -> Self {
        match self.last {
            Some(LastMember::Method(idx)) => self.def.methods[idx].is_varargs = true,
            Some(LastMember::Constructor(idx)) => self.def.constructors[idx].is_varargs = true,
            None => {}
        }
        self
    }

    fn push_field(mut self, name: &str, sig: &str, is_static: bool) -> Self {
        match SignatureParser::new(self.store, sig).parse_field_type(&self.scope) {
            Ok(ty) => self.def.fields.push(FieldDef {
                name: name.to_string(),
                ty,
                is_static,
                is_final: false,
            }),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    pub fn field(self, name: &str, sig: &str) -> Self {
        self.push_field(name, sig, false)
    }

    pub fn static_field(self, name: &str, sig: &str) -> Self {
        self.push_field(name, sig, true)
    }

    pub fn finish(self) -> Result<ClassId, SignatureError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let id = self.id;
        self.store.define_class(id, self.def);
        Ok(id)
    }
}
