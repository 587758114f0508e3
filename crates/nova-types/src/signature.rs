//! JVM generic signature parsing (JVMS 4.7.9.1) into [`Type`]s.
//!
//! Signatures are the compact declaration language used by [`crate::TypeStore`] builders:
//! `<T:Ljava/lang/Object;>(Ljava/util/List<+TT;>;)TT;` declares `<T> T m(List<? extends T>)`.
//! Referenced classes are interned on the fly, so declarations may refer to classes that are
//! defined later.

use thiserror::Error;

use crate::{PrimitiveType, Type, TypeEnv, TypeParamDef, TypeStore, TypeVarId, WildcardBound};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("unexpected end of signature `{0}`")]
    UnexpectedEnd(String),
    #[error("unexpected `{found}` at offset {offset} in signature `{signature}`")]
    Unexpected {
        signature: String,
        offset: usize,
        found: char,
    },
    #[error("unknown type variable `{name}` in signature `{signature}`")]
    UnknownTypeVar { signature: String, name: String },
    #[error("trailing input in signature `{0}`")]
    Trailing(String),
}

/// Type variables visible while parsing: innermost declarations shadow outer ones.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureScope {
    vars: Vec<(String, TypeVarId)>,
}

impl SignatureScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, id: TypeVarId) {
        self.vars.push((name.into(), id));
    }

    pub fn with(mut self, name: impl Into<String>, id: TypeVarId) -> Self {
        self.push(name, id);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<TypeVarId> {
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ParsedMethod {
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub return_type: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ParsedClass {
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<Type>,
    pub interfaces: Vec<Type>,
}

pub(crate) struct SignatureParser<'a, 's> {
    store: &'s mut TypeStore,
    sig: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a, 's> SignatureParser<'a, 's> {
    pub(crate) fn new(store: &'s mut TypeStore, sig: &'a str) -> Self {
        Self {
            store,
            sig,
            bytes: sig.as_bytes(),
            pos: 0,
        }
    }

    pub(crate) fn parse_field_type(mut self, scope: &SignatureScope) -> Result<Type, SignatureError> {
        let ty = self.type_signature(scope)?;
        self.finish()?;
        Ok(ty)
    }

    /// Parses `<...>(...)R`, extending `scope` with the method's type parameters.
    pub(crate) fn parse_method(
        mut self,
        scope: &SignatureScope,
    ) -> Result<ParsedMethod, SignatureError> {
        let mut scope = scope.clone();
        let type_params = self.type_params(&mut scope)?;
        self.expect(b'(')?;
        let mut params = Vec::new();
        while self.peek()? != b')' {
            params.push(self.type_signature(&scope)?);
        }
        self.expect(b')')?;
        let return_type = if self.peek()? == b'V' {
            self.pos += 1;
            Type::Void
        } else {
            self.type_signature(&scope)?
        };
        // Throws clauses carry no typing information here.
        while self.pos < self.bytes.len() && self.bytes[self.pos] == b'^' {
            self.pos += 1;
            self.type_signature(&scope)?;
        }
        self.finish()?;
        Ok(ParsedMethod {
            type_params,
            params,
            return_type,
        })
    }

    /// Parses `<...>Super Iface*`. The class's own type parameters are pushed onto `scope`.
    pub(crate) fn parse_class(
        mut self,
        scope: &mut SignatureScope,
    ) -> Result<ParsedClass, SignatureError> {
        let type_params = self.type_params(scope)?;
        let super_class = if self.pos < self.bytes.len() {
            Some(self.type_signature(scope)?)
        } else {
            None
        };
        let mut interfaces = Vec::new();
        while self.pos < self.bytes.len() {
            interfaces.push(self.type_signature(scope)?);
        }
        Ok(ParsedClass {
            type_params,
            super_class,
            interfaces,
        })
    }

    fn finish(&self) -> Result<(), SignatureError> {
        if self.pos == self.bytes.len() {
            Ok(())
        } else {
            Err(SignatureError::Trailing(self.sig.to_string()))
        }
    }

    fn peek(&self) -> Result<u8, SignatureError> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| SignatureError::UnexpectedEnd(self.sig.to_string()))
    }

    fn bump(&mut self) -> Result<u8, SignatureError> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, expected: u8) -> Result<(), SignatureError> {
        let offset = self.pos;
        let found = self.bump()?;
        if found == expected {
            Ok(())
        } else {
            Err(self.unexpected(offset, found))
        }
    }

    fn unexpected(&self, offset: usize, found: u8) -> SignatureError {
        SignatureError::Unexpected {
            signature: self.sig.to_string(),
            offset,
            found: found as char,
        }
    }

    fn identifier(&mut self, terminators: &[u8]) -> Result<&'a str, SignatureError> {
        let start = self.pos;
        while !terminators.contains(&self.peek()?) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.unexpected(self.pos, self.bytes[self.pos]));
        }
        let sig: &'a str = self.sig;
        Ok(&sig[start..self.pos])
    }

    /// Allocates every parameter before parsing bounds, so bounds may mention any parameter of
    /// the same declaration (`<E:Ljava/lang/Enum<TE;>;>`).
    fn type_params(&mut self, scope: &mut SignatureScope) -> Result<Vec<TypeVarId>, SignatureError> {
        if self.pos >= self.bytes.len() || self.bytes[self.pos] != b'<' {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut cursor = self.pos + 1;
        while cursor < self.bytes.len() && self.bytes[cursor] != b'>' {
            let start = cursor;
            while cursor < self.bytes.len() && self.bytes[cursor] != b':' {
                cursor += 1;
            }
            names.push(self.sig[start..cursor].to_string());
            cursor = skip_bounds(self.bytes, cursor);
        }

        let ids: Vec<TypeVarId> = names
            .iter()
            .map(|name| self.store.add_type_param(name.clone(), Vec::new()))
            .collect();
        for (name, id) in names.iter().zip(&ids) {
            scope.push(name.clone(), *id);
        }

        self.expect(b'<')?;
        for (name, id) in names.iter().zip(&ids) {
            self.identifier(b":")?;
            let mut bounds = Vec::new();
            while self.peek()? == b':' {
                self.pos += 1;
                // The class bound may be empty when only interface bounds follow.
                if matches!(self.peek()?, b'L' | b'T' | b'[') {
                    bounds.push(self.type_signature(scope)?);
                }
            }
            if bounds.is_empty() {
                bounds.push(Type::class(self.store.well_known().object, vec![]));
            }
            self.store
                .define_type_param(*id, TypeParamDef::new(name.clone(), bounds));
        }
        self.expect(b'>')?;
        Ok(ids)
    }

    fn type_signature(&mut self, scope: &SignatureScope) -> Result<Type, SignatureError> {
        let offset = self.pos;
        let b = self.bump()?;
        let prim = match b {
            b'Z' => Some(PrimitiveType::Boolean),
            b'B' => Some(PrimitiveType::Byte),
            b'S' => Some(PrimitiveType::Short),
            b'C' => Some(PrimitiveType::Char),
            b'I' => Some(PrimitiveType::Int),
            b'J' => Some(PrimitiveType::Long),
            b'F' => Some(PrimitiveType::Float),
            b'D' => Some(PrimitiveType::Double),
            _ => None,
        };
        if let Some(prim) = prim {
            return Ok(Type::Primitive(prim));
        }
        match b {
            b'[' => Ok(Type::array(self.type_signature(scope)?)),
            b'T' => {
                let name = self.identifier(b";")?;
                self.expect(b';')?;
                scope
                    .lookup(name)
                    .map(Type::TypeVar)
                    .ok_or_else(|| SignatureError::UnknownTypeVar {
                        signature: self.sig.to_string(),
                        name: name.to_string(),
                    })
            }
            b'L' => self.class_type(scope),
            other => Err(self.unexpected(offset, other)),
        }
    }

    fn class_type(&mut self, scope: &SignatureScope) -> Result<Type, SignatureError> {
        let path = self.identifier(b"<;.")?;
        let mut binary_name = path.replace('/', ".");
        let id = self.store.intern_class_id(&binary_name);
        let args = self.type_args(scope)?;
        let mut ty = Type::class(id, args);

        while self.peek()? == b'.' {
            self.pos += 1;
            let inner = self.identifier(b"<;.")?;
            binary_name = format!("{binary_name}${inner}");
            let id = self.store.intern_class_id(&binary_name);
            let args = self.type_args(scope)?;
            ty = Type::inner_class(ty, id, args);
        }
        self.expect(b';')?;
        Ok(ty)
    }

    fn type_args(&mut self, scope: &SignatureScope) -> Result<Vec<Type>, SignatureError> {
        if self.peek()? != b'<' {
            return Ok(Vec::new());
        }
        self.pos += 1;
        let mut args = Vec::new();
        while self.peek()? != b'>' {
            let arg = match self.peek()? {
                b'*' => {
                    self.pos += 1;
                    Type::Wildcard(WildcardBound::Unbounded)
                }
                b'+' => {
                    self.pos += 1;
                    Type::Wildcard(WildcardBound::Extends(Box::new(self.type_signature(scope)?)))
                }
                b'-' => {
                    self.pos += 1;
                    Type::Wildcard(WildcardBound::Super(Box::new(self.type_signature(scope)?)))
                }
                _ => self.type_signature(scope)?,
            };
            args.push(arg);
        }
        self.pos += 1;
        Ok(args)
    }
}

/// Skips `:Bound:Bound` after a type-parameter name, returning the offset of the next name or `>`.
fn skip_bounds(bytes: &[u8], mut cursor: usize) -> usize {
    while cursor < bytes.len() && bytes[cursor] == b':' {
        cursor += 1;
        if cursor < bytes.len() && matches!(bytes[cursor], b'L' | b'T' | b'[') {
            cursor = skip_field_type(bytes, cursor);
        }
    }
    cursor
}

fn skip_field_type(bytes: &[u8], mut cursor: usize) -> usize {
    while cursor < bytes.len() && bytes[cursor] == b'[' {
        cursor += 1;
    }
    match bytes.get(cursor) {
        Some(b'L') => {
            let mut depth = 0usize;
            while cursor < bytes.len() {
                match bytes[cursor] {
                    b'<' => depth += 1,
                    b'>' => depth = depth.saturating_sub(1),
                    b';' if depth == 0 => return cursor + 1,
                    _ => {}
                }
                cursor += 1;
            }
            cursor
        }
        Some(b'T') => {
            while cursor < bytes.len() && bytes[cursor] != b';' {
                cursor += 1;
            }
            cursor + 1
        }
        Some(_) => cursor + 1,
        None => cursor,
    }
}
