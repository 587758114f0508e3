//! Java-like rendering of types for diagnostics and hovers.

use std::fmt::Write as _;

use crate::{Type, TypeEnv, WildcardBound};

/// Renders `ty` the way javac prints it in messages: simple class names (`Map.Entry<K, V>`),
/// `? extends T`, `CAP#1` and `A & B`.
pub fn format_type(env: &dyn TypeEnv, ty: &Type) -> String {
    let mut out = String::new();
    render(env, ty, false, &mut out);
    out
}

/// Like [`format_type`] but with fully qualified class names (`java.util.Map.Entry<K, V>`).
pub(crate) fn format_type_qualified(env: &dyn TypeEnv, ty: &Type) -> String {
    let mut out = String::new();
    render(env, ty, true, &mut out);
    out
}

/// `name(String, int...)`, using the parameter types as given (declared or instantiated).
pub fn format_method_signature(
    env: &dyn TypeEnv,
    name: &str,
    params: &[Type],
    is_varargs: bool,
) -> String {
    let mut out = String::from(name);
    out.push('(');
    for (idx, param) in params.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        match param {
            Type::Array(elem) if is_varargs && idx + 1 == params.len() => {
                render(env, elem, false, &mut out);
                out.push_str("...");
            }
            _ => render(env, param, false, &mut out),
        }
    }
    out.push(')');
    out
}

fn class_name(env: &dyn TypeEnv, def: crate::ClassId, qualified: bool) -> String {
    let Some(class) = env.class(def) else {
        return format!("<class {}>", def.to_raw());
    };
    let name = if qualified {
        class.name.as_str()
    } else {
        class.name.rsplit('.').next().unwrap_or(&class.name)
    };
    name.replace('$', ".")
}

fn render(env: &dyn TypeEnv, ty: &Type, qualified: bool, out: &mut String) {
    match ty {
        Type::Void => out.push_str("void"),
        Type::Primitive(p) => out.push_str(p.keyword()),
        Type::Class(ct) => {
            match ct.outer.as_deref() {
                // Only a parameterized enclosing type adds information.
                Some(outer @ Type::Class(oc)) if !oc.args.is_empty() => {
                    render(env, outer, qualified, out);
                    out.push('.');
                    let simple = env
                        .class(ct.def)
                        .map(|d| d.simple_name().to_string())
                        .unwrap_or_else(|| class_name(env, ct.def, qualified));
                    out.push_str(&simple);
                }
                _ => out.push_str(&class_name(env, ct.def, qualified)),
            }
            if !ct.args.is_empty() {
                out.push('<');
                for (idx, arg) in ct.args.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    render(env, arg, qualified, out);
                }
                out.push('>');
            }
        }
        Type::Array(elem) => {
            render(env, elem, qualified, out);
            out.push_str("[]");
        }
        Type::TypeVar(id) => match env.type_param(*id) {
            Some(tp) => out.push_str(&tp.name),
            None => {
                let _ = write!(out, "<tvar {}>", id.0);
            }
        },
        Type::Wildcard(WildcardBound::Unbounded) => out.push('?'),
        Type::Wildcard(WildcardBound::Extends(bound)) => {
            out.push_str("? extends ");
            render(env, bound, qualified, out);
        }
        Type::Wildcard(WildcardBound::Super(bound)) => {
            out.push_str("? super ");
            render(env, bound, qualified, out);
        }
        Type::Intersection(parts) => {
            for (idx, part) in parts.iter().enumerate() {
                if idx > 0 {
                    out.push_str(" & ");
                }
                render(env, part, qualified, out);
            }
        }
        Type::Infer(var) => {
            let _ = write!(out, "α{}", var.idx());
        }
        Type::Null => out.push_str("null"),
        Type::Named(name) => out.push_str(name),
        Type::Unknown => out.push_str("<unknown>"),
        Type::Error => out.push_str("<error>"),
    }
}
