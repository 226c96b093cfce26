//! Shared rendering helpers: visibility, generic lists, result types,
//! invocations and the per-parameter statements every variant uses.

use crate::error::CodegenError;
use stagecraft_core::{
    Access, Invocation, MethodSignature, Mutation, NullCheck, StepInput, TypeRef, TypeVar,
};

/// Everything a renderer needs to know about the goal being emitted.
pub(crate) struct Ctx<'a> {
    pub goal: &'a str,
    /// Path of the runtime support crate (`stagecraft_runtime`).
    pub rt: &'a str,
}

impl Ctx<'_> {
    pub fn error(&self, message: impl Into<String>) -> CodegenError {
        CodegenError::emit(self.goal, message)
    }
}

/// Opening brace of an entry point body, preceded by a `where` clause
/// when the signature carries `Default` or `Clone` bounds.
pub(crate) fn body_open(sig: &MethodSignature) -> String {
    let bounds: Vec<String> = sig
        .default_bounds
        .iter()
        .map(|b| format!("    {}: Default,", b))
        .chain(sig.clone_bounds.iter().map(|b| format!("    {}: Clone,", b)))
        .collect();
    if bounds.is_empty() {
        return " {".to_string();
    }
    format!("\nwhere\n{}\n{{", bounds.join("\n"))
}

pub(crate) fn vis(access: Access) -> &'static str {
    match access {
        Access::Public => "pub ",
        Access::PackagePrivate => "pub(crate) ",
        Access::Private => "",
    }
}

/// `<K, V>` or nothing.
pub(crate) fn generics(vars: &[TypeVar]) -> String {
    if vars.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = vars.iter().map(TypeVar::name).collect();
    format!("<{}>", names.join(", "))
}

/// `T` or `Result<T, E>`. One error type per site at most.
pub(crate) fn fallible(ctx: &Ctx, ty: &str, thrown: &[TypeRef], site: &str) -> Result<String, CodegenError> {
    match thrown {
        [] => Ok(ty.to_string()),
        [error] => Ok(format!("Result<{}, {}>", ty, error)),
        _ => Err(ctx.error(format!(
            "{} declares {} error types; a Rust signature can carry only one",
            site,
            thrown.len()
        ))),
    }
}

/// Wrap a value expression in `Ok(..)` when the site is fallible.
pub(crate) fn ok_if(thrown: &[TypeRef], expr: &str) -> String {
    if thrown.is_empty() {
        expr.to_string()
    } else {
        format!("Ok({})", expr)
    }
}

/// `?` after an accessor call that can fail.
pub(crate) fn try_if(thrown: &[TypeRef]) -> &'static str {
    if thrown.is_empty() {
        ""
    } else {
        "?"
    }
}

/// Type of a step or update method argument.
pub(crate) fn input_type(input: &StepInput) -> String {
    match input {
        StepInput::Value { ty } => ty.to_string(),
        StepInput::Elements { element_type } => {
            format!("impl IntoIterator<Item = {}>", element_type)
        }
    }
}

/// Type path usable in expression position (`Person` for `Person<T>`).
pub(crate) fn type_path<'t>(ctx: &Ctx, ty: &'t TypeRef) -> Result<&'t str, CodegenError> {
    ty.path()
        .ok_or_else(|| ctx.error(format!("'{}' cannot be invoked as a type path", ty)))
}

/// Call the target operation. `receiver` is the expression holding the
/// receiver of an instance goal.
pub(crate) fn invoke(
    ctx: &Ctx,
    invocation: &Invocation,
    receiver: &str,
    args: &[String],
) -> Result<String, CodegenError> {
    let args = args.join(", ");
    match invocation {
        Invocation::Constructor { ty, name } | Invocation::StaticMethod { ty, name } => {
            Ok(format!("{}::{}({})", type_path(ctx, ty)?, name, args))
        }
        Invocation::InstanceMethod { name, .. } => Ok(format!("{}.{}({})", receiver, name, args)),
        Invocation::Bean { .. } => Ok("Default::default()".to_string()),
    }
}

/// Presence check for `name`, if the resolved policy asks for one on the
/// argument itself. Element checks happen inside the collection call.
pub(crate) fn null_check_line(ctx: &Ctx, check: NullCheck, name: &str) -> Option<String> {
    match check {
        NullCheck::Argument => Some(format!("{}::check_present(\"{}\", &{});", ctx.rt, name, name)),
        NullCheck::None | NullCheck::Elements => None,
    }
}

/// The statement that applies a bean mutation to `target` (an expression
/// of the bean type, possibly through a lease).
pub(crate) fn mutation_line(
    ctx: &Ctx,
    target: &str,
    mutation: &Mutation,
    check: NullCheck,
    parameter: &str,
    thrown: &[TypeRef],
) -> Option<String> {
    let q = try_if(thrown);
    match mutation {
        Mutation::Argument => None,
        Mutation::Setter { setter } => Some(format!("{}.{}({}){};", target, setter, parameter, q)),
        Mutation::FieldAssign { field } => Some(format!("{}.{} = {};", target, field, parameter)),
        Mutation::ReplaceContents { getter } => Some(if check == NullCheck::Elements {
            format!(
                "{}::replace_contents_present({}.{}(){}, {}, \"{}\");",
                ctx.rt, target, getter, q, parameter, parameter
            )
        } else {
            format!(
                "{}::replace_contents({}.{}(){}, {});",
                ctx.rt, target, getter, q, parameter
            )
        }),
    }
}

/// Push a line at the given indentation level (four spaces each).
pub(crate) fn line(out: &mut String, indent: usize, text: &str) {
    if !text.is_empty() {
        for _ in 0..indent {
            out.push_str("    ");
        }
        out.push_str(text);
    }
    out.push('\n');
}

/// Struct literal `Name { a, b: self.b }` or `Name { _private: () }`.
pub(crate) fn struct_literal(name: &str, fields: &[String]) -> String {
    if fields.is_empty() {
        format!("{} {{ _private: () }}", name)
    } else {
        format!("{} {{ {} }}", name, fields.join(", "))
    }
}

/// A struct declaration with private fields.
pub(crate) fn struct_decl(out: &mut String, visibility: &str, name: &str, generics: &str, fields: &[(String, String)]) {
    line(out, 0, &format!("{}struct {}{} {{", visibility, name, generics));
    if fields.is_empty() {
        line(out, 1, "_private: (),");
    }
    for (field, ty) in fields {
        line(out, 1, &format!("{}: {},", field, ty));
    }
    line(out, 0, "}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_core::types::vars;

    fn ctx() -> Ctx<'static> {
        Ctx {
            goal: "person",
            rt: "stagecraft_runtime",
        }
    }

    #[test]
    fn test_generics_list() {
        assert_eq!(generics(&[]), "");
        assert_eq!(generics(&vars(["K", "V"])), "<K, V>");
    }

    #[test]
    fn test_fallible_rejects_two_error_types() {
        let one = [TypeRef::simple("IoError")];
        assert_eq!(
            fallible(&ctx(), "Person", &one, "build").unwrap(),
            "Result<Person, IoError>"
        );
        let two = [TypeRef::simple("A"), TypeRef::simple("B")];
        assert!(matches!(
            fallible(&ctx(), "Person", &two, "build"),
            Err(CodegenError::Emit { .. })
        ));
    }

    #[test]
    fn test_invoke_strips_generic_arguments() {
        let ty = TypeRef::parse("Pair<K, V>", &vars(["K", "V"])).unwrap();
        let invocation = Invocation::Constructor {
            ty,
            name: "new".into(),
        };
        let call = invoke(&ctx(), &invocation, "self.receiver", &["a".into(), "b".into()]).unwrap();
        assert_eq!(call, "Pair::new(a, b)");
    }

    #[test]
    fn test_lone_getter_with_element_check() {
        let line = mutation_line(
            &ctx(),
            "self.bean",
            &Mutation::ReplaceContents {
                getter: "tags_mut".into(),
            },
            NullCheck::Elements,
            "tags",
            &[],
        )
        .unwrap();
        assert_eq!(
            line,
            "stagecraft_runtime::replace_contents_present(self.bean.tags_mut(), tags, \"tags\");"
        );
    }

    #[test]
    fn test_fallible_setter() {
        let line = mutation_line(
            &ctx(),
            "self.bean",
            &Mutation::Setter {
                setter: "set_port".into(),
            },
            NullCheck::None,
            "port",
            &[TypeRef::simple("PortError")],
        )
        .unwrap();
        assert_eq!(line, "self.bean.set_port(port)?;");
    }
}
