//! Parameter model: one argument slot of a goal.

use crate::types::TypeRef;
use serde::{Deserialize, Serialize};

/// Absent-value handling for one parameter.
///
/// `Inherit` at parameter level means "no explicit override"; at goal
/// level it means "use the default", which is `Allow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    Reject,
    Allow,
    #[default]
    Inherit,
}

impl NullPolicy {
    /// Explicit step policy, then goal policy, then `Allow`.
    pub fn resolve(step: NullPolicy, goal: NullPolicy) -> NullPolicy {
        match (step, goal) {
            (NullPolicy::Inherit, NullPolicy::Inherit) => NullPolicy::Allow,
            (NullPolicy::Inherit, goal) => goal,
            (step, _) => step,
        }
    }
}

/// How the updater reads the current value of a parameter back out of an
/// existing result value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// `source.<name>.clone()`
    Field(String),
    /// `source.<name>()`
    Method(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ParameterRole {
    /// An ordinary argument of a constructor or method invocation.
    RegularValue { projection: Option<Projection> },
    /// A bean property written through a setter. Without a setter the
    /// getter name doubles as a public field that is assigned directly.
    AccessorPair {
        getter: String,
        setter: Option<String>,
        setter_errors: Vec<TypeRef>,
    },
    /// A getter-only collection property. The getter hands out the
    /// collection mutably; it is cleared and re-filled, never replaced.
    LoneGetter {
        getter: String,
        element_type: TypeRef,
        getter_errors: Vec<TypeRef>,
    },
}

impl ParameterRole {
    pub fn label(&self) -> &'static str {
        match self {
            ParameterRole::RegularValue { .. } => "a regular value",
            ParameterRole::AccessorPair { .. } => "an accessor pair",
            ParameterRole::LoneGetter { .. } => "a lone getter",
        }
    }
}

/// Where a parameter wants to sit in the step order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "hint", rename_all = "snake_case")]
pub enum PositionHint {
    #[default]
    Declared,
    FloatLeft { group: Option<i32> },
    Absolute { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    name: String,
    #[serde(rename = "type")]
    ty: TypeRef,
    null_policy: NullPolicy,
    #[serde(flatten)]
    role: ParameterRole,
    position: PositionHint,
}

impl Parameter {
    pub fn regular(name: impl Into<String>, ty: TypeRef) -> Self {
        Parameter {
            name: name.into(),
            ty,
            null_policy: NullPolicy::Inherit,
            role: ParameterRole::RegularValue { projection: None },
            position: PositionHint::Declared,
        }
    }

    /// Bean property with a getter and an optional setter.
    pub fn accessor(
        name: impl Into<String>,
        ty: TypeRef,
        getter: impl Into<String>,
        setter: Option<&str>,
    ) -> Self {
        Parameter {
            role: ParameterRole::AccessorPair {
                getter: getter.into(),
                setter: setter.map(str::to_owned),
                setter_errors: Vec::new(),
            },
            ..Parameter::regular(name, ty)
        }
    }

    /// Getter-only collection property; `collection` is the type the
    /// getter exposes, `element_type` its item type.
    pub fn lone_getter(
        name: impl Into<String>,
        collection: TypeRef,
        getter: impl Into<String>,
        element_type: TypeRef,
    ) -> Self {
        Parameter {
            role: ParameterRole::LoneGetter {
                getter: getter.into(),
                element_type,
                getter_errors: Vec::new(),
            },
            ..Parameter::regular(name, collection)
        }
    }

    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    pub fn with_position(mut self, hint: PositionHint) -> Self {
        self.position = hint;
        self
    }

    /// Attach an updater projection. Ignored for bean properties.
    pub fn with_projection(mut self, projection: Projection) -> Self {
        if let ParameterRole::RegularValue { projection: slot } = &mut self.role {
            *slot = Some(projection);
        }
        self
    }

    /// Errors raised by the accessor (setter or lone getter).
    pub fn with_accessor_errors(mut self, errors: Vec<TypeRef>) -> Self {
        match &mut self.role {
            ParameterRole::AccessorPair { setter_errors, .. } => *setter_errors = errors,
            ParameterRole::LoneGetter { getter_errors, .. } => *getter_errors = errors,
            ParameterRole::RegularValue { .. } => {}
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn null_policy(&self) -> NullPolicy {
        self.null_policy
    }

    pub fn role(&self) -> &ParameterRole {
        &self.role
    }

    pub fn position(&self) -> PositionHint {
        self.position
    }

    pub fn resolved_null_policy(&self, goal_policy: NullPolicy) -> NullPolicy {
        NullPolicy::resolve(self.null_policy, goal_policy)
    }

    pub fn is_bean_property(&self) -> bool {
        !matches!(self.role, ParameterRole::RegularValue { .. })
    }

    pub fn projection(&self) -> Option<&Projection> {
        match &self.role {
            ParameterRole::RegularValue { projection } => projection.as_ref(),
            _ => None,
        }
    }

    pub fn accessor_errors(&self) -> &[TypeRef] {
        match &self.role {
            ParameterRole::AccessorPair { setter_errors, .. } => setter_errors,
            ParameterRole::LoneGetter { getter_errors, .. } => getter_errors,
            ParameterRole::RegularValue { .. } => &[],
        }
    }
}

/// True when `name` can be used verbatim as a Rust identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name != "_" && chars.all(|c| c.is_alphanumeric() || c == '_') && !is_keyword(name)
}

fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "as" | "async"
            | "await"
            | "break"
            | "const"
            | "continue"
            | "crate"
            | "dyn"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "self"
            | "Self"
            | "static"
            | "struct"
            | "super"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
    )
}
