//! Goal description: the single source of truth for one target operation.
//!
//! A [`GoalDescription`] is built once by a front-end, validated in
//! [`GoalDescription::new`], and read-only afterwards. The sequencer,
//! the liveness analysis and the synthesizer all consume it.

use crate::error::StructuralError;
use crate::parameter::{is_identifier, NullPolicy, Parameter, PositionHint};
use crate::types::{TypeRef, TypeVar};
use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Constructor,
    StaticMethod,
    InstanceMethod,
    /// A `Default` value populated through accessors; no invocation step.
    Bean,
}

impl TargetKind {
    pub fn label(&self) -> &'static str {
        match self {
            TargetKind::Constructor => "constructor",
            TargetKind::StaticMethod => "static method",
            TargetKind::InstanceMethod => "instance method",
            TargetKind::Bean => "bean",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    Public,
    PackagePrivate,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    NewInstancePerCall,
    ReusePerThread,
}

/// Which generated variants a goal asks for. The recycler is requested
/// through [`Lifecycle::ReusePerThread`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRequest {
    pub builder: bool,
    pub updater: bool,
    pub builder_access: Option<Access>,
    pub updater_access: Option<Access>,
}

impl Default for VariantRequest {
    fn default() -> Self {
        VariantRequest {
            builder: true,
            updater: false,
            builder_access: None,
            updater_access: None,
        }
    }
}

impl VariantRequest {
    pub fn builder_and_updater() -> Self {
        VariantRequest {
            updater: true,
            ..VariantRequest::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalDetails {
    pub kind: TargetKind,
    pub declaring_type: TypeRef,
    pub result_type: TypeRef,
    pub invocation_name: String,
    pub access: Access,
    pub declared_exceptions: Vec<TypeRef>,
    pub type_parameters: Vec<TypeVar>,
    pub instance_type_parameters: Vec<TypeVar>,
    pub lifecycle: Lifecycle,
    pub goal_name: Option<String>,
    pub null_policy: NullPolicy,
}

impl GoalDetails {
    fn base(kind: TargetKind, declaring_type: TypeRef, result_type: TypeRef, name: &str) -> Self {
        GoalDetails {
            kind,
            declaring_type,
            result_type,
            invocation_name: name.to_string(),
            access: Access::Public,
            declared_exceptions: Vec::new(),
            type_parameters: Vec::new(),
            instance_type_parameters: Vec::new(),
            lifecycle: Lifecycle::NewInstancePerCall,
            goal_name: None,
            null_policy: NullPolicy::Inherit,
        }
    }

    /// `Type::new(..)` returning `Type`.
    pub fn constructor(declaring_type: TypeRef) -> Self {
        let result = declaring_type.clone();
        GoalDetails::base(TargetKind::Constructor, declaring_type, result, "new")
    }

    pub fn static_method(declaring_type: TypeRef, name: &str, result_type: TypeRef) -> Self {
        GoalDetails::base(TargetKind::StaticMethod, declaring_type, result_type, name)
    }

    /// `receiver.name(..)`; `receiver` is the declaring type.
    pub fn instance_method(receiver: TypeRef, name: &str, result_type: TypeRef) -> Self {
        GoalDetails::base(TargetKind::InstanceMethod, receiver, result_type, name)
    }

    pub fn bean(bean_type: TypeRef) -> Self {
        let result = bean_type.clone();
        GoalDetails::base(TargetKind::Bean, bean_type, result, "default")
    }

    pub fn with_type_parameters(mut self, params: Vec<TypeVar>) -> Self {
        self.type_parameters = params;
        self
    }

    pub fn with_instance_type_parameters(mut self, params: Vec<TypeVar>) -> Self {
        self.instance_type_parameters = params;
        self
    }

    pub fn with_exceptions(mut self, exceptions: Vec<TypeRef>) -> Self {
        self.declared_exceptions = exceptions;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_goal_name(mut self, name: impl Into<String>) -> Self {
        self.goal_name = Some(name.into());
        self
    }

    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    /// Goal name in UpperCamelCase: the override, else the declaring
    /// type for constructor and bean goals, else the invocation name.
    pub fn goal_name(&self) -> String {
        if let Some(name) = &self.goal_name {
            return name.to_upper_camel_case();
        }
        match self.kind {
            TargetKind::Constructor | TargetKind::Bean => self
                .declaring_type
                .simple_name()
                .unwrap_or("Goal")
                .to_upper_camel_case(),
            TargetKind::StaticMethod | TargetKind::InstanceMethod => {
                self.invocation_name.to_upper_camel_case()
            }
        }
    }

    /// Variables bound before the first step runs: the receiver's for
    /// instance goals, the bean type's for bean goals.
    pub fn receiver_type_parameters(&self) -> Option<&[TypeVar]> {
        match self.kind {
            TargetKind::InstanceMethod | TargetKind::Bean => Some(&self.instance_type_parameters),
            TargetKind::Constructor | TargetKind::StaticMethod => None,
        }
    }

    /// Types the terminal contract mentions: the result and the errors.
    pub fn terminal_types(&self) -> Vec<TypeRef> {
        let mut types = vec![self.result_type.clone()];
        types.extend(self.declared_exceptions.iter().cloned());
        types
    }

    pub fn is_generic(&self) -> bool {
        !self.type_parameters.is_empty()
    }
}

/// Deterministic names of everything generated for one goal. Exposed so
/// that callers can detect two goals colliding on a generated name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedNames {
    pub goal: String,
    pub builder_type: String,
    pub builder_entry: String,
    pub updater_type: String,
    pub updater_entry: String,
}

impl GeneratedNames {
    pub fn for_goal(goal: &str) -> Self {
        let snake = goal.to_snake_case();
        GeneratedNames {
            goal: goal.to_string(),
            builder_type: format!("{}Builder", goal),
            builder_entry: format!("{}_builder", snake),
            updater_type: format!("{}Updater", goal),
            updater_entry: format!("{}_updater", snake),
        }
    }

    /// Type of the step that waits for `parameter`.
    pub fn step_type(&self, parameter: &str) -> String {
        format!("{}{}", self.builder_type, parameter.to_upper_camel_case())
    }

    /// Per-thread slot type for a recycled variant (`"Builder"`/`"Updater"`).
    pub fn recycle_slot(&self, variant: &str) -> String {
        format!("{}Recycled{}", self.goal, variant)
    }

    pub fn recycle_static(&self, variant: &str) -> String {
        self.recycle_slot(variant).to_shouty_snake_case()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalDescription {
    id: String,
    details: GoalDetails,
    parameters: Vec<Parameter>,
    variants: VariantRequest,
}

impl GoalDescription {
    /// Validate and freeze a goal.
    ///
    /// Bean goals bind every declared type parameter through the bean type
    /// itself, so their instance type parameters are set to the full list.
    pub fn new(
        id: impl Into<String>,
        mut details: GoalDetails,
        parameters: Vec<Parameter>,
        variants: VariantRequest,
    ) -> Result<Self, StructuralError> {
        if !variants.builder && !variants.updater {
            return Err(StructuralError::NoVariantRequested);
        }

        let mut seen = HashSet::new();
        let mut step_suffixes: HashMap<String, &str> = HashMap::new();
        for p in &parameters {
            let suffix = p.name().to_upper_camel_case();
            if !is_identifier(p.name()) || suffix.is_empty() {
                return Err(StructuralError::InvalidIdentifier {
                    name: p.name().to_string(),
                });
            }
            if !seen.insert(p.name()) {
                return Err(StructuralError::DuplicateParameter {
                    name: p.name().to_string(),
                });
            }
            // Step types are named after the parameter, so `x` and `_x` would
            // both produce `...BuilderX`.
            if let Some(first) = step_suffixes.insert(suffix.clone(), p.name()) {
                return Err(StructuralError::StepNameCollision {
                    first: first.to_string(),
                    second: p.name().to_string(),
                    suffix,
                });
            }
        }

        match details.kind {
            TargetKind::Bean => {
                details.instance_type_parameters = details.type_parameters.clone();
            }
            TargetKind::InstanceMethod => {
                for var in &details.instance_type_parameters {
                    if !details.type_parameters.contains(var) {
                        return Err(StructuralError::UndeclaredInstanceParameter {
                            var: var.to_string(),
                        });
                    }
                }
            }
            TargetKind::Constructor | TargetKind::StaticMethod => {
                if !details.instance_type_parameters.is_empty() {
                    return Err(StructuralError::UnexpectedInstanceParameters {
                        kind: details.kind.label().to_string(),
                    });
                }
            }
        }

        for p in &parameters {
            let reserved = match p.name() {
                "receiver" if details.kind == TargetKind::InstanceMethod => Some("builder"),
                "done" if variants.updater => Some("updater"),
                _ => None,
            };
            if let Some(context) = reserved {
                return Err(StructuralError::ReservedName {
                    name: p.name().to_string(),
                    context: context.to_string(),
                });
            }
        }

        let bean = details.kind == TargetKind::Bean;
        for p in &parameters {
            if p.is_bean_property() != bean {
                return Err(StructuralError::RoleMismatch {
                    name: p.name().to_string(),
                    role: p.role().label().to_string(),
                    kind: details.kind.label().to_string(),
                });
            }
        }

        if variants.updater && !bean {
            if let Some(p) = parameters.iter().find(|p| p.projection().is_none()) {
                return Err(StructuralError::MissingProjection {
                    name: p.name().to_string(),
                });
            }
        }

        if details.lifecycle == Lifecycle::ReusePerThread && details.is_generic() {
            let vars: Vec<String> = details.type_parameters.iter().map(|v| v.to_string()).collect();
            return Err(StructuralError::RecyclingGenericGoal {
                vars: vars.join(", "),
            });
        }

        Ok(GoalDescription {
            id: id.into(),
            details,
            parameters,
            variants,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn details(&self) -> &GoalDetails {
        &self.details
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn variants(&self) -> &VariantRequest {
        &self.variants
    }

    pub fn position_hints(&self) -> Vec<PositionHint> {
        self.parameters.iter().map(Parameter::position).collect()
    }

    pub fn goal_name(&self) -> String {
        self.details.goal_name()
    }

    pub fn names(&self) -> GeneratedNames {
        GeneratedNames::for_goal(&self.goal_name())
    }

    pub fn requests_recycler(&self) -> bool {
        self.details.lifecycle == Lifecycle::ReusePerThread
    }

    pub fn is_bean(&self) -> bool {
        self.details.kind == TargetKind::Bean
    }

    pub fn builder_access(&self) -> Access {
        self.variants.builder_access.unwrap_or(self.details.access)
    }

    pub fn updater_access(&self) -> Access {
        self.variants.updater_access.unwrap_or(self.details.access)
    }
}
