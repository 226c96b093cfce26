//! Pass 3: interface-chain synthesis.
//!
//! Turns a goal, its step order and its liveness table into the abstract
//! graph the emitter renders: one step interface per parameter ending in a
//! terminal contract (builder), a single mutable contract with one update
//! method per parameter (updater), the per-thread recycling holders, and
//! the entry points that start each variant.
//!
//! Nothing here produces text. Every name in the graph is derived from
//! [`GeneratedNames`] so that two goals colliding on a generated name can
//! be detected before anything is emitted.

use crate::error::GoalError;
use crate::goal::{Access, GeneratedNames, GoalDescription, TargetKind};
use crate::parameter::{NullPolicy, Parameter, ParameterRole, Projection};
use crate::pass1_sequence::StepOrder;
use crate::pass2_varlife::VarLifeTable;
use crate::types::{TypeRef, TypeVar};
use serde::Serialize;

/// Terminal method of the builder chain.
pub const BUILD_METHOD: &str = "build";
/// Commit method of the updater.
pub const COMMIT_METHOD: &str = "done";
/// Name under which the receiver of an instance goal is stored and passed.
pub const RECEIVER: &str = "receiver";

// ── Step methods ─────────────────────────────────────────────────────

/// Presence check the generated method performs before touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NullCheck {
    None,
    /// The argument itself must be present.
    Argument,
    /// Every element of the iterable argument must be present.
    Elements,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum StepInput {
    /// A single value of the parameter's type.
    Value { ty: TypeRef },
    /// Any iterable of the collection's element type.
    Elements { element_type: TypeRef },
}

/// What a step or update method does with its argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mutation", rename_all = "snake_case")]
pub enum Mutation {
    /// Keep the value for the invocation.
    Argument,
    Setter { setter: String },
    FieldAssign { field: String },
    /// Clear the collection the getter returns, then append every element.
    ReplaceContents { getter: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepMethod {
    pub name: String,
    pub parameter: String,
    pub input: StepInput,
    pub mutation: Mutation,
    pub method_type_parameters: Vec<TypeVar>,
    pub thrown: Vec<TypeRef>,
    pub null_check: NullCheck,
    /// The next step interface, or the terminal contract.
    pub returns: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepInterface {
    pub name: String,
    /// Index of the parameter this step consumes, in declaration order.
    pub parameter_index: usize,
    /// Variables bound earlier that this step or a later one still needs.
    pub type_parameters: Vec<TypeVar>,
    /// Every variable bound before this step (receiver plus earlier
    /// method introductions). The state carried into the step mentions
    /// exactly these.
    pub state_parameters: Vec<TypeVar>,
    pub method: StepMethod,
}

// ── Terminal contract ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "invocation", rename_all = "snake_case")]
pub enum Invocation {
    /// `Type::name(args..)` returning the declaring type.
    Constructor { ty: TypeRef, name: String },
    StaticMethod { ty: TypeRef, name: String },
    /// `receiver.name(args..)`.
    InstanceMethod { receiver: TypeRef, name: String },
    /// No invocation: the populated value itself is the result.
    Bean { ty: TypeRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalContract {
    pub name: String,
    pub type_parameters: Vec<TypeVar>,
    pub state_parameters: Vec<TypeVar>,
    pub method_name: String,
    /// Variables only the result or error types mention.
    pub method_type_parameters: Vec<TypeVar>,
    pub invocation: Invocation,
    /// Parameter names in declaration order, i.e. argument order.
    pub arguments: Vec<String>,
    pub return_type: TypeRef,
    pub thrown_exceptions: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceChain {
    pub goal_name: String,
    pub kind: TargetKind,
    /// Receiver of an instance goal or value of a bean goal, carried
    /// through every step.
    pub receiver: Option<TypeRef>,
    pub order: StepOrder,
    pub steps: Vec<StepInterface>,
    pub terminal: TerminalContract,
    pub recycled: Option<RecyclerHolder>,
}

impl InterfaceChain {
    /// Type the chain's entry point hands out.
    pub fn first_step(&self) -> TypeRef {
        match self.steps.first() {
            Some(step) => TypeRef::generated(&step.name, &step.state_parameters),
            None => TypeRef::generated(&self.terminal.name, &self.terminal.state_parameters),
        }
    }

    /// Values stored when step `k` is reached: the parameters of every
    /// earlier step, in step order. Empty for bean goals, whose setters
    /// run immediately.
    pub fn stored_before(&self, k: usize) -> Vec<&StepMethod> {
        self.steps
            .iter()
            .take(k)
            .map(|s| &s.method)
            .filter(|m| m.mutation == Mutation::Argument)
            .collect()
    }
}

/// Zero-parameter goals skip the chain: one factory builds the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactoryMethod {
    pub name: String,
    pub access: Access,
    pub type_parameters: Vec<TypeVar>,
    pub receiver: Option<TypeRef>,
    pub invocation: Invocation,
    pub return_type: TypeRef,
    pub thrown_exceptions: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "artifact", rename_all = "snake_case")]
pub enum BuilderArtifact {
    Chain(InterfaceChain),
    Factory(FactoryMethod),
}

// ── Updater ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdaterField {
    pub name: String,
    pub ty: TypeRef,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateMethod {
    pub name: String,
    pub parameter: String,
    pub input: StepInput,
    pub mutation: Mutation,
    pub thrown: Vec<TypeRef>,
    pub null_check: NullCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "commit", rename_all = "snake_case")]
pub enum Commit {
    /// Invoke the target again with the current field values.
    Reinvoke {
        invocation: Invocation,
        arguments: Vec<String>,
        return_type: TypeRef,
        thrown_exceptions: Vec<TypeRef>,
    },
    /// Hand back the mutated bean.
    ReturnBean { ty: TypeRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutableContract {
    pub name: String,
    /// Variables of the stored state: receiver plus parameter types.
    pub type_parameters: Vec<TypeVar>,
    /// Variables the entry point needs beyond the stored state (those of
    /// the source value).
    pub entry_type_parameters: Vec<TypeVar>,
    /// Variables only the commit's result or error types mention.
    pub commit_method_params: Vec<TypeVar>,
    pub commit_method: String,
    /// Type of the existing value the updater starts from.
    pub source_type: TypeRef,
    pub receiver: Option<TypeRef>,
    /// Fields read from the source through projections; empty for beans.
    pub fields: Vec<UpdaterField>,
    pub update_methods: Vec<UpdateMethod>,
    pub commit: Commit,
    pub recycled: Option<RecyclerHolder>,
}

// ── Recycling ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Builder,
    Updater,
}

impl Variant {
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Builder => "Builder",
            Variant::Updater => "Updater",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotField {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum RecycleSlot {
    /// A generated struct with one optional field per stored value.
    Generated { name: String, fields: Vec<SlotField> },
    /// Bean goals reuse the bean value itself.
    Bean { ty: TypeRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecyclerHolder {
    pub variant: Variant,
    /// Name of the `thread_local!` static holding the slot.
    pub static_name: String,
    pub slot: RecycleSlot,
}

impl RecyclerHolder {
    pub fn slot_type(&self) -> TypeRef {
        match &self.slot {
            RecycleSlot::Generated { name, .. } => TypeRef::simple(name.clone()),
            RecycleSlot::Bean { ty } => ty.clone(),
        }
    }
}

// ── Entry points ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureParam {
    pub name: String,
    pub ty: TypeRef,
    pub by_reference: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub access: Access,
    pub type_parameters: Vec<TypeVar>,
    pub parameters: Vec<SignatureParam>,
    pub returns: TypeRef,
    /// Error type when the entry point can fail (recycled variants and
    /// error-raising factories).
    pub error: Option<TypeRef>,
    /// `Type: Default` bounds needed to create a bean value.
    pub default_bounds: Vec<TypeRef>,
    /// `Type: Clone` bounds needed to copy fields out of a borrowed source.
    pub clone_bounds: Vec<TypeRef>,
}

/// One `(goal name, generated signature)` pair handed to the emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    pub goal_name: String,
    pub variant: Variant,
    pub signature: MethodSignature,
}

/// Runtime type the recycled entry points fail with.
pub fn usage_error_type() -> TypeRef {
    TypeRef::simple("UsageError")
}

// ── Goal-level result ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesizedGoal {
    pub id: String,
    pub goal_name: String,
    pub kind: TargetKind,
    pub order: StepOrder,
    pub varlife: VarLifeTable,
    pub builder: Option<BuilderArtifact>,
    pub updater: Option<MutableContract>,
    pub entry_points: Vec<EntryPoint>,
}

impl SynthesizedGoal {
    /// Every item name this goal puts into the generated module.
    pub fn generated_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entry_points
            .iter()
            .map(|e| e.signature.name.clone())
            .collect();
        if let Some(BuilderArtifact::Chain(chain)) = &self.builder {
            names.extend(chain.steps.iter().map(|s| s.name.clone()));
            names.push(chain.terminal.name.clone());
            names.extend(chain.recycled.iter().flat_map(holder_names));
        }
        if let Some(updater) = &self.updater {
            names.push(updater.name.clone());
            names.extend(updater.recycled.iter().flat_map(holder_names));
        }
        names
    }
}

fn holder_names(holder: &RecyclerHolder) -> Vec<String> {
    let mut names = vec![holder.static_name.clone()];
    if let RecycleSlot::Generated { name, .. } = &holder.slot {
        names.push(name.clone());
    }
    names
}

// ── Synthesis ────────────────────────────────────────────────────────

/// Synthesize every variant the goal requests.
pub fn synthesize(
    goal: &GoalDescription,
    order: &StepOrder,
    varlife: &VarLifeTable,
) -> Result<SynthesizedGoal, GoalError> {
    let names = goal.names();
    let mut entry_points = Vec::new();

    let builder = if goal.variants().builder {
        let artifact = if goal.parameters().is_empty() {
            BuilderArtifact::Factory(synthesize_factory(goal, &names))
        } else {
            BuilderArtifact::Chain(synthesize_chain(goal, order, varlife, &names))
        };
        entry_points.push(builder_entry(goal, &names, &artifact));
        Some(artifact)
    } else {
        None
    };

    let updater = if goal.variants().updater {
        let contract = synthesize_updater(goal, &names);
        entry_points.push(updater_entry(goal, &names, &contract));
        Some(contract)
    } else {
        None
    };

    Ok(SynthesizedGoal {
        id: goal.id().to_string(),
        goal_name: names.goal.clone(),
        kind: goal.details().kind,
        order: order.clone(),
        varlife: varlife.clone(),
        builder,
        updater,
        entry_points,
    })
}

/// The builder chain for a goal with at least one parameter.
pub fn synthesize_chain(
    goal: &GoalDescription,
    order: &StepOrder,
    varlife: &VarLifeTable,
    names: &GeneratedNames,
) -> InterfaceChain {
    let declared = &goal.details().type_parameters;
    let goal_policy = goal.details().null_policy;
    let parameters = goal.parameters();

    let step_names: Vec<String> = order
        .indices()
        .iter()
        .map(|&i| names.step_type(parameters[i].name()))
        .collect();

    let terminal = terminal_contract(goal, varlife, names);

    let mut steps = Vec::with_capacity(order.len());
    for (k, &index) in order.indices().iter().enumerate() {
        let parameter = &parameters[index];
        let returns = match step_names.get(k + 1) {
            Some(next) => TypeRef::generated(next, &state_at(declared, varlife, k + 1)),
            None => TypeRef::generated(&terminal.name, &terminal.state_parameters),
        };
        let (input, mutation) = step_shape(parameter);
        steps.push(StepInterface {
            name: step_names[k].clone(),
            parameter_index: index,
            type_parameters: varlife.type_params(k).to_vec(),
            state_parameters: state_at(declared, varlife, k),
            method: StepMethod {
                name: parameter.name().to_string(),
                parameter: parameter.name().to_string(),
                input,
                mutation,
                method_type_parameters: varlife.method_params(k).to_vec(),
                thrown: parameter.accessor_errors().to_vec(),
                null_check: null_check(parameter, goal_policy),
                returns,
            },
        });
    }

    InterfaceChain {
        goal_name: names.goal.clone(),
        kind: goal.details().kind,
        receiver: receiver_type(goal),
        order: order.clone(),
        steps,
        terminal,
        recycled: goal
            .requests_recycler()
            .then(|| recycler_holder(goal, names, Variant::Builder)),
    }
}

fn terminal_contract(
    goal: &GoalDescription,
    varlife: &VarLifeTable,
    names: &GeneratedNames,
) -> TerminalContract {
    let details = goal.details();
    let steps = varlife.steps.len();
    TerminalContract {
        name: names.builder_type.clone(),
        type_parameters: varlife.terminal_type_params.clone(),
        state_parameters: state_at(&details.type_parameters, varlife, steps),
        method_name: BUILD_METHOD.to_string(),
        method_type_parameters: varlife.terminal_method_params.clone(),
        invocation: invocation(goal),
        arguments: goal.parameters().iter().map(|p| p.name().to_string()).collect(),
        return_type: details.result_type.clone(),
        thrown_exceptions: thrown(goal),
    }
}

fn synthesize_factory(goal: &GoalDescription, names: &GeneratedNames) -> FactoryMethod {
    let details = goal.details();
    FactoryMethod {
        name: names.builder_entry.clone(),
        access: goal.builder_access(),
        type_parameters: details.type_parameters.clone(),
        receiver: match details.kind {
            TargetKind::InstanceMethod => Some(details.declaring_type.clone()),
            _ => None,
        },
        invocation: invocation(goal),
        return_type: details.result_type.clone(),
        thrown_exceptions: thrown(goal),
    }
}

fn synthesize_updater(goal: &GoalDescription, names: &GeneratedNames) -> MutableContract {
    let details = goal.details();
    let declared = &details.type_parameters;
    let goal_policy = details.null_policy;

    let fields: Vec<UpdaterField> = goal
        .parameters()
        .iter()
        .filter_map(|p| {
            p.projection().map(|projection| UpdaterField {
                name: p.name().to_string(),
                ty: p.ty().clone(),
                projection: projection.clone(),
            })
        })
        .collect();

    let update_methods = goal
        .parameters()
        .iter()
        .map(|p| {
            let (input, mutation) = step_shape(p);
            UpdateMethod {
                name: p.name().to_string(),
                parameter: p.name().to_string(),
                input,
                mutation,
                thrown: p.accessor_errors().to_vec(),
                null_check: null_check(p, goal_policy),
            }
        })
        .collect();

    // Stored state: the receiver (or bean) plus every field.
    let mut stored: Vec<&TypeRef> = Vec::new();
    if goal.is_bean() || details.kind == TargetKind::InstanceMethod {
        stored.push(&details.declaring_type);
    }
    stored.extend(fields.iter().map(|f| &f.ty));
    let type_parameters = mentioned_by(declared, stored.iter().copied());

    let source_type = details.result_type.clone();
    let entry_type_parameters: Vec<TypeVar> = mentioned_by(declared, [&source_type])
        .into_iter()
        .filter(|v| !type_parameters.contains(v))
        .collect();

    let (commit, commit_method_params) = if goal.is_bean() {
        (
            Commit::ReturnBean {
                ty: details.declaring_type.clone(),
            },
            Vec::new(),
        )
    } else {
        let terminal_types = details.terminal_types();
        let commit_params = mentioned_by(declared, terminal_types.iter())
            .into_iter()
            .filter(|v| !type_parameters.contains(v))
            .collect();
        (
            Commit::Reinvoke {
                invocation: invocation(goal),
                arguments: goal.parameters().iter().map(|p| p.name().to_string()).collect(),
                return_type: details.result_type.clone(),
                thrown_exceptions: thrown(goal),
            },
            commit_params,
        )
    };

    MutableContract {
        name: names.updater_type.clone(),
        type_parameters,
        entry_type_parameters,
        commit_method_params,
        commit_method: COMMIT_METHOD.to_string(),
        source_type,
        receiver: match details.kind {
            TargetKind::InstanceMethod => Some(details.declaring_type.clone()),
            _ => None,
        },
        fields,
        update_methods,
        commit,
        recycled: goal
            .requests_recycler()
            .then(|| recycler_holder(goal, names, Variant::Updater)),
    }
}

fn recycler_holder(goal: &GoalDescription, names: &GeneratedNames, variant: Variant) -> RecyclerHolder {
    let details = goal.details();
    let slot = if goal.is_bean() {
        RecycleSlot::Bean {
            ty: details.declaring_type.clone(),
        }
    } else {
        let mut fields = Vec::new();
        if details.kind == TargetKind::InstanceMethod {
            fields.push(SlotField {
                name: RECEIVER.to_string(),
                ty: details.declaring_type.clone(),
            });
        }
        fields.extend(goal.parameters().iter().map(|p| SlotField {
            name: p.name().to_string(),
            ty: p.ty().clone(),
        }));
        RecycleSlot::Generated {
            name: names.recycle_slot(variant.label()),
            fields,
        }
    };
    RecyclerHolder {
        variant,
        static_name: names.recycle_static(variant.label()),
        slot,
    }
}

fn builder_entry(goal: &GoalDescription, names: &GeneratedNames, artifact: &BuilderArtifact) -> EntryPoint {
    let details = goal.details();
    let signature = match artifact {
        BuilderArtifact::Factory(factory) => MethodSignature {
            name: factory.name.clone(),
            access: factory.access,
            type_parameters: factory.type_parameters.clone(),
            parameters: receiver_param(goal).into_iter().collect(),
            returns: factory.return_type.clone(),
            error: single_error(&factory.thrown_exceptions),
            default_bounds: bean_default_bound(goal),
            clone_bounds: Vec::new(),
        },
        BuilderArtifact::Chain(chain) => MethodSignature {
            name: names.builder_entry.clone(),
            access: goal.builder_access(),
            type_parameters: details
                .receiver_type_parameters()
                .map(<[TypeVar]>::to_vec)
                .unwrap_or_default(),
            parameters: receiver_param(goal).into_iter().collect(),
            returns: chain.first_step(),
            error: chain.recycled.as_ref().map(|_| usage_error_type()),
            default_bounds: bean_default_bound(goal),
            clone_bounds: Vec::new(),
        },
    };
    EntryPoint {
        goal_name: names.goal.clone(),
        variant: Variant::Builder,
        signature,
    }
}

fn updater_entry(goal: &GoalDescription, names: &GeneratedNames, contract: &MutableContract) -> EntryPoint {
    let mut parameters: Vec<SignatureParam> = receiver_param(goal).into_iter().collect();
    parameters.push(SignatureParam {
        name: "source".to_string(),
        ty: contract.source_type.clone(),
        by_reference: !goal.is_bean(),
    });
    let mut type_parameters = contract.type_parameters.clone();
    type_parameters.extend(contract.entry_type_parameters.iter().cloned());
    let declared = &goal.details().type_parameters;
    EntryPoint {
        goal_name: names.goal.clone(),
        variant: Variant::Updater,
        signature: MethodSignature {
            name: names.updater_entry.clone(),
            access: goal.updater_access(),
            type_parameters: declared
                .iter()
                .filter(|v| type_parameters.contains(v))
                .cloned()
                .collect(),
            parameters,
            returns: TypeRef::generated(&contract.name, &contract.type_parameters),
            error: contract.recycled.as_ref().map(|_| usage_error_type()),
            default_bounds: Vec::new(),
            clone_bounds: projected_clone_bounds(contract),
        },
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn step_shape(parameter: &Parameter) -> (StepInput, Mutation) {
    match parameter.role() {
        ParameterRole::RegularValue { .. } => (
            StepInput::Value {
                ty: parameter.ty().clone(),
            },
            Mutation::Argument,
        ),
        ParameterRole::AccessorPair { getter, setter, .. } => (
            StepInput::Value {
                ty: parameter.ty().clone(),
            },
            match setter {
                Some(setter) => Mutation::Setter {
                    setter: setter.clone(),
                },
                None => Mutation::FieldAssign {
                    field: getter.clone(),
                },
            },
        ),
        ParameterRole::LoneGetter {
            getter,
            element_type,
            ..
        } => (
            StepInput::Elements {
                element_type: element_type.clone(),
            },
            Mutation::ReplaceContents {
                getter: getter.clone(),
            },
        ),
    }
}

/// Resolve the policy and map it onto the only absent-capable shape.
fn null_check(parameter: &Parameter, goal_policy: NullPolicy) -> NullCheck {
    if parameter.resolved_null_policy(goal_policy) != NullPolicy::Reject {
        return NullCheck::None;
    }
    match parameter.role() {
        ParameterRole::LoneGetter { element_type, .. } => {
            if element_type.option_inner().is_some() {
                NullCheck::Elements
            } else {
                NullCheck::None
            }
        }
        _ if parameter.ty().option_inner().is_some() => NullCheck::Argument,
        _ => NullCheck::None,
    }
}

fn invocation(goal: &GoalDescription) -> Invocation {
    let details = goal.details();
    let ty = details.declaring_type.clone();
    let name = details.invocation_name.clone();
    match details.kind {
        TargetKind::Constructor => Invocation::Constructor { ty, name },
        TargetKind::StaticMethod => Invocation::StaticMethod { ty, name },
        TargetKind::InstanceMethod => Invocation::InstanceMethod { receiver: ty, name },
        TargetKind::Bean => Invocation::Bean { ty },
    }
}

/// Errors the terminal invocation can raise. Creating a bean cannot fail.
fn thrown(goal: &GoalDescription) -> Vec<TypeRef> {
    if goal.is_bean() {
        Vec::new()
    } else {
        goal.details().declared_exceptions.clone()
    }
}

fn single_error(thrown: &[TypeRef]) -> Option<TypeRef> {
    thrown.first().cloned()
}

fn receiver_type(goal: &GoalDescription) -> Option<TypeRef> {
    match goal.details().kind {
        TargetKind::InstanceMethod | TargetKind::Bean => Some(goal.details().declaring_type.clone()),
        TargetKind::Constructor | TargetKind::StaticMethod => None,
    }
}

fn receiver_param(goal: &GoalDescription) -> Option<SignatureParam> {
    (goal.details().kind == TargetKind::InstanceMethod).then(|| SignatureParam {
        name: RECEIVER.to_string(),
        ty: goal.details().declaring_type.clone(),
        by_reference: false,
    })
}

fn bean_default_bound(goal: &GoalDescription) -> Vec<TypeRef> {
    let details = goal.details();
    if goal.is_bean() && details.is_generic() {
        vec![details.declaring_type.clone()]
    } else {
        Vec::new()
    }
}

/// Generic field types the updater entry clones out of `&source`.
/// Concrete types either implement `Clone` or fail at the use site.
fn projected_clone_bounds(contract: &MutableContract) -> Vec<TypeRef> {
    let mut bounds: Vec<TypeRef> = Vec::new();
    for field in &contract.fields {
        if matches!(field.projection, Projection::Field(_))
            && !field.ty.type_vars().is_empty()
            && !bounds.contains(&field.ty)
        {
            bounds.push(field.ty.clone());
        }
    }
    bounds
}

/// Variables bound before step `k`, in declaration order.
fn state_at(declared: &[TypeVar], varlife: &VarLifeTable, k: usize) -> Vec<TypeVar> {
    let bound = varlife.bound_before(k);
    declared.iter().filter(|v| bound.contains(v)).cloned().collect()
}

fn mentioned_by<'a>(declared: &[TypeVar], types: impl IntoIterator<Item = &'a TypeRef>) -> Vec<TypeVar> {
    let types: Vec<&TypeRef> = types.into_iter().collect();
    declared
        .iter()
        .filter(|v| types.iter().any(|t| t.mentions(v)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{GoalDetails, Lifecycle, VariantRequest};
    use crate::pass1_sequence::sequence;
    use crate::pass2_varlife::analyze_goal;
    use crate::types::vars;

    fn run(goal: &GoalDescription) -> SynthesizedGoal {
        let order = sequence(goal.parameters(), &goal.position_hints()).unwrap();
        let varlife = analyze_goal(goal, &order).unwrap();
        synthesize(goal, &order, &varlife).unwrap()
    }

    fn chain(goal: &SynthesizedGoal) -> &InterfaceChain {
        match &goal.builder {
            Some(BuilderArtifact::Chain(chain)) => chain,
            other => panic!("expected chain, got {:?}", other),
        }
    }

    fn person(variants: VariantRequest) -> GoalDescription {
        GoalDescription::new(
            "person",
            GoalDetails::constructor(TypeRef::simple("Person")),
            vec![
                Parameter::regular("name", TypeRef::simple("String"))
                    .with_projection(Projection::Field("name".into())),
                Parameter::regular("age", TypeRef::simple("u32"))
                    .with_projection(Projection::Method("age".into())),
            ],
            variants,
        )
        .unwrap()
    }

    #[test]
    fn test_chain_links_steps_to_terminal() {
        let goal = run(&person(VariantRequest::default()));
        let chain = chain(&goal);
        assert_eq!(chain.steps.len(), 2);
        assert_eq!(chain.steps[0].name, "PersonBuilderName");
        assert_eq!(chain.steps[0].method.returns, TypeRef::simple("PersonBuilderAge"));
        assert_eq!(chain.steps[1].method.returns, TypeRef::simple("PersonBuilder"));
        assert_eq!(chain.terminal.method_name, "build");
        assert_eq!(chain.terminal.arguments, ["name", "age"]);
        assert_eq!(
            chain.terminal.invocation,
            Invocation::Constructor {
                ty: TypeRef::simple("Person"),
                name: "new".into()
            }
        );
    }

    #[test]
    fn test_arguments_stay_in_declaration_order_when_steps_move() {
        let details = GoalDetails::constructor(TypeRef::simple("Point"));
        let goal = GoalDescription::new(
            "point",
            details,
            vec![
                Parameter::regular("x", TypeRef::simple("i32")),
                Parameter::regular("y", TypeRef::simple("i32"))
                    .with_position(crate::parameter::PositionHint::FloatLeft { group: None }),
            ],
            VariantRequest::default(),
        )
        .unwrap();
        let goal = run(&goal);
        let chain = chain(&goal);
        assert_eq!(chain.steps[0].method.name, "y");
        assert_eq!(chain.steps[0].parameter_index, 1);
        assert_eq!(chain.terminal.arguments, ["x", "y"]);
    }

    #[test]
    fn test_generic_chain_carries_cumulative_state() {
        let declared = vars(["K", "V"]);
        let details = GoalDetails::static_method(
            TypeRef::simple("Maps"),
            "merge",
            TypeRef::parse("Map<K, V>", &declared).unwrap(),
        )
        .with_type_parameters(declared.clone());
        let goal = GoalDescription::new(
            "merge",
            details,
            vec![
                Parameter::regular("keys", TypeRef::parse("List<K>", &declared).unwrap()),
                Parameter::regular("value", TypeRef::var("V")),
                Parameter::regular("base", TypeRef::parse("Map<K, V>", &declared).unwrap()),
            ],
            VariantRequest::default(),
        )
        .unwrap();
        let goal = run(&goal);
        let chain = chain(&goal);

        assert_eq!(chain.steps[0].method.method_type_parameters, vars(["K"]));
        assert_eq!(
            chain.steps[0].method.returns,
            TypeRef::generated("MergeBuilderValue", &vars(["K"]))
        );
        assert_eq!(chain.steps[1].type_parameters, vars(["K"]));
        assert_eq!(chain.steps[2].state_parameters, vars(["K", "V"]));
        assert_eq!(
            chain.steps[2].method.returns,
            TypeRef::generated("MergeBuilder", &vars(["K", "V"]))
        );
        assert!(chain.terminal.method_type_parameters.is_empty());
    }

    #[test]
    fn test_zero_parameter_goal_is_a_factory() {
        let goal = GoalDescription::new(
            "clock",
            GoalDetails::constructor(TypeRef::simple("Clock")),
            vec![],
            VariantRequest::default(),
        )
        .unwrap();
        let goal = run(&goal);
        match &goal.builder {
            Some(BuilderArtifact::Factory(factory)) => {
                assert_eq!(factory.name, "clock_builder");
                assert_eq!(factory.return_type, TypeRef::simple("Clock"));
            }
            other => panic!("expected factory, got {:?}", other),
        }
        assert_eq!(goal.entry_points[0].signature.returns, TypeRef::simple("Clock"));
    }

    #[test]
    fn test_null_policy_resolution() {
        let opt = TypeRef::parse("Option<String>", &[]).unwrap();
        let allowed = Parameter::regular("nick", opt.clone()).with_null_policy(NullPolicy::Allow);
        let inherited = Parameter::regular("title", opt.clone());
        assert_eq!(null_check(&allowed, NullPolicy::Reject), NullCheck::None);
        assert_eq!(null_check(&inherited, NullPolicy::Reject), NullCheck::Argument);
        assert_eq!(null_check(&inherited, NullPolicy::Inherit), NullCheck::None);

        let plain = Parameter::regular("age", TypeRef::simple("u32")).with_null_policy(NullPolicy::Reject);
        assert_eq!(null_check(&plain, NullPolicy::Allow), NullCheck::None);
    }

    #[test]
    fn test_lone_getter_replaces_contents() {
        let details = GoalDetails::bean(TypeRef::simple("Config"));
        let goal = GoalDescription::new(
            "config",
            details,
            vec![
                Parameter::accessor("host", TypeRef::simple("String"), "host", Some("set_host")),
                Parameter::lone_getter(
                    "tags",
                    TypeRef::parse("Vec<Option<String>>", &[]).unwrap(),
                    "tags_mut",
                    TypeRef::parse("Option<String>", &[]).unwrap(),
                )
                .with_null_policy(NullPolicy::Reject),
                Parameter::accessor("port", TypeRef::simple("u16"), "port", None),
            ],
            VariantRequest::default(),
        )
        .unwrap();
        let goal = run(&goal);
        let chain = chain(&goal);
        assert_eq!(
            chain.steps[0].method.mutation,
            Mutation::Setter {
                setter: "set_host".into()
            }
        );
        assert_eq!(
            chain.steps[1].method.mutation,
            Mutation::ReplaceContents {
                getter: "tags_mut".into()
            }
        );
        assert_eq!(chain.steps[1].method.null_check, NullCheck::Elements);
        assert_eq!(
            chain.steps[2].method.mutation,
            Mutation::FieldAssign {
                field: "port".into()
            }
        );
        assert!(chain.stored_before(3).is_empty());
        assert_eq!(chain.terminal.invocation, Invocation::Bean { ty: TypeRef::simple("Config") });
    }

    #[test]
    fn test_updater_reads_projections_and_reinvokes() {
        let goal = run(&person(VariantRequest::builder_and_updater()));
        let updater = goal.updater.as_ref().unwrap();
        assert_eq!(updater.name, "PersonUpdater");
        assert_eq!(updater.fields.len(), 2);
        assert_eq!(updater.fields[1].projection, Projection::Method("age".into()));
        assert_eq!(updater.update_methods.len(), 2);
        assert!(matches!(updater.commit, Commit::Reinvoke { .. }));
        let entry = &goal.entry_points[1];
        assert_eq!(entry.signature.name, "person_updater");
        assert!(entry.signature.parameters[0].by_reference);
    }

    #[test]
    fn test_recycled_goal_leases_a_slot() {
        let details = GoalDetails::constructor(TypeRef::simple("Person"))
            .with_lifecycle(Lifecycle::ReusePerThread);
        let goal = GoalDescription::new(
            "person",
            details,
            vec![Parameter::regular("name", TypeRef::simple("String"))],
            VariantRequest::default(),
        )
        .unwrap();
        let goal = run(&goal);
        let chain = chain(&goal);
        let holder = chain.recycled.as_ref().unwrap();
        assert_eq!(holder.static_name, "PERSON_RECYCLED_BUILDER");
        assert_eq!(holder.slot_type(), TypeRef::simple("PersonRecycledBuilder"));
        assert_eq!(goal.entry_points[0].signature.error, Some(usage_error_type()));
        assert!(goal
            .generated_names()
            .contains(&"PersonRecycledBuilder".to_string()));
    }

    #[test]
    fn test_instance_goal_passes_receiver() {
        let declared = vars(["K"]);
        let details = GoalDetails::instance_method(
            TypeRef::parse("Registry<K>", &declared).unwrap(),
            "register",
            TypeRef::simple("Handle"),
        )
        .with_type_parameters(declared.clone())
        .with_instance_type_parameters(declared.clone());
        let goal = GoalDescription::new(
            "register",
            details,
            vec![Parameter::regular("key", TypeRef::var("K"))],
            VariantRequest::default(),
        )
        .unwrap();
        let goal = run(&goal);
        let entry = &goal.entry_points[0].signature;
        assert_eq!(entry.type_parameters, declared);
        assert_eq!(entry.parameters[0].name, "receiver");
        assert_eq!(
            entry.returns,
            TypeRef::generated("RegisterBuilderKey", &vars(["K"]))
        );
    }

    #[test]
    fn test_generic_updater_entry_requires_clone_for_field_projections() {
        let declared = vars(["K", "V"]);
        let details = GoalDetails::instance_method(
            TypeRef::parse("Registry<K>", &declared).unwrap(),
            "register",
            TypeRef::parse("Handle<K, V>", &declared).unwrap(),
        )
        .with_type_parameters(declared.clone())
        .with_instance_type_parameters(vars(["K"]));
        let goal = GoalDescription::new(
            "register",
            details,
            vec![
                Parameter::regular("value", TypeRef::var("V"))
                    .with_projection(Projection::Field("value".into())),
                Parameter::regular("key", TypeRef::var("K"))
                    .with_projection(Projection::Field("key".into())),
                Parameter::regular("label", TypeRef::simple("String"))
                    .with_projection(Projection::Field("label".into())),
            ],
            VariantRequest::builder_and_updater(),
        )
        .unwrap();
        let goal = run(&goal);
        let entry = goal
            .entry_points
            .iter()
            .find(|e| e.variant == Variant::Updater)
            .unwrap();
        assert_eq!(entry.signature.type_parameters, declared);
        assert_eq!(
            entry.signature.clone_bounds,
            vec![TypeRef::var("V"), TypeRef::var("K")]
        );
        assert!(entry.signature.default_bounds.is_empty());
        assert!(goal.entry_points[0].signature.clone_bounds.is_empty());
    }
}
