//! Builder variant: one typestate struct per step, a terminal struct
//! with `build`, and the entry function. Zero-parameter goals render as
//! a single factory function instead.

use crate::emit::{
    body_open, fallible, generics, input_type, invoke, line, mutation_line, null_check_line, ok_if,
    struct_decl, struct_literal, vis, Ctx,
};
use crate::error::CodegenError;
use crate::recycler;
use stagecraft_core::pass3_synthesize::RECEIVER;
use stagecraft_core::{
    EntryPoint, FactoryMethod, InterfaceChain, Invocation, Mutation, StepInterface, TargetKind,
};

/// How the values supplied so far are carried between steps.
enum State {
    /// Each stored value is a field of the step struct.
    Fields,
    /// A bean under construction, in field `bean`.
    Bean,
    /// A lease on the per-thread slot, in field `lease`.
    Leased,
}

fn state_of(chain: &InterfaceChain) -> State {
    match (&chain.recycled, chain.kind) {
        (Some(_), _) => State::Leased,
        (None, TargetKind::Bean) => State::Bean,
        (None, _) => State::Fields,
    }
}

/// `(field, type)` pairs a struct at position `k` holds (`k == steps`
/// is the terminal).
fn state_fields(ctx: &Ctx, chain: &InterfaceChain, k: usize) -> Vec<(String, String)> {
    match state_of(chain) {
        State::Leased => {
            let slot = chain
                .recycled
                .as_ref()
                .map(|h| h.slot_type().to_string())
                .unwrap_or_default();
            vec![("lease".to_string(), format!("{}::Lease<{}>", ctx.rt, slot))]
        }
        State::Bean => {
            let bean = chain.receiver.as_ref().map(|t| t.to_string()).unwrap_or_default();
            vec![("bean".to_string(), bean)]
        }
        State::Fields => {
            let mut fields = Vec::new();
            if let Some(receiver) = &chain.receiver {
                fields.push((RECEIVER.to_string(), receiver.to_string()));
            }
            fields.extend(
                chain
                    .stored_before(k)
                    .into_iter()
                    .map(|m| (m.parameter.clone(), input_type(&m.input))),
            );
            fields
        }
    }
}

/// Field initializers that move the whole state of `self` forward.
fn carry(fields: &[(String, String)]) -> Vec<String> {
    fields
        .iter()
        .map(|(name, _)| format!("{}: self.{}", name, name))
        .collect()
}

pub(crate) fn emit_chain(
    out: &mut String,
    ctx: &Ctx,
    chain: &InterfaceChain,
    entry: &EntryPoint,
) -> Result<(), CodegenError> {
    let visibility = vis(entry.signature.access);
    let total = chain.steps.len();

    if let Some(holder) = &chain.recycled {
        recycler::emit_holder(out, ctx, holder);
    }

    emit_entry(out, ctx, chain, entry)?;

    for (k, step) in chain.steps.iter().enumerate() {
        line(out, 0, "");
        line(
            out,
            0,
            &format!(
                "/// Step {} of {} for `{}`: supply `{}`.",
                k + 1,
                total,
                chain.goal_name,
                step.method.parameter
            ),
        );
        let fields = state_fields(ctx, chain, k);
        let params = generics(&step.state_parameters);
        struct_decl(out, visibility, &step.name, &params, &fields);
        line(out, 0, "");
        line(out, 0, &format!("impl{} {}{} {{", params, step.name, params));
        emit_step_method(out, ctx, chain, k, step, &fields, visibility)?;
        line(out, 0, "}");
    }

    emit_terminal(out, ctx, chain, visibility)
}

fn emit_entry(
    out: &mut String,
    ctx: &Ctx,
    chain: &InterfaceChain,
    entry: &EntryPoint,
) -> Result<(), CodegenError> {
    let sig = &entry.signature;
    let first = chain.first_step().to_string();
    let params: Vec<String> = sig
        .parameters
        .iter()
        .map(|p| format!("{}: {}", p.name, p.ty))
        .collect();
    let returns = match &sig.error {
        Some(_) => format!("Result<{}, {}::UsageError>", first, ctx.rt),
        None => first.clone(),
    };
    let first_name = chain
        .steps
        .first()
        .map(|s| s.name.as_str())
        .unwrap_or(chain.terminal.name.as_str());

    line(out, 0, "");
    line(
        out,
        0,
        &format!("/// Start building `{}`, one argument per step.", chain.goal_name),
    );
    line(
        out,
        0,
        &format!(
            "{}fn {}{}({}) -> {}{}",
            vis(sig.access),
            sig.name,
            generics(&sig.type_parameters),
            params.join(", "),
            returns,
            body_open(sig),
        ),
    );

    match state_of(chain) {
        State::Fields => {
            let init: Vec<String> = sig.parameters.iter().map(|p| p.name.clone()).collect();
            line(out, 1, &struct_literal(first_name, &init));
        }
        State::Bean => {
            line(out, 1, &format!("{} {{ bean: Default::default() }}", first_name));
        }
        State::Leased => {
            let holder = chain
                .recycled
                .as_ref()
                .ok_or_else(|| ctx.error("recycled chain without a holder"))?;
            if sig.parameters.is_empty() {
                line(
                    out,
                    1,
                    &format!(
                        "Ok({} {{ lease: {}::lease(&{})? }})",
                        first_name, ctx.rt, holder.static_name
                    ),
                );
            } else {
                line(
                    out,
                    1,
                    &format!("let mut lease = {}::lease(&{})?;", ctx.rt, holder.static_name),
                );
                for p in &sig.parameters {
                    line(out, 1, &format!("lease.{} = Some({});", p.name, p.name));
                }
                line(out, 1, &format!("Ok({} {{ lease }})", first_name));
            }
        }
    }
    line(out, 0, "}");
    Ok(())
}

fn emit_step_method(
    out: &mut String,
    ctx: &Ctx,
    chain: &InterfaceChain,
    k: usize,
    step: &StepInterface,
    fields: &[(String, String)],
    visibility: &str,
) -> Result<(), CodegenError> {
    let method = &step.method;
    let next_name = chain
        .steps
        .get(k + 1)
        .map(|s| s.name.as_str())
        .unwrap_or(chain.terminal.name.as_str());
    let returns = fallible(
        ctx,
        &method.returns.to_string(),
        &method.thrown,
        &format!("step '{}'", method.parameter),
    )?;
    let state = state_of(chain);
    let mutates = !matches!(state, State::Fields);

    line(
        out,
        1,
        &format!(
            "{}fn {}{}({}self, {}: {}) -> {} {{",
            visibility,
            method.name,
            generics(&method.method_type_parameters),
            if mutates { "mut " } else { "" },
            method.parameter,
            input_type(&method.input),
            returns,
        ),
    );
    if let Some(check) = null_check_line(ctx, method.null_check, &method.parameter) {
        line(out, 2, &check);
    }

    let next = match state {
        State::Fields => {
            let mut init = carry(fields);
            init.push(method.parameter.clone());
            struct_literal(next_name, &init)
        }
        State::Bean => {
            if let Some(stmt) = mutation_line(
                ctx,
                "self.bean",
                &method.mutation,
                method.null_check,
                &method.parameter,
                &method.thrown,
            ) {
                line(out, 2, &stmt);
            }
            format!("{} {{ bean: self.bean }}", next_name)
        }
        State::Leased => {
            let stmt = match method.mutation {
                Mutation::Argument => Some(format!(
                    "self.lease.{} = Some({});",
                    method.parameter, method.parameter
                )),
                _ => mutation_line(
                    ctx,
                    "self.lease",
                    &method.mutation,
                    method.null_check,
                    &method.parameter,
                    &method.thrown,
                ),
            };
            if let Some(stmt) = stmt {
                line(out, 2, &stmt);
            }
            format!("{} {{ lease: self.lease }}", next_name)
        }
    };
    line(out, 2, &ok_if(&method.thrown, &next));
    line(out, 1, "}");
    Ok(())
}

fn emit_terminal(
    out: &mut String,
    ctx: &Ctx,
    chain: &InterfaceChain,
    visibility: &str,
) -> Result<(), CodegenError> {
    let terminal = &chain.terminal;
    let fields = state_fields(ctx, chain, chain.steps.len());
    let params = generics(&terminal.state_parameters);
    let returns = fallible(
        ctx,
        &terminal.return_type.to_string(),
        &terminal.thrown_exceptions,
        "the target invocation",
    )?;

    line(out, 0, "");
    line(
        out,
        0,
        &format!("/// Every argument of `{}` supplied; call `build`.", chain.goal_name),
    );
    struct_decl(out, visibility, &terminal.name, &params, &fields);
    line(out, 0, "");
    line(out, 0, &format!("impl{} {}{} {{", params, terminal.name, params));

    let state = state_of(chain);
    let leased = matches!(state, State::Leased);
    line(
        out,
        1,
        &format!(
            "{}fn {}{}({}self) -> {} {{",
            visibility,
            terminal.method_name,
            generics(&terminal.method_type_parameters),
            if leased { "mut " } else { "" },
            returns,
        ),
    );

    let body = match (&state, &terminal.invocation) {
        (State::Bean, _) => "self.bean".to_string(),
        (State::Leased, Invocation::Bean { .. }) => {
            "std::mem::take(&mut *self.lease)".to_string()
        }
        (State::Leased, invocation) => {
            if chain.receiver.is_some() {
                line(
                    out,
                    2,
                    &format!(
                        "let {} = {}::take_staged(&mut self.lease.{}, \"{}\");",
                        RECEIVER, ctx.rt, RECEIVER, RECEIVER
                    ),
                );
            }
            for arg in &terminal.arguments {
                line(
                    out,
                    2,
                    &format!(
                        "let {} = {}::take_staged(&mut self.lease.{}, \"{}\");",
                        arg, ctx.rt, arg, arg
                    ),
                );
            }
            invoke(ctx, invocation, RECEIVER, &terminal.arguments)?
        }
        (State::Fields, invocation) => {
            let args: Vec<String> = terminal
                .arguments
                .iter()
                .map(|a| format!("self.{}", a))
                .collect();
            invoke(ctx, invocation, &format!("self.{}", RECEIVER), &args)?
        }
    };
    line(out, 2, &body);
    line(out, 1, "}");
    line(out, 0, "}");
    Ok(())
}

pub(crate) fn emit_factory(
    out: &mut String,
    ctx: &Ctx,
    factory: &FactoryMethod,
    entry: &EntryPoint,
) -> Result<(), CodegenError> {
    let sig = &entry.signature;
    let returns = fallible(
        ctx,
        &factory.return_type.to_string(),
        &factory.thrown_exceptions,
        "the target invocation",
    )?;
    let params: Vec<String> = sig
        .parameters
        .iter()
        .map(|p| format!("{}: {}", p.name, p.ty))
        .collect();

    line(out, 0, "");
    line(
        out,
        0,
        &format!("/// `{}` takes no arguments; build it directly.", entry.goal_name),
    );
    line(
        out,
        0,
        &format!(
            "{}fn {}{}({}) -> {}{}",
            vis(factory.access),
            factory.name,
            generics(&factory.type_parameters),
            params.join(", "),
            returns,
            body_open(sig),
        ),
    );
    line(out, 1, &invoke(ctx, &factory.invocation, RECEIVER, &[])?);
    line(out, 0, "}");
    Ok(())
}
