//! Updater variant: one struct holding the current values, update
//! methods in any order, and `done` to commit.

use crate::emit::{
    body_open, fallible, generics, input_type, invoke, line, mutation_line, null_check_line, ok_if,
    struct_decl, struct_literal, vis, Ctx,
};
use crate::error::CodegenError;
use crate::recycler;
use stagecraft_core::pass3_synthesize::RECEIVER;
use stagecraft_core::{Commit, EntryPoint, MutableContract, Mutation, Projection, UpdateMethod};

enum State {
    Fields,
    Bean,
    Leased,
}

fn state_of(contract: &MutableContract) -> State {
    match (&contract.recycled, &contract.commit) {
        (Some(_), _) => State::Leased,
        (None, Commit::ReturnBean { .. }) => State::Bean,
        (None, Commit::Reinvoke { .. }) => State::Fields,
    }
}

fn read_projection(projection: &Projection) -> String {
    match projection {
        Projection::Field(field) => format!("source.{}.clone()", field),
        Projection::Method(method) => format!("source.{}()", method),
    }
}

pub(crate) fn emit_updater(
    out: &mut String,
    ctx: &Ctx,
    contract: &MutableContract,
    entry: &EntryPoint,
) -> Result<(), CodegenError> {
    let visibility = vis(entry.signature.access);
    let state = state_of(contract);
    let params = generics(&contract.type_parameters);

    if let Some(holder) = &contract.recycled {
        recycler::emit_holder(out, ctx, holder);
    }

    let fields: Vec<(String, String)> = match state {
        State::Leased => {
            let slot = contract
                .recycled
                .as_ref()
                .map(|h| h.slot_type().to_string())
                .unwrap_or_default();
            vec![("lease".to_string(), format!("{}::Lease<{}>", ctx.rt, slot))]
        }
        State::Bean => vec![("bean".to_string(), contract.source_type.to_string())],
        State::Fields => contract
            .receiver
            .iter()
            .map(|r| (RECEIVER.to_string(), r.to_string()))
            .chain(contract.fields.iter().map(|f| (f.name.clone(), f.ty.to_string())))
            .collect(),
    };

    line(out, 0, "");
    line(
        out,
        0,
        &format!(
            "/// Changes to an existing `{}` value, applied in any order.",
            contract.source_type
        ),
    );
    struct_decl(out, visibility, &contract.name, &params, &fields);

    emit_entry(out, ctx, contract, entry, &state)?;

    line(out, 0, "");
    line(out, 0, &format!("impl{} {}{} {{", params, contract.name, params));
    for method in &contract.update_methods {
        emit_update_method(out, ctx, method, &state, visibility)?;
    }
    emit_commit(out, ctx, contract, &state, visibility)?;
    line(out, 0, "}");
    Ok(())
}

fn emit_entry(
    out: &mut String,
    ctx: &Ctx,
    contract: &MutableContract,
    entry: &EntryPoint,
    state: &State,
) -> Result<(), CodegenError> {
    let sig = &entry.signature;
    let params: Vec<String> = sig
        .parameters
        .iter()
        .map(|p| {
            let amp = if p.by_reference { "&" } else { "" };
            format!("{}: {}{}", p.name, amp, p.ty)
        })
        .collect();
    let updater = sig.returns.to_string();
    let returns = match &sig.error {
        Some(_) => format!("Result<{}, {}::UsageError>", updater, ctx.rt),
        None => updater,
    };

    line(out, 0, "");
    line(
        out,
        0,
        &format!(
            "/// Start updating an existing `{}`.",
            contract.source_type
        ),
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
    match state {
        State::Fields => {
            let mut init: Vec<String> = contract.receiver.iter().map(|_| RECEIVER.to_string()).collect();
            init.extend(
                contract
                    .fields
                    .iter()
                    .map(|f| format!("{}: {}", f.name, read_projection(&f.projection))),
            );
            line(out, 1, &struct_literal(&contract.name, &init));
        }
        State::Bean => {
            line(out, 1, &format!("{} {{ bean: source }}", contract.name));
        }
        State::Leased => {
            let holder = contract
                .recycled
                .as_ref()
                .ok_or_else(|| ctx.error("recycled updater without a holder"))?;
            line(
                out,
                1,
                &format!("let mut lease = {}::lease(&{})?;", ctx.rt, holder.static_name),
            );
            if matches!(contract.commit, Commit::ReturnBean { .. }) {
                line(out, 1, "*lease = source;");
            } else {
                if contract.receiver.is_some() {
                    line(out, 1, &format!("lease.{} = Some({});", RECEIVER, RECEIVER));
                }
                for field in &contract.fields {
                    line(
                        out,
                        1,
                        &format!(
                            "lease.{} = Some({});",
                            field.name,
                            read_projection(&field.projection)
                        ),
                    );
                }
            }
            line(out, 1, &format!("Ok({} {{ lease }})", contract.name));
        }
    }
    line(out, 0, "}");
    Ok(())
}

fn emit_update_method(
    out: &mut String,
    ctx: &Ctx,
    method: &UpdateMethod,
    state: &State,
    visibility: &str,
) -> Result<(), CodegenError> {
    let returns = fallible(
        ctx,
        "Self",
        &method.thrown,
        &format!("update '{}'", method.parameter),
    )?;
    line(
        out,
        1,
        &format!(
            "{}fn {}(mut self, {}: {}) -> {} {{",
            visibility,
            method.name,
            method.parameter,
            input_type(&method.input),
            returns
        ),
    );
    if let Some(check) = null_check_line(ctx, method.null_check, &method.parameter) {
        line(out, 2, &check);
    }

    let target = match state {
        State::Leased => "self.lease",
        State::Bean => "self.bean",
        State::Fields => "self",
    };
    let stmt = match (&method.mutation, state) {
        (Mutation::Argument, State::Leased) => Some(format!(
            "self.lease.{} = Some({});",
            method.parameter, method.parameter
        )),
        (Mutation::Argument, _) => Some(format!(
            "self.{} = {};",
            method.parameter, method.parameter
        )),
        (mutation, _) => mutation_line(
            ctx,
            target,
            mutation,
            method.null_check,
            &method.parameter,
            &method.thrown,
        ),
    };
    if let Some(stmt) = stmt {
        line(out, 2, &stmt);
    }
    line(out, 2, &ok_if(&method.thrown, "self"));
    line(out, 1, "}");
    Ok(())
}

fn emit_commit(
    out: &mut String,
    ctx: &Ctx,
    contract: &MutableContract,
    state: &State,
    visibility: &str,
) -> Result<(), CodegenError> {
    line(out, 0, "");
    match &contract.commit {
        Commit::ReturnBean { ty } => {
            let leased = matches!(state, State::Leased);
            line(
                out,
                1,
                &format!(
                    "{}fn {}({}self) -> {} {{",
                    visibility,
                    contract.commit_method,
                    if leased { "mut " } else { "" },
                    ty
                ),
            );
            if leased {
                line(out, 2, "std::mem::take(&mut *self.lease)");
            } else {
                line(out, 2, "self.bean");
            }
        }
        Commit::Reinvoke {
            invocation,
            arguments,
            return_type,
            thrown_exceptions,
        } => {
            let returns = fallible(
                ctx,
                &return_type.to_string(),
                thrown_exceptions,
                "the target invocation",
            )?;
            let leased = matches!(state, State::Leased);
            line(
                out,
                1,
                &format!(
                    "{}fn {}{}({}self) -> {} {{",
                    visibility,
                    contract.commit_method,
                    generics(&contract.commit_method_params),
                    if leased { "mut " } else { "" },
                    returns
                ),
            );
            let call = if leased {
                let mut staged: Vec<&str> = Vec::new();
                if contract.receiver.is_some() {
                    staged.push(RECEIVER);
                }
                staged.extend(arguments.iter().map(String::as_str));
                for name in staged {
                    line(
                        out,
                        2,
                        &format!(
                            "let {} = {}::take_staged(&mut self.lease.{}, \"{}\");",
                            name, ctx.rt, name, name
                        ),
                    );
                }
                invoke(ctx, invocation, RECEIVER, arguments)?
            } else {
                let args: Vec<String> = arguments.iter().map(|a| format!("self.{}", a)).collect();
                invoke(ctx, invocation, &format!("self.{}", RECEIVER), &args)?
            };
            line(out, 2, &call);
        }
    }
    line(out, 1, "}");
    Ok(())
}
