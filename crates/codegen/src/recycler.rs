//! Per-thread recycling holders: the slot struct (when the goal needs
//! one) and the `thread_local!` static the entry function leases from.

use crate::emit::{line, Ctx};
use stagecraft_core::{RecycleSlot, RecyclerHolder};

pub(crate) fn emit_holder(out: &mut String, ctx: &Ctx, holder: &RecyclerHolder) {
    let slot = holder.slot_type().to_string();

    if let RecycleSlot::Generated { name, fields } = &holder.slot {
        line(out, 0, "");
        line(out, 0, "#[derive(Default)]");
        line(out, 0, &format!("struct {} {{", name));
        for field in fields {
            line(out, 1, &format!("{}: Option<{}>,", field.name, field.ty));
        }
        line(out, 0, "}");
    }

    line(out, 0, "");
    line(out, 0, "thread_local! {");
    line(
        out,
        1,
        &format!(
            "static {}: {}::Recycler<{}> = const {{ {}::Recycler::new(\"{}\") }};",
            holder.static_name, ctx.rt, slot, ctx.rt, slot
        ),
    );
    line(out, 0, "}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_core::pass3_synthesize::{SlotField, Variant};
    use stagecraft_core::TypeRef;

    #[test]
    fn test_generated_slot_has_optional_fields() {
        let holder = RecyclerHolder {
            variant: Variant::Builder,
            static_name: "PERSON_RECYCLED_BUILDER".into(),
            slot: RecycleSlot::Generated {
                name: "PersonRecycledBuilder".into(),
                fields: vec![SlotField {
                    name: "name".into(),
                    ty: TypeRef::simple("String"),
                }],
            },
        };
        let ctx = Ctx {
            goal: "person",
            rt: "rt",
        };
        let mut out = String::new();
        emit_holder(&mut out, &ctx, &holder);
        assert!(out.contains("struct PersonRecycledBuilder {\n    name: Option<String>,\n}"));
        assert!(out.contains(
            "static PERSON_RECYCLED_BUILDER: rt::Recycler<PersonRecycledBuilder> = const { rt::Recycler::new(\"PersonRecycledBuilder\") };"
        ));
    }

    #[test]
    fn test_bean_slot_reuses_bean_type() {
        let holder = RecyclerHolder {
            variant: Variant::Updater,
            static_name: "SETTINGS_RECYCLED_UPDATER".into(),
            slot: RecycleSlot::Bean {
                ty: TypeRef::simple("Settings"),
            },
        };
        let ctx = Ctx {
            goal: "settings",
            rt: "rt",
        };
        let mut out = String::new();
        emit_holder(&mut out, &ctx, &holder);
        assert!(!out.contains("struct"));
        assert!(out.contains("rt::Recycler<Settings>"));
    }
}
