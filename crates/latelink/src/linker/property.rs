//! Property adapter.
//!
//! Named property resolution walks a fixed priority chain: declared accessor,
//! declared field, the synthetic `"length"` property on indexable receivers,
//! the synthetic `"static"` property on type tokens, and static members on a
//! static-namespace receiver. A fixed name that resolves to nothing is a hard
//! link error; a runtime-supplied name that resolves to nothing yields null
//! on read (absence is a value) but still fails on write (a write cannot
//! silently vanish).

use std::sync::Arc;

use crate::class::{ClassSpec, GetterFn, MemberKind, SetterFn};
use crate::guard::Guard;
use crate::linker::{no_applicable, vet_with, LinkedInvocation, Linker};
use crate::ops::{AccessMode, CallDescriptor, StandardOperation};
use crate::policy::SecurityPolicy;
use crate::value::{ShapeKind, Value};
use crate::{LinkError, LinkResult};

/// A resolved read strategy, owning everything needed to apply it.
enum PropGet {
    Getter(Arc<GetterFn>),
    Field(usize),
    Length,
    StaticToken,
    StaticField(Arc<ClassSpec>, usize),
}

/// A resolved write strategy.
enum PropSet {
    Setter(Arc<SetterFn>),
    Field(usize),
    StaticField(Arc<ClassSpec>, usize),
}

/// Walk the read priority chain. `Ok(None)` means the name is absent on this
/// receiver; a policy denial is an error, never absence.
fn resolve_get(
    policy: &dyn SecurityPolicy,
    mode: AccessMode,
    receiver: &Value,
    name: &str,
) -> LinkResult<Option<PropGet>> {
    match receiver {
        Value::Object(obj) => {
            let class = obj.class();
            if let Some(acc) = class.accessor(name) {
                if super::visible(acc.visibility(), mode) {
                    if let Some(getter) = acc.getter() {
                        let member = member_ref(class.name(), name, MemberKind::Accessor, acc.sensitive());
                        vet_with(policy, &member, mode)?;
                        return Ok(Some(PropGet::Getter(getter.clone())));
                    }
                }
            }
            if let Some(field) = class.field(name) {
                if super::visible(field.visibility(), mode) {
                    let member = member_ref(class.name(), name, MemberKind::Field, field.sensitive());
                    vet_with(policy, &member, mode)?;
                    return Ok(Some(PropGet::Field(field.slot())));
                }
            }
            Ok(None)
        }
        Value::Array(_) | Value::List(_) if name == "length" => Ok(Some(PropGet::Length)),
        Value::Class(_) if name == "static" => Ok(Some(PropGet::StaticToken)),
        Value::StaticNamespace(class) => {
            if let Some(field) = class.static_field(name) {
                if super::visible(field.visibility(), mode) {
                    let member =
                        member_ref(class.name(), name, MemberKind::StaticField, field.sensitive());
                    vet_with(policy, &member, mode)?;
                    return Ok(Some(PropGet::StaticField(class.clone(), field.slot())));
                }
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

/// Walk the write chain: setter accessor, writable field, writable static
/// field. Read-only members do not count as settable targets.
fn resolve_set(
    policy: &dyn SecurityPolicy,
    mode: AccessMode,
    receiver: &Value,
    name: &str,
) -> LinkResult<Option<PropSet>> {
    match receiver {
        Value::Object(obj) => {
            let class = obj.class();
            if let Some(acc) = class.accessor(name) {
                if super::visible(acc.visibility(), mode) {
                    if let Some(setter) = acc.setter() {
                        let member = member_ref(class.name(), name, MemberKind::Accessor, acc.sensitive());
                        vet_with(policy, &member, mode)?;
                        return Ok(Some(PropSet::Setter(setter.clone())));
                    }
                }
            }
            if let Some(field) = class.field(name) {
                if super::visible(field.visibility(), mode) && field.writable() {
                    let member = member_ref(class.name(), name, MemberKind::Field, field.sensitive());
                    vet_with(policy, &member, mode)?;
                    return Ok(Some(PropSet::Field(field.slot())));
                }
            }
            Ok(None)
        }
        Value::StaticNamespace(class) => {
            if let Some(field) = class.static_field(name) {
                if super::visible(field.visibility(), mode) && field.writable() {
                    let member =
                        member_ref(class.name(), name, MemberKind::StaticField, field.sensitive());
                    vet_with(policy, &member, mode)?;
                    return Ok(Some(PropSet::StaticField(class.clone(), field.slot())));
                }
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

fn member_ref<'a>(
    class_name: &'a str,
    member_name: &'a str,
    kind: MemberKind,
    sensitive: bool,
) -> crate::policy::MemberRef<'a> {
    crate::policy::MemberRef { class_name, member_name, kind, sensitive }
}

fn apply_get(resolution: &PropGet, receiver: &Value) -> LinkResult<Value> {
    match resolution {
        PropGet::Getter(getter) => getter(receiver),
        PropGet::Field(slot) => match receiver {
            Value::Object(obj) => Ok(obj.get_slot(*slot).unwrap_or(Value::Null)),
            _ => Err(mismatch("object", receiver)),
        },
        PropGet::Length => match receiver {
            Value::Array(arr) => Ok(Value::Int(arr.len() as i64)),
            Value::List(list) => Ok(Value::Int(list.len() as i64)),
            _ => Err(mismatch("indexable container", receiver)),
        },
        PropGet::StaticToken => match receiver {
            Value::Class(class) => Ok(Value::StaticNamespace(class.clone())),
            _ => Err(mismatch("class", receiver)),
        },
        PropGet::StaticField(class, slot) => Ok(class.static_get(*slot).unwrap_or(Value::Null)),
    }
}

// A rejected slot write surfaces as an unresolved-write failure rather than
// vanishing; storage sized from the class table makes it unreachable in
// practice, but the write contract does not rely on that.
fn apply_set(resolution: &PropSet, receiver: &Value, name: &str, value: Value) -> LinkResult<Value> {
    match resolution {
        PropSet::Setter(setter) => {
            setter(receiver, value)?;
            Ok(Value::Null)
        }
        PropSet::Field(slot) => match receiver {
            Value::Object(obj) => {
                if !obj.set_slot(*slot, value) {
                    return Err(LinkError::RuntimeUnresolved { name: name.to_string() });
                }
                Ok(Value::Null)
            }
            _ => Err(mismatch("object", receiver)),
        },
        PropSet::StaticField(class, slot) => {
            if !class.static_set(*slot, value) {
                return Err(LinkError::RuntimeUnresolved { name: name.to_string() });
            }
            Ok(Value::Null)
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> LinkError {
    LinkError::TypeMismatch { expected, found: found.shape_name() }
}

/// Guard appropriate for a read resolution on the sampled receiver.
fn get_guard(resolution: &PropGet, receiver: &Value) -> Guard {
    match resolution {
        PropGet::Getter(_) | PropGet::Field(_) => match receiver {
            Value::Object(obj) => Guard::InstanceOf(obj.class().id()),
            _ => Guard::Shape(receiver.shape()),
        },
        // The target re-reads the live receiver, so any receiver of the
        // same container family may reuse it.
        PropGet::Length => Guard::Shape(receiver.shape()),
        // The target mints a token for whatever class flows in.
        PropGet::StaticToken => Guard::Shape(ShapeKind::Class),
        PropGet::StaticField(class, _) => Guard::StaticOf(class.id()),
    }
}

fn set_guard(resolution: &PropSet, receiver: &Value) -> Guard {
    match resolution {
        PropSet::Setter(_) | PropSet::Field(_) => match receiver {
            Value::Object(obj) => Guard::InstanceOf(obj.class().id()),
            _ => Guard::Shape(receiver.shape()),
        },
        PropSet::StaticField(class, _) => Guard::StaticOf(class.id()),
    }
}

pub(super) fn link_get(
    linker: &Linker,
    descriptor: &CallDescriptor,
    receiver: &Value,
) -> LinkResult<LinkedInvocation> {
    let mode = descriptor.access_mode();
    match descriptor.operation().fixed_name() {
        Some(name) => {
            let resolution = resolve_get(&**linker.policy(), mode, receiver, name)?
                .ok_or_else(|| no_applicable(StandardOperation::GetProperty, name))?;
            let guard = get_guard(&resolution, receiver);
            Ok(LinkedInvocation::new(
                guard,
                Arc::new(move |recv, _args| apply_get(&resolution, recv)),
            ))
        }
        None => {
            // Name arrives as the first runtime argument; the chain runs
            // fresh on every call and absence is a null result.
            let policy = linker.policy().clone();
            Ok(LinkedInvocation::new(
                Guard::Always,
                Arc::new(move |recv, args| {
                    let name = dynamic_name(args)?;
                    match resolve_get(&*policy, mode, recv, name)? {
                        Some(resolution) => apply_get(&resolution, recv),
                        None => Ok(Value::Null),
                    }
                }),
            ))
        }
    }
}

pub(super) fn link_set(
    linker: &Linker,
    descriptor: &CallDescriptor,
    receiver: &Value,
) -> LinkResult<LinkedInvocation> {
    let mode = descriptor.access_mode();
    match descriptor.operation().fixed_name() {
        Some(name) => {
            let resolution = resolve_set(&**linker.policy(), mode, receiver, name)?
                .ok_or_else(|| no_applicable(StandardOperation::SetProperty, name))?;
            let guard = set_guard(&resolution, receiver);
            let name: Arc<str> = Arc::from(name);
            Ok(LinkedInvocation::new(
                guard,
                Arc::new(move |recv, args| {
                    let value = args.first().cloned().unwrap_or(Value::Null);
                    apply_set(&resolution, recv, &name, value)
                }),
            ))
        }
        None => {
            let policy = linker.policy().clone();
            Ok(LinkedInvocation::new(
                Guard::Always,
                Arc::new(move |recv, args| {
                    let name = dynamic_name(args)?;
                    let value = args.get(1).cloned().unwrap_or(Value::Null);
                    match resolve_set(&*policy, mode, recv, name)? {
                        Some(resolution) => apply_set(&resolution, recv, name, value),
                        None => Err(LinkError::RuntimeUnresolved { name: name.to_string() }),
                    }
                }),
            ))
        }
    }
}

fn dynamic_name(args: &[Value]) -> LinkResult<&str> {
    match args.first() {
        Some(Value::Str(name)) => Ok(name),
        Some(other) => Err(mismatch("string name", other)),
        None => Err(LinkError::TypeMismatch { expected: "string name", found: "no argument" }),
    }
}
