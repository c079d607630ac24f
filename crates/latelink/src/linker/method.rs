//! Method adapter: overload resolution, method handles, constructors.
//!
//! `GET_METHOD` captures an accessible overload group as a first-class
//! handle without choosing an overload; `CALL` chooses one from the runtime
//! argument types when the handle is invoked. `CALL_METHOD` fuses the two,
//! binding the overload at link time when the descriptor's argument types
//! are all concrete and deferring to call time otherwise. `NEW` resolves a
//! constructor overload against the observed arguments and produces an
//! allocating target.

use std::sync::Arc;

use crate::class::{ConstructorSpec, MemberKind, MethodSpec};
use crate::guard::Guard;
use crate::linker::{deny_error, no_applicable, vet_with, LinkedInvocation, Linker};
use crate::ops::{AccessMode, CallDescriptor, StandardOperation, TypeTag};
use crate::policy::{MemberRef, SecurityPolicy, Verdict};
use crate::value::{MethodHandleValue, MethodReceiver, ObjectValue, ShapeKind, Value};
use crate::{LinkError, LinkResult};

/// Total widening cost of calling `params` with `args`, or `None` when the
/// signature is not applicable (arity or type mismatch).
fn score(params: &[TypeTag], args: &[TypeTag]) -> Option<u32> {
    if params.len() != args.len() {
        return None;
    }
    let mut total = 0;
    for (param, arg) in params.iter().zip(args) {
        total += param.accepts(*arg)?;
    }
    Some(total)
}

fn tags_of(args: &[Value]) -> Vec<TypeTag> {
    args.iter().map(TypeTag::of).collect()
}

/// Pick the single lowest-cost applicable overload. A tie at the best cost
/// is ambiguous; no applicable overload is a no-match.
fn choose(
    name: &str,
    overloads: &[Arc<MethodSpec>],
    args: &[TypeTag],
) -> LinkResult<Arc<MethodSpec>> {
    let mut best: Option<(&Arc<MethodSpec>, u32)> = None;
    let mut tied = false;
    for spec in overloads {
        if let Some(cost) = score(spec.params(), args) {
            match best {
                None => {
                    best = Some((spec, cost));
                }
                Some((_, c)) if cost < c => {
                    best = Some((spec, cost));
                    tied = false;
                }
                Some((_, c)) if cost == c => tied = true,
                Some(_) => {}
            }
        }
    }
    match best {
        None => Err(LinkError::NoMatchingOverload { name: name.to_string(), arity: args.len() }),
        Some(_) if tied => Err(LinkError::AmbiguousOverload { name: name.to_string() }),
        Some((spec, _)) => Ok(spec.clone()),
    }
}

fn choose_ctor(
    class_name: &str,
    ctors: &[Arc<ConstructorSpec>],
    args: &[TypeTag],
) -> LinkResult<Arc<ConstructorSpec>> {
    let mut best: Option<(&Arc<ConstructorSpec>, u32)> = None;
    let mut tied = false;
    for ctor in ctors {
        if let Some(cost) = score(ctor.params(), args) {
            match best {
                None => {
                    best = Some((ctor, cost));
                }
                Some((_, c)) if cost < c => {
                    best = Some((ctor, cost));
                    tied = false;
                }
                Some((_, c)) if cost == c => tied = true,
                Some(_) => {}
            }
        }
    }
    match best {
        None => Err(LinkError::NoMatchingOverload {
            name: class_name.to_string(),
            arity: args.len(),
        }),
        Some(_) if tied => Err(LinkError::AmbiguousOverload { name: class_name.to_string() }),
        Some((ctor, _)) => Ok(ctor.clone()),
    }
}

/// Visibility-filter an overload group, then submit survivors to the host
/// policy. A group whose only accessible overloads are all denied is a
/// denial, not an absence.
fn filter_overloads(
    policy: &dyn SecurityPolicy,
    mode: AccessMode,
    class_name: &str,
    name: &str,
    group: &[Arc<MethodSpec>],
    kind: MemberKind,
) -> LinkResult<Vec<Arc<MethodSpec>>> {
    let mut allowed = Vec::new();
    let mut denied = false;
    for spec in group {
        if !super::visible(spec.visibility(), mode) {
            continue;
        }
        let member =
            MemberRef { class_name, member_name: name, kind, sensitive: spec.sensitive() };
        match policy.check(&member, mode) {
            Verdict::Allow => allowed.push(spec.clone()),
            Verdict::Deny => denied = true,
        }
    }
    if allowed.is_empty() && denied {
        return Err(deny_error(mode, name));
    }
    Ok(allowed)
}

pub(super) fn link_get_method(
    linker: &Linker,
    descriptor: &CallDescriptor,
    receiver: &Value,
) -> LinkResult<LinkedInvocation> {
    let name = descriptor
        .operation()
        .fixed_name()
        .ok_or_else(|| no_applicable(StandardOperation::GetMethod, ""))?;
    let mode = descriptor.access_mode();

    let (guard, handle) = match receiver {
        Value::Object(obj) => {
            let class = obj.class();
            let group = class.method_group(name).unwrap_or(&[]);
            let allowed = filter_overloads(
                &**linker.policy(),
                mode,
                class.name(),
                name,
                group,
                MemberKind::Method,
            )?;
            if allowed.is_empty() {
                return Err(no_applicable(StandardOperation::GetMethod, name));
            }
            let handle = MethodHandleValue::new(
                Arc::from(name),
                allowed,
                MethodReceiver::Instance(class.clone()),
            );
            (Guard::InstanceOf(class.id()), handle)
        }
        Value::StaticNamespace(class) => {
            let group = class.static_method_group(name).unwrap_or(&[]);
            let allowed = filter_overloads(
                &**linker.policy(),
                mode,
                class.name(),
                name,
                group,
                MemberKind::StaticMethod,
            )?;
            if allowed.is_empty() {
                return Err(no_applicable(StandardOperation::GetMethod, name));
            }
            let handle = MethodHandleValue::new(
                Arc::from(name),
                allowed,
                MethodReceiver::Static(class.clone()),
            );
            (Guard::StaticOf(class.id()), handle)
        }
        _ => return Err(no_applicable(StandardOperation::GetMethod, name)),
    };

    let handle = Arc::new(handle);
    Ok(LinkedInvocation::new(
        guard,
        Arc::new(move |_recv, _args| Ok(Value::Method(handle.clone()))),
    ))
}

pub(super) fn link_call(
    linker: &Linker,
    descriptor: &CallDescriptor,
) -> LinkResult<LinkedInvocation> {
    let mode = descriptor.access_mode();
    let policy = linker.policy().clone();
    Ok(LinkedInvocation::new(
        Guard::Shape(ShapeKind::Method),
        Arc::new(move |recv, args| match recv {
            Value::Method(handle) => invoke_handle(&*policy, mode, handle, args),
            other => Err(mismatch("method handle", other)),
        }),
    ))
}

/// Invocation-time half of the two-step method protocol: choose an overload
/// from the runtime argument types, vet it, run it.
fn invoke_handle(
    policy: &dyn SecurityPolicy,
    mode: AccessMode,
    handle: &MethodHandleValue,
    args: &[Value],
) -> LinkResult<Value> {
    match handle.receiver() {
        MethodReceiver::Instance(class) => {
            let this = args.first().ok_or(LinkError::TypeMismatch {
                expected: "receiver argument",
                found: "no argument",
            })?;
            let obj = this.as_object().ok_or_else(|| mismatch("object receiver", this))?;
            if obj.class().id() != class.id() {
                return Err(mismatch("receiver of the handle's class", this));
            }
            let margs = &args[1..];
            let spec = choose(handle.name(), handle.overloads(), &tags_of(margs))?;
            let member = MemberRef {
                class_name: class.name(),
                member_name: handle.name(),
                kind: MemberKind::Method,
                sensitive: spec.sensitive(),
            };
            vet_with(policy, &member, mode)?;
            spec.invoke(this, margs)
        }
        MethodReceiver::Static(class) => {
            // First actual is the (ignored) receiver slot when present.
            let margs = if args.is_empty() { args } else { &args[1..] };
            let spec = choose(handle.name(), handle.overloads(), &tags_of(margs))?;
            let member = MemberRef {
                class_name: class.name(),
                member_name: handle.name(),
                kind: MemberKind::StaticMethod,
                sensitive: spec.sensitive(),
            };
            vet_with(policy, &member, mode)?;
            spec.invoke(&Value::Null, margs)
        }
    }
}

pub(super) fn link_call_method(
    linker: &Linker,
    descriptor: &CallDescriptor,
    receiver: &Value,
) -> LinkResult<LinkedInvocation> {
    let name = descriptor
        .operation()
        .fixed_name()
        .ok_or_else(|| no_applicable(StandardOperation::CallMethod, ""))?;
    let mode = descriptor.access_mode();
    let static_tags = descriptor.arg_types().to_vec();
    let bind_now = static_tags.iter().all(|t| t.is_concrete());

    match receiver {
        Value::Object(obj) => {
            let class = obj.class().clone();
            let group = class.method_group(name).unwrap_or(&[]);
            let allowed = filter_overloads(
                &**linker.policy(),
                mode,
                class.name(),
                name,
                group,
                MemberKind::Method,
            )?;
            if allowed.is_empty() {
                return Err(no_applicable(StandardOperation::CallMethod, name));
            }
            let guard = Guard::InstanceOf(class.id());

            if bind_now {
                // Argument types known at link time: overload choice and
                // its failures happen here.
                let spec = choose(name, &allowed, &static_tags)?;
                let member = MemberRef {
                    class_name: class.name(),
                    member_name: name,
                    kind: MemberKind::Method,
                    sensitive: spec.sensitive(),
                };
                linker.vet(&member, mode)?;
                Ok(LinkedInvocation::new(
                    guard,
                    Arc::new(move |recv, args| {
                        // The guard only covers the receiver; re-check the
                        // bound overload against the actual argument list.
                        if score(spec.params(), &tags_of(args)).is_none() {
                            return Err(LinkError::NoMatchingOverload {
                                name: spec.name().to_string(),
                                arity: args.len(),
                            });
                        }
                        spec.invoke(recv, args)
                    }),
                ))
            } else {
                let policy = linker.policy().clone();
                let name: Arc<str> = Arc::from(name);
                Ok(LinkedInvocation::new(
                    guard,
                    Arc::new(move |recv, args| {
                        let spec = choose(&name, &allowed, &tags_of(args))?;
                        let member = MemberRef {
                            class_name: class.name(),
                            member_name: &name,
                            kind: MemberKind::Method,
                            sensitive: spec.sensitive(),
                        };
                        vet_with(&*policy, &member, mode)?;
                        spec.invoke(recv, args)
                    }),
                ))
            }
        }
        Value::StaticNamespace(class) => {
            let class = class.clone();
            let group = class.static_method_group(name).unwrap_or(&[]);
            let allowed = filter_overloads(
                &**linker.policy(),
                mode,
                class.name(),
                name,
                group,
                MemberKind::StaticMethod,
            )?;
            if allowed.is_empty() {
                return Err(no_applicable(StandardOperation::CallMethod, name));
            }
            let guard = Guard::StaticOf(class.id());

            if bind_now {
                let spec = choose(name, &allowed, &static_tags)?;
                let member = MemberRef {
                    class_name: class.name(),
                    member_name: name,
                    kind: MemberKind::StaticMethod,
                    sensitive: spec.sensitive(),
                };
                linker.vet(&member, mode)?;
                Ok(LinkedInvocation::new(
                    guard,
                    Arc::new(move |_recv, args| {
                        if score(spec.params(), &tags_of(args)).is_none() {
                            return Err(LinkError::NoMatchingOverload {
                                name: spec.name().to_string(),
                                arity: args.len(),
                            });
                        }
                        spec.invoke(&Value::Null, args)
                    }),
                ))
            } else {
                let policy = linker.policy().clone();
                let name: Arc<str> = Arc::from(name);
                Ok(LinkedInvocation::new(
                    guard,
                    Arc::new(move |_recv, args| {
                        let spec = choose(&name, &allowed, &tags_of(args))?;
                        let member = MemberRef {
                            class_name: class.name(),
                            member_name: &name,
                            kind: MemberKind::StaticMethod,
                            sensitive: spec.sensitive(),
                        };
                        vet_with(&*policy, &member, mode)?;
                        spec.invoke(&Value::Null, args)
                    }),
                ))
            }
        }
        _ => Err(no_applicable(StandardOperation::CallMethod, name)),
    }
}

pub(super) fn link_new(
    linker: &Linker,
    descriptor: &CallDescriptor,
    receiver: &Value,
    args: &[Value],
) -> LinkResult<LinkedInvocation> {
    let class = match receiver {
        Value::Class(class) => class.clone(),
        _ => return Err(no_applicable(StandardOperation::New, "")),
    };
    let mode = descriptor.access_mode();

    let visible_ctors: Vec<Arc<ConstructorSpec>> = class
        .constructors()
        .iter()
        .filter(|ctor| super::visible(ctor.visibility(), mode))
        .cloned()
        .collect();
    let ctor = choose_ctor(class.name(), &visible_ctors, &tags_of(args))?;
    let member = MemberRef {
        class_name: class.name(),
        member_name: class.name(),
        kind: MemberKind::Constructor,
        sensitive: ctor.sensitive(),
    };
    linker.vet(&member, mode)?;

    let guard = Guard::TypeToken(class.id());
    Ok(LinkedInvocation::new(
        guard,
        Arc::new(move |_recv, args| {
            // The guard only covers the receiver; a later call may carry a
            // different argument list, so re-check applicability.
            if score(ctor.params(), &tags_of(args)).is_none() {
                return Err(LinkError::NoMatchingOverload {
                    name: class.name().to_string(),
                    arity: args.len(),
                });
            }
            let instance = Value::Object(Arc::new(ObjectValue::new(class.clone())));
            ctor.initialize(&instance, args)?;
            Ok(instance)
        }),
    ))
}

fn mismatch(expected: &'static str, found: &Value) -> LinkError {
    LinkError::TypeMismatch { expected, found: found.shape_name() }
}
