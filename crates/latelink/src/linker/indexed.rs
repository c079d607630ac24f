//! Indexed adapter.
//!
//! Unifies ordered-container access behind one indexing protocol while
//! preserving each family's distinct bounds-failure kind: fixed arrays raise
//! `ArrayIndexOutOfBounds`, list-like containers raise
//! `ListIndexOutOfBounds`. Length targets re-read the live size on every
//! call; only the dispatch strategy is cached, never the number.

use std::sync::Arc;

use crate::guard::Guard;
use crate::linker::{no_applicable, LinkedInvocation};
use crate::ops::StandardOperation;
use crate::value::{ShapeKind, Value};
use crate::{LinkError, LinkResult};

pub(super) fn link_length(receiver: &Value) -> LinkResult<LinkedInvocation> {
    match receiver {
        Value::Array(_) => Ok(LinkedInvocation::new(
            Guard::Shape(ShapeKind::Array),
            Arc::new(|recv, _args| match recv {
                Value::Array(arr) => Ok(Value::Int(arr.len() as i64)),
                other => Err(mismatch("array", other)),
            }),
        )),
        Value::List(_) => Ok(LinkedInvocation::new(
            Guard::Shape(ShapeKind::List),
            Arc::new(|recv, _args| match recv {
                Value::List(list) => Ok(Value::Int(list.len() as i64)),
                other => Err(mismatch("list", other)),
            }),
        )),
        _ => Err(no_applicable(StandardOperation::GetLength, "")),
    }
}

pub(super) fn link_get_element(receiver: &Value) -> LinkResult<LinkedInvocation> {
    match receiver {
        Value::Array(_) => Ok(LinkedInvocation::new(
            Guard::Shape(ShapeKind::Array),
            Arc::new(|recv, args| match recv {
                Value::Array(arr) => {
                    let index = array_index(args.first(), arr.len())?;
                    Ok(arr.get(index).unwrap_or(Value::Null))
                }
                other => Err(mismatch("array", other)),
            }),
        )),
        Value::List(_) => Ok(LinkedInvocation::new(
            Guard::Shape(ShapeKind::List),
            Arc::new(|recv, args| match recv {
                Value::List(list) => {
                    let index = list_index(args.first(), list.len())?;
                    Ok(list.get(index).unwrap_or(Value::Null))
                }
                other => Err(mismatch("list", other)),
            }),
        )),
        _ => Err(no_applicable(StandardOperation::GetElement, "")),
    }
}

// Write targets treat the container's own `set` as the bounds check: it
// holds the lock, so a racing resize cannot swallow the value between a
// separate check and the write.
pub(super) fn link_set_element(receiver: &Value) -> LinkResult<LinkedInvocation> {
    match receiver {
        Value::Array(_) => Ok(LinkedInvocation::new(
            Guard::Shape(ShapeKind::Array),
            Arc::new(|recv, args| match recv {
                Value::Array(arr) => {
                    let index = int_index(args.first())?;
                    let value = args.get(1).cloned().unwrap_or(Value::Null);
                    if index < 0 || !arr.set(index as usize, value) {
                        return Err(LinkError::ArrayIndexOutOfBounds { index, len: arr.len() });
                    }
                    Ok(Value::Null)
                }
                other => Err(mismatch("array", other)),
            }),
        )),
        Value::List(_) => Ok(LinkedInvocation::new(
            Guard::Shape(ShapeKind::List),
            Arc::new(|recv, args| match recv {
                Value::List(list) => {
                    let index = int_index(args.first())?;
                    let value = args.get(1).cloned().unwrap_or(Value::Null);
                    if index < 0 || !list.set(index as usize, value) {
                        return Err(LinkError::ListIndexOutOfBounds { index, len: list.len() });
                    }
                    Ok(Value::Null)
                }
                other => Err(mismatch("list", other)),
            }),
        )),
        _ => Err(no_applicable(StandardOperation::SetElement, "")),
    }
}

/// Validate an index against a fixed array's bounds.
fn array_index(arg: Option<&Value>, len: usize) -> LinkResult<usize> {
    let index = int_index(arg)?;
    if index < 0 || index as u64 >= len as u64 {
        return Err(LinkError::ArrayIndexOutOfBounds { index, len });
    }
    Ok(index as usize)
}

/// Validate an index against a list's live bounds.
fn list_index(arg: Option<&Value>, len: usize) -> LinkResult<usize> {
    let index = int_index(arg)?;
    if index < 0 || index as u64 >= len as u64 {
        return Err(LinkError::ListIndexOutOfBounds { index, len });
    }
    Ok(index as usize)
}

fn int_index(arg: Option<&Value>) -> LinkResult<i64> {
    match arg {
        Some(Value::Int(index)) => Ok(*index),
        Some(other) => Err(mismatch("integer index", other)),
        None => Err(LinkError::TypeMismatch { expected: "integer index", found: "no argument" }),
    }
}

fn mismatch(expected: &'static str, found: &Value) -> LinkError {
    LinkError::TypeMismatch { expected, found: found.shape_name() }
}
