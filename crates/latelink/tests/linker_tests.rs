//! Call-site linking integration tests.
//!
//! Exercises the full operation set through real access points, under both
//! access modes: property reads/writes (fixed and dynamic names), length
//! queries, indexed access over both container families, construction,
//! method handles, fused method calls, relinking, and security denials.

use std::sync::Arc;
use std::thread;

use latelink::class::{AccessorDef, CtorDef, FieldDef, MethodDef};
use latelink::{
    AccessMode, CallDescriptor, ClassSpec, DynamicAccessPoint, LinkError, Linker, Operation,
    StandardOperation, TypeTag, Value,
};

const MODES: [AccessMode; 2] = [AccessMode::Public, AccessMode::Full];

fn call_site(
    mode: AccessMode,
    operation: impl Into<Operation>,
    params: Vec<TypeTag>,
    ret: TypeTag,
) -> DynamicAccessPoint {
    let descriptor = CallDescriptor::new(mode, operation, params, ret);
    DynamicAccessPoint::new(descriptor, Arc::new(Linker::new()))
}

fn named(base: StandardOperation, name: &str) -> Operation {
    Operation::named(base, name)
}

fn field_of(value: &Value, name: &str) -> Value {
    let obj = value.as_object().expect("object receiver");
    let slot = obj.class().field(name).expect("declared field").slot();
    obj.get_slot(slot).expect("field slot")
}

fn store_field(value: &Value, name: &str, v: Value) {
    let obj = value.as_object().expect("object receiver");
    let slot = obj.class().field(name).expect("declared field").slot();
    obj.set_slot(slot, v);
}

/// Instance-side fixture: two public fields, a private field, a computed
/// accessor, overloaded methods, and two constructors.
fn point_class() -> Arc<ClassSpec> {
    ClassSpec::builder("Point")
        .field(FieldDef::new("x"))
        .field(FieldDef::new("y"))
        .field(FieldDef::new("tag").private())
        .accessor(AccessorDef::new("sum").with_getter(|recv| {
            let x = field_of(recv, "x").as_int().unwrap_or(0);
            let y = field_of(recv, "y").as_int().unwrap_or(0);
            Ok(Value::Int(x + y))
        }))
        .method(MethodDef::new("get_x", vec![], |recv, _| Ok(field_of(recv, "x"))))
        .method(MethodDef::new("scale", vec![TypeTag::Int], |_, _| Ok(Value::str("int"))))
        .method(MethodDef::new("scale", vec![TypeTag::Float], |_, _| Ok(Value::str("float"))))
        .constructor(CtorDef::new(vec![], |_, _| Ok(())))
        .constructor(CtorDef::new(vec![TypeTag::Int, TypeTag::Int], |inst, args| {
            store_field(inst, "x", args[0].clone());
            store_field(inst, "y", args[1].clone());
            Ok(())
        }))
        .build()
}

/// Static-side fixture: static fields and methods, some sensitive.
fn host_class() -> Arc<ClassSpec> {
    ClassSpec::builder("Host")
        .static_field(FieldDef::new("version").init(Value::str("1.0")))
        .static_field(FieldDef::new("secret").sensitive().init(Value::str("hunter2")))
        .method(MethodDef::new("os_name", vec![], |_, _| Ok(Value::str("linux"))).as_static())
        .method(
            MethodDef::new("getenv", vec![TypeTag::Str], |_, args| {
                Ok(Value::str(format!("${}", args[0].as_str().unwrap_or(""))))
            })
            .as_static()
            .sensitive(),
        )
        .build()
}

fn point_instance(class: &Arc<ClassSpec>, x: i64, y: i64) -> Value {
    let new_site = call_site(
        AccessMode::Public,
        StandardOperation::New,
        vec![TypeTag::Class, TypeTag::Int, TypeTag::Int],
        TypeTag::Object,
    );
    new_site
        .invoke(&Value::Class(class.clone()), &[Value::Int(x), Value::Int(y)])
        .expect("construction")
}

// ===== Property operations =====

#[test]
fn fixed_name_property_get_matches_direct_read() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 3, 4);
        let site = call_site(
            mode,
            named(StandardOperation::GetProperty, "x"),
            vec![TypeTag::Object],
            TypeTag::Any,
        );

        assert_eq!(site.invoke(&p, &[]).unwrap(), field_of(&p, "x"));
        // Stable under repeated calls with no mutation.
        assert_eq!(site.invoke(&p, &[]).unwrap(), Value::Int(3));
        assert_eq!(site.invoke(&p, &[]).unwrap(), Value::Int(3));
    }
}

#[test]
fn accessor_takes_priority_over_fields() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 3, 4);
        let site = call_site(
            mode,
            named(StandardOperation::GetProperty, "sum"),
            vec![TypeTag::Object],
            TypeTag::Int,
        );
        assert_eq!(site.invoke(&p, &[]).unwrap(), Value::Int(7));
    }
}

#[test]
fn fixed_name_absent_property_fails_to_link() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 1, 2);
        let site = call_site(
            mode,
            named(StandardOperation::GetProperty, "DOES_NOT_EXIST"),
            vec![TypeTag::Object],
            TypeTag::Any,
        );
        let err = site.invoke(&p, &[]).unwrap_err();
        assert_eq!(
            err,
            LinkError::NoApplicableOperation {
                operation: StandardOperation::GetProperty,
                name: "DOES_NOT_EXIST".into(),
            }
        );
    }
}

#[test]
fn dynamic_name_absent_property_is_null() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 1, 2);
        let site = call_site(
            mode,
            StandardOperation::GetProperty,
            vec![TypeTag::Object, TypeTag::Str],
            TypeTag::Any,
        );

        assert_eq!(site.invoke(&p, &[Value::str("x")]).unwrap(), Value::Int(1));
        assert_eq!(site.invoke(&p, &[Value::str("DOES_NOT_EXIST")]).unwrap(), Value::Null);
    }
}

#[test]
fn dynamic_length_property_works_on_arrays() {
    for mode in MODES {
        let site = call_site(
            mode,
            StandardOperation::GetProperty,
            vec![TypeTag::Any, TypeTag::Str],
            TypeTag::Int,
        );
        let ten = Value::array(vec![Value::Null; 10]);
        let thirty_three = Value::array(vec![Value::Null; 33]);

        assert_eq!(site.invoke(&ten, &[Value::str("length")]).unwrap(), Value::Int(10));
        assert_eq!(site.invoke(&thirty_three, &[Value::str("length")]).unwrap(), Value::Int(33));
    }
}

#[test]
fn property_set_through_field_and_readback() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 1, 2);
        let set_site = call_site(
            mode,
            named(StandardOperation::SetProperty, "x"),
            vec![TypeTag::Object, TypeTag::Int],
            TypeTag::Void,
        );
        set_site.invoke(&p, &[Value::Int(42)]).unwrap();
        assert_eq!(field_of(&p, "x"), Value::Int(42));
    }
}

#[test]
fn dynamic_name_absent_write_fails() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 1, 2);
        let site = call_site(
            mode,
            StandardOperation::SetProperty,
            vec![TypeTag::Object, TypeTag::Str, TypeTag::Any],
            TypeTag::Void,
        );

        // Present name: the write lands.
        site.invoke(&p, &[Value::str("y"), Value::Int(9)]).unwrap();
        assert_eq!(field_of(&p, "y"), Value::Int(9));

        // Absent name: a write cannot silently vanish.
        let err = site.invoke(&p, &[Value::str("DOES_NOT_EXIST"), Value::Int(0)]).unwrap_err();
        assert_eq!(err, LinkError::RuntimeUnresolved { name: "DOES_NOT_EXIST".into() });
    }
}

#[test]
fn fixed_name_absent_write_fails_to_link() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 1, 2);
        let site = call_site(
            mode,
            named(StandardOperation::SetProperty, "DOES_NOT_EXIST"),
            vec![TypeTag::Object, TypeTag::Any],
            TypeTag::Void,
        );
        let err = site.invoke(&p, &[Value::Int(0)]).unwrap_err();
        assert_eq!(
            err,
            LinkError::NoApplicableOperation {
                operation: StandardOperation::SetProperty,
                name: "DOES_NOT_EXIST".into(),
            }
        );
    }
}

#[test]
fn private_field_visible_only_under_full_access() {
    let class = point_class();
    let p = point_instance(&class, 1, 2);
    store_field(&p, "tag", Value::str("marked"));

    let public_site = call_site(
        AccessMode::Public,
        named(StandardOperation::GetProperty, "tag"),
        vec![TypeTag::Object],
        TypeTag::Any,
    );
    assert!(matches!(
        public_site.invoke(&p, &[]).unwrap_err(),
        LinkError::NoApplicableOperation { .. }
    ));

    let full_site = call_site(
        AccessMode::Full,
        named(StandardOperation::GetProperty, "tag"),
        vec![TypeTag::Object],
        TypeTag::Any,
    );
    assert_eq!(full_site.invoke(&p, &[]).unwrap(), Value::str("marked"));
}

// ===== Length and indexed operations =====

#[test]
fn length_over_both_container_families() {
    for mode in MODES {
        let site = call_site(mode, StandardOperation::GetLength, vec![TypeTag::Any], TypeTag::Int);

        let arr = Value::array(vec![Value::Int(23), Value::Int(42)]);
        assert_eq!(site.invoke(&arr, &[]).unwrap(), Value::Int(2));

        let list = Value::list(vec![]);
        assert_eq!(site.invoke(&list, &[]).unwrap(), Value::Int(0));

        // Mutation between calls on the same cached site must be observed.
        if let Value::List(inner) = &list {
            inner.push(Value::str("hello"));
            inner.push(Value::str("world"));
            inner.push(Value::str("latelink"));
        }
        assert_eq!(site.invoke(&list, &[]).unwrap(), Value::Int(3));
        if let Value::List(inner) = &list {
            inner.clear();
        }
        assert_eq!(site.invoke(&list, &[]).unwrap(), Value::Int(0));
    }
}

#[test]
fn element_get_preserves_per_family_bounds_kinds() {
    for mode in MODES {
        let site = call_site(
            mode,
            StandardOperation::GetElement,
            vec![TypeTag::Any, TypeTag::Int],
            TypeTag::Any,
        );

        let arr = Value::array(vec![Value::Int(23), Value::Int(42)]);
        assert_eq!(site.invoke(&arr, &[Value::Int(0)]).unwrap(), Value::Int(23));
        assert_eq!(site.invoke(&arr, &[Value::Int(1)]).unwrap(), Value::Int(42));
        assert_eq!(
            site.invoke(&arr, &[Value::Int(-1)]).unwrap_err(),
            LinkError::ArrayIndexOutOfBounds { index: -1, len: 2 }
        );
        assert_eq!(
            site.invoke(&arr, &[Value::Int(2)]).unwrap_err(),
            LinkError::ArrayIndexOutOfBounds { index: 2, len: 2 }
        );

        let list = Value::list(vec![Value::Int(23), Value::Int(430), Value::Int(-4354)]);
        assert_eq!(site.invoke(&list, &[Value::Int(2)]).unwrap(), Value::Int(-4354));
        assert_eq!(
            site.invoke(&list, &[Value::Int(-1)]).unwrap_err(),
            LinkError::ListIndexOutOfBounds { index: -1, len: 3 }
        );
        assert_eq!(
            site.invoke(&list, &[Value::Int(3)]).unwrap_err(),
            LinkError::ListIndexOutOfBounds { index: 3, len: 3 }
        );
    }
}

#[test]
fn element_set_writes_through_and_keeps_bounds_kinds() {
    for mode in MODES {
        let site = call_site(
            mode,
            StandardOperation::SetElement,
            vec![TypeTag::Any, TypeTag::Int, TypeTag::Any],
            TypeTag::Void,
        );

        let arr = Value::array(vec![Value::Int(23), Value::Int(42)]);
        site.invoke(&arr, &[Value::Int(0), Value::Int(0)]).unwrap();
        site.invoke(&arr, &[Value::Int(1), Value::Int(-5)]).unwrap();
        if let Value::Array(inner) = &arr {
            assert_eq!(inner.get(0), Some(Value::Int(0)));
            assert_eq!(inner.get(1), Some(Value::Int(-5)));
        }
        assert_eq!(
            site.invoke(&arr, &[Value::Int(2), Value::Int(20)]).unwrap_err(),
            LinkError::ArrayIndexOutOfBounds { index: 2, len: 2 }
        );

        let list = Value::list(vec![Value::Int(23)]);
        site.invoke(&list, &[Value::Int(0), Value::Int(-23)]).unwrap();
        if let Value::List(inner) = &list {
            assert_eq!(inner.get(0), Some(Value::Int(-23)));
        }
        assert_eq!(
            site.invoke(&list, &[Value::Int(-1), Value::Int(343)]).unwrap_err(),
            LinkError::ListIndexOutOfBounds { index: -1, len: 1 }
        );
    }
}

#[test]
fn element_set_rejects_index_invalidated_by_shrinking() {
    let site = call_site(
        AccessMode::Public,
        StandardOperation::SetElement,
        vec![TypeTag::List, TypeTag::Int, TypeTag::Any],
        TypeTag::Void,
    );
    let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
    site.invoke(&list, &[Value::Int(0), Value::Int(9)]).unwrap();

    if let Value::List(inner) = &list {
        inner.clear();
    }
    // The cached target's bounds ride on the write itself, so the index
    // that was valid before the shrink is rejected, not dropped.
    assert_eq!(
        site.invoke(&list, &[Value::Int(0), Value::Int(9)]).unwrap_err(),
        LinkError::ListIndexOutOfBounds { index: 0, len: 0 }
    );
}

// ===== Construction =====

#[test]
fn new_with_matching_constructors() {
    for mode in MODES {
        let class = point_class();
        let token = Value::Class(class.clone());

        let zero_site = call_site(mode, StandardOperation::New, vec![TypeTag::Class], TypeTag::Object);
        let blank = zero_site.invoke(&token, &[]).unwrap();
        let obj = blank.as_object().expect("constructed instance");
        assert_eq!(obj.class().id(), class.id());
        assert_eq!(field_of(&blank, "x"), Value::Null);

        let two_site = call_site(
            mode,
            StandardOperation::New,
            vec![TypeTag::Class, TypeTag::Int, TypeTag::Int],
            TypeTag::Object,
        );
        let p = two_site.invoke(&token, &[Value::Int(5), Value::Int(6)]).unwrap();
        assert_eq!(field_of(&p, "x"), Value::Int(5));
        assert_eq!(field_of(&p, "y"), Value::Int(6));
    }
}

#[test]
fn new_with_no_matching_constructor_fails_to_link() {
    for mode in MODES {
        let class = point_class();
        let token = Value::Class(class.clone());
        let site = call_site(
            mode,
            StandardOperation::New,
            vec![TypeTag::Class, TypeTag::Str],
            TypeTag::Object,
        );
        let err = site.invoke(&token, &[Value::str("nope")]).unwrap_err();
        assert_eq!(err, LinkError::NoMatchingOverload { name: "Point".into(), arity: 1 });
    }
}

// ===== Static namespace =====

#[test]
fn static_property_yields_namespace_token() {
    for mode in MODES {
        let site = call_site(
            mode,
            named(StandardOperation::GetProperty, "static"),
            vec![TypeTag::Class],
            TypeTag::StaticNamespace,
        );

        let point = point_class();
        let host = host_class();

        let ns = site.invoke(&Value::Class(point.clone()), &[]).unwrap();
        assert_eq!(ns, Value::StaticNamespace(point.clone()));

        // One cached site serves every class token; the target mints the
        // token for whatever class flows in.
        let ns = site.invoke(&Value::Class(host.clone()), &[]).unwrap();
        assert_eq!(ns, Value::StaticNamespace(host.clone()));
    }
}

#[test]
fn static_field_read_and_write_through_namespace() {
    for mode in MODES {
        let host = host_class();
        let ns = Value::StaticNamespace(host.clone());

        let get_site = call_site(
            mode,
            named(StandardOperation::GetProperty, "version"),
            vec![TypeTag::StaticNamespace],
            TypeTag::Str,
        );
        assert_eq!(get_site.invoke(&ns, &[]).unwrap(), Value::str("1.0"));

        let set_site = call_site(
            mode,
            named(StandardOperation::SetProperty, "version"),
            vec![TypeTag::StaticNamespace, TypeTag::Str],
            TypeTag::Void,
        );
        set_site.invoke(&ns, &[Value::str("2.0")]).unwrap();
        assert_eq!(get_site.invoke(&ns, &[]).unwrap(), Value::str("2.0"));
    }
}

// ===== Methods =====

#[test]
fn get_method_then_call_equals_call_method_instance() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 11, 0);

        let get_site = call_site(
            mode,
            named(StandardOperation::GetMethod, "get_x"),
            vec![TypeTag::Object],
            TypeTag::Method,
        );
        let handle = get_site.invoke(&p, &[]).unwrap();
        assert!(matches!(handle, Value::Method(_)));

        let call_site_ = call_site(
            mode,
            StandardOperation::Call,
            vec![TypeTag::Method, TypeTag::Object],
            TypeTag::Any,
        );
        let two_step = call_site_.invoke(&handle, &[p.clone()]).unwrap();

        let fused_site = call_site(
            mode,
            named(StandardOperation::CallMethod, "get_x"),
            vec![TypeTag::Object],
            TypeTag::Any,
        );
        let one_step = fused_site.invoke(&p, &[]).unwrap();

        assert_eq!(two_step, one_step);
        assert_eq!(one_step, Value::Int(11));
    }
}

#[test]
fn get_method_then_call_equals_call_method_static() {
    for mode in MODES {
        let host = host_class();
        let ns = Value::StaticNamespace(host.clone());

        let get_site = call_site(
            mode,
            named(StandardOperation::GetMethod, "os_name"),
            vec![TypeTag::StaticNamespace],
            TypeTag::Method,
        );
        let handle = get_site.invoke(&ns, &[]).unwrap();

        // The `this` slot is ignored for static handles; pass null like any
        // caller without an instance would.
        let call_site_ = call_site(
            mode,
            StandardOperation::Call,
            vec![TypeTag::Method, TypeTag::Null],
            TypeTag::Any,
        );
        let two_step = call_site_.invoke(&handle, &[Value::Null]).unwrap();

        let fused_site = call_site(
            mode,
            named(StandardOperation::CallMethod, "os_name"),
            vec![TypeTag::StaticNamespace],
            TypeTag::Any,
        );
        let one_step = fused_site.invoke(&ns, &[]).unwrap();

        assert_eq!(two_step, one_step);
        assert_eq!(one_step, Value::str("linux"));
    }
}

#[test]
fn deferred_overload_choice_follows_runtime_argument_types() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 0, 0);

        // `Any` in the descriptor defers overload choice to each call.
        let site = call_site(
            mode,
            named(StandardOperation::CallMethod, "scale"),
            vec![TypeTag::Object, TypeTag::Any],
            TypeTag::Any,
        );
        assert_eq!(site.invoke(&p, &[Value::Int(2)]).unwrap(), Value::str("int"));
        assert_eq!(site.invoke(&p, &[Value::Float(2.0)]).unwrap(), Value::str("float"));
    }
}

#[test]
fn bound_overload_rejects_deviant_argument_lists() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 0, 0);

        // Concrete descriptor tags bind the int overload at link time.
        let site = call_site(
            mode,
            named(StandardOperation::CallMethod, "scale"),
            vec![TypeTag::Object, TypeTag::Int],
            TypeTag::Any,
        );
        assert_eq!(site.invoke(&p, &[Value::Int(2)]).unwrap(), Value::str("int"));

        // Calls that stray from the declared signature must not reach the
        // method body.
        assert_eq!(
            site.invoke(&p, &[Value::str("wide")]).unwrap_err(),
            LinkError::NoMatchingOverload { name: "scale".into(), arity: 1 }
        );
        assert_eq!(
            site.invoke(&p, &[]).unwrap_err(),
            LinkError::NoMatchingOverload { name: "scale".into(), arity: 0 }
        );

        let ns = Value::StaticNamespace(host_class());
        let site = call_site(
            mode,
            named(StandardOperation::CallMethod, "os_name"),
            vec![TypeTag::StaticNamespace],
            TypeTag::Str,
        );
        assert_eq!(site.invoke(&ns, &[]).unwrap(), Value::str("linux"));
        assert_eq!(
            site.invoke(&ns, &[Value::Int(1)]).unwrap_err(),
            LinkError::NoMatchingOverload { name: "os_name".into(), arity: 1 }
        );
    }
}

#[test]
fn fixed_name_absent_method_fails_to_link() {
    for mode in MODES {
        let class = point_class();
        let p = point_instance(&class, 0, 0);
        let site = call_site(
            mode,
            named(StandardOperation::CallMethod, "DOES_NOT_EXIST"),
            vec![TypeTag::Object],
            TypeTag::Any,
        );
        assert!(matches!(
            site.invoke(&p, &[]).unwrap_err(),
            LinkError::NoApplicableOperation { .. }
        ));
    }
}

// ===== Relinking =====

#[test]
fn shape_change_relinks_instead_of_reusing_mismatched_target() {
    for mode in MODES {
        let a = ClassSpec::builder("A").field(FieldDef::new("x")).build();
        let b = ClassSpec::builder("B").field(FieldDef::new("x")).build();

        let pa = Value::Object(Arc::new(latelink::ObjectValue::new(a.clone())));
        let pb = Value::Object(Arc::new(latelink::ObjectValue::new(b.clone())));
        store_field(&pa, "x", Value::Int(1));
        store_field(&pb, "x", Value::Int(2));

        let site = call_site(
            mode,
            named(StandardOperation::GetProperty, "x"),
            vec![TypeTag::Object],
            TypeTag::Any,
        );
        assert_eq!(site.invoke(&pa, &[]).unwrap(), Value::Int(1));
        assert_eq!(site.invoke(&pb, &[]).unwrap(), Value::Int(2));
        assert_eq!(site.invoke(&pa, &[]).unwrap(), Value::Int(1));
    }
}

// ===== Security =====

#[test]
fn sensitive_method_denial_kind_depends_on_access_mode() {
    let host = host_class();
    let ns = Value::StaticNamespace(host.clone());

    let public_site = call_site(
        AccessMode::Public,
        named(StandardOperation::CallMethod, "getenv"),
        vec![TypeTag::StaticNamespace, TypeTag::Str],
        TypeTag::Any,
    );
    assert_eq!(
        public_site.invoke(&ns, &[Value::str("PATH")]).unwrap_err(),
        LinkError::InaccessibleMember { name: "getenv".into() }
    );

    let full_site = call_site(
        AccessMode::Full,
        named(StandardOperation::CallMethod, "getenv"),
        vec![TypeTag::StaticNamespace, TypeTag::Str],
        TypeTag::Any,
    );
    assert_eq!(
        full_site.invoke(&ns, &[Value::str("PATH")]).unwrap_err(),
        LinkError::SecurityViolation { name: "getenv".into() }
    );
}

#[test]
fn sensitive_static_field_denial_kinds() {
    let host = host_class();
    let ns = Value::StaticNamespace(host.clone());

    let public_site = call_site(
        AccessMode::Public,
        named(StandardOperation::GetProperty, "secret"),
        vec![TypeTag::StaticNamespace],
        TypeTag::Any,
    );
    assert_eq!(
        public_site.invoke(&ns, &[]).unwrap_err(),
        LinkError::InaccessibleMember { name: "secret".into() }
    );

    let full_site = call_site(
        AccessMode::Full,
        named(StandardOperation::GetProperty, "secret"),
        vec![TypeTag::StaticNamespace],
        TypeTag::Any,
    );
    assert_eq!(
        full_site.invoke(&ns, &[]).unwrap_err(),
        LinkError::SecurityViolation { name: "secret".into() }
    );
}

// ===== Concurrency =====

#[test]
fn shared_access_point_tolerates_racing_relinks() {
    let site = Arc::new(call_site(
        AccessMode::Public,
        StandardOperation::GetLength,
        vec![TypeTag::Any],
        TypeTag::Int,
    ));

    let arr = Value::array(vec![Value::Int(0); 5]);
    let list = Value::list(vec![Value::Int(0); 9]);

    let mut handles = Vec::new();
    for worker in 0..8 {
        let site = site.clone();
        let arr = arr.clone();
        let list = list.clone();
        handles.push(thread::spawn(move || {
            for i in 0..500 {
                // Alternate shapes so relinks race with reads.
                if (i + worker) % 2 == 0 {
                    assert_eq!(site.invoke(&arr, &[]).unwrap(), Value::Int(5));
                } else {
                    assert_eq!(site.invoke(&list, &[]).unwrap(), Value::Int(9));
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}
