//! Per-type capability tables.
//!
//! Each host class exposes a precomputed table of members (fields, accessor
//! pairs, instance/static method groups, static fields, constructors) built
//! once through [`ClassBuilder`] and consulted by the linker during
//! resolution. Tables are immutable after build; only static field storage
//! is written at runtime.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ops::TypeTag;
use crate::value::Value;
use crate::LinkResult;

/// Unique identifier of a built class; guards compare receivers by it.
pub type ClassId = u64;

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

fn generate_class_id() -> ClassId {
    NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed)
}

/// Declared visibility of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Resolvable under both access modes
    Public,
    /// Resolvable only under full access mode
    Private,
}

/// Which kind of member a resolution landed on; handed to the security
/// policy alongside the member name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Instance field
    Field,
    /// Accessor pair (getter/setter)
    Accessor,
    /// Instance method
    Method,
    /// Static field
    StaticField,
    /// Static method
    StaticMethod,
    /// Constructor
    Constructor,
}

/// Getter body: receives the receiver value.
pub type GetterFn = dyn Fn(&Value) -> LinkResult<Value> + Send + Sync;
/// Setter body: receives the receiver and the value being written.
pub type SetterFn = dyn Fn(&Value, Value) -> LinkResult<()> + Send + Sync;
/// Method body: receives the receiver (`Value::Null` for statics) and the
/// argument slice.
pub type MethodBody = dyn Fn(&Value, &[Value]) -> LinkResult<Value> + Send + Sync;
/// Constructor body: receives the freshly allocated instance and the
/// argument slice, and initializes the instance in place.
pub type CtorBody = dyn Fn(&Value, &[Value]) -> LinkResult<()> + Send + Sync;

/// A declared field: named slot with visibility and write control.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    slot: usize,
    visibility: Visibility,
    sensitive: bool,
    writable: bool,
}

impl FieldSpec {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage slot index.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Declared visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the host policy must vet access.
    pub fn sensitive(&self) -> bool {
        self.sensitive
    }

    /// Whether writes are permitted.
    pub fn writable(&self) -> bool {
        self.writable
    }
}

/// A declared accessor pair; either side may be absent.
pub struct AccessorSpec {
    name: String,
    visibility: Visibility,
    sensitive: bool,
    getter: Option<Arc<GetterFn>>,
    setter: Option<Arc<SetterFn>>,
}

impl AccessorSpec {
    /// Accessor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the host policy must vet access.
    pub fn sensitive(&self) -> bool {
        self.sensitive
    }

    /// The getter side, if declared.
    pub fn getter(&self) -> Option<&Arc<GetterFn>> {
        self.getter.as_ref()
    }

    /// The setter side, if declared.
    pub fn setter(&self) -> Option<&Arc<SetterFn>> {
        self.setter.as_ref()
    }
}

impl fmt::Debug for AccessorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorSpec")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("sensitive", &self.sensitive)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// One overload of a named method.
pub struct MethodSpec {
    name: Arc<str>,
    params: Vec<TypeTag>,
    return_type: TypeTag,
    visibility: Visibility,
    sensitive: bool,
    is_static: bool,
    body: Arc<MethodBody>,
}

impl MethodSpec {
    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types (excluding the receiver).
    pub fn params(&self) -> &[TypeTag] {
        &self.params
    }

    /// Declared return type.
    pub fn return_type(&self) -> TypeTag {
        self.return_type
    }

    /// Declared visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the host policy must vet invocation.
    pub fn sensitive(&self) -> bool {
        self.sensitive
    }

    /// Whether this overload is static.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Invoke the overload body directly.
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> LinkResult<Value> {
        (self.body)(receiver, args)
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("visibility", &self.visibility)
            .field("sensitive", &self.sensitive)
            .field("is_static", &self.is_static)
            .finish()
    }
}

/// One constructor overload.
pub struct ConstructorSpec {
    params: Vec<TypeTag>,
    visibility: Visibility,
    sensitive: bool,
    body: Arc<CtorBody>,
}

impl ConstructorSpec {
    /// Declared parameter types.
    pub fn params(&self) -> &[TypeTag] {
        &self.params
    }

    /// Declared visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the host policy must vet construction.
    pub fn sensitive(&self) -> bool {
        self.sensitive
    }

    /// Run the constructor body against a freshly allocated instance.
    pub fn initialize(&self, instance: &Value, args: &[Value]) -> LinkResult<()> {
        (self.body)(instance, args)
    }
}

impl fmt::Debug for ConstructorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorSpec")
            .field("params", &self.params)
            .field("visibility", &self.visibility)
            .field("sensitive", &self.sensitive)
            .finish()
    }
}

/// Immutable capability table for one host class.
pub struct ClassSpec {
    id: ClassId,
    name: String,
    fields: Vec<FieldSpec>,
    field_index: FxHashMap<String, usize>,
    accessors: FxHashMap<String, AccessorSpec>,
    methods: FxHashMap<String, Vec<Arc<MethodSpec>>>,
    static_methods: FxHashMap<String, Vec<Arc<MethodSpec>>>,
    static_fields: Vec<FieldSpec>,
    static_field_index: FxHashMap<String, usize>,
    static_storage: RwLock<Vec<Value>>,
    constructors: Vec<Arc<ConstructorSpec>>,
}

impl ClassSpec {
    /// Start building a class table.
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    /// Unique id assigned at build time.
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of instance field slots an instance must allocate.
    pub fn field_slot_count(&self) -> usize {
        self.fields.len()
    }

    /// Look up a declared instance field.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    /// Look up a declared accessor.
    pub fn accessor(&self, name: &str) -> Option<&AccessorSpec> {
        self.accessors.get(name)
    }

    /// Look up an instance method overload group.
    pub fn method_group(&self, name: &str) -> Option<&[Arc<MethodSpec>]> {
        self.methods.get(name).map(|g| g.as_slice())
    }

    /// Look up a static method overload group.
    pub fn static_method_group(&self, name: &str) -> Option<&[Arc<MethodSpec>]> {
        self.static_methods.get(name).map(|g| g.as_slice())
    }

    /// Look up a declared static field.
    pub fn static_field(&self, name: &str) -> Option<&FieldSpec> {
        self.static_field_index.get(name).map(|&i| &self.static_fields[i])
    }

    /// Read a static field slot.
    pub fn static_get(&self, slot: usize) -> Option<Value> {
        self.static_storage.read().get(slot).cloned()
    }

    /// Write a static field slot; false when the slot does not exist.
    pub fn static_set(&self, slot: usize, value: Value) -> bool {
        let mut storage = self.static_storage.write();
        match storage.get_mut(slot) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// The declared constructor overloads.
    pub fn constructors(&self) -> &[Arc<ConstructorSpec>] {
        &self.constructors
    }
}

impl fmt::Debug for ClassSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("accessors", &self.accessors.len())
            .field("methods", &self.methods.len())
            .field("static_methods", &self.static_methods.len())
            .field("static_fields", &self.static_fields.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

/// Definition of a field to be added to a class under construction.
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    visibility: Visibility,
    sensitive: bool,
    writable: bool,
    initial: Option<Value>,
}

impl FieldDef {
    /// A public, writable, non-sensitive field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            sensitive: false,
            writable: true,
            initial: None,
        }
    }

    /// Mark the field private.
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// Mark the field sensitive (host policy is consulted on access).
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Reject writes through the linker.
    pub fn readonly(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Initial value; meaningful for static fields, whose storage lives on
    /// the class. Instance slots always start null.
    pub fn init(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }
}

/// Definition of an accessor pair to be added to a class under construction.
pub struct AccessorDef {
    name: String,
    visibility: Visibility,
    sensitive: bool,
    getter: Option<Arc<GetterFn>>,
    setter: Option<Arc<SetterFn>>,
}

impl AccessorDef {
    /// A public, non-sensitive accessor with no sides yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            sensitive: false,
            getter: None,
            setter: None,
        }
    }

    /// Attach the getter side.
    pub fn with_getter(
        mut self,
        getter: impl Fn(&Value) -> LinkResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.getter = Some(Arc::new(getter));
        self
    }

    /// Attach the setter side.
    pub fn with_setter(
        mut self,
        setter: impl Fn(&Value, Value) -> LinkResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.setter = Some(Arc::new(setter));
        self
    }

    /// Mark the accessor private.
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// Mark the accessor sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Definition of one method overload to be added to a class under
/// construction.
pub struct MethodDef {
    name: String,
    params: Vec<TypeTag>,
    return_type: TypeTag,
    visibility: Visibility,
    sensitive: bool,
    is_static: bool,
    body: Arc<MethodBody>,
}

impl MethodDef {
    /// A public instance overload with the given signature and body.
    pub fn new(
        name: impl Into<String>,
        params: Vec<TypeTag>,
        body: impl Fn(&Value, &[Value]) -> LinkResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            return_type: TypeTag::Any,
            visibility: Visibility::Public,
            sensitive: false,
            is_static: false,
            body: Arc::new(body),
        }
    }

    /// Set the declared return type.
    pub fn returns(mut self, return_type: TypeTag) -> Self {
        self.return_type = return_type;
        self
    }

    /// Mark the overload private.
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// Mark the overload sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Mark the overload static (no instance receiver).
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }
}

/// Definition of one constructor overload.
pub struct CtorDef {
    params: Vec<TypeTag>,
    visibility: Visibility,
    sensitive: bool,
    body: Arc<CtorBody>,
}

impl CtorDef {
    /// A public constructor with the given signature and body.
    pub fn new(
        params: Vec<TypeTag>,
        body: impl Fn(&Value, &[Value]) -> LinkResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            params,
            visibility: Visibility::Public,
            sensitive: false,
            body: Arc::new(body),
        }
    }

    /// Mark the constructor private.
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// Mark the constructor sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Builder that freezes member definitions into an immutable [`ClassSpec`].
pub struct ClassBuilder {
    name: String,
    fields: Vec<FieldDef>,
    static_fields: Vec<FieldDef>,
    accessors: Vec<AccessorDef>,
    methods: Vec<MethodDef>,
    constructors: Vec<CtorDef>,
}

impl ClassBuilder {
    /// Start a class table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            static_fields: Vec::new(),
            accessors: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Declare an instance field; slots are assigned in declaration order.
    pub fn field(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    /// Declare a static field; storage lives on the class.
    pub fn static_field(mut self, def: FieldDef) -> Self {
        self.static_fields.push(def);
        self
    }

    /// Declare an accessor pair.
    pub fn accessor(mut self, def: AccessorDef) -> Self {
        self.accessors.push(def);
        self
    }

    /// Declare a method overload (instance or static per the definition).
    pub fn method(mut self, def: MethodDef) -> Self {
        self.methods.push(def);
        self
    }

    /// Declare a constructor overload.
    pub fn constructor(mut self, def: CtorDef) -> Self {
        self.constructors.push(def);
        self
    }

    /// Freeze the definitions into an immutable class table.
    pub fn build(self) -> Arc<ClassSpec> {
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut field_index = FxHashMap::default();
        for (slot, def) in self.fields.into_iter().enumerate() {
            field_index.insert(def.name.clone(), slot);
            fields.push(FieldSpec {
                name: def.name,
                slot,
                visibility: def.visibility,
                sensitive: def.sensitive,
                writable: def.writable,
            });
        }

        let mut static_fields = Vec::with_capacity(self.static_fields.len());
        let mut static_field_index = FxHashMap::default();
        let mut static_storage = Vec::with_capacity(self.static_fields.len());
        for (slot, def) in self.static_fields.into_iter().enumerate() {
            static_field_index.insert(def.name.clone(), slot);
            static_storage.push(def.initial.unwrap_or(Value::Null));
            static_fields.push(FieldSpec {
                name: def.name,
                slot,
                visibility: def.visibility,
                sensitive: def.sensitive,
                writable: def.writable,
            });
        }

        let mut accessors = FxHashMap::default();
        for def in self.accessors {
            accessors.insert(
                def.name.clone(),
                AccessorSpec {
                    name: def.name,
                    visibility: def.visibility,
                    sensitive: def.sensitive,
                    getter: def.getter,
                    setter: def.setter,
                },
            );
        }

        let mut methods: FxHashMap<String, Vec<Arc<MethodSpec>>> = FxHashMap::default();
        let mut static_methods: FxHashMap<String, Vec<Arc<MethodSpec>>> = FxHashMap::default();
        for def in self.methods {
            let spec = Arc::new(MethodSpec {
                name: Arc::from(def.name.as_str()),
                params: def.params,
                return_type: def.return_type,
                visibility: def.visibility,
                sensitive: def.sensitive,
                is_static: def.is_static,
                body: def.body,
            });
            let table = if def.is_static { &mut static_methods } else { &mut methods };
            table.entry(def.name).or_default().push(spec);
        }

        let constructors = self
            .constructors
            .into_iter()
            .map(|def| {
                Arc::new(ConstructorSpec {
                    params: def.params,
                    visibility: def.visibility,
                    sensitive: def.sensitive,
                    body: def.body,
                })
            })
            .collect();

        Arc::new(ClassSpec {
            id: generate_class_id(),
            name: self.name,
            fields,
            field_index,
            accessors,
            methods,
            static_methods,
            static_fields,
            static_field_index,
            static_storage: RwLock::new(static_storage),
            constructors,
        })
    }
}
