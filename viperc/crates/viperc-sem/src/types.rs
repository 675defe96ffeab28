//! The canonical type registry.
//!
//! All types in a compilation live in one [`TypeRegistry`] and are
//! referred to by [`TypeId`] handles. Construction is canonicalizing:
//! asking twice for pointer-to-`i32`, or for `i32[4]`, yields the same
//! handle, so type equality is handle equality everywhere else in the
//! compiler.
//!
//! Struct types may be registered with an empty body and completed
//! later via [`TypeRegistry::set_struct_body`]; a class method that
//! mentions `this` needs the struct's handle before the body has been
//! fully parsed.

use thiserror::Error;
use viperc_util::{define_idx, FxHashMap, IndexVec};

define_idx!(
    /// Canonical handle to a type in the [`TypeRegistry`].
    TypeId
);

// TypeIds are embedded in every expression node.
static_assertions::assert_eq_size!(TypeId, u32);

/// Signature of a struct method or constructor.
///
/// Bodies live in the AST; the registry only records what a call site
/// needs for resolution. Constructors carry no return type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSig {
    pub name: String,
    pub return_type: Option<TypeId>,
    pub params: Vec<(TypeId, String)>,
}

/// The shape of a registered type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// Built-in scalar type.
    Primitive { name: &'static str, bits: u32 },
    /// Pointer to another registered type.
    Pointer { pointee: TypeId },
    /// Fixed-length array.
    Array { length: u32, element: TypeId },
    /// Named record with ordered fields and method signatures.
    Struct {
        name: String,
        fields: Vec<(TypeId, String)>,
        methods: Vec<MethodSig>,
        complete: bool,
    },
}

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown type name '{0}'")]
    Unknown(String),

    #[error("type '{0}' is already defined")]
    Duplicate(String),

    #[error("type '{0}' is incomplete")]
    Incomplete(String),
}

/// Built-in primitives seeded by [`TypeRegistry::init`].
const BUILTINS: &[(&str, u32)] = &[
    ("i8", 8),
    ("i16", 16),
    ("i32", 32),
    ("i64", 64),
    ("bool", 1),
    ("void", 0),
];

/// Interning store for all types in a compilation.
///
/// # Examples
///
/// ```
/// use viperc_sem::TypeRegistry;
///
/// let mut types = TypeRegistry::new();
/// let i32_ty = types.get("i32").unwrap();
/// let ptr = types.create_pointer(i32_ty);
/// assert_eq!(ptr, types.create_pointer(i32_ty));
/// assert_eq!(types.display(ptr), "i32*");
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    kinds: IndexVec<TypeId, TypeKind>,
    by_name: FxHashMap<String, TypeId>,
    pointer_memo: FxHashMap<TypeId, TypeId>,
    array_memo: FxHashMap<(TypeId, u32), TypeId>,
    initialized: bool,
}

impl TypeRegistry {
    /// Create a registry with the built-in primitives seeded.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.init();
        registry
    }

    /// Populate the built-in primitives. A no-op after the first call.
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        for &(name, bits) in BUILTINS {
            let id = self.kinds.push(TypeKind::Primitive { name, bits });
            self.by_name.insert(name.to_string(), id);
        }
    }

    /// Whether `name` names a registered type.
    pub fn exists(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Look up a type by name.
    pub fn get(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// The shape of a type.
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id]
    }

    /// Pointer-to-`pointee`, memoized.
    pub fn create_pointer(&mut self, pointee: TypeId) -> TypeId {
        if let Some(&id) = self.pointer_memo.get(&pointee) {
            return id;
        }
        let id = self.kinds.push(TypeKind::Pointer { pointee });
        self.pointer_memo.insert(pointee, id);
        id
    }

    /// `element[length]`, memoized.
    pub fn create_array(&mut self, length: u32, element: TypeId) -> TypeId {
        if let Some(&id) = self.array_memo.get(&(element, length)) {
            return id;
        }
        let id = self.kinds.push(TypeKind::Array { length, element });
        self.array_memo.insert((element, length), id);
        id
    }

    /// Register a struct type by name. An empty field list produces a
    /// forward declaration completed later with [`set_struct_body`].
    ///
    /// [`set_struct_body`]: TypeRegistry::set_struct_body
    pub fn register_struct(
        &mut self,
        name: &str,
        fields: Vec<(TypeId, String)>,
    ) -> Result<TypeId, TypeError> {
        if self.by_name.contains_key(name) {
            return Err(TypeError::Duplicate(name.to_string()));
        }
        let complete = !fields.is_empty();
        let id = self.kinds.push(TypeKind::Struct {
            name: name.to_string(),
            fields,
            methods: Vec::new(),
            complete,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Complete a forward-declared struct with its field list.
    pub fn set_struct_body(&mut self, id: TypeId, new_fields: Vec<(TypeId, String)>) {
        if let TypeKind::Struct {
            fields, complete, ..
        } = &mut self.kinds[id]
        {
            *fields = new_fields;
            *complete = true;
        }
    }

    /// Append a method signature to a struct type.
    pub fn add_method(&mut self, id: TypeId, sig: MethodSig) {
        if let TypeKind::Struct { methods, .. } = &mut self.kinds[id] {
            methods.push(sig);
        }
    }

    /// Find a struct field by name, returning `(index, type)`.
    pub fn struct_field(&self, id: TypeId, name: &str) -> Option<(usize, TypeId)> {
        match self.kind(id) {
            TypeKind::Struct { fields, .. } => fields
                .iter()
                .position(|(_, f)| f == name)
                .map(|i| (i, fields[i].0)),
            _ => None,
        }
    }

    /// Find a struct method signature by name.
    pub fn struct_method(&self, id: TypeId, name: &str) -> Option<&MethodSig> {
        match self.kind(id) {
            TypeKind::Struct { methods, .. } => methods.iter().find(|m| m.name == name),
            _ => None,
        }
    }

    /// Size of a type in bits. Incomplete structs have no size.
    pub fn size_in_bits(&self, id: TypeId) -> Result<u32, TypeError> {
        match self.kind(id) {
            TypeKind::Primitive { bits, .. } => Ok(*bits),
            TypeKind::Pointer { .. } => Ok(64),
            TypeKind::Array { length, element } => {
                Ok(length * self.size_in_bits(*element)?)
            }
            TypeKind::Struct {
                name,
                fields,
                complete,
                ..
            } => {
                if !complete {
                    return Err(TypeError::Incomplete(name.clone()));
                }
                let mut total = 0;
                for (field_ty, _) in fields {
                    total += self.size_in_bits(*field_ty)?;
                }
                Ok(total)
            }
        }
    }

    /// Human-readable spelling of a type, e.g. `i8*[4]`.
    pub fn display(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Primitive { name, .. } => (*name).to_string(),
            TypeKind::Pointer { pointee } => format!("{}*", self.display(*pointee)),
            TypeKind::Array { length, element } => {
                format!("{}[{}]", self.display(*element), length)
            }
            TypeKind::Struct { name, .. } => name.clone(),
        }
    }

    // Accessors for the handful of types the parser and type checker
    // reach for constantly.

    pub fn void(&self) -> TypeId {
        self.by_name["void"]
    }

    pub fn bool_type(&self) -> TypeId {
        self.by_name["bool"]
    }

    /// The type of byte values; string literals are `i8*`.
    pub fn i8_type(&self) -> TypeId {
        self.by_name["i8"]
    }

    /// The default type of integer literals.
    pub fn i32_type(&self) -> TypeId {
        self.by_name["i32"]
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(
            self.kind(id),
            TypeKind::Primitive { name, .. } if *name != "bool" && *name != "void"
        )
    }

    pub fn is_bool(&self, id: TypeId) -> bool {
        id == self.bool_type()
    }

    pub fn is_struct(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Struct { .. })
    }

    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Pointer { pointee } => Some(*pointee),
            _ => None,
        }
    }

    pub fn element(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Array { element, .. } => Some(*element),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_seeded() {
        let types = TypeRegistry::new();
        for name in ["i8", "i16", "i32", "i64", "bool", "void"] {
            assert!(types.exists(name), "missing builtin {}", name);
        }
        assert!(!types.exists("u32"));
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut types = TypeRegistry::new();
        let i32_ty = types.get("i32").unwrap();
        types.init();
        types.init();
        assert_eq!(types.get("i32"), Some(i32_ty));
        // No duplicate primitive slots were added.
        let count = ["i8", "i16", "i32", "i64", "bool", "void"]
            .iter()
            .filter(|n| types.exists(n))
            .count();
        assert_eq!(count, 6);
    }

    #[test]
    fn test_pointer_canonicalization() {
        let mut types = TypeRegistry::new();
        let i8_ty = types.get("i8").unwrap();
        let a = types.create_pointer(i8_ty);
        let b = types.create_pointer(i8_ty);
        assert_eq!(a, b);

        let i16_ty = types.get("i16").unwrap();
        assert_ne!(types.create_pointer(i16_ty), a);
    }

    #[test]
    fn test_array_canonicalization() {
        let mut types = TypeRegistry::new();
        let i32_ty = types.get("i32").unwrap();
        let a = types.create_array(4, i32_ty);
        let b = types.create_array(4, i32_ty);
        assert_eq!(a, b);
        assert_ne!(types.create_array(8, i32_ty), a);
    }

    #[test]
    fn test_nested_construction_display() {
        let mut types = TypeRegistry::new();
        let i8_ty = types.get("i8").unwrap();
        let ptr = types.create_pointer(i8_ty);
        let arr = types.create_array(4, ptr);
        assert_eq!(types.display(arr), "i8*[4]");
    }

    #[test]
    fn test_register_struct_and_fields() {
        let mut types = TypeRegistry::new();
        let i32_ty = types.get("i32").unwrap();
        let p = types
            .register_struct(
                "P",
                vec![(i32_ty, "x".to_string()), (i32_ty, "y".to_string())],
            )
            .unwrap();
        assert!(types.exists("P"));
        assert_eq!(types.struct_field(p, "x"), Some((0, i32_ty)));
        assert_eq!(types.struct_field(p, "y"), Some((1, i32_ty)));
        assert_eq!(types.struct_field(p, "z"), None);
    }

    #[test]
    fn test_duplicate_struct_rejected() {
        let mut types = TypeRegistry::new();
        types.register_struct("P", Vec::new()).unwrap();
        assert_eq!(
            types.register_struct("P", Vec::new()),
            Err(TypeError::Duplicate("P".to_string()))
        );
    }

    #[test]
    fn test_forward_declaration_then_body() {
        let mut types = TypeRegistry::new();
        let i64_ty = types.get("i64").unwrap();
        let node = types.register_struct("Node", Vec::new()).unwrap();
        assert_eq!(
            types.size_in_bits(node),
            Err(TypeError::Incomplete("Node".to_string()))
        );

        // Self-referential member through a pointer works before the
        // body is complete.
        let next = types.create_pointer(node);
        types.set_struct_body(
            node,
            vec![(i64_ty, "value".to_string()), (next, "next".to_string())],
        );
        assert_eq!(types.size_in_bits(node), Ok(64 + 64));
    }

    #[test]
    fn test_method_signatures() {
        let mut types = TypeRegistry::new();
        let i32_ty = types.get("i32").unwrap();
        let c = types.register_struct("C", vec![(i32_ty, "v".to_string())]).unwrap();
        types.add_method(
            c,
            MethodSig {
                name: "get".to_string(),
                return_type: Some(i32_ty),
                params: Vec::new(),
            },
        );
        let sig = types.struct_method(c, "get").unwrap();
        assert_eq!(sig.return_type, Some(i32_ty));
        assert!(types.struct_method(c, "set").is_none());
    }

    #[test]
    fn test_sizes() {
        let mut types = TypeRegistry::new();
        let i16_ty = types.get("i16").unwrap();
        assert_eq!(types.size_in_bits(i16_ty), Ok(16));
        let ptr = types.create_pointer(i16_ty);
        assert_eq!(types.size_in_bits(ptr), Ok(64));
        let arr = types.create_array(3, i16_ty);
        assert_eq!(types.size_in_bits(arr), Ok(48));
    }

    #[test]
    fn test_classification_helpers() {
        let mut types = TypeRegistry::new();
        let i32_ty = types.get("i32").unwrap();
        let bool_ty = types.get("bool").unwrap();
        let void_ty = types.get("void").unwrap();
        assert!(types.is_integer(i32_ty));
        assert!(!types.is_integer(bool_ty));
        assert!(!types.is_integer(void_ty));
        assert!(types.is_bool(bool_ty));
        assert_eq!(types.void(), void_ty);

        let ptr = types.create_pointer(i32_ty);
        assert_eq!(types.pointee(ptr), Some(i32_ty));
        assert_eq!(types.pointee(i32_ty), None);
        let arr = types.create_array(2, i32_ty);
        assert_eq!(types.element(arr), Some(i32_ty));
    }
}
