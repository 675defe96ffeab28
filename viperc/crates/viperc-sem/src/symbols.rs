//! Flat global symbol tables.
//!
//! Functions and global variables are not scoped; they live in two
//! process-wide maps owned by the [`Context`](crate::Context). Lookup
//! order elsewhere in the compiler is locals first, then functions,
//! then globals, so a local binding always wins.
//!
//! Insertion order is preserved so code generation walks symbols in
//! the order they were declared.

use indexmap::IndexMap;

use crate::types::TypeId;

/// Opaque handle to a back-end value (a function, a stack slot, a
/// global). Assigned by the emitter during code generation; `0` is
/// never handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

/// A globally visible function signature.
#[derive(Clone, Debug)]
pub struct FunctionSymbol {
    pub return_type: TypeId,
    pub params: Vec<TypeId>,
    /// Back-end function handle, `None` until codegen.
    pub handle: Option<ValueId>,
}

/// A global variable.
#[derive(Clone, Debug)]
pub struct GlobalSymbol {
    pub ty: TypeId,
    /// Back-end storage handle, `None` until codegen.
    pub handle: Option<ValueId>,
}

/// Name → signature map for functions.
///
/// Declaring a name twice replaces the entry; a forward declaration
/// followed by a definition is the common case.
#[derive(Debug, Default)]
pub struct FunctionTable {
    map: IndexMap<String, FunctionSymbol>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, return_type: TypeId, params: Vec<TypeId>) {
        self.map.insert(
            name.to_string(),
            FunctionSymbol {
                return_type,
                params,
                handle: None,
            },
        );
    }

    pub fn lookup(&self, name: &str) -> Option<&FunctionSymbol> {
        self.map.get(name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut FunctionSymbol> {
        self.map.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FunctionSymbol)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Name → symbol map for global variables.
#[derive(Debug, Default)]
pub struct GlobalTable {
    map: IndexMap<String, GlobalSymbol>,
}

impl GlobalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, ty: TypeId) {
        self.map
            .insert(name.to_string(), GlobalSymbol { ty, handle: None });
    }

    pub fn lookup(&self, name: &str) -> Option<&GlobalSymbol> {
        self.map.get(name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut GlobalSymbol> {
        self.map.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GlobalSymbol)> {
        self.map.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    #[test]
    fn test_function_declare_and_lookup() {
        let mut types = TypeRegistry::new();
        let i32_ty = types.get("i32").unwrap();
        let ptr = types.create_pointer(i32_ty);

        let mut functions = FunctionTable::new();
        functions.declare("read", i32_ty, vec![ptr]);

        let sym = functions.lookup("read").unwrap();
        assert_eq!(sym.return_type, i32_ty);
        assert_eq!(sym.params, vec![ptr]);
        assert_eq!(sym.handle, None);
        assert!(functions.lookup("write").is_none());
    }

    #[test]
    fn test_function_redeclaration_replaces() {
        let types = TypeRegistry::new();
        let i32_ty = types.get("i32").unwrap();
        let void_ty = types.get("void").unwrap();

        let mut functions = FunctionTable::new();
        functions.declare("f", void_ty, Vec::new());
        functions.declare("f", i32_ty, vec![i32_ty]);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions.lookup("f").unwrap().return_type, i32_ty);
    }

    #[test]
    fn test_declaration_order_preserved() {
        let types = TypeRegistry::new();
        let void_ty = types.get("void").unwrap();

        let mut functions = FunctionTable::new();
        for name in ["c", "a", "b"] {
            functions.declare(name, void_ty, Vec::new());
        }
        let names: Vec<&str> = functions.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_global_table() {
        let types = TypeRegistry::new();
        let i64_ty = types.get("i64").unwrap();

        let mut globals = GlobalTable::new();
        globals.declare("counter", i64_ty);
        assert!(globals.contains("counter"));
        assert_eq!(globals.lookup("counter").unwrap().ty, i64_ty);
        assert_eq!(globals.lookup("counter").unwrap().handle, None);
    }
}
