//! Module-level IR definitions.
//!
//! A [`Module`] is the linked, read-only view of a decoded binary: every
//! function sits at its final index in the unified function index space,
//! every type reference has been range checked, and table segments point at
//! real functions.

use std::collections::BTreeSet;
use std::fmt;

/// Generic index type with a phantom tag to distinguish different index spaces.
pub struct Idx<TAG> {
    idx: usize,
    _marker: std::marker::PhantomData<TAG>,
}

impl<TAG> Idx<TAG> {
    pub fn new(idx: usize) -> Self {
        Self {
            idx,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn as_usize(&self) -> usize {
        self.idx
    }
}

// Manual impls: deriving would require the tag itself to be Copy/Eq/...
impl<TAG> Clone for Idx<TAG> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<TAG> Copy for Idx<TAG> {}

impl<TAG> PartialEq for Idx<TAG> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<TAG> Eq for Idx<TAG> {}

impl<TAG> PartialOrd for Idx<TAG> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<TAG> Ord for Idx<TAG> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.idx.cmp(&other.idx)
    }
}

impl<TAG> std::hash::Hash for Idx<TAG> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
    }
}

impl<TAG> fmt::Debug for Idx<TAG> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.idx)
    }
}

impl<TAG> fmt::Display for Idx<TAG> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.idx)
    }
}

impl<TAG> From<Idx<TAG>> for usize {
    fn from(idx: Idx<TAG>) -> Self {
        idx.idx
    }
}

/// Type index, into `Module::types`.
pub type TypeIdx = Idx<FuncType>;

/// Function index in the unified space (imports first), into `Module::functions`.
pub type FuncIdx = Idx<Function>;

/// Global index, into `Module::globals`.
pub type GlobalIdx = Idx<Global>;

/// WebAssembly value types supported by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::I32 => write!(f, "i32"),
            ValueKind::I64 => write!(f, "i64"),
            ValueKind::F32 => write!(f, "f32"),
            ValueKind::F64 => write!(f, "f64"),
        }
    }
}

impl ValueKind {
    /// Convert a `wasmparser::ValType`. Returns `None` for vector and
    /// reference types.
    pub fn from_wasmparser(vt: wasmparser::ValType) -> Option<Self> {
        use wasmparser::ValType;
        match vt {
            ValType::I32 => Some(ValueKind::I32),
            ValType::I64 => Some(ValueKind::I64),
            ValType::F32 => Some(ValueKind::F32),
            ValType::F64 => Some(ValueKind::F64),
            ValType::V128 | ValType::Ref(_) => None,
        }
    }

    /// The zero value of this kind, used for declared locals.
    pub fn zero(&self) -> Value {
        match self {
            ValueKind::I32 => Value::I32(0),
            ValueKind::I64 => Value::I64(0),
            ValueKind::F32 => Value::F32(0.0),
            ValueKind::F64 => Value::F64(0.0),
        }
    }
}

/// A constant scalar. Floats keep their exact bit pattern, NaN payloads
/// included.
#[derive(Debug, Clone, Copy)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
        }
    }
}

// Bitwise equality: two NaNs with the same payload are equal, 0.0 and -0.0 are not.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "{v}i32"),
            Value::I64(v) => write!(f, "{v}i64"),
            Value::F32(v) => write!(f, "{v}f32"),
            Value::F64(v) => write!(f, "{v}f64"),
        }
    }
}

/// A function signature. At most one result is representable; signatures
/// with more are rejected while the module is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncType {
    pub index: TypeIdx,
    pub params: Vec<ValueKind>,
    pub result: Option<ValueKind>,
}

/// A body that belongs to a defined (non-imported) function.
#[derive(Debug, Clone)]
pub struct DefinedBody {
    /// Declared locals, following the parameters in the local index space.
    pub locals: Vec<ValueKind>,
    /// Raw operator bytes.
    pub code: Vec<u8>,
    /// Position of `code` in the original binary.
    pub code_offset: usize,
}

#[derive(Debug, Clone)]
pub enum FunctionKind {
    /// Supplied by the host. Carries the import's module and field names.
    Imported { module: String, field: String },
    Defined(DefinedBody),
}

/// One entry of the unified function index space.
#[derive(Debug, Clone)]
pub struct Function {
    pub index: FuncIdx,
    /// Original, unsanitized name.
    pub name: String,
    pub type_idx: TypeIdx,
    pub kind: FunctionKind,
}

impl Function {
    pub fn is_imported(&self) -> bool {
        matches!(self.kind, FunctionKind::Imported { .. })
    }

    pub fn body(&self) -> Option<&DefinedBody> {
        match &self.kind {
            FunctionKind::Defined(body) => Some(body),
            FunctionKind::Imported { .. } => None,
        }
    }
}

/// A module-level global. Mutability is recorded but every global is
/// emitted as a writable field.
#[derive(Debug, Clone)]
pub struct Global {
    pub index: GlobalIdx,
    pub kind: ValueKind,
    pub mutable: bool,
    pub init: Value,
}

/// Functions placed into the table starting at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSegment {
    pub offset: u32,
    pub functions: Vec<FuncIdx>,
}

/// The single indirect-call table, populated statically.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Number of slots: the declared initial size, grown to cover every segment.
    pub size: u32,
    pub segments: Vec<TableSegment>,
}

/// Linked module. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub types: Vec<FuncType>,
    /// Imports first, then defined functions, each in declaration order.
    pub functions: Vec<Function>,
    pub globals: Vec<Global>,
    pub table: Table,
    pub num_imported_functions: usize,
}

impl Module {
    pub fn function(&self, idx: FuncIdx) -> Option<&Function> {
        self.functions.get(idx.as_usize())
    }

    pub fn func_type(&self, idx: TypeIdx) -> Option<&FuncType> {
        self.types.get(idx.as_usize())
    }

    pub fn global(&self, idx: GlobalIdx) -> Option<&Global> {
        self.globals.get(idx.as_usize())
    }

    /// Signature of a function. The builder guarantees every function's type
    /// index resolves.
    pub fn signature_of(&self, func: &Function) -> Option<&FuncType> {
        self.func_type(func.type_idx)
    }

    pub fn imported_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions[..self.num_imported_functions].iter()
    }

    pub fn defined_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions[self.num_imported_functions..].iter()
    }

    /// Signatures of every function reachable through the table.
    pub fn table_type_indices(&self) -> BTreeSet<TypeIdx> {
        self.table
            .segments
            .iter()
            .flat_map(|seg| seg.functions.iter())
            .filter_map(|f| self.function(*f))
            .map(|f| f.type_idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idx_is_copy_and_ordered() {
        let a = TypeIdx::new(1);
        let b = a;
        assert_eq!(a, b);
        assert!(TypeIdx::new(0) < a);
        assert_eq!(usize::from(a), 1);
        assert_eq!(a.to_string(), "1");
    }

    #[test]
    fn value_kind_from_wasmparser() {
        use wasmparser::ValType;
        assert_eq!(ValueKind::from_wasmparser(ValType::I32), Some(ValueKind::I32));
        assert_eq!(ValueKind::from_wasmparser(ValType::F64), Some(ValueKind::F64));
        assert_eq!(ValueKind::from_wasmparser(ValType::V128), None);
        assert_eq!(ValueKind::from_wasmparser(ValType::FUNCREF), None);
    }

    #[test]
    fn value_equality_is_bitwise() {
        assert_eq!(Value::F32(f32::NAN), Value::F32(f32::NAN));
        assert_ne!(Value::F64(0.0), Value::F64(-0.0));
        assert_ne!(Value::I32(1), Value::I64(1));
        assert_eq!(ValueKind::F32.zero(), Value::F32(0.0));
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::I32(42).to_string(), "42i32");
        assert_eq!(Value::I64(-100).to_string(), "-100i64");
        assert_eq!(Value::F32(1.5).to_string(), "1.5f32");
    }

    #[test]
    fn table_type_indices_collects_entry_signatures() {
        let func = |i: usize, t: usize| Function {
            index: FuncIdx::new(i),
            name: format!("f{i}"),
            type_idx: TypeIdx::new(t),
            kind: FunctionKind::Imported {
                module: "env".to_string(),
                field: format!("f{i}"),
            },
        };
        let module = Module {
            functions: vec![func(0, 0), func(1, 2), func(2, 2)],
            num_imported_functions: 3,
            table: Table {
                size: 2,
                segments: vec![TableSegment {
                    offset: 0,
                    functions: vec![FuncIdx::new(1), FuncIdx::new(2)],
                }],
            },
            ..Default::default()
        };
        let set = module.table_type_indices();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![TypeIdx::new(2)]);
        assert_eq!(module.imported_functions().count(), 3);
        assert_eq!(module.defined_functions().count(), 0);
    }
}
