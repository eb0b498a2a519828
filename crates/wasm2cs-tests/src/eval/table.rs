//! Indirect call table for the interpreter.
//!
//! Each slot holds a typed function reference. `call_indirect` looks the
//! slot up and compares the entry's type index with the call site's, the
//! same check the generated C# performs with a delegate cast.

use super::Trap;
use wasm2cs::ir::{FuncIdx, Module, TypeIdx};

/// A single table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncRef {
    pub type_index: TypeIdx,
    pub func_index: FuncIdx,
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: Vec<Option<FuncRef>>,
}

impl Table {
    /// Build the table and apply every segment of the module.
    pub fn from_module(module: &Module) -> Result<Self, Trap> {
        let mut entries = vec![None; module.table.size as usize];
        for seg in &module.table.segments {
            for (i, func_index) in seg.functions.iter().enumerate() {
                let func = module.function(*func_index).ok_or_else(|| {
                    Trap::Malformed(format!("segment references function {func_index}"))
                })?;
                let slot = entries
                    .get_mut(seg.offset as usize + i)
                    .ok_or(Trap::TableOutOfBounds)?;
                *slot = Some(FuncRef {
                    type_index: func.type_idx,
                    func_index: *func_index,
                });
            }
        }
        Ok(Table { entries })
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Look up the slot at `index` (an `i32` operand read as unsigned).
    ///
    /// - `TableOutOfBounds` if `index >= size`
    /// - `UndefinedElement` if the slot is empty
    pub fn get(&self, index: i32) -> Result<FuncRef, Trap> {
        self.entries
            .get(index as u32 as usize)
            .copied()
            .ok_or(Trap::TableOutOfBounds)?
            .ok_or(Trap::UndefinedElement)
    }
}
