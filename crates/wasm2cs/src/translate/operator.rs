//! Wasm operator → statement IR dispatch.

use super::core::{FrameKind, FunctionTranslator};
use crate::error::{IndexSpace, Result, TranspileError};
use crate::ir::*;
use wasmparser::Operator;

/// Short operator name for diagnostics (`I32Load` rather than the full
/// debug dump with immediates).
fn operator_name(op: &Operator) -> String {
    let full = format!("{op:?}");
    full.split([' ', '{', '('])
        .next()
        .unwrap_or_default()
        .to_string()
}

impl FunctionTranslator<'_> {
    /// Translate one operator. In dead code only the structure is tracked.
    pub(super) fn translate_operator(&mut self, op: &Operator) -> Result<()> {
        if self.is_unreachable() {
            return self.skip_dead(op);
        }

        match op {
            // Constants
            Operator::I32Const { value } => {
                self.push(Expr::Const(Value::I32(*value)), ValueKind::I32);
            }
            Operator::I64Const { value } => {
                self.push(Expr::Const(Value::I64(*value)), ValueKind::I64);
            }
            Operator::F32Const { value } => {
                let v = Value::F32(f32::from_bits(value.bits()));
                self.push(Expr::Const(v), ValueKind::F32);
            }
            Operator::F64Const { value } => {
                let v = Value::F64(f64::from_bits(value.bits()));
                self.push(Expr::Const(v), ValueKind::F64);
            }

            // Locals
            Operator::LocalGet { local_index } => {
                let kind = self.local_kind(*local_index)?;
                self.push(Expr::get(Var::Local(*local_index)), kind);
            }
            Operator::LocalSet { local_index } => {
                self.emit_local_set(*local_index)?;
            }
            Operator::LocalTee { local_index } => {
                let kind = self.emit_local_set(*local_index)?;
                self.push(Expr::get(Var::Local(*local_index)), kind);
            }

            // Globals
            Operator::GlobalGet { global_index } => {
                let kind = self.global_kind(*global_index)?;
                let var = Var::Global(GlobalIdx::new(*global_index as usize));
                self.push(Expr::get(var), kind);
            }
            Operator::GlobalSet { global_index } => {
                let kind = self.global_kind(*global_index)?;
                let var = Var::Global(GlobalIdx::new(*global_index as usize));
                let value = self.pop_kind(kind, "global.set")?;
                self.spill_where(|e| e.reads(var))?;
                self.emit(Stmt::Assign {
                    target: var,
                    value: value.expr,
                })?;
            }

            // === i32 binary operations ===
            Operator::I32Add => self.emit_binop(BinOp::I32Add)?,
            Operator::I32Sub => self.emit_binop(BinOp::I32Sub)?,
            Operator::I32Mul => self.emit_binop(BinOp::I32Mul)?,
            Operator::I32DivS => self.emit_binop(BinOp::I32DivS)?,
            Operator::I32DivU => self.emit_binop(BinOp::I32DivU)?,
            Operator::I32RemS => self.emit_binop(BinOp::I32RemS)?,
            Operator::I32RemU => self.emit_binop(BinOp::I32RemU)?,
            Operator::I32And => self.emit_binop(BinOp::I32And)?,
            Operator::I32Or => self.emit_binop(BinOp::I32Or)?,
            Operator::I32Xor => self.emit_binop(BinOp::I32Xor)?,
            Operator::I32Shl => self.emit_binop(BinOp::I32Shl)?,
            Operator::I32ShrS => self.emit_binop(BinOp::I32ShrS)?,
            Operator::I32ShrU => self.emit_binop(BinOp::I32ShrU)?,
            Operator::I32Rotl => self.emit_binop(BinOp::I32Rotl)?,
            Operator::I32Rotr => self.emit_binop(BinOp::I32Rotr)?,

            // === i32 comparisons ===
            Operator::I32Eq => self.emit_binop(BinOp::I32Eq)?,
            Operator::I32Ne => self.emit_binop(BinOp::I32Ne)?,
            Operator::I32LtS => self.emit_binop(BinOp::I32LtS)?,
            Operator::I32LtU => self.emit_binop(BinOp::I32LtU)?,
            Operator::I32GtS => self.emit_binop(BinOp::I32GtS)?,
            Operator::I32GtU => self.emit_binop(BinOp::I32GtU)?,
            Operator::I32LeS => self.emit_binop(BinOp::I32LeS)?,
            Operator::I32LeU => self.emit_binop(BinOp::I32LeU)?,
            Operator::I32GeS => self.emit_binop(BinOp::I32GeS)?,
            Operator::I32GeU => self.emit_binop(BinOp::I32GeU)?,

            // === i64 binary operations ===
            Operator::I64Add => self.emit_binop(BinOp::I64Add)?,
            Operator::I64Sub => self.emit_binop(BinOp::I64Sub)?,
            Operator::I64Mul => self.emit_binop(BinOp::I64Mul)?,
            Operator::I64DivS => self.emit_binop(BinOp::I64DivS)?,
            Operator::I64DivU => self.emit_binop(BinOp::I64DivU)?,
            Operator::I64RemS => self.emit_binop(BinOp::I64RemS)?,
            Operator::I64RemU => self.emit_binop(BinOp::I64RemU)?,
            Operator::I64And => self.emit_binop(BinOp::I64And)?,
            Operator::I64Or => self.emit_binop(BinOp::I64Or)?,
            Operator::I64Xor => self.emit_binop(BinOp::I64Xor)?,
            Operator::I64Shl => self.emit_binop(BinOp::I64Shl)?,
            Operator::I64ShrS => self.emit_binop(BinOp::I64ShrS)?,
            Operator::I64ShrU => self.emit_binop(BinOp::I64ShrU)?,
            Operator::I64Rotl => self.emit_binop(BinOp::I64Rotl)?,
            Operator::I64Rotr => self.emit_binop(BinOp::I64Rotr)?,

            // === i64 comparisons ===
            Operator::I64Eq => self.emit_binop(BinOp::I64Eq)?,
            Operator::I64Ne => self.emit_binop(BinOp::I64Ne)?,
            Operator::I64LtS => self.emit_binop(BinOp::I64LtS)?,
            Operator::I64LtU => self.emit_binop(BinOp::I64LtU)?,
            Operator::I64GtS => self.emit_binop(BinOp::I64GtS)?,
            Operator::I64GtU => self.emit_binop(BinOp::I64GtU)?,
            Operator::I64LeS => self.emit_binop(BinOp::I64LeS)?,
            Operator::I64LeU => self.emit_binop(BinOp::I64LeU)?,
            Operator::I64GeS => self.emit_binop(BinOp::I64GeS)?,
            Operator::I64GeU => self.emit_binop(BinOp::I64GeU)?,

            // === f32 ===
            Operator::F32Add => self.emit_binop(BinOp::F32Add)?,
            Operator::F32Sub => self.emit_binop(BinOp::F32Sub)?,
            Operator::F32Mul => self.emit_binop(BinOp::F32Mul)?,
            Operator::F32Div => self.emit_binop(BinOp::F32Div)?,
            Operator::F32Min => self.emit_binop(BinOp::F32Min)?,
            Operator::F32Max => self.emit_binop(BinOp::F32Max)?,
            Operator::F32Copysign => self.emit_binop(BinOp::F32Copysign)?,
            Operator::F32Eq => self.emit_binop(BinOp::F32Eq)?,
            Operator::F32Ne => self.emit_binop(BinOp::F32Ne)?,
            Operator::F32Lt => self.emit_binop(BinOp::F32Lt)?,
            Operator::F32Gt => self.emit_binop(BinOp::F32Gt)?,
            Operator::F32Le => self.emit_binop(BinOp::F32Le)?,
            Operator::F32Ge => self.emit_binop(BinOp::F32Ge)?,

            // === f64 ===
            Operator::F64Add => self.emit_binop(BinOp::F64Add)?,
            Operator::F64Sub => self.emit_binop(BinOp::F64Sub)?,
            Operator::F64Mul => self.emit_binop(BinOp::F64Mul)?,
            Operator::F64Div => self.emit_binop(BinOp::F64Div)?,
            Operator::F64Min => self.emit_binop(BinOp::F64Min)?,
            Operator::F64Max => self.emit_binop(BinOp::F64Max)?,
            Operator::F64Copysign => self.emit_binop(BinOp::F64Copysign)?,
            Operator::F64Eq => self.emit_binop(BinOp::F64Eq)?,
            Operator::F64Ne => self.emit_binop(BinOp::F64Ne)?,
            Operator::F64Lt => self.emit_binop(BinOp::F64Lt)?,
            Operator::F64Gt => self.emit_binop(BinOp::F64Gt)?,
            Operator::F64Le => self.emit_binop(BinOp::F64Le)?,
            Operator::F64Ge => self.emit_binop(BinOp::F64Ge)?,

            // === Unary ===
            Operator::I32Clz => self.emit_unop(UnOp::I32Clz)?,
            Operator::I32Ctz => self.emit_unop(UnOp::I32Ctz)?,
            Operator::I32Popcnt => self.emit_unop(UnOp::I32Popcnt)?,
            Operator::I32Eqz => self.emit_unop(UnOp::I32Eqz)?,
            Operator::I64Clz => self.emit_unop(UnOp::I64Clz)?,
            Operator::I64Ctz => self.emit_unop(UnOp::I64Ctz)?,
            Operator::I64Popcnt => self.emit_unop(UnOp::I64Popcnt)?,
            Operator::I64Eqz => self.emit_unop(UnOp::I64Eqz)?,

            Operator::F32Abs => self.emit_unop(UnOp::F32Abs)?,
            Operator::F32Neg => self.emit_unop(UnOp::F32Neg)?,
            Operator::F32Ceil => self.emit_unop(UnOp::F32Ceil)?,
            Operator::F32Floor => self.emit_unop(UnOp::F32Floor)?,
            Operator::F32Trunc => self.emit_unop(UnOp::F32Trunc)?,
            Operator::F32Nearest => self.emit_unop(UnOp::F32Nearest)?,
            Operator::F32Sqrt => self.emit_unop(UnOp::F32Sqrt)?,
            Operator::F64Abs => self.emit_unop(UnOp::F64Abs)?,
            Operator::F64Neg => self.emit_unop(UnOp::F64Neg)?,
            Operator::F64Ceil => self.emit_unop(UnOp::F64Ceil)?,
            Operator::F64Floor => self.emit_unop(UnOp::F64Floor)?,
            Operator::F64Trunc => self.emit_unop(UnOp::F64Trunc)?,
            Operator::F64Nearest => self.emit_unop(UnOp::F64Nearest)?,
            Operator::F64Sqrt => self.emit_unop(UnOp::F64Sqrt)?,

            // === Conversions ===
            Operator::I32WrapI64 => self.emit_unop(UnOp::I32WrapI64)?,
            Operator::I64ExtendI32S => self.emit_unop(UnOp::I64ExtendI32S)?,
            Operator::I64ExtendI32U => self.emit_unop(UnOp::I64ExtendI32U)?,
            Operator::I32Extend8S => self.emit_unop(UnOp::I32Extend8S)?,
            Operator::I32Extend16S => self.emit_unop(UnOp::I32Extend16S)?,
            Operator::I64Extend8S => self.emit_unop(UnOp::I64Extend8S)?,
            Operator::I64Extend16S => self.emit_unop(UnOp::I64Extend16S)?,
            Operator::I64Extend32S => self.emit_unop(UnOp::I64Extend32S)?,

            Operator::I32TruncF32S => self.emit_unop(UnOp::I32TruncF32S)?,
            Operator::I32TruncF32U => self.emit_unop(UnOp::I32TruncF32U)?,
            Operator::I32TruncF64S => self.emit_unop(UnOp::I32TruncF64S)?,
            Operator::I32TruncF64U => self.emit_unop(UnOp::I32TruncF64U)?,
            Operator::I64TruncF32S => self.emit_unop(UnOp::I64TruncF32S)?,
            Operator::I64TruncF32U => self.emit_unop(UnOp::I64TruncF32U)?,
            Operator::I64TruncF64S => self.emit_unop(UnOp::I64TruncF64S)?,
            Operator::I64TruncF64U => self.emit_unop(UnOp::I64TruncF64U)?,

            Operator::F32ConvertI32S => self.emit_unop(UnOp::F32ConvertI32S)?,
            Operator::F32ConvertI32U => self.emit_unop(UnOp::F32ConvertI32U)?,
            Operator::F32ConvertI64S => self.emit_unop(UnOp::F32ConvertI64S)?,
            Operator::F32ConvertI64U => self.emit_unop(UnOp::F32ConvertI64U)?,
            Operator::F64ConvertI32S => self.emit_unop(UnOp::F64ConvertI32S)?,
            Operator::F64ConvertI32U => self.emit_unop(UnOp::F64ConvertI32U)?,
            Operator::F64ConvertI64S => self.emit_unop(UnOp::F64ConvertI64S)?,
            Operator::F64ConvertI64U => self.emit_unop(UnOp::F64ConvertI64U)?,

            Operator::F32DemoteF64 => self.emit_unop(UnOp::F32DemoteF64)?,
            Operator::F64PromoteF32 => self.emit_unop(UnOp::F64PromoteF32)?,

            Operator::I32ReinterpretF32 => self.emit_unop(UnOp::I32ReinterpretF32)?,
            Operator::I64ReinterpretF64 => self.emit_unop(UnOp::I64ReinterpretF64)?,
            Operator::F32ReinterpretI32 => self.emit_unop(UnOp::F32ReinterpretI32)?,
            Operator::F64ReinterpretI64 => self.emit_unop(UnOp::F64ReinterpretI64)?,

            // === Parametric ===
            Operator::Drop => {
                self.pop()?;
            }
            Operator::Select | Operator::TypedSelect { .. } => {
                let condition = self.pop_kind(ValueKind::I32, "select condition")?;
                let if_false = self.pop()?;
                let if_true = self.pop_kind(if_false.kind, "select")?;
                let kind = if_true.kind;
                let depth = condition.depth.max(if_true.depth).max(if_false.depth);
                let expr = Expr::Select {
                    condition: Box::new(condition.expr),
                    if_true: Box::new(if_true.expr),
                    if_false: Box::new(if_false.expr),
                };
                self.push_nested(expr, kind, depth)?;
            }
            Operator::Nop => {}

            // === Structured control ===
            Operator::Block { blockty } => {
                let result = self.block_result(*blockty)?;
                self.open_scope(FrameKind::Block, result, None)?;
            }
            Operator::Loop { blockty } => {
                let result = self.block_result(*blockty)?;
                self.open_scope(FrameKind::Loop, result, None)?;
            }
            Operator::If { blockty } => {
                let result = self.block_result(*blockty)?;
                let condition = self.pop_kind(ValueKind::I32, "if condition")?;
                self.open_scope(FrameKind::If, result, Some(condition.expr))?;
            }
            Operator::Else => self.handle_else()?,
            Operator::End => self.handle_end()?,

            // === Branches ===
            Operator::Br { relative_depth } => {
                let value = match self.branch_arity(*relative_depth)? {
                    Some(kind) => Some(self.pop_kind(kind, "br value")?.expr),
                    None => None,
                };
                for stmt in self.branch_transfer(*relative_depth, value)? {
                    self.emit(stmt)?;
                }
                self.set_unreachable()?;
            }
            Operator::BrIf { relative_depth } => {
                let condition = self.pop_kind(ValueKind::I32, "br_if condition")?;
                let value = match self.branch_arity(*relative_depth)? {
                    Some(kind) => {
                        // The value stays on the stack for the fall-through path.
                        let top = self.pop_kind(kind, "br_if value")?;
                        let value = self.duplicable(top)?;
                        self.push(value.clone(), kind);
                        Some(value)
                    }
                    None => None,
                };
                let transfer = self.branch_transfer(*relative_depth, value)?;
                self.emit(Stmt::BranchIf {
                    condition: condition.expr,
                    transfer,
                })?;
            }
            Operator::BrTable { targets } => {
                let index = self.pop_kind(ValueKind::I32, "br_table index")?;
                let default_depth = targets.default();
                let arity = self.branch_arity(default_depth)?;
                let value = match arity {
                    Some(kind) => {
                        let top = self.pop_kind(kind, "br_table value")?;
                        Some(self.duplicable(top)?)
                    }
                    None => None,
                };
                let mut cases = Vec::with_capacity(targets.len() as usize);
                for depth in targets.targets() {
                    let depth = depth
                        .map_err(|e| self.malformed(&format!("reading br_table target: {e}")))?;
                    if self.branch_arity(depth)? != arity {
                        return Err(self.malformed("br_table targets disagree on the branch value"));
                    }
                    cases.push(self.branch_transfer(depth, value.clone())?);
                }
                let default = self.branch_transfer(default_depth, value)?;
                self.emit(Stmt::BranchTable {
                    index: index.expr,
                    cases,
                    default,
                })?;
                self.set_unreachable()?;
            }
            Operator::Return => {
                self.frame()?;
                let depth = (self.control.len() - 1) as u32;
                let value = match self.branch_arity(depth)? {
                    Some(kind) => Some(self.pop_kind(kind, "return value")?.expr),
                    None => None,
                };
                self.emit(Stmt::Return(value))?;
                self.set_unreachable()?;
            }
            Operator::Unreachable => {
                self.emit(Stmt::Trap)?;
                self.set_unreachable()?;
            }

            // === Calls ===
            Operator::Call { function_index } => self.emit_call(*function_index)?,
            Operator::CallIndirect {
                type_index,
                table_index,
            } => self.emit_call_indirect(*type_index, *table_index)?,

            other => {
                return Err(TranspileError::unsupported(
                    self.context(),
                    operator_name(other),
                ))
            }
        }
        Ok(())
    }

    /// Operators after an unconditional transfer are never executed. Nested
    /// constructs are counted so the matching `else`/`end` is found.
    fn skip_dead(&mut self, op: &Operator) -> Result<()> {
        match op {
            Operator::Block { .. } | Operator::Loop { .. } | Operator::If { .. } => {
                self.dead_depth += 1;
            }
            Operator::Else if self.dead_depth == 0 => self.handle_else()?,
            Operator::End if self.dead_depth == 0 => self.handle_end()?,
            Operator::End => self.dead_depth -= 1,
            _ => {}
        }
        Ok(())
    }

    /// Assign the top of the stack to a local. Returns the local's kind.
    fn emit_local_set(&mut self, local_index: u32) -> Result<ValueKind> {
        let kind = self.local_kind(local_index)?;
        let var = Var::Local(local_index);
        let value = self.pop_kind(kind, "local.set")?;
        self.spill_where(|e| e.reads(var))?;
        self.emit(Stmt::Assign {
            target: var,
            value: value.expr,
        })?;
        Ok(kind)
    }

    pub(super) fn emit_binop(&mut self, op: BinOp) -> Result<()> {
        let what = format!("{op:?}");
        let rhs = self.pop_kind(op.operand_type(), &what)?;
        let lhs = self.pop_kind(op.operand_type(), &what)?;
        let depth = lhs.depth.max(rhs.depth);
        // The signed 64-bit remainder is emitted with a guard that reads the
        // divisor twice.
        let rhs = if op == BinOp::I64RemS {
            self.duplicable(rhs)?
        } else {
            rhs.expr
        };
        let expr = Expr::binary(op, lhs.expr, rhs);
        if op.can_trap() {
            self.push_effect(expr, Some(op.result_type()))
        } else {
            self.push_nested(expr, op.result_type(), depth)
        }
    }

    pub(super) fn emit_unop(&mut self, op: UnOp) -> Result<()> {
        let operand = self.pop_kind(op.operand_type(), &format!("{op:?}"))?;
        let depth = operand.depth;
        let expr = Expr::unary(op, operand.expr);
        if op.can_trap() {
            self.push_effect(expr, Some(op.result_type()))
        } else {
            self.push_nested(expr, op.result_type(), depth)
        }
    }

    fn emit_call(&mut self, function_index: u32) -> Result<()> {
        let callee = self
            .module
            .function(FuncIdx::new(function_index as usize))
            .ok_or_else(|| self.invalid_index(IndexSpace::Function, function_index))?;
        let sig = self
            .module
            .signature_of(callee)
            .ok_or_else(|| self.invalid_index(IndexSpace::Type, callee.type_idx.as_usize() as u32))?;
        let (callee, params, result) = (callee.index, sig.params.clone(), sig.result);

        let args = self.pop_kinds(&params, "call argument")?;
        // The callee may write any global.
        self.spill_where(Expr::reads_any_global)?;
        let call = Expr::Call {
            callee,
            args: args.into_iter().map(|a| a.expr).collect(),
        };
        self.push_effect(call, result)
    }

    fn emit_call_indirect(&mut self, type_index: u32, table_index: u32) -> Result<()> {
        if table_index != 0 {
            return Err(self.invalid_index(IndexSpace::Table, table_index));
        }
        let type_idx = TypeIdx::new(type_index as usize);
        let sig = self
            .module
            .func_type(type_idx)
            .ok_or_else(|| self.invalid_index(IndexSpace::Type, type_index))?;
        if !self.table_types.contains(&type_idx) {
            return Err(TranspileError::invalid_index(
                format!("{}: no table entry has this signature", self.context()),
                IndexSpace::Type,
                type_index,
            ));
        }
        let (params, result) = (sig.params.clone(), sig.result);

        let index = self.pop_kind(ValueKind::I32, "call_indirect index")?;
        let args = self.pop_kinds(&params, "call_indirect argument")?;
        self.spill_where(Expr::reads_any_global)?;
        let call = Expr::CallIndirect {
            type_idx,
            index: Box::new(index.expr),
            args: args.into_iter().map(|a| a.expr).collect(),
        };
        self.push_effect(call, result)
    }
}
