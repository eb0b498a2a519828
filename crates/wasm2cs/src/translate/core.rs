//! Translator state: the simulated operand stack and the control stack.
//!
//! The operand stack holds deferred expressions instead of values. Every
//! entry is pure and cannot trap, so it may be evaluated at its point of use
//! as long as nothing it reads has been overwritten in between. Writes that
//! could change such a read force the affected entries into temporaries
//! first (see [`FunctionTranslator::spill_where`]).

use crate::error::{IndexSpace, Result, TranspileError};
use crate::ir::*;
use std::collections::BTreeSet;

/// Height limit for one expression tree. An operand reaching it is bound to
/// a temporary so rendering stays shallow.
pub(super) const MAX_EXPR_DEPTH: u32 = 64;

/// Kind of structured scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FrameKind {
    /// The function body itself; branching here returns.
    Function,
    Block,
    Loop,
    If,
}

/// One open scope.
#[derive(Debug)]
pub(super) struct ControlFrame {
    pub(super) kind: FrameKind,
    pub(super) label: Label,

    /// Result kind (None for void)
    pub(super) result: Option<ValueKind>,

    /// Operand stack height at entry
    pub(super) stack_height: usize,

    /// Statements of the arm being built
    pub(super) body: Vec<Stmt>,

    /// `if` condition, consumed when the frame closes
    pub(super) condition: Option<Expr>,

    /// Finished then-arm, once `else` has been seen
    pub(super) then_body: Option<Vec<Stmt>>,

    /// The then-arm reached its end by falling through
    pub(super) then_falls_through: bool,

    /// Current arm ended in an unconditional transfer
    pub(super) unreachable: bool,

    /// Some branch exits to this scope's end
    pub(super) branched_to: bool,
}

impl ControlFrame {
    fn new(kind: FrameKind, label: Label, result: Option<ValueKind>, stack_height: usize) -> Self {
        Self {
            kind,
            label,
            result,
            stack_height,
            body: Vec::new(),
            condition: None,
            then_body: None,
            then_falls_through: false,
            unreachable: false,
            branched_to: false,
        }
    }

    /// Kind of the value a branch to this scope carries. Loop labels take
    /// the loop's parameters, which are always empty here.
    pub(super) fn branch_arity(&self) -> Option<ValueKind> {
        match self.kind {
            FrameKind::Loop => None,
            _ => self.result,
        }
    }
}

/// A deferred operand.
#[derive(Debug, Clone)]
pub(super) struct StackValue {
    pub(super) expr: Expr,
    pub(super) kind: ValueKind,

    /// Height of the operator tree in `expr`
    pub(super) depth: u32,
}

/// Per-function translation state.
pub(super) struct FunctionTranslator<'m> {
    pub(super) module: &'m Module,
    pub(super) func: &'m Function,

    /// Kinds of parameters followed by declared locals
    pub(super) locals: Vec<ValueKind>,

    pub(super) stack: Vec<StackValue>,
    pub(super) control: Vec<ControlFrame>,

    /// Slots declared at the top of the method
    pub(super) declarations: Vec<Declaration>,

    next_temp: u32,
    next_label: u32,

    /// Nesting depth of skipped constructs inside dead code
    pub(super) dead_depth: u32,

    /// Index of the operator being translated, for error context
    pub(super) operator_index: usize,

    /// Signatures present in the table
    pub(super) table_types: BTreeSet<TypeIdx>,

    /// Statements of the finished function body
    pub(super) finished: Option<Vec<Stmt>>,
}

impl<'m> FunctionTranslator<'m> {
    pub(super) fn new(module: &'m Module, func: &'m Function, body: &DefinedBody) -> Result<Self> {
        let sig = module.signature_of(func).ok_or_else(|| {
            TranspileError::invalid_index(
                format!("function {}", func.index),
                IndexSpace::Type,
                func.type_idx.as_usize() as u32,
            )
        })?;

        let mut locals = sig.params.clone();
        locals.extend_from_slice(&body.locals);

        let declarations = body
            .locals
            .iter()
            .enumerate()
            .map(|(i, kind)| Declaration {
                var: Var::Local((sig.params.len() + i) as u32),
                kind: *kind,
            })
            .collect();

        let mut translator = Self {
            module,
            func,
            locals,
            stack: Vec::new(),
            control: Vec::new(),
            declarations,
            next_temp: 0,
            next_label: 0,
            dead_depth: 0,
            operator_index: 0,
            table_types: module.table_type_indices(),
            finished: None,
        };
        let label = translator.new_label();
        translator
            .control
            .push(ControlFrame::new(FrameKind::Function, label, sig.result, 0));
        Ok(translator)
    }

    /// Human-readable position for error messages.
    pub(super) fn context(&self) -> String {
        format!(
            "function {} ({}), operator {}",
            self.func.index, self.func.name, self.operator_index
        )
    }

    pub(super) fn malformed(&self, what: &str) -> TranspileError {
        TranspileError::MalformedInput(format!("{}: {what}", self.context()))
    }

    pub(super) fn invalid_index(&self, space: IndexSpace, index: u32) -> TranspileError {
        TranspileError::invalid_index(self.context(), space, index)
    }

    fn new_temp(&mut self) -> TempId {
        let id = TempId(self.next_temp);
        self.next_temp += 1;
        id
    }

    fn new_label(&mut self) -> Label {
        let id = Label(self.next_label);
        self.next_label += 1;
        id
    }

    pub(super) fn frame(&self) -> Result<&ControlFrame> {
        self.control
            .last()
            .ok_or_else(|| self.malformed("operator after the end of the function"))
    }

    pub(super) fn frame_mut(&mut self) -> Result<&mut ControlFrame> {
        if self.control.is_empty() {
            return Err(self.malformed("operator after the end of the function"));
        }
        let last = self.control.len() - 1;
        Ok(&mut self.control[last])
    }

    pub(super) fn is_unreachable(&self) -> bool {
        self.control.last().is_some_and(|f| f.unreachable)
    }

    pub(super) fn set_unreachable(&mut self) -> Result<()> {
        self.frame_mut()?.unreachable = true;
        Ok(())
    }

    pub(super) fn emit(&mut self, stmt: Stmt) -> Result<()> {
        self.frame_mut()?.body.push(stmt);
        Ok(())
    }

    // ─── Operand stack ──────────────────────────────────────────────────

    pub(super) fn push(&mut self, expr: Expr, kind: ValueKind) {
        self.stack.push(StackValue {
            expr,
            kind,
            depth: 1,
        });
    }

    /// Push an operator whose deepest operand has depth `operand_depth`.
    pub(super) fn push_nested(
        &mut self,
        expr: Expr,
        kind: ValueKind,
        operand_depth: u32,
    ) -> Result<()> {
        let depth = operand_depth + 1;
        if depth >= MAX_EXPR_DEPTH {
            let value = self.materialize(expr, kind)?;
            self.push(value, kind);
        } else {
            self.stack.push(StackValue { expr, kind, depth });
        }
        Ok(())
    }

    pub(super) fn pop(&mut self) -> Result<StackValue> {
        let floor = self.frame()?.stack_height;
        if self.stack.len() <= floor {
            return Err(self.malformed("operand stack underflow"));
        }
        self.stack
            .pop()
            .ok_or_else(|| self.malformed("operand stack underflow"))
    }

    /// Pop an operand that must have kind `expected`.
    pub(super) fn pop_kind(&mut self, expected: ValueKind, what: &str) -> Result<StackValue> {
        let value = self.pop()?;
        self.check_kind(&value, expected, what)?;
        Ok(value)
    }

    /// Pop one operand per entry of `kinds`, returned in push order.
    pub(super) fn pop_kinds(&mut self, kinds: &[ValueKind], what: &str) -> Result<Vec<StackValue>> {
        let values = self.pop_n(kinds.len())?;
        for (value, kind) in values.iter().zip(kinds) {
            self.check_kind(value, *kind, what)?;
        }
        Ok(values)
    }

    fn check_kind(&self, value: &StackValue, expected: ValueKind, what: &str) -> Result<()> {
        if value.kind != expected {
            return Err(self.malformed(&format!(
                "{what} expects {expected}, found {}",
                value.kind
            )));
        }
        Ok(())
    }

    /// Pop `n` operands, returned in push order.
    pub(super) fn pop_n(&mut self, n: usize) -> Result<Vec<StackValue>> {
        let floor = self.frame()?.stack_height;
        if self.stack.len() < floor + n {
            return Err(self.malformed("operand stack underflow"));
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    /// Bind `value` to a fresh temporary at the current program point.
    pub(super) fn materialize(&mut self, value: Expr, kind: ValueKind) -> Result<Expr> {
        let temp = self.new_temp();
        self.emit(Stmt::Let { temp, kind, value })?;
        Ok(Expr::get(Var::Temp(temp)))
    }

    /// Return an expression that may be evaluated more than once with the
    /// same result: simple expressions as-is, others through a temporary.
    pub(super) fn duplicable(&mut self, value: StackValue) -> Result<Expr> {
        if value.expr.is_simple() {
            Ok(value.expr)
        } else {
            self.materialize(value.expr, value.kind)
        }
    }

    /// Move every pending operand matching `pred` into a temporary, in stack
    /// order, so a following write cannot change what it evaluates to.
    pub(super) fn spill_where(&mut self, pred: impl Fn(&Expr) -> bool) -> Result<()> {
        for i in 0..self.stack.len() {
            if matches!(self.stack[i].expr, Expr::Get(Var::Temp(_))) || !pred(&self.stack[i].expr)
            {
                continue;
            }
            let value = self.stack[i].clone();
            let spilled = self.materialize(value.expr, value.kind)?;
            self.stack[i].expr = spilled;
            self.stack[i].depth = 1;
        }
        Ok(())
    }

    /// Result-producing calls and trapping operators execute where they
    /// appear; everything else stays deferred.
    pub(super) fn push_effect(&mut self, expr: Expr, kind: Option<ValueKind>) -> Result<()> {
        match kind {
            Some(kind) => {
                let value = self.materialize(expr, kind)?;
                self.push(value, kind);
            }
            None => self.emit(Stmt::Eval(expr))?,
        }
        Ok(())
    }

    // ─── Locals and globals ─────────────────────────────────────────────

    pub(super) fn local_kind(&self, local_index: u32) -> Result<ValueKind> {
        self.locals
            .get(local_index as usize)
            .copied()
            .ok_or_else(|| self.invalid_index(IndexSpace::Local, local_index))
    }

    pub(super) fn global_kind(&self, global_index: u32) -> Result<ValueKind> {
        self.module
            .global(GlobalIdx::new(global_index as usize))
            .map(|g| g.kind)
            .ok_or_else(|| self.invalid_index(IndexSpace::Global, global_index))
    }

    // ─── Structured control ─────────────────────────────────────────────

    pub(super) fn block_result(&self, blockty: wasmparser::BlockType) -> Result<Option<ValueKind>> {
        match blockty {
            wasmparser::BlockType::Empty => Ok(None),
            wasmparser::BlockType::Type(vt) => ValueKind::from_wasmparser(vt)
                .map(Some)
                .ok_or_else(|| {
                    TranspileError::unsupported(self.context(), format!("block type {vt:?}"))
                }),
            wasmparser::BlockType::FuncType(idx) => Err(TranspileError::unsupported(
                self.context(),
                format!("multi-value block type {idx}"),
            )),
        }
    }

    /// Open a block, loop or if. Pending operands that read locals or
    /// globals are spilled first, since the scope body may overwrite them.
    pub(super) fn open_scope(
        &mut self,
        kind: FrameKind,
        result: Option<ValueKind>,
        condition: Option<Expr>,
    ) -> Result<()> {
        self.spill_where(Expr::reads_mutable_state)?;

        let label = self.new_label();
        if let Some(kind) = result {
            self.declarations.push(Declaration {
                var: Var::Result(label),
                kind,
            });
        }
        let mut frame = ControlFrame::new(kind, label, result, self.stack.len());
        frame.condition = condition;
        self.control.push(frame);
        Ok(())
    }

    /// Store the arm's value (if reachable) in the scope's result slot.
    fn close_arm(&mut self) -> Result<()> {
        let frame = self.frame()?;
        let (reachable, result, label) = (!frame.unreachable, frame.result, frame.label);
        if let (true, Some(kind)) = (reachable, result) {
            let value = self.pop_kind(kind, "scope result")?;
            self.emit(Stmt::Assign {
                target: Var::Result(label),
                value: value.expr,
            })?;
        }
        let height = self.frame()?.stack_height;
        self.stack.truncate(height);
        Ok(())
    }

    pub(super) fn handle_else(&mut self) -> Result<()> {
        {
            let frame = self.frame()?;
            if frame.kind != FrameKind::If || frame.then_body.is_some() {
                return Err(self.malformed("else without matching if"));
            }
        }
        self.close_arm()?;
        let frame = self.frame_mut()?;
        frame.then_falls_through = !frame.unreachable;
        frame.then_body = Some(std::mem::take(&mut frame.body));
        frame.unreachable = false;
        Ok(())
    }

    pub(super) fn handle_end(&mut self) -> Result<()> {
        if self.frame()?.kind == FrameKind::Function {
            return self.finish_function();
        }

        self.close_arm()?;
        let frame = self
            .control
            .pop()
            .ok_or_else(|| self.malformed("end without matching scope"))?;
        let falls_through = !frame.unreachable;

        let (stmt, exit_reachable) = match frame.kind {
            FrameKind::Block => (
                Stmt::Block {
                    label: frame.label,
                    body: frame.body,
                },
                falls_through || frame.branched_to,
            ),
            FrameKind::Loop => (
                Stmt::Loop {
                    label: frame.label,
                    body: frame.body,
                },
                falls_through,
            ),
            FrameKind::If => {
                let condition = frame
                    .condition
                    .ok_or_else(|| self.malformed("if scope without condition"))?;
                match frame.then_body {
                    Some(then_body) => (
                        Stmt::If {
                            label: frame.label,
                            condition,
                            then_body,
                            else_body: frame.body,
                        },
                        frame.then_falls_through || falls_through || frame.branched_to,
                    ),
                    None => {
                        if frame.result.is_some() {
                            return Err(self.malformed("if with a result but no else"));
                        }
                        (
                            Stmt::If {
                                label: frame.label,
                                condition,
                                then_body: frame.body,
                                else_body: Vec::new(),
                            },
                            true,
                        )
                    }
                }
            }
            FrameKind::Function => return Err(self.malformed("unbalanced end")),
        };

        self.emit(stmt)?;
        if !exit_reachable {
            self.set_unreachable()?;
        }
        if let Some(kind) = frame.result {
            self.push(Expr::get(Var::Result(frame.label)), kind);
        }
        Ok(())
    }

    fn finish_function(&mut self) -> Result<()> {
        let (reachable, result) = {
            let frame = self.frame()?;
            (!frame.unreachable, frame.result)
        };
        if reachable {
            let value = match result {
                Some(kind) => Some(self.pop_kind(kind, "function result")?.expr),
                None => None,
            };
            if value.is_some() {
                self.emit(Stmt::Return(value))?;
            }
        } else if result.is_some() {
            let ends_in_transfer = matches!(
                self.frame()?.body.last(),
                Some(Stmt::Return(_)) | Some(Stmt::Trap)
            );
            if !ends_in_transfer {
                // Every path has already left the function; the method still
                // needs a terminating statement.
                self.emit(Stmt::Trap)?;
            }
        }
        let frame = self
            .control
            .pop()
            .ok_or_else(|| self.malformed("end without matching scope"))?;
        self.stack.clear();
        self.finished = Some(frame.body);
        Ok(())
    }

    // ─── Branches ───────────────────────────────────────────────────────

    /// Index into the control stack of the scope `depth` levels out.
    pub(super) fn target_frame(&self, depth: u32) -> Result<usize> {
        let len = self.control.len();
        if (depth as usize) >= len {
            return Err(self.invalid_index(IndexSpace::Label, depth));
        }
        Ok(len - 1 - depth as usize)
    }

    pub(super) fn branch_arity(&self, depth: u32) -> Result<Option<ValueKind>> {
        let i = self.target_frame(depth)?;
        Ok(self.control[i].branch_arity())
    }

    /// Statements that carry `value` to the scope `depth` levels out and
    /// transfer control there.
    pub(super) fn branch_transfer(&mut self, depth: u32, value: Option<Expr>) -> Result<Vec<Stmt>> {
        let i = self.target_frame(depth)?;
        let frame = &mut self.control[i];
        let stmts = match frame.kind {
            FrameKind::Function => vec![Stmt::Return(value)],
            FrameKind::Loop => vec![Stmt::Br {
                target: frame.label,
                kind: BranchKind::Restart,
            }],
            FrameKind::Block | FrameKind::If => {
                frame.branched_to = true;
                let br = Stmt::Br {
                    target: frame.label,
                    kind: BranchKind::Exit,
                };
                match value {
                    Some(value) => vec![
                        Stmt::Assign {
                            target: Var::Result(frame.label),
                            value,
                        },
                        br,
                    ],
                    None => vec![br],
                }
            }
        };
        Ok(stmts)
    }
}
