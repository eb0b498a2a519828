//! Interpreter for the translated statement IR.
//!
//! [`Machine`] executes [`FunctionBody`] trees with Wasm semantics: the same
//! structured statements the C# emitter renders, with each scope, branch and
//! temporary behaving as it does in the generated code. Running a WAT module
//! through it checks the translation without a .NET toolchain.

mod ops;
mod table;

pub use table::{FuncRef, Table};

use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use wasm2cs::ir::*;
use wasm2cs::TranslatedModule;

/// Nested calls allowed before the interpreter gives up.
const MAX_CALL_DEPTH: usize = 200;

/// Wasm execution errors, plus faults in the IR under test.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Trap {
    #[error("unreachable executed")]
    Unreachable,
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("indirect call type mismatch")]
    IndirectCallTypeMismatch,
    #[error("table index out of bounds")]
    TableOutOfBounds,
    #[error("undefined table element")]
    UndefinedElement,
    #[error("call stack exhausted")]
    CallStackExhausted,
    #[error("no host function for import {0}")]
    MissingImport(String),
    #[error("no function named {0}")]
    UnknownFunction(String),
    /// The IR itself is inconsistent: a kind mismatch, an unbound temporary,
    /// a branch with no enclosing target.
    #[error("malformed IR: {0}")]
    Malformed(String),
}

/// A host function supplied for an import.
pub type HostFn = Box<dyn FnMut(&[Value]) -> Result<Option<Value>, Trap>>;

/// How control leaves a statement list.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    Next,
    Branch(Label, BranchKind),
    Return(Option<Value>),
}

/// Slots of one activation.
#[derive(Debug, Default)]
struct Frame {
    locals: Vec<Value>,
    temps: HashMap<TempId, Value>,
    results: HashMap<Label, Value>,
}

impl Frame {
    fn new(args: &[Value], declarations: &[Declaration]) -> Self {
        let mut frame = Frame {
            locals: args.to_vec(),
            ..Frame::default()
        };
        for decl in declarations {
            match decl.var {
                Var::Local(_) => frame.locals.push(decl.kind.zero()),
                Var::Result(label) => {
                    frame.results.insert(label, decl.kind.zero());
                }
                Var::Global(_) | Var::Temp(_) => {}
            }
        }
        frame
    }
}

pub struct Machine {
    module: Rc<Module>,
    bodies: HashMap<FuncIdx, Rc<FunctionBody>>,
    globals: Vec<Value>,
    table: Table,
    imports: HashMap<(String, String), HostFn>,
    depth: usize,
}

impl Machine {
    pub fn new(translated: TranslatedModule) -> Result<Self, Trap> {
        let TranslatedModule { module, bodies } = translated;
        let globals = module.globals.iter().map(|g| g.init).collect();
        let table = Table::from_module(&module)?;
        let bodies = bodies
            .into_iter()
            .map(|body| (body.func, Rc::new(body)))
            .collect();
        Ok(Machine {
            module: Rc::new(module),
            bodies,
            globals,
            table,
            imports: HashMap::new(),
            depth: 0,
        })
    }

    /// Translate a WAT module and load it.
    pub fn from_wat(wat: &str) -> anyhow::Result<Self> {
        let wasm = wat::parse_str(wat)?;
        let translated = wasm2cs::translate(&wasm)?;
        Ok(Machine::new(translated)?)
    }

    /// Provide the host function for `module.field`.
    pub fn with_import<F>(mut self, module: &str, field: &str, f: F) -> Self
    where
        F: FnMut(&[Value]) -> Result<Option<Value>, Trap> + 'static,
    {
        self.imports
            .insert((module.to_string(), field.to_string()), Box::new(f));
        self
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn global(&self, index: usize) -> Option<Value> {
        self.globals.get(index).copied()
    }

    /// Translated body of the function with this original name.
    pub fn body(&self, name: &str) -> Option<&FunctionBody> {
        let func = self.module.functions.iter().find(|f| f.name == name)?;
        self.bodies.get(&func.index).map(|b| b.as_ref())
    }

    /// Call a function by its original name.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, Trap> {
        let idx = self
            .module
            .functions
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.index)
            .ok_or_else(|| Trap::UnknownFunction(name.to_string()))?;
        self.invoke(idx, args)
    }

    /// Call a function returning `i32`.
    pub fn call_i32(&mut self, name: &str, args: &[Value]) -> Result<i32, Trap> {
        match self.call(name, args)? {
            Some(Value::I32(v)) => Ok(v),
            other => Err(Trap::Malformed(format!("{name} returned {other:?}"))),
        }
    }

    /// Call a function returning `i64`.
    pub fn call_i64(&mut self, name: &str, args: &[Value]) -> Result<i64, Trap> {
        match self.call(name, args)? {
            Some(Value::I64(v)) => Ok(v),
            other => Err(Trap::Malformed(format!("{name} returned {other:?}"))),
        }
    }

    pub fn invoke(&mut self, idx: FuncIdx, args: &[Value]) -> Result<Option<Value>, Trap> {
        let module = Rc::clone(&self.module);
        let func = module
            .function(idx)
            .ok_or_else(|| Trap::Malformed(format!("no function {idx}")))?;
        let sig = module
            .signature_of(func)
            .ok_or_else(|| Trap::Malformed(format!("no signature for function {idx}")))?;
        let kinds: Vec<ValueKind> = args.iter().map(Value::kind).collect();
        if kinds != sig.params {
            return Err(Trap::Malformed(format!(
                "{} expects {:?}, got {:?}",
                func.name, sig.params, kinds
            )));
        }

        let result = match &func.kind {
            FunctionKind::Imported { module: m, field } => {
                let host = self
                    .imports
                    .get_mut(&(m.clone(), field.clone()))
                    .ok_or_else(|| Trap::MissingImport(format!("{m}.{field}")))?;
                host(args)?
            }
            FunctionKind::Defined(_) => {
                if self.depth >= MAX_CALL_DEPTH {
                    return Err(Trap::CallStackExhausted);
                }
                let body = self
                    .bodies
                    .get(&idx)
                    .cloned()
                    .ok_or_else(|| Trap::Malformed(format!("{} was not translated", func.name)))?;
                let mut frame = Frame::new(args, &body.declarations);
                self.depth += 1;
                let flow = self.exec(&mut frame, &body.statements);
                self.depth -= 1;
                match flow? {
                    Flow::Return(value) => value,
                    Flow::Next => None,
                    Flow::Branch(label, _) => {
                        return Err(Trap::Malformed(format!("branch to {label} left {}", func.name)))
                    }
                }
            }
        };

        if result.map(|v| v.kind()) != sig.result {
            return Err(Trap::Malformed(format!(
                "{} returned {result:?}, declared {:?}",
                func.name, sig.result
            )));
        }
        Ok(result)
    }

    fn exec(&mut self, frame: &mut Frame, stmts: &[Stmt]) -> Result<Flow, Trap> {
        for stmt in stmts {
            match self.step(frame, stmt)? {
                Flow::Next => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    fn step(&mut self, frame: &mut Frame, stmt: &Stmt) -> Result<Flow, Trap> {
        match stmt {
            Stmt::Assign { target, value } => {
                let value = self.eval(frame, value)?;
                self.store(frame, *target, value)?;
            }
            Stmt::Let { temp, kind, value } => {
                let value = self.eval(frame, value)?;
                if value.kind() != *kind {
                    return Err(Trap::Malformed(format!("{temp} declared {kind}, got {value}")));
                }
                frame.temps.insert(*temp, value);
            }
            Stmt::Eval(expr) => {
                self.eval_effect(frame, expr)?;
            }
            Stmt::Return(value) => {
                let value = value.as_ref().map(|e| self.eval(frame, e)).transpose()?;
                return Ok(Flow::Return(value));
            }
            Stmt::Block { label, body } => {
                return Ok(match self.exec(frame, body)? {
                    Flow::Branch(target, BranchKind::Exit) if target == *label => Flow::Next,
                    flow => flow,
                });
            }
            Stmt::Loop { label, body } => loop {
                match self.exec(frame, body)? {
                    Flow::Branch(target, BranchKind::Restart) if target == *label => continue,
                    flow => return Ok(flow),
                }
            },
            Stmt::If {
                label,
                condition,
                then_body,
                else_body,
            } => {
                let arm = if self.eval_i32(frame, condition)? != 0 {
                    then_body
                } else {
                    else_body
                };
                return Ok(match self.exec(frame, arm)? {
                    Flow::Branch(target, BranchKind::Exit) if target == *label => Flow::Next,
                    flow => flow,
                });
            }
            Stmt::Br { target, kind } => return Ok(Flow::Branch(*target, *kind)),
            Stmt::BranchIf {
                condition,
                transfer,
            } => {
                if self.eval_i32(frame, condition)? != 0 {
                    return self.exec(frame, transfer);
                }
            }
            Stmt::BranchTable {
                index,
                cases,
                default,
            } => {
                let i = self.eval_i32(frame, index)? as u32 as usize;
                let arm = cases.get(i).unwrap_or(default);
                return self.exec(frame, arm);
            }
            Stmt::Trap => return Err(Trap::Unreachable),
        }
        Ok(Flow::Next)
    }

    fn load(&self, frame: &Frame, var: Var) -> Result<Value, Trap> {
        let value = match var {
            Var::Local(n) => frame.locals.get(n as usize).copied(),
            Var::Global(g) => self.globals.get(g.as_usize()).copied(),
            Var::Temp(t) => frame.temps.get(&t).copied(),
            Var::Result(label) => frame.results.get(&label).copied(),
        };
        value.ok_or_else(|| Trap::Malformed(format!("read of unbound {var}")))
    }

    fn store(&mut self, frame: &mut Frame, var: Var, value: Value) -> Result<(), Trap> {
        let slot = match var {
            Var::Local(n) => frame.locals.get_mut(n as usize),
            Var::Global(g) => self.globals.get_mut(g.as_usize()),
            Var::Result(label) => frame.results.get_mut(&label),
            Var::Temp(_) => None,
        };
        let slot = slot.ok_or_else(|| Trap::Malformed(format!("write to unbound {var}")))?;
        if slot.kind() != value.kind() {
            return Err(Trap::Malformed(format!("{var} holds {}, assigned {value}", slot.kind())));
        }
        *slot = value;
        Ok(())
    }

    fn eval_i32(&mut self, frame: &Frame, expr: &Expr) -> Result<i32, Trap> {
        match self.eval(frame, expr)? {
            Value::I32(v) => Ok(v),
            other => Err(Trap::Malformed(format!("expected i32, got {other}"))),
        }
    }

    fn eval(&mut self, frame: &Frame, expr: &Expr) -> Result<Value, Trap> {
        match expr {
            Expr::Const(value) => Ok(*value),
            Expr::Get(var) => self.load(frame, *var),
            Expr::Unary { op, operand } => {
                let v = self.eval(frame, operand)?;
                ops::unary(*op, v)
            }
            Expr::Binary { op, lhs, rhs } => {
                let a = self.eval(frame, lhs)?;
                let b = self.eval(frame, rhs)?;
                ops::binary(*op, a, b)
            }
            Expr::Select {
                condition,
                if_true,
                if_false,
            } => {
                let a = self.eval(frame, if_true)?;
                let b = self.eval(frame, if_false)?;
                let c = self.eval_i32(frame, condition)?;
                Ok(if c != 0 { a } else { b })
            }
            Expr::Call { .. } | Expr::CallIndirect { .. } => self
                .eval_effect(frame, expr)?
                .ok_or_else(|| Trap::Malformed("void call used as a value".to_string())),
        }
    }

    /// Evaluate an expression that may be a call without a result.
    fn eval_effect(&mut self, frame: &Frame, expr: &Expr) -> Result<Option<Value>, Trap> {
        match expr {
            Expr::Call { callee, args } => {
                let args = self.eval_args(frame, args)?;
                self.invoke(*callee, &args)
            }
            Expr::CallIndirect {
                type_idx,
                index,
                args,
            } => {
                let args = self.eval_args(frame, args)?;
                let slot = self.eval_i32(frame, index)?;
                let entry = self.table.get(slot)?;
                if entry.type_index != *type_idx {
                    return Err(Trap::IndirectCallTypeMismatch);
                }
                self.invoke(entry.func_index, &args)
            }
            _ => self.eval(frame, expr).map(Some),
        }
    }

    fn eval_args(&mut self, frame: &Frame, args: &[Expr]) -> Result<Vec<Value>, Trap> {
        args.iter().map(|a| self.eval(frame, a)).collect()
    }
}
