//! Expression rendering.

use super::types::delegate_name;
use super::Symbols;
use crate::backend::Backend;
use crate::error::Result;
use crate::ir::*;

/// Renders expressions of one function.
pub struct ExprWriter<'a, B: Backend> {
    pub backend: &'a B,
    pub symbols: &'a Symbols,
}

impl<'a, B: Backend> ExprWriter<'a, B> {
    pub fn new(backend: &'a B, symbols: &'a Symbols) -> Self {
        ExprWriter { backend, symbols }
    }

    /// Render in value position.
    pub fn value(&self, expr: &Expr) -> Result<String> {
        let text = match expr {
            Expr::Const(value) => self.backend.literal(*value),
            Expr::Get(var) => var.to_string(),
            Expr::Unary { op, operand } => self.backend.unop(*op, &self.value(operand)?),
            Expr::Binary { op, lhs, rhs } => {
                self.backend.binop(*op, &self.value(lhs)?, &self.value(rhs)?)
            }
            Expr::Select {
                condition,
                if_true,
                if_false,
            } => self.backend.select(
                &self.condition(condition)?,
                &self.value(if_true)?,
                &self.value(if_false)?,
            ),
            Expr::Call { callee, args } => {
                format!("{}({})", self.symbols.callee(*callee)?, self.args(args)?)
            }
            Expr::CallIndirect {
                type_idx,
                index,
                args,
            } => format!(
                "(({})dispatch_[{}])({})",
                delegate_name(*type_idx),
                self.value(index)?,
                self.args(args)?
            ),
        };
        Ok(text)
    }

    /// Render an `i32` expression as a native boolean.
    pub fn condition(&self, expr: &Expr) -> Result<String> {
        let text = match expr {
            Expr::Binary { op, lhs, rhs } if op.is_comparison() => {
                self.backend
                    .comparison(*op, &self.value(lhs)?, &self.value(rhs)?)
            }
            Expr::Unary {
                op: UnOp::I32Eqz | UnOp::I64Eqz,
                operand,
            } => self.backend.is_zero(&self.value(operand)?),
            _ => self.backend.is_nonzero(&self.value(expr)?),
        };
        Ok(text)
    }

    fn args(&self, args: &[Expr]) -> Result<String> {
        Ok(args
            .iter()
            .map(|a| self.value(a))
            .collect::<Result<Vec<_>>>()?
            .join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CSharpBackend;

    fn symbols() -> Symbols {
        Symbols {
            functions: vec!["Import.log".to_string(), "add".to_string()],
        }
    }

    #[test]
    fn nested_arithmetic() {
        let syms = symbols();
        let w = ExprWriter::new(&CSharpBackend, &syms);
        let e = Expr::binary(
            BinOp::I32Mul,
            Expr::binary(BinOp::I32Add, Expr::get(Var::Local(0)), Expr::Const(Value::I32(1))),
            Expr::Const(Value::I32(-2)),
        );
        assert_eq!(w.value(&e).unwrap(), "unchecked(unchecked(local0 + 1) * (-2))");
    }

    #[test]
    fn conditions_use_native_booleans() {
        let syms = symbols();
        let w = ExprWriter::new(&CSharpBackend, &syms);
        let cmp = Expr::binary(BinOp::I32GtU, Expr::get(Var::Local(0)), Expr::Const(Value::I32(3)));
        assert_eq!(w.condition(&cmp).unwrap(), "(unchecked((uint)local0 > (uint)3))");
        let eqz = Expr::unary(UnOp::I64Eqz, Expr::get(Var::Local(1)));
        assert_eq!(w.condition(&eqz).unwrap(), "(local1 == 0)");
        assert_eq!(
            w.condition(&Expr::get(Var::Temp(TempId(2)))).unwrap(),
            "(stack_v2 != 0)"
        );
    }

    #[test]
    fn select_renders_conditional() {
        let syms = symbols();
        let w = ExprWriter::new(&CSharpBackend, &syms);
        let e = Expr::Select {
            condition: Box::new(Expr::get(Var::Local(2))),
            if_true: Box::new(Expr::get(Var::Local(0))),
            if_false: Box::new(Expr::get(Var::Local(1))),
        };
        assert_eq!(w.value(&e).unwrap(), "((local2 != 0) ? local0 : local1)");
    }

    #[test]
    fn calls() {
        let syms = symbols();
        let w = ExprWriter::new(&CSharpBackend, &syms);
        let direct = Expr::Call {
            callee: FuncIdx::new(0),
            args: vec![Expr::get(Var::Local(0))],
        };
        assert_eq!(w.value(&direct).unwrap(), "Import.log(local0)");
        let local = Expr::Call {
            callee: FuncIdx::new(1),
            args: vec![Expr::Const(Value::I32(1)), Expr::Const(Value::I32(2))],
        };
        assert_eq!(w.value(&local).unwrap(), "add(1, 2)");
        let indirect = Expr::CallIndirect {
            type_idx: TypeIdx::new(2),
            index: Box::new(Expr::get(Var::Local(0))),
            args: vec![Expr::Const(Value::I64(5))],
        };
        assert_eq!(w.value(&indirect).unwrap(), "((Type2)dispatch_[local0])(5L)");
    }

    #[test]
    fn call_to_unknown_function_fails() {
        let syms = symbols();
        let w = ExprWriter::new(&CSharpBackend, &syms);
        let call = Expr::Call {
            callee: FuncIdx::new(9),
            args: vec![],
        };
        assert!(matches!(
            w.value(&call),
            Err(crate::error::TranspileError::InvalidIndex { index: 9, .. })
        ));
    }
}
