//! Statement rendering.
//!
//! Scopes become labelled C# statements:
//!
//! ```text
//! Block  { label3 }   ->  { ... }            label3:;
//! Loop   { label4 }   ->  label4: for (;;) { ... break; }
//! If     { label5 }   ->  if (c) { ... } else { ... }  label5:;
//! ```
//!
//! An exit branch jumps to the label after the scope. A restart branch
//! re-enters the loop: `continue` when the loop is the innermost one,
//! otherwise a `goto` to the label in front of the `for`.

use super::expr::ExprWriter;
use super::types::value_type;
use crate::backend::Backend;
use crate::error::Result;
use crate::ir::*;

const INDENT: &str = "    ";

pub struct StatementWriter<'a, B: Backend> {
    exprs: ExprWriter<'a, B>,
    out: String,
    depth: usize,
    /// Labels of the enclosing loops, innermost last.
    loops: Vec<Label>,
}

impl<'a, B: Backend> StatementWriter<'a, B> {
    /// `depth` is the indentation level of the first statement.
    pub fn new(exprs: ExprWriter<'a, B>, depth: usize) -> Self {
        StatementWriter {
            exprs,
            out: String::new(),
            depth,
            loops: Vec::new(),
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub fn declaration(&mut self, decl: &Declaration) {
        let text = format!(
            "{} {} = {};",
            value_type(decl.kind),
            decl.var,
            self.exprs.backend.literal(decl.kind.zero())
        );
        self.line(&text);
    }

    pub fn statements(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.statement(stmt)?;
        }
        Ok(())
    }

    fn nested(&mut self, stmts: &[Stmt]) -> Result<()> {
        self.depth += 1;
        self.statements(stmts)?;
        self.depth -= 1;
        Ok(())
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign { target, value } => {
                let text = format!("{target} = {};", self.exprs.value(value)?);
                self.line(&text);
            }
            Stmt::Let { temp, kind, value } => {
                let text = format!("{} {temp} = {};", value_type(*kind), self.exprs.value(value)?);
                self.line(&text);
            }
            Stmt::Eval(expr) => {
                let text = format!("{};", self.exprs.value(expr)?);
                self.line(&text);
            }
            Stmt::Return(None) => self.line("return;"),
            Stmt::Return(Some(value)) => {
                let text = format!("return {};", self.exprs.value(value)?);
                self.line(&text);
            }
            Stmt::Block { label, body } => {
                self.line("{");
                self.nested(body)?;
                self.line("}");
                self.line(&format!("{label}:;"));
            }
            Stmt::Loop { label, body } => {
                self.line(&format!("{label}:"));
                self.line("for (;;)");
                self.line("{");
                self.loops.push(*label);
                self.nested(body)?;
                self.loops.pop();
                self.depth += 1;
                self.line("break;");
                self.depth -= 1;
                self.line("}");
            }
            Stmt::If {
                label,
                condition,
                then_body,
                else_body,
            } => {
                let text = format!("if {}", self.exprs.condition(condition)?);
                self.line(&text);
                self.line("{");
                self.nested(then_body)?;
                self.line("}");
                if !else_body.is_empty() {
                    self.line("else");
                    self.line("{");
                    self.nested(else_body)?;
                    self.line("}");
                }
                self.line(&format!("{label}:;"));
            }
            Stmt::Br { target, kind } => {
                let text = self.branch(*target, *kind);
                self.line(&text);
            }
            Stmt::BranchIf {
                condition,
                transfer,
            } => {
                let text = format!("if {}", self.exprs.condition(condition)?);
                self.line(&text);
                self.line("{");
                self.nested(transfer)?;
                self.line("}");
            }
            Stmt::BranchTable {
                index,
                cases,
                default,
            } => {
                let text = format!("switch ({})", self.exprs.value(index)?);
                self.line(&text);
                self.line("{");
                self.depth += 1;
                for (i, case) in cases.iter().enumerate() {
                    self.line(&format!("case {i}:"));
                    self.case_body(case)?;
                }
                self.line("default:");
                self.case_body(default)?;
                self.depth -= 1;
                self.line("}");
            }
            Stmt::Trap => {
                let text = self.exprs.backend.trap();
                self.line(&text);
            }
        }
        Ok(())
    }

    fn case_body(&mut self, stmts: &[Stmt]) -> Result<()> {
        self.line("{");
        self.nested(stmts)?;
        self.line("}");
        Ok(())
    }

    fn branch(&self, target: Label, kind: BranchKind) -> String {
        match kind {
            BranchKind::Restart if self.loops.last() == Some(&target) => "continue;".to_string(),
            BranchKind::Restart | BranchKind::Exit => format!("goto {target};"),
        }
    }
}
