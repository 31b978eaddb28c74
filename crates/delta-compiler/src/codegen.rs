//! Expression code generation
//!
//! Names resolve in this order: parameters of the enclosing function, then
//! functions (as pointers), then top-level globals. A global that does not
//! exist yet is declared on first use and reads as null until assigned.

use crate::error::CompileError;
use crate::state::CompileState;
use delta_image::{CodeBlockId, ImageError, Instruction, SymbolKey, SymbolNode};
use delta_lang::Expr;
use std::collections::BTreeSet;

/// Slot of top-level global `name`, declaring it if needed
///
/// Returns the slot and whether it was just declared.
pub(crate) fn declare_global(state: &mut CompileState, name: &str) -> Result<(usize, bool), CompileError> {
    let root = state
        .root_mut()
        .ok_or(ImageError::UnknownBlock(CodeBlockId::ROOT))?;
    if let Some(slot) = root.symbol_table.index_of(name) {
        return Ok((slot, false));
    }
    let slot = root
        .symbol_table
        .insert(SymbolNode::global(name, CodeBlockId::ROOT));
    root.global_size = root.global_size.max(slot + 1);
    Ok((slot, true))
}

/// Emits the instructions of one expression into a buffer
///
/// Positions are absolute: the buffer starts at `base` in its block's stream.
pub(crate) struct Emitter<'s> {
    state: &'s mut CompileState,
    params: &'s [String],
    /// Function whose body is being emitted
    defining: Option<&'s str>,
    base: usize,
    pub(crate) code: Vec<Instruction>,
    /// Globals read
    pub(crate) reads: BTreeSet<SymbolKey>,
    /// Procedures called or referenced
    pub(crate) calls: BTreeSet<usize>,
    pub(crate) warnings: Vec<String>,
}

impl<'s> Emitter<'s> {
    pub(crate) fn new(state: &'s mut CompileState, params: &'s [String], base: usize) -> Self {
        Self {
            state,
            params,
            defining: None,
            base,
            code: Vec::new(),
            reads: BTreeSet::new(),
            calls: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn defining(mut self, name: &'s str) -> Self {
        self.defining = Some(name);
        self
    }

    pub(crate) fn emit(&mut self, instruction: Instruction) -> usize {
        let pc = self.next_pc();
        self.code.push(instruction);
        pc
    }

    fn next_pc(&self) -> usize {
        self.base + self.code.len()
    }

    fn patch(&mut self, at: usize, target: usize) {
        if let Some(slot) = self.code.get_mut(at - self.base) {
            match slot {
                Instruction::Jump(t) | Instruction::JumpIfFalse(t) => *t = target,
                other => tracing::warn!(pc = at, instruction = ?other, "patch target is not a jump"),
            }
        }
    }

    pub(crate) fn expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Null => {
                self.emit(Instruction::PushNull);
            }
            Expr::Bool(v) => {
                self.emit(Instruction::PushBool(*v));
            }
            Expr::Int(v) => {
                self.emit(Instruction::PushInt(*v));
            }
            Expr::Double(v) => {
                self.emit(Instruction::PushDouble(*v));
            }
            Expr::Str(v) => {
                self.emit(Instruction::PushString(v.clone()));
            }
            Expr::Ident(name) => self.ident(name)?,
            Expr::Array(items) => {
                for item in items {
                    self.expr(item)?;
                }
                self.emit(Instruction::MakeArray(items.len()));
            }
            Expr::Index { target, index } => {
                self.expr(target)?;
                self.expr(index)?;
                self.emit(Instruction::Index);
            }
            Expr::Call { callee, args } => self.call(callee, args)?,
            Expr::Unary { op, operand } => {
                self.expr(operand)?;
                self.emit(Instruction::Unary(*op));
            }
            Expr::Binary { op, lhs, rhs } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
                self.emit(Instruction::Binary(*op));
            }
            Expr::Conditional { cond, then, otherwise } => {
                self.expr(cond)?;
                let to_else = self.emit(Instruction::JumpIfFalse(0));
                self.expr(then)?;
                let to_end = self.emit(Instruction::Jump(0));
                let else_pc = self.next_pc();
                self.patch(to_else, else_pc);
                self.expr(otherwise)?;
                let end_pc = self.next_pc();
                self.patch(to_end, end_pc);
            }
        }
        Ok(())
    }

    fn param(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|param| param == name)
    }

    fn procedure(&self, name: &str) -> Option<usize> {
        self.state.root()?.procedure_table.index_of(name)
    }

    fn existing_global(&self, name: &str) -> Option<usize> {
        self.state.root()?.symbol_table.index_of(name)
    }

    fn ident(&mut self, name: &str) -> Result<(), CompileError> {
        if let Some(index) = self.param(name) {
            self.emit(Instruction::LoadLocal(index));
            return Ok(());
        }
        if let Some(procedure) = self.procedure(name) {
            let pointer = self.state.function_pointers.pointer_to(CodeBlockId::ROOT, procedure);
            self.calls.insert(procedure);
            self.emit(Instruction::PushFunctionPointer(pointer));
            return Ok(());
        }
        let (slot, declared) = declare_global(self.state, name)?;
        if declared {
            self.state.dynamic_variables.record(name, CodeBlockId::ROOT, slot);
            tracing::trace!(name, slot, "global declared on first read");
        }
        self.reads.insert(SymbolKey::global(slot));
        self.emit(Instruction::LoadGlobal(slot));
        Ok(())
    }

    fn call(&mut self, callee: &str, args: &[Expr]) -> Result<(), CompileError> {
        if let Some(index) = self.param(callee) {
            self.emit(Instruction::LoadLocal(index));
            return self.call_pointer(args);
        }
        if self.procedure(callee).is_none() {
            if let Some(slot) = self.existing_global(callee) {
                self.reads.insert(SymbolKey::global(slot));
                self.emit(Instruction::LoadGlobal(slot));
                return self.call_pointer(args);
            }
        }

        let root = self
            .state
            .root_mut()
            .ok_or(ImageError::UnknownBlock(CodeBlockId::ROOT))?;
        let procedure = root.procedure_table.reserve(callee);
        let defined = root
            .procedure_table
            .get(procedure)
            .filter(|node| node.is_active)
            .map(|node| node.argc());
        match defined {
            Some(argc) if argc != args.len() => self.warnings.push(format!(
                "function `{callee}` expects {argc} argument(s), got {}",
                args.len()
            )),
            Some(_) => {}
            None if self.defining == Some(callee) => {}
            None => {
                self.state.dynamic_functions.record(callee, procedure, args.len());
                self.warnings.push(format!("function `{callee}` is not defined yet"));
            }
        }

        for arg in args {
            self.expr(arg)?;
        }
        self.calls.insert(procedure);
        self.emit(Instruction::Call {
            procedure,
            argc: args.len(),
        });
        Ok(())
    }

    fn call_pointer(&mut self, args: &[Expr]) -> Result<(), CompileError> {
        for arg in args {
            self.expr(arg)?;
        }
        self.emit(Instruction::CallPointer { argc: args.len() });
        Ok(())
    }
}
