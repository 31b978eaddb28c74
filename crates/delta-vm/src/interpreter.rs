//! Interpreter
//!
//! [`AssociativeInterpreter`] runs the statements of the latest compilation
//! in program order, then keeps re-running the readers of every global whose
//! value actually changed until nothing changes any more. Update-list roots
//! and statements forced by the host join the same worklist.
//!
//! Type errors, null operands, bad indices and calls to undefined functions
//! evaluate to `null` and leave a [`RuntimeWarning`]; only an update cycle or
//! runaway recursion faults.

use crate::error::ExecuteFault;
use crate::memory::RuntimeMemory;
use crate::mirror::RuntimeMirror;
use crate::value::StackValue;
use delta_image::{
    CodeBlockId, DependencyVertex, Executable, ExprId, GraphNode, Instruction, InstructionStream, SymbolKey,
    UpdateNodeRef,
};
use delta_lang::{BinaryOp, UnaryOp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Runs executables against runtime memory
pub trait Interpreter: Send + Sync {
    /// Execute the pending part of `executable`
    ///
    /// # Errors
    /// Returns an [`ExecuteFault`] that aborts the run; stores completed
    /// before the fault stay in memory.
    fn execute(
        &self,
        executable: &Executable,
        memory: &mut RuntimeMemory,
        context: &RuntimeContext,
    ) -> Result<ExecutionOutcome, ExecuteFault>;
}

/// Per-run settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeContext {
    /// Block whose stream is executed
    pub running_block: CodeBlockId,
    /// Statements to re-run in addition to the new ones
    pub forced_nodes: Vec<ExprId>,
    /// How often one statement may run in a single execution
    pub max_update_passes: usize,
    pub max_call_depth: usize,
}

impl RuntimeContext {
    #[inline]
    #[must_use]
    pub fn with_forced_nodes(mut self, nodes: Vec<ExprId>) -> Self {
        self.forced_nodes = nodes;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_update_passes(mut self, passes: usize) -> Self {
        self.max_update_passes = passes;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self {
            running_block: CodeBlockId::ROOT,
            forced_nodes: Vec::new(),
            max_update_passes: 64,
            max_call_depth: 256,
        }
    }
}

/// Non-fatal runtime problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeWarning {
    /// Statement being evaluated
    pub node: Option<ExprId>,
    pub message: String,
}

impl fmt::Display for RuntimeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "{node}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Statements run, in order, repeats included
    pub executed: Vec<ExprId>,
    pub warnings: Vec<RuntimeWarning>,
}

/// Reference interpreter for associative code
#[derive(Debug, Clone, Copy, Default)]
pub struct AssociativeInterpreter;

impl AssociativeInterpreter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Interpreter for AssociativeInterpreter {
    fn execute(
        &self,
        executable: &Executable,
        memory: &mut RuntimeMemory,
        context: &RuntimeContext,
    ) -> Result<ExecutionOutcome, ExecuteFault> {
        let stream = executable
            .stream(context.running_block)
            .ok_or(ExecuteFault::MissingBlock(context.running_block))?;
        let graph = &stream.dependency_graph;

        let mut worklist = initial_worklist(stream, context);
        let mut passes: HashMap<ExprId, usize> = HashMap::new();
        let mut outcome = ExecutionOutcome::default();

        while let Some(id) = worklist.pop_first() {
            let Some(node) = graph.node(id).filter(|node| node.is_active) else {
                continue;
            };

            let count = passes.entry(id).or_insert(0);
            *count += 1;
            if *count > context.max_update_passes {
                tracing::warn!(node = %id, limit = context.max_update_passes, "update cycle");
                return Err(ExecuteFault::UpdateCycle {
                    node: id,
                    limit: context.max_update_passes,
                });
            }

            let mut machine = Machine {
                executable,
                memory: &mut *memory,
                context,
                node: Some(id),
                depth: 0,
                changed: Vec::new(),
                warnings: &mut outcome.warnings,
            };
            machine.run_node(context.running_block, node)?;
            let changed = machine.changed;
            outcome.executed.push(id);

            for slot in changed {
                let symbol = DependencyVertex::Symbol(SymbolKey {
                    block: context.running_block,
                    index: slot,
                });
                worklist.extend(graph.readers_of(symbol).into_iter().filter(|reader| *reader != id));
            }
        }

        tracing::debug!(
            executed = outcome.executed.len(),
            warnings = outcome.warnings.len(),
            "execution finished"
        );
        Ok(outcome)
    }
}

fn initial_worklist(stream: &InstructionStream, context: &RuntimeContext) -> BTreeSet<ExprId> {
    let graph = &stream.dependency_graph;
    let entry = stream.entrypoint.unwrap_or(stream.len());

    let mut worklist: BTreeSet<ExprId> = graph
        .active_nodes()
        .filter(|node| node.pc_start >= entry)
        .map(|node| node.id)
        .collect();

    for root in &stream.update_list {
        match root {
            UpdateNodeRef::Symbol(symbol) => worklist.extend(graph.writers_of(*symbol)),
            UpdateNodeRef::Procedure(index) => {
                worklist.extend(graph.readers_of(DependencyVertex::Procedure(*index)));
            }
        }
    }

    worklist.extend(
        context
            .forced_nodes
            .iter()
            .copied()
            .filter(|id| graph.is_active(*id)),
    );
    worklist
}

struct Machine<'a> {
    executable: &'a Executable,
    memory: &'a mut RuntimeMemory,
    context: &'a RuntimeContext,
    node: Option<ExprId>,
    depth: usize,
    changed: Vec<usize>,
    warnings: &'a mut Vec<RuntimeWarning>,
}

impl<'a> Machine<'a> {
    fn run_node(&mut self, block: CodeBlockId, node: &GraphNode) -> Result<(), ExecuteFault> {
        self.run(block, node.pc_start, node.pc_end, &[])?;
        Ok(())
    }

    fn warn(&mut self, message: String) {
        tracing::debug!(node = ?self.node, %message, "runtime warning");
        self.warnings.push(RuntimeWarning {
            node: self.node,
            message,
        });
    }

    fn type_name(&self, value: &StackValue) -> &'a str {
        self.executable.class_table.type_name(value.primitive_type())
    }

    /// Run `[start, end)` of a block's stream and return the value left on top
    fn run(
        &mut self,
        block: CodeBlockId,
        start: usize,
        end: usize,
        locals: &[StackValue],
    ) -> Result<StackValue, ExecuteFault> {
        let executable = self.executable;
        let stream = executable
            .stream(block)
            .ok_or(ExecuteFault::MissingBlock(block))?;
        let mut stack: Vec<StackValue> = Vec::new();
        let mut pc = start;

        while pc < end {
            let instruction = stream
                .get(pc)
                .ok_or(ExecuteFault::InvalidProgramCounter { block, pc })?;
            let at = pc;
            pc += 1;
            let underflow = || ExecuteFault::StackUnderflow { block, pc: at };

            match instruction {
                Instruction::PushNull => stack.push(StackValue::Null),
                Instruction::PushBool(v) => stack.push(StackValue::Bool(*v)),
                Instruction::PushInt(v) => stack.push(StackValue::Int(*v)),
                Instruction::PushDouble(v) => stack.push(StackValue::Double(*v)),
                Instruction::PushString(v) => {
                    let value = self.memory.alloc_string(v.as_str());
                    stack.push(value);
                }
                Instruction::PushFunctionPointer(ptr) => stack.push(StackValue::FunctionPointer(*ptr)),
                Instruction::LoadGlobal(slot) => {
                    let value = self.memory.global(*slot).ok_or(ExecuteFault::UnallocatedGlobal {
                        slot: *slot,
                        allocated: self.memory.global_count(),
                    })?;
                    stack.push(value);
                }
                Instruction::StoreGlobal(slot) => {
                    let value = stack.pop().ok_or_else(underflow)?;
                    if self.memory.set_global(*slot, value)? {
                        self.changed.push(*slot);
                    }
                }
                Instruction::LoadLocal(index) => {
                    stack.push(locals.get(*index).copied().unwrap_or_default());
                }
                Instruction::MakeArray(count) => {
                    let split = stack.len().checked_sub(*count).ok_or_else(underflow)?;
                    let items = stack.split_off(split);
                    let value = self.memory.alloc_array(items);
                    stack.push(value);
                }
                Instruction::Index => {
                    let index = stack.pop().ok_or_else(underflow)?;
                    let target = stack.pop().ok_or_else(underflow)?;
                    let value = self.index(target, index);
                    stack.push(value);
                }
                Instruction::Unary(op) => {
                    let operand = stack.pop().ok_or_else(underflow)?;
                    let value = self.unary(*op, operand);
                    stack.push(value);
                }
                Instruction::Binary(op) => {
                    let rhs = stack.pop().ok_or_else(underflow)?;
                    let lhs = stack.pop().ok_or_else(underflow)?;
                    let value = self.binary(*op, lhs, rhs);
                    stack.push(value);
                }
                Instruction::Call { procedure, argc } => {
                    let split = stack.len().checked_sub(*argc).ok_or_else(underflow)?;
                    let args = stack.split_off(split);
                    let value = self.call(CodeBlockId::ROOT, *procedure, &args)?;
                    stack.push(value);
                }
                Instruction::CallPointer { argc } => {
                    let split = stack.len().checked_sub(*argc).ok_or_else(underflow)?;
                    let args = stack.split_off(split);
                    let callee = stack.pop().ok_or_else(underflow)?;
                    let value = self.call_pointer(callee, &args)?;
                    stack.push(value);
                }
                Instruction::Jump(target) => pc = *target,
                Instruction::JumpIfFalse(target) => {
                    let condition = stack.pop().ok_or_else(underflow)?;
                    if !self.is_truthy(&condition) {
                        pc = *target;
                    }
                }
                Instruction::Return => return Ok(stack.pop().unwrap_or_default()),
            }

            if pc < start || pc > end {
                return Err(ExecuteFault::InvalidProgramCounter { block, pc });
            }
        }

        Ok(stack.pop().unwrap_or_default())
    }

    fn call(&mut self, block: CodeBlockId, index: usize, args: &[StackValue]) -> Result<StackValue, ExecuteFault> {
        let executable = self.executable;
        let Some(procedure) = executable
            .procedure_tables
            .get(block.index())
            .and_then(|table| table.get(index))
        else {
            self.warn(format!("call to unknown procedure #{index}"));
            return Ok(StackValue::Null);
        };

        let Some(body) = procedure.body_block.filter(|_| procedure.is_active) else {
            self.warn(format!("function `{}` is not defined", procedure.name));
            return Ok(StackValue::Null);
        };
        if procedure.argc() != args.len() {
            self.warn(format!(
                "function `{}` expects {} argument(s), got {}",
                procedure.name,
                procedure.argc(),
                args.len()
            ));
            return Ok(StackValue::Null);
        }
        if self.depth >= self.context.max_call_depth {
            return Err(ExecuteFault::CallDepthExceeded {
                limit: self.context.max_call_depth,
            });
        }

        self.depth += 1;
        let result = self.run(body, procedure.pc_start, procedure.pc_end, args);
        self.depth -= 1;
        result
    }

    fn call_pointer(&mut self, callee: StackValue, args: &[StackValue]) -> Result<StackValue, ExecuteFault> {
        let StackValue::FunctionPointer(pointer) = callee else {
            let type_name = self.type_name(&callee);
            self.warn(format!("value of type {type_name} is not callable"));
            return Ok(StackValue::Null);
        };
        match self.executable.function_pointers.procedure(pointer) {
            Some((block, index)) => self.call(block, index, args),
            None => {
                self.warn(format!("dangling function pointer #{pointer}"));
                Ok(StackValue::Null)
            }
        }
    }

    fn is_truthy(&self, value: &StackValue) -> bool {
        match value {
            StackValue::Null => false,
            StackValue::Bool(v) => *v,
            StackValue::Int(v) => *v != 0,
            StackValue::Double(v) => *v != 0.0,
            StackValue::String(ptr) => self.memory.string(*ptr).is_some_and(|s| !s.is_empty()),
            StackValue::Array(ptr) => self.memory.array(*ptr).is_some_and(|a| !a.is_empty()),
            StackValue::FunctionPointer(_) => true,
        }
    }

    fn index(&mut self, target: StackValue, index: StackValue) -> StackValue {
        let StackValue::Int(position) = index else {
            let type_name = self.type_name(&index);
            self.warn(format!("index must be an int, got {type_name}"));
            return StackValue::Null;
        };

        match target {
            StackValue::Array(ptr) => {
                let items = self.memory.array(ptr).unwrap_or_default();
                match resolve_index(position, items.len()) {
                    Some(i) => items[i],
                    None => {
                        let len = items.len();
                        self.warn(format!("index {position} out of range for array of length {len}"));
                        StackValue::Null
                    }
                }
            }
            StackValue::String(ptr) => {
                let chars: Vec<char> = self.memory.string(ptr).unwrap_or_default().chars().collect();
                match resolve_index(position, chars.len()) {
                    Some(i) => self.memory.alloc_string(chars[i].to_string()),
                    None => {
                        self.warn(format!(
                            "index {position} out of range for string of length {}",
                            chars.len()
                        ));
                        StackValue::Null
                    }
                }
            }
            other => {
                let type_name = self.type_name(&other);
                self.warn(format!("cannot index a value of type {type_name}"));
                StackValue::Null
            }
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: StackValue) -> StackValue {
        match (op, operand) {
            (UnaryOp::Not, value) => StackValue::Bool(!self.is_truthy(&value)),
            (UnaryOp::Neg, StackValue::Int(v)) => v.checked_neg().map_or_else(
                || {
                    self.warn(format!("integer overflow negating {v}"));
                    StackValue::Null
                },
                StackValue::Int,
            ),
            (UnaryOp::Neg, StackValue::Double(v)) => StackValue::Double(-v),
            (UnaryOp::Neg, other) => {
                let type_name = self.type_name(&other);
                self.warn(format!("cannot negate a value of type {type_name}"));
                StackValue::Null
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: StackValue, rhs: StackValue) -> StackValue {
        match op {
            BinaryOp::And => StackValue::Bool(self.is_truthy(&lhs) && self.is_truthy(&rhs)),
            BinaryOp::Or => StackValue::Bool(self.is_truthy(&lhs) || self.is_truthy(&rhs)),
            BinaryOp::Eq => StackValue::Bool(self.loosely_equal(&lhs, &rhs)),
            BinaryOp::Ne => StackValue::Bool(!self.loosely_equal(&lhs, &rhs)),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => self.compare(op, lhs, rhs),
            BinaryOp::Add => match (lhs, rhs) {
                (StackValue::String(_), _) | (_, StackValue::String(_)) => {
                    let text = format!("{}{}", self.text(&lhs), self.text(&rhs));
                    self.memory.alloc_string(text)
                }
                _ => self.arithmetic(op, lhs, rhs),
            },
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => self.arithmetic(op, lhs, rhs),
        }
    }

    fn arithmetic(&mut self, op: BinaryOp, lhs: StackValue, rhs: StackValue) -> StackValue {
        match (lhs, rhs) {
            (StackValue::Int(a), StackValue::Int(b)) => {
                let result = match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    BinaryOp::Div => a.checked_div(b),
                    BinaryOp::Mod => a.checked_rem(b),
                    _ => None,
                };
                result.map_or_else(
                    || {
                        let reason = if b == 0 { "division by zero" } else { "integer overflow" };
                        self.warn(format!("{reason} in {a} {} {b}", op.symbol()));
                        StackValue::Null
                    },
                    StackValue::Int,
                )
            }
            _ => match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => StackValue::Double(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    _ => a % b,
                }),
                _ => self.type_mismatch(op, &lhs, &rhs),
            },
        }
    }

    fn compare(&mut self, op: BinaryOp, lhs: StackValue, rhs: StackValue) -> StackValue {
        let ordering = match (lhs, rhs) {
            (StackValue::Int(a), StackValue::Int(b)) => Some(a.cmp(&b)),
            (StackValue::String(a), StackValue::String(b)) => {
                Some(self.memory.string(a).cmp(&self.memory.string(b)))
            }
            _ => match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => return self.type_mismatch(op, &lhs, &rhs),
            },
        };
        let Some(ordering) = ordering else {
            return StackValue::Bool(false);
        };
        StackValue::Bool(match op {
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::Le => ordering != Ordering::Greater,
            BinaryOp::Gt => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        })
    }

    fn type_mismatch(&mut self, op: BinaryOp, lhs: &StackValue, rhs: &StackValue) -> StackValue {
        let (left, right) = (self.type_name(lhs), self.type_name(rhs));
        self.warn(format!("operator `{}` not defined for {left} and {right}", op.symbol()));
        StackValue::Null
    }

    /// `==` semantics: ints and doubles compare numerically, the rest structurally
    fn loosely_equal(&self, lhs: &StackValue, rhs: &StackValue) -> bool {
        match (lhs, rhs) {
            (StackValue::Int(_), StackValue::Double(_)) | (StackValue::Double(_), StackValue::Int(_)) => {
                lhs.as_f64() == rhs.as_f64()
            }
            _ => self.memory.values_equal(lhs, rhs),
        }
    }

    /// Text used for string concatenation
    fn text(&self, value: &StackValue) -> String {
        match value {
            StackValue::String(ptr) => self.memory.string(*ptr).unwrap_or_default().to_string(),
            other => RuntimeMirror::new(&*self.memory, self.executable)
                .data(other)
                .to_string(),
        }
    }
}

fn resolve_index(position: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if position < 0 { len + position } else { position };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delta_image::{ClassTable, CodeBlockArena, DynamicFunctionTable, DynamicVariableTable, FunctionPointerTable, Language, SymbolNode};

    /// `x = <instructions>;` assembled by hand into the top-level block
    fn single_statement(instructions: Vec<Instruction>) -> Executable {
        let mut arena = CodeBlockArena::with_root(Language::Associative);
        let root = arena.get_mut(CodeBlockId::ROOT).unwrap();
        let slot = root.symbol_table.insert(SymbolNode::global("x", CodeBlockId::ROOT));
        root.global_size = 1;
        root.instr_stream.entrypoint = Some(0);
        for instruction in instructions {
            root.instr_stream.push(instruction);
        }
        root.instr_stream.push(Instruction::StoreGlobal(slot));
        let pc_end = root.instr_stream.len();
        root.instr_stream.dependency_graph.insert_node(GraphNode {
            id: ExprId(0),
            owner: None,
            defines: Some(SymbolKey::global(slot)),
            reads: vec![],
            calls: vec![],
            pc_start: 0,
            pc_end,
            is_active: true,
        });
        Executable::from_blocks(
            arena,
            ClassTable::with_primitives(),
            DynamicVariableTable::default(),
            DynamicFunctionTable::default(),
            FunctionPointerTable::default(),
        )
    }

    fn run(instructions: Vec<Instruction>) -> (StackValue, ExecutionOutcome, RuntimeMemory) {
        let executable = single_statement(instructions);
        let mut memory = RuntimeMemory::new();
        memory.reallocate(1);
        let outcome = AssociativeInterpreter::new()
            .execute(&executable, &mut memory, &RuntimeContext::default())
            .unwrap();
        (memory.global(0).unwrap(), outcome, memory)
    }

    #[test]
    fn test_arithmetic() {
        let (value, outcome, _) = run(vec![
            Instruction::PushInt(2),
            Instruction::PushInt(3),
            Instruction::Binary(BinaryOp::Mul),
            Instruction::PushDouble(0.5),
            Instruction::Binary(BinaryOp::Add),
        ]);
        assert_eq!(value, StackValue::Double(6.5));
        assert_eq!(outcome.executed, vec![ExprId(0)]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_division_by_zero_warns() {
        let (value, outcome, _) = run(vec![
            Instruction::PushInt(1),
            Instruction::PushInt(0),
            Instruction::Binary(BinaryOp::Div),
        ]);
        assert_eq!(value, StackValue::Null);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].message.contains("division by zero"));
    }

    #[test]
    fn test_type_mismatch_warns_with_class_names() {
        let (value, outcome, _) = run(vec![
            Instruction::PushBool(true),
            Instruction::PushNull,
            Instruction::Binary(BinaryOp::Sub),
        ]);
        assert_eq!(value, StackValue::Null);
        assert_eq!(
            outcome.warnings[0].message,
            "operator `-` not defined for bool and null"
        );
    }

    #[test]
    fn test_string_concatenation_and_indexing() {
        let (value, _, memory) = run(vec![
            Instruction::PushString("ab".into()),
            Instruction::PushInt(1),
            Instruction::Binary(BinaryOp::Add),
            Instruction::PushInt(-1),
            Instruction::Index,
        ]);
        let StackValue::String(ptr) = value else {
            panic!("expected string, got {value:?}");
        };
        assert_eq!(memory.string(ptr), Some("1"));
    }

    #[test]
    fn test_array_out_of_range() {
        let (value, outcome, _) = run(vec![
            Instruction::PushInt(1),
            Instruction::PushInt(2),
            Instruction::MakeArray(2),
            Instruction::PushInt(5),
            Instruction::Index,
        ]);
        assert_eq!(value, StackValue::Null);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_conditional_jump() {
        // x = false ? 1 : 2;
        let (value, _, _) = run(vec![
            Instruction::PushBool(false),
            Instruction::JumpIfFalse(4),
            Instruction::PushInt(1),
            Instruction::Jump(5),
            Instruction::PushInt(2),
        ]);
        assert_eq!(value, StackValue::Int(2));
    }

    #[test]
    fn test_stack_underflow_is_internal_fault() {
        let executable = single_statement(vec![Instruction::Binary(BinaryOp::Add)]);
        let mut memory = RuntimeMemory::new();
        memory.reallocate(1);
        let fault = AssociativeInterpreter::new()
            .execute(&executable, &mut memory, &RuntimeContext::default())
            .unwrap_err();
        assert!(fault.is_internal());
    }

    #[test]
    fn test_nothing_pending_runs_nothing() {
        let mut executable = single_statement(vec![Instruction::PushInt(1)]);
        executable.instr_streams[0].entrypoint = Some(executable.instr_streams[0].len());
        let mut memory = RuntimeMemory::new();
        memory.reallocate(1);
        let outcome = AssociativeInterpreter::new()
            .execute(&executable, &mut memory, &RuntimeContext::default())
            .unwrap();
        assert!(outcome.executed.is_empty());

        let forced = RuntimeContext::default().with_forced_nodes(vec![ExprId(0)]);
        let outcome = AssociativeInterpreter::new()
            .execute(&executable, &mut memory, &forced)
            .unwrap();
        assert_eq!(outcome.executed, vec![ExprId(0)]);
    }

    #[test]
    fn test_resolve_index() {
        assert_eq!(resolve_index(0, 3), Some(0));
        assert_eq!(resolve_index(-1, 3), Some(2));
        assert_eq!(resolve_index(3, 3), None);
        assert_eq!(resolve_index(-4, 3), None);
    }
}
