//! Front-end compiler
//!
//! Each top-level assignment becomes one dependency-graph statement: a run
//! of instructions in the top-level stream ending in a store to its global.
//! Each function body gets its own child block. Compiled code is appended,
//! never rewritten: a retired subtree's statements are deactivated and the
//! statements replacing them land after the entrypoint, so the interpreter
//! only runs what is new plus whatever depends on what changed.

use crate::codegen::{declare_global, Emitter};
use crate::error::{CompileError, Diagnostic};
use crate::fragment::SourceFragment;
use crate::state::CompileState;
use delta_diff::SubtreeId;
use delta_image::{
    CodeBlockId, CodeBlockType, DependencyVertex, Executable, GraphNode, ImageError, Instruction, Language,
    SymbolKey, UpdateNodeRef,
};
use delta_lang::{AstNode, Assignment, FunctionDef};

/// Compiles source fragments on top of a prior state
pub trait Compiler: Send + Sync {
    /// Compile `fragment` against `prior`
    ///
    /// `prior` is never modified; on success the outcome carries the new
    /// state and the executable built from it.
    fn compile(&self, fragment: &SourceFragment, prior: &CompileState) -> CompileOutcome;
}

/// Result of one compilation
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub succeeded: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub compiled: Option<CompiledImage>,
}

impl CompileOutcome {
    fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            succeeded: false,
            diagnostics,
            compiled: None,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

#[derive(Debug, Clone)]
pub struct CompiledImage {
    pub state: CompileState,
    pub executable: Executable,
    /// Top-level global slots the executable needs
    pub global_count: usize,
    pub running_block: CodeBlockId,
}

/// Reference compiler for the associative language
#[derive(Debug, Clone, Copy, Default)]
pub struct AssociativeCompiler;

impl AssociativeCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Compiler for AssociativeCompiler {
    fn compile(&self, fragment: &SourceFragment, prior: &CompileState) -> CompileOutcome {
        let mut state = prior.clone();
        state.begin_compile();
        let mut diagnostics = Vec::new();

        for subtree in &fragment.retired {
            if let Err(err) = retire(&mut state, *subtree) {
                diagnostics.push(Diagnostic::error(&err, Some(*subtree)));
            }
        }

        for unit in &fragment.units {
            let statements = match delta_lang::parse_program(&unit.code) {
                Ok(statements) => statements,
                Err(err) => {
                    diagnostics.push(Diagnostic::error(&CompileError::from(err), unit.owner));
                    continue;
                }
            };
            for statement in &statements {
                let result = match statement {
                    AstNode::Assign(assignment) => compile_assignment(&mut state, unit.owner, assignment),
                    AstNode::Function(def) => compile_function(&mut state, unit.owner, def),
                };
                match result {
                    Ok(warnings) => diagnostics
                        .extend(warnings.into_iter().map(|w| Diagnostic::warning(w, unit.owner))),
                    Err(err) => diagnostics.push(Diagnostic::error(&err, unit.owner)),
                }
            }
        }

        if diagnostics.iter().any(Diagnostic::is_error) {
            tracing::debug!(errors = diagnostics.iter().filter(|d| d.is_error()).count(), "compilation failed");
            return CompileOutcome::failed(diagnostics);
        }

        let executable = state.generate_executable();
        if let Err(err) = executable.validate() {
            tracing::error!(error = %err, "compiled image is inconsistent");
            diagnostics.push(Diagnostic::error(&CompileError::from(err), None));
            return CompileOutcome::failed(diagnostics);
        }

        let global_count = state.glob_offset();
        tracing::debug!(
            units = fragment.units.len(),
            retired = fragment.retired.len(),
            global_count,
            "compilation succeeded"
        );
        CompileOutcome {
            succeeded: true,
            diagnostics,
            compiled: Some(CompiledImage {
                state,
                executable,
                global_count,
                running_block: CodeBlockId::ROOT,
            }),
        }
    }
}

fn root_error() -> CompileError {
    ImageError::UnknownBlock(CodeBlockId::ROOT).into()
}

/// Deactivate everything `subtree` compiled and queue the re-runs that follow
fn retire(state: &mut CompileState, subtree: SubtreeId) -> Result<(), CompileError> {
    let root = state.root_mut().ok_or_else(root_error)?;
    let stream = &mut root.instr_stream;
    let retired = stream.dependency_graph.deactivate_owner(subtree);

    for symbol in retired.iter().filter_map(|node| node.defines) {
        let remaining = stream.dependency_graph.writers_of(symbol);
        if !remaining.is_empty() && !stream.update_list.contains(&UpdateNodeRef::Symbol(symbol)) {
            stream.update_list.push(UpdateNodeRef::Symbol(symbol));
        }
    }

    let owned: Vec<usize> = root
        .procedure_table
        .iter()
        .filter(|procedure| procedure.is_active && procedure.owner == Some(subtree))
        .map(|procedure| procedure.index)
        .collect();
    for index in owned {
        root.procedure_table.retire(index);
        root.instr_stream.dependency_graph.retire_procedure(index);
        root.instr_stream.update_list.push(UpdateNodeRef::Procedure(index));
    }

    tracing::trace!(%subtree, statements = retired.len(), "subtree retired");
    Ok(())
}

fn compile_assignment(
    state: &mut CompileState,
    owner: Option<SubtreeId>,
    assignment: &Assignment,
) -> Result<Vec<String>, CompileError> {
    let target = assignment.target.as_str();
    let is_function = state
        .root()
        .and_then(|root| root.procedure_table.get_by_name(target))
        .is_some_and(|procedure| procedure.is_active);
    if is_function {
        return Err(CompileError::AssignToFunction(target.to_string()));
    }

    let (slot, _) = declare_global(state, target)?;
    let symbol = SymbolKey::global(slot);

    let root = state.root_mut().ok_or_else(root_error)?;
    let graph = &mut root.instr_stream.dependency_graph;
    let superseded: Vec<_> = graph
        .writers_of(symbol)
        .into_iter()
        .filter(|id| graph.node(*id).is_some_and(|node| node.owner.is_none()))
        .collect();
    for id in superseded {
        graph.deactivate(id);
    }
    let pc_start = root.instr_stream.next_pc();

    let mut emitter = Emitter::new(state, &[], pc_start);
    emitter.expr(&assignment.value)?;
    emitter.emit(Instruction::StoreGlobal(slot));
    let Emitter {
        code,
        reads,
        calls,
        warnings,
        ..
    } = emitter;

    let id = state.next_expr_id();
    let root = state.root_mut().ok_or_else(root_error)?;
    for instruction in code {
        root.instr_stream.push(instruction);
    }
    let pc_end = root.instr_stream.next_pc();
    root.instr_stream.dependency_graph.insert_node(GraphNode {
        id,
        owner,
        defines: Some(symbol),
        reads: reads.into_iter().collect(),
        calls: calls.into_iter().collect(),
        pc_start,
        pc_end,
        is_active: true,
    });
    tracing::trace!(%id, target, pc_start, pc_end, "statement compiled");
    Ok(warnings)
}

fn compile_function(
    state: &mut CompileState,
    owner: Option<SubtreeId>,
    def: &FunctionDef,
) -> Result<Vec<String>, CompileError> {
    let root = state.root_mut().ok_or_else(root_error)?;
    let assigned = root.symbol_table.index_of(&def.name).is_some_and(|slot| {
        !root
            .instr_stream
            .dependency_graph
            .writers_of(SymbolKey::global(slot))
            .is_empty()
    });
    if assigned {
        return Err(CompileError::FunctionShadowsVariable(def.name.clone()));
    }
    let index = root.procedure_table.reserve(&def.name);

    let block = state
        .code_blocks
        .add_child(CodeBlockId::ROOT, CodeBlockType::Function, Language::Associative)?;
    if let Some(body) = state.code_blocks.get_mut(block) {
        for param in &def.params {
            body.symbol_table.insert(delta_image::SymbolNode::argument(
                param.as_str(),
                block,
                index,
            ));
        }
    }

    let mut emitter = Emitter::new(state, &def.params, 0).defining(&def.name);
    emitter.expr(&def.body)?;
    emitter.emit(Instruction::Return);
    let Emitter {
        code,
        reads,
        calls,
        warnings,
        ..
    } = emitter;

    let body = state
        .code_blocks
        .get_mut(block)
        .ok_or(ImageError::UnknownBlock(block))?;
    for instruction in code {
        body.instr_stream.push(instruction);
    }
    let pc_end = body.instr_stream.next_pc();

    let root = state.root_mut().ok_or_else(root_error)?;
    root.procedure_table
        .define(&def.name, def.params.clone(), block, (0, pc_end), owner);
    let graph = &mut root.instr_stream.dependency_graph;
    graph.define_procedure(index, reads.into_iter().collect(), calls.into_iter().collect());
    if !graph.readers_of(DependencyVertex::Procedure(index)).is_empty() {
        root.instr_stream.update_list.push(UpdateNodeRef::Procedure(index));
    }
    state.dynamic_functions.resolve(&def.name);
    tracing::trace!(name = %def.name, index, %block, "function compiled");
    Ok(warnings)
}
