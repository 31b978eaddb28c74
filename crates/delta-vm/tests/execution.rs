//! Compile-and-run tests for the associative interpreter

use delta_compiler::{AssociativeCompiler, CompileState, Compiler, SourceFragment};
use delta_vm::{AssociativeInterpreter, ExecuteFault, Interpreter, MirrorData, RuntimeContext, RuntimeMemory, RuntimeMirror};
use pretty_assertions::assert_eq;

/// Compiles fragments one after another and runs each against shared memory
struct Session {
    state: CompileState,
    memory: RuntimeMemory,
    executable: delta_image::Executable,
    context: RuntimeContext,
}

impl Session {
    fn new() -> Self {
        Self {
            state: CompileState::new(),
            memory: RuntimeMemory::new(),
            executable: delta_image::Executable::empty(),
            context: RuntimeContext::default(),
        }
    }

    fn run(&mut self, code: &str) -> Result<delta_vm::ExecutionOutcome, ExecuteFault> {
        self.state.reset_for_new_delta();
        self.memory.reset_modified_symbols();
        let outcome = AssociativeCompiler::new().compile(&SourceFragment::from_code(code), &self.state);
        assert!(outcome.succeeded, "{:?}", outcome.diagnostics);
        let image = outcome.compiled.unwrap();
        let grow = image.global_count.saturating_sub(self.memory.global_count());
        self.memory.reallocate(grow);
        self.state = image.state;
        self.executable = image.executable;
        AssociativeInterpreter::new().execute(&self.executable, &mut self.memory, &self.context)
    }

    fn value(&self, name: &str) -> MirrorData {
        RuntimeMirror::new(&self.memory, &self.executable)
            .global_by_name(name)
            .unwrap()
    }
}

#[test]
fn test_dependents_rerun_when_input_changes() {
    let mut session = Session::new();
    session.run("a = 1;\nb = a + 1;\nc = b * 10;").unwrap();
    assert_eq!(session.value("c"), MirrorData::Int(20));

    let outcome = session.run("a = 5;").unwrap();
    assert_eq!(session.value("b"), MirrorData::Int(6));
    assert_eq!(session.value("c"), MirrorData::Int(60));
    assert_eq!(outcome.executed.len(), 3);
}

#[test]
fn test_unchanged_value_stops_propagation() {
    let mut session = Session::new();
    session.run("a = 1;\nb = a > 0;\nc = b ? \"yes\" : \"no\";").unwrap();
    let outcome = session.run("a = 2;").unwrap();
    // b stays true, so c is not re-run
    assert_eq!(outcome.executed.len(), 2);
    assert_eq!(session.value("c"), MirrorData::String("yes".into()));
}

#[test]
fn test_use_before_definition_updates_later() {
    let mut session = Session::new();
    session.run("y = x * 2;").unwrap();
    assert_eq!(session.value("y"), MirrorData::Null);

    session.run("x = 21;").unwrap();
    assert_eq!(session.value("y"), MirrorData::Int(42));
}

#[test]
fn test_functions_and_redefinition() {
    let mut session = Session::new();
    session.run("def sq(x) = x * x;\nr = sq(4);").unwrap();
    assert_eq!(session.value("r"), MirrorData::Int(16));

    session.run("def sq(x) = x * x * x;").unwrap();
    assert_eq!(session.value("r"), MirrorData::Int(64));
}

#[test]
fn test_forward_call_resolves_when_defined() {
    let mut session = Session::new();
    let outcome = session.run("r = inc(1);").unwrap();
    assert_eq!(session.value("r"), MirrorData::Null);
    assert_eq!(outcome.warnings.len(), 1);

    session.run("def inc(n) = n + 1;").unwrap();
    assert_eq!(session.value("r"), MirrorData::Int(2));
}

#[test]
fn test_function_reading_global_reruns_callers() {
    let mut session = Session::new();
    session.run("k = 3;\ndef scale(v) = v * k;\nout = scale(2);").unwrap();
    assert_eq!(session.value("out"), MirrorData::Int(6));

    session.run("k = 10;").unwrap();
    assert_eq!(session.value("out"), MirrorData::Int(20));
}

#[test]
fn test_recursion_and_function_pointers() {
    let mut session = Session::new();
    session
        .run("def fact(n) = n <= 1 ? 1 : n * fact(n - 1);\nf = fact;\nv = f(5);")
        .unwrap();
    assert_eq!(session.value("v"), MirrorData::Int(120));
    assert_eq!(
        session.value("f"),
        MirrorData::Function {
            function: "fact".into()
        }
    );
}

#[test]
fn test_arrays_and_strings() {
    let mut session = Session::new();
    session
        .run("xs = {1, 2.5, \"three\"};\nfirst = xs[0];\nlast = xs[-1] + \"!\";")
        .unwrap();
    assert_eq!(session.value("first"), MirrorData::Int(1));
    assert_eq!(session.value("last"), MirrorData::String("three!".into()));
    assert_eq!(session.value("xs").to_string(), "{1, 2.5, \"three\"}");
}

#[test]
fn test_update_cycle_faults() {
    let mut session = Session::new();
    session.context = RuntimeContext::default().with_max_update_passes(8);
    session.run("a = 1;\nb = a + 1;").unwrap();
    let fault = session.run("a = b + 1;").unwrap_err();
    assert!(matches!(fault, ExecuteFault::UpdateCycle { limit: 8, .. }));
    assert!(fault.is_program_fault());
}

#[test]
fn test_runaway_recursion_faults() {
    let mut session = Session::new();
    session.context = RuntimeContext::default().with_max_call_depth(32);
    let fault = session.run("def spin(n) = spin(n + 1);\nx = spin(0);").unwrap_err();
    assert_eq!(fault, ExecuteFault::CallDepthExceeded { limit: 32 });
}

#[test]
fn test_dump_lists_user_globals() {
    let mut session = Session::new();
    session.run("a = 1;\ndef f(x) = x;\nb = f(a);").unwrap();
    let dump = RuntimeMirror::new(&session.memory, &session.executable).dump_globals();
    assert_eq!(dump, "a = 1\nb = 1\n");
}
