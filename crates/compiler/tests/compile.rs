//! Compile-level tests: emitted bytecode shape, label/data soundness,
//! and the compile-error taxonomy.

use basil_core::{Instr, Literal, Program, ScalarKind};

fn compile(src: &str) -> Program {
    // Surface parser ambiguity diagnostics when RUST_LOG asks for them.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    basilc::compile(src).expect("program compiles")
}

fn errors_of(src: &str) -> Vec<String> {
    match basilc::compile(src) {
        Ok(_) => Vec::new(),
        Err(errs) => errs.into_iter().map(|e| e.message).collect(),
    }
}

fn assert_error_contains(src: &str, needle: &str) {
    let errs = errors_of(src);
    assert!(
        errs.iter().any(|m| m.contains(needle)),
        "expected an error containing {:?}, got {:?}",
        needle,
        errs
    );
}

#[test]
fn every_address_label_resolves_into_the_program() {
    let src = "GOSUB L: END: L: PRINT \"HI\": RETURN\nFOR I = 1 TO 3: PRINT I: NEXT I\nIF I THEN PRINT 1 ELSE PRINT 2\n";
    let program = compile(src);
    let len = program.instructions.len();
    for ins in &program.instructions {
        if let Instr::Jmp(a)
        | Instr::Bz(a)
        | Instr::Bnz(a)
        | Instr::Call(a)
        | Instr::Gosub(a)
        | Instr::ForLoop(a) = &ins.instr
        {
            assert!(*a <= len, "{} out of range {}", ins.instr, len);
        }
    }
}

#[test]
fn data_labels_index_the_pool() {
    let src = "DATA 1,\"A\",\nAGAIN: DATA 2\nRESTORE AGAIN\nREAD X\n";
    let program = compile(src);
    assert_eq!(
        program.data,
        vec![
            Some(Literal::Integer(1)),
            Some(Literal::Str("A".to_string())),
            None,
            Some(Literal::Integer(2)),
        ]
    );
    let restores: Vec<usize> = program
        .instructions
        .iter()
        .filter_map(|i| match i.instr {
            Instr::Restore(k) => Some(k),
            _ => None,
        })
        .collect();
    assert_eq!(restores, vec![3]);
    for k in restores {
        assert!(k <= program.data.len());
    }
}

#[test]
fn for_loops_use_the_forloop_instruction() {
    let program = compile("FOR I = 1 TO 3: PRINT I: NEXT I\n");
    let listing = program.disassemble();
    assert!(listing.contains("forloop"), "{}", listing);
    assert!(listing.contains("pushvalue I"), "{}", listing);
}

#[test]
fn gosub_and_call_are_distinct_opcodes() {
    let src = "SUB S(): END SUB\nGOSUB L\nS\nEND\nL: RETURN\n";
    let program = compile(src);
    let has = |f: fn(&Instr) -> bool| program.instructions.iter().any(|i| f(&i.instr));
    assert!(has(|i| matches!(i, Instr::Gosub(_))));
    assert!(has(|i| matches!(i, Instr::Call(_))));
}

#[test]
fn shared_names_and_defaults_reach_the_program_object() {
    let src = "DEFINT A-Z\nDIM SHARED G\nSUB S(): SHARED H: END SUB\n";
    let program = compile(src);
    assert!(program.shared.contains("G"));
    assert!(program.shared.contains("H"));
    assert_eq!(program.default_type, ScalarKind::Integer);
    assert!(!program.test_mode);
    assert!(basilc::compile_for_test("PRINT 1\n").unwrap().test_mode);
}

#[test]
fn variadic_syscalls_push_their_argument_count() {
    let program = compile("COLOR 7, 1\n");
    let listing = program.disassemble();
    // fg, bg, then the actual count, then the syscall
    assert!(listing.contains("pushconst 2\nsyscall COLOR") || listing.contains("pushconst 2"), "{}", listing);
    assert!(listing.contains("syscall COLOR"), "{}", listing);
}

#[test]
fn bad_character_reports_the_spec_message() {
    let errs = errors_of("PRINT @\n");
    assert_eq!(errs.len(), 1);
    assert!(errs[0].starts_with("Bad character at 1:7"), "{}", errs[0]);
}

#[test]
fn stuck_parses_report_syntax_errors_with_expectations() {
    let errs = errors_of("FOR = 1\n");
    assert_eq!(errs.len(), 1);
    assert!(errs[0].starts_with("Syntax error at"), "{}", errs[0]);
    assert!(errs[0].contains("identifier"), "{}", errs[0]);
}

#[test]
fn unterminated_strings_fail_to_compile() {
    assert_error_contains("PRINT \"oops\n", "Unterminated string");
}

#[test]
fn assignment_type_mismatch_is_a_compile_error() {
    assert_error_contains("X$ = 1\n", "Type mismatch");
    assert_error_contains("N = \"words\"\n", "Type mismatch");
    assert_error_contains("PRINT \"a\" + 1\n", "Type mismatch");
}

#[test]
fn undefined_goto_targets_are_reported() {
    assert_error_contains("GOTO NOWHERE\n", "undefined label NOWHERE");
}

#[test]
fn duplicate_definitions_are_reported() {
    assert_error_contains(
        "SUB S(): END SUB\nSUB S(): END SUB\n",
        "duplicate definition of S",
    );
    assert_error_contains(
        "TYPE T\nX AS SINGLE\nEND TYPE\nTYPE T\nY AS SINGLE\nEND TYPE\n",
        "duplicate TYPE T",
    );
}

#[test]
fn unknown_types_in_dim_are_reported() {
    assert_error_contains("DIM P AS NOPE\n", "unknown type NOPE");
}

#[test]
fn record_fields_must_be_scalars() {
    assert_error_contains(
        "TYPE A\nX AS SINGLE\nEND TYPE\nTYPE B\nY AS A\nEND TYPE\n",
        "unknown type A",
    );
}

#[test]
fn syscall_arity_and_types_are_checked() {
    assert_error_contains("LOCATE 1\n", "wrong number of arguments to LOCATE");
    assert_error_contains("PRINT CHR$(\"x\")\n", "type mismatch in argument 1 to CHR$");
    // READ takes variables by reference; a literal is not even grammatical.
    assert_error_contains("READ 5\n", "Syntax error");
}

#[test]
fn user_call_arity_is_checked() {
    assert_error_contains(
        "SUB S(A, B): END SUB\nS 1\n",
        "wrong number of arguments to S",
    );
}

#[test]
fn multi_variable_input_is_rejected() {
    assert_error_contains("INPUT A, B\n", "INPUT reads a single variable");
}

#[test]
fn subscript_counts_are_checked_statically() {
    assert_error_contains("DIM A(2, 2)\nPRINT A(1)\n", "wrong number of subscripts");
}

#[test]
fn undeclared_callables_are_reported() {
    assert_error_contains("X = NOSUCH(1)\n", "undeclared array or function NOSUCH");
}

#[test]
fn next_must_match_its_for() {
    assert_error_contains("FOR I = 1 TO 3: NEXT J\n", "NEXT J does not match FOR I");
}

#[test]
fn programs_halt_before_sub_bodies() {
    // Falling off the main program must not run into SUB bodies.
    let src = "SUB S(): PRINT \"body\": END SUB\nPRINT \"main\"\n";
    let program = compile(src);
    let listing = program.disassemble();
    let jmp_line = listing.lines().position(|l| l.contains("jmp")).expect("has a jump");
    let body_line = listing.lines().position(|l| l.contains("\"body\"")).expect("has the body");
    assert!(jmp_line < body_line, "{}", listing);
}

#[test]
fn compile_is_deterministic() {
    let src = "FOR I = 1 TO 3: PRINT I: NEXT I\nGOSUB L: END: L: RETURN\n";
    assert_eq!(compile(src), compile(src));
}
