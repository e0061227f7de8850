//! End-to-end execution tests: compile with basilc, run on the test
//! devices, observe the console.

use basil_runtime::{ErrorCode, TestConsole, Vm};
use std::cell::RefCell;
use std::rc::Rc;

fn run(source: &str) -> (Vm, TestConsole) {
    // VM trap traces show up under RUST_LOG=debug when a test misbehaves.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let program = basilc::compile_for_test(source).expect("program compiles");
    let (mut vm, console, _audio, _files) = Vm::for_test(program);
    vm.run().expect("program runs");
    (vm, console)
}

fn output_of(source: &str) -> String {
    run(source).1.output()
}

#[test]
fn prints_a_sum() {
    assert_eq!(output_of("PRINT 1 + 2\n"), "3\n");
}

#[test]
fn for_loop_counts_and_leaves_the_stack_empty() {
    let (vm, console) = run("FOR I = 1 TO 3: PRINT I: NEXT I\n");
    assert_eq!(console.output(), "1\n2\n3\n");
    assert_eq!(vm.stack_depth(), 0);
    assert_eq!(vm.call_depth(), 1);
}

#[test]
fn for_loop_with_negative_step() {
    assert_eq!(output_of("FOR I = 3 TO 1 STEP -1: PRINT I: NEXT I\n"), "3\n2\n1\n");
}

#[test]
fn for_loop_that_never_runs() {
    assert_eq!(output_of("FOR I = 5 TO 1: PRINT I: NEXT I\nPRINT \"done\"\n"), "done\n");
}

#[test]
fn division_by_zero_fires_the_error_event() {
    let program = basilc::compile_for_test("X = 10 / 0\n").expect("compiles");
    let (mut vm, _console, _audio, _files) = Vm::for_test(program);
    let seen: Rc<RefCell<Vec<u16>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    vm.on_error(move |err| sink.borrow_mut().push(err.code.code()));
    let err = vm.run().expect_err("division traps");
    assert_eq!(err.code, ErrorCode::DivisionByZero);
    assert_eq!(err.code.code(), 101);
    assert_eq!(err.locus.line, 1);
    assert_eq!(*seen.borrow(), vec![101]);
    assert!(vm.is_suspended());
}

#[test]
fn arrays_store_and_recall() {
    assert_eq!(output_of("DIM A(1 TO 3): A(2) = 42: PRINT A(2)\n"), "42\n");
}

#[test]
fn array_subscript_out_of_range_traps() {
    let program = basilc::compile_for_test("DIM A(3)\nX = A(9)\n").expect("compiles");
    let (mut vm, _c, _a, _f) = Vm::for_test(program);
    let err = vm.run().expect_err("subscript traps");
    assert_eq!(err.code.code(), 102);
    assert_eq!(err.locus.line, 2);
}

#[test]
fn data_read_and_the_data_pointer() {
    let (vm, console) = run("DATA 1,2,3\nREAD X, Y, Z\nPRINT X; Y; Z\n");
    assert!(console.output().contains("1 2 3"));
    assert_eq!(vm.data_pointer(), 3);
}

#[test]
fn data_holes_leave_defaults() {
    assert_eq!(output_of("DATA 7,,9\nREAD A, B, C\nPRINT A; B; C\n"), "7 0 9\n");
}

#[test]
fn restore_rewinds_to_a_label() {
    let src = "DATA 1\nMORE: DATA 2\nREAD A\nREAD B\nRESTORE MORE\nREAD C\nPRINT A; B; C\n";
    assert_eq!(output_of(src), "1 2 2\n");
}

#[test]
fn gosub_returns_exactly_once() {
    let (vm, console) = run("GOSUB L: END: L: PRINT \"HI\": RETURN\n");
    assert_eq!(console.output(), "HI\n");
    assert_eq!(vm.call_depth(), 1);
    assert_eq!(vm.stack_depth(), 0);
}

#[test]
fn gosub_shares_the_callers_variables() {
    let src = "X = 1: GOSUB BUMP: PRINT X: END: BUMP: X = X + 1: RETURN\n";
    assert_eq!(output_of(src), "2\n");
}

#[test]
fn sub_gets_a_fresh_frame() {
    let src = "SUB S(): X = 5: END SUB\nS\nPRINT X\n";
    assert_eq!(output_of(src), "0\n");
}

#[test]
fn sub_arguments_alias_byref() {
    let src = "SUB INC(N): N = N + 1: END SUB\nX = 5\nINC X\nPRINT X\n";
    assert_eq!(output_of(src), "6\n");
}

#[test]
fn shared_names_bind_in_the_main_frame() {
    let src = "DIM SHARED G\nSUB S(): G = 7: END SUB\nS\nPRINT G\n";
    assert_eq!(output_of(src), "7\n");
}

#[test]
fn functions_return_through_their_name() {
    let src = "FUNCTION F(N): F = N * 2: END FUNCTION\nPRINT F(21)\n";
    assert_eq!(output_of(src), "42\n");
}

#[test]
fn recursive_functions() {
    let src = "FUNCTION FACT(N)\nIF N <= 1 THEN FACT = 1 ELSE FACT = N * FACT(N - 1)\nEND FUNCTION\nPRINT FACT(5)\n";
    assert_eq!(output_of(src), "120\n");
}

#[test]
fn boolean_convention_is_minus_one_and_zero() {
    assert_eq!(output_of("PRINT (1 = 1)\n"), "-1\n");
    assert_eq!(output_of("PRINT (1 = 2)\n"), "0\n");
    assert_eq!(output_of("PRINT NOT 0\n"), "-1\n");
    assert_eq!(output_of("PRINT NOT -1\n"), "0\n");
}

#[test]
fn bitwise_and_or() {
    assert_eq!(output_of("PRINT 6 AND 3\n"), "2\n");
    assert_eq!(output_of("PRINT 6 OR 3\n"), "7\n");
}

#[test]
fn goto_skips_statements() {
    assert_eq!(output_of("X = 1: GOTO SKIP: X = 2: SKIP: PRINT X\n"), "1\n");
}

#[test]
fn while_and_do_loops_run() {
    let src = "X = 0\nWHILE X < 3\nX = X + 1\nWEND\nPRINT X\n";
    assert_eq!(output_of(src), "3\n");
    let src = "X = 5\nDO\nX = X - 1\nLOOP UNTIL X = 0\nPRINT X\n";
    assert_eq!(output_of(src), "0\n");
    let src = "X = 0\nDO WHILE X < 2\nX = X + 1\nLOOP\nPRINT X\n";
    assert_eq!(output_of(src), "2\n");
}

#[test]
fn block_if_chains_pick_the_right_arm() {
    let src = "X = 2\nIF X = 1 THEN\nPRINT \"one\"\nELSEIF X = 2 THEN\nPRINT \"two\"\nELSE\nPRINT \"many\"\nEND IF\n";
    assert_eq!(output_of(src), "two\n");
}

#[test]
fn single_line_if_with_else() {
    assert_eq!(output_of("IF 1 THEN PRINT \"T\" ELSE PRINT \"F\"\n"), "T\n");
    assert_eq!(output_of("IF 0 THEN PRINT \"T\" ELSE PRINT \"F\"\n"), "F\n");
}

#[test]
fn records_hold_typed_fields() {
    let src = "TYPE POINT\nX AS SINGLE\nY AS SINGLE\nEND TYPE\nDIM P AS POINT\nP.X = 3\nP.Y = P.X + 1\nPRINT P.X; P.Y\n";
    assert_eq!(output_of(src), "3 4\n");
}

#[test]
fn record_arrays_address_member_slots() {
    let src = "TYPE ITEM\nN AS INTEGER\nEND TYPE\nDIM A(2) AS ITEM\nA(1).N = 9\nPRINT A(1).N\n";
    assert_eq!(output_of(src), "9\n");
}

#[test]
fn string_functions_compose() {
    assert_eq!(output_of("PRINT LEFT$(\"HELLO\", 2)\n"), "HE\n");
    assert_eq!(output_of("PRINT RIGHT$(\"HELLO\", 3)\n"), "LLO\n");
    assert_eq!(output_of("PRINT MID$(\"HELLO\", 2, 3)\n"), "ELL\n");
    assert_eq!(output_of("PRINT MID$(\"HELLO\", 2)\n"), "ELLO\n");
    assert_eq!(output_of("PRINT UCASE$(\"hi\") + LCASE$(\"HO\")\n"), "HIho\n");
    assert_eq!(output_of("PRINT LEN(\"1234\")\n"), "4\n");
    assert_eq!(output_of("PRINT SPACE$(3) + \"x\"\n"), "   x\n");
    assert_eq!(output_of("PRINT CHR$(65)\n"), "A\n");
    assert_eq!(output_of("PRINT STR$(12)\n"), "12\n");
    assert_eq!(output_of("PRINT VAL(\"3.5rest\")\n"), "3.5\n");
    assert_eq!(output_of("PRINT INT(3.7)\n"), "3\n");
}

#[test]
fn string_concatenation_and_comparison() {
    assert_eq!(output_of("A$ = \"foo\"\nB$ = A$ + \"bar\"\nPRINT B$\n"), "foobar\n");
    assert_eq!(output_of("PRINT (\"abc\" < \"abd\")\n"), "-1\n");
    assert_eq!(output_of("PRINT (\"abc\" = \"abc\")\n"), "-1\n");
}

#[test]
fn swap_exchanges_values() {
    assert_eq!(output_of("X = 1: Y = 2: SWAP X, Y: PRINT X; Y\n"), "2 1\n");
}

#[test]
fn print_zones_pad_to_fourteen_columns() {
    assert_eq!(output_of("PRINT \"A\", \"B\"\n"), "A             B\n");
}

#[test]
fn print_tab_moves_the_cursor() {
    assert_eq!(output_of("PRINT TAB(5); \"X\"\n"), "    X\n");
}

#[test]
fn trailing_semicolon_suppresses_the_newline() {
    assert_eq!(output_of("PRINT 1;\nPRINT 2\n"), "12\n");
}

#[test]
fn print_using_formats_fields() {
    assert_eq!(output_of("PRINT USING \"## points\"; 7\n"), " 7 points\n");
}

fn vm_with_console(source: &str, console: &TestConsole) -> Vm {
    let program = basilc::compile_for_test(source).expect("compiles");
    Vm::new(
        program,
        Box::new(console.clone()),
        Box::new(basil_runtime::TestAudio::new()),
        Box::new(basil_runtime::MemoryFileSystem::new()),
    )
}

#[test]
fn input_completes_from_the_scripted_console() {
    let console = TestConsole::with_input(&["21"]);
    let mut vm = vm_with_console("INPUT X\nPRINT X * 2\n", &console);
    vm.run().expect("runs");
    assert_eq!(console.output(), "? 42\n");
}

#[test]
fn pending_input_suspends_until_the_host_provides_a_line() {
    use basil_runtime::Tick;
    let console = TestConsole::new(); // no scripted input: INPUT pends
    let mut vm = vm_with_console("INPUT X\nPRINT X + 1\n", &console);
    assert_eq!(vm.tick(basil_runtime::DEFAULT_QUANTUM).unwrap(), Tick::Suspended);
    assert!(vm.is_suspended());
    vm.provide_input("41").expect("input lands");
    assert!(!vm.is_suspended());
    assert_eq!(vm.tick(basil_runtime::DEFAULT_QUANTUM).unwrap(), Tick::Halted);
    assert!(console.output().ends_with("42\n"));
}

#[test]
fn ticks_bound_the_quantum() {
    use basil_runtime::Tick;
    let console = TestConsole::new();
    let mut vm = vm_with_console("FOR I = 1 TO 10000\nNEXT I\n", &console);
    assert_eq!(vm.tick(16).unwrap(), Tick::Budget);
    let mut ticks = 1usize;
    loop {
        match vm.tick(4096).unwrap() {
            Tick::Halted => break,
            Tick::Budget => ticks += 1,
            Tick::Suspended => panic!("nothing suspends here"),
        }
        assert!(ticks < 100, "loop should finish within the budget");
    }
    assert_eq!(vm.stack_depth(), 0);
}

#[test]
fn inkey_drains_the_key_buffer() {
    let program = basilc::compile_for_test("K$ = INKEY$\nPRINT K$\nPRINT INKEY$\n").expect("ok");
    let console = TestConsole::new();
    console.push_key(65);
    let mut vm = Vm::new(
        program,
        Box::new(console.clone()),
        Box::new(basil_runtime::TestAudio::new()),
        Box::new(basil_runtime::MemoryFileSystem::new()),
    );
    vm.run().expect("runs");
    assert_eq!(console.output(), "A\n\n");
}

#[test]
fn console_side_effects_are_ordered() {
    let (_vm, console) = run("CLS\nLOCATE 2, 5\nCOLOR 7\nBEEP\n");
    assert_eq!(
        console.calls(),
        vec!["cls", "locate 2,5", "color 7,None,None", "beep"]
    );
}

#[test]
fn return_without_gosub_underflows() {
    let program = basilc::compile_for_test("RETURN\n").expect("compiles");
    let (mut vm, _c, _a, _f) = Vm::for_test(program);
    let err = vm.run().expect_err("underflow");
    assert_eq!(err.code.code(), 202);
}

#[test]
fn runaway_recursion_overflows_the_call_stack() {
    let src = "SUB R(): R: END SUB\nR\n";
    let program = basilc::compile_for_test(src).expect("compiles");
    let (mut vm, _c, _a, _f) = Vm::for_test(program);
    let err = vm.run().expect_err("overflow");
    assert_eq!(err.code.code(), 201);
}

#[test]
fn reset_replays_the_program_cleanly() {
    let program = basilc::compile_for_test("PRINT \"go\"\n").expect("compiles");
    let (mut vm, console, _a, _f) = Vm::for_test(program.clone());
    vm.run().expect("first run");
    assert_eq!(console.output(), "go\n");
    vm.reset(program);
    vm.run().expect("second run");
    // reset clears the console transcript too
    assert_eq!(console.output(), "go\n");
}

#[test]
fn deftype_changes_the_default_type() {
    let src = "DEFSTR A-Z\nX = \"words\"\nPRINT X\n";
    assert_eq!(output_of(src), "words\n");
}

#[test]
fn option_base_one_starts_arrays_at_one() {
    let src = "OPTION BASE 1\nDIM A(3)\nA(1) = 5\nPRINT A(1)\n";
    assert_eq!(output_of(src), "5\n");
    let program = basilc::compile_for_test("OPTION BASE 1\nDIM A(3)\nA(0) = 1\n").expect("ok");
    let (mut vm, _c, _a, _f) = Vm::for_test(program);
    assert_eq!(vm.run().expect_err("below base").code.code(), 102);
}

#[test]
fn stub_syscalls_stay_stubs() {
    assert_eq!(output_of("PRINT PEEK(1234)\n"), "0\n");
    // RANDOMIZE discards its argument and RND stays deterministic in
    // test mode.
    let a = output_of("RANDOMIZE 1\nPRINT RND\n");
    let b = output_of("RANDOMIZE 99\nPRINT RND\n");
    assert_eq!(a, b);
}

#[test]
fn rnd_zero_repeats_the_last_value() {
    let out = output_of("A = RND\nB = RND(0)\nPRINT (A = B)\n");
    assert_eq!(out, "-1\n");
}

#[test]
fn mod_and_power_operators() {
    assert_eq!(output_of("PRINT 7 MOD 3\n"), "1\n");
    assert_eq!(output_of("PRINT 2 ^ 10\n"), "1024\n");
    assert_eq!(output_of("PRINT -2 ^ 2\n"), "-4\n");
}
