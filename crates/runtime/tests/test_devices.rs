//! Device-facing syscalls: audio, sprites, file I/O.

use basil_runtime::{LocalFileSystem, MemoryFileSystem, TestAudio, TestConsole, Vm};

fn run_with_devices(
    source: &str,
) -> (Vm, TestConsole, TestAudio, MemoryFileSystem) {
    let program = basilc::compile_for_test(source).expect("compiles");
    let (mut vm, console, audio, files) = Vm::for_test(program);
    vm.run().expect("runs");
    (vm, console, audio, files)
}

#[test]
fn play_and_background_music_reach_the_device() {
    let (_vm, _console, audio, _files) =
        run_with_devices("PLAY \"T120 O4 CDEC\"\nBGMPLAY \"L8 GAB\", 1\nBGMSTOP\n");
    assert_eq!(
        audio.played(),
        vec![
            ("T120 O4 CDEC".to_string(), false, false),
            ("L8 GAB".to_string(), true, true),
        ]
    );
    assert_eq!(audio.stop_count(), 1);
}

#[test]
fn sprite_calls_are_relayed_in_order() {
    let src = "SPSET 1, 3\nSPOFS 1, 10, 20\nSPSCALE 1, 2, 2\nSPROT 1, 90\nSPHOME 1, 8, 8\nSPANIM 1, 0, 3, 1\nSPHIDE 1\nSPSHOW 1\nSPCLR 1\n";
    let (_vm, console, _audio, _files) = run_with_devices(src);
    assert_eq!(
        console.calls(),
        vec![
            "spset 1,3,1",
            "spofs 1,10,20",
            "spscale 1,2,2",
            "sprot 1,90",
            "sphome 1,8,8",
            "spanim 1,0,3,true",
            "spshow 1,false",
            "spshow 1,true",
            "spclr 1",
        ]
    );
}

#[test]
fn write_then_input_round_trips_through_a_memory_file() {
    let src = concat!(
        "OPEN \"out.txt\" FOR OUTPUT AS #1\n",
        "WRITE #1, \"A\", 12\n",
        "CLOSE #1\n",
        "OPEN \"out.txt\" FOR INPUT AS #2\n",
        "INPUT #2, S$, N\n",
        "CLOSE #2\n",
        "PRINT S$; N\n",
    );
    let (_vm, console, _audio, files) = run_with_devices(src);
    assert_eq!(files.contents("out.txt"), Some(vec!["\"A\",12".to_string()]));
    assert_eq!(console.output(), "A 12\n");
}

#[test]
fn reading_past_the_end_raises_io_error() {
    let src = concat!(
        "OPEN \"x\" FOR OUTPUT AS #1\nCLOSE #1\n",
        "OPEN \"x\" FOR INPUT AS #1\nINPUT #1, A\n",
    );
    let program = basilc::compile_for_test(src).expect("compiles");
    let (mut vm, _c, _a, _f) = Vm::for_test(program);
    let err = vm.run().expect_err("eof traps");
    assert_eq!(err.code.code(), 401);
}

#[test]
fn opening_a_missing_file_raises_io_error() {
    let program =
        basilc::compile_for_test("OPEN \"missing\" FOR INPUT AS #1\n").expect("compiles");
    let (mut vm, _c, _a, _f) = Vm::for_test(program);
    assert_eq!(vm.run().expect_err("missing file").code.code(), 401);
}

#[test]
fn local_file_system_writes_real_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let program = basilc::compile_for_test(concat!(
        "OPEN \"report.txt\" FOR OUTPUT AS #1\n",
        "WRITE #1, \"total\", 3\n",
        "CLOSE #1\n",
    ))
    .expect("compiles");
    let console = TestConsole::new();
    let mut vm = Vm::new(
        program,
        Box::new(console),
        Box::new(TestAudio::new()),
        Box::new(LocalFileSystem::new(dir.path())),
    );
    vm.run().expect("runs");
    let written = std::fs::read_to_string(dir.path().join("report.txt")).expect("file exists");
    assert_eq!(written, "\"total\",3\n");
}
