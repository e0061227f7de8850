//! Device interfaces and their in-memory test doubles.
//!
//! The VM owns no screen, speaker or disk; it talks to trait objects.
//! Operations that may wait on the outside world return a [`Request`]:
//! `Ready` completes the syscall synchronously, `Pending` suspends the
//! VM until the host calls `resume`/`provide_input`.
//!
//! The test doubles (`TestConsole`, `TestAudio`, `MemoryFileSystem`) are
//! cloneable handles over shared state, so a test can keep one half and
//! hand the other to the VM.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;

/// Completion of a device operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<T> {
    Ready(T),
    Pending,
}

/// File open modes of the dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Input,
    Output,
    Append,
}

impl FileMode {
    /// The one-letter tag the code generator embeds (`I`/`O`/`A`).
    pub fn from_tag(tag: &str) -> Option<FileMode> {
        match tag {
            "I" => Some(FileMode::Input),
            "O" => Some(FileMode::Output),
            "A" => Some(FileMode::Append),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------
// Console
// ----------------------------------------------------------------------

/// The text/graphics surface (implemented by the host).
///
/// The console owns the cursor column; the VM consults it for `,`
/// tab stops and `TAB(n)`.
pub trait Console {
    fn reset(&mut self, test_mode: bool);
    fn cls(&mut self);
    fn locate(&mut self, row: i64, col: i64);
    fn color(&mut self, fg: i64, bg: Option<i64>, border: Option<i64>);
    fn screen(&mut self, mode: i64);
    fn width(&mut self, width: i64, height: i64);
    fn print(&mut self, s: &str);
    /// Zero-based column the next character prints at.
    fn cursor_column(&self) -> usize;
    fn beep(&mut self);
    /// A line of user input, or `Pending` until one arrives.
    fn input(&mut self) -> Request<String>;
    /// Next buffered key code; −1 when none. A zero introduces an escape
    /// sequence whose scan code follows on the next read.
    fn get_key_from_buffer(&mut self) -> i64;

    // sprites
    fn create_sprite(&mut self, n: i64, image: i64, frames: i64) -> Request<()>;
    fn offset_sprite(&mut self, n: i64, x: f64, y: f64);
    fn scale_sprite(&mut self, n: i64, sx: f64, sy: f64);
    fn rotate_sprite(&mut self, n: i64, angle: f64);
    fn home_sprite(&mut self, n: i64, hx: f64, hy: f64);
    fn display_sprite(&mut self, n: i64, show: bool);
    fn animate_sprite(&mut self, n: i64, from: i64, to: i64, loop_anim: bool);
    fn clear_sprite(&mut self, n: i64);
}

#[derive(Debug, Default)]
struct TestConsoleState {
    output: String,
    column: usize,
    input_script: VecDeque<String>,
    keys: VecDeque<i64>,
    calls: Vec<String>,
}

/// Recording console for tests: output accumulates in a string, input
/// comes from a script, every side effect is logged.
#[derive(Debug, Clone, Default)]
pub struct TestConsole {
    state: Rc<RefCell<TestConsoleState>>,
}

impl TestConsole {
    pub fn new() -> Self {
        TestConsole::default()
    }

    pub fn with_input(lines: &[&str]) -> Self {
        let console = TestConsole::new();
        for line in lines {
            console.state.borrow_mut().input_script.push_back((*line).to_string());
        }
        console
    }

    pub fn push_key(&self, key: i64) {
        self.state.borrow_mut().keys.push_back(key);
    }

    /// Everything printed so far.
    pub fn output(&self) -> String {
        self.state.borrow().output.clone()
    }

    /// The non-print side effects, in order (`cls`, `locate 1,2`, ...).
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    fn log(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Console for TestConsole {
    fn reset(&mut self, _test_mode: bool) {
        let mut s = self.state.borrow_mut();
        s.output.clear();
        s.column = 0;
        s.calls.clear();
    }

    fn cls(&mut self) {
        self.log("cls".to_string());
        let mut s = self.state.borrow_mut();
        s.column = 0;
    }

    fn locate(&mut self, row: i64, col: i64) {
        self.log(format!("locate {},{}", row, col));
        self.state.borrow_mut().column = (col.max(1) - 1) as usize;
    }

    fn color(&mut self, fg: i64, bg: Option<i64>, border: Option<i64>) {
        self.log(format!("color {:?},{:?},{:?}", fg, bg, border));
    }

    fn screen(&mut self, mode: i64) {
        self.log(format!("screen {}", mode));
    }

    fn width(&mut self, width: i64, height: i64) {
        self.log(format!("width {},{}", width, height));
    }

    fn print(&mut self, s: &str) {
        let mut state = self.state.borrow_mut();
        state.output.push_str(s);
        match s.rfind('\n') {
            Some(pos) => state.column = s.len() - pos - 1,
            None => state.column += s.len(),
        }
    }

    fn cursor_column(&self) -> usize {
        self.state.borrow().column
    }

    fn beep(&mut self) {
        self.log("beep".to_string());
    }

    fn input(&mut self) -> Request<String> {
        match self.state.borrow_mut().input_script.pop_front() {
            Some(line) => Request::Ready(line),
            None => Request::Pending,
        }
    }

    fn get_key_from_buffer(&mut self) -> i64 {
        self.state.borrow_mut().keys.pop_front().unwrap_or(-1)
    }

    fn create_sprite(&mut self, n: i64, image: i64, frames: i64) -> Request<()> {
        self.log(format!("spset {},{},{}", n, image, frames));
        Request::Ready(())
    }

    fn offset_sprite(&mut self, n: i64, x: f64, y: f64) {
        self.log(format!("spofs {},{},{}", n, x, y));
    }

    fn scale_sprite(&mut self, n: i64, sx: f64, sy: f64) {
        self.log(format!("spscale {},{},{}", n, sx, sy));
    }

    fn rotate_sprite(&mut self, n: i64, angle: f64) {
        self.log(format!("sprot {},{}", n, angle));
    }

    fn home_sprite(&mut self, n: i64, hx: f64, hy: f64) {
        self.log(format!("sphome {},{},{}", n, hx, hy));
    }

    fn display_sprite(&mut self, n: i64, show: bool) {
        self.log(format!("spshow {},{}", n, show));
    }

    fn animate_sprite(&mut self, n: i64, from: i64, to: i64, loop_anim: bool) {
        self.log(format!("spanim {},{},{},{}", n, from, to, loop_anim));
    }

    fn clear_sprite(&mut self, n: i64) {
        self.log(format!("spclr {}", n));
    }
}

// ----------------------------------------------------------------------
// Audio
// ----------------------------------------------------------------------

/// The audio device: MML playback.
pub trait Audio {
    /// Foreground playback; `Pending` suspends the program until the
    /// piece finishes.
    fn play_music(&mut self, music: &str, repeat: bool) -> Request<()>;
    /// Background playback; never suspends.
    fn background_music(&mut self, music: &str, repeat: bool);
    fn stop_music(&mut self);
}

#[derive(Debug, Default)]
struct TestAudioState {
    played: Vec<(String, bool, bool)>,
    stopped: usize,
}

/// Recording audio device for tests.
#[derive(Debug, Clone, Default)]
pub struct TestAudio {
    state: Rc<RefCell<TestAudioState>>,
}

impl TestAudio {
    pub fn new() -> Self {
        TestAudio::default()
    }

    /// (music, repeat, background) triples in call order.
    pub fn played(&self) -> Vec<(String, bool, bool)> {
        self.state.borrow().played.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.state.borrow().stopped
    }
}

impl Audio for TestAudio {
    fn play_music(&mut self, music: &str, repeat: bool) -> Request<()> {
        self.state.borrow_mut().played.push((music.to_string(), repeat, false));
        Request::Ready(())
    }

    fn background_music(&mut self, music: &str, repeat: bool) {
        self.state.borrow_mut().played.push((music.to_string(), repeat, true));
    }

    fn stop_music(&mut self) {
        self.state.borrow_mut().stopped += 1;
    }
}

// ----------------------------------------------------------------------
// File system
// ----------------------------------------------------------------------

/// Line-oriented file access for OPEN/WRITE#/INPUT#/CLOSE.
pub trait FileSystem {
    fn open(&mut self, path: &str, mode: FileMode) -> io::Result<u32>;
    fn write_line(&mut self, handle: u32, line: &str) -> io::Result<()>;
    /// `None` at end of file.
    fn read_line(&mut self, handle: u32) -> io::Result<Option<String>>;
    fn close(&mut self, handle: u32);
}

#[derive(Debug, Default)]
struct MemoryFileSystemState {
    files: HashMap<String, Vec<String>>,
    open: HashMap<u32, MemoryOpenFile>,
    next_handle: u32,
}

#[derive(Debug)]
struct MemoryOpenFile {
    path: String,
    mode: FileMode,
    cursor: usize,
}

/// In-memory file system for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    state: Rc<RefCell<MemoryFileSystemState>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        MemoryFileSystem::default()
    }

    pub fn seed(&self, path: &str, lines: &[&str]) {
        self.state
            .borrow_mut()
            .files
            .insert(path.to_string(), lines.iter().map(|l| (*l).to_string()).collect());
    }

    pub fn contents(&self, path: &str) -> Option<Vec<String>> {
        self.state.borrow().files.get(path).cloned()
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&mut self, path: &str, mode: FileMode) -> io::Result<u32> {
        let mut state = self.state.borrow_mut();
        match mode {
            FileMode::Input => {
                if !state.files.contains_key(path) {
                    return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
                }
            }
            FileMode::Output => {
                state.files.insert(path.to_string(), Vec::new());
            }
            FileMode::Append => {
                state.files.entry(path.to_string()).or_default();
            }
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.open.insert(handle, MemoryOpenFile { path: path.to_string(), mode, cursor: 0 });
        Ok(handle)
    }

    fn write_line(&mut self, handle: u32, line: &str) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        let path = match state.open.get(&handle) {
            Some(f) if f.mode != FileMode::Input => f.path.clone(),
            _ => return Err(io::Error::new(io::ErrorKind::InvalidInput, "bad file mode")),
        };
        state.files.entry(path).or_default().push(line.to_string());
        Ok(())
    }

    fn read_line(&mut self, handle: u32) -> io::Result<Option<String>> {
        let mut state = self.state.borrow_mut();
        let (path, cursor) = match state.open.get(&handle) {
            Some(f) if f.mode == FileMode::Input => (f.path.clone(), f.cursor),
            _ => return Err(io::Error::new(io::ErrorKind::InvalidInput, "bad file mode")),
        };
        let line = state.files.get(&path).and_then(|lines| lines.get(cursor)).cloned();
        if line.is_some() {
            if let Some(f) = state.open.get_mut(&handle) {
                f.cursor += 1;
            }
        }
        Ok(line)
    }

    fn close(&mut self, handle: u32) {
        self.state.borrow_mut().open.remove(&handle);
    }
}

enum LocalOpenFile {
    Reader(BufReader<fs::File>),
    Writer(BufWriter<fs::File>),
}

/// File system over a real directory (`std::fs`).
pub struct LocalFileSystem {
    root: PathBuf,
    open: HashMap<u32, LocalOpenFile>,
    next_handle: u32,
}

impl LocalFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFileSystem { root: root.into(), open: HashMap::new(), next_handle: 0 }
    }
}

impl FileSystem for LocalFileSystem {
    fn open(&mut self, path: &str, mode: FileMode) -> io::Result<u32> {
        let full = self.root.join(path);
        let file = match mode {
            FileMode::Input => LocalOpenFile::Reader(BufReader::new(fs::File::open(&full)?)),
            FileMode::Output => {
                LocalOpenFile::Writer(BufWriter::new(fs::File::create(&full)?))
            }
            FileMode::Append => LocalOpenFile::Writer(BufWriter::new(
                fs::OpenOptions::new().create(true).append(true).open(&full)?,
            )),
        };
        self.next_handle += 1;
        self.open.insert(self.next_handle, file);
        Ok(self.next_handle)
    }

    fn write_line(&mut self, handle: u32, line: &str) -> io::Result<()> {
        match self.open.get_mut(&handle) {
            Some(LocalOpenFile::Writer(w)) => {
                w.write_all(line.as_bytes())?;
                w.write_all(b"\n")
            }
            _ => Err(io::Error::new(io::ErrorKind::InvalidInput, "bad file mode")),
        }
    }

    fn read_line(&mut self, handle: u32) -> io::Result<Option<String>> {
        match self.open.get_mut(&handle) {
            Some(LocalOpenFile::Reader(r)) => {
                let mut line = String::new();
                if r.read_line(&mut line)? == 0 {
                    return Ok(None);
                }
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(Some(line))
            }
            _ => Err(io::Error::new(io::ErrorKind::InvalidInput, "bad file mode")),
        }
    }

    fn close(&mut self, handle: u32) {
        self.open.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_tracks_columns_across_newlines() {
        let mut console = TestConsole::new();
        console.print("abc");
        assert_eq!(console.cursor_column(), 3);
        console.print("de\nfg");
        assert_eq!(console.cursor_column(), 2);
        assert_eq!(console.output(), "abcde\nfg");
    }

    #[test]
    fn scripted_input_then_pending() {
        let mut console = TestConsole::with_input(&["42"]);
        assert_eq!(console.input(), Request::Ready("42".to_string()));
        assert_eq!(console.input(), Request::Pending);
    }

    #[test]
    fn memory_files_round_trip() {
        let mut mfs = MemoryFileSystem::new();
        let h = mfs.open("out.txt", FileMode::Output).unwrap();
        mfs.write_line(h, "\"A\",1").unwrap();
        mfs.close(h);
        let h = mfs.open("out.txt", FileMode::Input).unwrap();
        assert_eq!(mfs.read_line(h).unwrap(), Some("\"A\",1".to_string()));
        assert_eq!(mfs.read_line(h).unwrap(), None);
        mfs.close(h);
    }

    #[test]
    fn opening_a_missing_file_for_input_fails() {
        let mut mfs = MemoryFileSystem::new();
        assert!(mfs.open("nope.txt", FileMode::Input).is_err());
    }
}
