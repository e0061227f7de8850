//! System routine dispatch.
//!
//! Handlers are keyed by the names the code generator emits. Each
//! handler pops its own operands (variadic routines pop the actual
//! argument count first, since the caller pushes it last) and pushes a
//! result when the signature is a function.
//!
//! Split by domain the way the signature tables group them:
//!
//! - `numeric_ops`: RND, INT, VAL, TIMER, PEEK, RANDOMIZE
//! - `string_ops`: CHR$, STR$, SPACE$, LEN, LEFT$, RIGHT$, MID$,
//!   LCASE$, UCASE$, INKEY$
//! - `console_ops`: CLS, LOCATE, COLOR, SCREEN, WIDTH, BEEP, SWAP,
//!   INPUT, and the print family
//! - `data_ops`: READ and the allocation opcodes
//! - `flow_ops`: SLEEP, YIELD, SYSTEM
//! - `audio_ops`: PLAY, BGMPLAY, BGMSTOP
//! - `sprite_ops`: the SP* family
//! - `file_ops`: open, close, write, input_file

mod audio_ops;
mod console_ops;
mod data_ops;
mod file_ops;
mod flow_ops;
mod numeric_ops;
mod sprite_ops;
mod string_ops;

use crate::error::{ErrorCode, RuntimeError};
use crate::vm::Vm;
use std::collections::HashMap;
use std::sync::LazyLock;

pub(crate) type Handler = fn(&mut Vm) -> Result<(), RuntimeError>;

static HANDLERS: LazyLock<HashMap<&'static str, Handler>> = LazyLock::new(|| {
    let mut table: HashMap<&'static str, Handler> = HashMap::new();
    numeric_ops::register(&mut table);
    string_ops::register(&mut table);
    console_ops::register(&mut table);
    data_ops::register(&mut table);
    flow_ops::register(&mut table);
    audio_ops::register(&mut table);
    sprite_ops::register(&mut table);
    file_ops::register(&mut table);
    table
});

pub(crate) fn dispatch(vm: &mut Vm, name: &str) -> Result<(), RuntimeError> {
    match HANDLERS.get(name) {
        Some(handler) => handler(vm),
        None => Err(RuntimeError::new(
            ErrorCode::UnknownSyscall,
            format!("unknown syscall {}", name),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basil_core::syscall;

    #[test]
    fn every_signature_has_a_handler() {
        for sig in syscall::FUNCTIONS.iter().chain(syscall::SUBROUTINES) {
            assert!(HANDLERS.contains_key(sig.name), "no handler for {}", sig.name);
        }
    }

    #[test]
    fn every_handler_has_a_signature() {
        for name in HANDLERS.keys() {
            assert!(
                syscall::function(name).is_some() || syscall::subroutine(name).is_some(),
                "no signature for {}",
                name
            );
        }
    }
}
