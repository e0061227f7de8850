//! Audio subroutines: foreground PLAY, background music, stop.

use super::Handler;
use crate::devices::Request;
use crate::error::RuntimeError;
use crate::vm::{Vm, Waiting};
use std::collections::HashMap;

pub(super) fn register(table: &mut HashMap<&'static str, Handler>) {
    table.insert("PLAY", play);
    table.insert("BGMPLAY", bgmplay);
    table.insert("BGMSTOP", bgmstop);
}

/// PLAY music[, repeat]: foreground playback; suspends until the piece
/// completes unless the device finishes synchronously.
fn play(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let repeat = if count > 1 { vm.pop_numeric()? != 0.0 } else { false };
    let music = vm.pop_string()?;
    match vm.audio.play_music(&music, repeat) {
        Request::Ready(()) => Ok(()),
        Request::Pending => {
            vm.suspend(Waiting::Music);
            Ok(())
        }
    }
}

/// BGMPLAY music[, repeat]: background playback, never suspends.
fn bgmplay(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let repeat = if count > 1 { vm.pop_numeric()? != 0.0 } else { false };
    let music = vm.pop_string()?;
    vm.audio.background_music(&music, repeat);
    Ok(())
}

fn bgmstop(vm: &mut Vm) -> Result<(), RuntimeError> {
    vm.audio.stop_music();
    Ok(())
}
