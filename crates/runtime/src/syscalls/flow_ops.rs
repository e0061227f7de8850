//! Flow control subroutines: SLEEP, YIELD, SYSTEM.

use super::Handler;
use crate::error::RuntimeError;
use crate::vm::{Vm, Waiting};
use std::collections::HashMap;

pub(super) fn register(table: &mut HashMap<&'static str, Handler>) {
    table.insert("SLEEP", sleep);
    table.insert("YIELD", yield_frame);
    table.insert("SYSTEM", system);
}

/// SLEEP [s]: suspend for a delay, or until a key press when no delay
/// is given. Test mode completes immediately.
fn sleep(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let seconds = if count > 0 { Some(vm.pop_numeric()?) } else { None };
    if !vm.program.test_mode {
        vm.suspend(Waiting::Sleep { seconds });
    }
    Ok(())
}

/// YIELD: hand one animation frame back to the host.
fn yield_frame(vm: &mut Vm) -> Result<(), RuntimeError> {
    if !vm.program.test_mode {
        vm.suspend(Waiting::Frame);
    }
    Ok(())
}

/// SYSTEM: end the program.
fn system(vm: &mut Vm) -> Result<(), RuntimeError> {
    vm.halt();
    Ok(())
}
