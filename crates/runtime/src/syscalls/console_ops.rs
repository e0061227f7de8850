//! Console subroutines: screen control, the print family, INPUT, SWAP.

use super::Handler;
use crate::devices::Request;
use crate::error::{ErrorCode, RuntimeError};
use crate::format::{display_value, format_using};
use crate::vm::{Vm, Waiting};
use basil_core::Value;
use std::collections::HashMap;

/// Column width of the `,` print zones.
const TAB_STOP: usize = 14;

pub(super) fn register(table: &mut HashMap<&'static str, Handler>) {
    table.insert("CLS", cls);
    table.insert("LOCATE", locate);
    table.insert("COLOR", color);
    table.insert("SCREEN", screen);
    table.insert("WIDTH", width);
    table.insert("BEEP", beep);
    table.insert("SWAP", swap);
    table.insert("INPUT", input);
    table.insert("print", print);
    table.insert("print_comma", print_comma);
    table.insert("print_tab", print_tab);
    table.insert("print_using", print_using);
}

fn cls(vm: &mut Vm) -> Result<(), RuntimeError> {
    vm.console.cls();
    Ok(())
}

fn locate(vm: &mut Vm) -> Result<(), RuntimeError> {
    let col = vm.pop_i64()?;
    let row = vm.pop_i64()?;
    vm.console.locate(row, col);
    Ok(())
}

fn color(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let border = if count > 2 { Some(vm.pop_i64()?) } else { None };
    let bg = if count > 1 { Some(vm.pop_i64()?) } else { None };
    let fg = vm.pop_i64()?;
    vm.console.color(fg, bg, border);
    Ok(())
}

fn screen(vm: &mut Vm) -> Result<(), RuntimeError> {
    let mode = vm.pop_i64()?;
    vm.console.screen(mode);
    Ok(())
}

fn width(vm: &mut Vm) -> Result<(), RuntimeError> {
    let height = vm.pop_i64()?;
    let w = vm.pop_i64()?;
    vm.console.width(w, height);
    Ok(())
}

fn beep(vm: &mut Vm) -> Result<(), RuntimeError> {
    vm.console.beep();
    Ok(())
}

fn swap(vm: &mut Vm) -> Result<(), RuntimeError> {
    let b = vm.pop_ref()?;
    let a = vm.pop_ref()?;
    let value_a = a.read()?;
    let value_b = b.read()?;
    a.write(&value_b)?;
    b.write(&value_a)?;
    Ok(())
}

/// INPUT: read a line from the console into the target. When the host
/// cannot complete immediately the VM suspends until `provide_input`.
fn input(vm: &mut Vm) -> Result<(), RuntimeError> {
    let target = vm.pop_ref()?;
    match vm.console.input() {
        Request::Ready(line) => vm.assign_input(&target, &line),
        Request::Pending => {
            vm.suspend(Waiting::Input { target });
            Ok(())
        }
    }
}

fn print(vm: &mut Vm) -> Result<(), RuntimeError> {
    let v = vm.pop()?;
    let text = display_value(&v).ok_or_else(|| vm.type_error("a printable value", &v))?;
    vm.console.print(&text);
    Ok(())
}

/// `,` separator: advance to the next print zone.
fn print_comma(vm: &mut Vm) -> Result<(), RuntimeError> {
    let column = vm.console.cursor_column();
    let pad = TAB_STOP - column % TAB_STOP;
    vm.console.print(&" ".repeat(pad));
    Ok(())
}

/// TAB(n): move to 1-based column n, wrapping when already past it.
fn print_tab(vm: &mut Vm) -> Result<(), RuntimeError> {
    let target = (vm.pop_i64()?.max(1) - 1) as usize;
    let column = vm.console.cursor_column();
    if column > target {
        vm.console.print("\n");
    }
    let column = vm.console.cursor_column();
    if column < target {
        vm.console.print(&" ".repeat(target - column));
    }
    Ok(())
}

/// PRINT USING: format string, the values, then the terminator selecting
/// the end behaviour (`,` zone pad, `;` no newline, otherwise newline).
fn print_using(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let terminator = vm.pop_string()?;
    let nvalues = (count - 2).max(0) as usize;
    let mut values: Vec<Value> = Vec::with_capacity(nvalues);
    for _ in 0..nvalues {
        values.push(vm.pop()?);
    }
    values.reverse();
    let format = vm.pop_string()?;
    let text = format_using(&format, &values)
        .map_err(|msg| RuntimeError::new(ErrorCode::TypeMismatch, msg))?;
    vm.console.print(&text);
    match terminator.as_str() {
        "," => print_comma(vm)?,
        ";" => {}
        _ => vm.console.print("\n"),
    }
    Ok(())
}
