//! String system functions.

use super::Handler;
use crate::error::RuntimeError;
use crate::format::display_value;
use crate::vm::Vm;
use basil_core::Value;
use std::collections::HashMap;

pub(super) fn register(table: &mut HashMap<&'static str, Handler>) {
    table.insert("CHR$", chr);
    table.insert("STR$", str_fn);
    table.insert("SPACE$", space);
    table.insert("LEN", len);
    table.insert("LEFT$", left);
    table.insert("RIGHT$", right);
    table.insert("MID$", mid);
    table.insert("LCASE$", lcase);
    table.insert("UCASE$", ucase);
    table.insert("INKEY$", inkey);
}

fn chr(vm: &mut Vm) -> Result<(), RuntimeError> {
    let code = vm.pop_i64()?;
    let s = match u32::try_from(code).ok().and_then(char::from_u32) {
        Some(c) => c.to_string(),
        None => String::new(),
    };
    vm.push(Value::Str(s))
}

fn str_fn(vm: &mut Vm) -> Result<(), RuntimeError> {
    let v = vm.pop()?;
    if !v.is_numeric() {
        return Err(vm.type_error("a number", &v));
    }
    vm.push(Value::Str(display_value(&v).unwrap_or_default()))
}

fn space(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_i64()?.max(0) as usize;
    vm.push(Value::Str(" ".repeat(n)))
}

fn len(vm: &mut Vm) -> Result<(), RuntimeError> {
    let s = vm.pop_string()?;
    vm.push(Value::Integer(s.chars().count() as i32))
}

fn left(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_i64()?.max(0) as usize;
    let s = vm.pop_string()?;
    vm.push(Value::Str(s.chars().take(n).collect()))
}

fn right(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_i64()?.max(0) as usize;
    let s = vm.pop_string()?;
    let total = s.chars().count();
    vm.push(Value::Str(s.chars().skip(total.saturating_sub(n)).collect()))
}

/// MID$(s, start[, length]): start is 1-based; without a length the
/// rest of the string is taken.
fn mid(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let length = if count > 2 { Some(vm.pop_i64()?.max(0) as usize) } else { None };
    let start = vm.pop_i64()?.max(1) as usize - 1;
    let s = vm.pop_string()?;
    let rest = s.chars().skip(start);
    let out: String = match length {
        Some(len) => rest.take(len).collect(),
        None => rest.collect(),
    };
    vm.push(Value::Str(out))
}

fn lcase(vm: &mut Vm) -> Result<(), RuntimeError> {
    let s = vm.pop_string()?;
    vm.push(Value::Str(s.to_lowercase()))
}

fn ucase(vm: &mut Vm) -> Result<(), RuntimeError> {
    let s = vm.pop_string()?;
    vm.push(Value::Str(s.to_uppercase()))
}

/// INKEY$: non-blocking key read. An empty string means no key; a key
/// code of 0 introduces an escape sequence whose scan code follows.
fn inkey(vm: &mut Vm) -> Result<(), RuntimeError> {
    let key = vm.console.get_key_from_buffer();
    let s = match key {
        -1 => String::new(),
        0 => {
            let scan = vm.console.get_key_from_buffer().max(0);
            let mut s = String::from('\0');
            if let Some(c) = u32::try_from(scan).ok().and_then(char::from_u32) {
                s.push(c);
            }
            s
        }
        code => u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default(),
    };
    vm.push(Value::Str(s))
}
