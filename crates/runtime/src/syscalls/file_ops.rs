//! File I/O subroutines: OPEN/CLOSE/WRITE#/INPUT# against the file
//! system device. Failures trap IO_ERROR.

use super::Handler;
use crate::devices::FileMode;
use crate::error::{ErrorCode, RuntimeError};
use crate::format::{display_value, parse_leading_number};
use crate::vm::Vm;
use basil_core::{ScalarKind, TypeDesc, Value};
use std::collections::HashMap;

pub(super) fn register(table: &mut HashMap<&'static str, Handler>) {
    table.insert("open", open);
    table.insert("close", close);
    table.insert("write", write);
    table.insert("input_file", input_file);
}

fn io_error(message: impl Into<String>) -> RuntimeError {
    RuntimeError::new(ErrorCode::IoError, message)
}

fn open(vm: &mut Vm) -> Result<(), RuntimeError> {
    let channel = vm.pop_i64()?;
    let tag = vm.pop_string()?;
    let path = vm.pop_string()?;
    let mode = FileMode::from_tag(&tag)
        .ok_or_else(|| io_error(format!("bad file mode {}", tag)))?;
    if vm.channels.contains_key(&channel) {
        return Err(io_error(format!("file #{} is already open", channel)));
    }
    let handle = vm
        .files
        .open(&path, mode)
        .map_err(|e| io_error(format!("cannot open {}: {}", path, e)))?;
    vm.channels.insert(channel, handle);
    Ok(())
}

fn close(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    if count > 0 {
        let channel = vm.pop_i64()?;
        match vm.channels.remove(&channel) {
            Some(handle) => vm.files.close(handle),
            None => return Err(io_error(format!("file #{} is not open", channel))),
        }
    } else {
        let handles: Vec<u32> = vm.channels.drain().map(|(_, h)| h).collect();
        for handle in handles {
            vm.files.close(handle);
        }
    }
    Ok(())
}

/// WRITE #n: comma-separated fields, strings quoted.
fn write(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?.max(1) as usize;
    let mut values = Vec::with_capacity(count - 1);
    for _ in 0..count - 1 {
        values.push(vm.pop()?);
    }
    values.reverse();
    let channel = vm.pop_i64()?;
    let handle = *vm
        .channels
        .get(&channel)
        .ok_or_else(|| io_error(format!("file #{} is not open", channel)))?;
    let mut fields = Vec::with_capacity(values.len());
    for v in &values {
        let text = display_value(v).ok_or_else(|| vm.type_error("a printable value", v))?;
        match v {
            Value::Str(_) => fields.push(format!("\"{}\"", text)),
            _ => fields.push(text),
        }
    }
    vm.files
        .write_line(handle, &fields.join(","))
        .map_err(|e| io_error(format!("write failed: {}", e)))
}

/// INPUT #n: read one line, split into comma-separated fields, assign
/// each target (missing fields keep the target's value default).
fn input_file(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?.max(1) as usize;
    let mut targets = Vec::with_capacity(count - 1);
    for _ in 0..count - 1 {
        targets.push(vm.pop_ref()?);
    }
    targets.reverse();
    let channel = vm.pop_i64()?;
    let handle = *vm
        .channels
        .get(&channel)
        .ok_or_else(|| io_error(format!("file #{} is not open", channel)))?;
    let line = vm
        .files
        .read_line(handle)
        .map_err(|e| io_error(format!("read failed: {}", e)))?
        .ok_or_else(|| io_error("input past end of file"))?;
    let fields = split_fields(&line);
    for (target, field) in targets.iter().zip(fields) {
        let value = match target.slot_type().map_err(RuntimeError::from)? {
            TypeDesc::Scalar(ScalarKind::String) => Value::Str(field),
            _ => Value::Double(parse_leading_number(&field)),
        };
        target.write(&value)?;
    }
    Ok(())
}

/// Split a WRITE-style line: commas separate fields, double quotes
/// enclose strings (and are stripped).
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields.iter().map(|f| f.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_split_on_commas_outside_quotes() {
        assert_eq!(split_fields("\"A,B\",1, 2"), vec!["A,B", "1", "2"]);
        assert_eq!(split_fields("plain"), vec!["plain"]);
    }
}
