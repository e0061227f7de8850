//! READ and the allocation opcodes exposed as syscalls.

use super::Handler;
use crate::error::{ErrorCode, RuntimeError};
use crate::vm::Vm;
use basil_core::{ScalarKind, TypeDesc, VarRef, new_array_cell, new_scalar_cell};
use std::collections::HashMap;

pub(super) fn register(table: &mut HashMap<&'static str, Handler>) {
    table.insert("READ", read);
    table.insert("alloc_scalar", alloc_scalar);
    table.insert("alloc_array", alloc_array);
}

/// READ: pull `data[data_ptr++]` into each target. An empty DATA entry
/// leaves the target at its type's default.
fn read(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?.max(0) as usize;
    let mut targets = Vec::with_capacity(count);
    for _ in 0..count {
        targets.push(vm.pop_ref()?);
    }
    targets.reverse();
    for target in targets {
        match vm.next_data()? {
            Some(literal) => target.write(&literal.to_value())?,
            None => {}
        }
    }
    Ok(())
}

fn type_desc(vm: &Vm, type_name: &str) -> Result<TypeDesc, RuntimeError> {
    if let Some(kind) = ScalarKind::from_keyword(type_name) {
        return Ok(TypeDesc::Scalar(kind));
    }
    match vm.record_type(type_name) {
        Some(rt) => Ok(TypeDesc::Record(rt)),
        None => Err(RuntimeError::new(
            ErrorCode::TypeMismatch,
            format!("unknown type {}", type_name),
        )),
    }
}

/// DIM of a scalar: bind a fresh cell of the named type.
fn alloc_scalar(vm: &mut Vm) -> Result<(), RuntimeError> {
    let type_name = vm.pop_string()?;
    let name = vm.pop_string()?;
    let desc = type_desc(vm, &type_name)?;
    vm.bind(&name, VarRef::whole(new_scalar_cell(desc)));
    Ok(())
}

/// DIM of an array: bounds arrive as (lower, upper) pairs under the
/// argument count.
fn alloc_array(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?.max(2) as usize;
    let pairs = (count - 2) / 2;
    let mut dims = Vec::with_capacity(pairs);
    for _ in 0..pairs {
        let upper = vm.pop_i64()?;
        let lower = vm.pop_i64()?;
        dims.push((lower, upper));
    }
    dims.reverse();
    let type_name = vm.pop_string()?;
    let name = vm.pop_string()?;
    for &(lower, upper) in &dims {
        if lower > upper {
            return Err(RuntimeError::new(
                ErrorCode::SubscriptOutOfRange,
                format!("bad array bounds {} TO {}", lower, upper),
            ));
        }
    }
    let desc = type_desc(vm, &type_name)?;
    vm.bind(&name, VarRef::whole(new_array_cell(desc, dims)));
    Ok(())
}
