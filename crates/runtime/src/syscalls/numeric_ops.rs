//! Numeric system functions.

use super::Handler;
use crate::error::RuntimeError;
use crate::format::parse_leading_number;
use crate::vm::Vm;
use basil_core::Value;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

pub(super) fn register(table: &mut HashMap<&'static str, Handler>) {
    table.insert("RND", rnd);
    table.insert("INT", int);
    table.insert("VAL", val);
    table.insert("TIMER", timer);
    table.insert("PEEK", peek);
    table.insert("RANDOMIZE", randomize);
}

/// RND: next pseudo-random SINGLE in [0, 1). An argument of 0 repeats
/// the last value; a negative argument reseeds the sequence.
fn rnd(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let arg = if count > 0 { Some(vm.pop_numeric()?) } else { None };
    match arg {
        Some(n) if n == 0.0 => {}
        Some(n) if n < 0.0 => {
            vm.rng = rand::rngs::StdRng::seed_from_u64(n.to_bits());
            vm.last_random = vm.rng.r#gen();
        }
        _ => vm.last_random = vm.rng.r#gen(),
    }
    vm.push(Value::Single(vm.last_random as f32))
}

fn int(vm: &mut Vm) -> Result<(), RuntimeError> {
    let x = vm.pop_numeric()?;
    vm.push(Value::Long(x.floor() as i64))
}

fn val(vm: &mut Vm) -> Result<(), RuntimeError> {
    let s = vm.pop_string()?;
    vm.push(Value::Double(parse_leading_number(&s)))
}

/// Seconds since midnight. Test mode substitutes a deterministic clock
/// that advances a frame per call.
fn timer(vm: &mut Vm) -> Result<(), RuntimeError> {
    let seconds = if vm.program.test_mode {
        vm.test_timer += 0.05;
        vm.test_timer
    } else {
        use std::time::{SystemTime, UNIX_EPOCH};
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        now % 86_400.0
    };
    vm.push(Value::Double(seconds))
}

/// PEEK always answers 0. The dialect keeps the routine for
/// compatibility with programs that probe memory.
fn peek(vm: &mut Vm) -> Result<(), RuntimeError> {
    let _addr = vm.pop_numeric()?;
    vm.push(Value::Integer(0))
}

/// RANDOMIZE parses and discards its argument.
fn randomize(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    if count > 0 {
        let _seed = vm.pop_numeric()?;
    }
    Ok(())
}
