//! Sprite subroutines, delegating to the console surface.

use super::Handler;
use crate::devices::Request;
use crate::error::RuntimeError;
use crate::vm::{Vm, Waiting};
use std::collections::HashMap;

pub(super) fn register(table: &mut HashMap<&'static str, Handler>) {
    table.insert("SPSET", spset);
    table.insert("SPOFS", spofs);
    table.insert("SPSCALE", spscale);
    table.insert("SPROT", sprot);
    table.insert("SPHOME", sphome);
    table.insert("SPHIDE", sphide);
    table.insert("SPSHOW", spshow);
    table.insert("SPANIM", spanim);
    table.insert("SPCLR", spclr);
}

/// SPSET n, img[, frames]: create a sprite; suspends while the host
/// loads the image asset.
fn spset(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let frames = if count > 2 { vm.pop_i64()? } else { 1 };
    let image = vm.pop_i64()?;
    let n = vm.pop_i64()?;
    match vm.console.create_sprite(n, image, frames) {
        Request::Ready(()) => Ok(()),
        Request::Pending => {
            vm.suspend(Waiting::Sprite);
            Ok(())
        }
    }
}

fn spofs(vm: &mut Vm) -> Result<(), RuntimeError> {
    let y = vm.pop_numeric()?;
    let x = vm.pop_numeric()?;
    let n = vm.pop_i64()?;
    vm.console.offset_sprite(n, x, y);
    Ok(())
}

fn spscale(vm: &mut Vm) -> Result<(), RuntimeError> {
    let sy = vm.pop_numeric()?;
    let sx = vm.pop_numeric()?;
    let n = vm.pop_i64()?;
    vm.console.scale_sprite(n, sx, sy);
    Ok(())
}

fn sprot(vm: &mut Vm) -> Result<(), RuntimeError> {
    let angle = vm.pop_numeric()?;
    let n = vm.pop_i64()?;
    vm.console.rotate_sprite(n, angle);
    Ok(())
}

fn sphome(vm: &mut Vm) -> Result<(), RuntimeError> {
    let hy = vm.pop_numeric()?;
    let hx = vm.pop_numeric()?;
    let n = vm.pop_i64()?;
    vm.console.home_sprite(n, hx, hy);
    Ok(())
}

fn sphide(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_i64()?;
    vm.console.display_sprite(n, false);
    Ok(())
}

fn spshow(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_i64()?;
    vm.console.display_sprite(n, true);
    Ok(())
}

/// SPANIM n, from, to[, loop].
fn spanim(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let loop_anim = if count > 3 { vm.pop_numeric()? != 0.0 } else { false };
    let to = vm.pop_i64()?;
    let from = vm.pop_i64()?;
    let n = vm.pop_i64()?;
    vm.console.animate_sprite(n, from, to, loop_anim);
    Ok(())
}

fn spclr(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_i64()?;
    vm.console.clear_sprite(n);
    Ok(())
}
