//! The two catch-all loggers (spec §4.3.11). Grounded on
//! `syscall_unhandled_path1`/`syscall_unhandled_other` in
//! `examples/original_source/reprozip/native/syscalls.c`. Neither emits a
//! structured event; both only warn.

use super::resolve_path_arg;
use crate::config::Config;
use crate::error::Result;
use crate::log;
use crate::log::LogLevel::LogWarn;
use crate::memory::TraceeMemory;
use crate::sink::EventSink;
use crate::syscall_table::Discriminator;
use crate::task::Task;

pub fn path1_exit(
    task: &mut Task,
    mem: &dyn TraceeMemory,
    _sink: &mut dyn EventSink,
    config: &Config,
    _disc: Discriminator,
) -> Result<()> {
    if !task.args.succeeded() {
        return Ok(());
    }
    let path = resolve_path_arg(task, mem, 0)?;
    log!(config.verbosity, LogWarn, task.tid, "unhandled syscall {}: {}", task.current_syscall, path);
    Ok(())
}

pub fn other_exit(
    task: &mut Task,
    _mem: &dyn TraceeMemory,
    _sink: &mut dyn EventSink,
    config: &Config,
    _disc: Discriminator,
) -> Result<()> {
    if !task.args.succeeded() {
        return Ok(());
    }
    log!(config.verbosity, LogWarn, task.tid, "unhandled syscall {}", task.current_syscall);
    Ok(())
}
