//! `readlink`/`readlinkat` (spec §4.3.3). Grounded on `syscall_readlink` in
//! `examples/original_source/reprozip/native/syscalls.c`.

use super::resolve_path_arg;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::memory::TraceeMemory;
use crate::sink::{EventSink, FileMode};
use crate::syscall_table::Discriminator;
use crate::task::Task;

pub fn exit(
    task: &mut Task,
    mem: &dyn TraceeMemory,
    sink: &mut dyn EventSink,
    _config: &Config,
    _disc: Discriminator,
) -> Result<()> {
    if !task.args.succeeded() {
        return Ok(());
    }
    let path = resolve_path_arg(task, mem, 0)?;
    let id = task
        .identifier
        .ok_or_else(|| Error::Invariant(format!("task {} has no event identifier", task.tid)))?;
    sink.add_file_open(id, &path, FileMode::FILE_STAT, false)
        .map_err(Error::Sink)
}
