//! `stat`/`lstat`/`stat64`/`oldstat`/`lstat64`/`oldlstat`/`newfstatat` family
//! (spec §4.3.2). Grounded on `syscall_filestat` in
//! `examples/original_source/reprozip/native/syscalls.c`.

use super::{is_dir, resolve_path_arg};
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
    let dir = is_dir(&path);
    let id = task
        .identifier
        .ok_or_else(|| Error::Invariant(format!("task {} has no event identifier", task.tid)))?;
    sink.add_file_open(id, &path, FileMode::FILE_STAT, dir)
        .map_err(Error::Sink)
}
