//! `open`, `creat`, `access` (spec §4.3.1).
//!
//! Grounded on `syscall_fileopening` in
//! `examples/original_source/reprozip/native/syscalls.c`.

use super::{is_dir, resolve_path_arg};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::log;
use crate::log::LogLevel::LogDebug;
use crate::memory::TraceeMemory;
use crate::sink::{EventSink, FileMode};
use crate::syscall_table::Discriminator;
use crate::task::Task;

fn mode_from_flags(flags: u32) -> FileMode {
    let mut mode = FileMode::empty();
    let accmode = flags & libc::O_ACCMODE as u32;
    if accmode == libc::O_RDONLY as u32 || accmode == libc::O_RDWR as u32 {
        mode |= FileMode::FILE_READ;
    }
    if accmode == libc::O_WRONLY as u32
        || accmode == libc::O_RDWR as u32
        || flags & libc::O_CREAT as u32 != 0
        || flags & libc::O_TRUNC as u32 != 0
    {
        mode |= FileMode::FILE_WRITE;
    }
    mode
}

pub fn exit(
    task: &mut Task,
    mem: &dyn TraceeMemory,
    sink: &mut dyn EventSink,
    config: &Config,
    disc: Discriminator,
) -> Result<()> {
    if !task.args.succeeded() {
        return Ok(());
    }
    let path = resolve_path_arg(task, mem, 0)?;
    let mode = match disc {
        Discriminator::OpeningOpen => mode_from_flags(task.args.arg(1).as_u32()),
        Discriminator::OpeningCreat => {
            mode_from_flags(libc::O_CREAT as u32 | libc::O_WRONLY as u32 | libc::O_TRUNC as u32)
        }
        Discriminator::OpeningAccess => FileMode::FILE_STAT,
        other => {
            return Err(Error::Invariant(format!(
                "file_opening::exit called with unexpected discriminator {:?}",
                other
            )))
        }
    };
    let dir = is_dir(&path);
    log!(config.verbosity, LogDebug, task.tid, "open-family: {} mode={:?} is_dir={}", path, mode, dir);
    let id = task
        .identifier
        .ok_or_else(|| Error::Invariant(format!("task {} has no event identifier", task.tid)))?;
    sink.add_file_open(id, &path, mode, dir).map_err(Error::Sink)
}
