//! `symlink`/`symlinkat` (spec §4.3.5). Grounded on `syscall_symlink` in
//! `examples/original_source/reprozip/native/syscalls.c`. Note the path
//! recorded is the *link* path (`symlink`'s 2nd argument, `symlinkat`'s
//! 3rd), not the target the link points at.

use super::resolve_path_arg;
use crate::abi::AT_FDCWD;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::log;
use crate::log::LogLevel::LogWarn;
use crate::memory::TraceeMemory;
use crate::sink::{EventSink, FileMode};
use crate::syscall_table::Discriminator;
use crate::task::Task;

pub fn exit(
    task: &mut Task,
    mem: &dyn TraceeMemory,
    sink: &mut dyn EventSink,
    config: &Config,
    disc: Discriminator,
) -> Result<()> {
    let (dirfd_arg, path_arg) = match disc {
        Discriminator::Symlink => (None, 1),
        Discriminator::Symlinkat => (Some(1), 2),
        other => {
            return Err(Error::Invariant(format!(
                "symlink::exit called with unexpected discriminator {:?}",
                other
            )))
        }
    };
    if let Some(i) = dirfd_arg {
        if task.args.arg(i).as_i64() != AT_FDCWD {
            log!(
                config.verbosity,
                LogWarn,
                task.tid,
                "symlinkat with non-cwd dirfd {}, not resolved",
                task.args.arg(i).as_i64()
            );
            return Ok(());
        }
    }
    if !task.args.succeeded() {
        return Ok(());
    }
    let path = resolve_path_arg(task, mem, path_arg)?;
    let id = task
        .identifier
        .ok_or_else(|| Error::Invariant(format!("task {} has no event identifier", task.tid)))?;
    sink.add_file_open(id, &path, FileMode::FILE_WRITE, true)
        .map_err(Error::Sink)
}
