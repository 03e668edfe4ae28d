//! One module per semantic syscall family (spec §4.3). Every handler here
//! shares a reduced signature — task, tracee memory, event sink, config,
//! discriminator — and never touches the process registry; `execve` and
//! the forking family need registry access to find siblings and to
//! register new tasks, so the dispatch engine (`crate::dispatch`) calls
//! those two directly instead of through the generic table slot.

pub mod at_dispatch;
pub mod chdir;
pub mod execve;
pub mod file_opening;
pub mod filestat;
pub mod forking;
pub mod mkdir;
pub mod network;
pub mod readlink;
pub mod symlink;
pub mod unhandled;

use crate::config::Config;
use crate::error::Result;
use crate::memory::TraceeMemory;
use crate::sink::EventSink;
use crate::syscall_table::Discriminator;
use crate::task::Task;

/// Entry-handler signature: runs on syscall entry, may only populate
/// `task.syscall_info` (spec §4.3 shared conventions).
pub type EntryHandler = fn(&mut Task, &dyn TraceeMemory, &Config) -> Result<()>;

/// Exit-handler signature for every handler family except `execve` and
/// forking, which additionally need the process registry.
pub type ExitHandler =
    fn(&mut Task, &dyn TraceeMemory, &mut dyn EventSink, &Config, Discriminator) -> Result<()>;

/// Resolves `task`'s argument `index` as a tracee path, joined against
/// `task.wd` (spec §4.2). Shared by every handler that logs a path.
pub(crate) fn resolve_path_arg(
    task: &Task,
    mem: &dyn TraceeMemory,
    index: usize,
) -> Result<String> {
    let raw = crate::memory::read_cstring(mem, task.tid, task.args.arg(index).as_ptr())?;
    Ok(crate::path::resolve_path(&task.wd, &raw))
}

/// Best-effort directory check on the *tracer's* view of the filesystem.
/// Never fails the trace: a path that no longer exists by the time the
/// handler runs is reported as "not a directory" (spec §4.3.1).
pub(crate) fn is_dir(path: &str) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}
