//! `openat`/`mkdirat`/`faccessat`/`readlinkat`/`newfstatat` when the
//! directory-fd argument is the cwd sentinel (spec §4.3.10). Grounded on
//! `syscall_xxx_at` in
//! `examples/original_source/reprozip/native/syscalls.c`, which shifts the
//! shared argument array in place and restores it; this crate instead
//! dispatches against a throwaway clone of the task with a shifted argument
//! view, so the inner handler never observes (or can corrupt) the
//! original task's canonical register snapshot (spec §9, "Argument-shift").

use super::{file_opening, filestat, mkdir, readlink};
use crate::abi::AT_FDCWD;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::log;
use crate::log::LogLevel::LogWarn;
use crate::memory::TraceeMemory;
use crate::sink::EventSink;
use crate::syscall_table::{AtTarget, Discriminator};
use crate::task::Task;

pub fn exit(
    task: &mut Task,
    mem: &dyn TraceeMemory,
    sink: &mut dyn EventSink,
    config: &Config,
    disc: Discriminator,
) -> Result<()> {
    let target = match disc {
        Discriminator::At(t) => t,
        other => {
            return Err(Error::Invariant(format!(
                "at_dispatch::exit called with unexpected discriminator {:?}",
                other
            )))
        }
    };
    let dirfd = task.args.arg(0).as_i64();
    if dirfd != AT_FDCWD {
        log!(
            config.verbosity,
            LogWarn,
            task.tid,
            "*at syscall with non-cwd dirfd {}, not resolved",
            dirfd
        );
        return Ok(());
    }
    let mut shadow = task.clone();
    shadow.args = task.args.shifted_left_by_one();
    let result = match target {
        AtTarget::Open => file_opening::exit(&mut shadow, mem, sink, config, Discriminator::OpeningOpen),
        AtTarget::Access => file_opening::exit(&mut shadow, mem, sink, config, Discriminator::OpeningAccess),
        AtTarget::Mkdir => mkdir::exit(&mut shadow, mem, sink, config, Discriminator::None),
        AtTarget::Readlink => readlink::exit(&mut shadow, mem, sink, config, Discriminator::None),
        AtTarget::Stat => filestat::exit(&mut shadow, mem, sink, config, Discriminator::None),
    };
    task.wd = shadow.wd;
    result
}
