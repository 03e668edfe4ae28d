//! Per-ABI sparse syscall dispatch table (spec §4.4).
//!
//! Grounded on `process_table`/`syscall_build_table` in
//! `examples/original_source/reprozip/native/syscalls.c`: a flat list of
//! `(number, name, entry?, exit?, discriminator)` tuples is converted into a
//! dense array indexed by syscall number. Built once, lazily, via
//! `once_cell::sync::Lazy` (the teacher's own global-state idiom is
//! `lazy_static!`, see `examples/isgasho-rd/src/flags.rs`), then handed out
//! by reference rather than read from a mutable process-global (spec §9).

use crate::abi::{i386, x86_64, x86_64_x32, SupportedArch};
use crate::handlers::{self, EntryHandler, ExitHandler};
use once_cell::sync::Lazy;

/// Which non-`*at` family an `*at` syscall re-dispatches to once its
/// directory-fd is confirmed to be the cwd sentinel (spec §4.3.10). Kept as
/// a semantic enum rather than a raw syscall number so the handler never
/// needs to know which ABI table it was resolved from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AtTarget {
    Open,
    Mkdir,
    Access,
    Readlink,
    Stat,
}

/// Carries the semantic sub-variant a shared handler needs to distinguish
/// its callers (spec §9, "preserve it as an enum, not a magic integer").
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Discriminator {
    None,
    OpeningOpen,
    OpeningCreat,
    OpeningAccess,
    Symlink,
    /// `symlinkat`: the directory-fd argument is at position 1, not 0.
    Symlinkat,
    ForkFork,
    ForkVfork,
    ForkClone,
    At(AtTarget),
}

#[derive(Clone)]
pub struct SyscallTableEntry {
    pub name: &'static str,
    pub entry: Option<EntryHandler>,
    pub exit: Option<ExitHandler>,
    pub discriminator: Discriminator,
}

/// Dense array indexed by syscall number for one ABI.
#[derive(Clone, Default)]
pub struct SyscallTable {
    entries: Vec<Option<SyscallTableEntry>>,
}

impl SyscallTable {
    fn from_list(list: Vec<(i64, SyscallTableEntry)>) -> SyscallTable {
        let length = list.iter().map(|(n, _)| *n as usize + 1).max().unwrap_or(0);
        let mut entries = vec![None; length];
        for (n, entry) in list {
            entries[n as usize] = Some(entry);
        }
        SyscallTable { entries }
    }

    pub fn get(&self, syscall: i64) -> Option<&SyscallTableEntry> {
        if syscall < 0 {
            return None;
        }
        self.entries.get(syscall as usize).and_then(|e| e.as_ref())
    }
}

macro_rules! entry {
    ($name:expr, $entry:expr, $exit:expr, $disc:expr) => {
        SyscallTableEntry {
            name: $name,
            entry: $entry,
            exit: $exit,
            discriminator: $disc,
        }
    };
}

fn build_i386() -> SyscallTable {
    use Discriminator::*;
    SyscallTable::from_list(vec![
        (i386::OPEN, entry!("open", None, Some(handlers::file_opening::exit), OpeningOpen)),
        (i386::CREAT, entry!("creat", None, Some(handlers::file_opening::exit), OpeningCreat)),
        (i386::ACCESS, entry!("access", None, Some(handlers::file_opening::exit), OpeningAccess)),
        (i386::STAT, entry!("stat", None, Some(handlers::filestat::exit), None)),
        (i386::LSTAT, entry!("lstat", None, Some(handlers::filestat::exit), None)),
        (i386::STAT64, entry!("stat64", None, Some(handlers::filestat::exit), None)),
        (i386::OLDSTAT, entry!("oldstat", None, Some(handlers::filestat::exit), None)),
        (i386::LSTAT64, entry!("lstat64", None, Some(handlers::filestat::exit), None)),
        (i386::OLDLSTAT, entry!("oldlstat", None, Some(handlers::filestat::exit), None)),
        (i386::READLINK, entry!("readlink", None, Some(handlers::readlink::exit), None)),
        (i386::MKDIR, entry!("mkdir", None, Some(handlers::mkdir::exit), None)),
        (i386::SYMLINK, entry!("symlink", None, Some(handlers::symlink::exit), Symlink)),
        (i386::CHDIR, entry!("chdir", None, Some(handlers::chdir::exit), None)),
        (
            i386::EXECVE,
            // `exit` is `None` here: execve's exit needs the process
            // registry and the Proc Scraper, so the dispatch engine calls
            // `handlers::execve::exit` directly instead of through this
            // table slot (spec §4.3.7; see `crate::handlers`' doc comment).
            entry!("execve", Some(handlers::execve::entry), None, None),
        ),
        // Fork/vfork/clone's `exit` needs the registry too (to allocate or
        // promote the new task), so it is likewise dispatched directly by
        // the engine rather than through this slot (spec §4.3.8).
        (i386::FORK, entry!("fork", None, None, ForkFork)),
        (i386::VFORK, entry!("vfork", None, None, ForkVfork)),
        (i386::CLONE, entry!("clone", None, None, ForkClone)),
        (i386::SOCKETCALL, entry!("socketcall", None, Some(handlers::network::socketcall_exit), None)),
        (i386::MKDIRAT, entry!("mkdirat", None, Some(handlers::at_dispatch::exit), At(AtTarget::Mkdir))),
        (i386::OPENAT, entry!("openat", None, Some(handlers::at_dispatch::exit), At(AtTarget::Open))),
        (i386::FACCESSAT, entry!("faccessat", None, Some(handlers::at_dispatch::exit), At(AtTarget::Access))),
        (i386::READLINKAT, entry!("readlinkat", None, Some(handlers::at_dispatch::exit), At(AtTarget::Readlink))),
        (i386::FSTATAT64, entry!("fstatat64", None, Some(handlers::at_dispatch::exit), At(AtTarget::Stat))),
        (i386::SYMLINKAT, entry!("symlinkat", None, Some(handlers::symlink::exit), Symlinkat)),
        (i386::RENAME, entry!("rename", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::RMDIR, entry!("rmdir", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::LINK, entry!("link", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::TRUNCATE, entry!("truncate", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::TRUNCATE64, entry!("truncate64", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::UNLINK, entry!("unlink", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::CHMOD, entry!("chmod", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::CHOWN, entry!("chown", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::CHOWN32, entry!("chown32", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::LCHOWN, entry!("lchown", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::LCHOWN32, entry!("lchown32", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::UTIME, entry!("utime", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::UTIMES, entry!("utimes", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::MQ_OPEN, entry!("mq_open", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::MQ_UNLINK, entry!("mq_unlink", None, Some(handlers::unhandled::path1_exit), None)),
        (i386::LINKAT, entry!("linkat", None, Some(handlers::unhandled::other_exit), None)),
        (i386::RENAMEAT, entry!("renameat", None, Some(handlers::unhandled::other_exit), None)),
        (i386::UNLINKAT, entry!("unlinkat", None, Some(handlers::unhandled::other_exit), None)),
        (i386::FCHMODAT, entry!("fchmodat", None, Some(handlers::unhandled::other_exit), None)),
        (i386::FCHOWNAT, entry!("fchownat", None, Some(handlers::unhandled::other_exit), None)),
        (i386::PTRACE, entry!("ptrace", None, Some(handlers::unhandled::other_exit), None)),
        (
            i386::NAME_TO_HANDLE_AT,
            entry!("name_to_handle_at", None, Some(handlers::unhandled::other_exit), None),
        ),
    ])
}

fn build_x86_64_like(execve_no: i64, ptrace_no: i64) -> SyscallTable {
    use Discriminator::*;
    SyscallTable::from_list(vec![
        (x86_64::OPEN, entry!("open", None, Some(handlers::file_opening::exit), OpeningOpen)),
        (x86_64::CREAT, entry!("creat", None, Some(handlers::file_opening::exit), OpeningCreat)),
        (x86_64::ACCESS, entry!("access", None, Some(handlers::file_opening::exit), OpeningAccess)),
        (x86_64::STAT, entry!("stat", None, Some(handlers::filestat::exit), None)),
        (x86_64::LSTAT, entry!("lstat", None, Some(handlers::filestat::exit), None)),
        (x86_64::READLINK, entry!("readlink", None, Some(handlers::readlink::exit), None)),
        (x86_64::MKDIR, entry!("mkdir", None, Some(handlers::mkdir::exit), None)),
        (x86_64::SYMLINK, entry!("symlink", None, Some(handlers::symlink::exit), Symlink)),
        (x86_64::CHDIR, entry!("chdir", None, Some(handlers::chdir::exit), None)),
        (
            execve_no,
            entry!("execve", Some(handlers::execve::entry), None, None),
        ),
        (x86_64::FORK, entry!("fork", None, None, ForkFork)),
        (x86_64::VFORK, entry!("vfork", None, None, ForkVfork)),
        (x86_64::CLONE, entry!("clone", None, None, ForkClone)),
        (x86_64::ACCEPT, entry!("accept", None, Some(handlers::network::accept_exit), None)),
        (x86_64::ACCEPT4, entry!("accept4", None, Some(handlers::network::accept_exit), None)),
        (x86_64::CONNECT, entry!("connect", None, Some(handlers::network::connect_exit), None)),
        (x86_64::MKDIRAT, entry!("mkdirat", None, Some(handlers::at_dispatch::exit), At(AtTarget::Mkdir))),
        (x86_64::OPENAT, entry!("openat", None, Some(handlers::at_dispatch::exit), At(AtTarget::Open))),
        (x86_64::FACCESSAT, entry!("faccessat", None, Some(handlers::at_dispatch::exit), At(AtTarget::Access))),
        (x86_64::READLINKAT, entry!("readlinkat", None, Some(handlers::at_dispatch::exit), At(AtTarget::Readlink))),
        (x86_64::NEWFSTATAT, entry!("newfstatat", None, Some(handlers::at_dispatch::exit), At(AtTarget::Stat))),
        (x86_64::SYMLINKAT, entry!("symlinkat", None, Some(handlers::symlink::exit), Symlinkat)),
        (x86_64::RENAME, entry!("rename", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::RMDIR, entry!("rmdir", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::LINK, entry!("link", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::TRUNCATE, entry!("truncate", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::UNLINK, entry!("unlink", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::CHMOD, entry!("chmod", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::CHOWN, entry!("chown", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::LCHOWN, entry!("lchown", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::UTIME, entry!("utime", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::UTIMES, entry!("utimes", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::MQ_OPEN, entry!("mq_open", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::MQ_UNLINK, entry!("mq_unlink", None, Some(handlers::unhandled::path1_exit), None)),
        (x86_64::LINKAT, entry!("linkat", None, Some(handlers::unhandled::other_exit), None)),
        (x86_64::RENAMEAT, entry!("renameat", None, Some(handlers::unhandled::other_exit), None)),
        (x86_64::UNLINKAT, entry!("unlinkat", None, Some(handlers::unhandled::other_exit), None)),
        (x86_64::FCHMODAT, entry!("fchmodat", None, Some(handlers::unhandled::other_exit), None)),
        (x86_64::FCHOWNAT, entry!("fchownat", None, Some(handlers::unhandled::other_exit), None)),
        (ptrace_no, entry!("ptrace", None, Some(handlers::unhandled::other_exit), None)),
        (
            x86_64::NAME_TO_HANDLE_AT,
            entry!("name_to_handle_at", None, Some(handlers::unhandled::other_exit), None),
        ),
    ])
}

static I386_TABLE: Lazy<SyscallTable> = Lazy::new(build_i386);
static X86_64_TABLE: Lazy<SyscallTable> = Lazy::new(|| build_x86_64_like(x86_64::EXECVE, x86_64::PTRACE));
static X86_64_X32_TABLE: Lazy<SyscallTable> =
    Lazy::new(|| build_x86_64_like(x86_64_x32::EXECVE, x86_64_x32::PTRACE));

/// The built-once set of ABI tables for a trace. Three tables exist on an
/// X86_64 target configuration; one on I386 (spec §4.4/§6).
pub struct SyscallTables;

impl SyscallTables {
    pub fn for_abi(abi: SupportedArch) -> &'static SyscallTable {
        match abi {
            SupportedArch::I386 => &I386_TABLE,
            SupportedArch::X86_64 => &X86_64_TABLE,
            SupportedArch::X86_64X32 => &X86_64_X32_TABLE,
        }
    }
}
