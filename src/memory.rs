//! Reads bytes, words, pointers, NUL-terminated strings, and NUL-terminated
//! pointer arrays out of a stopped tracee (spec §4.1).
//!
//! Grounded on `nix::sys::ptrace`'s `PTRACE_PEEKDATA` wrapper (see
//! `examples/other_examples/79a5ad22_mbyzhang-nix__src-sys-ptrace-linux.rs.rs`)
//! word-at-a-time read, behind a small trait so the rest of the crate (and
//! its tests) never depend on a real tracee being attached.

use crate::abi::Mode;
use crate::error::{Error, Result};
use libc::pid_t;
use nix::errno::Errno;
use nix::sys::ptrace;
use nix::unistd::Pid;
use std::mem::size_of;

/// Abstraction over "read bytes out of task `tid`'s address space starting
/// at `addr`". The production implementation is `PtraceMemory`; tests
/// substitute a canned fixture.
pub trait TraceeMemory {
    fn read_bytes(&self, tid: pid_t, addr: u64, len: usize) -> Result<Vec<u8>>;
}

/// Reads tracee memory with `PTRACE_PEEKDATA`, one machine word at a time.
/// Slow but simple and dependency-free; the original implementation this
/// spec is distilled from does the same (`tracee_read`/`PTRACE_PEEKDATA`).
pub struct PtraceMemory;

impl TraceeMemory for PtraceMemory {
    fn read_bytes(&self, tid: pid_t, addr: u64, len: usize) -> Result<Vec<u8>> {
        let pid = Pid::from_raw(tid);
        let word_size = size_of::<libc::c_long>();
        let mut out = Vec::with_capacity(len);
        let mut cur = addr;
        while out.len() < len {
            let word = ptrace::read(pid, cur as ptrace::AddressType).map_err(|e| {
                map_peek_errno(tid, e)
            })?;
            let bytes = word.to_ne_bytes();
            let take = (len - out.len()).min(word_size);
            out.extend_from_slice(&bytes[..take]);
            cur += word_size as u64;
        }
        Ok(out)
    }
}

fn map_peek_errno(tid: pid_t, e: nix::Error) -> Error {
    match e {
        nix::Error::Sys(Errno::ESRCH) | nix::Error::Sys(Errno::EFAULT) | nix::Error::Sys(Errno::EIO) => {
            Error::TraceeVanished { tid }
        }
        other => Error::Invariant(format!("ptrace peek failed for tid {}: {}", tid, other)),
    }
}

/// Reads bytes until (and excluding) a NUL byte.
pub fn read_cstring(mem: &dyn TraceeMemory, tid: pid_t, addr: u64) -> Result<String> {
    const CHUNK: usize = 64;
    let mut buf = Vec::new();
    let mut cur = addr;
    loop {
        let chunk = mem.read_bytes(tid, cur, CHUNK)?;
        if let Some(pos) = chunk.iter().position(|&b| b == 0) {
            buf.extend_from_slice(&chunk[..pos]);
            break;
        }
        buf.extend_from_slice(&chunk);
        cur += CHUNK as u64;
        if buf.len() > 1 << 20 {
            return Err(Error::Invariant(format!(
                "tracee {} string at {:#x} exceeded 1 MiB without a NUL",
                tid, addr
            )));
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Reads a single word, zero-extended to 64 bits (4 bytes on I386, 8 on
/// X86_64).
pub fn read_word(mem: &dyn TraceeMemory, mode: Mode, tid: pid_t, addr: u64) -> Result<u64> {
    let bytes = mem.read_bytes(tid, addr, mode.word_size())?;
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(&bytes);
    Ok(u64::from_le_bytes(buf))
}

/// Reads a single pointer-sized value; same representation as `read_word`.
pub fn read_ptr(mem: &dyn TraceeMemory, mode: Mode, tid: pid_t, addr: u64) -> Result<u64> {
    read_word(mem, mode, tid, addr)
}

/// Reads a NUL-terminated array of word-sized pointers, dereferencing each
/// to a C string, stopping at the first null pointer (spec §4.1; used for
/// execve's argv/envp).
pub fn read_strarray(
    mem: &dyn TraceeMemory,
    mode: Mode,
    tid: pid_t,
    addr: u64,
) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut cur = addr;
    loop {
        let ptr = read_ptr(mem, mode, tid, cur)?;
        if ptr == 0 {
            break;
        }
        out.push(read_cstring(mem, tid, ptr)?);
        cur += mode.word_size() as u64;
    }
    Ok(out)
}
