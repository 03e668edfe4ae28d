//! Snapshot of a stopped tracee's six syscall-argument registers, each
//! exposing both integer and pointer interpretations (spec §3 `params`).
//!
//! Grounded on the teacher's own per-arch register accessor pattern
//! (`rd_get_reg!`/`rd_get_reg_signed!` macros over an arch-tagged union),
//! simplified here to a fixed six-slot argument vector instead of a full
//! register file, since the dispatch engine only ever needs the six syscall
//! arguments plus the return value.

pub const NUM_SYSCALL_ARGS: usize = 6;

/// One syscall-argument register, readable as an unsigned word, a signed
/// word, or a remote pointer (which are all the same bits; only the
/// interpretation differs, as in the C `union { long i; unsigned long u;
/// void *p; }` this mirrors).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RegVal(pub u64);

impl RegVal {
    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }

    pub fn as_u32(self) -> u32 {
        self.0 as u32
    }

    /// The register reinterpreted as a remote address.
    pub fn as_ptr(self) -> u64 {
        self.0
    }
}

impl From<u64> for RegVal {
    fn from(v: u64) -> RegVal {
        RegVal(v)
    }
}

impl From<i64> for RegVal {
    fn from(v: i64) -> RegVal {
        RegVal(v as u64)
    }
}

/// The six syscall-argument registers captured at a syscall-entry stop,
/// plus the syscall's return value (meaningful only on exit).
#[derive(Copy, Clone, Debug, Default)]
pub struct SyscallArgs {
    params: [RegVal; NUM_SYSCALL_ARGS],
    pub retvalue: i64,
}

impl SyscallArgs {
    pub fn new(params: [RegVal; NUM_SYSCALL_ARGS]) -> SyscallArgs {
        SyscallArgs {
            params,
            retvalue: 0,
        }
    }

    pub fn arg(&self, i: usize) -> RegVal {
        self.params[i]
    }

    pub fn set_arg(&mut self, i: usize, v: RegVal) {
        self.params[i] = v;
    }

    /// A read-only view with the arguments shifted left by one (argument 0
    /// dropped, argument `i+1` becomes argument `i`), used by the `*at`
    /// dispatcher (spec §4.3.10) to re-present e.g. `openat(dirfd, path,
    /// flags, mode)` as `open(path, flags, mode)` without mutating the
    /// task's canonical register snapshot (spec §9, "Argument-shift").
    pub fn shifted_left_by_one(&self) -> SyscallArgs {
        let mut params = [RegVal::default(); NUM_SYSCALL_ARGS];
        for i in 0..NUM_SYSCALL_ARGS - 1 {
            params[i] = self.params[i + 1];
        }
        SyscallArgs {
            params,
            retvalue: self.retvalue,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.retvalue >= 0
    }
}
