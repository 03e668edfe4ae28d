//! Build/run-time configuration, handed by reference into the dispatch
//! engine rather than read from a process-global (spec §9, "Global
//! syscall-tables singleton").

use std::env;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TargetArch {
    /// Single ABI table (I386).
    I386,
    /// Three ABI tables (I386, X86_64, X86_64_x32).
    X86_64,
}

impl TargetArch {
    fn native() -> TargetArch {
        if cfg!(target_arch = "x86_64") {
            TargetArch::X86_64
        } else {
            TargetArch::I386
        }
    }

    fn from_env_str(s: &str) -> Option<TargetArch> {
        match s {
            "i386" | "I386" | "x86" | "X86" => Some(TargetArch::I386),
            "x86_64" | "X86_64" | "x86-64" => Some(TargetArch::X86_64),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub arch: TargetArch,
    /// 0-4, see spec §7.
    pub verbosity: u8,
    /// If false (default) envp values are never logged, only their count.
    pub log_secrets: bool,
}

impl Config {
    pub fn from_env() -> Config {
        let arch = env::var("PTRACE_TRACER_ARCH")
            .ok()
            .and_then(|s| TargetArch::from_env_str(&s))
            .unwrap_or_else(TargetArch::native);
        let verbosity = env::var("PTRACE_TRACER_VERBOSITY")
            .ok()
            .and_then(|s| s.parse::<u8>().ok())
            .unwrap_or(0);
        Config {
            arch,
            verbosity,
            log_secrets: false,
        }
    }

    pub fn new(arch: TargetArch, verbosity: u8) -> Config {
        Config {
            arch,
            verbosity,
            log_secrets: false,
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new(TargetArch::native(), 0)
    }
}
