//! Typed failure of a pipeline phase, carrying the exit code to propagate.

use crate::pipeline::Phase;

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("{phase} phase failed with exit code {code}")]
    Failed { phase: Phase, code: i32 },

    #[error("{phase} phase could not start `{program}`: {source}")]
    Spawn {
        phase: Phase,
        program: String,
        #[source]
        source: io::Error,
    },
}

impl PhaseError {
    pub fn phase(&self) -> Phase {
        match self {
            PhaseError::Failed { phase, .. } | PhaseError::Spawn { phase, .. } => *phase,
        }
    }

    /// Process exit code for this failure, following shell conventions:
    /// the tool's own code, 127 for a missing program, 126 for one that cannot run.
    pub fn exit_code(&self) -> u8 {
        match self {
            PhaseError::Failed { code, .. } => match u8::try_from(*code) {
                Ok(0) | Err(_) => 1,
                Ok(code) => code,
            },
            PhaseError::Spawn { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => 127,
                io::ErrorKind::PermissionDenied => 126,
                _ => 1,
            },
        }
    }
}

/// Exit code of a finished child; signals map to 128 + signal number on Unix
pub fn status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
