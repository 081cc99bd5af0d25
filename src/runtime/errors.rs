//! Runtime error types for the stack runtime
//!
//! This module defines [`RuntimeError`], which represents all errors that can occur
//! while driving a stack region (as opposed to parse errors or system errors).
//!
//! All runtime errors are fatal for a script run: execution halts and the
//! history up to the failing statement is kept for inspection.

use crate::memory::StackError;
use crate::script::ast::SourceLocation;
use std::fmt;

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Stack limits or stack pointer used before `init`
    Uninitialized { location: Option<SourceLocation> },

    /// `init` ran a second time
    AlreadyInitialized { location: Option<SourceLocation> },

    /// `init` without linker bounds
    NoLayout { location: Option<SourceLocation> },

    /// Memory size or linker bounds changed after `init`
    LayoutAfterInit { location: Option<SourceLocation> },

    /// Not enough headroom between the stack pointer and `stack_end`
    StackOverflow {
        requested: u64,
        free: u64,
        location: Option<SourceLocation>,
    },

    /// `ret` with no frame on the active stack
    NoFrame { location: Option<SourceLocation> },

    /// `restore` with nothing saved
    NoSavedPointer { location: Option<SourceLocation> },

    /// Stack pointer restored outside `[end, base]`
    InvalidStackPointer {
        address: u64,
        base: u64,
        end: u64,
        location: Option<SourceLocation>,
    },

    /// A stack region does not fit inside linear memory
    OutOfLinearMemory {
        low: u64,
        high: u64,
        memory_size: u64,
        location: Option<SourceLocation>,
    },

    /// Linear memory size is zero or too large for the pointer width
    InvalidMemorySize {
        pages: u64,
        location: Option<SourceLocation>,
    },

    /// A literal does not fit the machine's pointer width
    AddressOutOfRange {
        value: u64,
        bytes: usize,
        location: Option<SourceLocation>,
    },

    /// `switch` to a fiber that was never declared
    UnknownFiber {
        name: String,
        location: Option<SourceLocation>,
    },

    /// `fiber` reusing an existing name
    DuplicateFiber {
        name: String,
        location: Option<SourceLocation>,
    },

    /// Snapshot history limit exceeded
    SnapshotLimitExceeded { current: usize, limit: usize },

    /// History navigation and other one-off failures
    Generic {
        message: String,
        location: Option<SourceLocation>,
    },
}

impl RuntimeError {
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            RuntimeError::Uninitialized { location }
            | RuntimeError::AlreadyInitialized { location }
            | RuntimeError::NoLayout { location }
            | RuntimeError::LayoutAfterInit { location }
            | RuntimeError::StackOverflow { location, .. }
            | RuntimeError::NoFrame { location }
            | RuntimeError::NoSavedPointer { location }
            | RuntimeError::InvalidStackPointer { location, .. }
            | RuntimeError::OutOfLinearMemory { location, .. }
            | RuntimeError::InvalidMemorySize { location, .. }
            | RuntimeError::AddressOutOfRange { location, .. }
            | RuntimeError::UnknownFiber { location, .. }
            | RuntimeError::DuplicateFiber { location, .. }
            | RuntimeError::Generic { location, .. } => location.as_ref(),
            RuntimeError::SnapshotLimitExceeded { .. } => None,
        }
    }

    /// Attach a location if the error does not carry one yet
    pub fn at(mut self, loc: SourceLocation) -> Self {
        match &mut self {
            RuntimeError::Uninitialized { location }
            | RuntimeError::AlreadyInitialized { location }
            | RuntimeError::NoLayout { location }
            | RuntimeError::LayoutAfterInit { location }
            | RuntimeError::StackOverflow { location, .. }
            | RuntimeError::NoFrame { location }
            | RuntimeError::NoSavedPointer { location }
            | RuntimeError::InvalidStackPointer { location, .. }
            | RuntimeError::OutOfLinearMemory { location, .. }
            | RuntimeError::InvalidMemorySize { location, .. }
            | RuntimeError::AddressOutOfRange { location, .. }
            | RuntimeError::UnknownFiber { location, .. }
            | RuntimeError::DuplicateFiber { location, .. }
            | RuntimeError::Generic { location, .. } => {
                location.get_or_insert(loc);
            }
            RuntimeError::SnapshotLimitExceeded { .. } => {}
        }
        self
    }

    pub fn generic(message: impl Into<String>) -> Self {
        RuntimeError::Generic {
            message: message.into(),
            location: None,
        }
    }
}

impl From<StackError> for RuntimeError {
    fn from(err: StackError) -> Self {
        match err {
            StackError::Uninitialized => RuntimeError::Uninitialized { location: None },
            StackError::AlreadyInitialized => RuntimeError::AlreadyInitialized { location: None },
        }
    }
}

/// " at line N" or nothing
struct At<'a>(&'a Option<SourceLocation>);

impl fmt::Display for At<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(loc) => write!(f, " at line {}", loc.line),
            None => Ok(()),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Uninitialized { location } => {
                write!(f, "Stack used before init{}", At(location))
            }
            RuntimeError::AlreadyInitialized { location } => {
                write!(f, "Stack already initialized{}", At(location))
            }
            RuntimeError::NoLayout { location } => {
                write!(f, "init without a layout (linker bounds){}", At(location))
            }
            RuntimeError::LayoutAfterInit { location } => {
                write!(
                    f,
                    "Memory layout cannot change after init{}",
                    At(location)
                )
            }
            RuntimeError::StackOverflow {
                requested,
                free,
                location,
            } => {
                write!(
                    f,
                    "Stack overflow{}: requested {} bytes, {} free",
                    At(location),
                    requested,
                    free
                )
            }
            RuntimeError::NoFrame { location } => {
                write!(f, "No stack frame to return from{}", At(location))
            }
            RuntimeError::NoSavedPointer { location } => {
                write!(f, "No saved stack pointer to restore{}", At(location))
            }
            RuntimeError::InvalidStackPointer {
                address,
                base,
                end,
                location,
            } => {
                write!(
                    f,
                    "Invalid stack pointer 0x{:x}{}: outside [0x{:x}, 0x{:x}]",
                    address,
                    At(location),
                    end,
                    base
                )
            }
            RuntimeError::OutOfLinearMemory {
                low,
                high,
                memory_size,
                location,
            } => {
                write!(
                    f,
                    "Stack region [0x{:x}, 0x{:x}]{} does not fit in linear memory of {} bytes",
                    low,
                    high,
                    At(location),
                    memory_size
                )
            }
            RuntimeError::InvalidMemorySize { pages, location } => {
                write!(f, "Invalid linear memory size: {} pages{}", pages, At(location))
            }
            RuntimeError::AddressOutOfRange {
                value,
                bytes,
                location,
            } => {
                write!(
                    f,
                    "Value 0x{:x}{} does not fit in a {}-bit address",
                    value,
                    At(location),
                    bytes * 8
                )
            }
            RuntimeError::UnknownFiber { name, location } => {
                write!(f, "Unknown fiber '{}'{}", name, At(location))
            }
            RuntimeError::DuplicateFiber { name, location } => {
                write!(f, "Fiber '{}' already exists{}", name, At(location))
            }
            RuntimeError::SnapshotLimitExceeded { current, limit } => {
                write!(
                    f,
                    "Snapshot memory limit exceeded: {} bytes used, limit is {}",
                    current, limit
                )
            }
            RuntimeError::Generic { message, location } => {
                write!(f, "{}{}", message, At(location))
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_fills_missing_location_only() {
        let err = RuntimeError::NoFrame { location: None }.at(SourceLocation::new(3, 1));
        assert_eq!(err.location(), Some(&SourceLocation::new(3, 1)));

        let err = err.at(SourceLocation::new(9, 9));
        assert_eq!(err.location(), Some(&SourceLocation::new(3, 1)));
    }

    #[test]
    fn display_includes_line() {
        let err = RuntimeError::StackOverflow {
            requested: 64,
            free: 16,
            location: Some(SourceLocation::new(7, 1)),
        };
        assert_eq!(
            err.to_string(),
            "Stack overflow at line 7: requested 64 bytes, 16 free"
        );
    }

    #[test]
    fn stack_errors_lift() {
        let err: RuntimeError = StackError::Uninitialized.into();
        assert_eq!(err, RuntimeError::Uninitialized { location: None });
    }
}
