//! Exit codes for the muster binaries.
//!
//! Both `muster` and `muster-runner` map their terminal error to one of
//! these codes so scripts can branch on the failure class.

/// Command completed successfully.
pub const SUCCESS: i32 = 0;

/// Invalid arguments, malformed identifiers, or invalid input.
pub const USER_ERROR: i32 = 1;

/// A requested execution, agent config, runtime kind, or executable
/// does not exist.
pub const NOT_FOUND: i32 = 2;

/// The agent subprocess failed or its event stream was malformed.
pub const RUNTIME_FAILURE: i32 = 3;

/// Filesystem or process I/O failure.
pub const IO_FAILURE: i32 = 4;

/// The operation was cancelled before completion.
pub const CANCELLED: i32 = 5;
