//! CLI Exit Code Registry
//!
//! Single source of truth for exit codes. Exit codes are part of the shell
//! contract: pipeline scripts rely on them.
//!
//! | Code | Meaning                                      |
//! |------|----------------------------------------------|
//! | 0    | Success                                      |
//! | 1    | General error (unspecified)                  |
//! | 2    | Usage error (bad args)                       |
//! | 3    | Invalid pipeline config                      |
//! | 4    | Runtime error (IO, parse, engine failure)    |
//! | 5    | Duplicate normalized keys found              |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Pipeline config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Runtime failure: unreadable input, malformed JSON, engine error.
pub const EXIT_RUNTIME: u8 = 4;

/// `check-dupes` found display names sharing a normalized key.
pub const EXIT_DUPLICATE: u8 = 5;
