//! Exit codes following sysexits.h conventions.
//!
//! These codes let scripts tell a tampered image apart from an unreadable
//! one without parsing output.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments, bad profile).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (tampered image, no payload found).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open or decode an input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify error by inspecting the chain; profile problems are usage
        // errors even when the profile file cannot be read.
        let code = if message.contains("Failed to read profile") {
            USAGE_ERROR
        } else if message.contains("Failed to read")
            || message.contains("Failed to decode")
        {
            INPUT_ERROR
        } else if message.contains("TAMPERED") || message.contains("No identity payload") {
            DATA_ERROR
        } else if message.contains("Invalid argument") || message.contains("Invalid profile") {
            USAGE_ERROR
        } else if message.contains("Failed to write") || message.contains("serialize") {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let cases = [
            (anyhow::anyhow!("Failed to read file: a.png"), INPUT_ERROR),
            (anyhow::anyhow!("TAMPERED: 3 findings"), DATA_ERROR),
            (anyhow::anyhow!("No identity payload found in a.png"), DATA_ERROR),
            (anyhow::anyhow!("Invalid argument: --gps"), USAGE_ERROR),
            (anyhow::anyhow!("Failed to read profile: p.json"), USAGE_ERROR),
            (anyhow::anyhow!("Invalid profile: p.json"), USAGE_ERROR),
            (anyhow::anyhow!("Failed to write record"), IO_ERROR),
            (anyhow::anyhow!("something else"), GENERAL_ERROR),
        ];
        for (err, code) in cases {
            assert_eq!(ExitCode::from_anyhow(&err).code, code, "{err}");
        }
    }

    #[test]
    fn test_context_chain_is_classified() {
        let err = anyhow::anyhow!("permission denied").context("Failed to write image: out.png");
        let exit = ExitCode::from_anyhow(&err);
        assert_eq!(exit.code, IO_ERROR);
        assert!(exit.message.unwrap().contains("permission denied"));
    }
}
