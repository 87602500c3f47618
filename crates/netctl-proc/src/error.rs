use thiserror::Error;

/// Errors raised by process invocation.
#[derive(Debug, Error)]
pub enum ProcError {
    /// An argument contained a forbidden character.
    #[error("invalid argument {argument:?}: contains forbidden character {character:?}")]
    InvalidArgument {
        /// The offending argument.
        argument: String,
        /// The forbidden character found.
        character: char,
    },

    /// The child process could not be spawned or its output could not be read.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to spawn.
        program: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a non-zero status (only surfaced by
    /// [`crate::run_checked`]).
    #[error("{program} {args:?} exited with code {exit_code}: {stderr}")]
    NonZeroExit {
        /// Program that was run.
        program: &'static str,
        /// Arguments passed to the program.
        args: Vec<String>,
        /// Exit code.
        exit_code: i32,
        /// Captured stderr.
        stderr: String,
    },
}
