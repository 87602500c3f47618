use netctl_proc::{AllowedProgram, ProcError};
use tracing::{debug, warn};

use crate::dump::{parse_dump, IptablesDump};
use crate::IptablesError;

/// Substrings the kernel emits for a rule-existence check (`iptables -C`)
/// that mean "doesn't exist" rather than "real error". Centralized here per
/// the documented brittleness of this coupling: a future kernel version
/// that changes these strings only needs to be adapted in this one place.
fn is_tolerated_absence(stderr: &str) -> bool {
    stderr.contains("Bad rule") || stderr.contains("No chain/target/match")
}

/// Reconciles iptables chains and rules inside one namespace (or the root
/// namespace, if `ns` is empty).
#[derive(Debug, Clone)]
pub struct IptablesManager {
    ns: String,
}

impl IptablesManager {
    /// Creates a manager that operates inside network namespace `ns`.
    /// Pass an empty string to operate in the root namespace.
    #[must_use]
    pub fn new(ns: impl Into<String>) -> Self {
        Self { ns: ns.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<netctl_proc::ProcOutput, IptablesError> {
        netctl_proc::run_in_ns(&self.ns, AllowedProgram::Iptables, args)
            .await
            .map_err(IptablesError::Process)
    }

    fn non_zero_exit(&self, args: &[&str], exit_code: i32, stderr: String) -> IptablesError {
        IptablesError::Process(ProcError::NonZeroExit {
            program: AllowedProgram::Iptables.as_str(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            exit_code,
            stderr,
        })
    }

    /// Checks whether `chain` exists in `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process invocation itself fails.
    pub async fn chain_exists(&self, table: &str, chain: &str) -> Result<bool, IptablesError> {
        let output = self.run(&["-t", table, "-L", chain, "-n"]).await?;
        Ok(output.success())
    }

    /// Creates `chain` in `table`, tolerating "Chain already exists" as
    /// success.
    ///
    /// # Errors
    ///
    /// Returns an error for any other non-zero exit.
    pub async fn create_chain(&self, table: &str, chain: &str) -> Result<(), IptablesError> {
        let args = ["-t", table, "-N", chain];
        let output = self.run(&args).await?;
        if output.success() || output.stderr_lossy().contains("Chain already exists") {
            return Ok(());
        }
        Err(self.non_zero_exit(&args, output.exit_code, output.stderr_lossy()))
    }

    /// Checks whether a rule matching `rule_args` exists in `(table, chain)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails for a reason other than the two
    /// tolerated "rule not found" kernel error strings.
    pub async fn rule_exists(&self, table: &str, chain: &str, rule_args: &[&str]) -> Result<bool, IptablesError> {
        let mut args = vec!["-t", table, "-C", chain];
        args.extend_from_slice(rule_args);
        let output = self.run(&args).await?;
        if output.success() {
            return Ok(true);
        }
        let stderr = output.stderr_lossy();
        if is_tolerated_absence(&stderr) {
            return Ok(false);
        }
        Err(self.non_zero_exit(&args, output.exit_code, stderr))
    }

    /// Appends `rule_args` to `(table, chain)` iff not already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check or the append itself fails.
    pub async fn append_if_missing(&self, table: &str, chain: &str, rule_args: &[&str]) -> Result<(), IptablesError> {
        if self.rule_exists(table, chain, rule_args).await? {
            return Ok(());
        }
        let mut args = vec!["-t", table, "-A", chain];
        args.extend_from_slice(rule_args);
        let output = self.run(&args).await?;
        if output.success() {
            return Ok(());
        }
        Err(self.non_zero_exit(&args, output.exit_code, output.stderr_lossy()))
    }

    /// Inserts `rule_args` at position 1 of `(table, chain)` iff not already
    /// present.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check or the insert itself fails.
    pub async fn insert_if_missing(&self, table: &str, chain: &str, rule_args: &[&str]) -> Result<(), IptablesError> {
        if self.rule_exists(table, chain, rule_args).await? {
            return Ok(());
        }
        let mut args = vec!["-t", table, "-I", chain, "1"];
        args.extend_from_slice(rule_args);
        let output = self.run(&args).await?;
        if output.success() {
            return Ok(());
        }
        Err(self.non_zero_exit(&args, output.exit_code, output.stderr_lossy()))
    }

    /// Deletes `rule_args` from `(table, chain)` iff present.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check or the delete itself fails.
    pub async fn delete_if_present(&self, table: &str, chain: &str, rule_args: &[&str]) -> Result<(), IptablesError> {
        if !self.rule_exists(table, chain, rule_args).await? {
            return Ok(());
        }
        let mut args = vec!["-t", table, "-D", chain];
        args.extend_from_slice(rule_args);
        let output = self.run(&args).await?;
        if output.success() {
            return Ok(());
        }
        Err(self.non_zero_exit(&args, output.exit_code, output.stderr_lossy()))
    }

    /// Flushes `(table, chain)`. Best-effort: failures are logged and
    /// swallowed, matching the cleanup-style operations this agent never
    /// propagates.
    pub async fn flush(&self, table: &str, chain: &str) {
        match self.run(&["-t", table, "-F", chain]).await {
            Ok(output) if output.success() => {}
            Ok(output) => warn!(table, chain, stderr = %output.stderr_lossy(), "flush failed, ignoring"),
            Err(err) => warn!(table, chain, error = %err, "flush failed, ignoring"),
        }
    }

    /// Deletes every rule in `(table, chain)` whose argument list contains
    /// `tag` as a substring of one of its tokens, using a fresh
    /// [`dump_all`](Self::dump_all) snapshot as the source of truth. Returns
    /// the number of rules deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the dump or any individual delete fails.
    pub async fn purge_tagged(&self, table: &str, chain: &str, tag: &str) -> Result<usize, IptablesError> {
        let dump = self.dump_all().await?;
        let mut purged = 0;
        for rule in dump.rules(table) {
            if rule.chain != chain {
                continue;
            }
            if !rule.args.iter().any(|arg| arg.contains(tag)) {
                continue;
            }
            let args: Vec<&str> = rule.args.iter().map(String::as_str).collect();
            self.delete_if_present(table, chain, &args).await?;
            purged += 1;
        }
        Ok(purged)
    }

    /// Dumps every table via `iptables-save` and parses it.
    ///
    /// # Errors
    ///
    /// Returns an error if the dump command fails or its output can't be
    /// parsed.
    pub async fn dump_all(&self) -> Result<IptablesDump, IptablesError> {
        let output = netctl_proc::run_in_ns(&self.ns, AllowedProgram::IptablesSave, &[])
            .await
            .map_err(IptablesError::Process)?;
        if !output.success() {
            return Err(IptablesError::Process(ProcError::NonZeroExit {
                program: AllowedProgram::IptablesSave.as_str(),
                args: vec![],
                exit_code: output.exit_code,
                stderr: output.stderr_lossy(),
            }));
        }
        debug!(ns = %self.ns, "parsed iptables-save dump");
        parse_dump(&output.stdout_lossy())
    }
}
