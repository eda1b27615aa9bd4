//! Preflight check types and report.

/// Result of a single preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - the build will fail.
    Fail,
    /// Check passed but with a warning.
    Warn,
    /// Not applicable on this host.
    Skip,
}

impl CheckStatus {
    fn label(self) -> (&'static str, &'static str) {
        match self {
            CheckStatus::Pass => ("✓", "PASS"),
            CheckStatus::Fail => ("✗", "FAIL"),
            CheckStatus::Warn => ("⚠", "WARN"),
            CheckStatus::Skip => ("○", "SKIP"),
        }
    }
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            details,
        }
    }

    pub fn pass(name: &str) -> Self {
        Self::new(name, CheckStatus::Pass, None)
    }

    pub fn pass_with(name: &str, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Pass, Some(details.into()))
    }

    pub fn fail(name: &str, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Fail, Some(details.into()))
    }

    pub fn warn(name: &str, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warn, Some(details.into()))
    }

    pub fn skip(name: &str, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Skip, Some(details.into()))
    }
}

/// Results of all preflight checks.
#[derive(Debug, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// True if no check failed.
    pub fn all_passed(&self) -> bool {
        self.fail_count() == 0
    }

    pub fn pass_count(&self) -> usize {
        self.count(CheckStatus::Pass)
    }

    pub fn fail_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn warn_count(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            let (icon, status) = check.status.label();
            print!("  {} [{}] {}", icon, status, check.name);
            match &check.details {
                Some(details) => println!(": {}", details),
                None => println!(),
            }
        }

        println!();
        println!("Summary: {}/{} passed", self.pass_count(), self.checks.len());
        if self.fail_count() > 0 {
            println!("         {} FAILED - build will not succeed", self.fail_count());
        }
        if self.warn_count() > 0 {
            println!("         {} warnings", self.warn_count());
        }
    }
}
