use std::path::{Path, PathBuf};

use gush_core::error::GushError;

use crate::process::{CommandLine, ProcessHelper, ProcessOutput};

/// Typed `git` operations on top of a [`ProcessHelper`].
pub struct Git {
    process: ProcessHelper,
}

impl Git {
    pub fn new(process: ProcessHelper) -> Self {
        Self { process }
    }

    /// Git running real processes in `dir`.
    pub fn system(dir: impl Into<PathBuf>) -> Self {
        Self::new(ProcessHelper::system(dir))
    }

    /// Run a git command, returning its output whatever the exit status.
    fn git(&self, args: &[&str]) -> Result<ProcessOutput, GushError> {
        self.process.run("git", args)
    }

    /// Run a git command, returning an error if it fails.
    fn git_ok(&self, args: &[&str]) -> Result<String, GushError> {
        let out = self.git(args)?;
        if !out.success {
            return Err(GushError::GitError {
                message: format!("git {} failed: {}", args.join(" "), out.stderr.trim()),
            });
        }
        Ok(out.stdout)
    }

    /// Whether the working directory is inside a git work tree.
    pub fn is_inside_work_tree(&self) -> Result<bool, GushError> {
        let out = self.git(&["rev-parse", "--is-inside-work-tree"])?;
        Ok(out.success && out.stdout.trim() == "true")
    }

    /// Root of the current work tree.
    pub fn top_level(&self) -> Result<PathBuf, GushError> {
        let out = self.git(&["rev-parse", "--show-toplevel"])?;
        if !out.success || out.stdout.trim().is_empty() {
            return Err(GushError::NotAGitRepository {
                path: self.process.dir().to_path_buf(),
            });
        }
        Ok(PathBuf::from(out.stdout.trim()))
    }

    /// Get the current branch name.
    pub fn current_branch(&self) -> Result<String, GushError> {
        let stdout = self.git_ok(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = stdout.trim();
        if branch == "HEAD" {
            return Err(GushError::GitError {
                message: "HEAD is detached; check out a branch first".into(),
            });
        }
        Ok(branch.to_string())
    }

    /// URL of a remote, if it exists.
    pub fn remote_url(&self, remote: &str) -> Result<Option<String>, GushError> {
        let out = self.git(&["remote", "get-url", remote])?;
        if out.success {
            Ok(Some(out.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Add a remote. An existing remote with the same name is left alone.
    pub fn remote_add(&self, name: &str, url: &str) -> Result<(), GushError> {
        let out = self.git(&["remote", "add", name, url])?;
        if !out.success {
            if out.stderr.contains("already exists") {
                tracing::debug!("remote {name} already exists");
                return Ok(());
            }
            return Err(GushError::GitError {
                message: format!("failed to add remote {name}: {}", out.stderr.trim()),
            });
        }
        Ok(())
    }

    /// Fetch a remote, pruning deleted branches.
    pub fn fetch(&self, remote: &str) -> Result<(), GushError> {
        self.git_ok(&["fetch", remote, "--prune"])?;
        Ok(())
    }

    /// `git push -u <remote> <branch>`; a failed push is returned, not raised.
    pub fn push_upstream(&self, remote: &str, branch: &str) -> Result<ProcessOutput, GushError> {
        let mut outputs = self
            .process
            .run_commands(&[CommandLine::new("git", &["push", "-u", remote, branch]).allow_failures()])?;
        Ok(outputs.pop().unwrap_or_default())
    }

    /// Delete a branch on a remote.
    pub fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<(), GushError> {
        let refspec = format!(":{branch}");
        self.git_ok(&["push", remote, &refspec])?;
        Ok(())
    }

    /// Create and check out `branch` starting at `start_point`.
    pub fn checkout_new_branch(&self, branch: &str, start_point: &str) -> Result<(), GushError> {
        self.git_ok(&["checkout", "-b", branch, start_point])?;
        Ok(())
    }

    /// One-line log for a revision range, oldest first.
    pub fn log_oneline(&self, range: &str) -> Result<Vec<String>, GushError> {
        let stdout = self.git_ok(&["log", "--oneline", "--no-decorate", "--reverse", range])?;
        Ok(stdout
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    pub fn dir(&self) -> &Path {
        self.process.dir()
    }
}

/// Turn an issue title into a branch-name fragment: lowercase ASCII
/// alphanumerics separated by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RecordingRunner;
    use std::sync::Arc;

    fn git_with(runner: &Arc<RecordingRunner>) -> Git {
        Git::new(ProcessHelper::new(Box::new(runner.clone()), "/work/gush"))
    }

    #[test]
    fn test_current_branch_trims_output() {
        let runner = Arc::new(
            RecordingRunner::new()
                .respond("git rev-parse --abbrev-ref HEAD", ProcessOutput::ok("feature-x\n")),
        );
        assert_eq!(git_with(&runner).current_branch().unwrap(), "feature-x");
    }

    #[test]
    fn test_detached_head_is_an_error() {
        let runner = Arc::new(
            RecordingRunner::new()
                .respond("git rev-parse --abbrev-ref HEAD", ProcessOutput::ok("HEAD\n")),
        );
        assert!(git_with(&runner).current_branch().is_err());
    }

    #[test]
    fn test_push_upstream_tolerates_failure() {
        let runner = Arc::new(RecordingRunner::new().respond(
            "git push -u cordoval feature-x",
            ProcessOutput::failed("rejected"),
        ));
        let out = git_with(&runner)
            .push_upstream("cordoval", "feature-x")
            .unwrap();
        assert!(!out.success);
        assert_eq!(runner.calls(), vec!["git push -u cordoval feature-x"]);
    }

    #[test]
    fn test_remote_add_existing_is_ok() {
        let runner = Arc::new(RecordingRunner::new().respond(
            "git remote add cordoval git@github.com:cordoval/gush.git",
            ProcessOutput::failed("error: remote cordoval already exists."),
        ));
        git_with(&runner)
            .remote_add("cordoval", "git@github.com:cordoval/gush.git")
            .unwrap();
    }

    #[test]
    fn test_remote_url_missing_remote() {
        let runner = Arc::new(RecordingRunner::new().respond(
            "git remote get-url upstream",
            ProcessOutput::failed("error: No such remote 'upstream'"),
        ));
        assert_eq!(git_with(&runner).remote_url("upstream").unwrap(), None);
    }

    #[test]
    fn test_top_level() {
        let runner = Arc::new(RecordingRunner::new().respond(
            "git rev-parse --show-toplevel",
            ProcessOutput::ok("/work/gush\n"),
        ));
        assert_eq!(
            git_with(&runner).top_level().unwrap(),
            PathBuf::from("/work/gush")
        );

        let outside = Arc::new(RecordingRunner::new().respond(
            "git rev-parse --show-toplevel",
            ProcessOutput::failed("fatal: not a git repository"),
        ));
        assert!(matches!(
            git_with(&outside).top_level(),
            Err(GushError::NotAGitRepository { .. })
        ));
    }

    #[test]
    fn test_delete_remote_branch() {
        let runner = Arc::new(RecordingRunner::new());
        git_with(&runner)
            .delete_remote_branch("cordoval", "feature-x")
            .unwrap();
        assert_eq!(runner.calls(), vec!["git push cordoval :feature-x"]);
    }

    #[test]
    fn test_log_oneline_skips_blank_lines() {
        let runner = Arc::new(RecordingRunner::new().respond(
            "git log --oneline --no-decorate --reverse v1.0.0..HEAD",
            ProcessOutput::ok("abc123 Fix typo\n\ndef456 Add release:create\n"),
        ));
        let log = git_with(&runner).log_oneline("v1.0.0..HEAD").unwrap();
        assert_eq!(log, vec!["abc123 Fix typo", "def456 Add release:create"]);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Crash when running `issue:copy`!"), "crash-when-running-issue-copy");
        assert_eq!(slugify("  --Already--dashed--  "), "already-dashed");
        assert_eq!(slugify("Ünïcode títle"), "n-code-t-tle");
    }
}
