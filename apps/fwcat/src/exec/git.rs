use super::run;
use crate::install::{StepError, VersionControl};
use std::path::{Path, PathBuf};
use std::process::Command;

/// The `git` command-line client.
#[derive(Debug, Clone)]
pub struct GitVcs {
    git: PathBuf,
}

impl GitVcs {
    pub fn new(git: impl Into<PathBuf>) -> Self {
        Self { git: git.into() }
    }

    fn in_tree(&self, dest: &Path) -> Command {
        let mut command = Command::new(&self.git);
        command.arg("-C").arg(dest);
        command
    }
}

impl VersionControl for GitVcs {
    fn clone_repo(
        &self,
        url: &str,
        branch: Option<&str>,
        dest: &Path,
        shallow: bool,
        recurse_submodules: bool,
    ) -> Result<(), StepError> {
        let mut command = Command::new(&self.git);
        command.arg("clone");
        if shallow {
            command.args(["--depth", "1", "--single-branch"]);
        }
        if recurse_submodules {
            command.arg("--recurse-submodules");
            if shallow {
                command.arg("--shallow-submodules");
            }
        }
        if let Some(branch) = branch {
            command.args(["--branch", branch]);
        }
        command.arg("--").arg(url).arg(dest);
        run("clone", &mut command).map(|_| ())
    }

    /// A ref outside the shallow history is retried after unshallowing.
    fn checkout(&self, dest: &Path, reference: &str) -> Result<(), StepError> {
        let first = run(
            "checkout",
            self.in_tree(dest).args(["checkout", reference, "--"]),
        );
        if first.is_ok() {
            return self.update_submodules(dest);
        }

        tracing::debug!(reference, "Ref not in shallow clone, fetching full history");
        run(
            "fetch",
            self.in_tree(dest).args([
                "fetch",
                "--unshallow",
                "--tags",
                "origin",
                "+refs/heads/*:refs/remotes/origin/*",
            ]),
        )?;
        run(
            "checkout",
            self.in_tree(dest).args(["checkout", reference, "--"]),
        )?;
        self.update_submodules(dest)
    }
}

impl GitVcs {
    fn update_submodules(&self, dest: &Path) -> Result<(), StepError> {
        run(
            "submodules",
            self.in_tree(dest)
                .args(["submodule", "update", "--init", "--recursive"]),
        )
        .map(|_| ())
    }
}
