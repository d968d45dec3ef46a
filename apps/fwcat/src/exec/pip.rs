use super::{is_dotted_identifier, last_line, run};
use crate::install::{PackageManager, StepError};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

/// `pip` driven through a configured python interpreter.
#[derive(Debug, Clone)]
pub struct PipPackageManager {
    python: PathBuf,
}

impl PipPackageManager {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
        }
    }

    fn pip_install(&self, step: &str, args: &[&OsStr]) -> Result<(), StepError> {
        let mut command = Command::new(&self.python);
        command.args(["-m", "pip", "install", "-U"]).args(args);
        run(step, &mut command).map(|_| ())
    }
}

impl PackageManager for PipPackageManager {
    fn install_latest(&self, package: &str) -> Result<(), StepError> {
        self.pip_install("pip install", &[OsStr::new(package)])
    }

    fn install_pinned(&self, package: &str, version: &str) -> Result<(), StepError> {
        let requirement = format!("{package}=={version}");
        self.pip_install("pip install", &[OsStr::new(&requirement)])
    }

    fn install_editable(&self, path: &Path) -> Result<(), StepError> {
        self.pip_install("pip install -e", &[OsStr::new("-e"), path.as_os_str()])
    }

    fn installed_version(&self, module: &str) -> Result<String, StepError> {
        if !is_dotted_identifier(module) {
            return Err(StepError::new(
                "version",
                format!("'{module}' is not an importable module name"),
            ));
        }

        let script = format!("import {module}; print({module}.__version__)");
        let output = run(
            "version",
            Command::new(&self.python).args(["-c", script.as_str()]),
        )?;
        last_line(&output)
            .map(str::to_string)
            .ok_or_else(|| StepError::new("version", format!("{module} printed no version")))
    }
}
