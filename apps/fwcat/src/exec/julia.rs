use super::{is_dotted_identifier, last_line, run};
use crate::install::{RuntimeProvisioner, StepError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// `juliaup` for the runtime, `julia` + `Pkg` for the tool.
#[derive(Debug, Clone)]
pub struct JuliaupProvisioner {
    juliaup: PathBuf,
    julia: PathBuf,
}

impl JuliaupProvisioner {
    pub fn new(juliaup: impl Into<PathBuf>, julia: impl Into<PathBuf>) -> Self {
        Self {
            juliaup: juliaup.into(),
            julia: julia.into(),
        }
    }

    fn julia_in(&self, install_path: &Path, script: &str) -> Command {
        let mut command = Command::new(&self.julia);
        command
            .arg(format!("--project={}", install_path.display()))
            .args(["--startup-file=no", "-e", script]);
        command
    }
}

/// Quote a value as a Julia string literal.
fn julia_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn check_tool(tool: &str) -> Result<(), StepError> {
    if is_dotted_identifier(tool) && !tool.contains('.') {
        Ok(())
    } else {
        Err(StepError::new(
            "tool",
            format!("'{tool}' is not a valid package name"),
        ))
    }
}

impl RuntimeProvisioner for JuliaupProvisioner {
    /// `juliaup add` fails for an installed channel; that case updates instead.
    fn install_or_update_runtime(&self, channel: &str) -> Result<(), StepError> {
        let added = run(
            "runtime",
            Command::new(&self.juliaup).args(["add", channel]),
        );
        if added.is_ok() {
            return Ok(());
        }
        run(
            "runtime",
            Command::new(&self.juliaup).args(["update", channel]),
        )
        .map(|_| ())
    }

    fn install_or_update_tool(
        &self,
        tool: &str,
        version: &str,
        registry_url: &str,
        install_path: &Path,
    ) -> Result<(), StepError> {
        check_tool(tool)?;

        let mut script = String::from("import Pkg;");
        if !registry_url.is_empty() {
            script.push_str(&format!(
                " Pkg.Registry.add(Pkg.RegistrySpec(url={}));",
                julia_string(registry_url)
            ));
        }
        if version.is_empty() {
            script.push_str(&format!(" Pkg.add({});", julia_string(tool)));
        } else {
            script.push_str(&format!(
                " Pkg.add(name={}, version={});",
                julia_string(tool),
                julia_string(version)
            ));
        }
        script.push_str(" Pkg.instantiate(); Pkg.precompile()");

        run("tool", &mut self.julia_in(install_path, &script)).map(|_| ())
    }

    fn installed_tool_version(
        &self,
        tool: &str,
        install_path: &Path,
    ) -> Result<String, StepError> {
        check_tool(tool)?;

        let script = format!(
            "import Pkg; for (_, d) in Pkg.dependencies(); d.name == {} && println(d.version); end",
            julia_string(tool)
        );
        let output = run("version", &mut self.julia_in(install_path, &script))?;
        last_line(&output)
            .map(str::to_string)
            .ok_or_else(|| StepError::new("version", format!("{tool} is not installed")))
    }
}
