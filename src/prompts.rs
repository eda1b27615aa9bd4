//! Interactive fallback for build inputs not given on the command line.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{bail, Result};

/// The three raw inputs a build needs, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInputs {
    pub classpath: Option<String>,
    pub resources: Option<String>,
    pub main: Option<String>,
}

pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

/// Fill in missing inputs, prompting on the terminal when there is one.
///
/// Without a terminal the lists default to empty and a missing main
/// namespace is an error.
pub fn complete(inputs: BuildInputs) -> Result<(String, String, String)> {
    if is_interactive() {
        let stdin = io::stdin();
        complete_with(inputs, &mut stdin.lock(), &mut io::stderr())
    } else {
        let Some(main) = inputs.main else {
            bail!("No main namespace given. Pass --main <ns> in non-interactive mode.");
        };
        Ok((
            inputs.classpath.unwrap_or_default(),
            inputs.resources.unwrap_or_default(),
            main,
        ))
    }
}

fn complete_with(
    inputs: BuildInputs,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<(String, String, String)> {
    let classpath = match inputs.classpath {
        Some(value) => value,
        None => ask(input, output, "Enter classpath (separate multiple paths with ':')")?,
    };
    let resources = match inputs.resources {
        Some(value) => value,
        None => ask(
            input,
            output,
            "Enter resource directories (separate multiple paths with ':')",
        )?,
    };
    let main = match inputs.main {
        Some(value) => value,
        None => ask(input, output, "Enter main namespace")?,
    };
    if main.trim().is_empty() {
        bail!("A main namespace is required");
    }
    Ok((classpath, resources, main))
}

fn ask(input: &mut impl BufRead, output: &mut impl Write, message: &str) -> Result<String> {
    write!(output, "{}: ", message)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_only_for_missing() {
        let inputs = BuildInputs {
            classpath: Some("src".to_string()),
            resources: None,
            main: None,
        };
        let mut typed = "assets::data\nmy.app.core\n".as_bytes();
        let mut shown = Vec::new();

        let (classpath, resources, main) = complete_with(inputs, &mut typed, &mut shown).unwrap();
        assert_eq!(classpath, "src");
        assert_eq!(resources, "assets::data");
        assert_eq!(main, "my.app.core");

        let shown = String::from_utf8(shown).unwrap();
        assert!(!shown.contains("classpath"));
        assert!(shown.contains("resource directories"));
    }

    #[test]
    fn test_empty_main_rejected() {
        let mut typed = "\n\n\n".as_bytes();
        let mut shown = Vec::new();
        assert!(complete_with(BuildInputs::default(), &mut typed, &mut shown).is_err());
    }
}
