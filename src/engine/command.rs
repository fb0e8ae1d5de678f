use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};

use crate::core::model::NormalizedBox;
use crate::core::normalize::{normalize_page, PageExtent, RawBox};

use super::Engine;

/// An external extractor invoked once per page.
///
/// The program is called as `<program> [args..] --input <document> --page <n>`
/// and must print a JSON array of raw boxes on stdout.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    input: PathBuf,
    extent: PageExtent,
}

impl CommandEngine {
    pub fn new(name: impl Into<String>, program: PathBuf, input: PathBuf) -> Self {
        Self {
            name: name.into(),
            program,
            args: Vec::new(),
            input,
            extent: PageExtent::unit(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Coordinate space the command reports in. Defaults to the unit square.
    pub fn with_extent(mut self, extent: PageExtent) -> Self {
        self.extent = extent;
        self
    }
}

impl Engine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn produce(&self, page: usize) -> Result<Vec<NormalizedBox>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--input")
            .arg(&self.input)
            .arg("--page")
            .arg(page.to_string())
            .output()
            .with_context(|| format!("failed to invoke {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} exited with {}: {}", self.name, output.status, stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let raws: Vec<RawBox> = serde_json::from_str(&stdout)
            .with_context(|| format!("failed to parse box JSON from {}", self.name))?;
        Ok(normalize_page(&raws, self.extent, page, &self.name))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_command_output() {
        let engine = CommandEngine::new("echo-engine", PathBuf::from("sh"), PathBuf::from("doc.pdf"))
            .with_args(vec![
                "-c".to_string(),
                r#"echo '[{"x0": 0.1, "y0": 0.1, "x1": 0.3, "y1": 0.2, "text": "hi"}]'"#.to_string(),
            ]);
        let boxes = engine.produce(4).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].page, 4);
        assert_eq!(boxes[0].text_content(), "hi");
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let engine = CommandEngine::new("failing", PathBuf::from("sh"), PathBuf::from("doc.pdf"))
            .with_args(vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()]);
        let err = engine.produce(0).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn missing_program_is_an_error() {
        let engine = CommandEngine::new(
            "ghost",
            PathBuf::from("/nonexistent/boxfusion-engine"),
            PathBuf::from("doc.pdf"),
        );
        assert!(engine.produce(0).is_err());
    }
}
