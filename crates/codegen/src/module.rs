//! Module assembly: header with a content digest, one section per goal,
//! and the file write.

use crate::builder;
use crate::emit::{line, Ctx};
use crate::error::CodegenError;
use crate::updater;
use heck::ToSnakeCase;
use sha2::{Digest, Sha256};
use stagecraft_core::{BuilderArtifact, SynthesizedGoal, Variant};
use std::path::{Path, PathBuf};

/// Configuration for Rust module generation.
#[derive(Debug, Clone)]
pub struct RustConfig {
    /// Directory the module file is written to.
    pub out_dir: PathBuf,
    /// Module name; the file is `<out_dir>/<module_name>.rs`.
    pub module_name: String,
    /// Path under which generated code reaches the runtime crate.
    pub runtime_path: String,
    /// `use` items placed at the top of the module so that the goals'
    /// types resolve.
    pub imports: Vec<String>,
}

impl RustConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        RustConfig {
            out_dir: out_dir.into(),
            module_name: "staged".to_string(),
            runtime_path: "stagecraft_runtime".to_string(),
            imports: vec!["super::*".to_string()],
        }
    }

    fn file_path(&self) -> Result<PathBuf, CodegenError> {
        let stem = self.module_name.to_snake_case();
        if stem.is_empty() {
            return Err(CodegenError::Config(format!(
                "module name '{}' does not yield a file name",
                self.module_name
            )));
        }
        Ok(self.out_dir.join(format!("{}.rs", stem)))
    }
}

/// Rendered module text plus the goals that could not be rendered.
#[derive(Debug, Clone)]
pub struct RenderedModule {
    pub source: String,
    pub digest: String,
    pub rendered: Vec<String>,
    pub skipped: Vec<(String, CodegenError)>,
}

/// Outcome of [`generate_rust`].
#[derive(Debug, Clone)]
pub struct GeneratedModule {
    pub path: PathBuf,
    /// False when the file already held identical contents.
    pub written: bool,
    pub rendered: Vec<String>,
    pub skipped: Vec<(String, CodegenError)>,
}

/// SHA-256 over the serialized goals, as lowercase hex.
pub fn digest(goals: &[&SynthesizedGoal]) -> Result<String, CodegenError> {
    let mut hasher = Sha256::new();
    for goal in goals {
        let canonical = serde_json::to_vec(goal).map_err(|e| {
            CodegenError::emit(&goal.id, format!("cannot serialize goal for the digest: {}", e))
        })?;
        hasher.update(&canonical);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Render every goal into one module. A goal that cannot be rendered is
/// left out and reported; the others are unaffected. The header digest
/// covers only the goals that made it into the module.
pub fn render_module(
    goals: &[SynthesizedGoal],
    config: &RustConfig,
) -> Result<RenderedModule, CodegenError> {
    let mut sections = Vec::new();
    let mut included: Vec<&SynthesizedGoal> = Vec::new();
    let mut skipped = Vec::new();

    for goal in goals {
        match render_goal(goal, config) {
            Ok(section) => {
                sections.push(section);
                included.push(goal);
            }
            Err(e) => {
                tracing::warn!(goal = %goal.id, "skipping goal: {}", e);
                skipped.push((goal.id.clone(), e));
            }
        }
    }

    let digest = digest(&included)?;
    let mut source = String::new();
    line(
        &mut source,
        0,
        &format!(
            "// @generated by stagecraft {}. Do not edit by hand.",
            env!("CARGO_PKG_VERSION")
        ),
    );
    line(&mut source, 0, &format!("// digest: sha256:{}", digest));
    line(&mut source, 0, "");
    line(&mut source, 0, "#![allow(dead_code, clippy::all)]");
    if !config.imports.is_empty() {
        line(&mut source, 0, "");
        for import in &config.imports {
            line(&mut source, 0, &format!("use {};", import));
        }
    }
    for section in sections {
        source.push_str(&section);
    }

    Ok(RenderedModule {
        source,
        digest,
        rendered: included.iter().map(|g| g.id.clone()).collect(),
        skipped,
    })
}

fn render_goal(goal: &SynthesizedGoal, config: &RustConfig) -> Result<String, CodegenError> {
    let ctx = Ctx {
        goal: &goal.id,
        rt: &config.runtime_path,
    };
    let mut out = String::new();
    line(&mut out, 0, "");
    line(&mut out, 0, &format!("// ── {} ──", goal.goal_name));

    for entry in &goal.entry_points {
        match entry.variant {
            Variant::Builder => match &goal.builder {
                Some(BuilderArtifact::Chain(chain)) => {
                    builder::emit_chain(&mut out, &ctx, chain, entry)?
                }
                Some(BuilderArtifact::Factory(factory)) => {
                    builder::emit_factory(&mut out, &ctx, factory, entry)?
                }
                None => return Err(ctx.error("builder entry point without a builder")),
            },
            Variant::Updater => match &goal.updater {
                Some(contract) => updater::emit_updater(&mut out, &ctx, contract, entry)?,
                None => return Err(ctx.error("updater entry point without an updater")),
            },
        }
    }
    Ok(out)
}

/// Render and write the module. An existing file with identical contents
/// is left untouched.
pub fn generate_rust(
    goals: &[SynthesizedGoal],
    config: &RustConfig,
) -> Result<GeneratedModule, CodegenError> {
    let path = config.file_path()?;
    let module = render_module(goals, config)?;

    std::fs::create_dir_all(&config.out_dir).map_err(|e| {
        CodegenError::Io(format!(
            "failed to create directory '{}': {}",
            config.out_dir.display(),
            e
        ))
    })?;

    let written = write_if_changed(&path, &module.source)?;
    tracing::info!(path = %path.display(), written, goals = module.rendered.len(), "module generated");

    Ok(GeneratedModule {
        path,
        written,
        rendered: module.rendered,
        skipped: module.skipped,
    })
}

fn write_if_changed(path: &Path, contents: &str) -> Result<bool, CodegenError> {
    if let Ok(existing) = std::fs::read_to_string(path) {
        if existing == contents {
            return Ok(false);
        }
    }
    std::fs::write(path, contents)
        .map_err(|e| CodegenError::Io(format!("failed to write '{}': {}", path.display(), e)))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_becomes_snake_case_file() {
        let mut config = RustConfig::new("/tmp/out");
        config.module_name = "StagedBuilders".into();
        assert_eq!(
            config.file_path().unwrap(),
            PathBuf::from("/tmp/out/staged_builders.rs")
        );
    }

    #[test]
    fn test_empty_module_name_rejected() {
        let mut config = RustConfig::new("/tmp/out");
        config.module_name = String::new();
        assert!(matches!(config.file_path(), Err(CodegenError::Config(_))));
    }

    #[test]
    fn test_empty_batch_renders_header_only() {
        let module = render_module(&[], &RustConfig::new("/tmp/out")).unwrap();
        assert!(module.source.starts_with("// @generated by stagecraft"));
        assert!(module.source.contains("use super::*;"));
        assert!(module.rendered.is_empty());
        assert_eq!(module.digest, digest(&[]).unwrap());
    }
}
