//! Three-stage batch runner
//!
//! Ingests into the staging table in-process, then hands over to the
//! transformation tool for the silver (cleansed) and gold (aggregated)
//! layers. The tool is only invoked here; its models live in the dbt project.
//! Steps run in order and the first failure stops the pipeline.

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::ingest::{IngestReport, Ingestor};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

pub const DEFAULT_DBT_BIN: &str = "dbt";
pub const DEFAULT_DBT_PROJECT_DIR: &str = "/usr/app";
pub const DEFAULT_DBT_PROFILES_DIR: &str = "/usr/app/profiles";
pub const DEFAULT_DBT_LOG_PATH: &str = "/tmp/dbt_logs";
pub const DEFAULT_DBT_TARGET_PATH: &str = "/tmp/dbt_target";
pub const DEFAULT_DBT_TARGET: &str = "dev";
pub const DEFAULT_DBT_THREADS: u32 = 4;

/// Where and how the transformation tool runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub dbt_bin: String,
    /// Contains dbt_project.yml; used as the working directory
    pub project_dir: PathBuf,
    /// Contains profiles.yml
    pub profiles_dir: PathBuf,
    pub log_path: PathBuf,
    pub target_path: PathBuf,
    pub target: String,
    pub threads: u32,
    /// Skip `dbt deps` when packages are already installed
    pub skip_deps: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dbt_bin: DEFAULT_DBT_BIN.to_string(),
            project_dir: PathBuf::from(DEFAULT_DBT_PROJECT_DIR),
            profiles_dir: PathBuf::from(DEFAULT_DBT_PROFILES_DIR),
            log_path: PathBuf::from(DEFAULT_DBT_LOG_PATH),
            target_path: PathBuf::from(DEFAULT_DBT_TARGET_PATH),
            target: DEFAULT_DBT_TARGET.to_string(),
            threads: DEFAULT_DBT_THREADS,
            skip_deps: false,
        }
    }
}

/// One external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl Step {
    pub fn new<I, S>(name: impl Into<String>, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl PipelineConfig {
    /// Transformation steps in execution order
    pub fn transform_steps(&self) -> Vec<Step> {
        let mut steps = Vec::with_capacity(3);

        if !self.skip_deps {
            steps.push(Step::new("dbt deps", &self.dbt_bin, ["deps"]));
        }

        for layer in ["silver", "gold"] {
            steps.push(Step::new(
                format!("dbt run {layer}"),
                &self.dbt_bin,
                [
                    "run".to_string(),
                    "--select".to_string(),
                    layer.to_string(),
                    "--threads".to_string(),
                    self.threads.to_string(),
                    "--target".to_string(),
                    self.target.clone(),
                ],
            ));
        }

        steps
    }

    /// Environment handed to every step on top of the inherited one
    pub fn step_env(&self) -> [(&'static str, &Path); 3] {
        [
            ("DBT_PROFILES_DIR", self.profiles_dir.as_path()),
            ("DBT_LOG_PATH", self.log_path.as_path()),
            ("DBT_TARGET_PATH", self.target_path.as_path()),
        ]
    }

    /// Create the log and target directories if missing
    pub fn prepare_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.log_path)?;
        std::fs::create_dir_all(&self.target_path)?;
        Ok(())
    }
}

/// Run one step to completion
///
/// A non-zero exit becomes [`IngestError::StepFailed`] carrying the step's
/// exit code (1 when it was killed by a signal).
pub async fn run_step(step: &Step, cwd: &Path, env: &[(&str, &Path)]) -> Result<()> {
    info!(step = %step.name, command = %step.command_line(), "Running step");

    let status = Command::new(&step.program)
        .args(&step.args)
        .current_dir(cwd)
        .envs(env.iter().copied())
        .status()
        .await?;

    if !status.success() {
        return Err(IngestError::StepFailed {
            step: step.name.clone(),
            code: status.code().unwrap_or(1),
        });
    }

    info!(step = %step.name, "Step done");
    Ok(())
}

/// Run the silver and gold transformations
pub async fn run_transformations(config: &PipelineConfig) -> Result<()> {
    let env = config.step_env();
    for step in config.transform_steps() {
        run_step(&step, &config.project_dir, &env).await?;
    }
    Ok(())
}

/// Ingest, then transform
pub async fn run_pipeline(ingest: &IngestConfig, pipeline: &PipelineConfig) -> Result<IngestReport> {
    pipeline.prepare_dirs()?;

    let report = Ingestor::new(ingest)?.run().await?;
    run_transformations(pipeline).await?;

    info!(run_id = %report.run_id, "Pipeline finished successfully");
    Ok(report)
}
