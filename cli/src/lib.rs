use base64::{Engine, engine::general_purpose::STANDARD};
use cutout::{
    CutoutError, ExtractionConfig, ExtractionMode, ExtractionResult, Pipeline, PromptIntent,
    RasterImage, Region, decode_image, normalize_region, parse_proposal,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Cutout(#[from] CutoutError),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
    #[error("Duplicate job name '{0}'; each job writes <output_dir>/<name>.png")]
    DuplicateJobName(String),
}

/// What to cut out of one image
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Job {
    pub name: String,
    pub input: String,
    /// External model answer to parse and normalize into a region
    pub proposal: Option<String>,
    pub prompt: Option<String>,
    /// Overrides the mode derived from the prompt
    pub mode: Option<ExtractionMode>,
    #[serde(default)]
    pub aggressive: bool,
    /// Exact region; used as given
    pub region: Option<Region>,
}

/// Region, mode and aggressive flag for one call to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPlan {
    pub region: Region,
    pub mode: ExtractionMode,
    pub aggressive: bool,
}

impl Job {
    /// Decide the engine arguments for an image of `image_size`.
    ///
    /// A proposal wins over an explicit region; with neither, the whole
    /// image is used.
    pub fn plan(&self, image_size: (u32, u32)) -> Result<JobPlan, CliError> {
        let prompt = self.prompt.as_deref().unwrap_or_default();
        let intent = PromptIntent::parse(prompt);

        let region = match (&self.proposal, self.region) {
            (Some(answer), _) => normalize_region(parse_proposal(answer)?, prompt, image_size)?,
            (None, Some(region)) => region,
            (None, None) => Region::full(image_size.0, image_size.1),
        };

        Ok(JobPlan {
            region,
            mode: self.mode.unwrap_or(intent.mode),
            aggressive: self.aggressive || intent.aggressive,
        })
    }

    /// Load, plan and extract.
    pub fn run(&self, pipeline: &Pipeline) -> Result<ExtractionResult, CliError> {
        let image = load_image(&self.input)?;
        let plan = self.plan(image.dimensions())?;
        Ok(pipeline.extract(&image, plan.region, plan.mode, plan.aggressive)?)
    }
}

/// A set of jobs run concurrently by `cutout batch`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchFile {
    pub output_dir: String,
    #[serde(default)]
    pub conservative: bool,
    #[serde(default)]
    pub enhance: bool,
    #[serde(default)]
    pub config: ExtractionConfig,
    pub jobs: Vec<Job>,
}

impl BatchFile {
    /// Load BatchFile configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load BatchFile configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let batch: Self = toml::from_str(content)?;
        batch.validate()
    }

    /// Load BatchFile configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load BatchFile configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        let batch: Self = serde_json::from_str(content)?;
        batch.validate()
    }

    fn validate(self) -> Result<Self, CliError> {
        let mut seen = HashSet::new();
        if let Some(job) = self.jobs.iter().find(|job| !seen.insert(job.name.as_str())) {
            return Err(CliError::DuplicateJobName(job.name.clone()));
        }
        Ok(self)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Convert BatchFile to TOML string
    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Where the cut-out of job `name` is written
    pub fn output_path(&self, name: &str) -> PathBuf {
        Path::new(&self.output_dir).join(format!("{name}.png"))
    }

    /// Build the pipeline shared by every job
    pub fn pipeline(&self) -> Pipeline {
        build_pipeline(self.config.clone(), self.conservative, self.enhance)
    }
}

/// Load an [`ExtractionConfig`] from a `.toml` or `.json` file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExtractionConfig, CliError> {
    let path_ref = path.as_ref();
    let content = fs::read_to_string(path_ref)?;
    match path_ref.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(toml::from_str(&content)?),
        Some("json") => Ok(serde_json::from_str(&content)?),
        _ => Err(CliError::UnsupportedFileFormat),
    }
}

pub fn build_pipeline(config: ExtractionConfig, conservative: bool, enhance: bool) -> Pipeline {
    let enhancement = config.enhance.clone().unwrap_or_default();
    let mut builder = Pipeline::builder().with_config(config);
    if conservative {
        builder = builder.conservative();
    }
    if enhance {
        builder = builder.with_enhancement(enhancement);
    }
    builder.build()
}

/// Write a finished job's cut-out, passing its error through otherwise.
pub fn save_job_output(
    outcome: Result<ExtractionResult, CliError>,
    output: &Path,
) -> Result<ExtractionResult, CliError> {
    let result = outcome?;
    result.save_png(output)?;
    Ok(result)
}

pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RasterImage, CliError> {
    let bytes = fs::read(path)?;
    Ok(decode_image(&bytes)?)
}

/// A cut-out as printed by `--base64`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EncodedResult {
    pub width: u32,
    pub height: u32,
    /// Base64 PNG
    pub data: String,
}

impl EncodedResult {
    pub fn from_result(result: &ExtractionResult) -> Result<Self, CliError> {
        Ok(Self {
            width: result.width(),
            height: result.height(),
            data: STANDARD.encode(result.encode_png()?),
        })
    }
}
