use image::{DynamicImage, GrayImage};
use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Debug)]
pub struct PipelineContext {
    /// Index of the frame being processed
    pub frame_index: u64,
    pub debug: Option<DebugConfig>,
}

/// Trait that all preprocessing steps must implement
pub trait PipelineStep: Send + Sync {
    /// Transform one image into the next representation
    fn process(&self, image: DynamicImage, context: &PipelineContext) -> Result<DynamicImage>;

    /// Human-readable name for this step (used in logs and debug folder names)
    fn name(&self) -> &str;
}

/// Composable preprocessing chain: color frame in, binary edge image out
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    debug: Option<DebugConfig>,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            debug: None,
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });

        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step on `input` and return the final image as grayscale
    pub fn run(&self, input: DynamicImage, frame_index: u64) -> Result<GrayImage> {
        let context = PipelineContext {
            frame_index,
            debug: self.debug.clone(),
        };

        let mut image = input;
        for (step_idx, step) in self.steps.iter().enumerate() {
            image = step.process(image, &context)?;
            self.save_debug_output(&context, step_idx, step.name(), &image)?;
        }

        Ok(image.into_luma8())
    }

    fn save_debug_output(
        &self,
        context: &PipelineContext,
        step_idx: usize,
        step_name: &str,
        image: &DynamicImage,
    ) -> Result<()> {
        let Some(debug_config) = &context.debug else {
            return Ok(());
        };

        let step_dir_name = format!("{:02}_{}", step_idx + 1,
            step_name.to_lowercase().replace(' ', "_"));
        let step_dir = debug_config.output_dir.join(&step_dir_name);
        std::fs::create_dir_all(&step_dir)?;

        let filename = format!("frame_{:05}.png", context.frame_index);
        image.save(step_dir.join(&filename))
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        log::debug!("Debug: saved {}/{}", step_dir_name, filename);

        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
