//! Request validation, batch planning, and image persistence.
//!
//! One logical generation request fans out into `count` sequential API calls
//! (the gateway produces one image per call and its rate limits are
//! unspecified, so sub-requests are never dispatched concurrently). Each
//! successful call is written to the vault's graphics folder under a derived
//! filename; each failed call is recorded by index so a batch can complete
//! partially.

use crate::client::{GenApiClient, ReferenceImage};
use crate::namer::{self, Variant, VariantKind};
use chrono::{DateTime, Local};
use imagegen_mcp_common::config::Config;
use imagegen_mcp_common::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Maximum number of reference images per variations request.
pub const MAX_REFERENCE_IMAGES: usize = 14;

/// File extensions included in directory listings.
pub const LISTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Supported aspect ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    Wide16x9,
    Tall9x16,
    Standard4x3,
    Tall3x4,
    Photo3x2,
    Tall2x3,
    Ultrawide,
    Ultratall,
    Classic5x4,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 10] = [
        AspectRatio::Square,
        AspectRatio::Wide16x9,
        AspectRatio::Tall9x16,
        AspectRatio::Standard4x3,
        AspectRatio::Tall3x4,
        AspectRatio::Photo3x2,
        AspectRatio::Tall2x3,
        AspectRatio::Ultrawide,
        AspectRatio::Ultratall,
        AspectRatio::Classic5x4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Wide16x9 => "16:9",
            AspectRatio::Tall9x16 => "9:16",
            AspectRatio::Standard4x3 => "4:3",
            AspectRatio::Tall3x4 => "3:4",
            AspectRatio::Photo3x2 => "3:2",
            AspectRatio::Tall2x3 => "2:3",
            AspectRatio::Ultrawide => "21:9",
            AspectRatio::Ultratall => "9:21",
            AspectRatio::Classic5x4 => "5:4",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.as_str() == s)
    }

    /// Comma-separated list of valid values, for error messages.
    pub fn options() -> String {
        Self::ALL.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Square
    }
}

/// Supported image resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    /// Fastest
    Small,
    /// Default balance
    Medium,
    /// Highest quality
    Large,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [ImageSize::Small, ImageSize::Medium, ImageSize::Large];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Small => "1K",
            ImageSize::Medium => "2K",
            ImageSize::Large => "4K",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }

    pub fn options() -> String {
        Self::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        ImageSize::Medium
    }
}

/// Which tool a request came from; determines count bounds and the variant
/// suffix family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Single,
    Multiple,
    Variations,
}

impl RequestKind {
    /// Inclusive count bounds for this kind of request.
    pub fn count_bounds(self) -> (usize, usize) {
        match self {
            RequestKind::Single => (1, 1),
            RequestKind::Multiple => (2, 4),
            RequestKind::Variations => (1, 4),
        }
    }

    fn variant_kind(self) -> Option<VariantKind> {
        match self {
            RequestKind::Single => None,
            RequestKind::Multiple => Some(VariantKind::Numbered),
            RequestKind::Variations => Some(VariantKind::Variation),
        }
    }
}

/// Validation error details for a generation request.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// One logical generation request, already parsed into typed parameters.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: RequestKind,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub size: ImageSize,
    /// Number of images to produce
    pub count: usize,
    /// 0.0-1.0; how far diversified prompts may stray from the base prompt
    pub diversity: f64,
    /// Reference images (variations only)
    pub reference_paths: Vec<PathBuf>,
}

impl GenerationRequest {
    pub fn single(prompt: String, aspect_ratio: AspectRatio, size: ImageSize) -> Self {
        Self {
            kind: RequestKind::Single,
            prompt,
            aspect_ratio,
            size,
            count: 1,
            diversity: 0.0,
            reference_paths: Vec::new(),
        }
    }

    pub fn multiple(
        prompt: String,
        count: usize,
        aspect_ratio: AspectRatio,
        size: ImageSize,
        diversity: f64,
    ) -> Self {
        Self {
            kind: RequestKind::Multiple,
            prompt,
            aspect_ratio,
            size,
            count,
            diversity,
            reference_paths: Vec::new(),
        }
    }

    pub fn variations(
        prompt: String,
        reference_paths: Vec<PathBuf>,
        count: usize,
        aspect_ratio: AspectRatio,
        size: ImageSize,
    ) -> Self {
        Self {
            kind: RequestKind::Variations,
            prompt,
            aspect_ratio,
            size,
            count,
            diversity: 0.0,
            reference_paths,
        }
    }

    /// Validate the request shape.
    ///
    /// Collects every failure so callers can report all problems at once.
    /// No external call is made until validation passes.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.prompt.trim().is_empty() {
            errors.push(ValidationError::new("prompt", "Prompt cannot be empty"));
        }

        let (min, max) = self.kind.count_bounds();
        if self.count < min || self.count > max {
            errors.push(ValidationError::new(
                "count",
                format!("count must be between {} and {}, got {}", min, max, self.count),
            ));
        }

        if !(0.0..=1.0).contains(&self.diversity) {
            errors.push(ValidationError::new(
                "diversity",
                format!("diversity must be between 0.0 and 1.0, got {}", self.diversity),
            ));
        }

        match self.kind {
            RequestKind::Variations => {
                if self.reference_paths.is_empty() {
                    errors.push(ValidationError::new(
                        "image_paths",
                        "At least one reference image path is required",
                    ));
                } else if self.reference_paths.len() > MAX_REFERENCE_IMAGES {
                    errors.push(ValidationError::new(
                        "image_paths",
                        format!("Maximum {} reference images supported", MAX_REFERENCE_IMAGES),
                    ));
                }
                for path in &self.reference_paths {
                    if !path.exists() {
                        errors.push(ValidationError::new(
                            "image_paths",
                            format!("Image not found: {}", path.display()),
                        ));
                    } else if !path.is_file() {
                        errors.push(ValidationError::new(
                            "image_paths",
                            format!("Not a file: {}", path.display()),
                        ));
                    }
                }
            }
            _ => {
                if !self.reference_paths.is_empty() {
                    errors.push(ValidationError::new(
                        "image_paths",
                        "Reference images are only supported for variations",
                    ));
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// One planned API call within a batch.
#[derive(Debug, Clone)]
pub struct PlannedCall {
    /// 1-based position within the batch
    pub index: usize,
    /// Prompt actually sent for this call (diversified when requested)
    pub prompt: String,
    pub variant: Option<Variant>,
}

/// Ordered per-call sub-requests derived from one GenerationRequest.
/// Always exactly `count` entries, indices contiguous from 1.
#[derive(Debug)]
pub struct VariantPlan {
    pub calls: Vec<PlannedCall>,
}

/// A successfully generated and saved image.
#[derive(Debug, Clone)]
pub struct SavedImage {
    /// Absolute path of the written file
    pub path: PathBuf,
    pub filename: String,
    /// Prompt the image was generated from
    pub prompt: String,
    /// 1-based index within the batch; None for single-image requests
    pub variant_index: Option<usize>,
    pub size_bytes: usize,
    pub size_human: String,
    pub created: DateTime<Local>,
}

/// Outcome of one sub-request within a batch.
#[derive(Debug)]
pub enum ItemOutcome {
    Saved(SavedImage),
    Failed { index: usize, reason: String },
}

impl ItemOutcome {
    pub fn index(&self) -> usize {
        match self {
            ItemOutcome::Saved(img) => img.variant_index.unwrap_or(1),
            ItemOutcome::Failed { index, .. } => *index,
        }
    }

    pub fn saved(&self) -> Option<&SavedImage> {
        match self {
            ItemOutcome::Saved(img) => Some(img),
            ItemOutcome::Failed { .. } => None,
        }
    }
}

/// A file in the generated-images listing.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub size_human: String,
    pub modified: DateTime<Local>,
}

/// Image generation handler: validates requests, plans variants, calls the
/// API sequentially, and persists results.
pub struct ImageHandler {
    config: Config,
    client: GenApiClient,
}

impl ImageHandler {
    pub fn new(config: Config) -> Self {
        let client = GenApiClient::new(config.api_key.clone(), config.api_base_url.clone());
        Self { config, client }
    }

    /// Directory where generated images are written.
    pub fn output_dir(&self) -> PathBuf {
        self.config.output_dir()
    }

    /// Run one generation request to completion.
    ///
    /// Returns the per-index outcomes in order. Transport and API failures
    /// are recorded per item and the batch continues; validation and
    /// filesystem failures propagate and stop the run.
    #[instrument(level = "info", skip(self, request), fields(kind = ?request.kind, count = request.count))]
    pub async fn run(&self, request: GenerationRequest) -> Result<Vec<ItemOutcome>, Error> {
        request.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            Error::validation(messages.join("; "))
        })?;

        let references = load_reference_images(&request.reference_paths).await?;
        let plan = self.build_plan(&request).await;

        let output_dir = self.config.output_dir();
        tokio::fs::create_dir_all(&output_dir).await?;

        // One batch shares one date prefix even across midnight
        let date = Local::now().date_naive();

        let mut outcomes = Vec::with_capacity(plan.calls.len());
        for call in &plan.calls {
            debug!(index = call.index, "Requesting image");
            match self
                .client
                .generate_image(
                    &call.prompt,
                    request.aspect_ratio.as_str(),
                    request.size.as_str(),
                    &references,
                )
                .await
            {
                Ok(bytes) => {
                    let filename = namer::derive_filename(&request.prompt, call.variant, date);
                    let saved = save_image(
                        &output_dir,
                        &filename,
                        &bytes,
                        &call.prompt,
                        call.variant.map(|v| v.index),
                    )
                    .await?;
                    info!(path = %saved.path.display(), size_bytes = saved.size_bytes, "Image saved");
                    outcomes.push(ItemOutcome::Saved(saved));
                }
                Err(err) if err.is_per_call() => {
                    warn!(index = call.index, error = %err, "Variant failed, continuing batch");
                    outcomes.push(ItemOutcome::Failed {
                        index: call.index,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(outcomes)
    }

    /// Build the per-call plan for a request.
    ///
    /// With `diversity > 0` and more than one image, prompts are rewritten by
    /// the chat model; if that fails the base prompt is reused verbatim so
    /// the batch still runs with its subject intact.
    async fn build_plan(&self, request: &GenerationRequest) -> VariantPlan {
        let prompts = if request.diversity > 0.0 && request.count > 1 {
            match self
                .client
                .prompt_variations(&request.prompt, request.count, request.diversity)
                .await
            {
                Ok(variants) => variants,
                Err(err) => {
                    warn!(error = %err, "Prompt diversification failed, using base prompt for all variants");
                    vec![request.prompt.clone(); request.count]
                }
            }
        } else {
            vec![request.prompt.clone(); request.count]
        };

        // A batch that yields a single file gets no suffix
        let variant_kind = if request.count == 1 {
            None
        } else {
            request.kind.variant_kind()
        };

        let calls = prompts
            .into_iter()
            .enumerate()
            .map(|(i, prompt)| PlannedCall {
                index: i + 1,
                prompt,
                variant: variant_kind.map(|kind| Variant { kind, index: i + 1 }),
            })
            .collect();

        VariantPlan { calls }
    }

    /// List generated images, most recent first.
    pub async fn list_images(&self, limit: usize) -> Result<Vec<ImageEntry>, Error> {
        if limit == 0 {
            return Err(Error::validation("limit must be a positive integer"));
        }

        let output_dir = self.config.output_dir();
        if !output_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&output_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| {
                    let ext = e.to_ascii_lowercase();
                    LISTED_EXTENSIONS.contains(&ext.as_str())
                })
                .unwrap_or(false);
            if !is_image {
                continue;
            }

            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta
                .modified()
                .map(DateTime::<Local>::from)
                .unwrap_or_else(|_| Local::now());

            entries.push(ImageEntry {
                filename: entry.file_name().to_string_lossy().into_owned(),
                path,
                size_bytes: meta.len(),
                size_human: format_size(meta.len()),
                modified,
            });
        }

        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        entries.truncate(limit);
        Ok(entries)
    }
}

/// Read reference images into memory, guessing mime types from extensions.
async fn load_reference_images(paths: &[PathBuf]) -> Result<Vec<ReferenceImage>, Error> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path).await.map_err(|e| {
            Error::validation(format!("Error reading {}: {}", path.display(), e))
        })?;
        images.push(ReferenceImage {
            data,
            mime_type: mime_for_path(path).to_string(),
        });
    }
    Ok(images)
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// Write image bytes under the derived name.
///
/// A pre-existing file with the same name gets a numeric disambiguator
/// (`_1`, `_2`, ...) before the extension, so two same-second runs with the
/// same prompt never overwrite each other.
async fn save_image(
    output_dir: &Path,
    filename: &str,
    bytes: &[u8],
    prompt: &str,
    variant_index: Option<usize>,
) -> Result<SavedImage, Error> {
    let mut filepath = output_dir.join(filename);
    let stem = filepath
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string();

    let mut counter = 1;
    while tokio::fs::try_exists(&filepath).await.unwrap_or(false) {
        filepath = output_dir.join(format!("{}_{}.{}", stem, counter, namer::IMAGE_EXTENSION));
        counter += 1;
    }

    tokio::fs::write(&filepath, bytes).await?;

    let path = if filepath.is_absolute() {
        filepath
    } else {
        std::env::current_dir()?.join(filepath)
    };

    Ok(SavedImage {
        filename: path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename)
            .to_string(),
        path,
        prompt: prompt.to_string(),
        variant_index,
        size_bytes: bytes.len(),
        size_human: format_size(bytes.len() as u64),
        created: Local::now(),
    })
}

/// Convert bytes to a human-readable size.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: RequestKind, count: usize) -> GenerationRequest {
        GenerationRequest {
            kind,
            prompt: "a cute robot waving".to_string(),
            aspect_ratio: AspectRatio::default(),
            size: ImageSize::default(),
            count,
            diversity: 0.0,
            reference_paths: Vec::new(),
        }
    }

    #[test]
    fn aspect_ratio_parses_all_ten() {
        let all = ["1:1", "16:9", "9:16", "4:3", "3:4", "3:2", "2:3", "21:9", "9:21", "5:4"];
        for raw in all {
            let parsed = AspectRatio::parse(raw);
            assert!(parsed.is_some(), "{} should parse", raw);
            assert_eq!(parsed.unwrap().as_str(), raw);
        }
        assert!(AspectRatio::parse("2:1").is_none());
        assert!(AspectRatio::parse("").is_none());
    }

    #[test]
    fn image_size_parses_known_values() {
        assert_eq!(ImageSize::parse("1K"), Some(ImageSize::Small));
        assert_eq!(ImageSize::parse("2K"), Some(ImageSize::Medium));
        assert_eq!(ImageSize::parse("4K"), Some(ImageSize::Large));
        assert!(ImageSize::parse("2k").is_none());
        assert!(ImageSize::parse("8K").is_none());
    }

    #[test]
    fn defaults_are_square_2k() {
        assert_eq!(AspectRatio::default().as_str(), "1:1");
        assert_eq!(ImageSize::default().as_str(), "2K");
    }

    #[test]
    fn single_request_accepts_only_count_one() {
        assert!(request(RequestKind::Single, 1).validate().is_ok());
        assert!(request(RequestKind::Single, 2).validate().is_err());
    }

    #[test]
    fn multiple_request_bounds_are_two_to_four() {
        assert!(request(RequestKind::Multiple, 1).validate().is_err());
        assert!(request(RequestKind::Multiple, 2).validate().is_ok());
        assert!(request(RequestKind::Multiple, 4).validate().is_ok());
        assert!(request(RequestKind::Multiple, 5).validate().is_err());
    }

    #[test]
    fn variations_request_bounds_are_one_to_four() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("ref.jpg");
        std::fs::write(&img, b"jpeg").unwrap();

        let mut req = request(RequestKind::Variations, 1);
        req.reference_paths = vec![img.clone()];
        assert!(req.validate().is_ok());

        req.count = 4;
        assert!(req.validate().is_ok());

        req.count = 5;
        assert!(req.validate().is_err());

        req.count = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn variations_require_one_to_fourteen_reference_paths() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("ref.jpg");
        std::fs::write(&img, b"jpeg").unwrap();

        let mut req = request(RequestKind::Variations, 2);
        let errors = req.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "image_paths"));

        req.reference_paths = vec![img.clone(); 15];
        let errors = req.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("Maximum 14")));

        req.reference_paths = vec![img; 14];
        assert!(req.validate().is_ok());
    }

    #[test]
    fn variations_reject_missing_reference_file() {
        let mut req = request(RequestKind::Variations, 2);
        req.reference_paths = vec![PathBuf::from("/definitely/not/here.jpg")];
        let errors = req.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("Image not found")));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let mut req = request(RequestKind::Single, 1);
        req.prompt = "   ".to_string();
        let errors = req.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "prompt"));
    }

    #[test]
    fn diversity_out_of_range_is_rejected() {
        let mut req = request(RequestKind::Multiple, 4);
        req.diversity = 1.5;
        assert!(req.validate().is_err());
        req.diversity = -0.1;
        assert!(req.validate().is_err());
        req.diversity = 1.0;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn validation_collects_all_errors() {
        let mut req = request(RequestKind::Multiple, 9);
        req.prompt = String::new();
        req.diversity = 2.0;
        let errors = req.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"prompt"));
        assert!(fields.contains(&"count"));
        assert!(fields.contains(&"diversity"));
    }

    #[test]
    fn mime_guessing_defaults_to_jpeg() {
        assert_eq!(mime_for_path(Path::new("a.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_for_path(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("noext")), "image/jpeg");
    }

    #[test]
    fn format_size_steps_through_units() {
        assert_eq!(format_size(512), "512.0 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    fn test_handler() -> ImageHandler {
        ImageHandler::new(Config {
            api_key: "sk-test".to_string(),
            api_base_url: "http://127.0.0.1:9".to_string(),
            vault_path: PathBuf::from("/tmp/vault"),
            graphics_folder: "AI graphics".to_string(),
            port: 8080,
        })
    }

    #[tokio::test]
    async fn plan_without_diversity_repeats_base_prompt() {
        let handler = test_handler();
        let plan = handler.build_plan(&request(RequestKind::Multiple, 4)).await;

        assert_eq!(plan.calls.len(), 4);
        for (i, call) in plan.calls.iter().enumerate() {
            assert_eq!(call.index, i + 1);
            assert_eq!(call.prompt, "a cute robot waving");
            let variant = call.variant.expect("multiple should carry variants");
            assert_eq!(variant.kind, VariantKind::Numbered);
            assert_eq!(variant.index, i + 1);
        }
    }

    #[tokio::test]
    async fn plan_for_single_request_has_no_variant() {
        let handler = test_handler();
        let plan = handler.build_plan(&request(RequestKind::Single, 1)).await;
        assert_eq!(plan.calls.len(), 1);
        assert_eq!(plan.calls[0].index, 1);
        assert!(plan.calls[0].variant.is_none());
    }

    #[tokio::test]
    async fn plan_for_one_variation_has_no_suffix() {
        let handler = test_handler();
        let plan = handler.build_plan(&request(RequestKind::Variations, 1)).await;
        assert!(plan.calls[0].variant.is_none());
    }

    #[tokio::test]
    async fn plan_for_variations_uses_var_suffix() {
        let handler = test_handler();
        let plan = handler.build_plan(&request(RequestKind::Variations, 3)).await;
        assert_eq!(plan.calls.len(), 3);
        for call in &plan.calls {
            assert_eq!(call.variant.unwrap().kind, VariantKind::Variation);
        }
    }

    #[tokio::test]
    async fn diversification_failure_falls_back_to_base_prompt() {
        // The client points at a closed port, so prompt_variations errors
        let handler = test_handler();
        let mut req = request(RequestKind::Multiple, 3);
        req.diversity = 0.8;
        let plan = handler.build_plan(&req).await;

        assert_eq!(plan.calls.len(), 3);
        for call in &plan.calls {
            assert_eq!(call.prompt, "a cute robot waving");
        }
    }

    #[tokio::test]
    async fn save_image_disambiguates_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let first = save_image(dir.path(), "2026-01-19_cat.jpg", b"one", "cat", None)
            .await
            .unwrap();
        let second = save_image(dir.path(), "2026-01-19_cat.jpg", b"two", "cat", None)
            .await
            .unwrap();
        let third = save_image(dir.path(), "2026-01-19_cat.jpg", b"three", "cat", None)
            .await
            .unwrap();

        assert_eq!(first.filename, "2026-01-19_cat.jpg");
        assert_eq!(second.filename, "2026-01-19_cat_1.jpg");
        assert_eq!(third.filename, "2026-01-19_cat_2.jpg");
        assert_eq!(std::fs::read(&first.path).unwrap(), b"one");
        assert_eq!(std::fs::read(&second.path).unwrap(), b"two");
        assert_eq!(std::fs::read(&third.path).unwrap(), b"three");
    }

    #[tokio::test]
    async fn save_image_records_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let saved = save_image(dir.path(), "2026-01-19_cat_v2.jpg", b"bytes", "cat", Some(2))
            .await
            .unwrap();
        assert!(saved.path.is_absolute());
        assert_eq!(saved.variant_index, Some(2));
        assert_eq!(saved.size_bytes, 5);
        assert_eq!(saved.size_human, "5.0 B");
        assert_eq!(saved.prompt, "cat");
    }

    #[tokio::test]
    async fn list_images_missing_dir_is_empty() {
        let handler = ImageHandler::new(Config {
            api_key: "sk-test".to_string(),
            api_base_url: "http://127.0.0.1:9".to_string(),
            vault_path: PathBuf::from("/definitely/not/here"),
            graphics_folder: "AI graphics".to_string(),
            port: 8080,
        });
        let entries = handler.list_images(20).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn list_images_rejects_zero_limit() {
        let handler = test_handler();
        assert!(handler.list_images(0).await.is_err());
    }
}
