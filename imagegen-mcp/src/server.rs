//! MCP server exposing the image generation tools.
//!
//! Four tools are published:
//! - `generate_image`: one image from a text prompt
//! - `generate_multiple`: 2-4 images from the same prompt, optionally diversified
//! - `generate_variations`: 1-4 variations guided by reference images
//! - `list_generated_images`: recent files in the vault's graphics folder

use crate::handler::{
    AspectRatio, GenerationRequest, ImageHandler, ImageSize, ItemOutcome, format_size,
};
use crate::resources;
use imagegen_mcp_common::config::Config;
use imagegen_mcp_common::error::Error;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{
        CallToolResult, Content, ListResourcesResult, ReadResourceResult, ResourceContents,
        ServerCapabilities, ServerInfo,
    },
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// MCP server for vault image generation.
#[derive(Clone)]
pub struct ImageServer {
    handler: Arc<ImageHandler>,
}

/// Tool parameters for generate_image.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateImageParams {
    /// Text description of the desired image
    pub prompt: String,
    /// Aspect ratio: 1:1, 16:9, 9:16, 4:3, 3:4, 3:2, 2:3, 21:9, 9:21, 5:4 (default: 1:1)
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    /// Resolution: 1K (fast), 2K (default), 4K (highest quality)
    #[serde(default)]
    pub size: Option<String>,
}

/// Tool parameters for generate_multiple.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateMultipleParams {
    /// Text description of the desired image
    pub prompt: String,
    /// Number of images to generate, 2-4 (default: 4)
    #[serde(default)]
    pub count: Option<usize>,
    /// Aspect ratio: 1:1, 16:9, 9:16, 4:3, 3:4, 3:2, 2:3, 21:9, 9:21, 5:4 (default: 1:1)
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    /// Resolution: 1K (fast), 2K (default), 4K (highest quality)
    #[serde(default)]
    pub size: Option<String>,
    /// 0.0-1.0: how much each image's prompt may diverge from the base prompt (default: 0.0)
    #[serde(default)]
    pub diversity: Option<f64>,
}

/// Tool parameters for generate_variations.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateVariationsParams {
    /// Paths to reference images (1-14 supported)
    pub image_paths: Vec<String>,
    /// Text guiding the variation (e.g., "in watercolor style")
    pub prompt: String,
    /// Number of variations to generate, 1-4 (default: 4)
    #[serde(default)]
    pub count: Option<usize>,
    /// Aspect ratio: 1:1, 16:9, 9:16, 4:3, 3:4, 3:2, 2:3, 21:9, 9:21, 5:4 (default: 1:1)
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    /// Resolution: 1K (fast), 2K (default), 4K (highest quality)
    #[serde(default)]
    pub size: Option<String>,
}

/// Tool parameters for list_generated_images.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListImagesParams {
    /// Maximum number of images to list (default: 20)
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ImageServer {
    pub fn new(config: Config) -> Self {
        Self {
            handler: Arc::new(ImageHandler::new(config)),
        }
    }

    /// Generate a single image from a text prompt.
    pub async fn generate_image(
        &self,
        params: GenerateImageParams,
    ) -> Result<CallToolResult, McpError> {
        info!(prompt = %params.prompt, "Generating image");

        let request = GenerationRequest::single(
            params.prompt,
            parse_aspect_ratio(params.aspect_ratio)?,
            parse_size(params.size)?,
        );

        let outcomes = self.handler.run(request).await.map_err(to_mcp_error)?;
        let saved = match outcomes.into_iter().next() {
            Some(ItemOutcome::Saved(img)) => img,
            Some(ItemOutcome::Failed { reason, .. }) => {
                return Err(McpError::internal_error(
                    format!("Image generation failed: {}", reason),
                    None,
                ));
            }
            None => {
                return Err(McpError::internal_error("No image was generated", None));
            }
        };

        let text = format!(
            "Image generated successfully!\n\n\
             **File:** {}\n\
             **Path:** {}\n\
             **Size:** {}\n\n\
             The image has been saved to your vault's AI graphics folder.",
            saved.filename,
            saved.path.display(),
            saved.size_human,
        );
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Generate multiple images from the same prompt.
    pub async fn generate_multiple(
        &self,
        params: GenerateMultipleParams,
    ) -> Result<CallToolResult, McpError> {
        info!(prompt = %params.prompt, count = ?params.count, "Generating multiple images");

        let request = GenerationRequest::multiple(
            params.prompt,
            params.count.unwrap_or(4),
            parse_aspect_ratio(params.aspect_ratio)?,
            parse_size(params.size)?,
            params.diversity.unwrap_or(0.0),
        );

        let outcomes = self.handler.run(request).await.map_err(to_mcp_error)?;
        let text = self.format_batch(&outcomes, None);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Generate variations guided by reference images.
    pub async fn generate_variations(
        &self,
        params: GenerateVariationsParams,
    ) -> Result<CallToolResult, McpError> {
        info!(
            prompt = %params.prompt,
            references = params.image_paths.len(),
            "Generating variations"
        );

        let reference_count = params.image_paths.len();
        let request = GenerationRequest::variations(
            params.prompt,
            params.image_paths.into_iter().map(PathBuf::from).collect(),
            params.count.unwrap_or(4),
            parse_aspect_ratio(params.aspect_ratio)?,
            parse_size(params.size)?,
        );

        let outcomes = self.handler.run(request).await.map_err(to_mcp_error)?;
        let text = self.format_batch(&outcomes, Some(reference_count));
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// List recently generated images.
    pub async fn list_generated_images(
        &self,
        params: ListImagesParams,
    ) -> Result<CallToolResult, McpError> {
        let limit = params.limit.unwrap_or(20);
        debug!(limit, "Listing generated images");

        let entries = self.handler.list_images(limit).await.map_err(to_mcp_error)?;
        let output_dir = self.handler.output_dir();

        if entries.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(format!(
                "No images found in {}",
                output_dir.display()
            ))]));
        }

        let mut lines = vec![format!(
            "**Recent images in AI graphics folder** (showing {}):\n",
            entries.len()
        )];
        for entry in &entries {
            lines.push(format!(
                "- **{}** | {} | {}",
                entry.filename,
                entry.modified.format("%Y-%m-%d %H:%M"),
                entry.size_human,
            ));
        }
        lines.push(format!("\n**Folder:** {}", output_dir.display()));

        Ok(CallToolResult::success(vec![Content::text(lines.join("\n"))]))
    }

    /// Render per-item batch results. Partial completion is always visible:
    /// the headline counts successes against the batch size and every failed
    /// index is listed with its reason.
    fn format_batch(&self, outcomes: &[ItemOutcome], reference_count: Option<usize>) -> String {
        let saved: Vec<_> = outcomes.iter().filter_map(|o| o.saved()).collect();
        let total_size: usize = saved.iter().map(|img| img.size_bytes).sum();

        let mut lines = vec![match reference_count {
            Some(refs) => format!(
                "Generated {} of {} variations from {} reference image(s)!\n",
                saved.len(),
                outcomes.len(),
                refs
            ),
            None => format!("Generated {} of {} images!\n", saved.len(), outcomes.len()),
        }];

        for outcome in outcomes {
            match outcome {
                ItemOutcome::Saved(img) => {
                    lines.push(format!("- **{}** ({})", img.filename, img.size_human));
                }
                ItemOutcome::Failed { index, reason } => {
                    lines.push(format!("- Variant {} failed: {}", index, reason));
                }
            }
        }

        lines.push(format!("\n**Total size:** {}", format_size(total_size as u64)));
        lines.push(format!("**Location:** {}", self.handler.output_dir().display()));
        lines.join("\n")
    }
}

fn parse_aspect_ratio(raw: Option<String>) -> Result<AspectRatio, McpError> {
    let raw = raw.unwrap_or_else(|| AspectRatio::default().as_str().to_string());
    AspectRatio::parse(&raw).ok_or_else(|| {
        McpError::invalid_params(
            format!(
                "Invalid aspect ratio '{}'. Valid options: {}",
                raw,
                AspectRatio::options()
            ),
            None,
        )
    })
}

fn parse_size(raw: Option<String>) -> Result<ImageSize, McpError> {
    let raw = raw.unwrap_or_else(|| ImageSize::default().as_str().to_string());
    ImageSize::parse(&raw).ok_or_else(|| {
        McpError::invalid_params(
            format!("Invalid size '{}'. Valid options: {}", raw, ImageSize::options()),
            None,
        )
    })
}

fn to_mcp_error(err: Error) -> McpError {
    match err {
        Error::Validation(_) => McpError::invalid_params(err.to_string(), None),
        _ => McpError::internal_error(err.to_string(), None),
    }
}

fn tool_input_schema<T: JsonSchema>() -> Arc<serde_json::Map<String, serde_json::Value>> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema).unwrap_or_default() {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    }
}

fn tool(name: &'static str, description: &'static str, input_schema: Arc<serde_json::Map<String, serde_json::Value>>) -> rmcp::model::Tool {
    rmcp::model::Tool {
        name: Cow::Borrowed(name),
        description: Some(Cow::Borrowed(description)),
        input_schema,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }
}

impl ServerHandler for ImageServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Generate images with the laozhang.ai Gemini image API and save them \
                 into an Obsidian vault. Use generate_image for one image, \
                 generate_multiple to explore several takes on a prompt, \
                 generate_variations to riff on reference images, and \
                 list_generated_images to see recent output."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::ListToolsResult, McpError>> + Send + '_
    {
        async move {
            Ok(rmcp::model::ListToolsResult {
                tools: vec![
                    tool(
                        "generate_image",
                        "Generate a single image from a text prompt and save it to the vault.",
                        tool_input_schema::<GenerateImageParams>(),
                    ),
                    tool(
                        "generate_multiple",
                        "Generate 2-4 images from the same prompt, useful for exploring \
                         different interpretations. Set diversity above 0.0 to let each \
                         image's prompt diverge creatively from the original.",
                        tool_input_schema::<GenerateMultipleParams>(),
                    ),
                    tool(
                        "generate_variations",
                        "Generate 1-4 variations based on one or more reference images. \
                         The prompt guides how the references are reinterpreted.",
                        tool_input_schema::<GenerateVariationsParams>(),
                    ),
                    tool(
                        "list_generated_images",
                        "List recently generated images in the vault's AI graphics folder.",
                        tool_input_schema::<ListImagesParams>(),
                    ),
                ],
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            match params.name.as_ref() {
                "generate_image" => {
                    self.generate_image(parse_tool_params(params.arguments)?).await
                }
                "generate_multiple" => {
                    self.generate_multiple(parse_tool_params(params.arguments)?).await
                }
                "generate_variations" => {
                    self.generate_variations(parse_tool_params(params.arguments)?).await
                }
                "list_generated_images" => {
                    self.list_generated_images(parse_tool_params(params.arguments)?).await
                }
                _ => Err(McpError::invalid_params(
                    format!("Unknown tool: {}", params.name),
                    None,
                )),
            }
        }
    }

    fn list_resources(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            Ok(ListResourcesResult {
                resources: resources::list(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn read_resource(
        &self,
        params: rmcp::model::ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let uri = &params.uri;
            debug!(uri = %uri, "Reading resource");

            let content = resources::read(uri).ok_or_else(|| {
                McpError::resource_not_found(format!("Unknown resource: {}", uri), None)
            })?;

            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(content, uri.clone())],
            })
        }
    }
}

fn parse_tool_params<T: serde::de::DeserializeOwned>(
    arguments: Option<serde_json::Map<String, serde_json::Value>>,
) -> Result<T, McpError> {
    arguments
        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
        .transpose()
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))?
        .ok_or_else(|| McpError::invalid_params("Missing parameters", None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_server() -> ImageServer {
        ImageServer::new(Config {
            api_key: "sk-test".to_string(),
            api_base_url: "http://127.0.0.1:9".to_string(),
            vault_path: PathBuf::from("/tmp/vault"),
            graphics_folder: "AI graphics".to_string(),
            port: 8080,
        })
    }

    #[test]
    fn server_info_advertises_tools_and_resources() {
        let info = test_server().get_info();
        assert!(info.instructions.is_some());
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }

    #[test]
    fn parse_aspect_ratio_defaults_to_square() {
        assert_eq!(parse_aspect_ratio(None).unwrap(), AspectRatio::Square);
        assert_eq!(
            parse_aspect_ratio(Some("16:9".to_string())).unwrap(),
            AspectRatio::Wide16x9
        );
    }

    #[test]
    fn parse_aspect_ratio_lists_options_on_error() {
        let err = parse_aspect_ratio(Some("2:1".to_string())).unwrap_err();
        assert!(err.message.contains("2:1"));
        assert!(err.message.contains("21:9"));
    }

    #[test]
    fn parse_size_defaults_to_2k() {
        assert_eq!(parse_size(None).unwrap(), ImageSize::Medium);
        assert!(parse_size(Some("8K".to_string())).is_err());
    }

    #[test]
    fn tool_params_deserialize_with_defaults() {
        let params: GenerateMultipleParams = serde_json::from_str(r#"{"prompt": "a cat"}"#).unwrap();
        assert_eq!(params.prompt, "a cat");
        assert!(params.count.is_none());
        assert!(params.diversity.is_none());

        let params: ListImagesParams = serde_json::from_str("{}").unwrap();
        assert!(params.limit.is_none());
    }

    #[test]
    fn missing_arguments_are_rejected() {
        let result: Result<ListImagesParams, _> = parse_tool_params(None);
        assert!(result.is_err());
    }

    #[test]
    fn format_batch_reports_partial_completion() {
        use crate::handler::SavedImage;
        use chrono::Local;

        let server = test_server();
        let outcomes = vec![
            ItemOutcome::Saved(SavedImage {
                path: PathBuf::from("/tmp/vault/AI graphics/2026-01-19_cat_v1.jpg"),
                filename: "2026-01-19_cat_v1.jpg".to_string(),
                prompt: "cat".to_string(),
                variant_index: Some(1),
                size_bytes: 2048,
                size_human: "2.0 KB".to_string(),
                created: Local::now(),
            }),
            ItemOutcome::Failed {
                index: 2,
                reason: "Transport error: Request timed out".to_string(),
            },
        ];

        let text = server.format_batch(&outcomes, None);
        assert!(text.contains("Generated 1 of 2 images!"));
        assert!(text.contains("2026-01-19_cat_v1.jpg"));
        assert!(text.contains("Variant 2 failed"));
        assert!(text.contains("Request timed out"));
    }
}
