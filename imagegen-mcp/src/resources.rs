//! MCP resources describing the fixed generation enumerations.
//!
//! - `imagegen://aspect_ratios` - supported aspect ratios
//! - `imagegen://sizes` - supported resolutions

use crate::handler::{AspectRatio, ImageSize};
use serde_json::json;

const ASPECT_RATIOS_URI: &str = "imagegen://aspect_ratios";
const SIZES_URI: &str = "imagegen://sizes";

/// All resources this server publishes.
pub fn list() -> Vec<rmcp::model::Resource> {
    vec![
        resource(
            ASPECT_RATIOS_URI,
            "Supported Aspect Ratios",
            "Aspect ratios accepted by the generation tools",
        ),
        resource(
            SIZES_URI,
            "Supported Image Sizes",
            "Resolutions accepted by the generation tools",
        ),
    ]
}

/// Resolve a resource URI to its JSON content.
pub fn read(uri: &str) -> Option<String> {
    match uri {
        ASPECT_RATIOS_URI => Some(aspect_ratios_json()),
        SIZES_URI => Some(sizes_json()),
        _ => None,
    }
}

fn resource(uri: &str, name: &str, description: &str) -> rmcp::model::Resource {
    rmcp::model::Resource {
        raw: rmcp::model::RawResource {
            uri: uri.to_string(),
            name: name.to_string(),
            title: None,
            description: Some(description.to_string()),
            mime_type: Some("application/json".to_string()),
            size: None,
            icons: None,
            meta: None,
        },
        annotations: None,
    }
}

fn aspect_ratios_json() -> String {
    let ratios: Vec<_> = AspectRatio::ALL
        .iter()
        .map(|r| json!({ "value": r.as_str() }))
        .collect();
    serde_json::to_string_pretty(&json!({ "aspect_ratios": ratios, "default": "1:1" }))
        .unwrap_or_default()
}

fn sizes_json() -> String {
    let sizes: Vec<_> = ImageSize::ALL
        .iter()
        .map(|s| {
            let note = match s {
                ImageSize::Small => "fastest",
                ImageSize::Medium => "default balance",
                ImageSize::Large => "highest quality",
            };
            json!({ "value": s.as_str(), "note": note })
        })
        .collect();
    serde_json::to_string_pretty(&json!({ "sizes": sizes, "default": "2K" })).unwrap_or_default()
}
