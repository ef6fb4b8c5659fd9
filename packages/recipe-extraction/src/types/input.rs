//! Pipeline input - a recipe page URL or a set of photographs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{ExtractionError, Result};

const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

/// Exactly one input form per invocation.
#[derive(Debug, Clone)]
pub enum RecipeInput {
    Url(String),
    Images(Vec<InlineImage>),
}

impl RecipeInput {
    /// Build from the loosely-typed API body (`{ url?, images? }`).
    pub fn from_parts(url: Option<String>, images: Option<Vec<String>>) -> Result<Self> {
        let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        let images = images.filter(|imgs| !imgs.is_empty());

        match (url, images) {
            (Some(url), None) => Ok(Self::Url(url)),
            (None, Some(images)) => {
                let images = images
                    .iter()
                    .map(|payload| InlineImage::from_base64(payload))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Images(images))
            }
            (Some(_), Some(_)) => Err(ExtractionError::invalid_input("链接和图片只能选择一种")),
            (None, None) => Err(ExtractionError::invalid_input("请提供链接或图片")),
        }
    }
}

/// A base64 image sent inline to the inference service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub media_type: String,
    /// Base64 payload without any `data:` prefix.
    pub data: String,
}

impl InlineImage {
    /// Accepts raw base64 or a `data:image/<type>;base64,` URL.
    pub fn from_base64(payload: &str) -> Result<Self> {
        let payload = payload.trim();

        let (media_type, data) = match payload.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest
                    .split_once(',')
                    .ok_or_else(|| ExtractionError::invalid_input("图片格式无效"))?;
                let media_type = header.strip_suffix(";base64").unwrap_or(header);
                let media_type = if media_type.starts_with("image/") {
                    media_type
                } else {
                    DEFAULT_MEDIA_TYPE
                };
                (media_type.to_string(), data)
            }
            None => (DEFAULT_MEDIA_TYPE.to_string(), payload),
        };

        if data.is_empty() || STANDARD.decode(data).is_err() {
            return Err(ExtractionError::invalid_input("图片格式无效"));
        }

        Ok(Self {
            media_type,
            data: data.to_string(),
        })
    }
}
