//! Generation request DTOs

use serde::{Deserialize, Serialize};

/// Kind of generation, which also selects the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    #[serde(rename = "text2image")]
    TextToImage,
    #[serde(rename = "text2video")]
    TextToVideo,
    #[serde(rename = "image2video")]
    ImageToVideo,
    Speak,
}

impl GenerationKind {
    /// Path segment of the submission endpoint
    pub fn path_segment(self) -> &'static str {
        match self {
            GenerationKind::TextToImage => "text2image",
            GenerationKind::TextToVideo => "text2video",
            GenerationKind::ImageToVideo => "image2video",
            GenerationKind::Speak => "speak",
        }
    }

    /// Model used when the caller does not pick one
    pub fn default_model(self) -> &'static str {
        match self {
            GenerationKind::TextToImage => "nano-banana",
            GenerationKind::TextToVideo => "seedance-v1-lite-t2v",
            GenerationKind::ImageToVideo => "kling-2-5",
            GenerationKind::Speak => "veo3",
        }
    }
}

impl std::fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextToImageParams {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width_and_height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub enhance_prompt: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextToVideoParams {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub camera_fixed: bool,
}

/// Source image for image-to-video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputImage {
    #[serde(rename = "type")]
    pub kind: String,
    pub image_url: String,
}

impl InputImage {
    pub fn url(image_url: impl Into<String>) -> Self {
        Self {
            kind: "image_url".to_string(),
            image_url: image_url.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageToVideoParams {
    pub prompt: String,
    pub input_images: Vec<InputImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_control: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<u32>,
    #[serde(default)]
    pub enhance_prompt: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeakParams {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub enhance_prompt: bool,
}

/// Parameters of one generation, tagged by kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "lowercase")]
pub enum GenerationParams {
    #[serde(rename = "text2image")]
    TextToImage(TextToImageParams),
    #[serde(rename = "text2video")]
    TextToVideo(TextToVideoParams),
    #[serde(rename = "image2video")]
    ImageToVideo(ImageToVideoParams),
    Speak(SpeakParams),
}

impl GenerationParams {
    pub fn kind(&self) -> GenerationKind {
        match self {
            GenerationParams::TextToImage(_) => GenerationKind::TextToImage,
            GenerationParams::TextToVideo(_) => GenerationKind::TextToVideo,
            GenerationParams::ImageToVideo(_) => GenerationKind::ImageToVideo,
            GenerationParams::Speak(_) => GenerationKind::Speak,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            GenerationParams::TextToImage(p) => &p.prompt,
            GenerationParams::TextToVideo(p) => &p.prompt,
            GenerationParams::ImageToVideo(p) => &p.prompt,
            GenerationParams::Speak(p) => &p.prompt,
        }
    }
}

/// A generation to submit: target model plus parameters
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub params: GenerationParams,
}

impl GenerationRequest {
    /// Builds a request for the default model of the parameter kind
    pub fn with_default_model(params: GenerationParams) -> Self {
        Self {
            model: params.kind().default_model().to_string(),
            params,
        }
    }

    pub fn kind(&self) -> GenerationKind {
        self.params.kind()
    }
}

/// Body posted to the submission endpoint
#[derive(Debug, Serialize)]
pub struct SubmitBody<'a, P: Serialize> {
    pub params: &'a P,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models_follow_kind() {
        let request = GenerationRequest::with_default_model(GenerationParams::TextToVideo(
            TextToVideoParams {
                prompt: "a fox".to_string(),
                ..Default::default()
            },
        ));
        assert_eq!(request.model, "seedance-v1-lite-t2v");
        assert_eq!(request.kind().path_segment(), "text2video");
    }

    #[test]
    fn test_params_skip_unset_fields() {
        let params = TextToImageParams {
            prompt: "a lighthouse".to_string(),
            batch_size: Some(2),
            ..Default::default()
        };
        let json = serde_json::to_value(SubmitBody { params: &params }).unwrap();
        assert_eq!(json["params"]["prompt"], "a lighthouse");
        assert_eq!(json["params"]["batch_size"], 2);
        assert!(json["params"].get("quality").is_none());
    }

    #[test]
    fn test_input_image_uses_type_key() {
        let json = serde_json::to_value(InputImage::url("https://x/in.png")).unwrap();
        assert_eq!(json["type"], "image_url");
        assert_eq!(json["image_url"], "https://x/in.png");
    }
}
