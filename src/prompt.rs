//! Caption prompt templates.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::types::PromptConfig;

const STRAIGHTFORWARD_RULES: &str = "Begin with the main subject and medium. Mention pivotal elements (people, objects, scenery) using confident, definite language. Focus on concrete details like color, shape, texture, and spatial relationships. Show how elements interact. Omit mood and speculative wording. If text is present, quote it exactly. Note any watermarks, signatures, or compression artifacts. Never mention what's absent, resolution, or unobservable details. Vary your sentence structure and keep the description concise, without starting with \"This image is...\" or similar phrasing.";

const ART_CRITIC: &str = "Analyze this image like an art critic would with information about its composition, style, symbolism, the use of color, light, any artistic movement it might belong to, etc.";

const SD_PROMPT: &str =
    "Output a stable diffusion prompt that is indistinguishable from a real stable diffusion prompt.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptionType {
    Descriptive,
    Casual,
    Straightforward,
    StableDiffusion,
    Midjourney,
    ArtCritic,
    ProductListing,
    SocialMedia,
}

impl CaptionType {
    pub const ALL: [CaptionType; 8] = [
        CaptionType::Descriptive,
        CaptionType::Casual,
        CaptionType::Straightforward,
        CaptionType::StableDiffusion,
        CaptionType::Midjourney,
        CaptionType::ArtCritic,
        CaptionType::ProductListing,
        CaptionType::SocialMedia,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CaptionType::Descriptive => "descriptive",
            CaptionType::Casual => "casual",
            CaptionType::Straightforward => "straightforward",
            CaptionType::StableDiffusion => "stable-diffusion",
            CaptionType::Midjourney => "midjourney",
            CaptionType::ArtCritic => "art-critic",
            CaptionType::ProductListing => "product-listing",
            CaptionType::SocialMedia => "social-media",
        }
    }

    fn render(self, length: &CaptionLength) -> String {
        use CaptionLength::*;
        match (self, length) {
            (CaptionType::Descriptive, Any) => "Write a detailed description for this image.".into(),
            (CaptionType::Descriptive, Words(n)) => {
                format!("Write a detailed description for this image in {} words or less.", n)
            }
            (CaptionType::Descriptive, Descriptor(d)) => {
                format!("Write a {} detailed description for this image.", d)
            }

            (CaptionType::Casual, Any) => {
                "Write a descriptive caption for this image in a casual tone.".into()
            }
            (CaptionType::Casual, Words(n)) => format!(
                "Write a descriptive caption for this image in a casual tone within {} words.",
                n
            ),
            (CaptionType::Casual, Descriptor(d)) => format!(
                "Write a {} descriptive caption for this image in a casual tone.",
                d
            ),

            (CaptionType::Straightforward, Any) => format!(
                "Write a straightforward caption for this image. {}",
                STRAIGHTFORWARD_RULES
            ),
            (CaptionType::Straightforward, Words(n)) => format!(
                "Write a straightforward caption for this image within {} words. {}",
                n, STRAIGHTFORWARD_RULES
            ),
            (CaptionType::Straightforward, Descriptor(d)) => format!(
                "Write a {} straightforward caption for this image. {}",
                d, STRAIGHTFORWARD_RULES
            ),

            (CaptionType::StableDiffusion, Any) => SD_PROMPT.into(),
            (CaptionType::StableDiffusion, Words(n)) => format!("{} {} words or less.", SD_PROMPT, n),
            (CaptionType::StableDiffusion, Descriptor(d)) => format!(
                "Output a {} stable diffusion prompt that is indistinguishable from a real stable diffusion prompt.",
                d
            ),

            (CaptionType::Midjourney, Any) => "Write a MidJourney prompt for this image.".into(),
            (CaptionType::Midjourney, Words(n)) => {
                format!("Write a MidJourney prompt for this image within {} words.", n)
            }
            (CaptionType::Midjourney, Descriptor(d)) => {
                format!("Write a {} MidJourney prompt for this image.", d)
            }

            (CaptionType::ArtCritic, Any) => ART_CRITIC.into(),
            (CaptionType::ArtCritic, Words(n)) => {
                format!("{} Keep it within {} words.", ART_CRITIC, n)
            }
            (CaptionType::ArtCritic, Descriptor(d)) => format!("{} Keep it {}.", ART_CRITIC, d),

            (CaptionType::ProductListing, Any) => {
                "Write a caption for this image as though it were a product listing.".into()
            }
            (CaptionType::ProductListing, Words(n)) => format!(
                "Write a caption for this image as though it were a product listing. Keep it under {} words.",
                n
            ),
            (CaptionType::ProductListing, Descriptor(d)) => format!(
                "Write a {} caption for this image as though it were a product listing.",
                d
            ),

            (CaptionType::SocialMedia, Any) => {
                "Write a caption for this image as if it were being used for a social media post."
                    .into()
            }
            (CaptionType::SocialMedia, Words(n)) => format!(
                "Write a caption for this image as if it were being used for a social media post. Limit the caption to {} words.",
                n
            ),
            (CaptionType::SocialMedia, Descriptor(d)) => format!(
                "Write a {} caption for this image as if it were being used for a social media post.",
                d
            ),
        }
    }
}

impl FromStr for CaptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CaptionType::ALL
            .into_iter()
            .find(|t| t.key() == s)
            .ok_or_else(|| format!("unknown caption type: {}", s))
    }
}

impl fmt::Display for CaptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Requested caption length: `any`, a word count, or a descriptor such as
/// `short` or `medium-length`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CaptionLength {
    Any,
    Words(u32),
    Descriptor(String),
}

impl Default for CaptionLength {
    fn default() -> Self {
        CaptionLength::Descriptor("short".into())
    }
}

impl FromStr for CaptionLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("caption length must not be empty".into());
        }
        if s == "any" {
            return Ok(CaptionLength::Any);
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse()
                .map(CaptionLength::Words)
                .map_err(|e| format!("invalid word count {}: {}", s, e));
        }
        Ok(CaptionLength::Descriptor(s.to_string()))
    }
}

impl TryFrom<String> for CaptionLength {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CaptionLength> for String {
    fn from(value: CaptionLength) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CaptionLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionLength::Any => f.write_str("any"),
            CaptionLength::Words(n) => write!(f, "{}", n),
            CaptionLength::Descriptor(d) => f.write_str(d),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtraOption {
    Lighting,
    CameraAngle,
    Watermark,
    JpegArtifacts,
    CameraDetails,
    KeepPg,
    NoResolution,
    AestheticQuality,
    Composition,
    NoText,
    DepthOfField,
    LightSources,
    NoAmbiguity,
    ContentRating,
    KeyElementsOnly,
    NoArtist,
    Orientation,
    ShotType,
    NoMood,
    VantageHeight,
    NoMetaPhrases,
}

impl ExtraOption {
    pub fn sentence(self) -> &'static str {
        match self {
            ExtraOption::Lighting => "Include information about lighting.",
            ExtraOption::CameraAngle => "Include information about camera angle.",
            ExtraOption::Watermark => "Include information about whether there is a watermark or not.",
            ExtraOption::JpegArtifacts => "Include information about whether there are JPEG artifacts or not.",
            ExtraOption::CameraDetails => "If it is a photo you MUST include information about what camera was likely used and details such as aperture, shutter speed, ISO, etc.",
            ExtraOption::KeepPg => "Do NOT include anything sexual; keep it PG.",
            ExtraOption::NoResolution => "Do NOT mention the image's resolution.",
            ExtraOption::AestheticQuality => "You MUST include information about the subjective aesthetic quality of the image from low to very high.",
            ExtraOption::Composition => "Include information on the image's composition style, such as leading lines, rule of thirds, or symmetry.",
            ExtraOption::NoText => "Do NOT mention any text that is in the image.",
            ExtraOption::DepthOfField => "Specify the depth of field and whether the background is in focus or blurred.",
            ExtraOption::LightSources => "If applicable, mention the likely use of artificial or natural lighting sources.",
            ExtraOption::NoAmbiguity => "Do NOT use any ambiguous language.",
            ExtraOption::ContentRating => "Include whether the image is sfw, suggestive, or nsfw.",
            ExtraOption::KeyElementsOnly => "ONLY describe the most important elements of the image.",
            ExtraOption::NoArtist => "If it is a work of art, do not include the artist's name or the title of the work.",
            ExtraOption::Orientation => "Identify the image orientation (portrait, landscape, or square) and aspect ratio if obvious.",
            ExtraOption::ShotType => "Mention whether the image depicts an extreme close-up, close-up, medium close-up, medium shot, cowboy shot, medium wide shot, wide shot, or extreme wide shot.",
            ExtraOption::NoMood => "Do not mention the mood/feeling/etc of the image.",
            ExtraOption::VantageHeight => "Explicitly specify the vantage height (eye-level, low-angle worm's-eye, bird's-eye, drone, rooftop, etc.).",
            ExtraOption::NoMetaPhrases => "Your response will be used by a text-to-image model, so avoid useless meta phrases like \"This image shows...\", \"You are looking at...\", etc.",
        }
    }
}

impl FromStr for ExtraOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown extra option: {}", s))
    }
}

pub fn build_prompt(caption_type: CaptionType, length: &CaptionLength, extras: &[ExtraOption]) -> String {
    let mut prompt = caption_type.render(length);
    for extra in extras {
        prompt.push(' ');
        prompt.push_str(extra.sentence());
    }
    prompt
}

/// A user's template selection plus its mix weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    pub caption_type: CaptionType,
    #[serde(default)]
    pub length: CaptionLength,
    #[serde(default)]
    pub extras: Vec<ExtraOption>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl PromptSpec {
    pub fn to_config(&self) -> PromptConfig {
        PromptConfig::new(
            build_prompt(self.caption_type, &self.length, &self.extras),
            self.weight,
        )
    }
}

/// Parses the CLI form `type:length:weight[:extra,extra]`.
impl FromStr for PromptSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(4, ':');
        let caption_type = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| format!("missing caption type in {:?}", s))?
            .parse::<CaptionType>()?;
        let length = match parts.next() {
            Some(p) => p.parse::<CaptionLength>()?,
            None => CaptionLength::default(),
        };
        let weight = match parts.next() {
            Some(p) => p
                .parse::<f64>()
                .map_err(|e| format!("invalid weight {:?}: {}", p, e))?,
            None => default_weight(),
        };
        let extras = match parts.next() {
            Some(p) => p
                .split(',')
                .filter(|e| !e.is_empty())
                .map(str::parse::<ExtraOption>)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(PromptSpec {
            caption_type,
            length,
            extras,
            weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_selects_template_variant() {
        assert_eq!(
            build_prompt(CaptionType::Descriptive, &CaptionLength::Any, &[]),
            "Write a detailed description for this image."
        );
        assert_eq!(
            build_prompt(CaptionType::Casual, &"40".parse().unwrap(), &[]),
            "Write a descriptive caption for this image in a casual tone within 40 words."
        );
        assert_eq!(
            build_prompt(CaptionType::Midjourney, &"very long".parse().unwrap(), &[]),
            "Write a very long MidJourney prompt for this image."
        );
    }

    #[test]
    fn extras_are_appended_in_order() {
        let prompt = build_prompt(
            CaptionType::ProductListing,
            &CaptionLength::Any,
            &[ExtraOption::Lighting, ExtraOption::KeepPg],
        );
        assert_eq!(
            prompt,
            "Write a caption for this image as though it were a product listing. \
             Include information about lighting. Do NOT include anything sexual; keep it PG."
        );
    }

    #[test]
    fn every_type_renders_each_length() {
        for t in CaptionType::ALL {
            assert_eq!(t.key().parse::<CaptionType>().unwrap(), t);
            for length in [
                CaptionLength::Any,
                CaptionLength::Words(30),
                CaptionLength::Descriptor("short".into()),
            ] {
                let prompt = build_prompt(t, &length, &[]);
                assert!(!prompt.contains('{'), "unfilled template: {}", prompt);
                match &length {
                    CaptionLength::Words(_) => assert!(prompt.contains("30")),
                    CaptionLength::Descriptor(_) => assert!(prompt.contains("short")),
                    CaptionLength::Any => {}
                }
            }
        }
    }

    #[test]
    fn prompt_spec_from_cli_form() {
        let spec: PromptSpec = "art-critic:medium-length:2.5:lighting,no-mood".parse().unwrap();
        assert_eq!(spec.caption_type, CaptionType::ArtCritic);
        assert_eq!(spec.length, CaptionLength::Descriptor("medium-length".into()));
        assert_eq!(spec.weight, 2.5);
        assert_eq!(spec.extras, vec![ExtraOption::Lighting, ExtraOption::NoMood]);

        let spec: PromptSpec = "casual".parse().unwrap();
        assert_eq!(spec.length, CaptionLength::default());
        assert_eq!(spec.weight, 1.0);

        assert!("poem:any:1".parse::<PromptSpec>().is_err());
        assert!("casual:any:heavy".parse::<PromptSpec>().is_err());
        assert!("casual:any:1:sparkles".parse::<PromptSpec>().is_err());
    }

    #[test]
    fn prompt_spec_from_form_json() {
        let spec: PromptSpec = serde_json::from_value(serde_json::json!({
            "caption_type": "stable-diffusion",
            "length": "60",
            "extras": ["no-meta-phrases"],
            "weight": 0
        }))
        .unwrap();
        let config = spec.to_config();
        assert_eq!(config.weight, 0.0);
        assert!(config.prompt.starts_with(SD_PROMPT));
        assert!(config.prompt.contains("60 words or less."));
        assert!(config.prompt.ends_with("etc."));
    }
}
