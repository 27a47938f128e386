//! Instruction text sent alongside the product images.

use crate::api::models::content::ContentRequest;

pub const SYSTEM_INSTRUCTION: &str = "You are an expert e-commerce copywriter, SEO specialist, and market analyst. \
Your goal is to analyze the product images and user context to generate a highly accurate, \
professional, and persuasive product description, a short social media caption, and 8 SEO-optimized \
hashtags. You MUST return the output as a single JSON object that conforms STRICTLY to the required schema.";

const NOT_SPECIFIED: &str = "Not specified";
const NO_CONTACT: &str = "None provided";
const NO_KEYWORDS: &str = "Analyze the images for key features.";

/// Copy style chosen from the target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformStyle {
    /// Short, skimmable copy for social feeds
    Social,
    /// Listing copy for marketplaces and web shops (Daraz, ikman.lk, eBay, Amazon, ...)
    Marketplace,
}

impl PlatformStyle {
    /// Pick the style for a `post_medium` value. Unknown platforms are treated as marketplaces.
    pub fn classify(post_medium: &str) -> Self {
        match post_medium.to_lowercase().as_str() {
            "instagram" | "facebook" => PlatformStyle::Social,
            _ => PlatformStyle::Marketplace,
        }
    }

    fn description_instruction(self) -> &'static str {
        match self {
            PlatformStyle::Social => {
                "Write an attractive and concise product description (25-35 words) tailored to the target platform tone. \
                 Use 1-2 short, impactful bullet points to highlight key features for quick social media reading. \
                 Add 1-2 relevant emojis if natural for the platform."
            }
            PlatformStyle::Marketplace => {
                "Write a comprehensive, SEO-optimized product description (25-35 words) tailored to the target platform expectations. \
                 Use a brief, easy-to-read paragraph format suitable for a marketplace listing. \
                 Avoid emojis unless the platform commonly uses them."
            }
        }
    }

    fn caption_instruction(self, platform: &str) -> String {
        match self {
            PlatformStyle::Social => format!(
                "Write a single-sentence social media caption (10-15 words) optimized for the style of the \
                 Target Platform ({platform}). Add 1-2 relevant emojis if natural for the platform."
            ),
            PlatformStyle::Marketplace => "Write a brief, direct summary (10-15 words, single sentence) suitable as a \
                 short product headline/summary. Avoid emojis unless the platform commonly uses them."
                .to_string(),
        }
    }
}

/// Fully rendered instructions for one generation call.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system_instruction: &'static str,
    pub user_prompt: String,
    pub style: PlatformStyle,
}

fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default)
}

pub fn build_prompt(request: &ContentRequest) -> Prompt {
    let platform = request.post_medium.to_lowercase();
    let style = PlatformStyle::classify(&request.post_medium);

    let offer_status = if request.is_offer {
        "YES, the post should emphasize a special offer/sale."
    } else {
        "NO special offer. Focus on product quality and features."
    };

    let user_prompt = format!(
        "Generate content for the product shown in the images.

**USER CONTEXT:**
- Target Platform: {target}
- Company/Store Name: {company}
- Offer Status: {offer_status}
- Contact/Web Info: {contact}
- Key Selling Points/Keywords: {keywords}

**INSTRUCTIONS:**
1. **Description (seo_description field):** {description}
2. **Caption (social_caption field):** {caption}
3. **Hashtags:** Generate a list of {hashtags} relevant, trending, and SEO-friendly hashtags.
4. **Product Summary:** Provide a 1-sentence summary (10-15 words) of the product and its target audience.

Return the result strictly as a JSON object matching the ContentResponse schema.",
        target = or_default(Some(request.post_medium.as_str()), NOT_SPECIFIED),
        company = or_default(request.company_name.as_deref(), NOT_SPECIFIED),
        contact = or_default(request.contact_info.as_deref(), NO_CONTACT),
        keywords = or_default(request.keywords.as_deref(), NO_KEYWORDS),
        description = style.description_instruction(),
        caption = style.caption_instruction(&platform),
        hashtags = super::EXPECTED_HASHTAGS,
    );

    Prompt {
        system_instruction: SYSTEM_INSTRUCTION,
        user_prompt,
        style,
    }
}
