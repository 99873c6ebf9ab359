use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of marketing topic categories.
///
/// The serialized names are the exact strings stored in the library rows and
/// shown in the views; model output must resolve to one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "LinkedIn Ads")]
    LinkedInAds,
    #[serde(rename = "Meta Ads")]
    MetaAds,
    #[serde(rename = "Google Ads")]
    GoogleAds,
    #[serde(rename = "TikTok Ads")]
    TikTokAds,
    #[serde(rename = "Creative Testing")]
    CreativeTesting,
    #[serde(rename = "Media Buying & Scaling")]
    MediaBuyingScaling,
    #[serde(rename = "Funnels & CRO")]
    FunnelsCro,
    #[serde(rename = "Landing Pages")]
    LandingPages,
    #[serde(rename = "Lead Generation")]
    LeadGeneration,
    #[serde(rename = "Email & Automation")]
    EmailAutomation,
    #[serde(rename = "Copywriting")]
    Copywriting,
    #[serde(rename = "Messaging & Positioning")]
    MessagingPositioning,
    #[serde(rename = "Personal Branding (LinkedIn)")]
    PersonalBranding,
    #[serde(rename = "Growth Strategy")]
    GrowthStrategy,
    #[serde(rename = "AI in Marketing")]
    AiInMarketing,
    #[serde(rename = "Analytics & Attribution")]
    AnalyticsAttribution,
    #[serde(rename = "Agency & Client Management")]
    AgencyClientManagement,
}

impl Topic {
    pub fn name(&self) -> &'static str {
        match self {
            Topic::LinkedInAds => "LinkedIn Ads",
            Topic::MetaAds => "Meta Ads",
            Topic::GoogleAds => "Google Ads",
            Topic::TikTokAds => "TikTok Ads",
            Topic::CreativeTesting => "Creative Testing",
            Topic::MediaBuyingScaling => "Media Buying & Scaling",
            Topic::FunnelsCro => "Funnels & CRO",
            Topic::LandingPages => "Landing Pages",
            Topic::LeadGeneration => "Lead Generation",
            Topic::EmailAutomation => "Email & Automation",
            Topic::Copywriting => "Copywriting",
            Topic::MessagingPositioning => "Messaging & Positioning",
            Topic::PersonalBranding => "Personal Branding (LinkedIn)",
            Topic::GrowthStrategy => "Growth Strategy",
            Topic::AiInMarketing => "AI in Marketing",
            Topic::AnalyticsAttribution => "Analytics & Attribution",
            Topic::AgencyClientManagement => "Agency & Client Management",
        }
    }

    pub fn all() -> &'static [Topic] {
        &[
            Topic::LinkedInAds,
            Topic::MetaAds,
            Topic::GoogleAds,
            Topic::TikTokAds,
            Topic::CreativeTesting,
            Topic::MediaBuyingScaling,
            Topic::FunnelsCro,
            Topic::LandingPages,
            Topic::LeadGeneration,
            Topic::EmailAutomation,
            Topic::Copywriting,
            Topic::MessagingPositioning,
            Topic::PersonalBranding,
            Topic::GrowthStrategy,
            Topic::AiInMarketing,
            Topic::AnalyticsAttribution,
            Topic::AgencyClientManagement,
        ]
    }

    /// Match a raw string against the taxonomy, ignoring case and surrounding
    /// whitespace. Returns `None` for anything off-taxonomy.
    pub fn parse_lenient(raw: &str) -> Option<Topic> {
        let raw = raw.trim();
        Topic::all()
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(raw))
    }

    /// The taxonomy names joined for prompt text: "LinkedIn Ads, Meta Ads, …"
    pub fn prompt_list() -> String {
        Topic::all()
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::parse_lenient(s).ok_or_else(|| format!("unknown topic: {:?}", s))
    }
}
