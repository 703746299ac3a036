//! Prompt Templates
//!
//! Each provider gets the same three-section output contract; templates only
//! differ in framing and in provider-specific formatting reminders.

use insightflow_core::UserContext;
use insightflow_llm::ProviderType;

/// Literal section markers of the prompt contract.
pub const SUMMARY_MARKER: &str = "SUMMARY:";
pub const INSIGHTS_MARKER: &str = "INSIGHTS:";
pub const RECOMMENDATIONS_MARKER: &str = "RECOMMENDATIONS:";

const OUTPUT_CONTRACT: &str = r#"Respond with exactly three sections, in this order, each starting on its own line:

SUMMARY: <two to four sentences describing the dataset and its most important finding>
INSIGHTS: <a JSON array of insight objects>
RECOMMENDATIONS: <a JSON array of recommendation objects>

Each insight object has the keys:
  "type": one of "summary", "trend", "anomaly", "correlation", "prediction", "recommendation", "pattern", "opportunity", "risk"
  "title": short headline
  "content": one or two sentences of explanation
  "confidence_score": number between 0 and 1

Each recommendation object has the keys:
  "title": short imperative headline
  "description": what to do and why
  "impact": "High", "Medium" or "Low"
  "effort": "High", "Medium" or "Low"
  "category": short lowercase label such as "operations" or "marketing"
  "action_steps": array of short strings (optional)

Do not add any other sections or commentary."#;

/// Provider-specific prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    provider: ProviderType,
    /// Appended after the output contract
    format_reminder: &'static str,
}

impl PromptTemplate {
    pub fn for_provider(provider: ProviderType) -> Self {
        let format_reminder = match provider {
            ProviderType::Anthropic => {
                "Write the JSON arrays inline after their markers. Do not wrap them in code fences."
            }
            ProviderType::OpenAI => "Return valid JSON only inside the INSIGHTS and RECOMMENDATIONS sections.",
            ProviderType::DeepSeek | ProviderType::Glm => {
                "Do not include your reasoning in the answer. Output only the three sections."
            }
            ProviderType::Ollama => {
                "Keep the answer short: at most five insights and three recommendations. Output only the three sections, using double quotes in JSON."
            }
        };
        Self {
            provider,
            format_reminder,
        }
    }

    pub fn provider(&self) -> ProviderType {
        self.provider
    }

    /// System prompt with role and industry framing plus the output contract.
    pub fn system_prompt(&self, user_context: &UserContext) -> String {
        format!(
            "You are a senior data analyst advising a {role} in the {industry} industry. {focus} {industry_focus}\n\n{contract}\n\n{reminder}",
            role = user_context.role().replace('_', " "),
            industry = user_context.industry(),
            focus = role_focus(user_context.role()),
            industry_focus = industry_focus(user_context.industry()),
            contract = OUTPUT_CONTRACT,
            reminder = self.format_reminder,
        )
    }

    /// User message embedding the dataset context block.
    pub fn user_prompt(&self, context: &str, user_context: &UserContext) -> String {
        let depth = match user_context.plan_type().to_lowercase().as_str() {
            "basic" | "free" | "trial" => "Provide three to five insights and two to three recommendations.",
            _ => "Provide five to eight insights and three to five recommendations.",
        };
        format!(
            "Analyze the following dataset.\n\n{}\n\n{}",
            context, depth
        )
    }
}

fn role_focus(role: &str) -> &'static str {
    let role = role.to_lowercase();
    if ["ceo", "cfo", "coo", "executive", "founder", "director"]
        .iter()
        .any(|r| role.contains(r))
    {
        "Focus on strategic implications, revenue and risk, in plain business language."
    } else if role.contains("market") || role.contains("growth") || role.contains("sales") {
        "Focus on customer segments, conversion and growth opportunities."
    } else if role.contains("scien") || role.contains("engineer") {
        "Focus on statistical patterns, data quality and correlations; technical language is fine."
    } else if role.contains("operation") || role.contains("manager") {
        "Focus on operational efficiency, bottlenecks and resource allocation."
    } else {
        "Focus on actionable patterns that a business analyst can act on this week."
    }
}

fn industry_focus(industry: &str) -> &'static str {
    let industry = industry.to_lowercase();
    if industry.contains("retail") || industry.contains("commerce") {
        "Consider seasonality, basket size and inventory turnover."
    } else if industry.contains("financ") || industry.contains("bank") {
        "Consider volatility, exposure and compliance risk."
    } else if industry.contains("health") {
        "Consider patient outcomes, utilization and data privacy."
    } else if industry.contains("saas") || industry.contains("software") || industry.contains("tech") {
        "Consider churn, activation and recurring revenue."
    } else if industry.contains("manufactur") || industry.contains("logistic") {
        "Consider throughput, defects and lead times."
    } else {
        "Consider trends, outliers and relationships between columns."
    }
}
