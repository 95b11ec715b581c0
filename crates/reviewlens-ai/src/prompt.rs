//! Prompt templates for both phases.

use reviewlens_core::{EscalationLevel, IssueCategory};

const ANALYSIS_INSTRUCTIONS: &str = "\
SYSTEM INSTRUCTION:
You are a strict JSON generator.

You MUST return a single valid JSON object.
Any non-JSON output is a failure.

Return EXACTLY this schema:

{
  \"sentiment_distribution\": {
    \"positive\": number,
    \"negative\": number,
    \"neutral\": number
  },
  \"top_pain_points\": [string],
  \"top_positive_drivers\": [string],
  \"key_themes\": [string],
  \"urgency\": \"low\" | \"medium\" | \"high\",
  \"recommended_actions\": [string]
}

Rules:
- Percentages must be whole numbers that sum to 100
- All lists must contain at least one item
- urgency must be one of: low, medium, high
- Do NOT include explanations, markdown, or comments";

/// Phase-1 prompt with the reviews embedded verbatim.
pub(crate) fn analysis_prompt(reviews_text: &str) -> String {
    format!("{ANALYSIS_INSTRUCTIONS}\n\nCustomer reviews:\n{reviews_text}\n")
}

/// The base prompt plus the previous attempt's failure.
pub(crate) fn retry_prompt(base: &str, error: &str) -> String {
    format!(
        "{base}\n\n\
         IMPORTANT:\n\
         Your previous response failed with the following error:\n\
         {error}\n\
         \n\
         Return ONLY valid JSON. No explanation.\n"
    )
}

/// Phase-2 prompt: classify the issue and choose an escalation level.
pub(crate) fn decision_prompt(analysis_json: &str) -> String {
    let categories = vocabulary(IssueCategory::ALL.iter().map(|c| c.as_str()));
    let levels = vocabulary(EscalationLevel::ALL.iter().map(|l| l.as_str()));
    format!(
        "SYSTEM INSTRUCTION:\n\
         You are a customer-operations triage engine and a strict JSON generator.\n\
         \n\
         Given the review analysis below, classify the dominant issue and decide \
         whether it needs escalation.\n\
         \n\
         Return EXACTLY this schema:\n\
         \n\
         {{\n\
         \x20 \"issue_category\": {{\"category\": {categories}, \"confidence\": number between 0 and 1}},\n\
         \x20 \"escalation\": {{\"level\": {levels}, \"reason\": string}}\n\
         }}\n\
         \n\
         Rules:\n\
         - category must be exactly one of the listed values\n\
         - level must be exactly one of the listed values\n\
         - When confidence is low, prefer the lower escalation level\n\
         - Use \"none\" unless the analysis shows a clear, recurring problem\n\
         - Do NOT include explanations, markdown, or comments\n\
         \n\
         Review analysis:\n\
         {analysis_json}\n"
    )
}

fn vocabulary<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .map(|v| format!("\"{v}\""))
        .collect::<Vec<_>>()
        .join(" | ")
}
