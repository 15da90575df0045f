//! Prompt construction for personalized landing page copy.
//!
//! [`build_prompt`] is pure: the same [`AttributeRecord`] always renders
//! the same text. The company context and task instructions are fixed; only
//! the visitor-context section depends on the record, and it lists present
//! attributes only.

use crate::types::{AttributeRecord, Message};

/// System instruction sent with every completion request.
pub const SYSTEM_PROMPT: &str = "You are an expert copywriter for incident.io. You write clear, \
compelling landing page copy that connects visitor intent to business value. You understand \
incident management, SRE practices, and how to speak to technical audiences.";

const COMPANY_CONTEXT: &str = "\
You are writing landing page copy for incident.io, an end-to-end incident management platform that helps tech-led businesses navigate incidents with clarity, speed, and confidence.

COMPANY CONTEXT:
incident.io provides a complete platform including:
- On-call tool (alerts, schedules, notifications)
- Incident Response (Slack/Teams integration, workflows, automations)
- AI SRE (intelligent incident assistance that surfaces context and suggests actions)
- Status Pages (public, private, internal updates)
- Post-incident learnings (dashboards, trends, auto-generated post-mortems)
- Scribe (AI-powered meeting transcription)
- Catalog (organization-wide context and queryability)

Trusted by 150+ companies including Netflix, Etsy, Vercel, Intercom, Okta, Airbnb, and Zendesk.";

const TASK_INSTRUCTIONS: &str = "\
TASK:
Create a compelling, personalized landing page message with:
1. A headline (8-12 words) that speaks directly to their search intent/pain point
2. A brief description (2-3 sentences) that connects their need to incident.io's value

TONE: Professional but conversational. Confident and helpful. Focus on outcomes (efficiency, resilience, speed) not features.

FORMAT:
Headline: [your headline]
Description: [your description]";

/// Render the visitor-context lines, one `- <Label>: <value>` per present
/// attribute, in canonical attribute order.
pub fn visitor_context(record: &AttributeRecord) -> String {
    record
        .present()
        .map(|(attr, value)| format!("- {}: {value}", attr.prompt_label()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the full user prompt for a record.
pub fn build_prompt(record: &AttributeRecord) -> String {
    format!(
        "{COMPANY_CONTEXT}\n\nVISITOR CONTEXT:\nThis visitor arrived via these campaign parameters:\n{}\n\n{TASK_INSTRUCTIONS}",
        visitor_context(record)
    )
}

/// System + user messages for a completion request.
pub fn build_messages(record: &AttributeRecord) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(build_prompt(record)),
    ]
}
