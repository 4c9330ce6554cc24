use email_triage::categories::OpportunityCandidate;
use email_triage::report::truncate;
use email_triage::Message;

/// Body characters sent for classification
pub const CLASSIFY_BODY_LIMIT: usize = 4000;
/// Body characters sent when drafting a reply
pub const DRAFT_BODY_LIMIT: usize = 1000;
/// Body characters sent when rewriting a draft
pub const REWRITE_BODY_LIMIT: usize = 500;

pub const CLASSIFY_SYSTEM: &str = "You are an executive assistant who helps busy professionals prioritize their \
emails. You are extremely selective about which emails truly need a response. Your goal is to minimize noise and \
only surface emails that must be dealt with.";

pub const DRAFT_SYSTEM: &str =
    "You are a professional, concise email responder who writes helpful, direct replies to business inquiries.";

pub const CATEGORIZE_SYSTEM: &str = "You are a precise email categorizer. Your goal is to accurately categorize \
emails and extract relevant business information.";

pub const OPPORTUNITY_SYSTEM: &str = "You are an executive assistant who helps identify high-quality opportunities \
from business emails. You excel at distinguishing personalized offers from mass marketing campaigns.";

pub fn classify(message: &Message) -> String {
    format!(
        r#"Decide whether this email critically needs a response.

Only flag an email as needing a response if it is:
1. From a real person, not an automated system
2. Personalized, not mass marketing
3. Asking for specific action or input from the recipient
4. Of clear business value, a substantial opportunity, or time-sensitive

Automated notifications, newsletters and marketing emails never need a response.

Email:
Subject: {subject}
From: {from}
Received: {received}
Body:
{body}

Importance levels:
- "high": personalized communication with clear value, or a time-sensitive matter that must be addressed
- "medium": potentially useful but less critical
- "low": mass marketing, newsletters, automated notifications, spam

Respond with a JSON object with exactly these fields:
{{
  "importance": "high" | "medium" | "low",
  "reason": "<brief explanation of the rating>",
  "needs_response": <true only if the email absolutely requires a response>,
  "time_sensitive": <true if the matter is time-sensitive>,
  "topics": ["<1 to 3 key topics>"]
}}"#,
        subject = message.subject,
        from = message.from_display,
        received = message.received_at.as_deref().unwrap_or("unknown"),
        body = truncate(message.body.trim(), CLASSIFY_BODY_LIMIT, ""),
    )
}

pub fn categorize(message: &Message) -> String {
    format!(
        r#"Categorize this email for a professional and extract the business details.

Email:
Subject: {subject}
From: {from}
Body:
{body}

Categories:
1. "sponsorship": a company wants to sponsor content or services
2. "business_inquiry": business-related email, partnership offer, marketing opportunity
3. "other": everything else

For a sponsorship or business inquiry, extract the company name and the main topic or product.

Respond with a JSON object with exactly these fields:
{{
  "category": "sponsorship" | "business_inquiry" | "other",
  "confidence": <number between 0 and 1>,
  "reason": "<brief explanation>",
  "company_name": "<company name>" or null,
  "topic": "<main topic or product>" or null
}}"#,
        subject = message.subject,
        from = message.from_display,
        body = truncate(message.body.trim(), CLASSIFY_BODY_LIMIT, ""),
    )
}

/// Ranking request for `candidates`
pub fn opportunities(candidates: &[OpportunityCandidate]) -> String {
    let listing = serde_json::to_string_pretty(candidates).unwrap_or_default();
    format!(
        r#"Filter these {count} business and sponsorship emails down to the highest quality opportunities.

Write a structured report that:
1. Sorts them into "High Value" and "Mass Marketing/Generic"
2. Ranks the high-value opportunities in order of priority
3. Gives brief reasoning for each assessment

Emails:
{listing}

Criteria:
1. Personalization: addressed to the recipient, mentions their specific work
2. Authenticity: personal tone, unique request, not a mass campaign
3. Relevance: fits the recipient's work, interesting topic, reasonable offer
4. Reputation: known company, established person, verifiable identity
5. Specificity: a clear request with details, not vague

Use clear sections and put unique, personalized, valuable opportunities first."#,
        count = candidates.len(),
        listing = listing,
    )
}

pub fn draft(message: &Message, signature: &str) -> String {
    format!(
        r#"Write a concise, helpful reply to this email.

Subject: {subject}
From: {from}
Preview: {body}

Requirements:
1. Friendly but brief, under 150 words
2. Address any specific questions or requests
3. Professional and helpful
4. Do not apologize for a delay unless clearly necessary
5. End with "Best regards,\n{signature}"

Format:
Subject: Re: {subject}

<body>

Best regards,
{signature}"#,
        subject = message.subject,
        from = message.from_display,
        body = truncate(&message.body, DRAFT_BODY_LIMIT, ""),
        signature = signature,
    )
}

pub fn rewrite(message: &Message, instructions: &str, signature: &str) -> String {
    format!(
        r#"Rewrite the reply to this email following the instructions.

Original email:
Subject: {subject}
From: {from}
Preview: {body}

Instructions: {instructions}

Keep this format:
Subject: Re: {subject}

<body>

Best regards,
{signature}"#,
        subject = message.subject,
        from = message.from_display,
        body = truncate(&message.body, REWRITE_BODY_LIMIT, ""),
        instructions = instructions.trim(),
        signature = signature,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> Message {
        Message::new("Invoice #4", "Ann <ann@co.com>", None, body)
    }

    #[test]
    fn test_classify_prompt_truncates_body() {
        let body = format!("{}TAIL", "a".repeat(CLASSIFY_BODY_LIMIT));
        let prompt = classify(&message(&body));

        assert!(prompt.contains("Subject: Invoice #4"));
        assert!(prompt.contains("Received: unknown"));
        assert!(prompt.contains("\"topics\""));
        assert!(!prompt.contains("TAIL"));
    }

    #[test]
    fn test_categorize_prompt() {
        let body = format!("  {}TAIL", "a".repeat(CLASSIFY_BODY_LIMIT));
        let prompt = categorize(&message(&body));

        assert!(prompt.contains("Subject: Invoice #4\nFrom: Ann <ann@co.com>\n"));
        assert!(prompt.contains("\"business_inquiry\""));
        assert!(prompt.contains("\"company_name\""));
        assert!(!prompt.contains("TAIL"));
    }

    #[test]
    fn test_opportunities_prompt_lists_candidates() {
        let candidates = vec![OpportunityCandidate {
            category: email_triage::categories::EmailCategory::Sponsorship,
            from: "Ann <ann@co.com>".into(),
            subject: "Sponsor us".into(),
            company: Some("Acme".into()),
            topic: None,
            confidence: 0.9,
            snippet: "We love your channel".into(),
        }];
        let prompt = opportunities(&candidates);

        assert!(prompt.starts_with("Filter these 1 business and sponsorship emails"));
        assert!(prompt.contains("\"category\": \"sponsorship\""));
        assert!(prompt.contains("\"company\": \"Acme\""));
        assert!(prompt.contains("\"topic\": null"));
        assert!(prompt.contains("We love your channel"));
        assert!(prompt.contains("Mass Marketing/Generic"));
    }

    #[test]
    fn test_draft_and_rewrite_prompts() {
        let msg = message(&"b".repeat(2000));

        let drafted = draft(&msg, "Kris");
        assert!(drafted.contains("Subject: Re: Invoice #4"));
        assert!(drafted.ends_with("Best regards,\nKris"));
        assert!(drafted.contains(&"b".repeat(DRAFT_BODY_LIMIT)));
        assert!(!drafted.contains(&"b".repeat(DRAFT_BODY_LIMIT + 1)));

        let rewritten = rewrite(&msg, "  shorter please ", "Kris");
        assert!(rewritten.contains("Instructions: shorter please\n"));
        assert!(!rewritten.contains(&"b".repeat(REWRITE_BODY_LIMIT + 1)));
        assert!(rewritten.contains(&"b".repeat(REWRITE_BODY_LIMIT)));
    }
}
