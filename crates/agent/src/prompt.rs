use chrono::{DateTime, Utc};

use taskmint_core::domain::user::ContactAlias;
use taskmint_core::timezone::ReferenceZone;

use taskmint_core::domain::task::MAX_TASK_NAME_CHARS;

/// Per-request context embedded into the extraction prompt. Built fresh for
/// every call so the stated "current time" is the request's, not process
/// start.
pub struct PromptContext<'a> {
    pub now: DateTime<Utc>,
    pub zone: ReferenceZone,
    pub user_name: &'a str,
    pub contacts: &'a [ContactAlias],
}

pub fn render_extraction_prompt(text: &str, context: &PromptContext<'_>) -> String {
    let current_time = context.zone.describe_instant(context.now);
    let contacts_line = if context.contacts.is_empty() {
        "No contacts available.".to_string()
    } else {
        let listed = context
            .contacts
            .iter()
            .map(|contact| format!("{} ({})", contact.short_name, contact.full_name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Known contacts: {listed}.")
    };

    format!(
        r#"SYSTEM INSTRUCTION: You are a task extraction assistant. Identify every task in the user's text and structure each one according to the rules below.

USER CONTEXT: The current date and time is {current_time}. The logged-in user is {user_name}. {contacts_line}

USER INPUT: {text}

REQUIRED OUTPUT FORMAT: A JSON array. Each element is an object with exactly these properties:
- taskName: string (concise action, max {max_name} characters)
- assignee: string (default to the logged-in user when unspecified)
- dueDate: string (ISO 8601 UTC, converted from the local interpretation)
- priority: string (one of P1, P2, P3, P4; default P3)
- confidence: number (0.0 to 1.0)

PARSING RULES:

1. TASK NAME:
   - A concise phrase capturing the core action and subject, at most {max_name} characters.
   - Use "-" when no clear action can be identified.

2. ASSIGNEE:
   - Default to "{user_name}" when no assignee is mentioned.
   - Resolve short names against the contacts list; prefer the full name when a contact matches, otherwise keep the name as mentioned.

3. DUE DATE:
   - Interpret all dates and times as local time at the stated current time's offset, then convert to ISO 8601 UTC.
   - When only a date is given, use 23:59:59 local time.
   - "noon" means 12:00:00 local time; "midnight" means 00:00:00 local time.
   - Resolve relative phrases (today, tomorrow, next friday) against the stated current date and time.

4. PRIORITY:
   - P1 for critical or urgent work (urgent, ASAP, critical, top priority).
   - P2 for high importance (important, high priority).
   - P3 for everything else (default).
   - P4 for low priority (low priority, when you have time).

5. CONFIDENCE:
   - 0.8-1.0 for clear, unambiguous tasks.
   - 0.5-0.79 when some detail was inferred.
   - Below 0.5 when the extraction needs manual confirmation.

Return ONLY the JSON array with no additional text or formatting."#,
        current_time = current_time,
        user_name = context.user_name,
        contacts_line = contacts_line,
        text = text,
        max_name = MAX_TASK_NAME_CHARS,
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use taskmint_core::domain::user::ContactAlias;
    use taskmint_core::timezone::ReferenceZone;

    use super::{render_extraction_prompt, PromptContext};

    #[test]
    fn prompt_embeds_time_user_and_contacts() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).single().expect("valid instant");
        let contacts = vec![ContactAlias {
            short_name: "ravi".to_string(),
            full_name: "Ravi Kumar".to_string(),
        }];
        let context = PromptContext {
            now,
            zone: ReferenceZone::default(),
            user_name: "Alex Chen",
            contacts: &contacts,
        };

        let prompt = render_extraction_prompt("remind ravi about the deck", &context);

        assert!(prompt.contains("2025-03-10 15:00:00 UTC+05:30"));
        assert!(prompt.contains("The logged-in user is Alex Chen"));
        assert!(prompt.contains("ravi (Ravi Kumar)"));
        assert!(prompt.contains("USER INPUT: remind ravi about the deck"));
        assert!(prompt.contains("Return ONLY the JSON array"));
    }

    #[test]
    fn prompt_states_when_no_contacts_exist() {
        let context = PromptContext {
            now: Utc::now(),
            zone: ReferenceZone::default(),
            user_name: "Alex Chen",
            contacts: &[],
        };

        let prompt = render_extraction_prompt("finish the report", &context);
        assert!(prompt.contains("No contacts available."));
    }
}
