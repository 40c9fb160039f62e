use crate::types::{MessageLength, Preferences, ProfileRecord, Tone, UserContext};

pub const SIGN_OFF: &str = "Best,";

pub const BANNED_PHRASES: &[&str] = &[
    "I hope this message finds you well",
    "I came across your profile",
    "I'd love to pick your brain",
    "synergy",
    "touch base",
    "circle back",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptOptions {
    pub length: MessageLength,
    pub tone: Tone,
}

impl From<&Preferences> for PromptOptions {
    fn from(prefs: &Preferences) -> Self {
        Self {
            length: prefs.message_length,
            tone: prefs.tone,
        }
    }
}

pub fn greeting(profile: &ProfileRecord) -> String {
    format!("Hi {},", profile.first_name())
}

/// Build the single prompt sent to the generation API.
pub fn build_prompt(
    profile: &ProfileRecord,
    context: &UserContext,
    options: &PromptOptions,
) -> String {
    let (min_chars, max_chars) = options.length.char_window();

    let mut facts = Vec::new();
    for (label, value) in [
        ("Name", &profile.name),
        ("Headline", &profile.headline),
        ("Company", &profile.company),
        ("Location", &profile.location),
        ("Industry", &profile.industry),
        ("About", &profile.about),
        ("Recent experience", &profile.experience),
    ] {
        if !value.trim().is_empty() {
            facts.push(format!("- {}: {}", label, value.trim()));
        }
    }

    let role = if context.user_role.trim().is_empty() {
        "professional"
    } else {
        context.user_role.trim()
    };

    let banned = BANNED_PHRASES
        .iter()
        .map(|p| format!("\"{}\"", p))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Write a personalized LinkedIn connection request note.\n\n\
         Recipient profile:\n{facts}\n\n\
         About the sender:\n\
         - Role: {role}\n\
         - Background: {background}\n\n\
         Requirements:\n\
         - Between {min_chars} and {max_chars} characters in total.\n\
         - Tone: {tone}.\n\
         - Start exactly with \"{greeting}\"\n\
         - Mention one specific detail from the recipient's profile and one genuine point of common ground.\n\
         - End with \"{sign_off}\" on its own line, without a name or placeholder after it.\n\
         - Never use these phrases: {banned}.\n\
         - Return only the note text, with no quotes, subject line or commentary.",
        facts = facts.join("\n"),
        role = role,
        background = context.user_context.trim(),
        min_chars = min_chars,
        max_chars = max_chars,
        tone = options.tone.describe(),
        greeting = greeting(profile),
        sign_off = SIGN_OFF,
        banned = banned,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> ProfileRecord {
        ProfileRecord {
            name: "Ada".to_string(),
            headline: "Engineer".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_prompt_contains_greeting_and_headline() {
        let prompt = build_prompt(
            &ada(),
            &UserContext::new("CS grad", "developer"),
            &PromptOptions::default(),
        );
        assert!(prompt.contains("Hi Ada,"));
        assert!(prompt.contains("Engineer"));
        assert!(prompt.contains("CS grad"));
        assert!(prompt.contains("developer"));
    }

    #[test]
    fn test_prompt_skips_empty_fields() {
        let prompt = build_prompt(&ada(), &UserContext::default(), &PromptOptions::default());
        assert!(!prompt.contains("- Company:"));
        assert!(prompt.contains("- Role: professional"));
    }

    #[test]
    fn test_length_window_follows_preferences() {
        let prefs = Preferences {
            message_length: MessageLength::Short,
            ..Default::default()
        };
        let prompt = build_prompt(
            &ada(),
            &UserContext::new("ctx", "role"),
            &PromptOptions::from(&prefs),
        );
        assert!(prompt.contains("Between 150 and 200 characters"));
    }

    #[test]
    fn test_banned_phrases_listed() {
        let prompt = build_prompt(&ada(), &UserContext::default(), &PromptOptions::default());
        for phrase in BANNED_PHRASES {
            assert!(prompt.contains(phrase));
        }
    }

    #[test]
    fn test_greeting_uses_first_name() {
        let profile = ProfileRecord {
            name: "Grace Brewster Hopper".to_string(),
            ..Default::default()
        };
        assert_eq!(greeting(&profile), "Hi Grace,");
    }
}
