// ABOUTME: Session keys for the agent runtime's cross-turn memory.
// ABOUTME: Derives deterministic keys from caller identity and strips disallowed characters.

use uuid::Uuid;

/// Longest session id the agent runtime accepts
pub const MAX_SESSION_ID_LEN: usize = 100;

/// Namespace for session keys; changing it orphans every existing agent session
const SESSION_NAMESPACE: Uuid = Uuid::from_u128(0x6c1e_4a8f_93d2_4b57_a0e1_5f2c_8d3b_9e71);

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-')
}

/// Keep only `[A-Za-z0-9._:-]` and cap the length
pub fn sanitize_session_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| is_allowed(*c))
        .take(MAX_SESSION_ID_LEN)
        .collect()
}

/// Deterministic session key for a user's conversation.
///
/// The same user and conversation always map to the same key, in any process.
pub fn derive_session_key(user_id: &str, conversation_id: &str) -> String {
    let name = format!("{}:{}", user_id.trim(), conversation_id.trim());
    Uuid::new_v5(&SESSION_NAMESPACE, name.as_bytes()).to_string()
}

/// Use the caller's session id when it survives sanitizing, else derive one
pub fn resolve_session_id(supplied: Option<&str>, user_id: &str, conversation_id: &str) -> String {
    supplied
        .map(sanitize_session_id)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| derive_session_key(user_id, conversation_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize_session_id("abc DEF/../123;drop"), "abcDEF..123drop");
        assert_eq!(sanitize_session_id("user:42_conv-7.x"), "user:42_conv-7.x");
        assert_eq!(sanitize_session_id("é✓ "), "");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "a".repeat(250);
        assert_eq!(sanitize_session_id(&long).len(), MAX_SESSION_ID_LEN);
    }

    #[test]
    fn test_derived_key_is_deterministic() {
        let a = derive_session_key("u-1", "conv-9");
        let b = derive_session_key("u-1", "conv-9");
        let c = derive_session_key("u-1", "conv-10");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(sanitize_session_id(&a), a);
    }

    #[test]
    fn test_resolve_prefers_sanitized_supplied_id() {
        assert_eq!(resolve_session_id(Some("  my session!"), "u", "c"), "mysession");
        assert_eq!(
            resolve_session_id(Some("***"), "u", "c"),
            derive_session_key("u", "c")
        );
        assert_eq!(resolve_session_id(None, "u", "c"), derive_session_key("u", "c"));
    }
}
