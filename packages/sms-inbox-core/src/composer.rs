//! Send eligibility and draft validation.
//!
//! A message can only be sent *from* a number the provider account owns.
//! In a thread the account number is whichever endpoint of the pair the
//! account owns; if it owns neither, the composer stays disabled.

use crate::error::{Error, Result};
use crate::message::SendRequest;

/// Maximum message body length accepted by the composer.
pub const MAX_BODY_LEN: usize = 500;

/// Whether a draft can be sent: 1 to 500 characters after trimming.
pub fn draft_is_valid(draft: &str) -> bool {
    let len = draft.trim().chars().count();
    (1..=MAX_BODY_LEN).contains(&len)
}

/// E.164: `+` followed by 8 to 15 digits, no leading zero.
pub fn is_valid_phone(number: &str) -> bool {
    let Some(digits) = number.strip_prefix('+') else {
        return false;
    };
    (8..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

/// Normalize free-form recipient input: keep digits, prefix `+`.
pub fn normalize_recipient(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    format!("+{}", digits)
}

/// Who sends and who receives for a thread between `from` and `to`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposerState {
    /// The endpoint owned by the account.
    pub account_number: Option<String>,
    /// The other endpoint.
    pub recipient: Option<String>,
}

impl ComposerState {
    /// Resolve the sending side against the account's phone numbers.
    pub fn resolve(account_numbers: &[String], from: &str, to: &str) -> Self {
        let owns = |n: &str| account_numbers.iter().any(|a| a == n);

        let (account, recipient) = if owns(from) {
            (from, to)
        } else if owns(to) {
            (to, from)
        } else {
            return Self::default();
        };

        Self {
            account_number: Some(account.to_string()),
            recipient: Some(recipient.to_string()).filter(|r| !r.is_empty()),
        }
    }

    /// Whether the account owns one side of the pair.
    pub fn is_enabled(&self) -> bool {
        self.account_number.is_some() && self.recipient.is_some()
    }

    /// Whether the send button should be active.
    pub fn can_send(&self, draft: &str, sending: bool, loading_numbers: bool) -> bool {
        self.is_enabled() && draft_is_valid(draft) && !sending && !loading_numbers
    }

    /// Placeholder text for the composer input.
    pub fn hint(&self) -> String {
        match (&self.account_number, &self.recipient) {
            (Some(account), Some(recipient)) => format!("Message {} from {}", recipient, account),
            _ => "Unable to send message for this conversation".to_string(),
        }
    }

    /// Build the request for a draft, or explain why it cannot be sent.
    pub fn request(&self, draft: &str) -> Result<SendRequest> {
        let (Some(from), Some(to)) = (&self.account_number, &self.recipient) else {
            return Err(Error::Validation(
                "None of the phone numbers in this conversation belongs to your account"
                    .to_string(),
            ));
        };
        if !draft_is_valid(draft) {
            return Err(Error::Validation(format!(
                "Messages must be between 1 and {} characters.",
                MAX_BODY_LEN
            )));
        }
        Ok(SendRequest {
            from: from.clone(),
            to: to.clone(),
            body: draft.trim().to_string(),
        })
    }
}

/// The stand-alone send form (also used to retry a failed message).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendForm {
    pub from: String,
    pub to: String,
    pub body: String,
}

impl SendForm {
    /// Pre-fill the form, e.g. from a failed message.
    pub fn prefilled(from: &str, to: &str, body: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
        }
    }

    /// Replace the recipient with the normalized form of `input`.
    pub fn set_recipient(&mut self, input: &str) {
        self.to = normalize_recipient(input);
    }

    /// Placeholder text for the body input.
    pub fn hint(&self) -> String {
        let or_unknown = |s: &str| if s.is_empty() { "?".to_string() } else { s.to_string() };
        format!("Send a message from {} to {}", or_unknown(&self.from), or_unknown(&self.to))
    }

    pub fn is_valid(&self, account_numbers: &[String]) -> bool {
        self.validate(account_numbers).is_ok()
    }

    /// Validate against the account's numbers and build the request.
    pub fn validate(&self, account_numbers: &[String]) -> Result<SendRequest> {
        if !account_numbers.iter().any(|n| n == &self.from) {
            return Err(Error::Validation(format!(
                "{} is not a phone number on this account",
                if self.from.is_empty() { "?" } else { self.from.as_str() }
            )));
        }
        if !is_valid_phone(&self.to) {
            return Err(Error::Validation(format!(
                "{} is not a valid phone number",
                if self.to.is_empty() { "?" } else { self.to.as_str() }
            )));
        }
        let len = self.body.chars().count();
        if !(1..=MAX_BODY_LEN).contains(&len) {
            return Err(Error::Validation(format!(
                "Messages must be between 1 and {} characters.",
                MAX_BODY_LEN
            )));
        }
        Ok(SendRequest {
            from: self.from.clone(),
            to: self.to.clone(),
            body: self.body.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers() -> Vec<String> {
        vec!["+15550001111".to_string()]
    }

    #[test]
    fn test_draft_validity() {
        assert!(!draft_is_valid("   "));
        assert!(draft_is_valid(" hi "));
        assert!(draft_is_valid(&"x".repeat(500)));
        assert!(!draft_is_valid(&"x".repeat(501)));
    }

    #[test]
    fn test_phone_validation() {
        assert!(is_valid_phone("+15550001111"));
        assert!(!is_valid_phone("15550001111"));
        assert!(!is_valid_phone("+1555"));
        assert!(!is_valid_phone("+05550001111"));
        assert!(!is_valid_phone("+1555000111a"));
    }

    #[test]
    fn test_normalize_recipient() {
        assert_eq!(normalize_recipient("(555) 000-2222"), "+5550002222");
        assert_eq!(normalize_recipient("+1 555 000 2222"), "+15550002222");
    }

    #[test]
    fn test_resolve_prefers_from() {
        let state = ComposerState::resolve(&numbers(), "+15550001111", "+15550002222");
        assert_eq!(state.account_number.as_deref(), Some("+15550001111"));
        assert_eq!(state.recipient.as_deref(), Some("+15550002222"));

        let reversed = ComposerState::resolve(&numbers(), "+15550002222", "+15550001111");
        assert_eq!(reversed.account_number.as_deref(), Some("+15550001111"));
        assert_eq!(reversed.recipient.as_deref(), Some("+15550002222"));
    }

    #[test]
    fn test_composer_disabled_when_account_owns_neither_number() {
        let state = ComposerState::resolve(&numbers(), "+15550003333", "+15550002222");
        assert!(!state.is_enabled());
        assert!(!state.can_send("hello", false, false));
        assert_eq!(state.hint(), "Unable to send message for this conversation");
        assert!(matches!(state.request("hello"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_can_send_respects_in_flight_state() {
        let state = ComposerState::resolve(&numbers(), "+15550001111", "+15550002222");
        assert!(state.can_send("hello", false, false));
        assert!(!state.can_send("hello", true, false));
        assert!(!state.can_send("hello", false, true));
        assert!(!state.can_send("", false, false));
        let request = state.request("  hello  ").unwrap();
        assert_eq!(request.body, "hello");
    }

    #[test]
    fn test_send_form_validation() {
        let mut form = SendForm::prefilled("+15550001111", "", "hello");
        assert!(!form.is_valid(&numbers()));
        form.set_recipient("1 555 000 2222");
        assert_eq!(form.to, "+15550002222");
        assert!(form.is_valid(&numbers()));

        form.from = "+19998887777".to_string();
        assert!(form.validate(&numbers()).is_err());
    }

    #[test]
    fn test_send_form_hint() {
        assert_eq!(SendForm::default().hint(), "Send a message from ? to ?");
    }
}
