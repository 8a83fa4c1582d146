//! Message templates for audit entries, mails and user notices.
//!
//! Templates use `@name` placeholders. They are stored unformatted in the
//! audit log together with their parameters, the same way a watchdog table
//! keeps `message` and `variables` apart, and rendered with [`format_message`].

use std::collections::BTreeMap;

/// Placeholder values keyed by placeholder, including the leading `@`.
pub type MessageParams = BTreeMap<String, String>;

pub const BLOCKED_USER: &str = "Blocked user @username due to security configuration.";

pub const ATTACK_DETECTED: &str = "Ongoing attack detected: Suspicious activity detected in login form submissions. Too many invalid login attempts threshold reached: currently @tracking_current_count events are tracked, and threshold is configured for @activity_threshold attempts.";

pub const ATTACK_SUBSIDED: &str = "Suspicious activity in login form submissions is no longer detected: currently @tracking_current_count events are being tracked, and threshold is configured for @activity_threshold maximum allowed attempts.";

pub const BLOCKED_USER_MAIL_SUBJECT: &str = "Security action: The user @username has been blocked.";

pub const BLOCKED_USER_MAIL_BODY: &str = "The user @username has been blocked at @site because of the amount of wrong login attempts. Please review the logs for more information.";

pub const ATTACK_MAIL_SUBJECT: &str =
    "Security information: Unexpected login activity has been detected at @site.";

pub const ATTACK_MAIL_BODY: &str = "The configured threshold of @activity_threshold logins has been reached with a total of @tracking_current_count invalid login attempts. You should review your log information about login attempts at @site.";

pub const ATTEMPTS_NOTICE: &str = "You have used @user_current_count out of @user_block_attempts login attempts. After all @user_block_attempts have been used, you will be unable to login.";

/// Build a parameter map from `(placeholder, value)` pairs.
pub fn params<I, K, V>(pairs: I) -> MessageParams
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect()
}

/// Substitute every placeholder of `template` with its value.
///
/// Single left-to-right pass: at each position the longest matching
/// placeholder wins, so `@user` never eats the prefix of
/// `@user_current_count`. Substituted values are copied out and never
/// scanned again. Unknown placeholders are left untouched.
pub fn format_message(template: &str, params: &MessageParams) -> String {
    let mut message = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(at) = rest.find('@') {
        message.push_str(&rest[..at]);
        rest = &rest[at..];

        let longest = params
            .iter()
            .filter(|(key, _)| !key.is_empty() && rest.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len());

        match longest {
            Some((key, value)) => {
                message.push_str(value);
                rest = &rest[key.len()..];
            }
            None => {
                message.push('@');
                rest = &rest[1..];
            }
        }
    }

    message.push_str(rest);
    message
}
