//! Outgoing message body composition.

/// Build the posted message body.
///
/// Layout: optional `[sender]` line, optional `*subject*` line (Slack
/// bold), message last. A bare message is returned unmodified so a
/// single-part body never picks up join artifacts.
pub fn format_body(message: &str, subject: Option<&str>, sender: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(sender) = sender.filter(|s| !s.is_empty()) {
        parts.push(format!("[{sender}]"));
    }
    if let Some(subject) = subject.filter(|s| !s.is_empty()) {
        parts.push(format!("*{subject}*"));
    }

    if parts.is_empty() {
        return message.to_string();
    }
    parts.push(message.to_string());
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_message_passes_through() {
        assert_eq!(format_body("deploy finished", None, None), "deploy finished");
    }

    #[test]
    fn empty_subject_and_sender_are_ignored() {
        assert_eq!(format_body("hi", Some(""), Some("")), "hi");
    }

    #[test]
    fn sender_is_the_first_line() {
        let body = format_body("approve?", None, Some("ci-bot"));
        assert_eq!(body, "[ci-bot]\napprove?");
    }

    #[test]
    fn subject_is_bold_on_its_own_line() {
        let body = format_body("approve?", Some("Release 2.1"), None);
        assert_eq!(body, "*Release 2.1*\napprove?");
    }

    #[test]
    fn sender_then_subject_then_message() {
        let body = format_body("approve?", Some("Release 2.1"), Some("ci-bot"));
        assert_eq!(body, "[ci-bot]\n*Release 2.1*\napprove?");
    }
}
