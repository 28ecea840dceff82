use log::warn;

use crate::api::DashboardApi;
use crate::domain::mail::MailRecord;

/// Initial reply-pane text for a mail: the prefill heuristics as pretty JSON,
/// or the mail text itself when prefill fails. Empty for mails without text.
pub fn reply_preview(api: &dyn DashboardApi, mail: &MailRecord) -> String {
    if mail.text.is_empty() {
        return String::new();
    }
    match api.prefill_preview(&mail.text) {
        Ok(h) => h.pretty(),
        Err(e) => {
            warn!("prefill preview for {} failed: {e}", mail.id);
            mail.text.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stub::{Fail, StubApi};

    fn mail(text: &str) -> MailRecord {
        serde_json::from_value(serde_json::json!({"id": "1", "text": text})).unwrap()
    }

    #[test]
    fn preview_is_pretty_heuristics() {
        let api = StubApi::ok();
        let text = reply_preview(&api, &mail("steps: 30"));
        assert!(text.contains("\"steps\": 30"), "{text}");
        assert_eq!(api.count("preview"), 1);
    }

    #[test]
    fn preview_falls_back_to_mail_text() {
        let mut api = StubApi::ok();
        api.preview = Err(Fail::Status(500, None));
        assert_eq!(reply_preview(&api, &mail("steps: 30")), "steps: 30");
    }

    #[test]
    fn no_request_without_text() {
        let api = StubApi::ok();
        assert_eq!(reply_preview(&api, &mail("")), "");
        assert_eq!(api.count("preview"), 0);
    }
}
