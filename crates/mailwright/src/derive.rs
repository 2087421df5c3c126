//! Reply and forward derivation.

use std::collections::HashSet;

use crate::header_map::HeaderMap;
use crate::message::Message;

const REPLY_BANNER: &str = "-------- Original message --------";
const FORWARD_BANNER: &str = "-------- Forwarded message --------";

impl Message {
    /// Builds a reply to the return path of this message.
    ///
    /// The original body is quoted line by line below `body`.
    #[must_use]
    pub fn reply(&self, from: impl Into<String>, body: &str, cc: Vec<String>) -> Self {
        let mut text = format!("{body}\n\n{REPLY_BANNER}\n");
        for line in self.body.split('\n') {
            text.push('>');
            text.push_str(line);
            text.push('\n');
        }

        Self::new(
            from,
            vec![self.return_path.clone()],
            cc,
            prefixed(&self.subject, "Re:"),
            text,
            self.thread_headers(),
        )
    }

    /// Builds a reply that also copies every other participant.
    ///
    /// The sender is copied when it differs from the return path, followed
    /// by the original `to` and `cc` lists. Each address appears once.
    #[must_use]
    pub fn reply_all(&self, from: impl Into<String>, body: &str) -> Self {
        let mut seen = HashSet::new();
        let sender = (self.from != self.return_path).then_some(&self.from);

        let cc = sender
            .into_iter()
            .chain(&self.to)
            .chain(&self.cc)
            .filter(|addr| seen.insert(addr.as_str()))
            .cloned()
            .collect();

        self.reply(from, body, cc)
    }

    /// Builds a forward of this message with the original body appended.
    #[must_use]
    pub fn forward(
        &self,
        from: impl Into<String>,
        to: Vec<String>,
        cc: Vec<String>,
        body: &str,
    ) -> Self {
        let text = format!("{body}\n\n{FORWARD_BANNER}\n{}", self.body);

        Self::new(
            from,
            to,
            cc,
            prefixed(&self.subject, "Fwd:"),
            text,
            self.thread_headers(),
        )
    }

    fn thread_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("In-Reply-To", self.id.as_str());
        headers.insert("References", self.id.as_str());
        headers
    }
}

/// Prepends `prefix` unless the subject already starts with it, ignoring case.
fn prefixed(subject: &str, prefix: &str) -> String {
    let has_prefix = subject
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
    if has_prefix {
        subject.to_string()
    } else {
        format!("{prefix} {subject}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn original() -> Message {
        let mut msg = Message::new(
            "alice@example.com",
            vec!["desk@example.com".to_string(), "bob@example.com".to_string()],
            vec!["bob@example.com".to_string(), "carol@example.com".to_string()],
            "Printer broken",
            "line one\nline two",
            HeaderMap::new(),
        );
        msg.return_path = "bounce@example.com".to_string();
        msg
    }

    #[test]
    fn test_reply_subject_and_recipient() {
        let orig = original();
        let reply = orig.reply("desk@example.com", "On it.", Vec::new());

        assert_eq!(reply.subject, "Re: Printer broken");
        assert_eq!(reply.to, vec!["bounce@example.com"]);
        assert_eq!(reply.from, "desk@example.com");
        assert_eq!(reply.headers.get("In-Reply-To"), Some(orig.id.as_str()));
        assert_eq!(reply.headers.get("References"), Some(orig.id.as_str()));
        assert_ne!(reply.id, orig.id);
    }

    #[test]
    fn test_reply_quotes_body() {
        let reply = original().reply("desk@example.com", "On it.", Vec::new());
        assert_eq!(
            reply.body,
            "On it.\n\n-------- Original message --------\n>line one\n>line two\n"
        );
    }

    #[test]
    fn test_reply_prefix_is_idempotent() {
        let first = original().reply("x@y", "", Vec::new());
        let second = first.reply("x@y", "", Vec::new());
        assert_eq!(second.subject, "Re: Printer broken");

        let mut shouting = original();
        shouting.subject = "RE: hello".to_string();
        assert_eq!(shouting.reply("x@y", "", Vec::new()).subject, "RE: hello");
    }

    #[test]
    fn test_reply_all_dedups_in_order() {
        let reply = original().reply_all("desk@example.com", "ok");
        assert_eq!(
            reply.cc,
            vec![
                "alice@example.com",
                "desk@example.com",
                "bob@example.com",
                "carol@example.com",
            ]
        );
    }

    #[test]
    fn test_reply_all_skips_sender_equal_to_return_path() {
        let mut orig = original();
        orig.return_path = orig.from.clone();
        let reply = orig.reply_all("desk@example.com", "ok");
        assert_eq!(reply.to, vec!["alice@example.com"]);
        assert!(!reply.cc.contains(&"alice@example.com".to_string()));
    }

    #[test]
    fn test_forward() {
        let orig = original();
        let fwd = orig.forward(
            "desk@example.com",
            vec!["vendor@example.net".to_string()],
            Vec::new(),
            "FYI",
        );

        assert_eq!(fwd.subject, "Fwd: Printer broken");
        assert_eq!(fwd.to, vec!["vendor@example.net"]);
        assert_eq!(
            fwd.body,
            "FYI\n\n-------- Forwarded message --------\nline one\nline two"
        );
        assert_eq!(fwd.headers.get("In-Reply-To"), Some(orig.id.as_str()));

        let again = fwd.forward("x@y", Vec::new(), Vec::new(), "");
        assert_eq!(again.subject, "Fwd: Printer broken");
    }

    #[test]
    fn test_prefix_with_multibyte_subject() {
        assert_eq!(prefixed("Ré", "Re:"), "Re: Ré");
        assert_eq!(prefixed("", "Re:"), "Re: ");
    }

    proptest! {
        #[test]
        fn prop_reply_all_has_no_duplicates(
            to in prop::collection::vec("[a-d]@x", 0..6),
            cc in prop::collection::vec("[a-d]@x", 0..6),
            from in "[a-d]@x",
        ) {
            let orig = Message::new(from, to, cc, "s", "b", HeaderMap::new());
            let reply = orig.reply_all("me@x", "");
            let unique: HashSet<&String> = reply.cc.iter().collect();
            prop_assert_eq!(unique.len(), reply.cc.len());
        }
    }
}
