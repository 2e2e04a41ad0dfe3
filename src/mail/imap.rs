use std::io::{Read, Write};
use std::net::TcpStream;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mailparse::{MailHeaderMap, ParsedMail};

use super::{InboundEmail, MailError, Mailbox};
use crate::config::ImapConfig;

const INBOX: &str = "INBOX";

/// IMAP retrieval. The `imap` crate is synchronous, so every call runs on
/// the blocking pool with its own session.
pub struct ImapMailbox {
    config: ImapConfig,
}

impl ImapMailbox {
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn fetch_unseen(&self) -> Result<Vec<InboundEmail>, MailError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || fetch_unseen_blocking(&config))
            .await
            .map_err(|e| MailError::Task(e.to_string()))?
    }

    async fn mark_seen(&self, uids: &[u32]) -> Result<(), MailError> {
        if uids.is_empty() {
            return Ok(());
        }
        let config = self.config.clone();
        let set = uid_set(uids);
        tokio::task::spawn_blocking(move || {
            let mut session = open_session(&config)?;
            flag_seen(&mut session, &set)?;
            session.logout().map_err(imap_err)
        })
        .await
        .map_err(|e| MailError::Task(e.to_string()))?
    }
}

trait ImapStream: Read + Write + Send {}
impl<T: Read + Write + Send> ImapStream for T {}

type ImapSession = ::imap::Session<Box<dyn ImapStream>>;

fn imap_err(e: ::imap::error::Error) -> MailError {
    MailError::Imap(e.to_string())
}

fn open_session(config: &ImapConfig) -> Result<ImapSession, MailError> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port))
        .map_err(|e| MailError::Imap(e.to_string()))?;
    let stream: Box<dyn ImapStream> = if config.tls {
        let tls = native_tls::TlsConnector::builder()
            .build()
            .map_err(|e| MailError::Imap(e.to_string()))?;
        let secured = tls
            .connect(&config.host, tcp)
            .map_err(|e| MailError::Imap(e.to_string()))?;
        Box::new(secured)
    } else {
        Box::new(tcp)
    };

    let mut client = ::imap::Client::new(stream);
    client.read_greeting().map_err(imap_err)?;
    let mut session = client
        .login(&config.user, &config.password)
        .map_err(|(e, _)| imap_err(e))?;
    session.select(INBOX).map_err(imap_err)?;
    Ok(session)
}

/// Comma-separated, ascending UID set.
fn uid_set(uids: &[u32]) -> String {
    let mut sorted = uids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn flag_seen(session: &mut ImapSession, set: &str) -> Result<(), MailError> {
    session
        .uid_store(set, "+FLAGS (\\Seen)")
        .map_err(imap_err)?;
    Ok(())
}

fn fetch_unseen_blocking(config: &ImapConfig) -> Result<Vec<InboundEmail>, MailError> {
    let mut session = open_session(config)?;

    let uids: Vec<u32> = session
        .uid_search("UNSEEN")
        .map_err(imap_err)?
        .into_iter()
        .collect();
    if uids.is_empty() {
        session.logout().map_err(imap_err)?;
        return Ok(Vec::new());
    }

    // PEEK keeps the messages unread; the caller flags what it handled.
    let fetched = session
        .uid_fetch(uid_set(&uids), "(UID BODY.PEEK[])")
        .map_err(imap_err)?;
    let mut messages = Vec::new();
    let mut unreadable = Vec::new();
    for fetch in fetched.iter() {
        let Some(uid) = fetch.uid else {
            continue;
        };
        let parsed = fetch
            .body()
            .ok_or_else(|| MailError::Parse("empty message".into()))
            .and_then(|raw| parse_inbound(uid, raw));
        match parsed {
            Ok(message) => messages.push(message),
            Err(e) => {
                tracing::warn!(uid, error = %e, "Skipping unparsable message");
                unreadable.push(uid);
            }
        }
    }

    if !unreadable.is_empty() {
        flag_seen(&mut session, &uid_set(&unreadable))?;
    }
    session.logout().map_err(imap_err)?;

    tracing::info!(count = messages.len(), "Fetched unseen messages");
    Ok(messages)
}

/// Parse one RFC 822 message into an `InboundEmail`.
pub fn parse_inbound(uid: u32, raw: &[u8]) -> Result<InboundEmail, MailError> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| MailError::Parse(e.to_string()))?;

    let from = parsed
        .headers
        .get_first_value("From")
        .ok_or_else(|| MailError::Parse("missing From header".into()))?;
    let subject = parsed.headers.get_first_value("Subject").unwrap_or_default();
    let message_id = parsed
        .headers
        .get_first_value("Message-ID")
        .map(|id| id.trim().to_string());
    let received_at = parsed
        .headers
        .get_first_value("Date")
        .and_then(|date| mailparse::dateparse(&date).ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

    let body = select_body(&parsed)?;

    Ok(InboundEmail {
        uid,
        from,
        subject: subject.trim().to_string(),
        body: body.trim().to_string(),
        message_id,
        received_at,
    })
}

/// The first `text/plain` part, else the first `text/*` part, else the
/// top-level body.
fn select_body(mail: &ParsedMail<'_>) -> Result<String, MailError> {
    let part = find_part(mail, |mime| mime == "text/plain")
        .or_else(|| find_part(mail, |mime| mime.starts_with("text/")))
        .unwrap_or(mail);
    part.get_body().map_err(|e| MailError::Parse(e.to_string()))
}

fn find_part<'a, 'b>(
    mail: &'b ParsedMail<'a>,
    accept: impl Fn(&str) -> bool + Copy,
) -> Option<&'b ParsedMail<'a>> {
    if mail.subparts.is_empty() {
        return accept(&mail.ctype.mimetype).then_some(mail);
    }
    mail.subparts.iter().find_map(|sub| find_part(sub, accept))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = "From: \"Acme Sales\" <sales@acme.test>\r\n\
        To: buyer@example.test\r\n\
        Subject: Re: [RFP-1f0c] Laptops\r\n\
        Message-ID: <abc123@acme.test>\r\n\
        Date: Tue, 05 Mar 2024 10:00:00 +0000\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        We can supply 20 laptops at $1,100 each.\r\n";

    const MULTIPART: &str = "From: bids@globex.test\r\n\
        Subject: Quote\r\n\
        Content-Type: multipart/alternative; boundary=\"XYZ\"\r\n\
        \r\n\
        --XYZ\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <p>HTML quote</p>\r\n\
        --XYZ\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        Plain quote\r\n\
        --XYZ--\r\n";

    const HTML_ONLY: &str = "From: bids@globex.test\r\n\
        Subject: Quote\r\n\
        Content-Type: multipart/mixed; boundary=\"B\"\r\n\
        \r\n\
        --B\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <p>Only HTML</p>\r\n\
        --B--\r\n";

    #[test]
    fn parses_plain_message_headers() {
        let email = parse_inbound(7, PLAIN.as_bytes()).unwrap();
        assert_eq!(crate::mail::sender_address(&email.from), "sales@acme.test");
        assert_eq!(email.uid, 7);
        assert_eq!(email.subject, "Re: [RFP-1f0c] Laptops");
        assert_eq!(email.message_id.as_deref(), Some("<abc123@acme.test>"));
        assert_eq!(email.body, "We can supply 20 laptops at $1,100 each.");
        assert_eq!(
            email.received_at.unwrap().to_rfc3339(),
            "2024-03-05T10:00:00+00:00"
        );
    }

    #[test]
    fn prefers_plain_text_part() {
        let email = parse_inbound(1, MULTIPART.as_bytes()).unwrap();
        assert_eq!(email.body, "Plain quote");
        assert!(email.message_id.is_none());
    }

    #[test]
    fn falls_back_to_first_text_part() {
        let email = parse_inbound(1, HTML_ONLY.as_bytes()).unwrap();
        assert_eq!(email.body, "<p>Only HTML</p>");
    }

    #[test]
    fn uid_set_is_sorted_and_unique() {
        assert_eq!(uid_set(&[9, 3, 9, 4]), "3,4,9");
        assert_eq!(uid_set(&[12]), "12");
    }

    #[test]
    fn missing_from_is_parse_error() {
        let raw = "Subject: hi\r\n\r\nbody\r\n";
        assert!(matches!(
            parse_inbound(1, raw.as_bytes()),
            Err(MailError::Parse(_))
        ));
    }
}
