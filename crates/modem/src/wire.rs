//! XML wire codec for the modem's web interface.
//!
//! Parsing is defensive throughout: a missing or empty element is a
//! [`ModemError::Parse`], never a panic. Firmware error responses carry an
//! explicit `<error><code>N</code></error>` body; the numeric code is
//! parsed from that element rather than matched as a substring, so an
//! unrelated "113" elsewhere in a payload cannot misclassify an error.

use chrono::{DateTime, SecondsFormat, Utc};
use roxmltree::{Document, Node};

use crate::error::ModemError;
use crate::session::SessionTokens;
use crate::types::{DeliveryStatus, InboxMessage, ModemHealth};

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

/// Build the XML body for a send request.
pub(crate) fn build_send_body(phone: &str, content: &str, now: DateTime<Utc>) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<request>
  <Index>-1</Index>
  <Phones><Phone>{}</Phone></Phones>
  <Sca></Sca>
  <Content>{}</Content>
  <Length>{}</Length>
  <Reserved>1</Reserved>
  <Date>{}</Date>
</request>"#,
        escape_xml(phone),
        escape_xml(content),
        content.chars().count(),
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

/// Build the XML body for an inbox listing request.
pub(crate) fn build_inbox_body(box_type: i32, read_count: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<request>
  <PageIndex>1</PageIndex>
  <ReadCount>{read_count}</ReadCount>
  <BoxType>{box_type}</BoxType>
  <SortType>0</SortType>
  <Ascending>0</Ascending>
  <UnreadPreferred>0</UnreadPreferred>
</request>"#
    )
}

/// Escape text for inclusion in an XML element.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parse the `SesTokInfo` handshake response.
pub(crate) fn parse_session_tokens(xml: &str) -> Result<SessionTokens, ModemError> {
    let doc = parse_document(xml)?;
    let session_id = required_text(doc.root_element(), "SesInfo")?;
    let verification_token = required_text(doc.root_element(), "TokInfo")?;
    Ok(SessionTokens {
        session_id,
        verification_token,
    })
}

/// Parse a send response into the modem-assigned message id.
pub(crate) fn parse_send_response(xml: &str) -> Result<String, ModemError> {
    let doc = parse_document(xml)?;
    check_for_error(&doc)?;
    required_text(doc.root_element(), "message_id")
}

/// Parse an inbox listing.
pub(crate) fn parse_inbox(xml: &str) -> Result<Vec<InboxMessage>, ModemError> {
    let doc = parse_document(xml)?;
    check_for_error(&doc)?;

    let mut messages = Vec::new();
    for node in doc
        .descendants()
        .filter(|n| n.has_tag_name("message") && ancestor_is(n, "messages"))
    {
        let index_text = required_text(node, "index")?;
        let index: i64 = index_text.parse().map_err(|_| {
            ModemError::Parse(format!("non-numeric inbox index: {index_text:?}"))
        })?;
        messages.push(InboxMessage {
            index,
            phone: required_text(node, "phone")?,
            content: optional_text(node, "content"),
            date: optional_text(node, "date"),
            status: optional_text(node, "status"),
        });
    }
    messages.sort_by_key(|m| m.index);
    Ok(messages)
}

/// Parse a delivery-status response.
pub(crate) fn parse_delivery_status(xml: &str) -> Result<DeliveryStatus, ModemError> {
    let doc = parse_document(xml)?;
    check_for_error(&doc)?;
    let status = required_text(doc.root_element(), "status")?;
    Ok(DeliveryStatus::from_modem(&status))
}

/// Parse the monitoring endpoint response.
pub(crate) fn parse_health(xml: &str) -> Result<ModemHealth, ModemError> {
    let doc = parse_document(xml)?;
    check_for_error(&doc)?;
    let root = doc.root_element();

    Ok(ModemHealth {
        signal_strength: required_percent(root, "signal_strength")?,
        network_type: required_text(root, "network_type")?,
        network_name: optional_text(root, "network_name"),
        battery_level: required_percent(root, "battery_level")?,
        connection_status: required_text(root, "connection_status")?,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_document(xml: &str) -> Result<Document<'_>, ModemError> {
    Document::parse(xml).map_err(|e| ModemError::Parse(format!("invalid XML: {e}")))
}

/// Reject firmware error bodies: `<error><code>N</code>...</error>`.
fn check_for_error(doc: &Document<'_>) -> Result<(), ModemError> {
    let root = doc.root_element();
    if !root.has_tag_name("error") {
        return Ok(());
    }
    let code_text = required_text(root, "code")
        .map_err(|_| ModemError::Parse("error response without a code element".into()))?;
    let code: u16 = code_text
        .parse()
        .map_err(|_| ModemError::Parse(format!("non-numeric error code: {code_text:?}")))?;
    Err(ModemError::Code(code))
}

/// Text of a named descendant; missing or empty is a parse error.
fn required_text(scope: Node<'_, '_>, tag: &str) -> Result<String, ModemError> {
    let text = scope
        .descendants()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(str::trim)
        .unwrap_or("");
    if text.is_empty() {
        return Err(ModemError::Parse(format!("missing or empty <{tag}>")));
    }
    Ok(text.to_string())
}

/// Text of a named descendant, empty string when absent. Used for fields
/// the firmware legitimately leaves blank (e.g. empty message bodies).
fn optional_text(scope: Node<'_, '_>, tag: &str) -> String {
    scope
        .descendants()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(str::trim)
        .unwrap_or("")
        .to_string()
}

/// A required numeric field clamped to 0–100.
fn required_percent(scope: Node<'_, '_>, tag: &str) -> Result<u8, ModemError> {
    let text = required_text(scope, tag)?;
    let value: i64 = text
        .parse()
        .map_err(|_| ModemError::Parse(format!("non-numeric <{tag}>: {text:?}")))?;
    Ok(value.clamp(0, 100) as u8)
}

fn ancestor_is(node: &Node<'_, '_>, tag: &str) -> bool {
    node.ancestors().any(|a| a.has_tag_name(tag))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
