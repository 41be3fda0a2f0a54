//! Outbound envelopes
//!
//! Every published message is serialized to JSON once and shared between all
//! subscriber queues as an [`OutboundFrame`]. Cloning a frame only bumps a
//! reference count.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::codec::{
    DecodedMessage, HeaderView, MemberMetadata, MemberPosition, Payload, TargetPosition,
    ThreatReport,
};

/// Serialized text frame shared across subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    text: Arc<str>,
}

impl OutboundFrame {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// ISO-8601 UTC with millisecond precision and a `Z` suffix
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Serialize)]
#[serde(untagged)]
enum RecordsView<'a> {
    Members(&'a [MemberPosition]),
    Metadata(&'a [MemberMetadata]),
    Targets(&'a [TargetPosition]),
    Threats(&'a [ThreatReport]),
    Empty([(); 0]),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    opcode: u8,
    data: RecordsView<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender_global_id: Option<u32>,
    header: HeaderView,
    timestamp: String,
    raw_length: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WelcomeEnvelope<'a> {
    message: &'a str,
    udp_server: &'a str,
    timestamp: String,
}

/// Serialize a decoded message into its subscriber envelope
pub fn message_frame(msg: &DecodedMessage) -> Result<OutboundFrame, serde_json::Error> {
    let (data, sender_global_id) = match &msg.payload {
        Payload::MemberPositions(members) => (RecordsView::Members(members), None),
        Payload::MemberMetadata(members) => (RecordsView::Metadata(members), None),
        Payload::TargetPositions(targets) => (RecordsView::Targets(targets), None),
        Payload::ThreatReports(batch) => {
            (RecordsView::Threats(&batch.threats), batch.sender_global_id)
        }
        Payload::Unknown { .. } => (RecordsView::Empty([]), None),
    };

    let envelope = MessageEnvelope {
        kind: msg.payload.kind(),
        opcode: msg.payload.opcode(),
        data,
        sender_global_id,
        header: msg.header.to_wire(),
        timestamp: iso_timestamp(msg.received_at),
        raw_length: u32::try_from(msg.raw_length).unwrap_or(u32::MAX),
    };

    Ok(OutboundFrame::new(serde_json::to_string(&envelope)?))
}

/// Serialize the greeting sent to each new subscriber
pub fn welcome_frame(
    message: &str,
    udp_server: &str,
    at: DateTime<Utc>,
) -> Result<OutboundFrame, serde_json::Error> {
    let envelope = WelcomeEnvelope {
        message,
        udp_server,
        timestamp: iso_timestamp(at),
    };
    Ok(OutboundFrame::new(serde_json::to_string(&envelope)?))
}
