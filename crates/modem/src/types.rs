//! Typed views of the modem's XML payloads.

use serde::Serialize;

/// One entry from the modem's inbox listing.
#[derive(Debug, Clone)]
pub struct InboxMessage {
    /// Monotonic slot index assigned by the modem.
    pub index: i64,
    pub phone: String,
    pub content: String,
    /// Timestamp string as reported by the firmware, passed through as-is.
    pub date: String,
    /// Raw modem status field (read/unread marker).
    pub status: String,
}

/// Delivery status of a previously sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
    /// Anything the firmware reports that we do not recognise.
    Unknown,
}

impl DeliveryStatus {
    /// Case-insensitive mapping from the firmware's status strings.
    pub fn from_modem(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => DeliveryStatus::Pending,
            "sent" => DeliveryStatus::Sent,
            "delivered" => DeliveryStatus::Delivered,
            "failed" => DeliveryStatus::Failed,
            _ => DeliveryStatus::Unknown,
        }
    }
}

/// Snapshot from the modem's monitoring endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModemHealth {
    /// 0–100.
    pub signal_strength: u8,
    pub network_type: String,
    pub network_name: String,
    /// 0–100.
    pub battery_level: u8,
    pub connection_status: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_case_insensitive() {
        assert_eq!(DeliveryStatus::from_modem("Delivered"), DeliveryStatus::Delivered);
        assert_eq!(DeliveryStatus::from_modem("SENT"), DeliveryStatus::Sent);
        assert_eq!(DeliveryStatus::from_modem("pending"), DeliveryStatus::Pending);
        assert_eq!(DeliveryStatus::from_modem("failed"), DeliveryStatus::Failed);
    }

    #[test]
    fn unknown_statuses_map_to_unknown() {
        assert_eq!(DeliveryStatus::from_modem("queued"), DeliveryStatus::Unknown);
        assert_eq!(DeliveryStatus::from_modem(""), DeliveryStatus::Unknown);
    }
}
