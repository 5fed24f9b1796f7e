/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Telegram values and their type-specific data layouts.
//!
//! A [`Telegram`] is the structured form of one 128-byte frame. The `data`
//! field is kept as text; [`Telegram::payload`] interprets it according to the
//! telegram kind:
//!
//! | Kind | Layout |
//! |---|---|
//! | `LI` | `PING` / `PONG` |
//! | `MO` | `TU[20] SRC_BIN[20] DST_BIN[20] PRIORITY[2]` |
//! | `CF` | `TU[20] BIN[20] STATUS[4] TIMESTAMP[14]` |
//! | `ER` | `ERRCODE[4] ERRMSG[98]` |

use crate::types::TelegramKind;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Width of the data area in bytes.
pub const DATA_LEN: usize = 102;

/// Width of a transport-unit identifier.
pub const TU_LEN: usize = 20;

/// Width of a storage bin identifier.
pub const BIN_LEN: usize = 20;

/// Width of a move order priority.
pub const PRIORITY_LEN: usize = 2;

/// Width of a confirmation status.
pub const STATUS_LEN: usize = 4;

/// Width of a confirmation timestamp (`YYYYMMDDhhmmss`).
pub const TIMESTAMP_LEN: usize = 14;

/// Width of an error code.
pub const ERR_CODE_LEN: usize = 4;

/// Width of an error message.
pub const ERR_MSG_LEN: usize = 98;

/// Status written into automatic confirmations.
pub const STATUS_DONE: &str = "DONE";

/// `chrono` format of the confirmation timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One protocol message in structured form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Telegram {
    kind: TelegramKind,
    subtype: u8,
    source: String,
    destination: String,
    sequence: u32,
    data: String,
}

impl Telegram {
    /// Creates a telegram with subtype `00`.
    ///
    /// # Arguments
    /// * `kind` - Telegram type
    /// * `source` - Sending device or system (rendered in 8 characters)
    /// * `destination` - Receiving device or system (rendered in 8 characters)
    /// * `sequence` - Sequence number (rendered modulo 1 000 000)
    /// * `data` - Type-specific payload text (rendered in 102 characters)
    #[must_use]
    pub fn new(
        kind: TelegramKind,
        source: impl Into<String>,
        destination: impl Into<String>,
        sequence: u32,
        data: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            subtype: 0,
            source: source.into(),
            destination: destination.into(),
            sequence,
            data: data.into(),
        }
    }

    /// Sets the subtype (rendered modulo 100).
    #[must_use]
    pub const fn with_subtype(mut self, subtype: u8) -> Self {
        self.subtype = subtype;
        self
    }

    /// Builds a `LI` heartbeat.
    #[must_use]
    pub fn life(source: &str, destination: &str, sequence: u32, signal: LifeSignal) -> Self {
        Self::new(TelegramKind::Life, source, destination, sequence, signal.as_str())
    }

    /// Builds a `MO` move order.
    #[must_use]
    pub fn move_order(source: &str, destination: &str, sequence: u32, order: &MoveOrder) -> Self {
        Self::new(
            TelegramKind::MoveOrder,
            source,
            destination,
            sequence,
            order.to_data(),
        )
    }

    /// Builds a `CF` confirmation.
    #[must_use]
    pub fn confirmation(
        source: &str,
        destination: &str,
        sequence: u32,
        confirmation: &Confirmation,
    ) -> Self {
        Self::new(
            TelegramKind::Confirmation,
            source,
            destination,
            sequence,
            confirmation.to_data(),
        )
    }

    /// Builds an `ER` error telegram.
    #[must_use]
    pub fn error(source: &str, destination: &str, sequence: u32, report: &ErrorReport) -> Self {
        Self::new(TelegramKind::Error, source, destination, sequence, report.to_data())
    }

    /// Returns the telegram type.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> TelegramKind {
        self.kind
    }

    /// Returns the subtype.
    #[inline]
    #[must_use]
    pub const fn subtype(&self) -> u8 {
        self.subtype
    }

    /// Returns the source name.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the destination name.
    #[inline]
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Returns the sequence number.
    #[inline]
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Returns the raw data text.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Returns true for a `LI` telegram carrying `PING`.
    #[must_use]
    pub fn is_ping(&self) -> bool {
        matches!(self.payload(), Payload::Life(Some(LifeSignal::Ping)))
    }

    /// Interprets the data text according to the telegram kind.
    #[must_use]
    pub fn payload(&self) -> Payload {
        match self.kind {
            TelegramKind::Life => Payload::Life(LifeSignal::parse(&self.data)),
            TelegramKind::MoveOrder => Payload::MoveOrder(MoveOrder::from_data(&self.data)),
            TelegramKind::Confirmation => {
                Payload::Confirmation(Confirmation::from_data(&self.data))
            }
            TelegramKind::Error => Payload::Error(ErrorReport::from_data(&self.data)),
        }
    }
}

/// Typed view of a telegram's data area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Heartbeat; `None` when the data is neither `PING` nor `PONG`.
    Life(Option<LifeSignal>),
    /// Move order fields.
    MoveOrder(MoveOrder),
    /// Confirmation fields.
    Confirmation(Confirmation),
    /// Error fields.
    Error(ErrorReport),
}

/// Heartbeat payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifeSignal {
    /// Request for a sign of life.
    Ping,
    /// Answer to a ping.
    Pong,
}

impl LifeSignal {
    /// Returns the wire text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::Pong => "PONG",
        }
    }

    /// Parses heartbeat data, ignoring padding.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data.trim() {
            "PING" => Some(Self::Ping),
            "PONG" => Some(Self::Pong),
            _ => None,
        }
    }
}

/// `MO` data: relocate a transport unit between two bins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveOrder {
    /// Transport unit identifier.
    pub transport_unit: String,
    /// Bin the unit is taken from.
    pub source_bin: String,
    /// Bin the unit is moved to.
    pub destination_bin: String,
    /// Two-character priority.
    pub priority: String,
}

impl MoveOrder {
    /// Creates a move order.
    #[must_use]
    pub fn new(
        transport_unit: impl Into<String>,
        source_bin: impl Into<String>,
        destination_bin: impl Into<String>,
        priority: impl Into<String>,
    ) -> Self {
        Self {
            transport_unit: transport_unit.into(),
            source_bin: source_bin.into(),
            destination_bin: destination_bin.into(),
            priority: priority.into(),
        }
    }

    /// Renders the fixed data layout, without trailing padding.
    #[must_use]
    pub fn to_data(&self) -> String {
        let mut data = String::with_capacity(DATA_LEN);
        push_fixed(&mut data, &self.transport_unit, TU_LEN);
        push_fixed(&mut data, &self.source_bin, BIN_LEN);
        push_fixed(&mut data, &self.destination_bin, BIN_LEN);
        push_fixed(&mut data, &self.priority, PRIORITY_LEN);
        trim_padding(data)
    }

    /// Reads the fixed data layout. Missing columns become empty strings.
    #[must_use]
    pub fn from_data(data: &str) -> Self {
        let mut cols = Columns::new(data);
        Self {
            transport_unit: cols.take(TU_LEN),
            source_bin: cols.take(BIN_LEN),
            destination_bin: cols.take(BIN_LEN),
            priority: cols.take(PRIORITY_LEN),
        }
    }
}

/// `CF` data: completion report for a transport unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Confirmation {
    /// Transport unit identifier.
    pub transport_unit: String,
    /// Bin the unit ended up in.
    pub bin: String,
    /// Four-character status.
    pub status: String,
    /// Completion time, `YYYYMMDDhhmmss`.
    pub timestamp: String,
}

impl Confirmation {
    /// Creates a `DONE` confirmation stamped with the given local time.
    #[must_use]
    pub fn done(transport_unit: &str, bin: &str, at: DateTime<Local>) -> Self {
        Self {
            transport_unit: transport_unit.to_string(),
            bin: bin.to_string(),
            status: STATUS_DONE.to_string(),
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Renders the fixed data layout, without trailing padding.
    #[must_use]
    pub fn to_data(&self) -> String {
        let mut data = String::with_capacity(DATA_LEN);
        push_fixed(&mut data, &self.transport_unit, TU_LEN);
        push_fixed(&mut data, &self.bin, BIN_LEN);
        push_fixed(&mut data, &self.status, STATUS_LEN);
        push_fixed(&mut data, &self.timestamp, TIMESTAMP_LEN);
        trim_padding(data)
    }

    /// Reads the fixed data layout. Missing columns become empty strings.
    #[must_use]
    pub fn from_data(data: &str) -> Self {
        let mut cols = Columns::new(data);
        Self {
            transport_unit: cols.take(TU_LEN),
            bin: cols.take(BIN_LEN),
            status: cols.take(STATUS_LEN),
            timestamp: cols.take(TIMESTAMP_LEN),
        }
    }
}

/// `ER` data: error code and message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Four-character error code.
    pub code: String,
    /// Free-text message.
    pub message: String,
}

impl ErrorReport {
    /// Creates an error report.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Renders the fixed data layout, without trailing padding.
    #[must_use]
    pub fn to_data(&self) -> String {
        let mut data = String::with_capacity(DATA_LEN);
        push_fixed(&mut data, &self.code, ERR_CODE_LEN);
        push_fixed(&mut data, &self.message, ERR_MSG_LEN);
        trim_padding(data)
    }

    /// Reads the fixed data layout. Missing columns become empty strings.
    #[must_use]
    pub fn from_data(data: &str) -> Self {
        let mut cols = Columns::new(data);
        Self {
            code: cols.take(ERR_CODE_LEN),
            message: cols.take(ERR_MSG_LEN),
        }
    }
}

/// Appends `value` truncated or space-padded to exactly `width` characters.
fn push_fixed(out: &mut String, value: &str, width: usize) {
    let mut written = 0;
    for c in value.chars().take(width) {
        out.push(c);
        written += 1;
    }
    out.extend(std::iter::repeat_n(' ', width - written));
}

fn trim_padding(mut data: String) -> String {
    let keep = data.trim_end_matches(' ').len();
    data.truncate(keep);
    data
}

/// Sequential fixed-width column reader over a data string.
struct Columns<'a> {
    rest: std::str::Chars<'a>,
}

impl<'a> Columns<'a> {
    fn new(data: &'a str) -> Self {
        Self { rest: data.chars() }
    }

    fn take(&mut self, width: usize) -> String {
        let column: String = self.rest.by_ref().take(width).collect();
        column.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_move_order_layout() {
        let order = MoveOrder::new("TU00001", "A01", "B02", "05");
        let data = order.to_data();
        assert_eq!(data.len(), TU_LEN + 2 * BIN_LEN + PRIORITY_LEN);
        assert_eq!(&data[0..7], "TU00001");
        assert_eq!(&data[20..23], "A01");
        assert_eq!(&data[40..43], "B02");
        assert_eq!(&data[60..62], "05");
        assert_eq!(MoveOrder::from_data(&data), order);
    }

    #[test]
    fn test_move_order_truncates_long_fields() {
        let order = MoveOrder::new("X".repeat(30), "A01", "B02", "123");
        let parsed = MoveOrder::from_data(&order.to_data());
        assert_eq!(parsed.transport_unit, "X".repeat(20));
        assert_eq!(parsed.priority, "12");
    }

    #[test]
    fn test_move_order_from_short_data() {
        let parsed = MoveOrder::from_data("TU1");
        assert_eq!(parsed.transport_unit, "TU1");
        assert_eq!(parsed.source_bin, "");
        assert_eq!(parsed.priority, "");
    }

    #[test]
    fn test_confirmation_done() {
        let at = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let cf = Confirmation::done("TU00001", "B02", at);
        assert_eq!(cf.status, STATUS_DONE);
        assert_eq!(cf.timestamp, "20260304050607");

        let data = cf.to_data();
        assert_eq!(data.len(), TU_LEN + BIN_LEN + STATUS_LEN + TIMESTAMP_LEN);
        assert_eq!(Confirmation::from_data(&data), cf);
    }

    #[test]
    fn test_error_report_layout() {
        let report = ErrorReport::new("E001", "Manual error for TU TU9");
        let data = report.to_data();
        assert!(data.starts_with("E001Manual error"));
        assert_eq!(ErrorReport::from_data(&data), report);
    }

    #[test]
    fn test_life_signal_parse() {
        assert_eq!(LifeSignal::parse("PING   "), Some(LifeSignal::Ping));
        assert_eq!(LifeSignal::parse("PONG"), Some(LifeSignal::Pong));
        assert_eq!(LifeSignal::parse(""), None);
    }

    #[test]
    fn test_payload_dispatch() {
        let ping = Telegram::life("PLC-SIM", "EWM-MFS", 1, LifeSignal::Ping);
        assert!(ping.is_ping());
        assert_eq!(ping.payload(), Payload::Life(Some(LifeSignal::Ping)));

        let order = MoveOrder::new("TU1", "A", "B", "01");
        let mo = Telegram::move_order("EWM-MFS", "PLC-SIM", 7, &order);
        assert_eq!(mo.kind(), TelegramKind::MoveOrder);
        assert!(!mo.is_ping());
        assert_eq!(mo.payload(), Payload::MoveOrder(order));
    }

    #[test]
    fn test_with_subtype() {
        let t = Telegram::new(TelegramKind::Error, "A", "B", 3, "").with_subtype(42);
        assert_eq!(t.subtype(), 42);
        assert_eq!(t.sequence(), 3);
        assert_eq!(t.source(), "A");
        assert_eq!(t.destination(), "B");
    }
}
