//! Cabinet peripherals: buttons, card reader, access code.

use std::fmt;

use bitflags::bitflags;

use crate::error::BridgeError;

bitflags! {
    /// Cabinet button states, bit-for-bit the event-frame mask byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ButtonMask: u8 {
        const COIN = 0b0000_0001;
        const SERVICE = 0b0000_0010;
        const TEST = 0b0000_0100;
    }
}

// ── AccessCode ───────────────────────────────────────────────────

/// A validated 20-digit decimal card access code.
///
/// Construction is the only validation point; a held `AccessCode` is
/// always packable into 10 BCD bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCode(String);

impl AccessCode {
    /// Validate and wrap a code. Exactly 20 decimal digits required.
    pub fn parse(code: &str) -> Result<Self, BridgeError> {
        if code.len() == 20 && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_string()))
        } else {
            Err(BridgeError::InvalidAccessCode)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pack into BCD: two digits per byte, left digit in the high nibble.
    pub fn to_bcd(&self) -> [u8; 10] {
        let digits = self.0.as_bytes();
        let mut bcd = [0u8; 10];
        for (i, out) in bcd.iter_mut().enumerate() {
            let high = digits[i * 2] - b'0';
            let low = digits[i * 2 + 1] - b'0';
            *out = (high << 4) | low;
        }
        bcd
    }

    /// Reconstruct the digit string from packed BCD.
    ///
    /// Fails if any nibble is not a decimal digit.
    pub fn from_bcd(bcd: &[u8; 10]) -> Result<Self, BridgeError> {
        let mut digits = String::with_capacity(20);
        for &byte in bcd {
            let high = byte >> 4;
            let low = byte & 0x0F;
            if high > 9 || low > 9 {
                return Err(BridgeError::InvalidAccessCode);
            }
            digits.push((b'0' + high) as char);
            digits.push((b'0' + low) as char);
        }
        Ok(Self(digits))
    }
}

impl fmt::Display for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the full code; it identifies a player's card.
        write!(f, "{}****************", &self.0[..4])
    }
}

// ── CabinetState ─────────────────────────────────────────────────

/// Snapshot of the cabinet peripherals, sampled atomically per encode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CabinetState {
    pub buttons: ButtonMask,
    /// A card is held against the reader.
    pub card_present: bool,
    /// The configured access code, if any.
    pub access_code: Option<AccessCode>,
}

impl CabinetState {
    /// The card path is taken only with a present card and a valid code.
    pub fn card_ready(&self) -> bool {
        self.card_present && self.access_code.is_some()
    }
}

// ── Tests ────────────────────────────────────────────────────────
