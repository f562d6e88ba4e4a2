//! Address substitution in previously captured calldata.
//!
//! This is a byte-pattern heuristic, not an ABI decoder: the calldata is split into
//! the 4-byte selector and 32-byte words, and the last word that looks like a
//! left-padded address is treated as the sender slot.

use alloy::{
    hex,
    primitives::{Address, Bytes, FixedBytes},
};

use super::PayloadError;

pub const SELECTOR_LEN: usize = 4;
pub const WORD_LEN: usize = 32;

/// Number of zero bytes that pad an address to a full word.
const ADDRESS_PADDING: usize = WORD_LEN - 20;

/// Best-effort classification of one calldata word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// 12 zero bytes followed by 20 bytes that are not all zero.
    Address(Address),
    /// All 32 bytes are zero; a numeric zero, never an address.
    Zero,
    Bytes32,
    /// Trailing bytes that don't fill a whole word.
    Unknown,
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentKind::Address(addr) => write!(f, "address ({addr})"),
            SegmentKind::Zero => write!(f, "uint256 (0)"),
            SegmentKind::Bytes32 => write!(f, "bytes32"),
            SegmentKind::Unknown => write!(f, "unknown"),
        }
    }
}

pub fn classify_segment(segment: &[u8]) -> SegmentKind {
    if segment.len() != WORD_LEN {
        return SegmentKind::Unknown;
    }
    let (padding, tail) = segment.split_at(ADDRESS_PADDING);
    let padding_is_zero = padding.iter().all(|b| *b == 0);
    let tail_is_zero = tail.iter().all(|b| *b == 0);
    match (padding_is_zero, tail_is_zero) {
        (true, true) => SegmentKind::Zero,
        (true, false) => SegmentKind::Address(Address::from_slice(tail)),
        _ => SegmentKind::Bytes32,
    }
}

/// Captured calldata with a known sender slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadTemplate {
    raw: Bytes,
    address_slot: usize,
}

impl PayloadTemplate {
    /// Parses hex calldata (with or without `0x`) and locates the address slot.
    pub fn parse(input: &str) -> Result<Self, PayloadError> {
        let raw = hex::decode(input.trim())?;
        Self::from_bytes(raw)
    }

    pub fn from_bytes(raw: impl Into<Bytes>) -> Result<Self, PayloadError> {
        let raw: Bytes = raw.into();
        if raw.len() < SELECTOR_LEN {
            return Err(PayloadError::TooShort(raw.len()));
        }
        let address_slot = raw[SELECTOR_LEN..]
            .chunks(WORD_LEN)
            .map(classify_segment)
            .rposition(|kind| matches!(kind, SegmentKind::Address(_)))
            .ok_or(PayloadError::NoAddressSlot)?;
        Ok(Self { raw, address_slot })
    }

    /// Overrides the detected slot. The word at `slot` must be a full 32-byte word.
    pub fn with_address_slot(mut self, slot: usize) -> Result<Self, PayloadError> {
        let words = self.segments().count();
        if slot >= words || self.segments().nth(slot).map(<[u8]>::len) != Some(WORD_LEN) {
            return Err(PayloadError::AddressSlotOutOfRange { slot, words });
        }
        self.address_slot = slot;
        Ok(self)
    }

    pub fn selector(&self) -> FixedBytes<4> {
        FixedBytes::from_slice(&self.raw[..SELECTOR_LEN])
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn address_slot(&self) -> usize {
        self.address_slot
    }

    pub fn segments(&self) -> impl Iterator<Item = &[u8]> {
        self.raw[SELECTOR_LEN..].chunks(WORD_LEN)
    }

    pub fn classify(&self) -> Vec<SegmentKind> {
        self.segments().map(classify_segment).collect()
    }

    /// Returns the calldata with the address slot replaced by `address`.
    pub fn substitute(&self, address: Address) -> Bytes {
        let mut out = self.raw.to_vec();
        let start = SELECTOR_LEN + self.address_slot * WORD_LEN;
        out[start..start + ADDRESS_PADDING].fill(0);
        out[start + ADDRESS_PADDING..start + WORD_LEN].copy_from_slice(address.as_slice());
        out.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(hex_str: &str) -> String {
        format!("{hex_str:0>64}")
    }

    #[test]
    fn classifies_segments() {
        let addr = hex::decode(word("1111111111111111111111111111111111111111")).unwrap();
        assert!(matches!(classify_segment(&addr), SegmentKind::Address(_)));

        let zero = [0u8; 32];
        assert_eq!(classify_segment(&zero), SegmentKind::Zero);

        let full = [0xffu8; 32];
        assert_eq!(classify_segment(&full), SegmentKind::Bytes32);

        let mut high_bit = [0u8; 32];
        high_bit[0] = 1;
        high_bit[31] = 1;
        assert_eq!(classify_segment(&high_bit), SegmentKind::Bytes32);

        assert_eq!(classify_segment(&[0u8; 20]), SegmentKind::Unknown);
    }

    #[test]
    fn substitutes_single_address_word() {
        let input = format!(
            "0xabcdef12{}",
            word("2222222222222222222222222222222222222222")
        );
        let template = PayloadTemplate::parse(&input).unwrap();
        let wallet: Address = "0x1111111111111111111111111111111111111111"
            .parse()
            .unwrap();

        let out = hex::encode_prefixed(template.substitute(wallet));
        let expected = format!("0xabcdef12{}{}", "0".repeat(24), "1".repeat(40));
        assert_eq!(out, expected);
        assert_eq!(out.len(), input.len());
    }

    #[test]
    fn lowercases_checksummed_addresses() {
        let input = format!("0xabcdef12{}", word("00000000000000000000000000000000000000ff"));
        let template = PayloadTemplate::parse(&input).unwrap();
        let wallet: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            .parse()
            .unwrap();
        let out = hex::encode_prefixed(template.substitute(wallet));
        assert!(out.ends_with("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
    }

    #[test]
    fn passes_other_words_through() {
        let flag = "f".repeat(64);
        let input = format!(
            "0x40c10f19{}{}{}",
            flag,
            word("3333333333333333333333333333333333333333"),
            "0".repeat(64)
        );
        let template = PayloadTemplate::parse(&input).unwrap();
        assert_eq!(template.address_slot(), 1);
        assert_eq!(
            template.classify()[..],
            [
                SegmentKind::Bytes32,
                SegmentKind::Address(
                    "0x3333333333333333333333333333333333333333"
                        .parse()
                        .unwrap()
                ),
                SegmentKind::Zero,
            ]
        );

        let out = hex::encode(template.substitute(Address::repeat_byte(0x44)));
        assert!(out.starts_with(&format!("40c10f19{flag}")));
        assert!(out.ends_with(&format!("{}{}", "44".repeat(20), "0".repeat(64))));
    }

    #[test]
    fn picks_last_address_word() {
        let input = format!(
            "0x23b872dd{}{}{}",
            word("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            word("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
            "f".repeat(64)
        );
        let template = PayloadTemplate::parse(&input).unwrap();
        assert_eq!(template.address_slot(), 1);

        let out = hex::encode(template.substitute(Address::repeat_byte(0x11)));
        assert!(out.contains(&"a".repeat(40)));
        assert!(!out.contains(&"b".repeat(40)));
    }

    #[test]
    fn substitution_is_idempotent() {
        let input = format!(
            "0xabcdef12{}{}",
            "e".repeat(64),
            word("2222222222222222222222222222222222222222")
        );
        let template = PayloadTemplate::parse(&input).unwrap();
        let wallet = Address::repeat_byte(0x55);
        let first = template.substitute(wallet);
        let second = template.substitute(wallet);
        assert_eq!(first, second);

        let again = PayloadTemplate::from_bytes(first.clone())
            .unwrap()
            .substitute(wallet);
        assert_eq!(again, first);
    }

    #[test]
    fn rejects_payload_without_address_word() {
        let input = format!("0xabcdef12{}{}", "0".repeat(64), "f".repeat(64));
        assert!(matches!(
            PayloadTemplate::parse(&input),
            Err(PayloadError::NoAddressSlot)
        ));
        assert!(matches!(
            PayloadTemplate::parse("0xabcdef12"),
            Err(PayloadError::NoAddressSlot)
        ));
    }

    #[test]
    fn rejects_short_or_malformed_input() {
        assert!(matches!(
            PayloadTemplate::parse("0xabcd"),
            Err(PayloadError::TooShort(2))
        ));
        assert!(matches!(
            PayloadTemplate::parse("0xzz"),
            Err(PayloadError::InvalidHex(_))
        ));
    }

    #[test]
    fn address_slot_override_is_checked() {
        let input = format!(
            "0xabcdef12{}{}",
            word("2222222222222222222222222222222222222222"),
            word("5")
        );
        let template = PayloadTemplate::parse(&input).unwrap();
        assert_eq!(template.address_slot(), 1);
        let template = template.with_address_slot(0).unwrap();
        assert_eq!(template.address_slot(), 0);
        assert!(matches!(
            template.with_address_slot(2),
            Err(PayloadError::AddressSlotOutOfRange { slot: 2, words: 2 })
        ));
    }
}
