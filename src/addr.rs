//! Address parsing and display helpers.
//!
//! Every textual address enters the crate through [`parse_address`]. The
//! typed [`Address`] makes identity comparison exact regardless of the
//! casing the chain or the user supplied, so there is exactly one place
//! where casing normalization happens.

use crate::error::Error;
use ethers::types::Address;

/// Parse a `0x…` address, accepting any hex casing.
pub fn parse_address(text: &str) -> Result<Address, Error> {
    text.trim()
        .parse::<Address>()
        .map_err(|e| Error::Address(format!("{text}: {e}")))
}

/// Canonical lowercase `0x…` rendering.
pub fn format_address(address: Address) -> String {
    format!("{address:?}")
}

/// Shorten an address for display: first six chars, ellipsis, last four.
/// The empty string passes through unchanged.
pub fn shorten_address(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }
    let head: String = address.chars().take(6).collect();
    let skip = address.chars().count().saturating_sub(4);
    let tail: String = address.chars().skip(skip).collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_empty_is_empty() {
        assert_eq!(shorten_address(""), "");
    }

    #[test]
    fn shorten_keeps_head_and_tail() {
        let address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
        assert_eq!(shorten_address(address), "0xf39f...2266");
    }

    #[test]
    fn parse_ignores_case_and_whitespace() {
        let lower = parse_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        let upper = parse_address("  0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266 ").unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn format_is_full_lowercase_hex() {
        let address = parse_address("0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266").unwrap();
        assert_eq!(
            format_address(address),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_address("not-an-address").is_err());
    }
}
