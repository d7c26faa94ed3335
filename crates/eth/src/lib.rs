//! Ethereum-flavoured value types shared by every solver component:
//! addresses, wei-denominated amounts and gas. Kept deliberately thin — this
//! crate owns no business logic, only the newtypes that let the rest of the
//! workspace talk about tokens and amounts without passing raw [`U256`]s and
//! byte slices around.

use {
    alloy_primitives::{Address, U256},
    derive_more::{Add, From, Into},
    serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _},
    std::{fmt, str::FromStr},
};

/// A 20-byte token address, canonicalized to lowercase on parse so that two
/// addresses that differ only in checksum casing compare, hash and display
/// identically everywhere downstream.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAddress(Address);

impl TokenAddress {
    pub fn as_address(&self) -> Address {
        self.0
    }
}

impl From<Address> for TokenAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl FromStr for TokenAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_str(s)
            .map(Self)
            .map_err(|_| ParseAddressError(s.to_owned()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid token address: {0}")]
pub struct ParseAddressError(String);

impl fmt::Debug for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl Serialize for TokenAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(D::Error::custom)
    }
}

/// Well-known token addresses with protocol-wide meaning.
pub mod well_known {
    use super::TokenAddress;
    use alloy_primitives::address;

    /// Wrapped Ether is always priced 1:1 against native ETH, skipping the
    /// oracle chain entirely.
    pub const WETH: TokenAddress =
        TokenAddress(address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"));
}

/// A plain token amount (no implied fixed-point scale; the scale is
/// PRECISION only for *price/ratio* values, defined in the `fixed-point`
/// crate).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, From, Into)]
pub struct TokenAmount(pub U256);

/// An amount of a specific token.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Asset {
    pub token: TokenAddress,
    pub amount: TokenAmount,
}

/// An amount denominated in ETH (wei, 18 decimals) — the currency all
/// external prices and scores are expressed in.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Add, From, Into)]
pub struct Ether(pub U256);

/// Gas units, as opposed to gas *price*.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Add, From, Into)]
pub struct Gas(pub u64);

/// Wei per unit of gas (`effectiveGasPrice` in the auction payload).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, From, Into)]
pub struct GasPrice(pub U256);

impl Gas {
    /// Converts a gas estimate into an ETH cost at the given gas price.
    pub fn cost(self, price: GasPrice) -> Ether {
        Ether(U256::from(self.0).saturating_mul(price.0))
    }
}

/// An opaque, order-scoped identifier. The protocol encodes this as a
/// 56-byte blob (order digest + owner + deadline) but nothing in this
/// workspace inspects its structure, so it is kept as raw bytes compared
/// byte-for-byte, matching the spec's "opaque identifier" contract.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderUid(pub Vec<u8>);

impl fmt::Debug for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl FromStr for OrderUid {
    type Err = ParseUidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(stripped)
            .map(Self)
            .map_err(|_| ParseUidError(s.to_owned()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid order uid: {0}")]
pub struct ParseUidError(String);

impl Serialize for OrderUid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderUid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(D::Error::custom)
    }
}
