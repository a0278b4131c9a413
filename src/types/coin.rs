//! Token amounts attached to contract calls.

use host_derive::BinaryCodec;
use serde::{Deserialize, Serialize};

/// An amount of a single denomination.
///
/// The amount is serialized as a decimal string so that values above
/// 2^53 survive JSON round trips in any engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BinaryCodec)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "amount_string")]
    pub amount: u128,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

/// True when no coin carries a positive amount.
pub fn coins_are_zero(coins: &[Coin]) -> bool {
    coins.iter().all(|c| c.amount == 0)
}

mod amount_string {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map_err(D::Error::custom)
    }
}
