//! Canonical JSON encoding of decoded ABI values.
//!
//! Every value leaving the decoder is reduced to a JSON-native shape that
//! round-trips losslessly, independent of its declared Solidity type:
//! integers (including 256-bit) become decimal strings, addresses become
//! EIP-55 checksummed hex, byte blobs become lowercase `0x` hex, and
//! booleans/strings pass through natively.

use alloy::dyn_abi::DynSolValue;
use indexer_common::models::checksum_address;
use serde_json::Value;

pub fn encode_value(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(bytes, size) => {
            Value::String(format!("0x{}", alloy::hex::encode(&bytes[..*size])))
        }
        DynSolValue::Address(addr) => Value::String(checksum_address(&addr.to_string())),
        DynSolValue::Function(f) => Value::String(format!("0x{}", alloy::hex::encode(f.as_ref()))),
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", alloy::hex::encode(bytes))),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            Value::Array(items.iter().map(encode_value).collect())
        }
        DynSolValue::Tuple(items) => Value::Array(items.iter().map(encode_value).collect()),
        DynSolValue::CustomStruct { tuple, prop_names, .. } => {
            let mut map = serde_json::Map::with_capacity(tuple.len());
            for (name, v) in prop_names.iter().zip(tuple.iter()) {
                map.insert(name.clone(), encode_value(v));
            }
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use std::str::FromStr;

    #[test]
    fn encodes_uint256_without_precision_loss() {
        let big = U256::from_str(
            "57896044618658097711785492504343953926634992332820282019728792003956564819968",
        )
        .unwrap();
        let encoded = encode_value(&DynSolValue::Uint(big, 256));
        assert_eq!(
            encoded.as_str().unwrap(),
            "57896044618658097711785492504343953926634992332820282019728792003956564819968"
        );
    }

    #[test]
    fn encodes_address_checksummed() {
        let addr = Address::from_str("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        let encoded = encode_value(&DynSolValue::Address(addr));
        assert_eq!(
            encoded.as_str().unwrap(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn encodes_bool_and_string_natively() {
        assert_eq!(encode_value(&DynSolValue::Bool(true)), Value::Bool(true));
        assert_eq!(
            encode_value(&DynSolValue::String("hello".into())),
            Value::String("hello".into())
        );
    }
}
