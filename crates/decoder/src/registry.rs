//! ABI-driven event registry and decoder.
//!
//! Each registered contract contributes one [`AbiRegistry`], built once from
//! its stored ABI text and keyed by `topic0` (the keccak256 hash of the
//! event's canonical signature). Decoding a raw log is then a single
//! hashmap lookup plus an ABI-rules decode of the remaining topics/data.

use std::collections::HashMap;

use alloy::dyn_abi::EventExt;
use alloy::json_abi::{Event, JsonAbi};
use alloy::primitives::{B256, Log};
use indexer_common::error::IndexerError;
use serde_json::Value;

use crate::value::encode_value;

/// A single decoded log: the event name plus its arguments keyed by ABI
/// parameter name, each value canonically encoded (see [`crate::value`]).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    pub event_name: String,
    pub args: Value,
}

/// Topic0-indexed event table for one contract's ABI.
pub struct AbiRegistry {
    events_by_topic0: HashMap<B256, Event>,
}

impl AbiRegistry {
    /// Parse a contract's ABI JSON text and index its non-anonymous events
    /// by topic0. Anonymous events have no topic0 to key on and are
    /// intentionally excluded (out of scope for MVP, per design notes).
    pub fn parse(abi_json: &str) -> Result<Self, IndexerError> {
        let abi = JsonAbi::from_json_str(abi_json)
            .map_err(|e| IndexerError::DecodeFatal(format!("invalid ABI json: {e}")))?;

        let mut events_by_topic0 = HashMap::new();
        for event in abi.events() {
            if event.anonymous {
                tracing::warn!(event = %event.name, "skipping anonymous event, unsupported");
                continue;
            }
            events_by_topic0.insert(event.selector(), event.clone());
        }

        if events_by_topic0.is_empty() {
            tracing::warn!("ABI contains no decodable (non-anonymous) events");
        }

        Ok(Self { events_by_topic0 })
    }

    pub fn len(&self) -> usize {
        self.events_by_topic0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events_by_topic0.is_empty()
    }

    /// Decode a single raw log.
    ///
    /// Returns `Ok(None)` for a log whose topic0 is absent or not present in
    /// this registry (an unknown event — skipped, not an error). Returns
    /// `Err` for a log whose topic0 matches but whose shape doesn't fit the
    /// ABI (topic-count mismatch, malformed data) — a decode-skippable error
    /// the caller should count against the contract but not halt on.
    pub fn decode_log(&self, log: &Log) -> Result<Option<DecodedLog>, IndexerError> {
        let topics = log.topics();
        let Some(topic0) = topics.first() else {
            return Ok(None);
        };
        let Some(event) = self.events_by_topic0.get(topic0) else {
            return Ok(None);
        };

        let decoded = event
            .decode_log_parts(topics.iter().copied(), log.data.data.as_ref(), false)
            .map_err(|e| {
                IndexerError::DecodeSkippable(format!("{}: failed to decode: {e}", event.name))
            })?;

        let mut indexed_iter = decoded.indexed.into_iter();
        let mut body_iter = decoded.body.into_iter();
        let mut args = serde_json::Map::with_capacity(event.inputs.len());

        for input in &event.inputs {
            let value = if input.indexed {
                indexed_iter.next()
            } else {
                body_iter.next()
            };
            if let Some(v) = value {
                args.insert(input.name.clone(), encode_value(&v));
            }
        }

        Ok(Some(DecodedLog {
            event_name: event.name.clone(),
            args: Value::Object(args),
        }))
    }
}
