//! `data`, `data_consumer_created`, `data_consumer_closed`,
//! `data_producer_created` handlers.
//!
//! Grounded in `server/src/voice/sfu.rs::setup_track_handler`'s style of
//! registering callbacks on a transport-supplied handle right after
//! creation — generalized from RTP track callbacks to the data-consumer
//! `message`/`close`/`error` bindings spec.md §4.4 requires.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DomainError;
use crate::handlers::registry::{HandlerContext, MessageHandler};
use crate::protocol::{DataKind, DataPacket, InboundKind, InboundMessage, PulseEvent};
use crate::transport::DataConsumerOptions;

pub struct DataHandler;

#[async_trait]
impl MessageHandler for DataHandler {
    fn message_type(&self) -> &'static str {
        "data"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::Data { participant_sid, payload } = &message.kind else {
            unreachable!("registry only routes \"data\" frames to DataHandler");
        };
        ctx.events.emit(&PulseEvent::DataReceived {
            packet: DataPacket {
                kind: DataKind::Reliable,
                value: payload.clone(),
                participant_sid: participant_sid.clone(),
                timestamp: chrono::Utc::now(),
            },
        });
        Ok(())
    }
}

pub struct DataConsumerCreatedHandler;

#[async_trait]
impl MessageHandler for DataConsumerCreatedHandler {
    fn message_type(&self) -> &'static str {
        "data_consumer_created"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::DataConsumerCreated {
            producer_id,
            consumer_id,
            sctp_stream_parameters,
            participant_sid,
            label,
            ordered,
        } = &message.kind
        else {
            unreachable!("registry only routes \"data_consumer_created\" frames to DataConsumerCreatedHandler");
        };

        let kind = if label.contains("lossy") { DataKind::Lossy } else { DataKind::Reliable };

        let consumer = ctx
            .transport
            .add_data_consumer(
                producer_id,
                DataConsumerOptions {
                    id: consumer_id.clone(),
                    sctp_stream_parameters: sctp_stream_parameters.clone(),
                    participant_sid: participant_sid.clone(),
                    label: label.clone(),
                    ordered: *ordered,
                },
            )
            .await?;

        let events = ctx.events.clone();
        let participant_sid_for_message = participant_sid.clone();
        consumer.on_message(Box::new(move |payload: Value| {
            let value = decode_payload(payload);
            events.emit(&PulseEvent::DataReceived {
                packet: DataPacket {
                    kind,
                    value,
                    participant_sid: participant_sid_for_message.clone(),
                    timestamp: chrono::Utc::now(),
                },
            });
        }));

        let consumer_id_for_close = consumer_id.clone();
        consumer.on_close(Box::new(move || {
            debug!(consumer_id = %consumer_id_for_close, "data consumer closed");
        }));

        let consumer_id_for_error = consumer_id.clone();
        consumer.on_error(Box::new(move |message| {
            warn!(consumer_id = %consumer_id_for_error, error = %message, "data consumer error");
        }));

        Ok(())
    }
}

/// JSON-decode a string payload; fall back to the raw value on failure
/// (spec.md §4.4, `data_consumer_created`).
fn decode_payload(payload: Value) -> Value {
    if let Value::String(s) = &payload {
        if let Ok(decoded) = serde_json::from_str::<Value>(s) {
            return decoded;
        }
    }
    payload
}

/// Informational: the transport owns teardown (spec.md §4.4).
pub struct DataConsumerClosedHandler;

#[async_trait]
impl MessageHandler for DataConsumerClosedHandler {
    fn message_type(&self) -> &'static str {
        "data_consumer_closed"
    }

    async fn handle(&self, _ctx: &mut HandlerContext, _message: &InboundMessage) -> Result<(), DomainError> {
        debug!("data_consumer_closed received");
        Ok(())
    }
}

/// Acknowledge only: the transport owns producer lifetime (spec.md §4.4).
pub struct DataProducerCreatedHandler;

#[async_trait]
impl MessageHandler for DataProducerCreatedHandler {
    fn message_type(&self) -> &'static str {
        "data_producer_created"
    }

    async fn handle(&self, _ctx: &mut HandlerContext, _message: &InboundMessage) -> Result<(), DomainError> {
        debug!("data_producer_created received");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_payload_parses_valid_json_string() {
        let decoded = decode_payload(Value::String("{\"x\":1}".to_string()));
        assert_eq!(decoded, serde_json::json!({"x": 1}));
    }

    #[test]
    fn decode_payload_falls_back_to_raw_on_invalid_json() {
        let decoded = decode_payload(Value::String("not json".to_string()));
        assert_eq!(decoded, Value::String("not json".to_string()));
    }

    #[test]
    fn decode_payload_passes_through_non_string_values() {
        let decoded = decode_payload(serde_json::json!({"already": "object"}));
        assert_eq!(decoded, serde_json::json!({"already": "object"}));
    }
}
