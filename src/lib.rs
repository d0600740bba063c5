//! PulseWave core: signaling dispatch, room state, and adaptive bitrate
//! control for a selective-forwarding-unit client.
//!
//! This crate owns the four pillars described in its design notes: the
//! message dispatch/handler registry ([`handlers`]), the participant/track
//! state model ([`room`], [`participant`], [`track`], [`call`]), the
//! adaptive bitrate control loop ([`quality`], [`bitrate`]), and admission
//! infrastructure ([`ratelimit`], [`error`]). The WebRTC transport, the
//! WebSocket carrier, and capture devices are external collaborators
//! represented only by their trait interfaces ([`transport`], [`carrier`]).

pub mod bitrate;
pub mod call;
pub mod carrier;
pub mod emitter;
pub mod error;
pub mod handlers;
pub mod participant;
pub mod protocol;
pub mod quality;
pub mod ratelimit;
pub mod room;
pub mod track;
pub mod transport;

pub use error::{DomainError, DomainErrorJson};
pub use handlers::{build_default_registry, HandlerContext, HandlerRegistry, MessageHandler};
pub use protocol::PulseEvent;
pub use room::RoomState;
