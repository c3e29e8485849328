//! Data Transfer Objects (DTOs) for the realtime chat service.
//!
//! DTOs are organized by protocol:
//! - `websocket`: inbound WebSocket frame and event payloads
//! - `http`: HTTP API request and response bodies
//!
//! Outbound WebSocket events are modelled in the domain (`ServerEvent`).

pub mod conversion;
pub mod http;
pub mod websocket;
