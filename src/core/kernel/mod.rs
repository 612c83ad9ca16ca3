/// Transport kernel
///
/// Generic WebSocket transport layer, free of any service-specific logic:
///
/// - `WsSession`: connection management trait (the injection seam used by
///   the tests to script transport behavior)
/// - `TungsteniteWs`: the real tungstenite-backed session
/// - `WsCodec`: service-specific message encoding/decoding contract
pub mod codec;
pub mod ws;

pub use codec::WsCodec;
pub use ws::{TungsteniteWs, WsSession};
