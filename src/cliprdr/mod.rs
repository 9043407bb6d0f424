//! Clipboard Redirection (CLIPRDR) Protocol Engine
//!
//! Sans-IO implementation of the clipboard virtual channel: it consumes
//! complete PDUs, tracks the handshake and format catalogs, and produces
//! UI events plus encoded PDUs to send back. Moving bytes is the job of
//! [`crate::channel`].
//!
//! # Handshake
//!
//! ```text
//! Server                                   Client (this engine)
//! ━━━━━━                                   ━━━━━━━━━━━━━━━━━━━━
//! Capabilities ─────────────────────────►  store General flags
//! MonitorReady ─────────────────────────►  Ready, SyncReady → UI
//!              ◄───────────────────────── Capabilities (optional)
//!              ◄───────────────────────── FormatList     (UI request)
//! FormatListResponse(OK) ───────────────►  resolve outstanding send
//! FormatList ───────────────────────────►  RemoteFormatList → UI
//!              ◄───────────────────────── FormatListResponse(OK)
//! ```

pub mod capabilities;
pub mod error;
pub mod event;
pub mod format_data;
pub mod format_list;
pub mod formats;
pub mod pdu;
pub mod session;
pub mod state;

pub use capabilities::{Capabilities, CapabilitySet, GeneralCapabilitySet, GeneralFlags};
pub use error::{CliprdrError, Result};
pub use event::{InboundEvent, OutboundEvent};
pub use format_data::FormatDataTracker;
pub use format_list::{FormatListManager, FormatListOutcome};
pub use formats::{FormatEntry, FormatList, CF_HTML, CF_TEXT, CF_UNICODETEXT};
pub use pdu::{ClipboardPdu, PduHeader, ResponseStatus};
pub use session::{CliprdrSession, SessionConfig, SessionOutput};
pub use state::{ChannelPhase, HandshakeState};
