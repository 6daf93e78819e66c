//! Folio engine: backend transport, progress streaming and viewer navigation.
mod client;
mod document;
mod engine;
mod extraction;
mod navigation;
mod persist;
mod sse;
mod types;

pub use client::{BackendApi, ByteStream, ClientSettings, HttpBackend, START_FAILED_DEFAULT};
pub use document::{cache_filename, LocalDocumentStore};
pub use engine::EngineHandle;
pub use extraction::{stream_extraction, ExtractionError, RecordSink};
pub use navigation::{
    centering_offset, NavigationHandle, NavigationSettings, PageRect, PollOutcome, PollTicket,
    RenderSurface, Viewport,
};
pub use persist::{ensure_cache_dir, AtomicFileWriter, PersistError};
pub use sse::{parse_record, ProgressReader, SseDecoder};
pub use types::{
    ActionableItem, ActionablesResult, ActionablesStatus, ApiError, ConversationRecord,
    DocumentError, EngineEvent, LocalDocument, MessageRecord,
};
