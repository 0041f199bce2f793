// ─── Extraction ───
// Packet ids have been pulled out of the client in three different ways
// over its lifetime; each strategy lives in its own backend.

pub mod backend;
pub mod decompiled;
pub mod executable;
pub mod native;
pub mod result;

pub use backend::{BackendKind, ExtractionBackend, PacketExtractor};
pub use decompiled::{game_server_connection_path, scan_source, DecompiledSourceBackend};
pub use executable::{ExecutableBackend, ExtractorPlatform, ProcessOutput};
pub use native::{ClientFormat, CompiledExtractor, InProcessBackend};
pub use result::{ExtractionResult, GameParameters, KeyMaterial, RawMapping};
