// ─── RealmResx Core ───
// Protocol sync pipeline for a frequently updated game service.
//
// Architecture:
//   core/
//     http        → Shared reqwest client + URL checks
//     downloader/ → Streaming transport with gzip decoding
//     endpoints   → Remote URLs and version string checks
//     version/    → Client and asset version resolution
//     assets/     → Client + JSON asset downloads
//     extractor/  → In-process, executable and decompiled-source backends
//     catalog     → Raw → canonical packet names
//     packets/    → Bidirectional packet map builder
//     servers     → Public game server list
//     state/      → Persistent settings
//     updater     → End-to-end run + snapshot

pub mod assets;
pub mod catalog;
pub mod downloader;
pub mod endpoints;
pub mod error;
pub mod extractor;
pub mod http;
pub mod packets;
pub mod servers;
pub mod state;
pub mod updater;
pub mod version;
