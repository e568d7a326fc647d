// GitBrowser archive shared type definitions
// Each submodule defines types used across the archiver, its stores and the RPC surface.

pub mod archive;
pub mod errors;
pub mod settings;
pub mod tab;
