//! Model access for the petcare backend.
//!
//! This crate provides:
//! - Model ids, aliases and capability sets
//! - Credential pools loaded from numbered environment variables
//! - Sticky rotation across keys on rate-limit errors
//! - Gemini and Hugging Face analyzers behind one closed enum
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  AnalyzerRegistry                    │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  │
//! │  │   Gemini    │  │ LlamaVision │  │    Llama    │  │
//! │  │  Analyzer   │  │  Analyzer   │  │  Analyzer   │  │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  │
//! └─────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │           CredentialPool + invoke_with_rotation     │
//! │        (GEMINI_API_KEY…9, HF_TOKEN…9 in order)      │
//! └─────────────────────────────────────────────────────┘
//! ```

mod error;
mod types;

pub mod analysis;
pub mod auth;
pub mod providers;
pub mod registry;
pub mod rotation;

pub use error::{Error, Result};
pub use registry::{AnalyzerRegistry, RegistryConfig};
pub use types::{Capability, CapabilitySet, ModelId, ModelInfo};
