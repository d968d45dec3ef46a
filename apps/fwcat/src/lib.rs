//! # fwcat
//!
//! Library side of the fwcat binary: the install orchestrator, the
//! process-backed collaborators, configuration and the CLI.
//!
//! ```text
//! CLI (clap) ──▶ BatchInstaller (tokio) ──▶ Orchestrator ──▶ backends ──▶ exec (pip, git, juliaup)
//!     │                                          │
//!     └──────────────▶ fwcat-core ◀──────────────┘
//!                     (THE LOGIC)
//! ```

pub mod cli;
pub mod config;
pub mod exec;
pub mod install;
