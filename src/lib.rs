//! Self-hosted local memory backend for AI agents.
//!
//! memhost keeps free-text memory records on the local machine, partitioned by
//! *container tag* (typically one per project or user), and serves them over a
//! token-authenticated HTTP API bound to loopback. No network dependency, no
//! embeddings: relevance is keyword containment.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /add` | Store a record |
//! | `POST /search/memories` | Ranked keyword search within a tag |
//! | `POST /profile` | Heuristic static/dynamic facts for a tag |
//! | `POST /memories/list` | Most recent records |
//! | `GET`/`DELETE /memories/{id}` | Fetch or soft-delete a record |
//! | `GET /health` | Unauthenticated liveness check |
//!
//! # Architecture
//!
//! - **Storage**: every record held in memory, mirrored to one JSON snapshot that is
//!   atomically rewritten after each mutation
//! - **Ranking**: token containment ratio, re-normalized so the best hit scores 1.0
//! - **Access control**: 256-bit bearer token in an owner-only file, constant-time
//!   comparison, CORS limited to loopback origins
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`memory`]: Store, ranking and profile extraction
//! - [`auth`]: Token lifecycle, bearer parsing, CORS policy
//! - [`api`]: axum router and handlers
//! - [`server`]: Listener bootstrap

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod memory;
pub mod server;
pub mod util;
