//! # Content Gateway
//!
//! Central API gateway for a multi-tenant content network.
//!
//! Most routes are thin shims that forward to capabilities registered at
//! startup. The documentation sync endpoint carries the real logic: it
//! renders Markdown, anchors headings, fingerprints the content and upserts
//! it by external key, skipping records that have not changed.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────┐
//! │  HTTP (axum) │──▶│ SyncController │──▶│    SQLite    │
//! │  CLI (clap)  │   │ render+anchor  │   │ docs + terms │
//! └──────┬───────┘   │ fingerprint    │   └──────────────┘
//!        │           └────────────────┘
//!        ▼
//! ┌──────────────────┐
//! │CapabilityRegistry│  band/rapper names, chat, stream status,
//! │ (HTTP / in-proc) │  turnstile, email, newsletter
//! └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! gateway init                                   # create database
//! gateway sync docs/guide.md --platform ios      # sync one file
//! gateway serve                                  # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy with stable codes |
//! | [`slug`] | Slugs and heading anchors |
//! | [`fingerprint`] | Change-detection digest |
//! | [`render`] | Markdown renderer adapter |
//! | [`store`] | Repository traits, SQLite and in-memory backends |
//! | [`tenant`] | Site context of a call |
//! | [`terms`] | Platform term resolution |
//! | [`sync`] | Documentation sync controller |
//! | [`capabilities`] | Capability registry for delegated logic |
//! | [`oauth`] | Public OAuth configuration |
//! | [`contact`] | Contact-form intake |
//! | [`app`] | Application wiring |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod app;
pub mod capabilities;
pub mod config;
pub mod contact;
pub mod db;
pub mod error;
pub mod fingerprint;
pub mod migrate;
pub mod models;
pub mod oauth;
pub mod render;
pub mod server;
pub mod slug;
pub mod store;
pub mod sync;
pub mod tenant;
pub mod terms;
