#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # DC Federated Worker
//!
//! Client-side worker for a federated learning coordinator.
//!
//! ## Overview
//!
//! A worker holds an Ed25519 identity, registers once with the coordinator,
//! then polls the status of the global model. When the status changes a
//! [`client::StatusChangeHandler`] is invoked, typically to download the new
//! global model, train locally and submit an update.
//!
//! ## Module Organization
//!
//! - [`client`] - The worker client and its polling loop
//! - [`identity`] - Key files, signing and signature verification
//! - [`envelope`] - Update envelope and global model compression
//! - [`config`] - Configuration management
//! - [`constants`] - Coordinator routes and payload keys
//! - [`error`] - Structured error handling
//! - [`logging`] - Subscriber setup for binaries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dcf_worker::{StatusChangeHandler, WorkerClient, WorkerConfig};
//!
//! struct SaveModel;
//!
//! #[async_trait::async_trait]
//! impl StatusChangeHandler for SaveModel {
//!     async fn on_global_model_status_changed(
//!         &mut self,
//!         worker: &WorkerClient,
//!     ) -> anyhow::Result<()> {
//!         let model = worker.fetch_global_model().await?;
//!         std::fs::write("global_model.bin", model)?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WorkerConfig::load()?;
//! let mut worker = WorkerClient::new(&config)?;
//! worker.register().await?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
//! worker.run(&mut SaveModel, shutdown_rx).await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod logging;

pub use client::{RunExit, StatusChangeHandler, WorkerClient};
pub use config::WorkerConfig;
pub use envelope::ModelUpdateEnvelope;
pub use error::{WorkerError, WorkerResult};
pub use identity::{verify_signed_phrase, WorkerIdentity};
