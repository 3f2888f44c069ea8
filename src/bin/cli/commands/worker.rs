//! Worker command handlers for the DCF worker CLI

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::info;

use dcf_worker::{RunExit, StatusChangeHandler, WorkerClient, WorkerConfig, WorkerResult};

use crate::WorkerCommands;

pub async fn handle_worker_command(cmd: WorkerCommands, config: &WorkerConfig) -> WorkerResult<()> {
    let mut worker = WorkerClient::new(config)?;
    let worker_id = worker.register().await?;

    match cmd {
        WorkerCommands::Register => {
            println!("✓ Registered worker: {}", worker_id);
            if let Some(status) = worker.current_global_model_status() {
                println!("  Global model status: {}", status);
            }
        }
        WorkerCommands::Status => {
            // register() has just fetched and cached the status
            println!("{}", worker.current_global_model_status().unwrap_or_default());
        }
        WorkerCommands::FetchModel { output } => {
            let model = worker.fetch_global_model().await?;
            tokio::fs::write(&output, &model).await?;
            println!(
                "✓ Wrote global model ({} bytes) to {}",
                model.len(),
                output.display()
            );
        }
        WorkerCommands::SubmitUpdate { file } => {
            let update = tokio::fs::read(&file).await?;
            let ack = worker.submit_model_update(update).await?;
            println!("✓ Update submitted");
            println!("  Server response: {}", String::from_utf8_lossy(&ack));
        }
        WorkerCommands::Run { model_dir } => {
            if let Some(ref dir) = model_dir {
                tokio::fs::create_dir_all(dir).await?;
            }

            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, stopping worker");
                    let _ = shutdown_tx.send(());
                }
            });

            let mut handler = ModelDownloadHandler {
                model_dir,
                models_received: 0,
            };
            match worker.run(&mut handler, shutdown_rx).await {
                RunExit::Shutdown => println!(
                    "✓ Worker stopped after {} global model updates",
                    handler.models_received
                ),
                RunExit::Fault(e) => eprintln!("✗ Worker loop ended: {}", e),
            }
        }
    }

    Ok(())
}

/// Downloads every new global model, optionally persisting it
struct ModelDownloadHandler {
    model_dir: Option<PathBuf>,
    models_received: u64,
}

#[async_trait]
impl StatusChangeHandler for ModelDownloadHandler {
    async fn on_global_model_status_changed(
        &mut self,
        worker: &WorkerClient,
    ) -> anyhow::Result<()> {
        let status = worker.current_global_model_status().unwrap_or("unknown");
        let model = worker.fetch_global_model().await?;
        self.models_received += 1;

        match &self.model_dir {
            Some(dir) => {
                let file_name: String = status
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                    .collect();
                let path = dir.join(format!("global_model_{file_name}.bin"));
                tokio::fs::write(&path, &model).await?;
                info!(status, bytes = model.len(), path = %path.display(), "Stored global model");
            }
            None => {
                info!(status, bytes = model.len(), "Received global model");
            }
        }
        Ok(())
    }
}
