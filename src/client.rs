//! # Worker Client
//!
//! HTTP client holding one worker's identity and session against the
//! federated learning coordinator. It registers once, follows the global
//! model status, downloads global models and submits local updates.
//!
//! Every operation issues a single request and awaits its completion before
//! returning. The polling loop in [`WorkerClient::run`] is strictly
//! sequential: one status request per iteration, never overlapping.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, info_span, instrument, warn, Span};

use crate::config::WorkerConfig;
use crate::constants::{
    keys, routes, INVALID_WORKER, NO_PRIVATE_KEY_PLACEHOLDER, NO_PUBLIC_KEY_PLACEHOLDER,
};
use crate::envelope::{decompress, ModelUpdateEnvelope};
use crate::error::{WorkerError, WorkerResult};
use crate::identity::WorkerIdentity;
use crate::logging::log_worker_operation;

/// Reacts to a change in the global model status
///
/// The handler receives the client so it can fetch the new model or submit an
/// update. Returning an error stops the polling loop.
#[async_trait]
pub trait StatusChangeHandler: Send {
    async fn on_global_model_status_changed(&mut self, worker: &WorkerClient)
        -> anyhow::Result<()>;
}

/// Why the polling loop stopped
#[derive(Debug)]
pub enum RunExit {
    /// The shutdown signal fired or its sender was dropped
    Shutdown,
    /// An error ended the loop; it has already been logged
    Fault(WorkerError),
}

/// Client for a single worker session
pub struct WorkerClient {
    client: Client,
    base_url: Url,
    identity: Option<WorkerIdentity>,
    polling_wait_period: Duration,
    worker_id: Option<String>,
    global_model_status: Option<String>,
    span: Span,
}

impl std::fmt::Debug for WorkerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerClient")
            .field("base_url", &self.base_url.as_str())
            .field("identity", &self.identity)
            .field("polling_wait_period", &self.polling_wait_period)
            .field("worker_id", &self.worker_id)
            .field("global_model_status", &self.global_model_status)
            .finish()
    }
}

impl WorkerClient {
    /// Create a new worker client from configuration
    ///
    /// Without a private key the worker runs unauthenticated; a security
    /// warning is logged when that traffic would also be unencrypted.
    pub fn new(config: &WorkerConfig) -> WorkerResult<Self> {
        config.validate()?;

        let server_url = config.server_url();
        let base_url = Url::parse(&server_url).map_err(|e| {
            WorkerError::config_error(format!("Invalid server URL '{}': {}", server_url, e))
        })?;

        let mut client_builder =
            Client::builder().user_agent(format!("dcf-worker/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout_ms) = config.server.request_timeout_ms {
            client_builder = client_builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = client_builder.build().map_err(|e| {
            WorkerError::config_error(format!("Failed to create HTTP client: {}", e))
        })?;

        let span = info_span!("dcf_worker", server = %base_url);

        if config.is_insecure_remote() {
            span.in_scope(|| warn!("Security alert: https is not enabled!"));
        }

        span.in_scope(|| {
            info!(
                authenticated = config.private_key_file.is_some(),
                polling_wait_secs = config.polling_wait_secs,
                "Created WorkerClient"
            )
        });

        Ok(Self {
            client,
            base_url,
            identity: config.private_key_file.clone().map(WorkerIdentity::new),
            polling_wait_period: config.polling_wait_period(),
            worker_id: None,
            global_model_status: None,
            span,
        })
    }

    /// Replace the span that scopes this client's events
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Override the wait between status polls
    #[must_use]
    pub fn with_polling_wait_period(mut self, period: Duration) -> Self {
        self.polling_wait_period = period;
        self
    }

    /// Identifier assigned by the server, once registered
    #[must_use]
    pub fn worker_id(&self) -> Option<&str> {
        self.worker_id.as_deref()
    }

    /// True once registration has succeeded
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.worker_id.is_some()
    }

    /// Last global model status seen by this client
    #[must_use]
    pub fn current_global_model_status(&self) -> Option<&str> {
        self.global_model_status.as_deref()
    }

    /// Base URL of the coordinator
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Sign the authentication phrase with the worker's private key
    ///
    /// Returns `Ok(None)` and logs a warning when no private key is configured.
    pub fn sign_auth_phrase(&self) -> WorkerResult<Option<String>> {
        let _entered = self.span.enter();
        match &self.identity {
            Some(identity) => identity.sign_auth_phrase().map(Some),
            None => {
                warn!("Unable to sign message - no private key file provided.");
                Ok(None)
            }
        }
    }

    /// Public key of the worker as persisted next to the private key
    ///
    /// Returns `Ok(None)` and logs a warning when no private key is configured.
    pub fn public_key_string(&self) -> WorkerResult<Option<String>> {
        let _entered = self.span.enter();
        match &self.identity {
            Some(identity) => identity.public_key_string().map(Some),
            None => {
                warn!("No public key file provided - server side authentication will not succeed.");
                Ok(None)
            }
        }
    }

    /// Register with the coordinator, at most once per client
    ///
    /// Repeated calls send no registration request and return the cached
    /// identifier. Every successful call refreshes the cached global model
    /// status.
    ///
    /// ```rust,no_run
    /// use dcf_worker::{WorkerClient, WorkerConfig};
    ///
    /// # tokio_test::block_on(async {
    /// let mut worker = WorkerClient::new(&WorkerConfig::default())?;
    /// let worker_id = worker.register().await?;
    /// assert_eq!(worker.worker_id(), Some(worker_id.as_str()));
    /// # Ok::<(), dcf_worker::WorkerError>(())
    /// # }).unwrap();
    /// ```
    #[instrument(parent = &self.span, skip(self))]
    pub async fn register(&mut self) -> WorkerResult<String> {
        let worker_id = match self.worker_id.clone() {
            Some(worker_id) => {
                debug!(worker_id = %worker_id, "Worker already registered");
                worker_id
            }
            None => {
                let worker_id = self.request_registration().await?;
                self.worker_id = Some(worker_id.clone());
                log_worker_operation("register", Some(&worker_id), "registered", None);
                worker_id
            }
        };

        let status = self.fetch_global_model_status().await?;
        self.global_model_status = Some(status);
        Ok(worker_id)
    }

    async fn request_registration(&self) -> WorkerResult<String> {
        let public_key = self
            .public_key_string()?
            .unwrap_or_else(|| NO_PUBLIC_KEY_PLACEHOLDER.to_string());
        let signed_phrase = self
            .sign_auth_phrase()?
            .unwrap_or_else(|| NO_PRIVATE_KEY_PLACEHOLDER.to_string());

        let mut payload = Map::new();
        payload.insert(keys::PUBLIC_KEY_STR.to_string(), Value::from(public_key));
        payload.insert(keys::SIGNED_PHRASE.to_string(), Value::from(signed_phrase));

        let response = self
            .post_json(routes::REGISTER_WORKER, &Value::Object(payload))
            .await?;
        let worker_id = Self::response_text(response).await?;

        if worker_id == INVALID_WORKER {
            error!("Coordinator rejected worker registration");
            log_worker_operation("register", None, "rejected", Some(INVALID_WORKER));
            return Err(WorkerError::AuthenticationError(format!(
                "Server returned {INVALID_WORKER} which means it was unable to authenticate this worker. \
                 Please verify that the private key you started this worker with corresponds to the \
                 public key shared with the server."
            )));
        }

        Ok(worker_id)
    }

    /// Download and decompress the current global model
    #[instrument(parent = &self.span, skip(self), fields(worker_id = ?self.worker_id))]
    pub async fn fetch_global_model(&self) -> WorkerResult<Vec<u8>> {
        let response = self
            .post_json(routes::RETURN_GLOBAL_MODEL, &self.worker_id_payload())
            .await?;
        let body = Self::response_bytes(response).await?;

        let model = decompress(&body)?;
        debug!(
            compressed_bytes = body.len(),
            model_bytes = model.len(),
            "Fetched global model"
        );
        Ok(model)
    }

    /// Query the opaque status token of the current global model
    #[instrument(parent = &self.span, skip(self), fields(worker_id = ?self.worker_id))]
    pub async fn fetch_global_model_status(&self) -> WorkerResult<String> {
        let response = self
            .post_json(routes::QUERY_GLOBAL_MODEL_STATUS, &self.worker_id_payload())
            .await?;
        Self::response_text(response).await
    }

    /// Upload a model update, returning the server's raw response body
    #[instrument(
        parent = &self.span,
        skip(self, update),
        fields(worker_id = ?self.worker_id, update_bytes = update.len())
    )]
    pub async fn submit_model_update(&self, update: Vec<u8>) -> WorkerResult<Vec<u8>> {
        let envelope = ModelUpdateEnvelope::new(self.worker_id.clone(), update).encode()?;
        let part = Part::bytes(envelope).file_name(keys::ID_AND_MODEL);
        let form = Form::new().part(keys::ID_AND_MODEL, part);

        let url = self.route_url(routes::RECEIVE_WORKER_UPDATE)?;
        debug!("Submitting model update to: {}", url);

        let response = self.client.post(url).multipart(form).send().await?;
        let ack = Self::response_bytes(response).await?;

        log_worker_operation("submit_model_update", self.worker_id(), "submitted", None);
        Ok(ack)
    }

    /// Poll the global model status until shutdown or the first fault
    ///
    /// Each iteration waits the polling period, fetches the status, and calls
    /// `handler` only when the status differs from the cached one. Any error,
    /// including one returned by the handler, ends the loop; it is logged
    /// here and reported in the returned [`RunExit`] rather than propagated.
    #[instrument(parent = &self.span, skip_all, fields(worker_id = ?self.worker_id))]
    pub async fn run<H>(
        &mut self,
        handler: &mut H,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> RunExit
    where
        H: StatusChangeHandler + ?Sized,
    {
        info!("Starting worker run loop");

        let exit = loop {
            tokio::select! {
                _ = tokio::time::sleep(self.polling_wait_period) => {}
                _ = shutdown_rx.recv() => {
                    info!("Worker run loop received shutdown signal");
                    break RunExit::Shutdown;
                }
            }

            if let Err(e) = self.poll_once(handler).await {
                warn!(recoverable = e.is_recoverable(), "{}", e);
                break RunExit::Fault(e);
            }
        };

        info!("Exiting worker {:?} run loop.", self.worker_id);
        exit
    }

    async fn poll_once<H>(&mut self, handler: &mut H) -> WorkerResult<()>
    where
        H: StatusChangeHandler + ?Sized,
    {
        let status = self.fetch_global_model_status().await?;
        if self.global_model_status.as_deref() == Some(status.as_str()) {
            return Ok(());
        }

        info!(
            previous = ?self.global_model_status,
            current = %status,
            "Global model status changed"
        );
        self.global_model_status = Some(status);
        handler.on_global_model_status_changed(self).await?;
        Ok(())
    }

    fn worker_id_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert(keys::WORKER_ID.to_string(), Value::from(self.worker_id.clone()));
        Value::Object(payload)
    }

    fn route_url(&self, route: &str) -> WorkerResult<Url> {
        self.base_url
            .join(route)
            .map_err(|e| WorkerError::config_error(format!("Invalid route '{}': {}", route, e)))
    }

    async fn post_json(&self, route: &str, payload: &Value) -> WorkerResult<Response> {
        let url = self.route_url(route)?;
        debug!("POST {}", url);
        Ok(self.client.post(url).json(payload).send().await?)
    }

    async fn response_bytes(response: Response) -> WorkerResult<Vec<u8>> {
        let status = response.status();
        if status.is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            error!("Coordinator request failed: {} - {}", status, error_text);
            Err(WorkerError::api_error(status.as_u16(), error_text))
        }
    }

    async fn response_text(response: Response) -> WorkerResult<String> {
        let body = Self::response_bytes(response).await?;
        String::from_utf8(body)
            .map_err(|e| WorkerError::invalid_response("body", format!("not valid UTF-8: {e}")))
    }
}
