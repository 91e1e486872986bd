//! Remote command execution inside pods
//!
//! Prometheus and Alertmanager are only reachable from inside the cluster
//! network, so the scenario queries them by running `curl`/`amtool` inside
//! their own pods through the API server's exec subresource.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams};
use kube::Client;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, instrument};

#[cfg(test)]
use mockall::automock;

use crate::config::PodCommand;
use crate::{Error, Result};

/// Runs a command inside a pod container and returns its stdout
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PodExecutor: Send + Sync {
    /// Execute `command` in `container` of `namespace/pod`
    ///
    /// Returns stdout on a successful exit. A failed exec, or a non-success
    /// exit status, is an [`Error::Exec`] carrying stderr.
    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: Vec<String>,
    ) -> Result<String>;
}

/// Run a configured [`PodCommand`] through an executor
pub async fn run_pod_command(
    executor: &dyn PodExecutor,
    namespace: &str,
    command: &PodCommand,
) -> Result<String> {
    executor
        .exec(namespace, &command.pod, &command.container, command.argv())
        .await
}

/// [`PodExecutor`] backed by the kube-rs websocket exec API
pub struct KubePodExecutor {
    client: Client,
}

impl KubePodExecutor {
    /// Create an executor using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodExecutor for KubePodExecutor {
    #[instrument(skip(self, command), fields(command = %command.join(" ")))]
    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: Vec<String>,
    ) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = AttachParams::default()
            .container(container)
            .stdin(false)
            .stdout(true)
            .stderr(true);

        let mut attached = pods
            .exec(pod, command, &params)
            .await
            .map_err(|e| Error::exec(pod, format!("exec failed: {}", e)))?;

        let status = attached.take_status();
        let stdout_reader = attached.stdout();
        let stderr_reader = attached.stderr();
        let (stdout, stderr) = tokio::join!(read_stream(stdout_reader), read_stream(stderr_reader));
        let stdout = stdout.map_err(|e| Error::exec(pod, format!("reading stdout: {}", e)))?;
        let stderr = stderr.unwrap_or_default();

        if let Some(status) = status {
            if let Some(status) = status.await {
                if status.status.as_deref() != Some("Success") {
                    let message = status.message.unwrap_or_default();
                    return Err(Error::exec(
                        pod,
                        format!("command failed: {} {}", message, stderr.trim()),
                    ));
                }
            }
        }

        attached
            .join()
            .await
            .map_err(|e| Error::exec(pod, format!("exec session failed: {}", e)))?;

        debug!(bytes = stdout.len(), "Command completed");
        Ok(stdout)
    }
}

async fn read_stream<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<String> {
    let mut out = String::new();
    if let Some(mut reader) = reader {
        reader.read_to_string(&mut out).await?;
    }
    Ok(out)
}
