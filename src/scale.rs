//! Workload replica reads and writes
//!
//! The Fuse operator runs as a Kubernetes `Deployment`; the Fuse UI runs as
//! an OpenShift `DeploymentConfig`, which has no typed binding in
//! k8s-openapi and is handled as a `DynamicObject`. Both are updated with a
//! read-modify-write guarded by `resourceVersion` and retried on conflict.

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, DynamicObject, GroupVersionKind, PostParams};
use kube::discovery::ApiResource;
use kube::Client;
use tracing::trace;

#[cfg(test)]
use mockall::automock;

use crate::retry::retry_on_conflict;
use crate::{Error, Result};

/// Replica count Kubernetes assumes for a Deployment without `spec.replicas`
const DEFAULT_DEPLOYMENT_REPLICAS: i32 = 1;

/// Kind of workload whose replica count is driven
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    /// `apps/v1` Deployment
    Deployment,
    /// `apps.openshift.io/v1` DeploymentConfig
    DeploymentConfig,
}

impl WorkloadKind {
    /// Lowercase kind name as used by `oc`/`kubectl`
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::DeploymentConfig => "deploymentconfig",
        }
    }
}

/// A named workload in a namespace
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkloadRef {
    /// Workload kind
    pub kind: WorkloadKind,
    /// Object name
    pub name: String,
    /// Object namespace
    pub namespace: String,
}

impl WorkloadRef {
    /// Reference a Deployment
    pub fn deployment(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: WorkloadKind::Deployment,
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Reference a DeploymentConfig
    pub fn deployment_config(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: WorkloadKind::DeploymentConfig,
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.kind.as_str(), self.name)
    }
}

/// Reads and writes workload replica counts
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReplicaScaler: Send + Sync {
    /// Current desired replica count
    async fn get_replicas(&self, workload: &WorkloadRef) -> Result<i32>;

    /// Set the desired replica count, retrying on write conflicts
    async fn set_replicas(&self, workload: &WorkloadRef, replicas: i32) -> Result<()>;
}

/// API resource for OpenShift DeploymentConfigs
pub fn deployment_config_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind {
        group: "apps.openshift.io".to_string(),
        version: "v1".to_string(),
        kind: "DeploymentConfig".to_string(),
    })
}

/// Desired replicas of a Deployment, applying the API server default
pub fn deployment_replicas(deployment: &Deployment) -> i32 {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(DEFAULT_DEPLOYMENT_REPLICAS)
}

/// Desired replicas of a DeploymentConfig (absent means 0)
pub fn dynamic_replicas(obj: &DynamicObject) -> Result<i32> {
    match obj.data.get("spec").and_then(|spec| spec.get("replicas")) {
        None | Some(serde_json::Value::Null) => Ok(0),
        Some(value) => value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| {
                Error::parse(
                    "deploymentconfig",
                    format!("spec.replicas is not an integer: {}", value),
                )
            }),
    }
}

/// Overwrite `spec.replicas` of a DeploymentConfig
pub fn set_dynamic_replicas(obj: &mut DynamicObject, replicas: i32) -> Result<()> {
    let spec = obj
        .data
        .get_mut("spec")
        .and_then(|spec| spec.as_object_mut())
        .ok_or_else(|| Error::parse("deploymentconfig", "object has no spec"))?;
    spec.insert("replicas".to_string(), serde_json::Value::from(replicas));
    Ok(())
}

/// [`ReplicaScaler`] backed by the API server
pub struct KubeReplicaScaler {
    client: Client,
}

impl KubeReplicaScaler {
    /// Create a scaler using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn deployment_configs(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(
            self.client.clone(),
            namespace,
            &deployment_config_resource(),
        )
    }

    async fn scale_deployment(&self, workload: &WorkloadRef, replicas: i32) -> Result<()> {
        let api = self.deployments(&workload.namespace);
        retry_on_conflict(&format!("scale {}", workload), || {
            let api = api.clone();
            async move {
                let mut deployment = api.get(&workload.name).await?;
                deployment.spec.get_or_insert_with(Default::default).replicas = Some(replicas);
                api.replace(&workload.name, &PostParams::default(), &deployment)
                    .await?;
                Ok(())
            }
        })
        .await
    }

    async fn scale_deployment_config(&self, workload: &WorkloadRef, replicas: i32) -> Result<()> {
        let api = self.deployment_configs(&workload.namespace);
        retry_on_conflict(&format!("scale {}", workload), || {
            let api = api.clone();
            async move {
                let mut dc = api.get(&workload.name).await?;
                set_dynamic_replicas(&mut dc, replicas)?;
                api.replace(&workload.name, &PostParams::default(), &dc)
                    .await?;
                Ok(())
            }
        })
        .await
    }
}

#[async_trait]
impl ReplicaScaler for KubeReplicaScaler {
    async fn get_replicas(&self, workload: &WorkloadRef) -> Result<i32> {
        match workload.kind {
            WorkloadKind::Deployment => {
                let deployment = self
                    .deployments(&workload.namespace)
                    .get(&workload.name)
                    .await?;
                Ok(deployment_replicas(&deployment))
            }
            WorkloadKind::DeploymentConfig => {
                let dc = self
                    .deployment_configs(&workload.namespace)
                    .get(&workload.name)
                    .await?;
                dynamic_replicas(&dc)
            }
        }
    }

    async fn set_replicas(&self, workload: &WorkloadRef, replicas: i32) -> Result<()> {
        trace!(workload = %workload, replicas, "Setting replicas");
        match workload.kind {
            WorkloadKind::Deployment => self.scale_deployment(workload, replicas).await,
            WorkloadKind::DeploymentConfig => {
                self.scale_deployment_config(workload, replicas).await
            }
        }
    }
}
