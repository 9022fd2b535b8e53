//! Cluster scanning: connects to the Kubernetes API, discovers the
//! resource-type catalog, lists the live objects and assembles sorted
//! snapshot reports.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use kube::{
    api::{Api, DynamicObject, ListParams},
    config::{KubeConfigOptions, Kubeconfig, KubeconfigError},
    core::{ApiResource, GroupVersionKind},
    discovery::Scope,
    Client, Config, Discovery,
};
use thiserror::Error;

use crate::report::{
    split_group_version, Configuration, Report, Resource, ResourceObject, Server,
};
use crate::Keyed;

/// Read timeout applied to every API request.
const API_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while scanning a cluster.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The kubeconfig file could not be loaded.
    #[error("failed to load kubeconfig")]
    Kubeconfig(#[from] KubeconfigError),

    /// Neither an in-cluster environment nor a usable kubeconfig was found.
    #[error("failed to infer cluster configuration")]
    InferConfig(#[from] kube::config::InferConfigError),

    /// The cluster client could not be constructed.
    #[error("failed to build cluster client")]
    Client(#[source] kube::Error),

    /// The API discovery run failed.
    #[error("api discovery failed")]
    Discovery(#[source] kube::Error),

    /// Listing the objects of one resource failed.
    #[error("listing {resource} (namespace {namespace:?}) failed")]
    List {
        /// Plural name of the resource being listed.
        resource: String,
        /// Namespace being listed, `None` for cluster scope.
        namespace: Option<String>,
        /// The underlying API error.
        #[source]
        source: kube::Error,
    },

    /// The server version could not be retrieved.
    #[error("failed to fetch server version")]
    ServerVersion(#[source] kube::Error),
}

/// A connection to a cluster, ready to take snapshots.
pub struct Scanner {
    client: Client,
    host: String,
}

impl Scanner {
    /// Connects using the given kubeconfig path, or infers the
    /// configuration from the environment: the Pod service account when
    /// running in a cluster, the default kubeconfig search paths
    /// otherwise.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, ScanError> {
        let mut config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await?
            }
            None => Config::infer().await?,
        };
        config.read_timeout = Some(API_READ_TIMEOUT);

        let host = config.cluster_url.to_string();
        let client = Client::try_from(config).map_err(ScanError::Client)?;

        Ok(Self { client, host })
    }

    /// Retrieves host and version information of the remote server.
    pub async fn server(&self) -> Result<Server, ScanError> {
        let version = self
            .client
            .apiserver_version()
            .await
            .map_err(ScanError::ServerVersion)?;

        Ok(Server {
            host: self.host.clone(),
            version: version.git_version,
        })
    }

    /// Retrieves all API resources, including CustomResourceDefinitions.
    /// The result is sorted by key.
    pub async fn resources(&self) -> Result<Vec<Resource>, ScanError> {
        let discovery = Discovery::new(self.client.clone())
            .run()
            .await
            .map_err(ScanError::Discovery)?;

        let mut resources = Vec::new();
        for group in discovery.groups() {
            // Every served version, not just the recommended one: older
            // versions are part of the observable cluster state too.
            for version in group.versions() {
                for (resource, capabilities) in group.versioned_resources(version) {
                    resources.push(Resource {
                        group_version: resource.api_version.clone(),
                        name: resource.plural.clone(),
                        kind: resource.kind.clone(),
                        namespaced: matches!(capabilities.scope, Scope::Namespaced),
                        verbs: capabilities.operations.clone(),
                    });
                }
            }
        }

        resources.sort_by_key(|resource| resource.key());
        Ok(resources)
    }

    /// Retrieves all objects that are cluster-scoped or live in one of the
    /// given namespaces. The result is sorted by key.
    pub async fn resource_objects(
        &self,
        namespaces: &[String],
    ) -> Result<Vec<ResourceObject>, ScanError> {
        let resources = self.resources().await?;

        let mut objects = Vec::new();
        for resource in &resources {
            if !resource.listable() {
                // do not try to scrape non listable objects
                tracing::debug!(resource = %resource.name, "skipping non-listable resource");
                continue;
            }

            let (group, version) = split_group_version(&resource.group_version);
            let gvk = GroupVersionKind::gvk(group, version, &resource.kind);
            let api_resource = ApiResource::from_gvk_with_plural(&gvk, &resource.name);

            if resource.namespaced {
                for namespace in namespaces {
                    let api: Api<DynamicObject> =
                        Api::namespaced_with(self.client.clone(), namespace, &api_resource);
                    self.list_into(&api, resource, Some(namespace), &mut objects)
                        .await?;
                }
            } else {
                let api: Api<DynamicObject> =
                    Api::all_with(self.client.clone(), &api_resource);
                self.list_into(&api, resource, None, &mut objects).await?;
            }
        }

        objects.sort_by_key(|object| object.key());
        Ok(objects)
    }

    /// Lists one resource through the given api handle and appends the
    /// items as [`ResourceObject`] records.
    async fn list_into(
        &self,
        api: &Api<DynamicObject>,
        resource: &Resource,
        namespace: Option<&str>,
        objects: &mut Vec<ResourceObject>,
    ) -> Result<(), ScanError> {
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|source| ScanError::List {
                resource: resource.name.clone(),
                namespace: namespace.map(str::to_owned),
                source,
            })?;

        for item in list {
            objects.push(ResourceObject {
                group_version: resource.group_version.clone(),
                resource: resource.name.clone(),
                namespace: item.metadata.namespace.clone().unwrap_or_default(),
                name: item.metadata.name.clone().unwrap_or_default(),
            });
        }

        Ok(())
    }

    /// Takes a full snapshot: server information, the resource-type
    /// catalog and the object inventory of the given namespaces.
    pub async fn snapshot(&self, namespaces: &[String]) -> Result<Report, ScanError> {
        let scan_start = Utc::now();

        let server = self.server().await?;
        let resources = self.resources().await?;
        let resource_objects = self.resource_objects(namespaces).await?;

        Ok(Report {
            scan_start,
            scan_end: Utc::now(),
            server,
            resources,
            resource_objects,
            configuration: Configuration {
                namespaces: namespaces.to_vec(),
                kubewire_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_with_missing_kubeconfig_fails() {
        let result = Scanner::connect(Some(Path::new("/definitely/not/a/kubeconfig"))).await;
        assert!(matches!(result, Err(ScanError::Kubeconfig(_))));
    }
}
