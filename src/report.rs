use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{DiffEntry, Keyed};

/// A point-in-time snapshot of the observable state of a cluster.
///
/// The `resources` and `resource_objects` collections are sorted ascending
/// by [`Keyed::key`]; the diff engine relies on that ordering and never
/// re-sorts or validates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// When the scan producing this snapshot started.
    pub scan_start: DateTime<Utc>,
    /// When the scan producing this snapshot finished.
    pub scan_end: DateTime<Utc>,
    /// The remote API server the snapshot was taken from.
    pub server: Server,
    /// The resource-type catalog, sorted by key.
    pub resources: Vec<Resource>,
    /// The object inventory, sorted by key.
    pub resource_objects: Vec<ResourceObject>,
    /// The scanning configuration that produced this snapshot.
    pub configuration: Configuration,
}

/// The scanning configuration recorded in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Namespaces whose objects were scanned, in addition to everything
    /// cluster-scoped.
    pub namespaces: Vec<String>,
    /// Version of the tool that produced the snapshot.
    pub kubewire_version: String,
}

/// Information about the remote Kubernetes API server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /// Version reported by the API server.
    pub version: String,
    /// URL the API server was reached at.
    pub host: String,
}

/// One API resource type available in a cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Group and version, e.g. `apps/v1` or `v1` for the core group.
    pub group_version: String,
    /// Plural resource name, e.g. `deployments`.
    pub name: String,
    /// Object kind, e.g. `Deployment`.
    pub kind: String,
    /// Whether objects of this resource live in a namespace.
    pub namespaced: bool,
    /// Verbs the API server supports for this resource.
    pub verbs: Vec<String>,
}

impl Resource {
    /// Whether objects of this resource can be listed.
    pub fn listable(&self) -> bool {
        self.verbs.iter().any(|verb| verb == "list")
    }
}

impl Keyed for Resource {
    fn key(&self) -> String {
        // The ASCII code of space is lower than all characters allowed in
        // kubernetes resource names, so it works as a separator for a
        // plain byte-wise comparison.
        let (group, version) = split_group_version(&self.group_version);
        format!("{group} {version} {}", self.name)
    }

    fn compare(&self, other: &Self) -> Option<Vec<DiffEntry>> {
        let mut entries = Vec::new();

        if self.group_version != other.group_version {
            entries.push(DiffEntry::new(
                "GroupVersion",
                &self.group_version,
                &other.group_version,
            ));
        }
        if self.name != other.name {
            entries.push(DiffEntry::new("Name", &self.name, &other.name));
        }
        if self.kind != other.kind {
            entries.push(DiffEntry::new("Kind", &self.kind, &other.kind));
        }
        if self.namespaced != other.namespaced {
            entries.push(DiffEntry::new(
                "Namespaced",
                self.namespaced.to_string(),
                other.namespaced.to_string(),
            ));
        }
        if self.verbs != other.verbs {
            entries.push(DiffEntry::new(
                "Verbs",
                format!("{:?}", self.verbs),
                format!("{:?}", other.verbs),
            ));
        }

        if entries.is_empty() {
            None
        } else {
            Some(entries)
        }
    }
}

/// One concrete object instance in a cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceObject {
    /// Group and version of the resource this object belongs to.
    pub group_version: String,
    /// Plural resource name, references [`Resource::name`].
    pub resource: String,
    /// Namespace the object lives in, empty for cluster-scoped objects.
    pub namespace: String,
    /// Object name.
    pub name: String,
}

impl Keyed for ResourceObject {
    fn key(&self) -> String {
        // Space as separator, same reasoning as for Resource keys.
        let (group, version) = split_group_version(&self.group_version);
        format!(
            "{group} {version} {} {} {}",
            self.resource, self.namespace, self.name
        )
    }

    fn compare(&self, other: &Self) -> Option<Vec<DiffEntry>> {
        let mut entries = Vec::new();

        if self.name != other.name {
            entries.push(DiffEntry::new("Name", &self.name, &other.name));
        }
        if self.namespace != other.namespace {
            entries.push(DiffEntry::new(
                "Namespace",
                &self.namespace,
                &other.namespace,
            ));
        }
        if self.resource != other.resource {
            entries.push(DiffEntry::new("Resource", &self.resource, &other.resource));
        }
        if self.group_version != other.group_version {
            entries.push(DiffEntry::new(
                "GroupVersion",
                &self.group_version,
                &other.group_version,
            ));
        }

        if entries.is_empty() {
            None
        } else {
            Some(entries)
        }
    }
}

/// Splits an `apiVersion`-style string into its group and version parts.
///
/// A string without a slash belongs to the core group. Malformed strings
/// with more than one slash fall back to an empty group and the raw string
/// as version.
pub fn split_group_version(group_version: &str) -> (&str, &str) {
    match group_version.split_once('/') {
        None => ("", group_version),
        Some((group, version)) if !version.contains('/') => (group, version),
        Some(_) => ("", group_version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_core_group() {
        assert_eq!(split_group_version("v1"), ("", "v1"));
    }

    #[test]
    fn split_named_group() {
        assert_eq!(split_group_version("apps/v1"), ("apps", "v1"));
    }

    #[test]
    fn split_malformed_falls_back_to_empty_group() {
        assert_eq!(split_group_version("a/b/c"), ("", "a/b/c"));
        assert_eq!(split_group_version(""), ("", ""));
    }

    #[test]
    fn resource_key_orders_group_before_version_before_name() {
        let mut resources = vec![
            Resource {
                group_version: "apps/v1".into(),
                name: "deployments".into(),
                ..Resource::default()
            },
            Resource {
                group_version: "v1".into(),
                name: "namespaces".into(),
                ..Resource::default()
            },
            Resource {
                group_version: "v1".into(),
                name: "configmaps".into(),
                ..Resource::default()
            },
        ];
        resources.sort_by_key(|r| r.key());

        let names: Vec<_> = resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["configmaps", "namespaces", "deployments"]);
    }

    #[test]
    fn resource_object_key_orders_namespace_before_name() {
        let object = ResourceObject {
            group_version: "apps/v1".into(),
            resource: "deployments".into(),
            namespace: "kube-system".into(),
            name: "coredns".into(),
        };
        assert_eq!(object.key(), "apps v1 deployments kube-system coredns");

        let cluster_scoped = ResourceObject {
            group_version: "v1".into(),
            resource: "namespaces".into(),
            namespace: String::new(),
            name: "default".into(),
        };
        assert_eq!(cluster_scoped.key(), " v1 namespaces  default");
    }

    #[test]
    fn listable_requires_the_list_verb() {
        let mut resource = Resource {
            verbs: vec!["get".into(), "watch".into()],
            ..Resource::default()
        };
        assert!(!resource.listable());

        resource.verbs.push("list".into());
        assert!(resource.listable());
    }

    #[test]
    fn equal_resources_compare_to_none() {
        let resource = Resource {
            group_version: "apps/v1".into(),
            name: "deployments".into(),
            kind: "Deployment".into(),
            namespaced: true,
            verbs: vec!["list".into(), "get".into()],
        };
        assert_eq!(resource.compare(&resource.clone()), None);
    }

    #[test]
    fn resource_compare_reports_fields_in_fixed_order() {
        let a = Resource {
            group_version: "apps/v1".into(),
            name: "deployments".into(),
            kind: "Deployment".into(),
            namespaced: true,
            verbs: vec!["list".into()],
        };
        let b = Resource {
            group_version: "apps/v1beta1".into(),
            name: "deployments".into(),
            kind: "deployment".into(),
            namespaced: false,
            verbs: vec!["list".into(), "get".into()],
        };

        let entries = a.compare(&b).unwrap();
        let elements: Vec<_> = entries.iter().map(|e| e.element.as_str()).collect();
        assert_eq!(elements, ["GroupVersion", "Kind", "Namespaced", "Verbs"]);

        assert_eq!(entries[2].a, "true");
        assert_eq!(entries[2].b, "false");
        assert_eq!(entries[3].a, r#"["list"]"#);
        assert_eq!(entries[3].b, r#"["list", "get"]"#);
    }

    #[test]
    fn resource_object_compare_reports_fields_in_fixed_order() {
        let a = ResourceObject {
            group_version: "v1".into(),
            resource: "configmaps".into(),
            namespace: "default".into(),
            name: "app-config".into(),
        };
        let b = ResourceObject {
            group_version: "v2".into(),
            resource: "configs".into(),
            namespace: "kube-system".into(),
            name: "other-config".into(),
        };

        let entries = a.compare(&b).unwrap();
        let elements: Vec<_> = entries.iter().map(|e| e.element.as_str()).collect();
        assert_eq!(elements, ["Name", "Namespace", "Resource", "GroupVersion"]);
    }
}
