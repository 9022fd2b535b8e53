//! Tab-aligned table rendering for terminal output.

use std::io::{self, Write};

use tabwriter::TabWriter;

use crate::{DiffEntry, Resource, ResourceObject};

/// Writes diff entries as a three-column table.
pub fn diff_table<W: Write>(writer: W, entries: &[DiffEntry]) -> io::Result<()> {
    let mut tw = TabWriter::new(writer);
    writeln!(tw, "Element\tA\tB")?;

    for entry in entries {
        writeln!(tw, "{}\t{}\t{}", entry.element, entry.a, entry.b)?;
    }

    tw.flush()
}

/// Writes the resource-type catalog as a table.
pub fn resource_table<W: Write>(writer: W, resources: &[Resource]) -> io::Result<()> {
    let mut tw = TabWriter::new(writer);
    writeln!(tw, "GroupVersion\tKind\tName\tNamespaced\tVerbs")?;

    for resource in resources {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{:?}",
            resource.group_version,
            resource.kind,
            resource.name,
            resource.namespaced,
            resource.verbs
        )?;
    }

    tw.flush()
}

/// Writes the object inventory as a table.
pub fn resource_object_table<W: Write>(
    writer: W,
    objects: &[ResourceObject],
) -> io::Result<()> {
    let mut tw = TabWriter::new(writer);
    writeln!(tw, "GroupVersion\tResource\tNamespace\tName")?;

    for object in objects {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}",
            object.group_version, object.resource, object.namespace, object.name
        )?;
    }

    tw.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_table_aligns_columns() {
        let entries = vec![
            DiffEntry::new("Server.Host", "a.example.com", "b.example.com"),
            DiffEntry::new("\"x\"", "exists", "does not exist"),
        ];

        let mut buf = Vec::new();
        diff_table(&mut buf, &entries).unwrap();
        let output = String::from_utf8(buf).unwrap();

        insta::assert_snapshot!(output.trim_end(), @r#"
        Element      A              B
        Server.Host  a.example.com  b.example.com
        "x"          exists         does not exist
        "#);
    }

    #[test]
    fn resource_table_aligns_columns() {
        let resources = vec![
            Resource {
                group_version: "apps/v1".into(),
                name: "deployments".into(),
                kind: "Deployment".into(),
                namespaced: true,
                verbs: vec!["list".into(), "get".into()],
            },
            Resource {
                group_version: "v1".into(),
                name: "configmaps".into(),
                kind: "ConfigMap".into(),
                namespaced: true,
                verbs: vec!["list".into()],
            },
        ];

        let mut buf = Vec::new();
        resource_table(&mut buf, &resources).unwrap();
        let output = String::from_utf8(buf).unwrap();

        insta::assert_snapshot!(output.trim_end(), @r#"
        GroupVersion  Kind        Name         Namespaced  Verbs
        apps/v1       Deployment  deployments  true        ["list", "get"]
        v1            ConfigMap   configmaps   true        ["list"]
        "#);
    }

    #[test]
    fn resource_object_table_aligns_columns() {
        let objects = vec![
            ResourceObject {
                group_version: "v1".into(),
                resource: "namespaces".into(),
                namespace: String::new(),
                name: "default".into(),
            },
            ResourceObject {
                group_version: "apps/v1".into(),
                resource: "deployments".into(),
                namespace: "kube-system".into(),
                name: "coredns".into(),
            },
        ];

        let mut buf = Vec::new();
        resource_object_table(&mut buf, &objects).unwrap();
        let output = String::from_utf8(buf).unwrap();

        insta::assert_snapshot!(output.trim_end(), @r"
        GroupVersion  Resource     Namespace    Name
        v1            namespaces                default
        apps/v1       deployments  kube-system  coredns
        ");
    }
}
