use std::fmt;

use serde::{Deserialize, Serialize};

use crate::report::Report;

const EXISTS: &str = "exists";
const DOES_NOT_EXIST: &str = "does not exist";

/// A single diffing result where `a` is the old and `b` is the new value
/// of `element`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Dotted path identifying what differed.
    pub element: String,
    /// Rendering of the value on the old side.
    pub a: String,
    /// Rendering of the value on the new side.
    pub b: String,
}

impl DiffEntry {
    /// Creates an entry from pre-rendered values.
    pub fn new(
        element: impl Into<String>,
        a: impl Into<String>,
        b: impl Into<String>,
    ) -> Self {
        Self {
            element: element.into(),
            a: a.into(),
            b: b.into(),
        }
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element: {}, A: {}, B: {}", self.element, self.a, self.b)
    }
}

/// Uniquely identifies and compares entities so that sequences of them can
/// be diffed.
///
/// Comparison is only defined between entities of the same type, which the
/// `&Self` receiver enforces at compile time.
pub trait Keyed {
    /// Canonical identifier whose plain byte ordering matches the desired
    /// ordering of the entity.
    fn key(&self) -> String;

    /// Compares two entities field by field, returning `None` when nothing
    /// differs.
    fn compare(&self, other: &Self) -> Option<Vec<DiffEntry>>;
}

/// Annotates every entry with a prefix, in place, preserving order.
pub fn annotate(entries: &mut [DiffEntry], prefix: &str) {
    for entry in entries {
        entry.element = format!("{prefix}{}", entry.element);
    }
}

/// Entries for a run of elements that only exist on one side. `in_a` tells
/// which side that is.
fn presence_entries<T: Keyed>(items: &[T], in_a: bool) -> Vec<DiffEntry> {
    items
        .iter()
        .map(|item| {
            let element = format!("\"{}\"", item.key());
            if in_a {
                DiffEntry::new(element, EXISTS, DOES_NOT_EXIST)
            } else {
                DiffEntry::new(element, DOES_NOT_EXIST, EXISTS)
            }
        })
        .collect()
}

/// Creates a difference report between `a` and `b`. Both sequences must be
/// sorted ascending by [`Keyed::key`].
///
/// The merge walks both sequences with forward cursors, looking ahead on
/// the opposite side for the current key. Skipped elements are reported as
/// existing on one side only; matched elements are compared field by field
/// and their differences annotated with the key. When neither cursor's key
/// reappears ahead on the other side the loop stops and everything left is
/// reported as one-sided.
pub fn merge_diff<T: Keyed>(a: &[T], b: &[T]) -> Vec<DiffEntry> {
    let mut entries = Vec::new();

    let mut a_index = 0;
    let mut b_index = 0;

    'outer: while a_index < a.len() && b_index < b.len() {
        // If a[a_index] exists in b[b_index..]
        let a_key = a[a_index].key();
        for b_ahead in b_index..b.len() {
            if b[b_ahead].key() == a_key {
                entries.extend(presence_entries(&b[b_index..b_ahead], false));

                if let Some(mut fields) = a[a_index].compare(&b[b_ahead]) {
                    annotate(&mut fields, &format!("{a_key}."));
                    entries.append(&mut fields);
                }

                a_index += 1;
                b_index = b_ahead + 1;
                continue 'outer;
            }
        }

        // else look if b[b_index] exists in a[a_index..]
        let b_key = b[b_index].key();
        for a_ahead in a_index..a.len() {
            if a[a_ahead].key() == b_key {
                entries.extend(presence_entries(&a[a_index..a_ahead], true));

                if let Some(mut fields) = a[a_ahead].compare(&b[b_index]) {
                    annotate(&mut fields, &format!("{b_key}."));
                    entries.append(&mut fields);
                }

                a_index = a_ahead + 1;
                b_index += 1;
                continue 'outer;
            }
        }

        // Gone too far
        break;
    }

    // Process the cutoff of a and b
    entries.extend(presence_entries(&a[a_index..], true));
    entries.extend(presence_entries(&b[b_index..], false));

    entries
}

/// Compares two snapshot reports field by field, in a fixed order, and
/// returns one flat list of differences.
///
/// Scalar fields are compared directly; the resource and object
/// collections are diffed with [`merge_diff`] and their entries prefixed
/// with `Resources.` and `ResourceObjects.` respectively.
pub fn diff_reports(a: &Report, b: &Report) -> Vec<DiffEntry> {
    let mut entries = Vec::new();

    if a.scan_start != b.scan_start {
        entries.push(DiffEntry::new(
            "ScanStart",
            a.scan_start.to_rfc3339(),
            b.scan_start.to_rfc3339(),
        ));
    }
    if a.scan_end != b.scan_end {
        entries.push(DiffEntry::new(
            "ScanEnd",
            a.scan_end.to_rfc3339(),
            b.scan_end.to_rfc3339(),
        ));
    }

    // Configuration
    if a.configuration.kubewire_version != b.configuration.kubewire_version {
        entries.push(DiffEntry::new(
            "Configuration.KubewireVersion",
            &a.configuration.kubewire_version,
            &b.configuration.kubewire_version,
        ));
    }
    if a.configuration.namespaces != b.configuration.namespaces {
        entries.push(DiffEntry::new(
            "Configuration.Namespaces",
            format!("{:?}", a.configuration.namespaces),
            format!("{:?}", b.configuration.namespaces),
        ));
    }

    // Server
    if a.server.host != b.server.host {
        entries.push(DiffEntry::new("Server.Host", &a.server.host, &b.server.host));
    }
    if a.server.version != b.server.version {
        entries.push(DiffEntry::new(
            "Server.Version",
            &a.server.version,
            &b.server.version,
        ));
    }

    // Resources
    let mut resources = merge_diff(&a.resources, &b.resources);
    if !resources.is_empty() {
        annotate(&mut resources, "Resources.");
        entries.append(&mut resources);
    }

    // ResourceObjects
    let mut objects = merge_diff(&a.resource_objects, &b.resource_objects);
    if !objects.is_empty() {
        annotate(&mut objects, "ResourceObjects.");
        entries.append(&mut objects);
    }

    entries
}
