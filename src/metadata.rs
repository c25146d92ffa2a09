use std::collections::BTreeMap;

/// An ordered tag-name → value mapping.
///
/// `BTreeMap` keeps iteration (and therefore JSON serialization) order
/// deterministic, so two frames sharing a mapping get byte-identical
/// sidecars.
pub type TagMap = BTreeMap<String, String>;

/// Merge two tag mappings into a new one; `overlay` wins on key collision.
///
/// Pure and order-defined: this is how roll-level template defaults are
/// combined with a record's exported fields (the record takes precedence).
///
/// # Example
///
/// ```rust
/// use negtag::metadata::{merge, TagMap};
///
/// let mut template = TagMap::new();
/// template.insert("Make".into(), "NIKON CORPORATION".into());
/// template.insert("FNumber".into(), "8".into());
///
/// let mut record = TagMap::new();
/// record.insert("FNumber".into(), "5.6".into());
///
/// let tags = merge(&template, &record);
/// assert_eq!(tags["Make"], "NIKON CORPORATION");
/// assert_eq!(tags["FNumber"], "5.6");
/// ```
pub fn merge(template: &TagMap, overlay: &TagMap) -> TagMap {
    let mut out = template.clone();
    for (k, v) in overlay {
        out.insert(k.clone(), v.clone());
    }
    out
}
