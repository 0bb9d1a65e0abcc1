//! Record identity and indexing labels
//!
//! Record names are derived from the federation context id and the entity id
//! with a version-5 UUID, so repeated conversions of the same partner entity
//! always land on the same record. Labels carry the same identifiers for
//! indexing and are never taken from partner input.

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{MetastoreError, OwnerReference, RecordMeta, Result};
use crate::state::EntityKind;

/// Namespace UUID for derived record names
pub const IDENTITY_NAMESPACE: Uuid = Uuid::NAMESPACE_OID;

/// Prefix shared by every label the metastore owns
pub const LABEL_DOMAIN: &str = "opg.ewbi";

pub const FEDERATION_CONTEXT_ID_LABEL: &str = "federation-context-id";
pub const ID_LABEL: &str = "id";
pub const FEDERATION_RELATION_LABEL: &str = "federation-relation";

/// Relation marker for records where this cluster hosts the partner's workloads
pub const HOST_RELATION: &str = "host";

/// Fully qualified label key
pub fn label_key(name: &str) -> String {
    format!("{}/{}", LABEL_DOMAIN, name)
}

/// Derive the record name for an entity
///
/// Inputs are not validated; callers reject empty ids before deriving.
pub fn derive(kind: EntityKind, federation_context_id: &str, entity_id: &str) -> String {
    let uid = Uuid::new_v5(
        &IDENTITY_NAMESPACE,
        format!("{}/{}", federation_context_id, entity_id).as_bytes(),
    );
    format!("{}-{}", kind.name_prefix(), uid)
}

/// Labels every record carries
pub fn record_labels(
    federation_context_id: &str,
    entity_id: &str,
    relation: &str,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(
        label_key(FEDERATION_CONTEXT_ID_LABEL),
        federation_context_id.to_string(),
    );
    labels.insert(label_key(ID_LABEL), entity_id.to_string());
    labels.insert(label_key(FEDERATION_RELATION_LABEL), relation.to_string());
    labels
}

const RESERVED_LABELS: [&str; 3] = [FEDERATION_CONTEXT_ID_LABEL, ID_LABEL, FEDERATION_RELATION_LABEL];

fn is_reserved_label(key: &str) -> bool {
    RESERVED_LABELS.iter().any(|name| label_key(name) == key)
}

fn reserved_entries(labels: &BTreeMap<String, String>) -> Vec<(String, Option<String>)> {
    RESERVED_LABELS
        .iter()
        .map(|name| {
            let key = label_key(name);
            let value = labels.get(&key).cloned();
            (key, value)
        })
        .collect()
}

/// Option applied to record metadata after the derived labels are set
pub type MetaOption = Box<dyn Fn(&mut RecordMeta) -> Result<()> + Send + Sync>;

/// Apply options in order, stopping at the first failure
///
/// Fails with `ReservedLabel` if the options changed or removed any of the
/// derived labels.
pub fn apply_options(meta: &mut RecordMeta, opts: &[MetaOption]) -> Result<()> {
    let before = reserved_entries(&meta.labels);
    for opt in opts {
        opt(meta)?;
    }

    let after = reserved_entries(&meta.labels);
    if let Some(((key, _), _)) = before.into_iter().zip(after).find(|(b, a)| b != a) {
        return Err(MetastoreError::ReservedLabel { key });
    }
    Ok(())
}

/// Add an annotation to the record
pub fn with_annotation(key: impl Into<String>, value: impl Into<String>) -> MetaOption {
    let key = key.into();
    let value = value.into();
    Box::new(move |meta: &mut RecordMeta| -> Result<()> {
        meta.annotations.insert(key.clone(), value.clone());
        Ok(())
    })
}

/// Add caller labels; derived labels cannot be overridden
pub fn with_labels(labels: BTreeMap<String, String>) -> MetaOption {
    Box::new(move |meta: &mut RecordMeta| -> Result<()> {
        if let Some(key) = labels.keys().find(|key| is_reserved_label(key)) {
            return Err(MetastoreError::ReservedLabel {
                key: key.to_string(),
            });
        }
        meta.labels
            .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    })
}

/// Mark the record as owned by another record
pub fn with_owner(kind: impl Into<String>, name: impl Into<String>) -> MetaOption {
    let owner = OwnerReference {
        kind: kind.into(),
        name: name.into(),
    };
    Box::new(move |meta: &mut RecordMeta| -> Result<()> {
        if !meta.owner_references.contains(&owner) {
            meta.owner_references.push(owner.clone());
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_derive_is_deterministic() {
        let a = derive(EntityKind::ApplicationInstance, "fed-ctx-1", "inst-1");
        let b = derive(EntityKind::ApplicationInstance, "fed-ctx-1", "inst-1");
        assert_eq!(a, b);
        assert!(a.starts_with("appinst-"));

        let expected = Uuid::new_v5(&IDENTITY_NAMESPACE, b"fed-ctx-1/inst-1");
        assert_eq!(a, format!("appinst-{}", expected));
    }

    #[test]
    fn test_derive_distinguishes_kinds_and_inputs() {
        let inst = derive(EntityKind::ApplicationInstance, "ctx", "id");
        let fed = derive(EntityKind::Federation, "ctx", "id");
        assert_ne!(inst, fed);
        assert!(fed.starts_with("federation-"));

        assert_ne!(
            derive(EntityKind::ApplicationInstance, "ctx", "id-1"),
            derive(EntityKind::ApplicationInstance, "ctx", "id-2")
        );
        assert_ne!(
            derive(EntityKind::ApplicationInstance, "ctx-1", "id"),
            derive(EntityKind::ApplicationInstance, "ctx-2", "id")
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        #[test]
        fn prop_derive_stable(ctx in "[a-z0-9-]{1,24}", id in "[a-z0-9-]{1,24}") {
            prop_assert_eq!(
                derive(EntityKind::ApplicationInstance, &ctx, &id),
                derive(EntityKind::ApplicationInstance, &ctx, &id)
            );
        }

        #[test]
        fn prop_derive_injective(
            pairs in prop::collection::hash_set(("[a-z0-9]{1,16}", "[a-z0-9]{1,16}"), 1..200)
        ) {
            let names: HashSet<String> = pairs
                .iter()
                .map(|(ctx, id)| derive(EntityKind::Federation, ctx, id))
                .collect();
            prop_assert_eq!(names.len(), pairs.len());
        }
    }

    #[test]
    fn test_record_labels() {
        let labels = record_labels("ctx-1", "inst-1", HOST_RELATION);
        assert_eq!(labels.len(), 3);
        assert_eq!(labels["opg.ewbi/federation-context-id"], "ctx-1");
        assert_eq!(labels["opg.ewbi/id"], "inst-1");
        assert_eq!(labels["opg.ewbi/federation-relation"], "host");
    }

    #[test]
    fn test_with_labels_rejects_reserved_keys() {
        let mut meta = RecordMeta {
            labels: record_labels("ctx-1", "inst-1", HOST_RELATION),
            ..Default::default()
        };

        let mut extra = BTreeMap::new();
        extra.insert(label_key(ID_LABEL), "spoofed".to_string());
        let err = apply_options(&mut meta, &[with_labels(extra)]).unwrap_err();
        assert!(matches!(err, MetastoreError::ReservedLabel { .. }));
        assert_eq!(meta.labels[&label_key(ID_LABEL)], "inst-1");

        let mut extra = BTreeMap::new();
        extra.insert("team".to_string(), "edge".to_string());
        apply_options(
            &mut meta,
            &[
                with_labels(extra),
                with_annotation("opg.ewbi/source", "partner-api"),
                with_owner("Federation", "federation-123"),
            ],
        )
        .unwrap();
        assert_eq!(meta.labels["team"], "edge");
        assert_eq!(meta.annotations["opg.ewbi/source"], "partner-api");
        assert_eq!(meta.owner_references.len(), 1);
    }

    #[test]
    fn test_raw_options_cannot_touch_derived_labels() {
        let derived = record_labels("ctx-1", "inst-1", HOST_RELATION);
        let mut meta = RecordMeta {
            labels: derived.clone(),
            ..Default::default()
        };

        let spoof: MetaOption = Box::new(|meta: &mut RecordMeta| -> Result<()> {
            meta.labels
                .insert(label_key(ID_LABEL), "spoofed".to_string());
            Ok(())
        });
        let err = apply_options(&mut meta, &[spoof]).unwrap_err();
        assert!(
            matches!(err, MetastoreError::ReservedLabel { ref key } if key == "opg.ewbi/id")
        );

        let mut meta = RecordMeta {
            labels: derived.clone(),
            ..Default::default()
        };
        let strip: MetaOption = Box::new(|meta: &mut RecordMeta| -> Result<()> {
            meta.labels.remove(&label_key(FEDERATION_CONTEXT_ID_LABEL));
            Ok(())
        });
        let err = apply_options(&mut meta, &[strip]).unwrap_err();
        assert!(matches!(
            err,
            MetastoreError::ReservedLabel { ref key } if key == "opg.ewbi/federation-context-id"
        ));

        // Rewriting a derived label with its own value is not a change
        let mut meta = RecordMeta {
            labels: derived.clone(),
            ..Default::default()
        };
        let same: MetaOption = Box::new(|meta: &mut RecordMeta| -> Result<()> {
            meta.labels
                .insert(label_key(FEDERATION_RELATION_LABEL), HOST_RELATION.to_string());
            Ok(())
        });
        apply_options(&mut meta, &[same]).unwrap();
        assert_eq!(meta.labels, derived);
    }
}
