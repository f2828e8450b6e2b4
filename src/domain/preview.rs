//! Per-identifier pipeline state: preview items, candidate listings, edits
//!
//! A `PreviewItem` is the unit that flows from enrichment through review to
//! commit. Reviewer edits live in a sparse overlay and never touch the
//! machine-generated candidate; the record actually committed is the
//! candidate with the overlay (and, last, template display defaults)
//! applied on top.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::constants::sku;
use super::identifier::Identifier;

/// Lifecycle status of a preview item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewStatus {
    /// Placeholder; enrichment not yet resolved
    Loading,
    /// Enriched cleanly, committable
    Ready,
    /// Enriched with diagnostics attached, still committable
    Warning,
    /// Enrichment failed; excluded from commit regardless of edits
    Error,
}

/// Read-only snapshot of the upstream source product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub title: String,
    pub brand: String,
    pub price: f64,
    pub currency: String,
    pub description: String,
    pub images: Vec<String>,
}

/// Pricing computation attached to a generated candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    /// Source acquisition cost
    pub cost: f64,
    /// Estimated marketplace fees
    pub fees: f64,
    /// Margin rate applied on top of cost + fees
    pub margin_rate: f64,
    /// Proposed list price
    pub list_price: f64,
}

/// Machine-proposed candidate listing record
///
/// Core fields and custom fields are name-keyed so reviewer edits can
/// address any field uniformly. `BTreeMap` keeps serialization and
/// comparison deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateListing {
    pub fields: BTreeMap<String, String>,
    pub custom_fields: BTreeMap<String, String>,
    pub pricing: PricingBreakdown,
}

/// Sparse reviewer-supplied field values layered over the candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditOverlay {
    pub fields: BTreeMap<String, String>,
    pub custom_fields: BTreeMap<String, String>,
}

impl EditOverlay {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.custom_fields.is_empty()
    }
}

/// The effective record submitted to the listing store for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub sku: String,
    pub source_identifier: Identifier,
    pub fields: BTreeMap<String, String>,
    pub custom_fields: BTreeMap<String, String>,
    pub pricing: PricingBreakdown,
}

/// One identifier's state as it moves through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewItem {
    /// Stable key, unique within one review session
    pub id: String,
    pub identifier: Identifier,
    /// Deterministic label assigned at creation, never regenerated
    pub derived_sku: String,
    pub status: PreviewStatus,
    pub source: Option<SourceSnapshot>,
    pub generated: Option<CandidateListing>,
    #[serde(default)]
    pub edits: EditOverlay,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl PreviewItem {
    /// Create the loading placeholder seeded before enrichment resolves
    pub fn placeholder(identifier: Identifier) -> Self {
        let id = identifier.as_str().to_string();
        let derived_sku = format!("{}-{}", sku::DERIVED_PREFIX, identifier.as_str());
        Self {
            id,
            identifier,
            derived_sku,
            status: PreviewStatus::Loading,
            source: None,
            generated: None,
            edits: EditOverlay::default(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Transition to the terminal error state with a diagnostic message
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = PreviewStatus::Error;
        self.source = None;
        self.generated = None;
        self.errors.push(message.into());
    }

    /// Committable means a candidate exists and enrichment did not fail
    pub fn is_committable(&self) -> bool {
        matches!(self.status, PreviewStatus::Ready | PreviewStatus::Warning)
            && self.generated.is_some()
    }

    /// Write one reviewer edit into the overlay. The generated candidate is
    /// never mutated.
    pub fn apply_edit(&mut self, field: &str, value: String, is_custom: bool) {
        let target = if is_custom { &mut self.edits.custom_fields } else { &mut self.edits.fields };
        target.insert(field.to_string(), value);
    }

    /// Compute the record that would be committed: generated candidate with
    /// overlay values replacing generated ones, then `defaults` filling any
    /// field present in neither. Returns `None` when no candidate exists.
    pub fn effective_record(&self, defaults: &BTreeMap<String, String>) -> Option<ListingRecord> {
        let generated = self.generated.as_ref()?;

        let mut fields = generated.fields.clone();
        for (k, v) in &self.edits.fields {
            fields.insert(k.clone(), v.clone());
        }
        for (k, v) in defaults {
            fields.entry(k.clone()).or_insert_with(|| v.clone());
        }

        let mut custom_fields = generated.custom_fields.clone();
        for (k, v) in &self.edits.custom_fields {
            custom_fields.insert(k.clone(), v.clone());
        }

        Some(ListingRecord {
            sku: self.derived_sku.clone(),
            source_identifier: self.identifier.clone(),
            fields,
            custom_fields,
            pricing: generated.pricing,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::identifier::IdentifierKind;

    pub fn identifier(raw: &str) -> Identifier {
        Identifier::parse(raw, IdentifierKind::Asin).expect("valid test ASIN")
    }

    pub fn candidate(title: &str) -> CandidateListing {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), title.to_string());
        fields.insert("brand".to_string(), "Acme".to_string());
        let mut custom_fields = BTreeMap::new();
        custom_fields.insert("condition".to_string(), "new".to_string());
        CandidateListing {
            fields,
            custom_fields,
            pricing: PricingBreakdown { cost: 10.0, fees: 2.5, margin_rate: 0.3, list_price: 16.25 },
        }
    }

    pub fn ready_item(raw: &str) -> PreviewItem {
        let mut item = PreviewItem::placeholder(identifier(raw));
        item.status = PreviewStatus::Ready;
        item.generated = Some(candidate(&format!("Item {raw}")));
        item
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn placeholder_has_no_data_and_is_not_committable() {
        let item = PreviewItem::placeholder(identifier("B00EXAMPLE"));
        assert_eq!(item.status, PreviewStatus::Loading);
        assert!(item.source.is_none());
        assert!(item.generated.is_none());
        assert!(!item.is_committable());
        assert_eq!(item.derived_sku, "RL-B00EXAMPLE");
    }

    #[test]
    fn mark_failed_is_terminal_and_excludes_from_commit() {
        let mut item = ready_item("B00EXAMPLE");
        item.mark_failed("upstream 502");
        assert_eq!(item.status, PreviewStatus::Error);
        assert!(item.generated.is_none());
        assert!(!item.is_committable());
        assert_eq!(item.errors, vec!["upstream 502".to_string()]);
    }

    #[test]
    fn edits_never_mutate_the_generated_candidate() {
        let mut item = ready_item("B00EXAMPLE");
        let before = item.generated.clone();
        for i in 0..5 {
            item.apply_edit("title", format!("edit {i}"), false);
            item.apply_edit("note", format!("note {i}"), true);
        }
        assert_eq!(item.generated, before);
    }

    #[test]
    fn effective_record_overlays_edits_then_defaults() {
        let mut item = ready_item("B00EXAMPLE");
        item.apply_edit("title", "Reviewed title".to_string(), false);
        item.apply_edit("condition", "used".to_string(), true);

        let mut defaults = BTreeMap::new();
        defaults.insert("shipping".to_string(), "standard".to_string());
        defaults.insert("title".to_string(), "should not win".to_string());

        let record = item.effective_record(&defaults).unwrap();
        assert_eq!(record.fields["title"], "Reviewed title");
        assert_eq!(record.fields["brand"], "Acme");
        // default only fills fields absent from both candidate and overlay
        assert_eq!(record.fields["shipping"], "standard");
        assert_eq!(record.custom_fields["condition"], "used");
        assert_eq!(record.sku, "RL-B00EXAMPLE");

        // and the fallback was not written back
        assert!(!item.generated.as_ref().unwrap().fields.contains_key("shipping"));
        assert!(!item.edits.fields.contains_key("shipping"));
    }

    #[test]
    fn effective_record_requires_a_candidate() {
        let item = PreviewItem::placeholder(identifier("B00EXAMPLE"));
        assert!(item.effective_record(&BTreeMap::new()).is_none());
    }
}
