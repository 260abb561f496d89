//! Item quantity normalizer
//!
//! Purchase line items have historically carried their quantity three ways:
//! a scalar `quantity`, a scalar `count`, and an `entries[]` array where
//! each entry has its own quantity and selections. The normalizer reduces
//! one stored line item to a sequence of canonical line items, each worth a
//! single unit but keeping its extras and excluded ingredients.

use shared::models::{Item, PurchaseItem};
use shared::util::coerce_quantity;

/// A single-unit line item ready for scheduling
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalItem {
    pub item_id: String,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub category_name: Option<String>,
    pub selected_extras: Vec<String>,
    pub excluded_ingredients: Vec<String>,
}

impl CanonicalItem {
    fn from_doc(item_id: &str, doc: &PurchaseItem) -> Self {
        Self {
            item_id: item_id.to_string(),
            name: doc.name.clone(),
            price: doc.price,
            category: doc.category.clone(),
            category_name: doc.category_name.clone(),
            selected_extras: doc.selected_extras.clone().unwrap_or_default(),
            excluded_ingredients: doc.excluded_ingredients.clone().unwrap_or_default(),
        }
    }

    /// Fill catalog fields from the canonical item document, keeping
    /// whatever the purchase item itself carried as the fallback
    pub fn enrich(&mut self, catalog: &Item) {
        if catalog.name.is_some() {
            self.name = catalog.name.clone();
        }
        if catalog.price.is_some() {
            self.price = catalog.price;
        }
        if catalog.category.is_some() {
            self.category = catalog.category.clone();
        }
        if catalog.category_name.is_some() {
            self.category_name = catalog.category_name.clone();
        }
    }
}

/// Expand one stored purchase item into canonical line items.
///
/// Priority order:
/// 1. every entry contributes `entry.quantity` items with the entry's
///    selections (falling back to the document's),
/// 2. the document-level quantity (`quantity`, then `count`) contributes
///    whatever the entries did not already cover,
/// 3. a document with no entries and no usable quantity counts as one item
///    (legacy default).
///
/// Already-canonicalized items (`__calculated = 1`) collapse to themselves.
pub fn normalize(doc_id: &str, doc: &PurchaseItem) -> Vec<CanonicalItem> {
    let item_id = doc.item_id.as_deref().unwrap_or(doc_id);
    if item_id.is_empty() {
        tracing::warn!(doc_id, "purchase item without an item id, skipping");
        return Vec::new();
    }

    if doc.calculated == Some(1) {
        return vec![CanonicalItem::from_doc(item_id, doc)];
    }

    let mut out = Vec::new();
    let entries = doc.entries.as_deref().unwrap_or(&[]);
    let mut entry_total: i64 = 0;
    for entry in entries {
        let qty = coerce_quantity(entry.quantity.as_ref());
        entry_total += qty;
        for _ in 0..qty {
            out.push(CanonicalItem {
                selected_extras: entry
                    .selected_extras
                    .clone()
                    .or_else(|| doc.selected_extras.clone())
                    .unwrap_or_default(),
                excluded_ingredients: entry
                    .excluded_ingredients
                    .clone()
                    .or_else(|| doc.excluded_ingredients.clone())
                    .unwrap_or_default(),
                ..CanonicalItem::from_doc(item_id, doc)
            });
        }
    }

    let mut doc_qty = coerce_quantity(doc.quantity.as_ref().or(doc.count.as_ref()));
    if doc_qty == 0 && entries.is_empty() {
        // Legacy documents carried no quantity at all and meant one unit
        doc_qty = 1;
    }

    let remaining = (doc_qty - entry_total).max(0);
    for _ in 0..remaining {
        out.push(CanonicalItem::from_doc(item_id, doc));
    }
    out
}
