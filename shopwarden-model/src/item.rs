/// One catalog entry under review.
///
/// Produced by an item source when a page or bulk file is read, consumed
/// exactly once by the batch scheduler. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    /// Listing title. Required for classification; an empty name is
    /// classified locally as low risk without spending classifier quota.
    pub name: String,
    /// Medium-size product image, when the catalog exposes one.
    pub image_url: Option<String>,
    /// Originating file name or shop URL.
    pub source_reference: String,
    /// Link back to the original listing.
    pub detail_url: Option<String>,
    /// Listing price in the shop's minor currency unit, for reporting.
    pub price: Option<u64>,
    /// Shop display name, for reporting.
    pub shop_name: Option<String>,
}

impl Item {
    /// Build an item carrying only a name and its provenance. Bulk-file
    /// rows use this; remote catalog items fill the remaining fields.
    pub fn bare(name: impl Into<String>, source_reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_url: None,
            source_reference: source_reference.into(),
            detail_url: None,
            price: None,
            shop_name: None,
        }
    }

    /// Whether the item carries a usable name for classification.
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}
