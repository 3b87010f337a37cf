//! Slot catalog — the fixed lunch seatings and their capacity.
//!
//! Pure configuration. The original deployment runs three seatings of six
//! covers each; both are overridable via environment so the catalog has a
//! single source of truth instead of being repeated in every handler.

/// Ordered list of bookable time slots with a uniform per-slot capacity.
#[derive(Debug, Clone)]
pub struct SlotCatalog {
    slots: Vec<String>,
    capacity: u32,
}

impl SlotCatalog {
    pub fn new(slots: Vec<String>, capacity: u32) -> Self {
        Self { slots, capacity }
    }

    /// The standard three lunch seatings, six covers each.
    pub fn standard() -> Self {
        Self::new(
            vec!["11:30".to_string(), "12:15".to_string(), "13:00".to_string()],
            6,
        )
    }

    /// Slot identifiers in seating order.
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.iter().any(|s| s == slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_has_three_seatings_of_six() {
        let catalog = SlotCatalog::standard();
        assert_eq!(catalog.slots(), &["11:30", "12:15", "13:00"]);
        assert_eq!(catalog.capacity(), 6);
    }

    #[test]
    fn membership_is_exact_match() {
        let catalog = SlotCatalog::standard();
        assert!(catalog.contains("12:15"));
        assert!(!catalog.contains("12:00"));
        assert!(!catalog.contains(""));
    }
}
