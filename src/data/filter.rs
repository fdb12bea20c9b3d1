use std::collections::BTreeSet;
use std::fmt;

use super::model::{PropertyType, Transaction, TransactionDataset};

// ---------------------------------------------------------------------------
// Filter predicate: what the user currently selected
// ---------------------------------------------------------------------------

/// Property type selector; `Any` disables the type predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeChoice {
    #[default]
    Any,
    Only(PropertyType),
}

impl TypeChoice {
    pub const OPTIONS: [TypeChoice; 3] = [
        TypeChoice::Any,
        TypeChoice::Only(PropertyType::House),
        TypeChoice::Only(PropertyType::Apartment),
    ];

    pub fn accepts(self, property_type: PropertyType) -> bool {
        match self {
            TypeChoice::Any => true,
            TypeChoice::Only(wanted) => wanted == property_type,
        }
    }
}

impl fmt::Display for TypeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeChoice::Any => write!(f, "Any"),
            TypeChoice::Only(t) => write!(f, "{t}"),
        }
    }
}

/// The user's predicate state over one clean dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSelection {
    pub municipalities: BTreeSet<String>,
    pub postal_codes: BTreeSet<String>,
    pub property_type: TypeChoice,
    pub min_price: f64,
    pub max_price: f64,
}

impl FilterSelection {
    /// Everything selected, price range `[0, max value]`.
    ///
    /// Always derived from the unfiltered dataset, never from a filtered view.
    pub fn defaults(dataset: &TransactionDataset) -> Self {
        FilterSelection {
            municipalities: dataset.municipality_names.clone(),
            postal_codes: dataset.postal_codes.clone(),
            property_type: TypeChoice::Any,
            min_price: 0.0,
            max_price: dataset.max_value,
        }
    }

    /// The municipality predicate only applies once the user deselected a
    /// name; with every name selected, rows without a name stay visible.
    fn municipality_filter_active(&self, dataset: &TransactionDataset) -> bool {
        !dataset.municipality_names.is_subset(&self.municipalities)
    }

    fn accepts(&self, t: &Transaction, municipality_active: bool) -> bool {
        if municipality_active {
            match &t.municipality_name {
                Some(name) if self.municipalities.contains(name) => {}
                _ => return false,
            }
        }
        self.postal_codes.contains(&t.postal_code)
            && self.min_price <= t.value
            && t.value <= self.max_price
            && self.property_type.accepts(t.property_type)
    }
}

/// Indices of the transactions passing every predicate, in dataset order.
pub fn filtered_indices(dataset: &TransactionDataset, selection: &FilterSelection) -> Vec<usize> {
    let municipality_active = selection.municipality_filter_active(dataset);
    dataset
        .transactions
        .iter()
        .enumerate()
        .filter(|(_, t)| selection.accepts(t, municipality_active))
        .map(|(i, _)| i)
        .collect()
}

/// The passing transactions themselves.
pub fn apply<'a>(dataset: &'a TransactionDataset, selection: &FilterSelection) -> Vec<&'a Transaction> {
    filtered_indices(dataset, selection)
        .into_iter()
        .map(|i| &dataset.transactions[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(value: f64, kind: PropertyType, postal: &str, name: Option<&str>) -> Transaction {
        Transaction {
            mutation_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            value,
            built_area: 100.0,
            property_type: kind,
            postal_code: postal.to_string(),
            municipality_code: "23000".to_string(),
            municipality_name: name.map(str::to_string),
            latitude: None,
            longitude: None,
            price_per_area: value / 100.0,
        }
    }

    fn dataset() -> TransactionDataset {
        use PropertyType::*;
        TransactionDataset::from_transactions(vec![
            tx(50_000.0, House, "23000", Some("Ahun")),
            tx(120_000.0, Apartment, "23000", Some("Ahun")),
            tx(90_000.0, House, "23300", Some("La Souterraine")),
            tx(250_000.0, House, "23300", None),
            tx(70_000.0, Apartment, "23200", Some("Boussac")),
        ])
    }

    #[test]
    fn defaults_keep_everything() {
        let ds = dataset();
        let sel = FilterSelection::defaults(&ds);
        assert_eq!(sel.max_price, 250_000.0);
        assert_eq!(sel.min_price, 0.0);
        assert_eq!(sel.property_type, TypeChoice::Any);
        assert_eq!(filtered_indices(&ds, &sel), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn defaults_do_not_follow_the_filter() {
        let ds = dataset();
        let mut sel = FilterSelection::defaults(&ds);
        sel.max_price = 100_000.0;
        sel.property_type = TypeChoice::Only(PropertyType::Apartment);
        let narrowed = apply(&ds, &sel);
        assert_eq!(narrowed.len(), 1);
        assert_eq!(FilterSelection::defaults(&ds).max_price, 250_000.0);
    }

    #[test]
    fn property_type_filter() {
        let ds = dataset();
        let mut sel = FilterSelection::defaults(&ds);
        sel.property_type = TypeChoice::Only(PropertyType::Apartment);
        assert_eq!(filtered_indices(&ds, &sel), vec![1, 4]);
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let ds = dataset();
        let mut sel = FilterSelection::defaults(&ds);
        sel.min_price = 70_000.0;
        sel.max_price = 120_000.0;
        assert_eq!(filtered_indices(&ds, &sel), vec![1, 2, 4]);
    }

    #[test]
    fn postal_code_filter() {
        let ds = dataset();
        let mut sel = FilterSelection::defaults(&ds);
        sel.postal_codes.remove("23300");
        assert_eq!(filtered_indices(&ds, &sel), vec![0, 1, 4]);
        sel.postal_codes.clear();
        assert!(filtered_indices(&ds, &sel).is_empty());
    }

    #[test]
    fn municipality_filter_drops_unnamed_rows_once_active() {
        let ds = dataset();
        let mut sel = FilterSelection::defaults(&ds);
        sel.municipalities.remove("Boussac");
        assert_eq!(filtered_indices(&ds, &sel), vec![0, 1, 2]);
    }

    #[test]
    fn narrowing_never_adds_rows() {
        let ds = dataset();
        let base = FilterSelection::defaults(&ds);
        let all = filtered_indices(&ds, &base).len();

        let mut narrower = Vec::new();
        let mut s = base.clone();
        s.max_price = 100_000.0;
        narrower.push(s);
        let mut s = base.clone();
        s.min_price = 60_000.0;
        narrower.push(s);
        let mut s = base.clone();
        s.postal_codes.remove("23000");
        narrower.push(s);
        let mut s = base.clone();
        s.municipalities.remove("Ahun");
        narrower.push(s);
        let mut s = base.clone();
        s.property_type = TypeChoice::Only(PropertyType::House);
        narrower.push(s);

        for s in &narrower {
            assert!(filtered_indices(&ds, s).len() <= all);
        }

        // Shrinking the price range step by step is monotone too.
        let mut prev = all;
        let mut s = base;
        for max in [200_000.0, 100_000.0, 60_000.0, 10_000.0] {
            s.max_price = max;
            let n = filtered_indices(&ds, &s).len();
            assert!(n <= prev);
            prev = n;
        }
    }
}
