use std::sync::Arc;

use crate::color::TypeColors;
use crate::data::catalog::CATALOG;
use crate::data::filter::{FilterSelection, TypeChoice};
use crate::data::loader::{RecordSource, SourceKey};
use crate::data::model::TransactionDataset;
use crate::data::stats::FilteredView;
use crate::data::store::{DatasetStore, LoadOutcome};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Memoized fetch + clean results.
    pub store: DatasetStore,

    /// Which municipality (or all of them) is displayed.
    pub source_key: SourceKey,

    /// Result for `source_key`; `None` until the first load.
    pub outcome: Option<Arc<LoadOutcome>>,

    /// Current predicate state.
    pub selection: FilterSelection,

    /// Engine output for `selection`; `None` while there is no dataset.
    pub view: Option<FilteredView>,

    pub type_colors: TypeColors,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(store: DatasetStore) -> Self {
        Self {
            store,
            source_key: SourceKey::All,
            outcome: None,
            selection: FilterSelection {
                municipalities: Default::default(),
                postal_codes: Default::default(),
                property_type: TypeChoice::Any,
                min_price: 0.0,
                max_price: 0.0,
            },
            view: None,
            type_colors: TypeColors::default(),
            status_message: None,
        }
    }

    /// The clean dataset behind the current key, if any.
    pub fn dataset(&self) -> Option<&TransactionDataset> {
        self.outcome.as_deref().and_then(LoadOutcome::dataset)
    }

    /// Switch to `key`, loading it on first use, and reset the filters to
    /// the defaults of its unfiltered dataset.
    pub fn select_source(&mut self, key: SourceKey) {
        if self.store.is_cached(&key) {
            log::debug!("Reusing memoized result for key {key}");
        }
        let outcome = self.store.get_or_load(&key);
        self.source_key = key;
        match &*outcome {
            LoadOutcome::Ready(ds) => {
                self.selection = FilterSelection::defaults(ds);
                self.status_message = None;
            }
            LoadOutcome::Empty(reason) => {
                self.status_message = Some(format!("{}: {reason}", self.source_label()));
            }
        }
        self.outcome = Some(outcome);
        self.refilter();
    }

    /// Replace the record source (e.g. after opening another file) and
    /// reload the current key from it.
    pub fn set_source(&mut self, source: Box<dyn RecordSource>) {
        log::info!("Switching record source to {}", source.describe());
        self.store.replace_source(source);
        self.select_source(self.source_key.clone());
    }

    /// Recompute the engine output for the current selection.
    pub fn refilter(&mut self) {
        self.view = self
            .dataset()
            .map(|ds| FilteredView::compute(ds, &self.selection, &mut rand::thread_rng()));
    }

    /// Restore the defaults of the current dataset.
    pub fn reset_filters(&mut self) {
        if let Some(ds) = self.dataset() {
            self.selection = FilterSelection::defaults(ds);
            self.refilter();
        }
    }

    /// `[0, max value]` of the unfiltered dataset, for the price widgets.
    pub fn price_bounds(&self) -> (f64, f64) {
        (0.0, self.dataset().map_or(0.0, |ds| ds.max_value))
    }

    pub fn source_label(&self) -> String {
        match &self.source_key {
            SourceKey::All => "All municipalities".to_string(),
            SourceKey::Municipality(code) => match CATALOG.name_of(code) {
                Some(name) => format!("{name} ({code})"),
                None => code.clone(),
            },
        }
    }

    pub fn toggle_postal_code(&mut self, code: &str) {
        if !self.selection.postal_codes.remove(code) {
            self.selection.postal_codes.insert(code.to_string());
        }
        self.refilter();
    }

    pub fn select_all_postal_codes(&mut self) {
        if let Some(ds) = self.dataset() {
            self.selection.postal_codes = ds.postal_codes.clone();
            self.refilter();
        }
    }

    pub fn select_no_postal_codes(&mut self) {
        self.selection.postal_codes.clear();
        self.refilter();
    }

    pub fn toggle_municipality(&mut self, name: &str) {
        if !self.selection.municipalities.remove(name) {
            self.selection.municipalities.insert(name.to_string());
        }
        self.refilter();
    }

    pub fn select_all_municipalities(&mut self) {
        if let Some(ds) = self.dataset() {
            self.selection.municipalities = ds.municipality_names.clone();
            self.refilter();
        }
    }

    pub fn select_no_municipalities(&mut self) {
        self.selection.municipalities.clear();
        self.refilter();
    }

    pub fn set_property_type(&mut self, choice: TypeChoice) {
        self.selection.property_type = choice;
        self.refilter();
    }

    pub fn set_price_range(&mut self, min_price: f64, max_price: f64) {
        self.selection.min_price = min_price;
        self.selection.max_price = max_price;
        self.refilter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::LocalFileSource;
    use crate::data::model::PropertyType;
    use crate::data::store::EmptyReason;
    use std::io::Write;

    const CSV: &str = "\
date_mutation,valeur_fonciere,code_postal,code_commune,type_local,surface_reelle_bati,latitude,longitude
2024-01-12,80000,23000,23001,Maison,40,46.09,2.05
2024-02-03,150000,23300,23052,Appartement,60,46.23,1.48
2024-03-21,210000,23300,23026,Maison,100,46.24,1.49
2024-04-02,0,23000,23001,Maison,50,46.09,2.05
2024-05-19,95000,23200,23006,Dépendance,30,46.35,2.21
";

    fn state_with(csv: &str) -> (AppState, tempfile::NamedTempFile) {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(csv.as_bytes()).unwrap();
        let store = DatasetStore::new(Box::new(LocalFileSource::new(file.path())));
        (AppState::new(store), file)
    }

    fn visible(state: &AppState) -> usize {
        state.view.as_ref().map_or(0, |v| v.records.len())
    }

    #[test]
    fn nothing_is_computed_before_the_first_load() {
        let (state, _file) = state_with(CSV);
        assert!(state.outcome.is_none());
        assert!(state.view.is_none());
    }

    #[test]
    fn selecting_a_source_applies_defaults() {
        let (mut state, _file) = state_with(CSV);
        state.select_source(SourceKey::All);
        assert_eq!(state.dataset().map(|d| d.len()), Some(3));
        assert_eq!(state.selection.max_price, 210_000.0);
        assert_eq!(visible(&state), 3);
        let stats = state.view.as_ref().and_then(|v| v.stats).unwrap();
        assert_eq!(stats.median_value, 150_000.0);
    }

    #[test]
    fn duplicate_catalog_names_share_one_label() {
        let (mut state, _file) = state_with(CSV);
        state.select_source(SourceKey::All);
        let names: Vec<&String> = state.dataset().unwrap().municipality_names.iter().collect();
        assert_eq!(names, vec!["Ahun", "La Souterraine"]);
    }

    #[test]
    fn bounds_stay_put_while_narrowing() {
        let (mut state, _file) = state_with(CSV);
        state.select_source(SourceKey::All);
        state.set_price_range(0.0, 100_000.0);
        state.set_property_type(TypeChoice::Only(PropertyType::House));
        assert_eq!(visible(&state), 1);
        assert_eq!(state.price_bounds(), (0.0, 210_000.0));

        state.reset_filters();
        assert_eq!(visible(&state), 3);
    }

    #[test]
    fn postal_and_municipality_toggles() {
        let (mut state, _file) = state_with(CSV);
        state.select_source(SourceKey::All);

        state.toggle_postal_code("23300");
        assert_eq!(visible(&state), 1);
        state.toggle_postal_code("23300");
        assert_eq!(visible(&state), 3);

        state.toggle_municipality("La Souterraine");
        assert_eq!(visible(&state), 1);
        state.select_no_municipalities();
        assert_eq!(visible(&state), 0);
        assert_eq!(state.view.as_ref().and_then(|v| v.stats), None);
        state.select_all_municipalities();
        assert_eq!(visible(&state), 3);

        state.select_no_postal_codes();
        assert_eq!(visible(&state), 0);
        state.select_all_postal_codes();
        assert_eq!(visible(&state), 3);
    }

    #[test]
    fn municipality_key_narrows_the_dataset() {
        let (mut state, _file) = state_with(CSV);
        state.select_source(SourceKey::Municipality("23001".into()));
        assert_eq!(state.dataset().map(|d| d.len()), Some(1));
        assert_eq!(state.source_label(), "Ahun (23001)");
    }

    #[test]
    fn empty_municipality_is_reported_not_fatal() {
        let (mut state, _file) = state_with(CSV);
        state.select_source(SourceKey::Municipality("23006".into()));
        assert!(state.dataset().is_none());
        assert!(state.view.is_none());
        assert!(matches!(
            state.outcome.as_deref(),
            Some(LoadOutcome::Empty(EmptyReason::Cleaning(_)))
        ));
        assert!(state.status_message.is_some());

        // The session carries on with another key.
        state.select_source(SourceKey::All);
        assert_eq!(visible(&state), 3);
        assert!(state.status_message.is_none());
    }

    #[test]
    fn missing_file_degrades_to_no_data() {
        let store = DatasetStore::new(Box::new(LocalFileSource::new("/nowhere/dvf_2024.csv")));
        let mut state = AppState::new(store);
        state.select_source(SourceKey::All);
        assert!(matches!(
            state.outcome.as_deref(),
            Some(LoadOutcome::Empty(EmptyReason::SourceUnavailable(_)))
        ));
        assert!(state.view.is_none());
    }
}
