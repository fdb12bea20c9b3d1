use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;

// ---------------------------------------------------------------------------
// Compiled-in municipality table (Creuse, INSEE code → display name)
// ---------------------------------------------------------------------------

/// Department whose municipalities the catalog lists.
pub const DEPARTMENT: &str = "23";

/// Entries are kept exactly as published, duplicates included.
const MUNICIPALITIES: &[(&str, &str)] = &[
    ("23001", "Ahun"),
    ("23002", "Azerables"),
    ("23003", "Bazelat"),
    ("23004", "Blaudeix"),
    ("23005", "Le Bourg-d'Hem"),
    ("23006", "Boussac"),
    ("23007", "Boussac-Bourg"),
    ("23008", "Bétête"),
    ("23009", "La Celle-Dunoise"),
    ("23010", "La Celle-sous-Gouzon"),
    ("23011", "Chambon-sur-Voueize"),
    ("23012", "Champagnat"),
    ("23013", "Châtelus-le-Marcheix"),
    ("23014", "Clugnat"),
    ("23015", "Colondannes"),
    ("23016", "Crozant"),
    ("23017", "Dun-le-Palestel"),
    ("23018", "Fresselines"),
    ("23019", "Gartempe"),
    ("23020", "Le Grand-Bourg"),
    ("23021", "Guéret"),
    ("23022", "Jarnages"),
    ("23023", "Lafat"),
    ("23024", "Ladapeyre"),
    ("23025", "Lamarine"),
    ("23026", "La Souterraine"),
    ("23027", "Lépinas"),
    ("23028", "Lizières"),
    ("23029", "Lupersat"),
    ("23030", "Maison-Feyne"),
    ("23031", "Malleret-Boussac"),
    ("23032", "Mansat-la-Courrière"),
    ("23033", "Marsac"),
    ("23034", "Masgot"),
    ("23035", "Maupertuis"),
    ("23036", "Moutier-d'Ahun"),
    ("23037", "Peyrabout"),
    ("23038", "Pontarion"),
    ("23039", "Saint-Agnant-de-Versillat"),
    ("23040", "Saint-Éloi"),
    ("23041", "Saint-Fiel"),
    ("23042", "Saint-Germain-Beaupré"),
    ("23043", "Saint-Hilaire-la-Palud"),
    ("23044", "Saint-Marc-à-Frongier"),
    ("23045", "Saint-Marien"),
    ("23046", "Saint-Pardoux-le-Neuf"),
    ("23047", "Saint-Priest-la-Feuille"),
    ("23048", "Saint-Silvain-sous-Toulx"),
    ("23049", "Saint-Sulpice-le-Dunois"),
    ("23050", "Saint-Vaury"),
    ("23051", "Saint-Victor-en-Marche"),
    ("23052", "La Souterraine"),
    ("23053", "Toulx-Sainte-Croix"),
    ("23054", "Vallière"),
];

/// The process-wide catalog, built on first access and never mutated.
pub static CATALOG: Lazy<Catalog> = Lazy::new(|| Catalog::from_pairs(MUNICIPALITIES));

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Bidirectional code ↔ name mapping used for selection and filtering.
///
/// The table is treated as opaque: a name carried by several codes maps back
/// to all of them, and [`Catalog::duplicate_names`] reports those names.
#[derive(Debug, Clone)]
pub struct Catalog {
    by_code: BTreeMap<String, String>,
    by_name: BTreeMap<String, BTreeSet<String>>,
}

impl Catalog {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut by_code = BTreeMap::new();
        let mut by_name: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for &(code, name) in pairs {
            by_code.insert(code.to_string(), name.to_string());
            by_name
                .entry(name.to_string())
                .or_default()
                .insert(code.to_string());
        }
        Catalog { by_code, by_name }
    }

    pub fn name_of(&self, code: &str) -> Option<&str> {
        self.by_code.get(code).map(String::as_str)
    }

    /// Every code published under `name`, in code order.
    pub fn codes_of(&self, name: &str) -> Vec<&str> {
        self.by_name
            .get(name)
            .map(|codes| codes.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.by_code.keys().map(String::as_str)
    }

    /// Names that more than one code maps to.
    pub fn duplicate_names(&self) -> Vec<(&str, Vec<&str>)> {
        self.by_name
            .iter()
            .filter(|(_, codes)| codes.len() > 1)
            .map(|(name, codes)| (name.as_str(), codes.iter().map(String::as_str).collect()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }
}
