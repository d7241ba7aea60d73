use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::RailyardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Maps,
    Mods,
}

impl RegistryKind {
    /// Directory name inside the registry repository, also the index key.
    pub fn as_str(self) -> &'static str {
        match self {
            RegistryKind::Maps => "maps",
            RegistryKind::Mods => "mods",
        }
    }

    pub fn has_population(self) -> bool {
        matches!(self, RegistryKind::Maps)
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    NameAsc,
    NameDesc,
    PopulationDesc,
    PopulationAsc,
    IdAsc,
    IdDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::NameAsc,
        SortKey::NameDesc,
        SortKey::PopulationDesc,
        SortKey::PopulationAsc,
        SortKey::IdAsc,
        SortKey::IdDesc,
    ];

    /// Sort keys offered for a registry; mods carry no population.
    pub fn available(kind: RegistryKind) -> Vec<SortKey> {
        Self::ALL
            .into_iter()
            .filter(|key| kind.has_population() || !key.is_population())
            .collect()
    }

    pub fn is_population(self) -> bool {
        matches!(self, SortKey::PopulationAsc | SortKey::PopulationDesc)
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::NameAsc => "Name (A → Z)",
            SortKey::NameDesc => "Name (Z → A)",
            SortKey::PopulationDesc => "Population (high → low)",
            SortKey::PopulationAsc => "Population (low → high)",
            SortKey::IdAsc => "ID (A → Z)",
            SortKey::IdDesc => "ID (Z → A)",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SortKey::NameAsc => "name-asc",
            SortKey::NameDesc => "name-desc",
            SortKey::PopulationDesc => "population-desc",
            SortKey::PopulationAsc => "population-asc",
            SortKey::IdAsc => "id-asc",
            SortKey::IdDesc => "id-desc",
        };
        write!(f, "{value}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum PageSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl PageSize {
    pub const ALL: [PageSize; 3] = [PageSize::Small, PageSize::Medium, PageSize::Large];

    pub fn get(self) -> usize {
        match self {
            PageSize::Small => 9,
            PageSize::Medium => 27,
            PageSize::Large => 54,
        }
    }

    pub fn next(self) -> Self {
        match self {
            PageSize::Small => PageSize::Medium,
            PageSize::Medium => PageSize::Large,
            PageSize::Large => PageSize::Small,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = RailyardError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        PageSize::ALL
            .into_iter()
            .find(|size| size.get() == value)
            .ok_or(RailyardError::InvalidPageSize(value))
    }
}

impl From<PageSize> for usize {
    fn from(value: PageSize) -> Self {
        value.get()
    }
}

impl FromStr for PageSize {
    type Err = RailyardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<usize>()
            .map_err(|_| RailyardError::InvalidPageSize(0))?;
        PageSize::try_from(parsed)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Registry item identifier as listed in the index. Used verbatim as a path
/// segment, so separators, traversal components and surrounding whitespace
/// are rejected rather than rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = RailyardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let is_valid = !value.is_empty()
            && value.trim() == value
            && value != "."
            && value != ".."
            && !value.contains(['/', '\\'])
            && !value.chars().any(char::is_control);
        if !is_valid {
            return Err(RailyardError::InvalidItemId(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn page_size_accepts_fixed_values_only() {
        assert_eq!("9".parse::<PageSize>().unwrap(), PageSize::Small);
        assert_eq!("54".parse::<PageSize>().unwrap(), PageSize::Large);
        let err = "10".parse::<PageSize>().unwrap_err();
        assert_matches!(err, RailyardError::InvalidPageSize(10));
    }

    #[test]
    fn item_id_rejects_path_segments() {
        let id: ItemId = "new-york".parse().unwrap();
        assert_eq!(id.as_str(), "new-york");
        assert_matches!(
            " new-york ".parse::<ItemId>(),
            Err(RailyardError::InvalidItemId(_))
        );
        assert_matches!(
            "../etc".parse::<ItemId>(),
            Err(RailyardError::InvalidItemId(_))
        );
        assert_matches!("".parse::<ItemId>(), Err(RailyardError::InvalidItemId(_)));
    }

    #[test]
    fn mods_do_not_offer_population_sorts() {
        let keys = SortKey::available(RegistryKind::Mods);
        assert_eq!(keys.len(), 4);
        assert!(keys.iter().all(|key| !key.is_population()));
        assert_eq!(SortKey::available(RegistryKind::Maps).len(), 6);
    }

    #[test]
    fn sort_key_display_matches_cli_value() {
        assert_eq!(SortKey::PopulationDesc.to_string(), "population-desc");
        let parsed = SortKey::from_str("population-desc", true).unwrap();
        assert_eq!(parsed, SortKey::PopulationDesc);
    }
}
