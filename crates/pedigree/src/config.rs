use crate::error::{PedigreeError, Result};
use serde::{Deserialize, Serialize};

/// Header names for the required and reserved columns of a pedigree table
///
/// The logical names (`personID`, `paID`, `maID`, `sex`, `affected`,
/// `n_local_aff`, `n_local_desc`, `d`, `is_root`, `is_leaf`, `generation`)
/// are also the default header names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub person_id: String,
    pub father_id: String,
    pub mother_id: String,
    pub sex: String,
    pub affected: String,

    pub n_local_affected: String,
    pub n_local_descendants: String,
    pub d: String,
    pub is_root: String,
    pub is_leaf: String,
    pub generation: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            person_id: "personID".into(),
            father_id: "paID".into(),
            mother_id: "maID".into(),
            sex: "sex".into(),
            affected: "affected".into(),
            n_local_affected: "n_local_aff".into(),
            n_local_descendants: "n_local_desc".into(),
            d: "d".into(),
            is_root: "is_root".into(),
            is_leaf: "is_leaf".into(),
            generation: "generation".into(),
        }
    }
}

impl ColumnNames {
    /// Apply a flat `logical name -> header` override map on top of the
    /// defaults
    ///
    /// # Errors
    /// Returns [`PedigreeError::UnknownOption`] for keys that do not name a
    /// required or reserved column.
    pub fn with_overrides<I, K, V>(overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut columns = Self::default();
        for (key, value) in overrides {
            let slot = match key.as_ref() {
                "personID" => &mut columns.person_id,
                "paID" => &mut columns.father_id,
                "maID" => &mut columns.mother_id,
                "sex" => &mut columns.sex,
                "affected" => &mut columns.affected,
                "n_local_aff" => &mut columns.n_local_affected,
                "n_local_desc" => &mut columns.n_local_descendants,
                "d" => &mut columns.d,
                "is_root" => &mut columns.is_root,
                "is_leaf" => &mut columns.is_leaf,
                "generation" => &mut columns.generation,
                other => return Err(PedigreeError::UnknownOption(other.to_string())),
            };
            *slot = value.into();
        }
        Ok(columns)
    }

    /// Required columns, in the order they are checked against the header
    pub fn required(&self) -> [&str; 5] {
        [
            self.person_id.as_str(),
            self.father_id.as_str(),
            self.mother_id.as_str(),
            self.sex.as_str(),
            self.affected.as_str(),
        ]
    }

    /// Columns written by the counting, generation and kinship passes
    pub fn reserved(&self) -> [&str; 6] {
        [
            self.n_local_affected.as_str(),
            self.n_local_descendants.as_str(),
            self.d.as_str(),
            self.is_root.as_str(),
            self.is_leaf.as_str(),
            self.generation.as_str(),
        ]
    }

    /// Whether values in this column are read as `0`/`1` flags
    pub(crate) fn is_flag(&self, column: &str) -> bool {
        column == self.affected || column == self.is_root || column == self.is_leaf
    }
}

/// Options controlling how a pedigree table is loaded and annotated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PedigreeConfig {
    pub columns: ColumnNames,

    /// Treat parent IDs that never appear as a personID as unknown
    pub zero_missing: bool,

    /// Run the counting, generation and kinship passes after parsing
    pub compute_statistics: bool,

    /// Maximum number of distinct category labels kept per attribute
    /// (0 keeps all of them)
    pub max_categories: usize,

    /// Total number of progress ticks spread over the loading milestones
    pub progress_ticks: usize,
}

impl Default for PedigreeConfig {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            zero_missing: false,
            compute_statistics: true,
            max_categories: 12,
            progress_ticks: 100,
        }
    }
}

impl PedigreeConfig {
    /// Parse a configuration written in RON; omitted fields keep their
    /// defaults
    pub fn from_ron(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn overrides_replace_only_named_columns() {
        let columns =
            ColumnNames::with_overrides([("personID", "id"), ("generation", "gen")]).unwrap();
        assert_eq!(columns.person_id, "id");
        assert_eq!(columns.generation, "gen");
        assert_eq!(columns.father_id, "paID");
    }

    #[test]
    fn unknown_override_is_rejected() {
        let err = ColumnNames::with_overrides([("grandpa", "x")]).unwrap_err();
        assert!(matches!(err, PedigreeError::UnknownOption(key) if key == "grandpa"));
    }

    #[test]
    fn ron_config_keeps_defaults() {
        let config =
            PedigreeConfig::from_ron("(zero_missing: true, columns: (sex: \"gender\"))").unwrap();
        assert!(config.zero_missing);
        assert_eq!(config.columns.sex, "gender");
        assert_eq!(config.columns.person_id, "personID");
        assert_eq!(config.max_categories, 12);
    }
}
