//! Static registry of the OMOP CDM tables the ETL core reads and writes.
//!
//! Only the columns the core needs are declared here; the remaining CDM
//! columns belong to the schema owner. The registry is a plain constant slice
//! that is passed explicitly to whoever creates or inspects tables.

use serde::Serialize;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Text,
    /// ISO-8601 calendar date stored as text.
    Date,
}

impl ColumnType {
    pub const fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text | ColumnType::Date => "TEXT",
        }
    }
}

/// A single column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnDef {
    const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
            primary_key: false,
        }
    }

    /// Integer primary key (SQLite rowid alias).
    pub const fn key(name: &'static str) -> Self {
        Self {
            primary_key: true,
            ..Self::new(name, ColumnType::Integer)
        }
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub const fn date(name: &'static str) -> Self {
        Self::new(name, ColumnType::Date)
    }

    #[must_use]
    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    fn sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.column_type.sql_type());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

/// Role a table plays in the ETL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Standardized vocabulary, loaded before the run.
    Vocabulary,
    /// Reference lookups mapping source strings to concepts.
    Lookup,
    /// Clinical event tables filled by the domain mapping steps.
    Clinical,
    /// Tables derived by the core and fully rebuilt on every run.
    Derived,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Vocabulary => "vocabulary",
            TableKind::Lookup => "lookup",
            TableKind::Clinical => "clinical",
            TableKind::Derived => "derived",
        }
    }
}

/// A table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableDef {
    pub name: &'static str,
    pub kind: TableKind,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnDef::sql).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            columns.join(",\n    ")
        )
    }

    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }
}

pub const CONCEPT: TableDef = TableDef {
    name: "concept",
    kind: TableKind::Vocabulary,
    columns: &[
        ColumnDef::key("concept_id"),
        ColumnDef::text("concept_name"),
        ColumnDef::text("domain_id"),
        ColumnDef::text("vocabulary_id"),
        ColumnDef::text("concept_class_id"),
        ColumnDef::text("concept_code"),
    ],
};

pub const CONCEPT_ANCESTOR: TableDef = TableDef {
    name: "concept_ancestor",
    kind: TableKind::Vocabulary,
    columns: &[
        ColumnDef::int("ancestor_concept_id"),
        ColumnDef::int("descendant_concept_id"),
        ColumnDef::int("min_levels_of_separation"),
        ColumnDef::int("max_levels_of_separation"),
    ],
};

pub const CONCEPT_LOOKUP: TableDef = TableDef {
    name: "concept_lookup",
    kind: TableKind::Lookup,
    columns: &[
        ColumnDef::key("lookup_id"),
        ColumnDef::text("concept_string"),
        ColumnDef::int("standard_concept_id"),
        ColumnDef::text("domain"),
        ColumnDef::text("filter").nullable(),
    ],
};

pub const PERSON: TableDef = TableDef {
    name: "person",
    kind: TableKind::Clinical,
    columns: &[
        ColumnDef::key("person_id"),
        ColumnDef::int("gender_concept_id"),
        ColumnDef::int("year_of_birth"),
    ],
};

pub const DRUG_EXPOSURE: TableDef = TableDef {
    name: "drug_exposure",
    kind: TableKind::Clinical,
    columns: &[
        ColumnDef::key("drug_exposure_id"),
        ColumnDef::int("person_id"),
        ColumnDef::int("drug_concept_id"),
        ColumnDef::date("drug_exposure_start_date"),
        ColumnDef::date("drug_exposure_end_date").nullable(),
        ColumnDef::int("drug_type_concept_id"),
        ColumnDef::int("days_supply").nullable(),
    ],
};

pub const CONDITION_OCCURRENCE: TableDef = TableDef {
    name: "condition_occurrence",
    kind: TableKind::Clinical,
    columns: &[
        ColumnDef::key("condition_occurrence_id"),
        ColumnDef::int("person_id"),
        ColumnDef::int("condition_concept_id"),
        ColumnDef::date("condition_start_date"),
        ColumnDef::date("condition_end_date").nullable(),
        ColumnDef::int("condition_type_concept_id"),
    ],
};

pub const OBSERVATION_PERIOD: TableDef = TableDef {
    name: "observation_period",
    kind: TableKind::Derived,
    columns: &[
        ColumnDef::key("observation_period_id"),
        ColumnDef::int("person_id"),
        ColumnDef::date("observation_period_start_date"),
        ColumnDef::date("observation_period_end_date"),
        ColumnDef::int("period_type_concept_id"),
    ],
};

pub const DRUG_ERA: TableDef = TableDef {
    name: "drug_era",
    kind: TableKind::Derived,
    columns: &[
        ColumnDef::key("drug_era_id"),
        ColumnDef::int("person_id"),
        ColumnDef::int("drug_concept_id"),
        ColumnDef::date("drug_era_start_date"),
        ColumnDef::date("drug_era_end_date"),
        ColumnDef::int("drug_exposure_count"),
        ColumnDef::int("gap_days"),
    ],
};

pub const CONDITION_ERA: TableDef = TableDef {
    name: "condition_era",
    kind: TableKind::Derived,
    columns: &[
        ColumnDef::key("condition_era_id"),
        ColumnDef::int("person_id"),
        ColumnDef::int("condition_concept_id"),
        ColumnDef::date("condition_era_start_date"),
        ColumnDef::date("condition_era_end_date"),
        ColumnDef::int("condition_occurrence_count"),
        ColumnDef::int("gap_days"),
    ],
};

/// Every table known to the ETL core, in creation order.
pub const OMOP_TABLES: &[TableDef] = &[
    CONCEPT,
    CONCEPT_ANCESTOR,
    CONCEPT_LOOKUP,
    PERSON,
    DRUG_EXPOSURE,
    CONDITION_OCCURRENCE,
    OBSERVATION_PERIOD,
    DRUG_ERA,
    CONDITION_ERA,
];

/// Finds a registered table by name (case-insensitive).
pub fn find_table(name: &str) -> Option<&'static TableDef> {
    OMOP_TABLES
        .iter()
        .find(|table| table.name.eq_ignore_ascii_case(name))
}

/// Registered tables of the given kind, in creation order.
pub fn tables_of_kind(kind: TableKind) -> impl Iterator<Item = &'static TableDef> {
    OMOP_TABLES.iter().filter(move |table| table.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_sql_marks_keys_and_nullability() {
        let sql = CONDITION_OCCURRENCE.create_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS condition_occurrence ("));
        assert!(sql.contains("condition_occurrence_id INTEGER PRIMARY KEY"));
        assert!(sql.contains("condition_start_date TEXT NOT NULL"));
        assert!(sql.contains("condition_end_date TEXT,"));
    }

    #[test]
    fn registry_names_are_unique() {
        let mut names: Vec<&str> = OMOP_TABLES.iter().map(|table| table.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), OMOP_TABLES.len());
    }

    #[test]
    fn derived_tables_are_the_rebuilt_ones() {
        let derived: Vec<&str> = tables_of_kind(TableKind::Derived)
            .map(|table| table.name)
            .collect();
        assert_eq!(derived, vec!["observation_period", "drug_era", "condition_era"]);
    }

    #[test]
    fn finds_tables_and_columns_case_insensitively() {
        let table = find_table("DRUG_ERA").expect("drug_era registered");
        assert!(table.column("GAP_DAYS").is_some());
        assert!(find_table("visit_detail").is_none());
    }
}
