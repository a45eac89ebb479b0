use crate::attributes::Value;
use crate::config::{ColumnNames, PedigreeConfig};
use crate::error::{PedigreeError, Result};
use crate::graph::{IndividualId, PedigreeGraph, Relation, Sex};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashSet;
use std::io::Read;
use tracing::{debug, warn};

/// Parent identifier standing for an unknown parent
pub const NO_PARENT: &str = "0";

/// A parsed table: the graph plus the attribute columns in header order
#[derive(Debug, Clone)]
pub(crate) struct Table {
    pub graph: PedigreeGraph,
    pub header: Vec<String>,
}

/// Interpret one raw cell according to the column it sits in
fn interpret(columns: &ColumnNames, column: &str, raw: &str) -> Option<Value> {
    if column == columns.father_id || column == columns.mother_id {
        let raw = if raw.is_empty() { NO_PARENT } else { raw };
        return Some(Value::from(raw));
    }
    if column == columns.sex {
        return Some(Value::from(Sex::parse(raw).code()));
    }
    if columns.is_flag(column) {
        return match raw {
            "1" => Some(Value::Bool(true)),
            "0" => Some(Value::Bool(false)),
            _ => None,
        };
    }
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(n) => Some(Value::Number(n)),
        Err(_) => Some(Value::from(raw)),
    }
}

fn position(header: &[String], name: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PedigreeError::MissingColumn(name.to_string()))
}

/// Read a tab-separated pedigree table into a graph
///
/// The whole input is buffered first so that `zero_missing` can see every
/// personID before any parent reference is resolved. Any error is returned
/// before a graph escapes.
pub(crate) fn read_table<R: Read>(reader: R, config: &PedigreeConfig) -> Result<Table> {
    let columns = &config.columns;
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(reader);

    let mut header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    for required in columns.required() {
        position(&header, required)?;
    }
    let person_column = position(&header, &columns.person_id)?;
    let father_column = position(&header, &columns.father_id)?;
    let mother_column = position(&header, &columns.mother_id)?;

    for reserved in columns.reserved() {
        if header.iter().any(|h| h == reserved) {
            if config.compute_statistics {
                warn!(
                    column = reserved,
                    "reserved column already present, values may be overwritten"
                );
            }
        } else {
            header.push(reserved.to_string());
        }
    }

    let records = reader
        .records()
        .collect::<std::result::Result<Vec<StringRecord>, csv::Error>>()?;

    for record in &records {
        let person = record.get(person_column).unwrap_or_default();
        if !is_numeric_id(person) {
            return Err(PedigreeError::NonNumericId(person.to_string()));
        }
    }

    let known: Option<HashSet<&str>> = config.zero_missing.then(|| {
        records
            .iter()
            .map(|record| record.get(person_column).unwrap_or_default())
            .collect()
    });
    let resolve = |raw: &str| -> String {
        match &known {
            Some(known) if !known.contains(raw) => NO_PARENT.to_string(),
            _ if raw.is_empty() => NO_PARENT.to_string(),
            _ => raw.to_string(),
        }
    };

    let mut graph = PedigreeGraph::new(columns.clone(), config.max_categories);
    let mut seen = HashSet::new();
    for record in &records {
        let person = record.get(person_column).unwrap_or_default();
        let id = graph.ensure(person);
        if seen.insert(id) {
            graph.push_row(id);
        } else {
            warn!(person, "duplicate personID row, later values win");
        }

        let father = resolve(record.get(father_column).unwrap_or_default());
        let mother = resolve(record.get(mother_column).unwrap_or_default());

        for (i, column) in header.iter().enumerate() {
            if i == person_column {
                continue;
            }
            let raw = if i == father_column {
                father.as_str()
            } else if i == mother_column {
                mother.as_str()
            } else {
                record.get(i).unwrap_or_default()
            };
            let value = interpret(columns, column, raw);
            if let Some(value) = &value {
                graph.attributes_mut().record_value(column, &value.to_string());
            }
            match value {
                Some(value) => graph.set_attribute(id, column, value),
                None => graph.clear_attribute(id, column),
            }
        }

        let father = link_parent(&mut graph, id, &father, Sex::Male);
        let mother = link_parent(&mut graph, id, &mother, Sex::Female);
        if !config.compute_statistics {
            if let (Some(father), Some(mother)) = (father, mother) {
                graph.link(father, mother, Relation::HusbandToWife);
            }
        }
    }

    let explicit = graph.row_order().len();
    graph.complete_row_order();
    debug!(
        rows = records.len(),
        individuals = graph.len(),
        referenced_only = graph.len() - explicit,
        "parsed pedigree table"
    );

    header.remove(person_column);
    Ok(Table { graph, header })
}

/// Optional sign followed by decimal digits, of any length
fn is_numeric_id(raw: &str) -> bool {
    let digits = raw.strip_prefix(&['+', '-'][..]).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn link_parent(
    graph: &mut PedigreeGraph,
    child: IndividualId,
    parent: &str,
    sex: Sex,
) -> Option<IndividualId> {
    if parent == NO_PARENT {
        return None;
    }
    let parent = graph.ensure(parent);
    if parent == child {
        return None;
    }
    graph.link(child, parent, Relation::ChildToParent);
    graph.set_sex(parent, sex);
    Some(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Classification;
    use test_log::test;

    fn read(text: &str, config: &PedigreeConfig) -> Result<Table> {
        read_table(text.as_bytes(), config)
    }

    #[test]
    fn cells_are_typed_by_column() {
        let text = "personID\tpaID\tmaID\tsex\taffected\theight\tnote\n\
                    1\t0\t0\t1\t1\t180\tfirst\n\
                    2\t0\t0\tfemale\t\t\t\n\
                    3\t1\t2\t\tx\t160\tthird\n";
        let table = read(text, &PedigreeConfig::default()).unwrap();
        let graph = &table.graph;
        let [one, two, three] = ["1", "2", "3"].map(|n| graph.require(n).unwrap());

        assert_eq!(graph.sex(one), Sex::Male);
        assert_eq!(graph.sex(two), Sex::Female);
        assert_eq!(graph.attribute(three, "sex"), Some(&Value::from("?")));
        assert_eq!(graph.affected(one), Some(true));
        assert_eq!(graph.affected(two), None);
        assert_eq!(graph.affected(three), None);
        assert_eq!(graph.attribute(one, "height"), Some(&Value::Number(180.0)));
        assert_eq!(graph.attribute(two, "height"), None);
        assert_eq!(graph.attribute(three, "note"), Some(&Value::from("third")));
        assert_eq!(
            graph.attributes().classify("height", "170"),
            Some(Classification::Proportion(0.5))
        );
    }

    #[test]
    fn parents_are_linked_and_sexed() {
        let text = "personID\tpaID\tmaID\tsex\taffected\n\
                    3\t1\t2\t?\t0\n\
                    1\t0\t0\tF\t0\n";
        let table = read(text, &PedigreeConfig::default()).unwrap();
        let graph = &table.graph;
        let [one, two, three] = ["1", "2", "3"].map(|n| graph.require(n).unwrap());

        assert_eq!(graph.link_kind(three, one), Some(Relation::ChildToParent));
        assert_eq!(graph.link_kind(one, three), Some(Relation::ParentToChild));
        // the row for 1 comes after it is named as a father
        assert_eq!(graph.sex(one), Sex::Female);
        assert_eq!(graph.sex(two), Sex::Female);
        assert_eq!(graph.spouses(one).count(), 0);
    }

    #[test]
    fn referenced_parents_are_appended_to_row_order() {
        let text = "personID\tpaID\tmaID\tsex\taffected\n\
                    5\t7\t6\tM\t0\n\
                    4\t0\t0\tF\t1\n";
        let table = read(text, &PedigreeConfig::default()).unwrap();
        let graph = &table.graph;
        let order: Vec<_> = graph.row_order().iter().map(|&id| graph.name(id)).collect();
        assert_eq!(order, ["5", "4", "7", "6"]);
    }

    #[test]
    fn zero_missing_drops_dangling_parents() {
        let text = "personID\tpaID\tmaID\tsex\taffected\n\
                    1\t0\t0\tM\t0\n\
                    3\t1\t9\tF\t1\n";
        let config = PedigreeConfig {
            zero_missing: true,
            ..Default::default()
        };
        let table = read(text, &config).unwrap();
        let graph = &table.graph;
        let three = graph.require("3").unwrap();

        assert_eq!(graph.len(), 2);
        assert!(graph.id("9").is_none());
        assert_eq!(graph.parents(three).count(), 1);
        assert_eq!(graph.attribute(three, "maID"), Some(&Value::from("0")));
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let text = "personID\tpaID\tmaID\tsex\n1\t0\t0\tM\n";
        let err = read(text, &PedigreeConfig::default()).unwrap_err();
        assert!(matches!(err, PedigreeError::MissingColumn(column) if column == "affected"));
    }

    #[test]
    fn non_numeric_person_is_fatal() {
        let text = "personID\tpaID\tmaID\tsex\taffected\nbob\t0\t0\tM\t0\n";
        let err = read(text, &PedigreeConfig::default()).unwrap_err();
        assert!(matches!(err, PedigreeError::NonNumericId(id) if id == "bob"));
    }

    #[test]
    fn long_numeric_ids_are_accepted() {
        let header = "personID\tpaID\tmaID\tsex\taffected\n";
        let long = "123456789012345678901234567890";
        let text = format!("{header}{long}\t0\t0\tM\t0\n-7\t0\t0\tF\t0\n");
        let table = read(&text, &PedigreeConfig::default()).unwrap();
        assert!(table.graph.id(long).is_some());
        assert!(table.graph.id("-7").is_some());

        for bad in ["-", "+", "12a", "1.5"] {
            let text = format!("{header}{bad}\t0\t0\tM\t0\n");
            let err = read(&text, &PedigreeConfig::default()).unwrap_err();
            assert!(matches!(err, PedigreeError::NonNumericId(id) if id == bad));
        }
    }

    #[test]
    fn duplicate_rows_keep_later_values_once() {
        let text = "personID\tpaID\tmaID\tsex\taffected\theight\n\
                    1\t0\t0\tM\t0\t150\n\
                    2\t0\t0\tF\t0\t160\n\
                    1\t0\t0\tM\t1\t170\n";
        let table = read(text, &PedigreeConfig::default()).unwrap();
        let graph = &table.graph;
        let one = graph.require("1").unwrap();

        let order: Vec<_> = graph.row_order().iter().map(|&id| graph.name(id)).collect();
        assert_eq!(order, ["1", "2"]);
        assert_eq!(graph.affected(one), Some(true));
        assert_eq!(graph.attribute(one, "height"), Some(&Value::Number(170.0)));
    }

    #[test]
    fn overridden_column_names_are_honoured() {
        let text = "id\tpaID\tmaID\tgender\taffected\n1\t0\t0\tM\t0\n2\t1\t0\tF\t0\n";
        let config = PedigreeConfig {
            columns: ColumnNames::with_overrides([("personID", "id"), ("sex", "gender")]).unwrap(),
            ..Default::default()
        };
        let table = read(text, &config).unwrap();
        let two = table.graph.require("2").unwrap();
        assert_eq!(table.graph.sex(two), Sex::Female);
        assert_eq!(table.header[..4], ["paID", "maID", "gender", "affected"]);
    }

    #[test]
    fn reserved_columns_are_appended_once() {
        let text = "personID\tpaID\tmaID\tsex\taffected\td\n1\t0\t0\tM\t0\t0.5\n";
        let table = read(text, &PedigreeConfig::default()).unwrap();
        assert_eq!(
            table.header,
            [
                "paID",
                "maID",
                "sex",
                "affected",
                "d",
                "n_local_aff",
                "n_local_desc",
                "is_root",
                "is_leaf",
                "generation",
            ]
        );
    }

    #[test]
    fn spouses_link_while_parsing_without_statistics() {
        let text = "personID\tpaID\tmaID\tsex\taffected\n3\t1\t2\tM\t0\n";
        let config = PedigreeConfig {
            compute_statistics: false,
            ..Default::default()
        };
        let table = read(text, &config).unwrap();
        let graph = &table.graph;
        let [one, two] = ["1", "2"].map(|n| graph.require(n).unwrap());
        assert_eq!(graph.link_kind(one, two), Some(Relation::HusbandToWife));
    }
}
