use crate::error::Result;
use crate::graph::PedigreeGraph;
use crate::parse::NO_PARENT;
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;

/// Write the pedigree as a tab-separated table
///
/// The header is the person column followed by `columns`. Parent columns
/// are re-derived from the graph, flags are written as `1`/`0` and null
/// values as empty cells.
pub fn write_tsv<W: Write>(graph: &PedigreeGraph, columns: &[String], writer: W) -> Result<()> {
    let names = graph.columns();
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .from_writer(writer);

    let header =
        std::iter::once(names.person_id.as_str()).chain(columns.iter().map(String::as_str));
    writer.write_record(header)?;

    for &id in graph.row_order() {
        let mut row = Vec::with_capacity(columns.len() + 1);
        row.push(graph.name(id).to_string());
        for column in columns {
            let parent = if *column == names.father_id {
                Some(graph.father(id))
            } else if *column == names.mother_id {
                Some(graph.mother(id))
            } else {
                None
            };
            let cell = match parent {
                Some(Some(parent)) => graph.name(parent).to_string(),
                Some(None) => NO_PARENT.to_string(),
                None => graph
                    .attribute(id, column)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            };
            row.push(cell);
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
