//! Pedigree graphs and the statistics computed over them
//!
//! A [`Pedigree`] is loaded from a tab-separated table naming each
//! individual with its father and mother. Loading builds a typed
//! [`PedigreeGraph`], then flags roots and leaves, assigns generations,
//! scores the kinship statistic `d` and finally links spouses.
//!
//! # Example
//!
//! ```
//! use pedigree::{NoProgress, Pedigree, PedigreeConfig};
//!
//! let table = "personID\tpaID\tmaID\tsex\taffected\n\
//!              1\t0\t0\tM\t0\n\
//!              2\t0\t0\tF\t0\n\
//!              3\t1\t2\tM\t1\n\
//!              4\t1\t2\tF\t1\n";
//! let pedigree =
//!     Pedigree::from_reader(table.as_bytes(), &PedigreeConfig::default(), &mut NoProgress)
//!         .unwrap();
//!
//! let graph = pedigree.graph();
//! let father = graph.require("1").unwrap();
//! assert_eq!(graph.generation(father), Some(-1.0));
//! assert!(graph.d(father).is_some());
//! ```

mod attributes;
mod config;
mod error;
mod generations;
mod graph;
mod kinship;
mod parse;
mod progress;
mod write;

pub use attributes::{AttributeDomain, AttributeStore, Classification, Value};
pub use config::{ColumnNames, PedigreeConfig};
pub use error::{PedigreeError, Result};
pub use generations::{assign_generations, GenerationRange};
pub use graph::{IndividualId, PedigreeGraph, Relation, RelationCounts, Sex};
pub use kinship::{count_descendants, pair_contribution, score_kinship, AffectedDescendants};
pub use parse::NO_PARENT;
pub use progress::{NoProgress, Progress};
pub use write::write_tsv;

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Number of loading milestones reported through [`Progress`]
const MILESTONES: usize = 5;

/// A loaded pedigree with its attribute columns
#[derive(Debug, Clone)]
pub struct Pedigree {
    graph: PedigreeGraph,
    header: Vec<String>,
    generations: Option<GenerationRange>,
}

impl Pedigree {
    pub fn from_path(path: impl AsRef<Path>, config: &PedigreeConfig) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, config, &mut NoProgress)
    }

    /// Parse a table and, unless disabled, annotate it
    ///
    /// Progress is reported at five milestones. With
    /// `compute_statistics` off only the parse milestone is reported and
    /// spouses are linked while parsing.
    pub fn from_reader<R, P>(reader: R, config: &PedigreeConfig, progress: &mut P) -> Result<Self>
    where
        R: Read,
        P: Progress + ?Sized,
    {
        let step = config.progress_ticks / MILESTONES;

        progress.tick(Some("Loading pedigree..."), 0);
        let parse::Table { mut graph, header } = parse::read_table(reader, config)?;
        progress.tick(None, step);

        if !config.compute_statistics {
            return Ok(Self {
                graph,
                header,
                generations: None,
            });
        }

        progress.tick(Some("Counting descendants..."), 0);
        let affected = count_descendants(&mut graph);
        progress.tick(None, step);

        progress.tick(Some("Assigning generations..."), 0);
        let generations = assign_generations(&mut graph);
        progress.tick(None, step);

        progress.tick(Some("Calculating d..."), 0);
        score_kinship(&mut graph, &affected)?;
        progress.tick(None, step);

        progress.tick(Some("Linking spouses..."), 0);
        let couples = graph.add_spouse_links();
        progress.tick(None, step);
        debug!(couples, "linked spouses");

        Ok(Self {
            graph,
            header,
            generations: Some(generations),
        })
    }

    pub fn graph(&self) -> &PedigreeGraph {
        &self.graph
    }

    /// Mutable access for attribute writes by callers
    pub fn graph_mut(&mut self) -> &mut PedigreeGraph {
        &mut self.graph
    }

    /// Every column but the person column, reserved columns included
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// `None` when statistics were not computed
    pub fn generation_range(&self) -> Option<GenerationRange> {
        self.generations
    }

    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        write_tsv(&self.graph, &self.header, writer)
    }
}
