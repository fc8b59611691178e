//! Output helpers: the `Dumpable` capability, global counters, species
//! tables and JSON species snapshots used for checkpoint replay.
use crate::Stochastic::species::Species;
use crate::simulation::SimError;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::fs;

/// anything that can appear as one column of a dump
pub trait Dumpable {
    fn header(&self) -> String;
    fn value(&self) -> String;
}

/// global counters of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimCounters {
    pub families: u64,
    pub species: u64,
    pub reactions: u64,
    pub firings: u64,
    pub activations: u64,
    pub events: u64,
}

pub struct Counter {
    pub name: &'static str,
    pub value: u64,
}

impl Dumpable for Counter {
    fn header(&self) -> String {
        self.name.to_string()
    }
    fn value(&self) -> String {
        self.value.to_string()
    }
}

impl SimCounters {
    pub fn dumpables(&self) -> Vec<Counter> {
        vec![
            Counter {
                name: "families",
                value: self.families,
            },
            Counter {
                name: "species",
                value: self.species,
            },
            Counter {
                name: "reactions",
                value: self.reactions,
            },
            Counter {
                name: "firings",
                value: self.firings,
            },
            Counter {
                name: "activations",
                value: self.activations,
            },
            Counter {
                name: "events",
                value: self.events,
            },
        ]
    }
}

/// one header row and one value row for any list of dumpables
pub fn dump_table(items: &[&dyn Dumpable]) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(items.iter().map(|d| Cell::new(&d.header())).collect()));
    table.add_row(Row::new(items.iter().map(|d| Cell::new(&d.value())).collect()));
    table
}

pub fn species_table<'a>(species: impl Iterator<Item = &'a Species>) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("tag"),
        Cell::new("name"),
        Cell::new("population"),
        Cell::new("weight"),
    ]));
    for s in species {
        table.add_row(Row::new(vec![
            Cell::new(&s.tag),
            Cell::new(&s.name),
            Cell::new(&s.population().to_string()),
            Cell::new(&format!("{:.2}", s.weight)),
        ]));
    }
    table
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingRecord {
    pub left_mol: usize,
    pub left_site: String,
    pub right_mol: usize,
    pub right_site: String,
}

/// Structural description of a species by names only, so that it can be
/// rebuilt in a fresh simulation with the same mol definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub tag: String,
    pub name: String,
    pub population: u64,
    pub mols: Vec<String>,
    pub bindings: Vec<BindingRecord>,
    /// per mol: (modification site, value) pairs; empty for small mols
    pub modifications: Vec<Vec<(String, String)>>,
}

pub fn write_snapshot(records: &[SpeciesRecord], path: &str) -> Result<(), SimError> {
    let content = serde_json::to_string_pretty(records)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn read_snapshot(path: &str) -> Result<Vec<SpeciesRecord>, SimError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
