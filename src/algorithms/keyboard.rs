//! Keyboard-aware substitution weights
//!
//! Keys are placed on a 2D grid. Two keys whose rounded Euclidean distance is
//! at most 1 are neighbours and substituting one for the other costs that
//! rounded distance. Every other substitution falls back to a default weight,
//! which makes typos on physically adjacent keys cheaper than arbitrary ones.

use crate::algorithms::levenshtein::WeightFn;
use crate::error::{IndexError, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, Read, Write};
use std::sync::Arc;

/// Default substitution cost for keys that are not neighbours
pub const DEFAULT_WEIGHT: usize = 2;

/// Largest rounded distance still considered adjacent
const MAX_NEIGHBOR_DISTANCE: usize = 1;

/// Coordinate of a key on the keyboard grid
pub type Coordinate = (f64, f64);

/// QWERTY rows with their horizontal stagger
const QWERTY_ROWS: [(&str, f64); 3] = [("qwertyuiop", 0.0), ("asdfghjkl", 0.25), ("zxcvbnm", 0.75)];

fn euclidean_distance(p1: Coordinate, p2: Coordinate) -> f64 {
    ((p1.0 - p2.0).powi(2) + (p1.1 - p2.1).powi(2)).sqrt()
}

/// Rounded distance between two coordinates, or `None` when they are not neighbours.
///
/// Halves round to even, so keys 0.5 apart cost 0 and keys 1.5 apart are not neighbours.
fn neighbor_weight(p1: Coordinate, p2: Coordinate) -> Option<usize> {
    let distance = euclidean_distance(p1, p2).round_ties_even();
    (distance <= MAX_NEIGHBOR_DISTANCE as f64).then_some(distance as usize)
}

/// Keyboard layout with precomputed pairwise substitution costs.
#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    keys: AHashMap<char, Coordinate>,
    weights: AHashMap<char, AHashMap<char, usize>>,
}

/// Serialized keyboard: each key mapped to `[x, y]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyboardRecord(pub BTreeMap<String, [f64; 2]>);

impl Keyboard {
    /// Build a keyboard and its full cost table.
    pub fn new(keys: impl IntoIterator<Item = (char, Coordinate)>) -> Self {
        let mut keyboard = Self::default();
        for (key, coordinate) in keys {
            keyboard.insert_key(key, coordinate);
        }
        keyboard
    }

    /// Standard staggered QWERTY layout (lowercase letters only)
    pub fn qwerty() -> Self {
        let keys = QWERTY_ROWS.iter().enumerate().flat_map(|(y, (row, offset))| {
            row.chars()
                .enumerate()
                .map(move |(x, key)| (key, (x as f64 + offset, y as f64)))
        });
        Self::new(keys)
    }

    /// Parse a keyboard from its JSON record `{ "a": [x, y], ... }`.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        let record: KeyboardRecord = serde_json::from_reader(reader)?;
        Self::from_record(&record)
    }

    pub fn from_record(record: &KeyboardRecord) -> Result<Self> {
        let keys = record
            .0
            .iter()
            .map(|(key, [x, y])| Ok((single_char(key)?, (*x, *y))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(keys))
    }

    /// Parse `key<delimiter>x<delimiter>y` lines.
    ///
    /// Lines without exactly three fields are skipped.
    pub fn from_delimited<R: BufRead>(reader: R, delimiter: &str) -> Result<Self> {
        let mut keys = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let fields: Vec<&str> = line.split(delimiter).collect();
            let [key, x, y] = fields.as_slice() else {
                continue;
            };
            keys.push((single_char(key)?, (parse_coordinate(x)?, parse_coordinate(y)?)));
        }
        Ok(Self::new(keys))
    }

    /// Record with every key and its coordinate
    pub fn to_record(&self) -> KeyboardRecord {
        KeyboardRecord(
            self.keys
                .iter()
                .map(|(key, (x, y))| (key.to_string(), [*x, *y]))
                .collect(),
        )
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let record = self.to_record();
        let json = if pretty {
            serde_json::to_string_pretty(&record)?
        } else {
            serde_json::to_string(&record)?
        };
        Ok(json)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, &self.to_record())?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn has_key(&self, key: char) -> bool {
        self.keys.contains_key(&key)
    }

    pub fn coordinate(&self, key: char) -> Option<Coordinate> {
        self.keys.get(&key).copied()
    }

    /// Neighbour costs of `key`, including itself at cost 0.
    pub fn neighbors(&self, key: char) -> Result<&AHashMap<char, usize>> {
        self.weights
            .get(&key)
            .ok_or_else(|| IndexError::NotFound(key.to_string()))
    }

    /// Substitution cost between two keys.
    ///
    /// 0 for the same key, the rounded distance for neighbours and
    /// `default_weight` otherwise, including for keys that are not on the keyboard.
    pub fn weight(&self, k1: char, k2: char, default_weight: usize) -> usize {
        self.weights
            .get(&k1)
            .and_then(|neighbors| neighbors.get(&k2))
            .copied()
            .unwrap_or(default_weight)
    }

    /// Add a new key, updating only the pairs that involve it.
    pub fn add_key(&mut self, key: char, coordinate: Coordinate) -> Result<()> {
        if self.has_key(key) {
            return Err(IndexError::AlreadyExists(key.to_string()));
        }
        self.insert_key(key, coordinate);
        Ok(())
    }

    /// Move an existing key to a new coordinate.
    pub fn update_key(&mut self, key: char, coordinate: Coordinate) -> Result<()> {
        self.remove_key(key)?;
        self.insert_key(key, coordinate);
        Ok(())
    }

    /// Remove a key and every cost entry that refers to it.
    pub fn remove_key(&mut self, key: char) -> Result<()> {
        if self.keys.remove(&key).is_none() {
            return Err(IndexError::NotFound(key.to_string()));
        }
        if let Some(neighbors) = self.weights.remove(&key) {
            for neighbor in neighbors.keys() {
                if let Some(entries) = self.weights.get_mut(neighbor) {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.weights.clear();
    }

    /// Snapshot of the cost table as a substitution weight function.
    ///
    /// Later changes to this keyboard do not affect the returned function,
    /// so a tree built with it keeps a stable metric.
    pub fn weight_fn(&self, default_weight: usize) -> WeightFn {
        let snapshot = Arc::new(self.weights.clone());
        Arc::new(move |a: char, b: char| {
            snapshot
                .get(&a)
                .and_then(|neighbors| neighbors.get(&b))
                .copied()
                .unwrap_or(default_weight)
        })
    }

    fn insert_key(&mut self, key: char, coordinate: Coordinate) {
        let mut own = AHashMap::new();
        own.insert(key, 0);

        for (&other, &other_coordinate) in &self.keys {
            if other == key {
                continue;
            }
            if let Some(weight) = neighbor_weight(coordinate, other_coordinate) {
                own.insert(other, weight);
                self.weights.entry(other).or_default().insert(key, weight);
            }
        }

        self.keys.insert(key, coordinate);
        self.weights.insert(key, own);
    }
}

impl fmt::Display for Keyboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.keys.iter().collect();
        keys.sort_by_key(|(key, _)| **key);

        for (key, (x, y)) in keys {
            writeln!(f, "{key} ({x}, {y})")?;
            let mut neighbors: Vec<_> = self.weights[key].iter().collect();
            neighbors.sort();
            for (neighbor, weight) in neighbors {
                writeln!(f, " |-- ({weight}) {neighbor}")?;
            }
        }
        Ok(())
    }
}

fn single_char(key: &str) -> Result<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(IndexError::InvalidArgument(format!(
            "keyboard keys must be a single character, got `{key}`"
        ))),
    }
}

fn parse_coordinate(value: &str) -> Result<f64> {
    let parsed: f64 = value.trim().parse().map_err(|_| {
        IndexError::InvalidArgument(format!("`{value}` is not a valid coordinate"))
    })?;
    if !parsed.is_finite() {
        return Err(IndexError::InvalidArgument(format!(
            "coordinate must be finite, got {value}"
        )));
    }
    Ok(parsed)
}
