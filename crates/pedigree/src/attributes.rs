use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A typed attribute value; a missing attribute stands for null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Numeric view of the value; integers are widened
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Integer(i) => Some(i as f64),
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Flags are written as `1`/`0` so that tables read back identically
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => f.write_str("1"),
            Value::Bool(false) => f.write_str("0"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Where a value falls within the observed domain of its attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    /// Position of a numeric value within the observed `[min, max]` range
    Proportion(f64),
    /// Index of a category label in first-seen order
    Category(usize),
}

const NAN_LABEL: &str = "NaN";
const INF_LABEL: &str = "Inf";

enum Parsed<'a> {
    Number(f64),
    Label(&'a str),
}

/// Numbers are split from labels the same way for recording and
/// classification. Non-finite numbers become their own categories.
fn parse(raw: &str) -> Parsed<'_> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_nan() => Parsed::Label(NAN_LABEL),
        Ok(v) if v.is_infinite() => Parsed::Label(INF_LABEL),
        Ok(v) => Parsed::Number(v),
        Err(_) => Parsed::Label(raw),
    }
}

/// The range and category labels observed for one attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeDomain {
    range: Option<(f64, f64)>,
    categories: Vec<String>,
    max_categories: usize,
    saturated: bool,
}

impl AttributeDomain {
    pub fn new(max_categories: usize) -> Self {
        Self {
            max_categories,
            ..Default::default()
        }
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Whether unseen labels have been dropped because of the category cap
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    fn record(&mut self, raw: &str) {
        match parse(raw) {
            Parsed::Number(v) => {
                self.range = Some(match self.range {
                    None => (v, v),
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                });
            }
            Parsed::Label(label) => self.add_category(label),
        }
    }

    fn add_category(&mut self, label: &str) {
        if self.categories.iter().any(|c| c == label) {
            return;
        }
        if self.max_categories > 0 && self.categories.len() >= self.max_categories {
            self.saturated = true;
            return;
        }
        self.categories.push(label.to_string());
    }

    fn classify(&self, raw: &str) -> Option<Classification> {
        match parse(raw) {
            Parsed::Number(v) => {
                let (lo, hi) = self.range?;
                if hi == lo {
                    Some(Classification::Proportion(1.0))
                } else {
                    Some(Classification::Proportion(((v - lo) / (hi - lo)).clamp(0.0, 1.0)))
                }
            }
            Parsed::Label(label) => self
                .categories
                .iter()
                .position(|c| c == label)
                .map(Classification::Category),
        }
    }
}

/// Per-individual attribute values plus the inferred domain of every
/// attribute
///
/// Individuals are addressed by their dense index so the store can sit
/// next to the graph without owning identifiers itself.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    values: Vec<HashMap<String, Value>>,
    domains: HashMap<String, AttributeDomain>,
    max_categories: usize,
}

impl AttributeStore {
    pub fn new(max_categories: usize) -> Self {
        Self {
            max_categories,
            ..Default::default()
        }
    }

    /// Observe one raw cell of `attribute`, widening its domain
    pub fn record_value(&mut self, attribute: &str, raw: &str) {
        let max_categories = self.max_categories;
        self.domains
            .entry(attribute.to_string())
            .or_insert_with(|| AttributeDomain::new(max_categories))
            .record(raw);
    }

    /// Locate `raw` within the domain observed for `attribute`
    ///
    /// Numbers outside the observed range are clamped to its ends.
    /// Returns `None` for attributes never recorded, numbers when no
    /// numeric value was ever observed, and labels that were never seen or
    /// were dropped by the category cap.
    pub fn classify(&self, attribute: &str, raw: &str) -> Option<Classification> {
        self.domains.get(attribute)?.classify(raw)
    }

    pub fn domain(&self, attribute: &str) -> Option<&AttributeDomain> {
        self.domains.get(attribute)
    }

    pub(crate) fn push_individual(&mut self) {
        self.values.push(HashMap::new());
    }

    pub(crate) fn get(&self, index: usize, attribute: &str) -> Option<&Value> {
        self.values.get(index)?.get(attribute)
    }

    pub(crate) fn set(&mut self, index: usize, attribute: &str, value: Option<Value>) {
        let Some(bag) = self.values.get_mut(index) else {
            return;
        };
        match value {
            Some(value) => {
                bag.insert(attribute.to_string(), value);
            }
            None => {
                bag.remove(attribute);
            }
        }
    }
}
