//! Python bindings, enabled with the `python` feature.
//!
//! Exposes `BKTree`, `Keyboard` and `levenshtein_distance` with the same
//! operations as the Rust API. Errors map onto a small exception hierarchy:
//!
//! BkIndexError (base)
//!   ├── InvalidArgumentError
//!   ├── AlreadyExistsError
//!   ├── NotFoundError
//!   ├── MissingReferenceError
//!   └── EmptyInputError

use crate::algorithms::keyboard::{Keyboard, KeyboardRecord, DEFAULT_WEIGHT};
use crate::algorithms::levenshtein::{distance_lower_bound, weighted_distance};
use crate::algorithms::normalize::CaseMode;
use crate::error::IndexError;
use crate::indexing::{BkTree, BuildOptions, Neighbors, SharedMetric, DEFAULT_DELIMITER};
use pyo3::create_exception;
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyString};
use std::collections::{BTreeMap, HashMap};

create_exception!(bkindex, BkIndexError, pyo3::exceptions::PyException);
create_exception!(bkindex, InvalidArgumentError, BkIndexError);
create_exception!(bkindex, AlreadyExistsError, BkIndexError);
create_exception!(bkindex, NotFoundError, BkIndexError);
create_exception!(bkindex, MissingReferenceError, BkIndexError);
create_exception!(bkindex, EmptyInputError, BkIndexError);

impl From<IndexError> for PyErr {
    fn from(err: IndexError) -> Self {
        let message = err.to_string();
        match err {
            IndexError::InvalidArgument(_) => InvalidArgumentError::new_err(message),
            IndexError::AlreadyExists(_) => AlreadyExistsError::new_err(message),
            IndexError::NotFound(_) | IndexError::EdgeNotFound { .. } => {
                NotFoundError::new_err(message)
            }
            IndexError::MissingReference(_) => MissingReferenceError::new_err(message),
            IndexError::EmptyInput(_) => EmptyInputError::new_err(message),
            IndexError::Io(_) => pyo3::exceptions::PyIOError::new_err(message),
            IndexError::Json(_) | IndexError::Encoding(_) => {
                pyo3::exceptions::PyValueError::new_err(message)
            }
        }
    }
}

fn extract_str(value: &Bound<'_, PyAny>, name: &str) -> PyResult<String> {
    value.extract::<String>().map_err(|_| {
        IndexError::InvalidArgument(format!(
            "argument `{name}` expected to be str, got {}",
            value.get_type()
        ))
        .into()
    })
}

/// Strings of an iterable. A lone `str` is rejected rather than split into characters.
fn collect_strings(values: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    if values.is_instance_of::<PyString>() {
        return Err(IndexError::InvalidArgument(
            "expected an iterable of str, got a single str".into(),
        )
        .into());
    }
    let items = values.try_iter().map_err(|_| {
        IndexError::InvalidArgument(format!("expected an iterable of str, got {}", values.get_type()))
    })?;
    items.map(|item| extract_str(&item?, "values")).collect()
}

fn build_metric(case_sensitive: bool, keyboard: Option<&PyKeyboard>, default_weight: usize) -> SharedMetric {
    let options = BuildOptions {
        case_sensitive,
        default_weight,
        ..Default::default()
    };
    options.metric(keyboard.map(|k| &k.inner))
}

/// Python wrapper for Keyboard.
#[pyclass(name = "Keyboard")]
struct PyKeyboard {
    inner: Keyboard,
}

#[pymethods]
impl PyKeyboard {
    #[new]
    #[pyo3(signature = (keys=None))]
    fn new(keys: Option<BTreeMap<String, [f64; 2]>>) -> PyResult<Self> {
        let inner = match keys {
            Some(keys) => Keyboard::from_record(&KeyboardRecord(keys))?,
            None => Keyboard::default(),
        };
        Ok(Self { inner })
    }

    #[staticmethod]
    fn qwerty() -> Self {
        Self { inner: Keyboard::qwerty() }
    }

    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        Ok(Self { inner: Keyboard::from_json(json.as_bytes())? })
    }

    #[staticmethod]
    #[pyo3(signature = (text, delimiter="|"))]
    fn from_text(text: &str, delimiter: &str) -> PyResult<Self> {
        Ok(Self { inner: Keyboard::from_delimited(text.as_bytes(), delimiter)? })
    }

    fn has_key(&self, key: char) -> bool {
        self.inner.has_key(key)
    }

    #[pyo3(signature = (k1, k2, default_weight=DEFAULT_WEIGHT))]
    fn get_weight(&self, k1: char, k2: char, default_weight: usize) -> usize {
        self.inner.weight(k1, k2, default_weight)
    }

    fn neighbors(&self, key: char) -> PyResult<HashMap<char, usize>> {
        Ok(self.inner.neighbors(key)?.iter().map(|(&k, &w)| (k, w)).collect())
    }

    fn add_key(&mut self, key: char, coordinate: (f64, f64)) -> PyResult<()> {
        Ok(self.inner.add_key(key, coordinate)?)
    }

    fn update_key(&mut self, key: char, coordinate: (f64, f64)) -> PyResult<()> {
        Ok(self.inner.update_key(key, coordinate)?)
    }

    fn del_key(&mut self, key: char) -> PyResult<()> {
        Ok(self.inner.remove_key(key)?)
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    #[pyo3(signature = (pretty=true))]
    fn dumps(&self, pretty: bool) -> PyResult<String> {
        Ok(self.inner.to_json(pretty)?)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

/// Python wrapper for BK-tree.
///
/// Note: This class is NOT thread-safe for mutation. Queries release the GIL
/// but inserts and activation changes must not run concurrently with them.
#[pyclass(name = "BKTree")]
struct PyBkTree {
    inner: BkTree,
}

#[pymethods]
impl PyBkTree {
    #[new]
    #[pyo3(signature = (root, case_sensitive=true, keyboard=None, default_weight=DEFAULT_WEIGHT))]
    fn new(
        root: &Bound<'_, PyAny>,
        case_sensitive: bool,
        keyboard: Option<PyRef<'_, PyKeyboard>>,
        default_weight: usize,
    ) -> PyResult<Self> {
        let root = extract_str(root, "root")?;
        let metric = build_metric(case_sensitive, keyboard.as_deref(), default_weight);
        Ok(Self { inner: BkTree::with_metric_arc(root, metric) })
    }

    /// Build a tree from any iterable of strings, such as a set or a list
    #[staticmethod]
    #[pyo3(signature = (values, case_sensitive=true, keyboard=None, default_weight=DEFAULT_WEIGHT))]
    fn from_set(
        values: &Bound<'_, PyAny>,
        case_sensitive: bool,
        keyboard: Option<PyRef<'_, PyKeyboard>>,
        default_weight: usize,
    ) -> PyResult<Self> {
        let metric = build_metric(case_sensitive, keyboard.as_deref(), default_weight);
        Ok(Self { inner: BkTree::from_values(collect_strings(values)?, metric)? })
    }

    /// Build a tree from delimiter-separated text
    #[staticmethod]
    #[pyo3(signature = (text, delimiter=DEFAULT_DELIMITER, case_sensitive=true, keyboard=None, default_weight=DEFAULT_WEIGHT))]
    fn from_text(
        text: &str,
        delimiter: &str,
        case_sensitive: bool,
        keyboard: Option<PyRef<'_, PyKeyboard>>,
        default_weight: usize,
    ) -> PyResult<Self> {
        let metric = build_metric(case_sensitive, keyboard.as_deref(), default_weight);
        Ok(Self { inner: BkTree::from_text(text, delimiter, metric)? })
    }

    /// Rebuild a tree from a JSON record produced by `dumps`
    #[staticmethod]
    #[pyo3(signature = (json, case_sensitive=true, keyboard=None, default_weight=DEFAULT_WEIGHT))]
    fn from_json(
        json: &str,
        case_sensitive: bool,
        keyboard: Option<PyRef<'_, PyKeyboard>>,
        default_weight: usize,
    ) -> PyResult<Self> {
        let metric = build_metric(case_sensitive, keyboard.as_deref(), default_weight);
        Ok(Self { inner: BkTree::from_json(json.as_bytes(), metric)? })
    }

    /// Deserialize a tree from bytes produced by `to_bytes`
    #[staticmethod]
    #[pyo3(signature = (data, case_sensitive=true, keyboard=None, default_weight=DEFAULT_WEIGHT))]
    fn from_bytes(
        data: &[u8],
        case_sensitive: bool,
        keyboard: Option<PyRef<'_, PyKeyboard>>,
        default_weight: usize,
    ) -> PyResult<Self> {
        let metric = build_metric(case_sensitive, keyboard.as_deref(), default_weight);
        Ok(Self { inner: BkTree::from_bytes(data, metric)? })
    }

    fn add_node(&mut self, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let value = extract_str(value, "value")?;
        Ok(self.inner.insert(value)?)
    }

    fn has_node(&self, value: &str) -> bool {
        self.inner.contains(value)
    }

    fn is_active(&self, value: &str) -> PyResult<bool> {
        Ok(self.inner.lookup(value)?.is_active())
    }

    fn set_active(&mut self, value: &str) -> PyResult<()> {
        Ok(self.inner.activate(value)?)
    }

    fn set_inactive(&mut self, value: &str) -> PyResult<()> {
        Ok(self.inner.deactivate(value)?)
    }

    /// Values within `max_distance`, grouped by distance
    #[pyo3(signature = (value, max_distance=1))]
    fn get_neighbors(&self, py: Python<'_>, value: &str, max_distance: usize) -> Neighbors {
        let query = value.to_string();
        // Release GIL during search
        py.allow_threads(|| self.inner.range_query(&query, max_distance))
    }

    fn suggest_correction(&self, value: &str) -> Option<String> {
        self.inner.suggest_correction(value)
    }

    fn get_num_nodes(&self) -> usize {
        self.inner.len()
    }

    fn get_nodes(&self) -> Vec<String> {
        let mut values: Vec<String> = self.inner.values().into_iter().map(str::to_string).collect();
        values.sort_unstable();
        values
    }

    #[pyo3(signature = (pretty=true))]
    fn dumps(&self, pretty: bool) -> PyResult<String> {
        Ok(self.inner.to_json(pretty)?)
    }

    fn to_bytes<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        let bytes = self.inner.to_bytes()?;
        Ok(PyBytes::new(py, &bytes))
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __contains__(&self, value: &str) -> bool {
        self.inner.contains(value)
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

/// Edit distance between two strings.
///
/// With `max_distance` the computation may stop early and return a lower
/// bound once the distance is known to be at least `max_distance`.
#[pyfunction]
#[pyo3(signature = (s1, s2, max_distance=None, keyboard=None, case_sensitive=true, default_weight=DEFAULT_WEIGHT))]
fn levenshtein_distance(
    s1: &Bound<'_, PyAny>,
    s2: &Bound<'_, PyAny>,
    max_distance: Option<usize>,
    keyboard: Option<PyRef<'_, PyKeyboard>>,
    case_sensitive: bool,
    default_weight: usize,
) -> PyResult<usize> {
    let s1 = extract_str(s1, "s1")?;
    let s2 = extract_str(s2, "s2")?;
    let weights = keyboard.map(|k| k.inner.weight_fn(default_weight));
    let case = CaseMode::from_sensitive(case_sensitive);

    Ok(match max_distance {
        Some(bound) => distance_lower_bound(&s1, &s2, bound, weights.as_deref(), case),
        None => weighted_distance(&s1, &s2, weights.as_deref(), case),
    })
}

#[pymodule]
fn bkindex(py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("BkIndexError", py.get_type::<BkIndexError>())?;
    m.add("InvalidArgumentError", py.get_type::<InvalidArgumentError>())?;
    m.add("AlreadyExistsError", py.get_type::<AlreadyExistsError>())?;
    m.add("NotFoundError", py.get_type::<NotFoundError>())?;
    m.add("MissingReferenceError", py.get_type::<MissingReferenceError>())?;
    m.add("EmptyInputError", py.get_type::<EmptyInputError>())?;

    m.add_function(wrap_pyfunction!(levenshtein_distance, m)?)?;
    m.add_class::<PyKeyboard>()?;
    m.add_class::<PyBkTree>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyo3::types::{PyFrozenSet, PyList, PySet};

    fn from_set(values: &Bound<'_, PyAny>) -> PyResult<PyBkTree> {
        PyBkTree::from_set(values, true, None, DEFAULT_WEIGHT)
    }

    #[test]
    fn test_from_set_accepts_iterables() {
        pyo3::prepare_freethreaded_python();
        Python::with_gil(|py| {
            let set = PySet::new(py, ["book", "books", "cake"]).unwrap();
            let tree = from_set(set.as_any()).unwrap();
            assert_eq!(tree.get_num_nodes(), 3);
            assert!(tree.has_node("cake"));

            let frozen = PyFrozenSet::new(py, ["cook"]).unwrap();
            assert_eq!(from_set(frozen.as_any()).unwrap().get_num_nodes(), 1);

            let list = PyList::new(py, ["book", "book", "cook"]).unwrap();
            assert_eq!(from_set(list.as_any()).unwrap().get_num_nodes(), 2);
        });
    }

    #[test]
    fn test_from_set_rejects_bad_input() {
        pyo3::prepare_freethreaded_python();
        Python::with_gil(|py| {
            let empty = PySet::empty(py).unwrap();
            let err = from_set(empty.as_any()).unwrap_err();
            assert!(err.is_instance_of::<EmptyInputError>(py));

            let numbers = PyList::new(py, [1, 2]).unwrap();
            let err = from_set(numbers.as_any()).unwrap_err();
            assert!(err.is_instance_of::<InvalidArgumentError>(py));

            let word = PyString::new(py, "book");
            let err = from_set(word.as_any()).unwrap_err();
            assert!(err.is_instance_of::<InvalidArgumentError>(py));
            assert!(err.is_instance_of::<BkIndexError>(py));
        });
    }
}
