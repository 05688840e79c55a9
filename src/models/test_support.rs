//! Recording engines and small datasets shared by the adapter tests.
use std::any::Any;
use std::sync::{Arc, Mutex};

use ndarray::Array2;

use crate::config::Method;
use crate::data_handling::TrainingData;
use crate::error::BoxError;
use crate::models::classifier_trait::{Engine, FitHandle};

#[derive(Debug)]
pub(crate) struct StubFit {
    pub method: Method,
}

impl FitHandle for StubFit {
    fn method(&self) -> Method {
        self.method
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Engine that stores every call it receives.
pub(crate) struct Recorder<C> {
    method: Method,
    calls: Arc<Mutex<Vec<C>>>,
}

impl<C: Clone + Send + 'static> Recorder<C> {
    pub fn new(method: Method) -> Self {
        Recorder {
            method,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn engine(&self) -> Box<dyn Engine<C>> {
        let calls = Arc::clone(&self.calls);
        let method = self.method;
        Box::new(move |call: C| -> Result<Box<dyn FitHandle>, BoxError> {
            calls.lock().unwrap().push(call);
            Ok(Box::new(StubFit { method }))
        })
    }

    pub fn last(&self) -> C {
        self.calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("engine was not called")
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Labelled data with `obs_levels` set to the distinct labels in sorted order.
pub(crate) fn labelled_data(labels: &[&str], n_features: usize) -> TrainingData {
    let mut levels: Vec<&str> = labels.to_vec();
    levels.sort_unstable();
    levels.dedup();
    data_with_levels(labels, &levels, n_features)
}

pub(crate) fn data_with_levels(labels: &[&str], levels: &[&str], n_features: usize) -> TrainingData {
    let n_rows = labels.len();
    TrainingData {
        x: Array2::from_shape_fn((n_rows, n_features), |(r, c)| (r * n_features + c) as f64),
        labels: labels
            .iter()
            .map(|l| levels.iter().position(|level| level == l))
            .collect(),
        x_names: (0..n_features).map(|c| format!("f{}", c + 1)).collect(),
        obs_levels: levels.iter().map(|s| s.to_string()).collect(),
    }
}
