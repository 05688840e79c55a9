use ndarray::Array2;

use crate::config::{AdapterConfig, Method};
use crate::data_handling::{Factor, TrainingData};
use crate::error::TrainError;
use crate::models::classifier_trait::{backend_error, BackendAdapter, Engine, FitHandle};
use crate::options::{ExtraOptions, OptionFilter, OptionsBuilder, TuneValue};

pub const CANDIDATE_FEATURES: &str = "candidate_features";
pub const TREE_COUNT: &str = "tree_count";

const RF_OPTIONS: OptionFilter =
    OptionFilter::new(&[TREE_COUNT, "max_nodes", "keep_forest", "keep_inbag"]);

/// Inputs for a random forest fit.
#[derive(Debug, Clone)]
pub struct RfCall {
    pub x: Array2<f64>,
    pub x_names: Vec<String>,
    pub y: Factor,
    /// Candidate features per split (mtry).
    pub mtry: usize,
    pub n_trees: usize,
    pub importance: bool,
    /// Allow-listed options other than `tree_count`.
    pub options: ExtraOptions,
}

/// Default forest size: `sqrt(n_features)` rounded to the nearest multiple
/// of `step`, never less than `step`.
pub fn default_tree_count(n_features: usize, step: usize) -> usize {
    let step = step.max(1);
    let multiples = ((n_features as f64).sqrt() / step as f64).round() as usize;
    multiples.max(1) * step
}

/// Random forest. Variable importance is always computed.
pub struct RfAdapter {
    engine: Box<dyn Engine<RfCall>>,
    tree_step: usize,
}

impl RfAdapter {
    pub fn new(engine: Box<dyn Engine<RfCall>>, config: &AdapterConfig) -> Self {
        RfAdapter {
            engine,
            tree_step: config.rf_tree_step,
        }
    }
}

impl BackendAdapter for RfAdapter {
    fn method(&self) -> Method {
        Method::Rf
    }

    fn tuning_keys(&self) -> &'static [&'static str] {
        &[CANDIDATE_FEATURES]
    }

    fn engine_name(&self) -> &str {
        self.engine.name()
    }

    fn fit(
        &self,
        data: TrainingData,
        tune: &mut TuneValue,
        options: Option<&ExtraOptions>,
    ) -> Result<Box<dyn FitHandle>, TrainError> {
        let mtry = tune.require_count(Method::Rf, CANDIDATE_FEATURES)?;
        let default_trees = default_tree_count(data.n_features(), self.tree_step);
        let mut resolved = OptionsBuilder::new(RF_OPTIONS)
            .infer(TREE_COUNT, default_trees)
            .build(options, tune)?;

        let n_trees = match resolved.remove(TREE_COUNT) {
            Some(value) => value.as_usize().ok_or_else(|| TrainError::InvalidOption {
                key: TREE_COUNT.to_string(),
                reason: format!("expected a whole number of trees, got {:?}", value),
            })?,
            None => default_trees,
        };

        let call = RfCall {
            y: data.factor(),
            x: data.x,
            x_names: data.x_names,
            mtry,
            n_trees,
            importance: true,
            options: resolved,
        };
        self.engine.fit(call).map_err(backend_error(Method::Rf))
    }
}
