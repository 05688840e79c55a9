use std::any::Any;
use std::fmt;

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::Array2;

use crate::config::{AdapterConfig, Method};
use crate::data_handling::{Factor, TrainingData};
use crate::error::{BoxError, TrainError};
use crate::models::classifier_trait::{backend_error, BackendAdapter, Engine, FitHandle};
use crate::options::{ExtraOptions, OptionFilter, OptionValue, OptionsBuilder, TuneValue};

pub const INTERACTION_DEPTH: &str = "interaction_depth";
pub const TREE_COUNT: &str = "tree_count";
pub const SHRINKAGE: &str = "shrinkage";
pub const MIN_LEAF_SIZE: &str = "min_leaf_size";
pub const DISTRIBUTION: &str = "distribution";

const GBM_OPTIONS: OptionFilter = OptionFilter::new(&[
    DISTRIBUTION,
    "weights",
    "var_monotone",
    TREE_COUNT,
    INTERACTION_DEPTH,
    MIN_LEAF_SIZE,
    SHRINKAGE,
    "bag_fraction",
    "train_fraction",
    "keep_data",
    "verbose",
]);

const TUNING_KEYS: &[&str] = &[INTERACTION_DEPTH, TREE_COUNT, SHRINKAGE];

/// Response handed to a boosting engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GbmResponse {
    /// 1.0 for the first level of `obs_levels`, 0.0 for the second.
    Binary(Vec<f64>),
    Multiclass(Factor),
}

/// Inputs for a gradient boosted trees fit.
#[derive(Debug, Clone)]
pub struct GbmCall {
    pub x: Array2<f64>,
    pub x_names: Vec<String>,
    pub response: GbmResponse,
    pub n_trees: usize,
    pub interaction_depth: usize,
    pub shrinkage: f64,
    /// Allow-listed options, including the resolved `distribution`.
    pub options: ExtraOptions,
}

impl GbmCall {
    pub fn distribution(&self) -> Option<&str> {
        self.options.get_str(DISTRIBUTION)
    }

    pub fn min_leaf_size(&self) -> Option<usize> {
        self.options.get_usize(MIN_LEAF_SIZE)
    }
}

/// Gradient boosted trees.
pub struct GbmAdapter {
    engine: Box<dyn Engine<GbmCall>>,
    small_data_limit: usize,
    tiny_data_limit: usize,
    tiny_min_leaf: usize,
    small_min_leaf: usize,
}

impl GbmAdapter {
    pub fn new(engine: Box<dyn Engine<GbmCall>>, config: &AdapterConfig) -> Self {
        GbmAdapter {
            engine,
            small_data_limit: config.gbm_small_data_limit,
            tiny_data_limit: config.gbm_tiny_data_limit,
            tiny_min_leaf: config.gbm_tiny_min_leaf,
            small_min_leaf: config.gbm_small_min_leaf,
        }
    }
}

impl BackendAdapter for GbmAdapter {
    fn method(&self) -> Method {
        Method::Gbm
    }

    fn tuning_keys(&self) -> &'static [&'static str] {
        TUNING_KEYS
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
        // Binary vs multiclass follows the declared class universe, not the
        // labels that happen to be present in this sample.
        let binary = data.obs_levels.len() == 2;
        let distribution = if binary { "bernoulli" } else { "multinomial" };

        let mut builder = OptionsBuilder::new(GBM_OPTIONS)
            .infer(DISTRIBUTION, distribution)
            .tuning_overrides(TUNING_KEYS);

        let (n_rows, n_features) = (data.n_rows(), data.n_features());
        if n_rows < self.small_data_limit || n_features < self.small_data_limit {
            let min_leaf = if n_rows < self.tiny_data_limit {
                self.tiny_min_leaf
            } else {
                self.small_min_leaf
            };
            log::debug!(
                "Small GBM training set ({} rows, {} features); default min_leaf_size = {}",
                n_rows,
                n_features,
                min_leaf
            );
            builder = builder.infer(MIN_LEAF_SIZE, min_leaf);
        }

        let resolved = builder.build(options, tune)?;
        let n_trees = tune.require_count(Method::Gbm, TREE_COUNT)?;
        let interaction_depth = tune.require_count(Method::Gbm, INTERACTION_DEPTH)?;
        let shrinkage = tune.require(Method::Gbm, SHRINKAGE)?;

        let factor = data.factor();
        let response = if binary {
            GbmResponse::Binary(
                factor
                    .codes
                    .iter()
                    .map(|&c| if c == 0 { 1.0 } else { 0.0 })
                    .collect(),
            )
        } else {
            GbmResponse::Multiclass(factor)
        };

        let call = GbmCall {
            x: data.x,
            x_names: data.x_names,
            response,
            n_trees,
            interaction_depth,
            shrinkage,
            options: resolved,
        };
        self.engine.fit(call).map_err(backend_error(Method::Gbm))
    }
}

/// Binary boosting engine backed by the `gbdt` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GbdtEngine;

impl GbdtEngine {
    pub fn new() -> Self {
        GbdtEngine
    }
}

/// A model fitted by [`GbdtEngine`].
pub struct GbdtFit {
    model: GBDT,
    n_features: usize,
}

impl GbdtFit {
    /// Raw scores, one per row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Vec<f32> {
        let mut test_x = DataVec::new();
        for row in x.rows() {
            let test_row = row.iter().map(|&v| v as f32).collect();
            test_x.push(Data::new_training_data(test_row, 1.0, 0.0, None));
        }
        self.model.predict(&test_x)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl fmt::Debug for GbdtFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GbdtFit")
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl FitHandle for GbdtFit {
    fn method(&self) -> Method {
        Method::Gbm
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Engine<GbmCall> for GbdtEngine {
    fn fit(&self, call: GbmCall) -> Result<Box<dyn FitHandle>, BoxError> {
        let y = match &call.response {
            GbmResponse::Binary(y) => y,
            GbmResponse::Multiclass(factor) => {
                return Err(format!(
                    "gbdt engine only fits binary responses, got {} classes",
                    factor.levels.len()
                )
                .into())
            }
        };
        match call.distribution() {
            Some("bernoulli") | None => {}
            Some(other) => return Err(format!("gbdt engine does not support distribution '{}'", other).into()),
        }

        let weights = match call.options.get("weights") {
            Some(OptionValue::Numbers(w)) if w.len() == y.len() => Some(w.clone()),
            Some(_) => return Err("weights must be a numeric vector with one entry per row".into()),
            None => None,
        };

        let feature_size = call.x.ncols();
        let mut config = Config::new();
        config.set_feature_size(feature_size);
        config.set_shrinkage(call.shrinkage as f32);
        config.set_max_depth(call.interaction_depth as u32);
        config.set_iterations(call.n_trees);
        config.set_debug(call.options.get_bool("verbose").unwrap_or(false));
        config.set_loss("LogLikelyhood");
        if let Some(min_leaf) = call.min_leaf_size() {
            config.set_min_leaf_size(min_leaf);
        }
        if let Some(ratio) = call.options.get_f64("bag_fraction") {
            config.set_data_sample_ratio(ratio);
        }

        let mut train_x = DataVec::new();
        for (i, row) in call.x.rows().into_iter().enumerate() {
            let train_row = row.iter().map(|&v| v as f32).collect();
            let weight = weights.as_ref().map_or(1.0, |w| w[i] as f32);
            // LogLikelyhood expects labels in {-1, 1}
            let label = if y[i] == 1.0 { 1.0 } else { -1.0 };
            train_x.push(Data::new_training_data(train_row, weight, label, None));
        }

        let mut gbdt = GBDT::new(&config);
        gbdt.fit(&mut train_x);

        Ok(Box::new(GbdtFit {
            model: gbdt,
            n_features: feature_size,
        }))
    }

    fn name(&self) -> &str {
        "gbdt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{data_with_levels, labelled_data, Recorder};

    fn tune() -> TuneValue {
        TuneValue::new()
            .with(INTERACTION_DEPTH, 3.0)
            .with(TREE_COUNT, 100.0)
            .with(SHRINKAGE, 0.1)
    }

    fn adapter(recorder: &Recorder<GbmCall>) -> GbmAdapter {
        GbmAdapter::new(recorder.engine(), &AdapterConfig::default())
    }

    #[test]
    fn test_binary_response_encodes_first_level_as_one() {
        let recorder = Recorder::new(Method::Gbm);
        let data = labelled_data(&["A", "B", "B", "A"], 2);

        adapter(&recorder).fit(data, &mut tune(), None).unwrap();

        let call = recorder.last();
        assert_eq!(call.response, GbmResponse::Binary(vec![1.0, 0.0, 0.0, 1.0]));
        assert_eq!(call.distribution(), Some("bernoulli"));
    }

    #[test]
    fn test_binary_detection_uses_obs_levels() {
        let recorder = Recorder::new(Method::Gbm);
        let data = data_with_levels(&["B", "B", "B"], &["A", "B"], 2);

        adapter(&recorder).fit(data, &mut tune(), None).unwrap();

        assert_eq!(
            recorder.last().response,
            GbmResponse::Binary(vec![0.0, 0.0, 0.0])
        );
    }

    #[test]
    fn test_multiclass_passes_raw_labels() {
        let recorder = Recorder::new(Method::Gbm);
        let data = labelled_data(&["A", "B", "C", "A"], 2);

        adapter(&recorder).fit(data, &mut tune(), None).unwrap();

        let call = recorder.last();
        assert_eq!(call.distribution(), Some("multinomial"));
        match call.response {
            GbmResponse::Multiclass(factor) => {
                assert_eq!(factor.labels().collect::<Vec<_>>(), vec!["A", "B", "C", "A"]);
            }
            other => panic!("expected multiclass response, got {:?}", other),
        }
    }

    #[test]
    fn test_min_leaf_size_inferred_for_small_data() {
        let recorder = Recorder::new(Method::Gbm);
        let tiny: Vec<&str> = (0..20).map(|i| if i % 2 == 0 { "A" } else { "B" }).collect();
        adapter(&recorder)
            .fit(labelled_data(&tiny, 3), &mut tune(), None)
            .unwrap();
        assert_eq!(recorder.last().min_leaf_size(), Some(2));

        let small: Vec<&str> = (0..40).map(|i| if i % 2 == 0 { "A" } else { "B" }).collect();
        adapter(&recorder)
            .fit(labelled_data(&small, 3), &mut tune(), None)
            .unwrap();
        assert_eq!(recorder.last().min_leaf_size(), Some(5));
    }

    #[test]
    fn test_min_leaf_size_not_inferred_for_large_data() {
        let recorder = Recorder::new(Method::Gbm);
        let labels: Vec<&str> = (0..60).map(|i| if i % 2 == 0 { "A" } else { "B" }).collect();
        adapter(&recorder)
            .fit(labelled_data(&labels, 60), &mut tune(), None)
            .unwrap();
        assert_eq!(recorder.last().min_leaf_size(), None);
    }

    #[test]
    fn test_caller_min_leaf_size_wins() {
        let recorder = Recorder::new(Method::Gbm);
        let options = ExtraOptions::new().with(MIN_LEAF_SIZE, 7usize);
        adapter(&recorder)
            .fit(labelled_data(&["A", "B", "A", "B"], 2), &mut tune(), Some(&options))
            .unwrap();
        assert_eq!(recorder.last().min_leaf_size(), Some(7));
    }

    #[test]
    fn test_tuning_options_override_tune_values() {
        let recorder = Recorder::new(Method::Gbm);
        let options = ExtraOptions::new()
            .with(TREE_COUNT, 500usize)
            .with("bag_fraction", 0.8)
            .with("cv_folds", 5usize);
        let mut tune = tune();

        adapter(&recorder)
            .fit(labelled_data(&["A", "B", "A", "B"], 2), &mut tune, Some(&options))
            .unwrap();

        let call = recorder.last();
        assert_eq!(call.n_trees, 500);
        assert_eq!(tune.get(TREE_COUNT), Some(500.0));
        assert!(!call.options.contains_key(TREE_COUNT));
        assert!(!call.options.contains_key("cv_folds"));
        assert_eq!(call.options.get_f64("bag_fraction"), Some(0.8));
    }

    #[test]
    fn test_gbdt_engine_rejects_multiclass() {
        let call = GbmCall {
            x: Array2::zeros((3, 2)),
            x_names: vec!["f1".to_string(), "f2".to_string()],
            response: GbmResponse::Multiclass(Factor {
                codes: vec![0, 1, 2],
                levels: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            }),
            n_trees: 3,
            interaction_depth: 2,
            shrinkage: 0.1,
            options: ExtraOptions::new(),
        };
        assert!(GbdtEngine::new().fit(call).is_err());
    }
}
