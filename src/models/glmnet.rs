use ndarray::Array2;

use crate::config::Method;
use crate::data_handling::{Factor, TrainingData};
use crate::error::TrainError;
use crate::models::classifier_trait::{backend_error, BackendAdapter, Engine, FitHandle};
use crate::options::{ExtraOptions, OptionFilter, OptionsBuilder, TuneValue};

pub const ALPHA: &str = "alpha";
pub const FAMILY: &str = "family";

const GLMNET_OPTIONS: OptionFilter = OptionFilter::new(&[
    FAMILY,
    "weights",
    "offset",
    "standardize",
    "intercept",
    "lower_limits",
    "upper_limits",
    "exclude",
    "penalty_factor",
    "max_iter",
    "convergence_threshold",
    "type_multinomial",
    "lambda",
    "n_lambda",
]);

/// Inputs for a regularized generalized linear model fit.
#[derive(Debug, Clone)]
pub struct GlmnetCall {
    pub x: Array2<f64>,
    pub x_names: Vec<String>,
    pub y: Factor,
    /// Elastic-net mixing parameter.
    pub alpha: f64,
    /// Allow-listed options, including the resolved `family`.
    pub options: ExtraOptions,
}

impl GlmnetCall {
    pub fn family(&self) -> Option<&str> {
        self.options.get_str(FAMILY)
    }
}

/// Response family for the observed number of classes.
pub fn infer_family(n_levels: usize) -> Result<&'static str, TrainError> {
    match n_levels {
        2 => Ok("binomial"),
        n if n > 2 => Ok("multinomial"),
        n => Err(TrainError::UnresolvableFamily { levels: n }),
    }
}

/// Elastic-net regularized GLM.
pub struct GlmnetAdapter {
    engine: Box<dyn Engine<GlmnetCall>>,
}

impl GlmnetAdapter {
    pub fn new(engine: Box<dyn Engine<GlmnetCall>>) -> Self {
        GlmnetAdapter { engine }
    }
}

impl BackendAdapter for GlmnetAdapter {
    fn method(&self) -> Method {
        Method::Glmnet
    }

    fn tuning_keys(&self) -> &'static [&'static str] {
        &[ALPHA]
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
        let alpha = tune.require(Method::Glmnet, ALPHA)?;
        let family = infer_family(data.n_observed_levels())?;
        let resolved = OptionsBuilder::new(GLMNET_OPTIONS)
            .infer(FAMILY, family)
            .build(options, tune)?;

        let call = GlmnetCall {
            y: data.factor(),
            x: data.x,
            x_names: data.x_names,
            alpha,
            options: resolved,
        };
        self.engine.fit(call).map_err(backend_error(Method::Glmnet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{data_with_levels, labelled_data, Recorder};

    #[test]
    fn test_infer_family() {
        assert_eq!(infer_family(2).unwrap(), "binomial");
        assert_eq!(infer_family(5).unwrap(), "multinomial");
        assert!(matches!(
            infer_family(1),
            Err(TrainError::UnresolvableFamily { levels: 1 })
        ));
    }

    #[test]
    fn test_family_follows_observed_labels() {
        let recorder = Recorder::<GlmnetCall>::new(Method::Glmnet);
        let adapter = GlmnetAdapter::new(recorder.engine());
        let mut tune = TuneValue::new().with(ALPHA, 0.5);

        adapter
            .fit(data_with_levels(&["A", "B", "A"], &["A", "B", "C"], 2), &mut tune, None)
            .unwrap();
        assert_eq!(recorder.last().family(), Some("binomial"));

        adapter
            .fit(labelled_data(&["A", "B", "C"], 2), &mut tune, None)
            .unwrap();
        assert_eq!(recorder.last().family(), Some("multinomial"));
    }

    #[test]
    fn test_caller_family_is_kept() {
        let recorder = Recorder::<GlmnetCall>::new(Method::Glmnet);
        let adapter = GlmnetAdapter::new(recorder.engine());
        let options = ExtraOptions::new()
            .with(FAMILY, "multinomial")
            .with("type_multinomial", "grouped")
            .with("parallel", true);
        let mut tune = TuneValue::new().with(ALPHA, 1.0);

        adapter
            .fit(labelled_data(&["A", "B", "A", "B"], 2), &mut tune, Some(&options))
            .unwrap();

        let call = recorder.last();
        assert_eq!(call.family(), Some("multinomial"));
        assert_eq!(call.options.get_str("type_multinomial"), Some("grouped"));
        assert!(!call.options.contains_key("parallel"));
    }

    #[test]
    fn test_single_observed_class_fails() {
        let recorder = Recorder::<GlmnetCall>::new(Method::Glmnet);
        let adapter = GlmnetAdapter::new(recorder.engine());
        let mut tune = TuneValue::new().with(ALPHA, 0.5);

        let result = adapter.fit(data_with_levels(&["A", "A"], &["A", "B"], 2), &mut tune, None);

        assert!(matches!(result, Err(TrainError::UnresolvableFamily { levels: 1 })));
        assert_eq!(recorder.count(), 0);
    }
}
