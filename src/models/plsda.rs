use ndarray::Array2;

use crate::config::{AdapterConfig, Method};
use crate::data_handling::{Factor, TrainingData};
use crate::error::TrainError;
use crate::models::classifier_trait::{backend_error, BackendAdapter, Engine, FitHandle};
use crate::options::{ExtraOptions, TuneValue};

pub const COMPONENT_COUNT: &str = "component_count";

/// Inputs for a partial least squares discriminant analysis fit.
#[derive(Debug, Clone)]
pub struct PlsdaCall {
    pub x: Array2<f64>,
    pub y: Factor,
    pub n_components: usize,
}

/// Partial least squares discriminant analysis. No pass-through options.
pub struct PlsdaAdapter {
    engine: Box<dyn Engine<PlsdaCall>>,
    min_components: usize,
}

impl PlsdaAdapter {
    pub fn new(engine: Box<dyn Engine<PlsdaCall>>, config: &AdapterConfig) -> Self {
        PlsdaAdapter {
            engine,
            min_components: config.plsda_min_components,
        }
    }
}

impl BackendAdapter for PlsdaAdapter {
    fn method(&self) -> Method {
        Method::Plsda
    }

    fn tuning_keys(&self) -> &'static [&'static str] {
        &[COMPONENT_COUNT]
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
        let mut n_components = tune.require_count(Method::Plsda, COMPONENT_COUNT)?;
        if n_components == 1 {
            log::warn!(
                "PLS-DA needs at least {} components; raising component_count from 1 to {}",
                self.min_components,
                self.min_components
            );
            n_components = self.min_components;
            tune.set(COMPONENT_COUNT, n_components as f64);
        }

        if options.map_or(false, |o| !o.is_empty()) {
            log::debug!("PLS-DA takes no extra options; ignoring them");
        }

        let call = PlsdaCall {
            y: data.factor(),
            x: data.x,
            n_components,
        };
        self.engine.fit(call).map_err(backend_error(Method::Plsda))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{labelled_data, Recorder};

    #[test]
    fn test_single_component_is_raised_to_two() {
        let recorder = Recorder::<PlsdaCall>::new(Method::Plsda);
        let adapter = PlsdaAdapter::new(recorder.engine(), &AdapterConfig::default());
        let mut tune = TuneValue::new().with(COMPONENT_COUNT, 1.0);

        adapter
            .fit(labelled_data(&["A", "B", "A", "B"], 3), &mut tune, None)
            .unwrap();

        assert_eq!(tune.get(COMPONENT_COUNT), Some(2.0));
        assert_eq!(recorder.last().n_components, 2);
    }

    #[test]
    fn test_larger_component_counts_pass_through() {
        let recorder = Recorder::<PlsdaCall>::new(Method::Plsda);
        let adapter = PlsdaAdapter::new(recorder.engine(), &AdapterConfig::default());
        let mut tune = TuneValue::new().with(COMPONENT_COUNT, 3.0);

        adapter
            .fit(labelled_data(&["A", "B", "A", "B"], 3), &mut tune, None)
            .unwrap();

        assert_eq!(tune.get(COMPONENT_COUNT), Some(3.0));
        let call = recorder.last();
        assert_eq!(call.n_components, 3);
        assert_eq!(call.y.levels, vec!["A", "B"]);
    }
}
