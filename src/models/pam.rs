use ndarray::Array2;

use crate::config::{AdapterConfig, Method};
use crate::data_handling::{Factor, TrainingData};
use crate::error::TrainError;
use crate::models::classifier_trait::{backend_error, BackendAdapter, Engine, FitHandle};
use crate::models::quiet::QuietScope;
use crate::options::{ExtraOptions, OptionFilter, OptionsBuilder, TuneValue};

pub const THRESHOLD: &str = "threshold";

const PAM_OPTIONS: OptionFilter =
    OptionFilter::new(&["n_threshold", "threshold_scale", "scale_sd", "se_scale"]);

/// Inputs for a nearest shrunken centroid fit.
#[derive(Debug, Clone)]
pub struct PamCall {
    /// Rows are features, columns are samples.
    pub x: Array2<f64>,
    /// Synthetic feature identifiers, one per row of `x`.
    pub gene_ids: Vec<String>,
    /// Labels re-leveled to the classes that survived pruning.
    pub y: Factor,
    pub threshold: f64,
    pub options: ExtraOptions,
}

/// Nearest shrunken centroid classifier.
///
/// Classes with fewer than `min_class_size` rows are removed before the fit.
/// Logging and console output are silenced for the duration of the engine
/// call only.
pub struct PamAdapter {
    engine: Box<dyn Engine<PamCall>>,
    min_class_size: usize,
}

impl PamAdapter {
    pub fn new(engine: Box<dyn Engine<PamCall>>, config: &AdapterConfig) -> Self {
        PamAdapter {
            engine,
            min_class_size: config.pam_min_class_size,
        }
    }
}

impl BackendAdapter for PamAdapter {
    fn method(&self) -> Method {
        Method::Pam
    }

    fn tuning_keys(&self) -> &'static [&'static str] {
        &[THRESHOLD]
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
        let threshold = tune.require(Method::Pam, THRESHOLD)?;
        let resolved = OptionsBuilder::new(PAM_OPTIONS).build(options, tune)?;

        let data = data.drop_rare_classes(self.min_class_size);
        let y = data.factor().drop_unused_levels();
        let gene_ids = (1..=data.n_features()).map(|i| format!("g{}", i)).collect();

        let call = PamCall {
            x: data.x.t().as_standard_layout().into_owned(),
            gene_ids,
            y,
            threshold,
            options: resolved,
        };

        let result = {
            let _quiet = QuietScope::enter();
            self.engine.fit(call)
        };
        result.map_err(backend_error(Method::Pam))
    }
}
