use std::collections::HashMap;

use crate::config::{AdapterConfig, Method};
use crate::data_handling::{normalize, FeatureTable};
use crate::error::TrainError;
use crate::models::classifier_trait::{BackendAdapter, Engine};
use crate::models::gbm::{GbdtEngine, GbmAdapter, GbmCall};
use crate::models::glmnet::{GlmnetAdapter, GlmnetCall};
use crate::models::pam::{PamAdapter, PamCall};
use crate::models::plsda::{PlsdaAdapter, PlsdaCall};
use crate::models::rf::{RfAdapter, RfCall};
use crate::models::svm::{SvmAdapter, SvmCall};
use crate::options::{ExtraOptions, TuneValue};
use crate::record::FittedModelRecord;

/// Everything needed for one training call.
#[derive(Debug, Clone)]
pub struct TrainingRequest {
    pub table: FeatureTable,
    /// One of plsda, gbm, rf, svm, pam, glmnet.
    pub method: String,
    pub tuning: TuneValue,
    /// The full, ordered set of classes the model may see.
    pub obs_levels: Vec<String>,
    pub extra_options: Option<ExtraOptions>,
}

impl TrainingRequest {
    pub fn new(table: FeatureTable, method: &str, tuning: TuneValue, obs_levels: Vec<String>) -> Self {
        TrainingRequest {
            table,
            method: method.to_string(),
            tuning,
            obs_levels,
            extra_options: None,
        }
    }

    pub fn with_options(mut self, options: ExtraOptions) -> Self {
        self.extra_options = Some(options);
        self
    }
}

/// Dispatches training requests to the adapter registered for their method.
pub struct Trainer {
    adapters: HashMap<Method, Box<dyn BackendAdapter>>,
}

impl Trainer {
    pub fn builder(config: AdapterConfig) -> TrainerBuilder {
        TrainerBuilder {
            config,
            adapters: HashMap::new(),
        }
    }

    pub fn supports(&self, method: Method) -> bool {
        self.adapters.contains_key(&method)
    }

    /// Name of the engine registered for `method`.
    pub fn engine_name(&self, method: Method) -> Option<&str> {
        self.adapters.get(&method).map(|adapter| adapter.engine_name())
    }

    /// Normalize, fit and wrap. Either a complete record is returned or the
    /// call fails; nothing is retried.
    pub fn train(&self, request: &TrainingRequest) -> Result<FittedModelRecord, TrainError> {
        let method: Method = request.method.parse()?;
        let adapter = self
            .adapters
            .get(&method)
            .ok_or(TrainError::BackendUnavailable(method))?;

        let mut tune = request.tuning.clone();
        for &key in adapter.tuning_keys() {
            tune.require(method, key)?;
        }

        let data = normalize(&request.table, &request.obs_levels)?;
        let (n_rows, kept) = (data.n_rows(), data.labelled_rows());
        let data = data.into_labelled()?;
        let options = match &request.extra_options {
            Some(options) => Some(options.select_rows(n_rows, &kept)?),
            None => None,
        };
        let x_names = data.x_names.clone();

        log::debug!(
            "Fitting {} with engine '{}' on {} rows x {} features",
            method,
            adapter.engine_name(),
            data.n_rows(),
            data.n_features()
        );
        let fit = adapter.fit(data, &mut tune, options.as_ref())?;

        Ok(FittedModelRecord::wrap(
            fit,
            x_names,
            tune,
            request.obs_levels.clone(),
        ))
    }
}

/// Registers one adapter per method.
///
/// New algorithms plug in through [`TrainerBuilder::adapter`]; a later
/// registration for the same method replaces the earlier one.
pub struct TrainerBuilder {
    config: AdapterConfig,
    adapters: HashMap<Method, Box<dyn BackendAdapter>>,
}

impl TrainerBuilder {
    pub fn adapter(mut self, adapter: Box<dyn BackendAdapter>) -> Self {
        self.adapters.insert(adapter.method(), adapter);
        self
    }

    pub fn plsda<E: Engine<PlsdaCall> + 'static>(self, engine: E) -> Self {
        let adapter = PlsdaAdapter::new(Box::new(engine), &self.config);
        self.adapter(Box::new(adapter))
    }

    pub fn gbm<E: Engine<GbmCall> + 'static>(self, engine: E) -> Self {
        let adapter = GbmAdapter::new(Box::new(engine), &self.config);
        self.adapter(Box::new(adapter))
    }

    pub fn rf<E: Engine<RfCall> + 'static>(self, engine: E) -> Self {
        let adapter = RfAdapter::new(Box::new(engine), &self.config);
        self.adapter(Box::new(adapter))
    }

    pub fn svm<E: Engine<SvmCall> + 'static>(self, engine: E) -> Self {
        let adapter = SvmAdapter::new(Box::new(engine), &self.config);
        self.adapter(Box::new(adapter))
    }

    pub fn pam<E: Engine<PamCall> + 'static>(self, engine: E) -> Self {
        let adapter = PamAdapter::new(Box::new(engine), &self.config);
        self.adapter(Box::new(adapter))
    }

    pub fn glmnet<E: Engine<GlmnetCall> + 'static>(self, engine: E) -> Self {
        self.adapter(Box::new(GlmnetAdapter::new(Box::new(engine))))
    }

    /// Registers the engines shipped with the crate: gbdt for gbm, and
    /// linfa-svm for svm when the `linfa` feature is enabled.
    pub fn with_default_engines(self) -> Self {
        let builder = self.gbm(GbdtEngine::new());
        #[cfg(feature = "linfa")]
        let builder = builder.svm(crate::models::svm::LinfaSvmEngine);
        builder
    }

    pub fn build(self) -> Trainer {
        log::debug!(
            "Trainer registered for: {}",
            Method::ALL
                .iter()
                .filter_map(|m| {
                    let adapter = self.adapters.get(m)?;
                    Some(format!("{} ({})", m, adapter.engine_name()))
                })
                .collect::<Vec<_>>()
                .join(", ")
        );
        Trainer {
            adapters: self.adapters,
        }
    }
}
