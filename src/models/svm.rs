use ndarray::Array2;

use crate::config::{AdapterConfig, Method};
use crate::data_handling::{Factor, TrainingData};
use crate::error::TrainError;
use crate::models::classifier_trait::{backend_error, BackendAdapter, Engine, FitHandle};
use crate::options::{ExtraOptions, TuneValue};

pub const COST: &str = "cost";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvmKernel {
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvmType {
    CClassification,
}

/// Inputs for a support vector machine fit.
#[derive(Debug, Clone)]
pub struct SvmCall {
    pub x: Array2<f64>,
    pub y: Factor,
    pub cost: f64,
    pub kernel: SvmKernel,
    pub svm_type: SvmType,
    /// Kernel cache size in MB.
    pub cache_size: f64,
}

/// Linear support vector machine. No pass-through options.
pub struct SvmAdapter {
    engine: Box<dyn Engine<SvmCall>>,
    cache_size: f64,
}

impl SvmAdapter {
    pub fn new(engine: Box<dyn Engine<SvmCall>>, config: &AdapterConfig) -> Self {
        SvmAdapter {
            engine,
            cache_size: config.svm_cache_size,
        }
    }
}

impl BackendAdapter for SvmAdapter {
    fn method(&self) -> Method {
        Method::Svm
    }

    fn tuning_keys(&self) -> &'static [&'static str] {
        &[COST]
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
        let cost = tune.require(Method::Svm, COST)?;
        if options.map_or(false, |o| !o.is_empty()) {
            log::debug!("SVM takes no extra options; ignoring them");
        }

        let call = SvmCall {
            y: data.factor(),
            x: data.x,
            cost,
            kernel: SvmKernel::Linear,
            svm_type: SvmType::CClassification,
            cache_size: self.cache_size,
        };
        self.engine.fit(call).map_err(backend_error(Method::Svm))
    }
}

#[cfg(feature = "linfa")]
pub use self::linfa_engine::{LinfaSvmEngine, LinfaSvmFit};

#[cfg(feature = "linfa")]
mod linfa_engine {
    use std::any::Any;

    use linfa::dataset::Pr;
    use linfa::Dataset;
    use linfa_svm::{Svm, SvmParams};
    use ndarray::Array1;

    use super::{SvmCall, SvmKernel};
    use crate::config::Method;
    use crate::error::BoxError;
    use crate::models::classifier_trait::{Engine, FitHandle};

    /// Linear SVM engine backed by linfa-svm. More than two classes are fit
    /// one-vs-rest.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct LinfaSvmEngine;

    /// One model per positive class. A binary fit holds a single model whose
    /// positive class is the first level.
    #[derive(Debug)]
    pub struct LinfaSvmFit {
        pub models: Vec<(String, Svm<f64, Pr>)>,
    }

    impl FitHandle for LinfaSvmFit {
        fn method(&self) -> Method {
            Method::Svm
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Engine<SvmCall> for LinfaSvmEngine {
        fn fit(&self, call: SvmCall) -> Result<Box<dyn FitHandle>, BoxError> {
            if call.kernel != SvmKernel::Linear {
                return Err(format!("unsupported kernel {:?}", call.kernel).into());
            }
            log::debug!("linfa-svm ignores cache_size = {}", call.cache_size);

            let y = call.y.drop_unused_levels();
            let n_levels = y.levels.len();
            if n_levels < 2 {
                return Err(format!("need at least two classes, got {}", n_levels).into());
            }
            let positives: Vec<usize> = if n_levels == 2 { vec![0] } else { (0..n_levels).collect() };

            let mut models = Vec::with_capacity(positives.len());
            for positive in positives {
                let targets = Array1::from_iter(y.codes.iter().map(|&c| c == positive));
                let dataset = Dataset::new(call.x.clone(), targets);
                let params: SvmParams<f64, Pr> = Svm::<f64, Pr>::params()
                    .pos_neg_weights(call.cost, call.cost)
                    .linear_kernel();
                let model =
                    <SvmParams<f64, Pr> as linfa::traits::Fit<_, _, _>>::fit(&params, &dataset)?;
                models.push((y.levels[positive].clone(), model));
            }

            Ok(Box::new(LinfaSvmFit { models }))
        }

        fn name(&self) -> &str {
            "linfa-svm"
        }
    }
}
