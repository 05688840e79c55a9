use crate::config::Method;
use crate::models::classifier_trait::FitHandle;
use crate::options::TuneValue;

/// The uniform result of a training call, whichever backend produced it.
#[derive(Debug)]
pub struct FittedModelRecord {
    /// Backend-native model, opaque to this crate.
    pub fit: Box<dyn FitHandle>,
    /// Feature names in the column order the model expects.
    pub x_names: Vec<String>,
    /// Tuning values actually used, after any adapter corrections.
    pub tune_value: TuneValue,
    pub obs_levels: Vec<String>,
}

impl FittedModelRecord {
    /// Does not inspect the fit handle.
    pub fn wrap(
        fit: Box<dyn FitHandle>,
        x_names: Vec<String>,
        tune_value: TuneValue,
        obs_levels: Vec<String>,
    ) -> Self {
        FittedModelRecord {
            fit,
            x_names,
            tune_value,
            obs_levels,
        }
    }

    pub fn method(&self) -> Method {
        self.fit.method()
    }

    /// The fit handle as its concrete type, if it is a `T`.
    pub fn fit_as<T: FitHandle>(&self) -> Option<&T> {
        self.fit.downcast_ref::<T>()
    }
}
