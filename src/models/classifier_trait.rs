use std::any::Any;
use std::fmt::Debug;

use crate::config::Method;
use crate::data_handling::TrainingData;
use crate::error::{BoxError, TrainError};
use crate::options::{ExtraOptions, TuneValue};

/// Opaque result of a backend fit. Only the matching prediction routine
/// knows the concrete type; it recovers it with `downcast_ref`.
pub trait FitHandle: Any + Debug + Send + Sync {
    fn method(&self) -> Method;

    fn as_any(&self) -> &dyn Any;
}

impl dyn FitHandle {
    pub fn downcast_ref<T: FitHandle>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// An external fitting routine taking the per-method call struct `C`.
pub trait Engine<C>: Send + Sync {
    fn fit(&self, call: C) -> Result<Box<dyn FitHandle>, BoxError>;

    /// Optional human readable name for the engine
    fn name(&self) -> &str {
        "engine"
    }
}

impl<C, F> Engine<C> for F
where
    F: Fn(C) -> Result<Box<dyn FitHandle>, BoxError> + Send + Sync,
{
    fn fit(&self, call: C) -> Result<Box<dyn FitHandle>, BoxError> {
        self(call)
    }
}

/// Per-method pre-fit policy wrapped around an engine.
///
/// The dispatcher checks `tuning_keys` before calling `fit`, so adapters can
/// rely on every listed key being present in `tune`. Adapters write the
/// values they actually used back into `tune`.
pub trait BackendAdapter: Send + Sync {
    fn method(&self) -> Method;

    /// Tuning values this method requires.
    fn tuning_keys(&self) -> &'static [&'static str];

    /// Name of the wrapped engine, for diagnostics.
    fn engine_name(&self) -> &str;

    fn fit(
        &self,
        data: TrainingData,
        tune: &mut TuneValue,
        options: Option<&ExtraOptions>,
    ) -> Result<Box<dyn FitHandle>, TrainError>;
}

/// Wraps an engine failure without altering it.
pub(crate) fn backend_error(method: Method) -> impl FnOnce(BoxError) -> TrainError {
    move |source| TrainError::BackendFit { method, source }
}
