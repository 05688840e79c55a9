//! redeem-fit: a uniform training adapter for classification backends.
//!
//! A caller hands over a labeled feature table, a method name, tuning values
//! and an optional bag of backend options. The crate normalizes the table,
//! applies the per-method pre-fit policy, filters the options down to what
//! the backend understands and returns a [`record::FittedModelRecord`] with
//! the same shape for every method.
//!
//! The fitting algorithms themselves are external engines plugged into a
//! [`models::factory::Trainer`]. A GBDT engine is always available; a linear
//! SVM engine built on linfa is available with the `linfa` feature.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod models;
pub mod options;
pub mod record;

pub use config::{AdapterConfig, Method};
pub use data_handling::{Column, ColumnValues, Factor, FeatureTable, TrainingData};
pub use error::{BoxError, TrainError};
pub use models::classifier_trait::{BackendAdapter, Engine, FitHandle};
pub use models::factory::{Trainer, TrainerBuilder, TrainingRequest};
pub use options::{ExtraOptions, OptionValue, TuneValue};
pub use record::FittedModelRecord;
