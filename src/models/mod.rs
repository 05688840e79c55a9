pub mod gbm;
pub mod glmnet;
pub mod pam;
pub mod plsda;
pub mod quiet;
pub mod rf;
pub mod svm;

pub mod classifier_trait;
pub mod factory;

#[cfg(test)]
pub(crate) mod test_support;
