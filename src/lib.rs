// Principal component analysis (PCA) trained with a singular value decomposition

#![doc = include_str!("../README.md")]

pub mod error;
pub mod linalg_backends;
pub mod linear_machine;
mod persistence;
pub mod sample_store;
pub mod trainer;

pub use error::{Error, Result};
pub use linear_machine::LinearMachine;
pub use sample_store::{Arrayset, Element, ElementType, SampleStore};
pub use trainer::{explained_variance_ratio, PcaFit, SvdPcaTrainer};
