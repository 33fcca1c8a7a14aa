// src/sample_store.rs

use ndarray::{ArrayBase, ArrayD, ArrayView2, ArrayViewMut1, Axis, Data, Ix2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};
use crate::persistence;

/// Element type tag reported by a sample store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Bool => "boolean",
            ElementType::Int8 => "8-bit signed integer",
            ElementType::Int16 => "16-bit signed integer",
            ElementType::Int32 => "32-bit signed integer",
            ElementType::Int64 => "64-bit signed integer",
            ElementType::UInt8 => "8-bit unsigned integer",
            ElementType::UInt16 => "16-bit unsigned integer",
            ElementType::UInt32 => "32-bit unsigned integer",
            ElementType::UInt64 => "64-bit unsigned integer",
            ElementType::Float32 => "32-bit float",
            ElementType::Float64 => "64-bit float",
        };
        f.write_str(name)
    }
}

/// Scalar types that can be held by a sample store.
pub trait Element: Copy + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    /// Widens the value to `f64`. 64-bit integers beyond 2^53 lose precision.
    fn to_f64(self) -> f64;
}

macro_rules! impl_numeric_element {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const ELEMENT_TYPE: ElementType = ElementType::$tag;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_numeric_element!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);

impl Element for bool {
    const ELEMENT_TYPE: ElementType = ElementType::Bool;

    #[inline]
    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}

/// An ordered collection of equally shaped samples, addressable by index.
///
/// Every sample in a store shares the element type and shape the store reports,
/// so consumers validate those once instead of once per sample.
pub trait SampleStore {
    /// Number of samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of every sample.
    fn element_type(&self) -> ElementType;

    /// Shape shared by every sample.
    fn sample_shape(&self) -> &[usize];

    /// Rank of every sample.
    fn ndim(&self) -> usize {
        self.sample_shape().len()
    }

    /// Copies sample `index`, widened to `f64`, into `out`.
    ///
    /// `out` has as many elements as the sample. Implementations must answer in
    /// constant time per sample.
    ///
    /// # Panics
    /// May panic if `index >= self.len()`.
    fn read_sample(&self, index: usize, out: ArrayViewMut1<'_, f64>);
}

/// In-memory sample store holding samples of one declared shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Arrayset<T> {
    shape: Vec<usize>,
    samples: Vec<ArrayD<T>>,
}

impl<T: Element> Arrayset<T> {
    /// Creates an empty arrayset whose samples will all have `shape`.
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            samples: Vec::new(),
        }
    }

    /// Builds an arrayset of 1-D samples, one per row of `rows`.
    pub fn from_rows(rows: ArrayView2<'_, T>) -> Self {
        let samples = rows
            .axis_iter(Axis(0))
            .map(|row| row.to_owned().into_dyn())
            .collect();
        Self {
            shape: vec![rows.ncols()],
            samples,
        }
    }

    /// Appends a sample and returns its index.
    ///
    /// # Errors
    /// Returns `Error::SampleShape` if the sample's shape differs from the
    /// arrayset's declared shape.
    pub fn push(&mut self, sample: ArrayD<T>) -> Result<usize> {
        if sample.shape() != self.shape.as_slice() {
            return Err(Error::SampleShape {
                expected: self.shape.clone(),
                found: sample.shape().to_vec(),
            });
        }
        self.samples.push(sample);
        Ok(self.samples.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&ArrayD<T>> {
        self.samples.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArrayD<T>> {
        self.samples.iter()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl<T> Arrayset<T>
where
    T: Element + Serialize + DeserializeOwned,
{
    /// Writes the arrayset to `path` with bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path)
    }

    /// Reads an arrayset written by [`Arrayset::save`].
    ///
    /// # Errors
    /// Besides I/O and decoding failures, returns `Error::SampleShape` if a
    /// stored sample does not match the stored declared shape.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let arrayset: Self = persistence::load_from_file(path)?;
        if let Some(bad) = arrayset
            .samples
            .iter()
            .find(|sample| sample.shape() != arrayset.shape.as_slice())
        {
            return Err(Error::SampleShape {
                expected: arrayset.shape.clone(),
                found: bad.shape().to_vec(),
            });
        }
        Ok(arrayset)
    }
}

impl<T: Element> SampleStore for Arrayset<T> {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn element_type(&self) -> ElementType {
        T::ELEMENT_TYPE
    }

    fn sample_shape(&self) -> &[usize] {
        &self.shape
    }

    fn read_sample(&self, index: usize, mut out: ArrayViewMut1<'_, f64>) {
        for (dst, &src) in out.iter_mut().zip(self.samples[index].iter()) {
            *dst = src.to_f64();
        }
    }
}

/// A matrix is a store of 1-D samples, one per row.
impl<S, T> SampleStore for ArrayBase<S, Ix2>
where
    S: Data<Elem = T>,
    T: Element,
{
    fn len(&self) -> usize {
        self.nrows()
    }

    fn element_type(&self) -> ElementType {
        T::ELEMENT_TYPE
    }

    fn sample_shape(&self) -> &[usize] {
        &self.shape()[1..]
    }

    fn read_sample(&self, index: usize, mut out: ArrayViewMut1<'_, f64>) {
        for (dst, &src) in out.iter_mut().zip(self.row(index).iter()) {
            *dst = src.to_f64();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, ArrayD, IxDyn};

    #[test]
    fn arrayset_reports_declared_metadata() {
        let mut arrayset = Arrayset::<i32>::new(&[3]);
        assert!(arrayset.is_empty());
        arrayset.push(array![1, 2, 3].into_dyn()).unwrap();
        arrayset.push(array![4, 5, 6].into_dyn()).unwrap();

        assert_eq!(arrayset.len(), 2);
        assert_eq!(arrayset.element_type(), ElementType::Int32);
        assert_eq!(arrayset.sample_shape(), &[3]);
        assert_eq!(arrayset.ndim(), 1);
    }

    #[test]
    fn push_rejects_samples_of_another_shape() {
        let mut arrayset = Arrayset::<f64>::new(&[2]);
        let err = arrayset.push(array![1.0, 2.0, 3.0].into_dyn()).unwrap_err();
        match err {
            Error::SampleShape { expected, found } => {
                assert_eq!(expected, vec![2]);
                assert_eq!(found, vec![3]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(arrayset.is_empty());
    }

    #[test]
    fn read_sample_widens_integers() {
        let mut arrayset = Arrayset::<u8>::new(&[2]);
        arrayset.push(array![7u8, 255].into_dyn()).unwrap();
        let mut column = Array1::<f64>::zeros(2);
        arrayset.read_sample(0, column.view_mut());
        assert_eq!(column, array![7.0, 255.0]);
    }

    #[test]
    fn rank_two_samples_keep_their_shape() {
        let mut arrayset = Arrayset::<f64>::new(&[2, 2]);
        arrayset.push(ArrayD::from_elem(IxDyn(&[2, 2]), 1.0)).unwrap();
        assert_eq!(arrayset.ndim(), 2);
        assert_eq!(arrayset.get(0).map(|a| a.len()), Some(4));
        assert!(arrayset.get(1).is_none());
    }

    #[test]
    fn matrix_rows_are_samples() {
        let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        // The inherent `len` counts elements; the store counts rows.
        assert_eq!(data.len(), 6);
        assert_eq!(SampleStore::len(&data), 2);
        assert_eq!(data.sample_shape(), &[3]);
        assert_eq!(data.element_type(), ElementType::Float64);

        let mut column = Array1::<f64>::zeros(3);
        data.read_sample(1, column.view_mut());
        assert_eq!(column, array![4.0, 5.0, 6.0]);
    }

    #[test]
    fn from_rows_matches_matrix_view() {
        let data = array![[true, false], [false, true]];
        let arrayset = Arrayset::from_rows(data.view());
        assert_eq!(arrayset.element_type(), ElementType::Bool);
        assert_eq!(arrayset.iter().count(), 2);

        let mut column = Array1::<f64>::zeros(2);
        arrayset.read_sample(1, column.view_mut());
        assert_eq!(column, array![0.0, 1.0]);
    }

    #[test]
    fn save_and_load_preserve_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.bin");
        let arrayset = Arrayset::from_rows(array![[1.5, -2.0], [0.25, 8.0]].view());
        arrayset.save(&path).unwrap();

        let loaded = Arrayset::<f64>::load(&path).unwrap();
        assert_eq!(loaded, arrayset);
    }

    #[test]
    fn element_type_names_are_descriptive() {
        assert_eq!(ElementType::Float64.to_string(), "64-bit float");
        assert_eq!(ElementType::Int16.to_string(), "16-bit signed integer");
    }
}
