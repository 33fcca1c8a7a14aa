// src/linear_machine.rs

use float_cmp::{ApproxEq, F64Margin};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::persistence;

/// An affine projection with input centering and per-output scaling.
///
/// For an input `x` of length `input_size()` the machine computes
///
/// ```text
/// y = W (x - input_subtraction) / input_division + biases
/// ```
///
/// where `W` has shape `(output_size, input_size)` and the division is taken
/// element-wise, one divisor per output component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearMachine {
    /// Shape: (output_size, input_size). Row `k` maps the inputs to output `k`.
    weights: Array2<f64>,
    /// Shape: (output_size)
    biases: Array1<f64>,
    /// Shape: (input_size)
    input_subtraction: Array1<f64>,
    /// Shape: (output_size)
    input_division: Array1<f64>,
}

impl Default for LinearMachine {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl LinearMachine {
    /// Creates a machine with zero weights, biases and subtraction, and unit division.
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            weights: Array2::zeros((output_size, input_size)),
            biases: Array1::zeros(output_size),
            input_subtraction: Array1::zeros(input_size),
            input_division: Array1::ones(output_size),
        }
    }

    /// Resizes the machine, resetting every parameter to its `new` value.
    pub fn resize(&mut self, input_size: usize, output_size: usize) {
        *self = Self::new(input_size, output_size);
    }

    pub fn input_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn biases(&self) -> &Array1<f64> {
        &self.biases
    }

    pub fn input_subtraction(&self) -> &Array1<f64> {
        &self.input_subtraction
    }

    pub fn input_division(&self) -> &Array1<f64> {
        &self.input_division
    }

    /// Replaces the weight matrix. `weights` must be laid out as (outputs, inputs);
    /// any memory order is accepted, so a transposed matrix can be handed over
    /// without copying.
    pub fn set_weights(&mut self, weights: Array2<f64>) -> Result<()> {
        let expected = self.weights.dim();
        if weights.dim() != expected {
            return Err(Error::WeightShape {
                expected,
                found: weights.dim(),
            });
        }
        self.weights = weights;
        Ok(())
    }

    pub fn set_biases(&mut self, biases: Array1<f64>) -> Result<()> {
        check_length("biases", self.output_size(), biases.len())?;
        self.biases = biases;
        Ok(())
    }

    pub fn set_biases_scalar(&mut self, value: f64) {
        self.biases.fill(value);
    }

    pub fn set_input_subtraction(&mut self, subtraction: Array1<f64>) -> Result<()> {
        check_length("input subtraction", self.input_size(), subtraction.len())?;
        self.input_subtraction = subtraction;
        Ok(())
    }

    pub fn set_input_division(&mut self, division: Array1<f64>) -> Result<()> {
        check_length("input division", self.output_size(), division.len())?;
        self.input_division = division;
        Ok(())
    }

    pub fn set_input_division_scalar(&mut self, value: f64) {
        self.input_division.fill(value);
    }

    /// Projects a single sample.
    pub fn forward(&self, input: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        check_length("input", self.input_size(), input.len())?;
        let centered = &input - &self.input_subtraction;
        let mut output = self.weights.dot(&centered);
        output /= &self.input_division;
        output += &self.biases;
        Ok(output)
    }

    /// Projects every row of `inputs`, returning one output row per input row.
    pub fn forward_batch(&self, inputs: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        check_length("input rows", self.input_size(), inputs.ncols())?;
        let centered = &inputs - &self.input_subtraction;
        let mut outputs = centered.dot(&self.weights.t());
        outputs /= &self.input_division;
        outputs += &self.biases;
        Ok(outputs)
    }

    /// Compares two machines parameter by parameter within the given margins.
    /// Machines of different sizes are never similar.
    pub fn is_similar_to(&self, other: &LinearMachine, epsilon: f64, ulps: i64) -> bool {
        if self.weights.dim() != other.weights.dim() {
            return false;
        }
        let margin = F64Margin { epsilon, ulps };
        let close = |a: &f64, b: &f64| (*a).approx_eq(*b, margin);
        self.weights.iter().zip(other.weights.iter()).all(|(a, b)| close(a, b))
            && self.biases.iter().zip(other.biases.iter()).all(|(a, b)| close(a, b))
            && self
                .input_subtraction
                .iter()
                .zip(other.input_subtraction.iter())
                .all(|(a, b)| close(a, b))
            && self
                .input_division
                .iter()
                .zip(other.input_division.iter())
                .all(|(a, b)| close(a, b))
    }

    /// Saves the machine to a file using bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path)
    }

    /// Loads a machine previously written with [`LinearMachine::save`].
    ///
    /// # Errors
    /// Returns an error if file I/O or decoding fails, or if the stored
    /// parameters disagree on the input or output dimension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let machine: LinearMachine = persistence::load_from_file(path)?;
        check_length("biases", machine.output_size(), machine.biases.len())?;
        check_length("input subtraction", machine.input_size(), machine.input_subtraction.len())?;
        check_length("input division", machine.output_size(), machine.input_division.len())?;
        Ok(machine)
    }
}

fn check_length(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::DimensionMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}
