use log::info;
use ndarray::{Array2, Array3, ArrayView4, Axis};
use thiserror::Error;

pub type ModelError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model expected a {expected:?} volume, got {found:?}")]
    Shape {
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },

    #[error("model invocation failed: {0}")]
    Model(#[source] ModelError),

    #[error("model returned an empty batch")]
    EmptyOutput,
}

/// A pre-trained volumetric classifier.
///
/// Takes a batch of shape (batch, depth, height, width) and returns one row
/// of class scores per batch element.
pub trait Classifier {
    fn predict(&self, batch: ArrayView4<'_, f32>) -> Result<Array2<f32>, ModelError>;
}

impl<F> Classifier for F
where
    F: Fn(ArrayView4<'_, f32>) -> Result<Array2<f32>, ModelError>,
{
    fn predict(&self, batch: ArrayView4<'_, f32>) -> Result<Array2<f32>, ModelError> {
        self(batch)
    }
}

/// Ordered per-class scores for one volume.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionResult {
    pub scores: Vec<f32>,
}

/// Feeds a single normalized volume to a [`Classifier`] as a batch of one.
pub struct InferenceAdapter<C> {
    classifier: C,
    input_shape: (usize, usize, usize),
}

impl<C: Classifier> InferenceAdapter<C> {
    pub fn new(classifier: C, input_shape: (usize, usize, usize)) -> Self {
        Self {
            classifier,
            input_shape,
        }
    }

    pub fn predict(&self, volume: Array3<f32>) -> Result<PredictionResult, InferenceError> {
        if volume.dim() != self.input_shape {
            return Err(InferenceError::Shape {
                expected: self.input_shape,
                found: volume.dim(),
            });
        }

        let batch = volume.insert_axis(Axis(0));
        let output = self
            .classifier
            .predict(batch.view())
            .map_err(InferenceError::Model)?;
        let first = output
            .outer_iter()
            .next()
            .ok_or(InferenceError::EmptyOutput)?;

        let scores = first.to_vec();
        info!("prediction: {scores:?}");
        Ok(PredictionResult { scores })
    }
}
