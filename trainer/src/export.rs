//! The flat model buffer: a compact little-endian serialization of the
//! trained network for on-device inference.
//!
//! Layout:
//!
//! ```text
//! magic   "FMB1"
//! layers  u32
//! per layer:
//!   dim_in   u32
//!   dim_out  u32
//!   act      u8                       0 = logits, 1 = relu
//!   w_scale  f32                      symmetric per-tensor scale
//!   weights  i8 * dim_in * dim_out    row-major, quantized
//!   biases   f32 * dim_out
//! ```
//!
//! Weights are quantized to int8 with a symmetric per-tensor scale of
//! `max|w| / 127`; biases stay in float, as the on-device accumulator is
//! wider than the weights anyway.

use std::fs;
use std::path::Path;

use ndarray::{Array2, ArrayView2};

use crate::arch::activations::{softmax, ActFn};
use crate::arch::Sequential;
use crate::error::{Result, TrainerError};

pub const MAGIC: [u8; 4] = *b"FMB1";

const ACT_NONE: u8 = 0;
const ACT_RELU: u8 = 1;

const QUANT_MAX: f32 = 127.0;

/// One dense layer of the exported model.
#[derive(Debug)]
pub struct QuantizedLayer {
    dim: (usize, usize),
    act: u8,
    w_scale: f32,
    weights: Vec<i8>,
    biases: Vec<f32>,
}

impl QuantizedLayer {
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn act(&self) -> u8 {
        self.act
    }

    pub fn w_scale(&self) -> f32 {
        self.w_scale
    }

    /// Dequantizes this layer's weights back to float.
    fn weights_f32(&self) -> Result<Array2<f32>> {
        let floats = self
            .weights
            .iter()
            .map(|&q| q as f32 * self.w_scale)
            .collect();

        Array2::from_shape_vec(self.dim, floats)
            .map_err(|_| TrainerError::BadModelFile("layer weight shape"))
    }
}

/// The serialized form of a trained `Sequential`.
#[derive(Debug)]
pub struct ModelBuffer {
    layers: Vec<QuantizedLayer>,
}

impl ModelBuffer {
    /// Quantizes a trained model into its exportable form.
    ///
    /// # Arguments
    /// * `model` - The trained architecture.
    /// * `params` - The trained flat parameter buffer.
    ///
    /// # Errors
    /// Returns a `SizeMismatch` when `params` does not match the model size.
    pub fn from_model(model: &Sequential, params: &[f32]) -> Result<Self> {
        if params.len() != model.size() {
            return Err(TrainerError::SizeMismatch {
                what: "params",
                got: params.len(),
                expected: model.size(),
            });
        }

        let mut params = params;
        let mut layers = Vec::with_capacity(model.layers().len());

        for layer in model.layers() {
            let (head, rest) = params.split_at(layer.size());
            params = rest;

            let (dim_in, dim_out) = layer.dim();
            let (weights, biases) = head.split_at(dim_in * dim_out);

            let (w_scale, weights) = quantize(weights);
            let act = match layer.act_fn() {
                Some(ActFn::Relu) => ACT_RELU,
                None => ACT_NONE,
            };

            layers.push(QuantizedLayer {
                dim: (dim_in, dim_out),
                act,
                w_scale,
                weights,
                biases: biases.to_vec(),
            });
        }

        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[QuantizedLayer] {
        &self.layers
    }

    /// Serializes the model into its byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&(self.layers.len() as u32).to_le_bytes());

        for layer in &self.layers {
            out.extend_from_slice(&(layer.dim.0 as u32).to_le_bytes());
            out.extend_from_slice(&(layer.dim.1 as u32).to_le_bytes());
            out.push(layer.act);
            out.extend_from_slice(&layer.w_scale.to_le_bytes());
            out.extend_from_slice(bytemuck::cast_slice(&layer.weights));
            for bias in &layer.biases {
                out.extend_from_slice(&bias.to_le_bytes());
            }
        }

        out
    }

    /// Parses a model back from its byte form.
    ///
    /// # Errors
    /// Returns `BadModelFile` on a wrong magic, truncation, trailing bytes
    /// or an unknown activation id.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor { bytes };

        if cursor.take(MAGIC.len())? != &MAGIC[..] {
            return Err(TrainerError::BadModelFile("wrong magic"));
        }

        let num_layers = cursor.take_u32()? as usize;
        let mut layers = Vec::with_capacity(num_layers);

        for _ in 0..num_layers {
            let dim_in = cursor.take_u32()? as usize;
            let dim_out = cursor.take_u32()? as usize;

            let act = cursor.take(1)?[0];
            if act != ACT_NONE && act != ACT_RELU {
                return Err(TrainerError::BadModelFile("unknown activation id"));
            }

            let w_scale = cursor.take_f32()?;
            let weights = bytemuck::cast_slice(cursor.take(dim_in * dim_out)?).to_vec();
            let biases = (0..dim_out)
                .map(|_| cursor.take_f32())
                .collect::<Result<Vec<f32>>>()?;

            layers.push(QuantizedLayer {
                dim: (dim_in, dim_out),
                act,
                w_scale,
                weights,
                biases,
            });
        }

        if !cursor.bytes.is_empty() {
            return Err(TrainerError::BadModelFile("trailing bytes"));
        }

        Ok(Self { layers })
    }

    /// Writes the serialized model to `path`.
    ///
    /// # Returns
    /// The amount of bytes written.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let bytes = self.to_bytes();
        fs::write(path, &bytes)?;
        Ok(bytes.len())
    }

    /// Reads a serialized model back from `path`.
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(&fs::read(path)?)
    }

    /// Runs the exported model on a batch: dequantized dense passes with the
    /// stored activations, softmax over the final logits.
    ///
    /// This mirrors what the on-device interpreter computes and is what the
    /// export tests assert against.
    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut out = x.to_owned();

        for layer in &self.layers {
            let w = layer.weights_f32()?;
            if out.ncols() != layer.dim.0 {
                return Err(TrainerError::SizeMismatch {
                    what: "layer input",
                    got: out.ncols(),
                    expected: layer.dim.0,
                });
            }

            let b = ndarray::ArrayView1::from_shape(layer.dim.1, &layer.biases[..])
                .map_err(|_| TrainerError::BadModelFile("layer bias shape"))?;
            let mut z = out.dot(&w);
            z += &b;

            if layer.act == ACT_RELU {
                z.mapv_inplace(|z| ActFn::Relu.f(z));
            }

            out = z;
        }

        Ok(softmax(out.view()))
    }
}

/// Quantizes a float tensor to int8 with a symmetric per-tensor scale.
/// All-zero tensors get a scale of 1 so dequantization stays exact.
fn quantize(weights: &[f32]) -> (f32, Vec<i8>) {
    let max_abs = weights.iter().fold(0.0f32, |m, &w| m.max(w.abs()));
    let scale = if max_abs > 0.0 { max_abs / QUANT_MAX } else { 1.0 };

    let quantized = weights
        .iter()
        .map(|&w| (w / scale).round().clamp(-QUANT_MAX, QUANT_MAX) as i8)
        .collect();

    (scale, quantized)
}

struct Cursor<'a> {
    bytes: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < n {
            return Err(TrainerError::BadModelFile("truncated"));
        }

        let (head, rest) = self.bytes.split_at(n);
        self.bytes = rest;
        Ok(head)
    }

    fn take_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn take_f32(&mut self) -> Result<f32> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes(bytes.try_into().unwrap()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arch::layers::Dense;
    use ndarray::array;

    fn two_layer_model() -> (Sequential, Vec<f32>) {
        let model = Sequential::new([
            Dense::new((1, 4), Some(ActFn::Relu)),
            Dense::new((4, 3), None),
        ]);
        let params: Vec<f32> = (0..model.size())
            .map(|i| (i as f32 * 0.37).sin() * 0.8)
            .collect();
        (model, params)
    }

    #[test]
    fn quantization_error_is_bounded_by_half_scale() {
        let weights = [0.8, -0.3, 0.0, 0.512, -0.77];
        let (scale, quantized) = quantize(&weights);

        for (&w, &q) in weights.iter().zip(&quantized) {
            let back = q as f32 * scale;
            assert!(
                (w - back).abs() <= scale / 2.0 + f32::EPSILON,
                "{w} round-tripped to {back} with scale {scale}"
            );
        }
    }

    #[test]
    fn all_zero_weights_quantize_exactly() {
        let (scale, quantized) = quantize(&[0.0; 8]);

        assert_eq!(scale, 1.0);
        assert!(quantized.iter().all(|&q| q == 0));
    }

    #[test]
    fn bytes_roundtrip() {
        let (model, params) = two_layer_model();
        let buffer = ModelBuffer::from_model(&model, &params).unwrap();

        let bytes = buffer.to_bytes();
        let parsed = ModelBuffer::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.to_bytes(), bytes);
        assert_eq!(parsed.layers().len(), 2);
        assert_eq!(parsed.layers()[0].dim(), (1, 4));
        assert_eq!(parsed.layers()[0].act(), ACT_RELU);
        assert_eq!(parsed.layers()[1].dim(), (4, 3));
        assert_eq!(parsed.layers()[1].act(), ACT_NONE);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let (model, params) = two_layer_model();
        let mut bytes = ModelBuffer::from_model(&model, &params).unwrap().to_bytes();
        bytes[0] = b'X';

        let err = ModelBuffer::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, TrainerError::BadModelFile("wrong magic")));
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let (model, params) = two_layer_model();
        let bytes = ModelBuffer::from_model(&model, &params).unwrap().to_bytes();

        let err = ModelBuffer::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, TrainerError::BadModelFile("truncated")));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let (model, params) = two_layer_model();
        let mut bytes = ModelBuffer::from_model(&model, &params).unwrap().to_bytes();
        bytes.push(0);

        let err = ModelBuffer::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, TrainerError::BadModelFile("trailing bytes")));
    }

    #[test]
    fn exported_model_agrees_with_float_model_on_argmax() {
        let (mut model, params) = two_layer_model();
        let buffer = ModelBuffer::from_model(&model, &params).unwrap();

        let x = array![[0.05], [0.45], [0.9]];
        let logits = model.forward(&params, x.view()).unwrap();
        let float_probs = softmax(logits.view());
        let quant_probs = buffer.predict(x.view()).unwrap();

        assert_eq!(quant_probs.ncols(), 3);
        for (fp, qp) in float_probs.rows().into_iter().zip(quant_probs.rows()) {
            let float_argmax = fp
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .unwrap()
                .0;
            let quant_argmax = qp
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .unwrap()
                .0;
            assert_eq!(float_argmax, quant_argmax);
            assert!((qp.sum() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn header_encodes_layer_count() {
        let (model, params) = two_layer_model();
        let bytes = ModelBuffer::from_model(&model, &params).unwrap().to_bytes();

        assert_eq!(&bytes[..4], b"FMB1");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 2);
    }
}
