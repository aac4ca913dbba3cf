//! Weight initialization.
//!
//! Orthogonal initialization produces weight matrices whose singular
//! values are all 1, so forward and backward norms are preserved exactly
//! rather than on average (Xavier). Burn has no built-in QR decomposition,
//! so the orthogonal basis is produced by iterative Gram-Schmidt.
//!
//! Gains follow the activation on the layer:
//! - √2 for ReLU
//! - 5/3 for tanh
//! - 1.0 otherwise

use burn::prelude::*;
use burn::tensor::Distribution;

use crate::config::{Activation, InitFn};

/// Activation-derived gain for orthogonal initialization.
pub fn gain_for(activation: Activation) -> f64 {
    match activation {
        Activation::Relu => std::f64::consts::SQRT_2,
        Activation::Tanh => 5.0 / 3.0,
        Activation::Sigmoid => 1.0,
    }
}

/// Generate an initialized weight matrix of shape `[rows, cols]`
/// (output features × input features).
pub fn init_weight<B: Backend>(
    init_fn: InitFn,
    activation: Activation,
    rows: usize,
    cols: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    match init_fn {
        InitFn::Orthogonal => {
            generate_orthogonal_weights::<B>(rows, cols, gain_for(activation), device)
        }
        InitFn::XavierUniform => generate_xavier_uniform::<B>(rows, cols, device),
    }
}

/// Xavier/Glorot uniform: U(−a, a) with `a = √(6 / (fan_in + fan_out))`.
pub fn generate_xavier_uniform<B: Backend>(
    rows: usize,
    cols: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let bound = (6.0 / (rows + cols) as f64).sqrt();
    Tensor::random([rows, cols], Distribution::Uniform(-bound, bound), device)
}

/// Generate an orthogonal weight matrix via Gram-Schmidt, scaled by `gain`.
///
/// Square and tall matrices get orthonormal columns; wide matrices are
/// transposed, orthogonalized, and transposed back so the rows are
/// orthonormal instead.
pub fn generate_orthogonal_weights<B: Backend>(
    rows: usize,
    cols: usize,
    gain: f64,
    device: &B::Device,
) -> Tensor<B, 2> {
    let random = Tensor::<B, 2>::random([rows, cols], Distribution::Normal(0.0, 1.0), device);

    let orthogonal = if rows >= cols {
        gram_schmidt_columns::<B>(random, device)
    } else {
        gram_schmidt_columns::<B>(random.transpose(), device).transpose()
    };

    orthogonal * (gain as f32)
}

/// Gram-Schmidt orthonormalization of columns.
fn gram_schmidt_columns<B: Backend>(matrix: Tensor<B, 2>, device: &B::Device) -> Tensor<B, 2> {
    let [rows, cols] = matrix.dims();

    let mut columns: Vec<Tensor<B, 1>> = (0..cols)
        .map(|i| matrix.clone().slice([0..rows, i..i + 1]).squeeze::<1>(1))
        .collect();

    for i in 0..cols {
        let mut vi = columns[i].clone();

        // Subtract projections onto previous orthonormal vectors.
        for j in 0..i {
            let vj = &columns[j];
            let dot_ij = dot_product::<B>(&vi, vj);
            let dot_jj = dot_product::<B>(vj, vj);
            let scale = dot_ij / (dot_jj + 1e-10);
            vi = vi - vj.clone() * scale;
        }

        let norm = vi.clone().powf_scalar(2.0).sum().sqrt();
        let norm_scalar: f32 = norm.clone().into_scalar().elem();

        if norm_scalar > 1e-10 {
            columns[i] = vi / norm;
        } else {
            // Linearly dependent column; redraw and normalize.
            let redraw: Tensor<B, 1> =
                Tensor::random([rows], Distribution::Normal(0.0, 1.0), device);
            let norm = redraw.clone().powf_scalar(2.0).sum().sqrt();
            columns[i] = redraw / norm;
        }
    }

    let stacked: Vec<Tensor<B, 2>> = columns.into_iter().map(|c| c.unsqueeze_dim(1)).collect();
    Tensor::cat(stacked, 1)
}

fn dot_product<B: Backend>(a: &Tensor<B, 1>, b: &Tensor<B, 1>) -> f32 {
    (a.clone() * b.clone()).sum().into_scalar().elem()
}
