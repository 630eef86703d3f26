//! Feed-forward network used by every hazard model
//!
//! Dense layers with ReLU hidden activations and a single sigmoid output,
//! optimised with Adam on binary cross-entropy.

use ndarray::{Array, Array1, Array2, ArrayView1, Axis, Dimension, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::{HazardError, HazardResult};

/// Probability clamp for the log-loss
const LOSS_EPSILON: f32 = 1e-7;

// ============================================================================
// PARAMETERS
// ============================================================================

/// Serialized form of one dense layer (weights row-major, inputs x outputs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerParams {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

#[derive(Debug, Clone)]
struct Dense {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl Dense {
    /// Xavier-uniform weights, zero bias
    fn xavier(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        let weights = Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(-limit..limit));
        Self {
            weights,
            bias: Array1::zeros(outputs),
        }
    }
}

// ============================================================================
// NETWORK
// ============================================================================

#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Dense>,
}

impl Network {
    pub fn new(inputs: usize, hidden: &[usize], rng: &mut StdRng) -> Self {
        let mut widths = Vec::with_capacity(hidden.len() + 2);
        widths.push(inputs);
        widths.extend(hidden.iter().copied().filter(|w| *w > 0));
        widths.push(1);

        let layers = widths
            .windows(2)
            .map(|pair| Dense::xavier(pair[0], pair[1], rng))
            .collect();
        Self { layers }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.weights.nrows()).unwrap_or(0)
    }

    /// Scores for every row of `inputs` (already normalized)
    pub fn predict(&self, inputs: &Array2<f32>) -> Array1<f32> {
        let (activations, _) = self.forward(inputs);
        activations[activations.len() - 1].column(0).to_owned()
    }

    pub fn predict_one(&self, input: ArrayView1<f32>) -> f32 {
        let row = input.insert_axis(Axis(0)).to_owned();
        self.predict(&row)[0]
    }

    /// Returns (layer inputs + final output, pre-activations)
    fn forward(&self, inputs: &Array2<f32>) -> (Vec<Array2<f32>>, Vec<Array2<f32>>) {
        let last = self.layers.len() - 1;
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        let mut pre = Vec::with_capacity(self.layers.len());
        activations.push(inputs.clone());

        for (i, layer) in self.layers.iter().enumerate() {
            let z = activations[i].dot(&layer.weights) + &layer.bias;
            let a = if i == last { z.mapv(sigmoid) } else { z.mapv(relu) };
            pre.push(z);
            activations.push(a);
        }
        (activations, pre)
    }

    /// Gradients per layer, first layer first
    fn backward(
        &self,
        activations: &[Array2<f32>],
        pre: &[Array2<f32>],
        targets: ArrayView1<f32>,
    ) -> Vec<(Array2<f32>, Array1<f32>)> {
        let n = targets.len() as f32;
        let output = &activations[activations.len() - 1];

        // sigmoid + BCE collapses to (p - y)
        let mut delta: Array2<f32> = (output - &targets.insert_axis(Axis(1))) / n;
        let mut grads = Vec::with_capacity(self.layers.len());

        for i in (0..self.layers.len()).rev() {
            let grad_w = activations[i].t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            if i > 0 {
                let upstream = delta.dot(&self.layers[i].weights.t());
                delta = upstream * &pre[i - 1].mapv(|z| if z > 0.0 { 1.0 } else { 0.0 });
            }
            grads.push((grad_w, grad_b));
        }
        grads.reverse();
        grads
    }

    /// One pass over shuffled mini-batches; returns mean training loss
    pub fn train_epoch(
        &mut self,
        inputs: &Array2<f32>,
        targets: &Array1<f32>,
        batch_size: usize,
        optimizer: &mut Adam,
        rng: &mut StdRng,
    ) -> f32 {
        let mut order: Vec<usize> = (0..inputs.nrows()).collect();
        order.shuffle(rng);

        let mut total = 0.0;
        for chunk in order.chunks(batch_size.max(1)) {
            let batch_x = inputs.select(Axis(0), chunk);
            let batch_y = targets.select(Axis(0), chunk);

            let (activations, pre) = self.forward(&batch_x);
            let predicted = activations[activations.len() - 1].column(0);
            total += bce_loss(predicted, batch_y.view()) * chunk.len() as f32;

            let grads = self.backward(&activations, &pre, batch_y.view());
            optimizer.step(self, grads);
        }
        total / inputs.nrows().max(1) as f32
    }

    pub fn to_params(&self) -> Vec<LayerParams> {
        self.layers
            .iter()
            .map(|l| LayerParams {
                inputs: l.weights.nrows(),
                outputs: l.weights.ncols(),
                weights: l.weights.iter().copied().collect(),
                bias: l.bias.to_vec(),
            })
            .collect()
    }

    /// Rebuild from persisted layers, checking the chain of shapes
    pub fn from_params(params: &[LayerParams], inputs: usize) -> HazardResult<Self> {
        if params.is_empty() {
            return Err(HazardError::InvalidArtifact("network has no layers".to_string()));
        }

        let mut expected_inputs = inputs;
        let mut layers = Vec::with_capacity(params.len());
        for (i, p) in params.iter().enumerate() {
            if p.inputs != expected_inputs || p.bias.len() != p.outputs {
                return Err(HazardError::InvalidArtifact(format!(
                    "layer {} shape {}x{} does not chain from {}",
                    i, p.inputs, p.outputs, expected_inputs
                )));
            }
            if p.weights.iter().chain(&p.bias).any(|v| !v.is_finite()) {
                return Err(HazardError::InvalidArtifact(format!("layer {} has non-finite values", i)));
            }
            let weights = Array2::from_shape_vec((p.inputs, p.outputs), p.weights.clone())
                .map_err(|e| HazardError::InvalidArtifact(format!("layer {}: {}", i, e)))?;
            layers.push(Dense {
                weights,
                bias: Array1::from_vec(p.bias.clone()),
            });
            expected_inputs = p.outputs;
        }

        if expected_inputs != 1 {
            return Err(HazardError::InvalidArtifact(format!(
                "network must end in 1 output, got {}",
                expected_inputs
            )));
        }
        Ok(Self { layers })
    }
}

// ============================================================================
// OPTIMIZER
// ============================================================================

/// Adam with bias correction
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    step: i32,
    moments: Vec<(Array2<f32>, Array1<f32>)>,
    velocities: Vec<(Array2<f32>, Array1<f32>)>,
}

impl Adam {
    pub fn new(learning_rate: f32, network: &Network) -> Self {
        let zeros: Vec<(Array2<f32>, Array1<f32>)> = network
            .layers
            .iter()
            .map(|l| (Array2::zeros(l.weights.raw_dim()), Array1::zeros(l.bias.len())))
            .collect();
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
            moments: zeros.clone(),
            velocities: zeros,
        }
    }

    fn step(&mut self, network: &mut Network, grads: Vec<(Array2<f32>, Array1<f32>)>) {
        self.step += 1;
        let hyper = AdamStep {
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            correction1: 1.0 - self.beta1.powi(self.step),
            correction2: 1.0 - self.beta2.powi(self.step),
        };

        let state = self.moments.iter_mut().zip(self.velocities.iter_mut());
        for ((layer, (grad_w, grad_b)), ((m_w, m_b), (v_w, v_b))) in
            network.layers.iter_mut().zip(grads).zip(state)
        {
            hyper.apply(&mut layer.weights, &grad_w, m_w, v_w);
            hyper.apply(&mut layer.bias, &grad_b, m_b, v_b);
        }
    }
}

struct AdamStep {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    correction1: f32,
    correction2: f32,
}

impl AdamStep {
    fn apply<D: Dimension>(
        &self,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
        moment: &mut Array<f32, D>,
        velocity: &mut Array<f32, D>,
    ) {
        Zip::from(param)
            .and(grad)
            .and(moment)
            .and(velocity)
            .for_each(|p, &g, m, v| {
                *m = self.beta1 * *m + (1.0 - self.beta1) * g;
                *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
                let m_hat = *m / self.correction1;
                let v_hat = *v / self.correction2;
                *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
            });
    }
}

// ============================================================================
// MATH
// ============================================================================

fn relu(z: f32) -> f32 {
    z.max(0.0)
}

fn sigmoid(z: f32) -> f32 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Mean binary cross-entropy with soft labels
pub fn bce_loss(predicted: ArrayView1<f32>, targets: ArrayView1<f32>) -> f32 {
    if predicted.is_empty() {
        return 0.0;
    }
    let sum: f32 = predicted
        .iter()
        .zip(targets.iter())
        .map(|(&p, &y)| {
            let p = p.clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    sum / predicted.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_output_is_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = Network::new(3, &[8, 4], &mut rng);
        let inputs = array![[1e6f32, -1e6, 0.0], [0.0, 0.0, 0.0], [-50.0, 50.0, 3.0]];
        for &score in net.predict(&inputs).iter() {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_params_round_trip_preserves_output() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = Network::new(2, &[4], &mut rng);
        let restored = Network::from_params(&net.to_params(), 2).unwrap();

        let x = array![0.3f32, -1.2];
        assert_eq!(net.predict_one(x.view()), restored.predict_one(x.view()));
    }

    #[test]
    fn test_from_params_rejects_broken_chain() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = Network::new(2, &[4], &mut rng);
        assert!(Network::from_params(&net.to_params(), 3).is_err());

        let mut params = net.to_params();
        params[1].bias.push(0.0);
        assert!(Network::from_params(&params, 2).is_err());
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut net = Network::new(1, &[8], &mut rng);
        let mut adam = Adam::new(0.01, &net);

        // target rises with x
        let xs: Vec<f32> = (0..200).map(|i| i as f32 / 100.0 - 1.0).collect();
        let inputs = Array2::from_shape_vec((200, 1), xs.clone()).unwrap();
        let targets: Array1<f32> = xs.iter().map(|x| if *x > 0.0 { 0.9 } else { 0.1 }).collect();

        let first = net.train_epoch(&inputs, &targets, 16, &mut adam, &mut rng);
        let mut last = first;
        for _ in 0..60 {
            last = net.train_epoch(&inputs, &targets, 16, &mut adam, &mut rng);
        }
        assert!(last < first, "loss did not decrease: {} -> {}", first, last);
        assert!(net.predict_one(array![0.8f32].view()) > net.predict_one(array![-0.8f32].view()));
    }

    #[test]
    fn test_bce_loss_clamps() {
        let loss = bce_loss(array![0.0f32, 1.0].view(), array![1.0f32, 0.0].view());
        assert!(loss.is_finite());
        assert!(loss > 10.0);
    }
}
