//! The detector interface and a DETR-style prediction head.

use crate::{common::*, config::ModelConfig};

/// The raw predictions for one image.
#[derive(Debug)]
pub struct DetectionOutput {
    /// Class logits in shape `[num_queries, num_classes]`.
    pub pred_logits: Tensor,
    /// Normalized boxes in shape `[num_queries, 4]`.
    pub pred_boxes: Tensor,
}

/// A model that predicts class scores and boxes for a fixed set of queries.
pub trait Detector {
    /// Run the model on a normalized `[3, height, width]` float image.
    fn forward(&mut self, image: &Tensor) -> Result<DetectionOutput>;
}

impl<D> Detector for Box<D>
where
    D: Detector + ?Sized,
{
    fn forward(&mut self, image: &Tensor) -> Result<DetectionOutput> {
        (**self).forward(image)
    }
}

/// A compact DETR-style detector.
///
/// A convolutional stem summarizes the image into one feature vector that
/// conditions the learned queries. `query_embed.weight`, `class_embed` and
/// `bbox_embed.layers.N` are named and shaped as in DETR for the same
/// `hidden_dim` and `num_classes`, so those entries of a DETR checkpoint
/// load. The convolutional layers live under `backbone` and have no DETR
/// counterpart. Other keys are reported as missing or unexpected.
#[derive(Debug)]
pub struct DetrHead {
    stem: nn::Conv2D,
    proj: nn::Conv2D,
    query_embed: Tensor,
    class_embed: nn::Linear,
    bbox_embed: Mlp,
    device: Device,
}

impl DetrHead {
    pub fn new<'a>(path: impl Borrow<nn::Path<'a>>, config: &ModelConfig) -> Result<Self> {
        config.validate()?;
        let path = path.borrow();
        let ModelConfig {
            num_queries,
            num_classes,
            hidden_dim,
        } = *config;
        let num_queries = num_queries as i64;
        let num_classes = num_classes as i64;
        let hidden_dim = hidden_dim as i64;

        let backbone = path / "backbone";
        let stem = nn::conv2d(
            &backbone / "stem",
            3,
            hidden_dim,
            7,
            nn::ConvConfig {
                stride: 4,
                padding: 3,
                ..Default::default()
            },
        );
        let proj = nn::conv2d(
            &backbone / "proj",
            hidden_dim,
            hidden_dim,
            3,
            nn::ConvConfig {
                stride: 2,
                padding: 1,
                ..Default::default()
            },
        );
        let query_embed =
            (path / "query_embed").randn_standard("weight", &[num_queries, hidden_dim]);
        let class_embed = nn::linear(
            path / "class_embed",
            hidden_dim,
            num_classes,
            Default::default(),
        );
        let bbox_embed = Mlp::new(path / "bbox_embed", hidden_dim, hidden_dim, 4, 3)?;

        Ok(Self {
            stem,
            proj,
            query_embed,
            class_embed,
            bbox_embed,
            device: path.device(),
        })
    }
}

impl Detector for DetrHead {
    fn forward(&mut self, image: &Tensor) -> Result<DetectionOutput> {
        match image.size().as_slice() {
            &[3, height, width] if height > 0 && width > 0 => {}
            shape => bail!("expect an image in shape [3, height, width], but get {:?}", shape),
        }

        let feature = image
            .to_device(self.device)
            .to_kind(Kind::Float)
            .unsqueeze(0)
            .apply(&self.stem)
            .relu()
            .apply(&self.proj)
            .relu()
            .adaptive_avg_pool2d(&[1, 1])
            .flatten(1, -1);
        let hidden = (&self.query_embed + feature).relu();

        let pred_logits = hidden.apply(&self.class_embed);
        let pred_boxes = self.bbox_embed.forward(&hidden).sigmoid();

        Ok(DetectionOutput {
            pred_logits,
            pred_boxes,
        })
    }
}

/// Fully connected layers with ReLU in between.
#[derive(Debug)]
struct Mlp {
    layers: Vec<nn::Linear>,
}

impl Mlp {
    fn new<'a>(
        path: impl Borrow<nn::Path<'a>>,
        in_dim: i64,
        hidden_dim: i64,
        out_dim: i64,
        num_layers: usize,
    ) -> Result<Self> {
        ensure!(num_layers > 0, "num_layers must be positive");
        let path = path.borrow() / "layers";

        let layers = (0..num_layers)
            .map(|index| {
                let in_dim = if index == 0 { in_dim } else { hidden_dim };
                let out_dim = if index + 1 == num_layers {
                    out_dim
                } else {
                    hidden_dim
                };
                nn::linear(&path / index, in_dim, out_dim, Default::default())
            })
            .collect();

        Ok(Self { layers })
    }

    fn forward(&self, input: &Tensor) -> Tensor {
        let last = self.layers.len() - 1;
        self.layers
            .iter()
            .enumerate()
            .fold(input.shallow_clone(), |xs, (index, layer)| {
                let xs = xs.apply(layer);
                if index < last {
                    xs.relu()
                } else {
                    xs
                }
            })
    }
}

/// Count the elements of all trainable parameters.
pub fn num_parameters(vs: &nn::VarStore) -> usize {
    vs.trainable_variables()
        .iter()
        .map(|tensor| tensor.numel() as usize)
        .sum()
}
