//! Confidence-based top-k selection of predicted boxes.

use crate::common::*;

/// Invalid input to the box selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error("cannot select {k} boxes from {num_queries} queries")]
    TooManyBoxes { k: usize, num_queries: usize },
    #[error("the confidence of query {index} is not finite")]
    NonFiniteConfidence { index: usize },
    #[error("invalid prediction shape: {0}")]
    InvalidShape(String),
}

/// A query chosen for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedBox {
    /// The maximum class probability of the query.
    pub confidence: f32,
    /// The class with the maximum probability.
    pub class_index: usize,
    /// The position of the query in the model output.
    pub query_index: usize,
    /// The normalized box predicted for the query.
    pub bbox: [f32; 4],
}

/// Pick the indices of the `k` largest confidences in descending order.
///
/// Equal confidences are ordered by ascending index, so the result is
/// deterministic for identical input.
pub fn top_k_indices(confidences: &[f32], k: usize) -> Result<Vec<usize>, SelectError> {
    let num_queries = confidences.len();
    if k > num_queries {
        return Err(SelectError::TooManyBoxes { k, num_queries });
    }
    if let Some(index) = confidences.iter().position(|conf| !conf.is_finite()) {
        return Err(SelectError::NonFiniteConfidence { index });
    }
    if k == 0 {
        return Ok(vec![]);
    }

    let order = |lhs: &usize, rhs: &usize| -> Ordering {
        confidences[*rhs]
            .total_cmp(&confidences[*lhs])
            .then_with(|| lhs.cmp(rhs))
    };

    let mut indices: Vec<usize> = (0..num_queries).collect();
    if k < num_queries {
        indices.select_nth_unstable_by(k - 1, order);
        indices.truncate(k);
    }
    indices.sort_unstable_by(order);

    Ok(indices)
}

/// Select the `k` most confident queries of one image.
///
/// * `pred_logits` - Class logits in shape `[num_queries, num_classes]`.
/// * `pred_boxes` - Normalized boxes in shape `[num_queries, 4]`.
pub fn select_boxes(
    pred_logits: &Tensor,
    pred_boxes: &Tensor,
    k: usize,
) -> Result<Vec<SelectedBox>, SelectError> {
    let (num_queries, num_classes) = match pred_logits.size().as_slice() {
        &[num_queries, num_classes] => (num_queries, num_classes),
        shape => {
            return Err(SelectError::InvalidShape(format!(
                "expect logits in shape [num_queries, num_classes], but get {:?}",
                shape
            )))
        }
    };
    match pred_boxes.size().as_slice() {
        &[n, 4] if n == num_queries => {}
        shape => {
            return Err(SelectError::InvalidShape(format!(
                "expect boxes in shape [{}, 4], but get {:?}",
                num_queries, shape
            )))
        }
    }
    if num_classes == 0 {
        return Err(SelectError::InvalidShape(
            "logits must have at least one class".into(),
        ));
    }

    let (confidences, classes, boxes) = tch::no_grad(|| {
        let probs = pred_logits.to_device(Device::Cpu).softmax(-1, Kind::Float);
        let (confidences, classes) = probs.max_dim(-1, false);
        let boxes = pred_boxes
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .contiguous()
            .view([-1]);
        (confidences, classes, boxes)
    });
    let confidences: Vec<f32> = confidences.into();
    let classes: Vec<i64> = classes.into();
    let boxes: Vec<f32> = boxes.into();

    let selected = top_k_indices(&confidences, k)?
        .into_iter()
        .map(|query_index| {
            let offset = query_index * 4;
            let mut bbox = [0f32; 4];
            bbox.copy_from_slice(&boxes[offset..(offset + 4)]);

            SelectedBox {
                confidence: confidences[query_index],
                class_index: classes[query_index] as usize,
                query_index,
                bbox,
            }
        })
        .collect();

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn top_k_by_confidence() -> Result<()> {
        let indices = top_k_indices(&[0.9, 0.95, 0.3, 0.99], 2)?;
        assert_eq!(indices, vec![3, 1]);
        Ok(())
    }

    #[test]
    fn top_k_ties_prefer_low_index() -> Result<()> {
        assert_eq!(top_k_indices(&[0.5; 6], 3)?, vec![0, 1, 2]);
        assert_eq!(top_k_indices(&[0.1, 0.7, 0.7, 0.2, 0.7], 2)?, vec![1, 2]);
        assert_eq!(top_k_indices(&[0.1, 0.7, 0.7, 0.2, 0.7], 5)?, vec![1, 2, 4, 3, 0]);
        Ok(())
    }

    #[test]
    fn top_k_too_many() {
        assert_eq!(
            top_k_indices(&[0.2, 0.3], 3),
            Err(SelectError::TooManyBoxes {
                k: 3,
                num_queries: 2
            })
        );
    }

    #[test]
    fn top_k_edge_cases() -> Result<()> {
        assert!(top_k_indices(&[0.2, 0.3], 0)?.is_empty());
        assert!(top_k_indices(&[], 0)?.is_empty());
        assert_eq!(
            top_k_indices(&[0.2, f32::NAN], 1),
            Err(SelectError::NonFiniteConfidence { index: 1 })
        );
        Ok(())
    }

    #[test]
    fn select_boxes_from_logits() -> Result<()> {
        // the probability of the winning class grows with the logit gap
        let logits = Tensor::of_slice(&[
            0.0f32, 2.0, 0.0, // query 0: class 1
            3.0, 0.0, 0.0, // query 1: class 0
            0.0, 0.0, 0.0, // query 2: uniform
            0.0, 0.0, 5.0, // query 3: class 2
        ])
        .view([4, 3]);
        let boxes = Tensor::of_slice(&[
            0.0f32, 0.0, 0.1, 0.1, //
            0.1, 0.1, 0.2, 0.2, //
            0.2, 0.2, 0.3, 0.3, //
            0.3, 0.3, 0.4, 0.4,
        ])
        .view([4, 4]);

        let selected = select_boxes(&logits, &boxes, 3)?;
        let queries: Vec<_> = selected.iter().map(|sel| sel.query_index).collect();
        let classes: Vec<_> = selected.iter().map(|sel| sel.class_index).collect();
        assert_eq!(queries, vec![3, 1, 0]);
        assert_eq!(classes, vec![2, 0, 1]);
        assert_eq!(selected[0].bbox, [0.3, 0.3, 0.4, 0.4]);

        let expect = 5f32.exp() / (5f32.exp() + 2.0);
        assert_abs_diff_eq!(selected[0].confidence, expect, epsilon = 1e-5);

        for pair in selected.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        for sel in &selected {
            assert!((0.0..=1.0).contains(&sel.confidence));
        }
        Ok(())
    }

    #[test]
    fn select_boxes_returns_exactly_k() -> Result<()> {
        let logits = Tensor::randn(&[300, 21], (Kind::Float, Device::Cpu));
        let boxes = Tensor::rand(&[300, 4], (Kind::Float, Device::Cpu));

        for k in [1, 2, 50, 300] {
            let selected = select_boxes(&logits, &boxes, k)?;
            assert_eq!(selected.len(), k);
            for pair in selected.windows(2) {
                assert!(pair[0].confidence >= pair[1].confidence);
            }
        }
        Ok(())
    }

    #[test]
    fn select_boxes_invalid_input() {
        let logits = Tensor::zeros(&[4, 3], (Kind::Float, Device::Cpu));
        let boxes = Tensor::zeros(&[4, 4], (Kind::Float, Device::Cpu));
        assert!(matches!(
            select_boxes(&logits, &boxes, 5),
            Err(SelectError::TooManyBoxes { .. })
        ));

        let boxes = Tensor::zeros(&[3, 4], (Kind::Float, Device::Cpu));
        assert!(matches!(
            select_boxes(&logits, &boxes, 1),
            Err(SelectError::InvalidShape(_))
        ));

        let logits = Tensor::zeros(&[1, 4, 3], (Kind::Float, Device::Cpu));
        assert!(matches!(
            select_boxes(&logits, &boxes, 1),
            Err(SelectError::InvalidShape(_))
        ));
    }
}
