//! Draw the most confident predictions of a DETR-style detector on COCO
//! images.

mod common;

pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod model;
pub mod preprocess;
pub mod render;
pub mod save_dir;
pub mod selection;

use crate::{
    checkpoint::Checkpoint,
    common::*,
    config::{BoxFormat, Config},
    dataset::CocoDataset,
    model::{num_parameters, DetectionOutput, Detector, DetrHead},
    preprocess::Preprocessor,
    render::Renderer,
    save_dir::{prepare_save_dir, Confirm, Prepared},
    selection::select_boxes,
};

/// Options of the drawing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawOptions {
    pub num_to_draw: usize,
    pub box_per_img: usize,
    pub seed: u64,
    pub box_format: BoxFormat,
}

impl From<&Config> for DrawOptions {
    fn from(config: &Config) -> Self {
        Self {
            num_to_draw: config.num_to_draw,
            box_per_img: config.box_per_img,
            seed: config.seed,
            box_format: config.box_format,
        }
    }
}

/// Run the whole drawing program and return the written files.
///
/// The device, checkpoint and dataset are resolved before the save
/// directory is touched, so a bad input leaves it as it was. Returns an
/// empty list if clearing the save directory is declined.
pub fn start(config: &Config, confirm: &mut dyn Confirm) -> Result<Vec<PathBuf>> {
    config.validate()?;

    let device = config.device.to_device()?;
    info!("use device {:?}", device);
    let checkpoint = Checkpoint::open(&config.resume)?;
    let dataset = CocoDataset::load(&config.coco_path)?;
    let preprocessor = Preprocessor::new(&config.preprocess, device)?;

    if prepare_save_dir(&config.save_path, confirm)? == Prepared::Declined {
        return Ok(vec![]);
    }

    tch::manual_seed(config.seed as i64);

    // build model
    let mut vs = nn::VarStore::new(device);
    let mut model = DetrHead::new(&vs.root(), &config.model)?;
    info!("number of params: {}", num_parameters(&vs));

    // load weights
    let report = checkpoint.apply(&mut vs).with_context(|| {
        format!(
            "failed to apply checkpoint file {}",
            config.resume.display()
        )
    })?;
    report.log();

    let mut renderer = Renderer::new(&config.save_path);

    draw_predictions(
        &mut model,
        &dataset,
        &preprocessor,
        &mut renderer,
        &config.into(),
    )
}

/// Render the top boxes of images sampled from the dataset.
pub fn draw_predictions<D>(
    detector: &mut D,
    dataset: &CocoDataset,
    preprocessor: &Preprocessor,
    renderer: &mut Renderer,
    options: &DrawOptions,
) -> Result<Vec<PathBuf>>
where
    D: Detector + ?Sized,
{
    let DrawOptions {
        num_to_draw,
        box_per_img,
        seed,
        box_format,
    } = *options;
    let mut outputs = vec![];

    for image in dataset.shuffled(seed).take(num_to_draw) {
        let image_path = dataset.image_path(image);
        let loaded = preprocessor.load_image(&image_path)?;

        let size = image.size();
        let loaded_size = loaded.size()?;
        if loaded_size != size {
            warn!(
                "{} is {:?} in pixels, but the annotation says {:?}",
                image_path.display(),
                loaded_size.hw(),
                size.hw()
            );
        }

        let DetectionOutput {
            pred_logits,
            pred_boxes,
        } = tch::no_grad(|| detector.forward(&loaded.input))?;
        let selected = select_boxes(&pred_logits, &pred_boxes, box_per_img)?;

        let boxes: Vec<Corners<i64>> = selected
            .iter()
            .map(|sel| {
                debug!(
                    "image {}: query {} class {} confidence {:.4}",
                    image.id, sel.query_index, sel.class_index, sel.confidence
                );
                box_format
                    .to_corners(sel.bbox)
                    .project(&size)
                    .ok_or_else(|| format_err!("box {:?} cannot be projected", sel.bbox))
            })
            .try_collect()?;

        let output_path = renderer.render(&loaded.pixels, &boxes)?;
        info!("saved {}", output_path.display());
        outputs.push(output_path);
    }

    if outputs.len() < num_to_draw {
        warn!(
            "the dataset is exhausted after {} images, {} are requested",
            outputs.len(),
            num_to_draw
        );
    }

    Ok(outputs)
}
