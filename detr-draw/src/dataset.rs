//! COCO image records and their sampling order.

use crate::common::*;

/// The annotation file relative to the dataset root.
pub const ANNOTATION_FILE: &str = "annotations/instances_train2017.json";
/// The image directory relative to the dataset root.
pub const IMAGE_DIR: &str = "train2017";

/// An image entry of the instances annotation file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageInfo {
    pub id: u64,
    pub file_name: String,
    pub width: usize,
    pub height: usize,
}

impl ImageInfo {
    /// The image size recorded in the annotation.
    pub fn size(&self) -> HW<usize> {
        HW::from_hw([self.height, self.width])
    }
}

#[derive(Debug, Deserialize)]
struct Instances {
    images: Vec<ImageInfo>,
}

/// The `train2017` split of the Microsoft COCO dataset.
#[derive(Debug, Clone)]
pub struct CocoDataset {
    pub image_dir: PathBuf,
    /// Image records ordered by id.
    pub images: Vec<ImageInfo>,
}

impl CocoDataset {
    pub fn load(coco_path: impl AsRef<Path>) -> Result<Self> {
        let coco_path = coco_path.as_ref();
        let annotation_file = coco_path.join(ANNOTATION_FILE);

        let reader = BufReader::new(fs::File::open(&annotation_file).with_context(|| {
            format!(
                "failed to open annotation file {}",
                annotation_file.display()
            )
        })?);
        let Instances { images } = serde_json::from_reader(reader).with_context(|| {
            format!(
                "failed to parse annotation file {}",
                annotation_file.display()
            )
        })?;

        let dataset = Self::from_images(coco_path.join(IMAGE_DIR), images);
        info!(
            "loaded {} image records from {}",
            dataset.len(),
            annotation_file.display()
        );
        Ok(dataset)
    }

    pub fn from_images(image_dir: impl AsRef<Path>, mut images: Vec<ImageInfo>) -> Self {
        images.sort_by_key(|image| image.id);
        Self {
            image_dir: image_dir.as_ref().to_owned(),
            images,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn image_path(&self, image: &ImageInfo) -> PathBuf {
        self.image_dir.join(&image.file_name)
    }

    /// Iterate over the records in a random order fixed by the seed.
    pub fn shuffled(&self, seed: u64) -> impl Iterator<Item = &ImageInfo> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..self.images.len()).collect();
        order.shuffle(&mut rng);
        order.into_iter().map(move |index| &self.images[index])
    }
}
