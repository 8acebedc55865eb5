//! Command line arguments and the resolved run configuration.

use crate::common::*;

pub use args::*;
pub use model::*;
pub use preprocess::*;

/// The resolved configuration of a drawing run.
#[derive(Debug, Clone)]
pub struct Config {
    /// The checkpoint file holding the model weights.
    pub resume: PathBuf,
    /// The COCO dataset root containing `annotations/` and `train2017/`.
    pub coco_path: PathBuf,
    /// The directory where rendered images are written.
    pub save_path: PathBuf,
    /// The number of images to render.
    pub num_to_draw: usize,
    /// The number of boxes drawn on each image.
    pub box_per_img: usize,
    pub device: DeviceSpec,
    pub seed: u64,
    pub box_format: BoxFormat,
    pub model: ModelConfig,
    pub preprocess: PreprocessConfig,
    /// Clear a non-empty save directory without asking.
    pub assume_yes: bool,
}

impl Config {
    /// Resolve the configuration from command line arguments.
    ///
    /// The model section starts from the defaults or `--model_config`,
    /// then individual flags override it.
    pub fn from_args(args: Args) -> Result<Self> {
        let Args {
            resume,
            coco_path,
            save_path,
            num_to_draw,
            box_per_img,
            device,
            seed,
            model_config,
            num_queries,
            num_classes,
            hidden_dim,
            min_size,
            max_size,
            box_format,
            yes,
        } = args;

        let mut model = match &model_config {
            Some(path) => ModelConfig::open(path).with_context(|| {
                format!("failed to load model config file '{}'", path.display())
            })?,
            None => ModelConfig::default(),
        };
        if let Some(num_queries) = num_queries {
            model.num_queries = num_queries;
        }
        if let Some(num_classes) = num_classes {
            model.num_classes = num_classes;
        }
        if let Some(hidden_dim) = hidden_dim {
            model.hidden_dim = hidden_dim;
        }

        Ok(Self {
            resume,
            coco_path,
            save_path,
            num_to_draw,
            box_per_img,
            device,
            seed,
            box_format,
            model,
            preprocess: PreprocessConfig { min_size, max_size },
            assume_yes: yes,
        })
    }

    /// Check the paths and sizes before any model work begins.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.coco_path.is_dir(),
            "--coco_path expects a folder path, {} is not a folder",
            self.coco_path.display()
        );
        ensure!(
            self.save_path.is_dir(),
            "--save_path expects a folder path, {} is not a folder",
            self.save_path.display()
        );
        ensure!(
            self.resume.is_file(),
            "--resume expects path to a weight file, {} is not a file",
            self.resume.display()
        );
        ensure!(self.num_to_draw > 0, "--num_to_draw must be positive");
        ensure!(
            self.box_per_img <= self.model.num_queries,
            "--box_per_img ({}) exceeds the number of queries ({})",
            self.box_per_img,
            self.model.num_queries
        );
        self.model.validate()?;
        self.preprocess.validate()?;
        Ok(())
    }
}

mod args {
    use super::*;

    #[derive(Debug, Clone, StructOpt)]
    /// Draw the most confident detections of a DETR model on COCO images
    pub struct Args {
        #[structopt(long = "resume")]
        /// checkpoint file with the model weights
        pub resume: PathBuf,
        #[structopt(long = "coco_path")]
        /// COCO dataset directory
        pub coco_path: PathBuf,
        #[structopt(long = "save_path")]
        /// output directory
        pub save_path: PathBuf,
        #[structopt(long = "num_to_draw", default_value = "10")]
        /// number of images to draw
        pub num_to_draw: usize,
        #[structopt(long = "box_per_img", default_value = "2")]
        /// number of boxes drawn per image
        pub box_per_img: usize,
        #[structopt(long = "device", default_value = "cuda")]
        /// device to run the model on: cpu, cuda or cuda:N
        pub device: DeviceSpec,
        #[structopt(long = "seed", default_value = "42")]
        /// seed of the image sampling order
        pub seed: u64,
        #[structopt(long = "model_config")]
        /// JSON5 file with the model configuration
        pub model_config: Option<PathBuf>,
        #[structopt(long = "num_queries")]
        /// number of query slots
        pub num_queries: Option<usize>,
        #[structopt(long = "num_classes")]
        /// number of classification logits per query
        pub num_classes: Option<usize>,
        #[structopt(long = "hidden_dim")]
        /// size of the query embeddings
        pub hidden_dim: Option<usize>,
        #[structopt(long = "min_size", default_value = "800")]
        /// target length of the shorter image side
        pub min_size: usize,
        #[structopt(long = "max_size", default_value = "1333")]
        /// maximum length of the longer image side
        pub max_size: usize,
        #[structopt(long = "box_format", default_value = "xyxy")]
        /// layout of predicted boxes: xyxy or cxcywh
        pub box_format: BoxFormat,
        #[structopt(long = "yes")]
        /// clear a non-empty save directory without asking
        pub yes: bool,
    }
}

mod model {
    use super::*;

    /// The detector configuration.
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    #[serde(default)]
    pub struct ModelConfig {
        /// Number of query slots per image.
        pub num_queries: usize,
        /// Number of classification logits per query.
        pub num_classes: usize,
        /// Size of the query embeddings.
        pub hidden_dim: usize,
    }

    impl ModelConfig {
        pub fn open<P>(path: P) -> Result<Self>
        where
            P: AsRef<Path>,
        {
            let text = fs::read_to_string(path)?;
            let config = json5::from_str(&text)?;
            Ok(config)
        }

        pub fn validate(&self) -> Result<()> {
            ensure!(self.num_queries > 0, "num_queries must be positive");
            ensure!(self.num_classes > 0, "num_classes must be positive");
            ensure!(self.hidden_dim > 0, "hidden_dim must be positive");
            Ok(())
        }
    }

    impl Default for ModelConfig {
        fn default() -> Self {
            Self {
                num_queries: 300,
                num_classes: 91,
                hidden_dim: 256,
            }
        }
    }
}

mod preprocess {
    use super::*;

    /// Input image resizing options.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PreprocessConfig {
        /// The target length of the shorter image side.
        pub min_size: usize,
        /// The upper bound of the longer image side.
        pub max_size: usize,
    }

    impl PreprocessConfig {
        pub fn validate(&self) -> Result<()> {
            ensure!(self.min_size > 0, "--min_size must be positive");
            ensure!(
                self.max_size >= self.min_size,
                "--max_size must not be less than --min_size"
            );
            Ok(())
        }
    }
}

/// The device specification given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSpec {
    Cpu,
    Cuda(usize),
}

impl DeviceSpec {
    /// Resolve to a torch device, failing if the CUDA device does not exist.
    pub fn to_device(&self) -> Result<Device> {
        match *self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda(index) => {
                let count = tch::Cuda::device_count();
                ensure!(
                    (index as i64) < count,
                    "{} is requested, but {} CUDA devices are available",
                    self,
                    count
                );
                Ok(Device::Cuda(index))
            }
        }
    }
}

impl FromStr for DeviceSpec {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let spec = match text {
            "cpu" => Self::Cpu,
            "cuda" => Self::Cuda(0),
            _ => {
                let index = text
                    .strip_prefix("cuda:")
                    .and_then(|index| index.parse().ok())
                    .ok_or_else(|| format_err!("invalid device '{}'", text))?;
                Self::Cuda(index)
            }
        };
        Ok(spec)
    }
}

impl Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(index) => write!(f, "cuda:{}", index),
        }
    }
}

/// The layout of the four box values predicted per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxFormat {
    /// Corners `(x1, y1, x2, y2)`, taken as-is.
    Xyxy,
    /// Center and size `(cx, cy, w, h)`.
    Cxcywh,
}

impl BoxFormat {
    pub fn to_corners(&self, bbox: [f32; 4]) -> Corners<f32> {
        match self {
            Self::Xyxy => Corners::from_xyxy(bbox),
            Self::Cxcywh => Corners::from_cxcywh(bbox),
        }
    }
}

impl FromStr for BoxFormat {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "xyxy" => Ok(Self::Xyxy),
            "cxcywh" => Ok(Self::Cxcywh),
            _ => bail!("invalid box format '{}', expect xyxy or cxcywh", text),
        }
    }
}
