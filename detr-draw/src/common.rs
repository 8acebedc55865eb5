pub use anyhow::{bail, ensure, format_err, Context, Error, Result};
pub use bbox::{Corners, HW};
pub use itertools::Itertools;
pub use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
pub use serde::Deserialize;
pub use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt::{self, Display},
    fs,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    str::FromStr,
};
pub use structopt::StructOpt;
pub use tch::{nn, vision, Device, Kind, Tensor};
pub use tch_goodies::TensorExt;
pub use tracing::{debug, info, warn};
