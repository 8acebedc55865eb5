pub use anyhow::{bail, ensure, Result};
pub use bbox::{prelude::*, HW, TLBR};
pub use tch::{vision, Kind, Tensor};
