//! Restore model parameters from checkpoint files.

use crate::common::*;

/// The name prefix of the model entry in a checkpoint file.
pub const MODEL_PREFIX: &str = "model.";

/// Suffixes of operator-profiling counters that are dropped silently.
const PROFILING_SUFFIXES: &[&str] = &["total_ops", "total_params"];

/// The model parameters stored in a checkpoint file.
#[derive(Debug)]
pub struct Checkpoint {
    pub model: Vec<(String, Tensor)>,
}

/// The outcome of applying a checkpoint to a parameter store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Parameters copied from the checkpoint.
    pub loaded: Vec<String>,
    /// Model parameters absent from the checkpoint.
    pub missing: Vec<String>,
    /// Checkpoint entries without a matching model parameter.
    pub unexpected: Vec<String>,
}

impl LoadReport {
    pub fn log(&self) {
        info!("loaded {} parameters", self.loaded.len());
        if !self.missing.is_empty() {
            warn!("missing keys: {:?}", self.missing);
        }
        if !self.unexpected.is_empty() {
            warn!("unexpected keys: {:?}", self.unexpected);
        }
    }
}

impl Checkpoint {
    /// Read a checkpoint file.
    ///
    /// Files with the `.npz` extension are read as numpy archives. Others
    /// are read as libtorch tensor archives, the format of `VarStore::save`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_npz = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("npz"))
            .unwrap_or(false);

        let named_tensors = if is_npz {
            Tensor::read_npz(path)
        } else {
            Tensor::load_multi(path)
        }
        .with_context(|| format!("failed to read checkpoint file {}", path.display()))?;

        Ok(Self::from_named_tensors(named_tensors))
    }

    /// Collect the model entry from flattened checkpoint entries.
    ///
    /// Entries under [MODEL_PREFIX] form the model and the prefix is
    /// stripped. If no entry carries the prefix, all entries are taken.
    pub fn from_named_tensors(named_tensors: Vec<(String, Tensor)>) -> Self {
        let has_model_entry = named_tensors
            .iter()
            .any(|(name, _)| name.starts_with(MODEL_PREFIX));

        let model = if has_model_entry {
            named_tensors
                .into_iter()
                .filter_map(|(name, tensor)| {
                    let name = name.strip_prefix(MODEL_PREFIX)?.to_owned();
                    Some((name, tensor))
                })
                .collect()
        } else {
            named_tensors
        };

        Self { model }
    }

    /// Copy matching parameters into the store.
    ///
    /// Parameters missing on either side are reported rather than rejected.
    /// A parameter present on both sides must agree in shape.
    pub fn apply(&self, vs: &mut nn::VarStore) -> Result<LoadReport> {
        let mut variables = vs.variables();
        let mut loaded = vec![];
        let mut unexpected = vec![];

        tch::no_grad(|| -> Result<_> {
            for (name, src) in &self.model {
                match variables.remove(name) {
                    Some(mut dst) => {
                        ensure!(
                            dst.size() == src.size(),
                            "size mismatch for parameter '{}': checkpoint has {:?}, but model expects {:?}",
                            name,
                            src.size(),
                            dst.size()
                        );
                        dst.f_copy_(src)?;
                        loaded.push(name.clone());
                    }
                    None if is_profiling_counter(name) => {
                        debug!("ignore profiling counter {}", name);
                    }
                    None => unexpected.push(name.clone()),
                }
            }
            Ok(())
        })?;

        let missing = variables.into_keys().sorted().collect();

        Ok(LoadReport {
            loaded,
            missing,
            unexpected,
        })
    }
}

fn is_profiling_counter(name: &str) -> bool {
    PROFILING_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var_store() -> nn::VarStore {
        let vs = nn::VarStore::new(Device::Cpu);
        let root = vs.root();
        let class_embed = &root / "class_embed";
        let _ = class_embed.zeros("weight", &[3, 2]);
        let _ = class_embed.zeros("bias", &[3]);
        vs
    }

    #[test]
    fn missing_and_profiling_keys() -> Result<()> {
        let mut vs = var_store();
        let checkpoint = Checkpoint::from_named_tensors(vec![
            (
                "model.class_embed.weight".into(),
                Tensor::ones(&[3, 2], (Kind::Float, Device::Cpu)),
            ),
            (
                "model.backbone.total_ops".into(),
                Tensor::zeros(&[1], (Kind::Float, Device::Cpu)),
            ),
        ]);

        let report = checkpoint.apply(&mut vs)?;
        assert_eq!(report.loaded, vec!["class_embed.weight".to_string()]);
        assert_eq!(report.missing, vec!["class_embed.bias".to_string()]);
        assert!(report.unexpected.is_empty());

        let variables = vs.variables();
        let weight = &variables["class_embed.weight"];
        assert_eq!(weight.sum(Kind::Float).double_value(&[]), 6.0);
        Ok(())
    }

    #[test]
    fn unexpected_keys_are_reported() -> Result<()> {
        let mut vs = var_store();
        let checkpoint = Checkpoint::from_named_tensors(vec![
            (
                "class_embed.bias".into(),
                Tensor::ones(&[3], (Kind::Float, Device::Cpu)),
            ),
            (
                "transformer.level_embed".into(),
                Tensor::ones(&[4, 2], (Kind::Float, Device::Cpu)),
            ),
            (
                "total_params".into(),
                Tensor::ones(&[1], (Kind::Float, Device::Cpu)),
            ),
        ]);

        let report = checkpoint.apply(&mut vs)?;
        assert_eq!(report.unexpected, vec!["transformer.level_embed".to_string()]);
        assert_eq!(report.missing, vec!["class_embed.weight".to_string()]);
        Ok(())
    }

    #[test]
    fn non_model_entries_are_skipped() {
        let checkpoint = Checkpoint::from_named_tensors(vec![
            (
                "model.query_embed".into(),
                Tensor::ones(&[2], (Kind::Float, Device::Cpu)),
            ),
            (
                "optimizer.state.0".into(),
                Tensor::ones(&[2], (Kind::Float, Device::Cpu)),
            ),
            ("epoch".into(), Tensor::ones(&[1], (Kind::Int64, Device::Cpu))),
        ]);
        let names: Vec<_> = checkpoint.model.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["query_embed"]);
    }

    #[test]
    fn shape_mismatch_fails() {
        let mut vs = var_store();
        let checkpoint = Checkpoint::from_named_tensors(vec![(
            "class_embed.bias".into(),
            Tensor::ones(&[4], (Kind::Float, Device::Cpu)),
        )]);
        assert!(checkpoint.apply(&mut vs).is_err());
    }

    #[test]
    fn load_saved_var_store() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("checkpoint.ot");

        let vs = var_store();
        tch::no_grad(|| {
            for (_, mut tensor) in vs.variables() {
                let _ = tensor.fill_(2.0);
            }
        });
        vs.save(&path)?;

        let mut restored = var_store();
        let report = Checkpoint::open(&path)?.apply(&mut restored)?;
        assert!(report.missing.is_empty());
        assert!(report.unexpected.is_empty());

        let variables = restored.variables();
        let bias = &variables["class_embed.bias"];
        assert_eq!(bias.sum(Kind::Float).double_value(&[]), 6.0);
        Ok(())
    }
}
