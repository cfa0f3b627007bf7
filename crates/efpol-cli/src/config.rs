use crate::cli::{JobArgs, OptimizeArgs};
use crate::error::{CliError, Result};
use efpol::core::forcefield::damping::PolarizationDamping;
use efpol::core::models::library::FragmentLibrary;
use efpol::core::models::points::PointCharge;
use efpol::core::models::system::FragmentSystem;
use efpol::engine::config as core_config;
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct FragmentEntry {
    name: String,
    /// `x, y, z, a, b, c` in bohr and radians.
    coordinates: [f64; 6],
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PointChargeEntry {
    position: [f64; 3],
    charge: f64,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialTerms {
    polarization: Option<bool>,
    ai_polarization: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialPolarizationConfig {
    enable_cutoff: Option<bool>,
    swf_cutoff: Option<f64>,
    damping: Option<PolarizationDamping>,
    terms: Option<PartialTerms>,
    scf_tolerance: Option<f64>,
    scf_max_iterations: Option<usize>,
    workers: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialOptimizationConfig {
    ls_step_size: Option<f64>,
    tolerance: Option<f64>,
    max_steps: Option<usize>,
    print_step: Option<usize>,
    memory: Option<usize>,
}

/// A job file as written, before CLI overrides and validation.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialJobConfig {
    library: Option<PathBuf>,
    #[serde(default, rename = "fragment")]
    fragments: Vec<FragmentEntry>,
    #[serde(default, rename = "point-charge")]
    point_charges: Vec<PointChargeEntry>,
    periodic_box: Option<[f64; 3]>,
    #[serde(default)]
    skip_pairs: Vec<[usize; 2]>,
    polarization: Option<PartialPolarizationConfig>,
    optimization: Option<PartialOptimizationConfig>,

    /// Directory relative library paths are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

/// Everything a command needs: the placed fragments and both validated configurations.
#[derive(Debug)]
pub struct Job {
    pub system: FragmentSystem,
    pub polarization: core_config::PolarizationConfig,
    pub optimization: core_config::OptimizationConfig,
}

impl PartialJobConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading job file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Applies the optimizer flags of the `optimize` command.
    pub fn with_optimizer_overrides(mut self, args: &OptimizeArgs) -> Self {
        let opt = self.optimization.get_or_insert_with(Default::default);
        if let Some(steps) = args.max_steps {
            opt.max_steps = Some(steps);
        }
        if let Some(tolerance) = args.tolerance {
            opt.tolerance = Some(tolerance);
        }
        self
    }

    pub fn merge_with_cli(mut self, args: &JobArgs) -> Result<Job> {
        self.apply_set_values(&args.set_values)?;

        let pol = self.polarization.take().unwrap_or_default();
        let opt = self.optimization.take().unwrap_or_default();

        let polarization = Self::merge_polarization(pol, args)?;
        let optimization = Self::merge_optimization(opt)?;

        let library_path = args
            .library
            .clone()
            .or_else(|| self.library.as_ref().map(|p| self.base_dir.join(p)))
            .ok_or_else(|| {
                CliError::Config(
                    "A fragment `library` is required either in the job file or via --library."
                        .to_string(),
                )
            })?;
        let library = FragmentLibrary::load(&library_path)?;
        debug!(
            templates = library.len(),
            "Loaded fragment library from {:?}", library_path
        );

        let system = self.build_system(&library)?;

        Ok(Job {
            system,
            polarization,
            optimization,
        })
    }

    fn build_system(&self, library: &FragmentLibrary) -> Result<FragmentSystem> {
        if self.fragments.is_empty() {
            return Err(CliError::Config(
                "The job file must place at least one [[fragment]].".to_string(),
            ));
        }

        let mut system = FragmentSystem::new();
        for entry in &self.fragments {
            system.add_fragment(library.instantiate(&entry.name, &entry.coordinates)?);
        }

        system.set_point_charges(
            self.point_charges
                .iter()
                .map(|p| PointCharge {
                    position: Point3::from(p.position),
                    charge: p.charge,
                })
                .collect(),
        );
        system.set_periodic_box(self.periodic_box.map(Vector3::from));

        for &[i, j] in &self.skip_pairs {
            system.set_skip_pair(i, j, true)?;
        }

        Ok(system)
    }

    fn merge_polarization(
        partial: PartialPolarizationConfig,
        args: &JobArgs,
    ) -> Result<core_config::PolarizationConfig> {
        let mut builder = core_config::PolarizationConfigBuilder::new();

        if let Some(cutoff) = args.cutoff {
            builder = builder.enable_cutoff(true).swf_cutoff(cutoff);
        } else {
            if let Some(enable) = partial.enable_cutoff {
                builder = builder.enable_cutoff(enable);
            }
            if let Some(cutoff) = partial.swf_cutoff {
                builder = builder.swf_cutoff(cutoff);
            }
        }
        if let Some(damping) = partial.damping {
            builder = builder.damping(damping);
        }
        if let Some(terms) = partial.terms {
            let defaults = core_config::Terms::default();
            builder = builder.terms(core_config::Terms {
                polarization: terms.polarization.unwrap_or(defaults.polarization),
                ai_polarization: terms.ai_polarization.unwrap_or(defaults.ai_polarization),
            });
        }
        if let Some(tolerance) = partial.scf_tolerance {
            builder = builder.scf_tolerance(tolerance);
        }
        if let Some(iterations) = partial.scf_max_iterations {
            builder = builder.scf_max_iterations(iterations);
        }
        if let Some(workers) = args.workers.or(partial.workers) {
            builder = builder.workers(workers);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_optimization(
        partial: PartialOptimizationConfig,
    ) -> Result<core_config::OptimizationConfig> {
        let mut builder = core_config::OptimizationConfigBuilder::new();
        if let Some(step) = partial.ls_step_size {
            builder = builder.ls_step_size(step);
        }
        if let Some(tolerance) = partial.tolerance {
            builder = builder.tolerance(tolerance);
        }
        if let Some(steps) = partial.max_steps {
            builder = builder.max_steps(steps);
        }
        if let Some(step) = partial.print_step {
            builder = builder.print_step(step);
        }
        if let Some(memory) = partial.memory {
            builder = builder.memory(memory);
        }
        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "polarization.enable-cutoff" => {
                    self.polarization.get_or_insert_with(Default::default).enable_cutoff =
                        Some(parse_value(key, value_str)?);
                }
                "polarization.swf-cutoff" => {
                    self.polarization.get_or_insert_with(Default::default).swf_cutoff =
                        Some(parse_value(key, value_str)?);
                }
                "polarization.damping" => {
                    self.polarization.get_or_insert_with(Default::default).damping =
                        Some(parse_damping(value_str)?);
                }
                "polarization.terms.polarization" => {
                    self.polarization
                        .get_or_insert_with(Default::default)
                        .terms
                        .get_or_insert_with(Default::default)
                        .polarization = Some(parse_value(key, value_str)?);
                }
                "polarization.terms.ai-polarization" => {
                    self.polarization
                        .get_or_insert_with(Default::default)
                        .terms
                        .get_or_insert_with(Default::default)
                        .ai_polarization = Some(parse_value(key, value_str)?);
                }
                "polarization.scf-tolerance" => {
                    self.polarization.get_or_insert_with(Default::default).scf_tolerance =
                        Some(parse_value(key, value_str)?);
                }
                "polarization.scf-max-iterations" => {
                    self.polarization.get_or_insert_with(Default::default).scf_max_iterations =
                        Some(parse_value(key, value_str)?);
                }
                "polarization.workers" => {
                    self.polarization.get_or_insert_with(Default::default).workers =
                        Some(parse_value(key, value_str)?);
                }
                "optimization.ls-step-size" => {
                    self.optimization.get_or_insert_with(Default::default).ls_step_size =
                        Some(parse_value(key, value_str)?);
                }
                "optimization.tolerance" => {
                    self.optimization.get_or_insert_with(Default::default).tolerance =
                        Some(parse_value(key, value_str)?);
                }
                "optimization.max-steps" => {
                    self.optimization.get_or_insert_with(Default::default).max_steps =
                        Some(parse_value(key, value_str)?);
                }
                "optimization.print-step" => {
                    self.optimization.get_or_insert_with(Default::default).print_step =
                        Some(parse_value(key, value_str)?);
                }
                "optimization.memory" => {
                    self.optimization.get_or_insert_with(Default::default).memory =
                        Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

fn parse_damping(value: &str) -> Result<PolarizationDamping> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => Ok(PolarizationDamping::Off),
        "tt" | "thole" => Ok(PolarizationDamping::Tt),
        other => Err(CliError::Config(format!(
            "Invalid damping '{}'. Expected 'off' or 'tt'.",
            other
        ))),
    }
}
