//! Loading of service configuration split across several files.
//!
//! The main file may name other files under `include`. Each file contributes
//! whole top-level sections (`service`, `storage`, `inventory`). A section
//! defined in two files, or a key that is not one of those sections, is an
//! error. Included files cannot include further files.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

const INCLUDE_KEY: &str = "include";

/// Top-level sections of the service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
	Service,
	Storage,
	Inventory,
}

impl Section {
	const ALL: [Section; 3] = [Section::Service, Section::Storage, Section::Inventory];

	fn as_str(self) -> &'static str {
		match self {
			Section::Service => "service",
			Section::Storage => "storage",
			Section::Inventory => "inventory",
		}
	}

	fn from_key(key: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|section| section.as_str() == key)
	}
}

impl fmt::Display for Section {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One configuration file after env resolution, split into its sections.
struct Fragment {
	path: PathBuf,
	includes: Vec<PathBuf>,
	sections: Vec<(Section, toml::Value)>,
}

/// Sections collected so far, with the file each one came from.
type Sections = BTreeMap<Section, (PathBuf, toml::Value)>;

/// Loads a main configuration file and the files it includes.
pub struct ConfigLoader {
	/// Base path for resolving relative paths
	base_path: PathBuf,
}

impl ConfigLoader {
	/// Creates a new ConfigLoader with the given base path.
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
		}
	}

	/// Loads and validates the configuration rooted at `config_path`.
	pub async fn load_config(&self, config_path: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let main_path = self.resolve_path(config_path.as_ref());
		let main = read_fragment(main_path).await?;
		let main_canonical = canonical(&main.path).await?;

		let includes = main.includes.clone();
		let mut sections = Sections::new();
		merge(&mut sections, main)?;

		for include in includes {
			let path = self.resolve_path(&include);
			if canonical(&path).await? == main_canonical {
				return Err(ConfigError::Validation(format!(
					"{} includes itself",
					path.display()
				)));
			}

			let fragment = read_fragment(path).await?;
			if !fragment.includes.is_empty() {
				return Err(ConfigError::Validation(format!(
					"{}: include is only allowed in the main configuration file",
					fragment.path.display()
				)));
			}
			merge(&mut sections, fragment)?;
		}

		let mut table = toml::Table::new();
		for section in Section::ALL {
			let Some((_, value)) = sections.remove(&section) else {
				return Err(ConfigError::Validation(format!(
					"Missing configuration section '{}'",
					section
				)));
			};
			table.insert(section.as_str().to_string(), value);
		}

		let config: Config = toml::Value::Table(table).try_into()?;
		config.validate()?;
		Ok(config)
	}

	fn resolve_path(&self, path: &Path) -> PathBuf {
		if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		}
	}
}

/// Reads one file, resolves environment variables and sorts its keys into
/// includes and known sections.
async fn read_fragment(path: PathBuf) -> Result<Fragment, ConfigError> {
	let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
		ConfigError::Io(std::io::Error::new(
			e.kind(),
			format!("Cannot read configuration file {}: {}", path.display(), e),
		))
	})?;
	let table: toml::Table = toml::from_str(&resolve_env_vars(&content)?)?;

	let mut includes = Vec::new();
	let mut sections = Vec::new();
	for (key, value) in table {
		if key == INCLUDE_KEY {
			includes = include_paths(value)?;
			continue;
		}
		let section = Section::from_key(&key).ok_or_else(|| {
			ConfigError::Validation(format!(
				"Unknown section '{}' in {}",
				key,
				path.display()
			))
		})?;
		sections.push((section, value));
	}

	Ok(Fragment {
		path,
		includes,
		sections,
	})
}

/// Accepts `include = "a.toml"` or `include = ["a.toml", "b.toml"]`.
fn include_paths(value: toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	let invalid = || ConfigError::Validation("include must be a string or an array of strings".into());
	match value {
		toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
		toml::Value::Array(items) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(invalid()),
			})
			.collect(),
		_ => Err(invalid()),
	}
}

fn merge(sections: &mut Sections, fragment: Fragment) -> Result<(), ConfigError> {
	let Fragment {
		path,
		sections: found,
		..
	} = fragment;
	for (section, value) in found {
		if let Some((existing, _)) = sections.get(&section) {
			return Err(ConfigError::Validation(format!(
				"Duplicate section '{}' found in {} and {}",
				section,
				existing.display(),
				path.display()
			)));
		}
		sections.insert(section, (path.clone(), value));
	}
	Ok(())
}

async fn canonical(path: &Path) -> Result<PathBuf, ConfigError> {
	tokio::fs::canonicalize(path).await.map_err(|e| {
		ConfigError::Io(std::io::Error::new(
			e.kind(),
			format!("Cannot resolve path {}: {}", path.display(), e),
		))
	})
}
