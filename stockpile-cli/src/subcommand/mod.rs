pub mod inspect;
pub mod load_unit;
pub mod pack;

use std::path::{Path, PathBuf};

use stockpile::build::{Description, Section};
use stockpile::errors::*;

/// The parsed description file and the directory it lives in.
pub struct Input {
    pub description: Description,
    pub base: PathBuf,
    pub output: PathBuf,
}

impl Input {
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let path = Path::new(matches.value_of("description").unwrap_or_default());
        let description = Description::load(path)?;
        let base = path
            .parent()
            .map(|v| v.to_owned())
            .unwrap_or_else(PathBuf::new);

        let output = PathBuf::from(matches.value_of("output").unwrap_or_default());
        std::fs::create_dir_all(&output)?;

        Ok(Input {
            description,
            base,
            output,
        })
    }

    /// The sections selected by `--section`, or all of them.
    pub fn sections<'a>(&'a self, matches: &clap::ArgMatches) -> Result<Vec<&'a Section>> {
        match matches.value_of("section") {
            Some(name) => self
                .description
                .section(name)
                .map(|v| vec![v])
                .ok_or_else(|| Error::NotFound(format!("section {}", name))),
            None => Ok(self.description.sections.iter().collect()),
        }
    }
}
