use stockpile::errors::*;
use stockpile::pack::{PackFileGenerator, EXTENSION};

use super::Input;

/// Builds `<output>/<section>.pack` for every selected section. Returns the number of failures.
pub fn execute(matches: &clap::ArgMatches) -> usize {
    match run(matches) {
        Ok(failures) => failures,
        Err(err) => {
            error!("{}", err);
            1
        }
    }
}

fn run(matches: &clap::ArgMatches) -> Result<usize> {
    let input = Input::parse(matches)?;
    let mut failures = 0;

    for section in input.sections(matches)? {
        let mut generator = PackFileGenerator::new();
        for v in &section.entries {
            if let Err(err) = generator.add_entry(&v.to_pack_file_entry(), &input.base) {
                error!("[{}] Skipped {}. {}", section.name, v.external_path, err);
                failures += 1;
            }
        }

        let path = input
            .output
            .join(format!("{}.{}", section.name, EXTENSION));

        match generator.compile(&path) {
            Ok(report) => println!(
                "{}: {} entries, {} bytes.",
                path.display(),
                report.entries,
                report.bytes
            ),
            Err(err) => {
                error!("[{}] Failed to compile {}. {}", section.name, path.display(), err);
                failures += 1;
            }
        }
    }

    Ok(failures)
}
