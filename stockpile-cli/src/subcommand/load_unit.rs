use stockpile::errors::*;
use stockpile::load_unit::LoadUnitGenerator;

use super::Input;

/// Builds `<output>/<section>.lum` and `.lup` for every selected section. Returns the number of
/// failures.
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
        let mut generator = LoadUnitGenerator::new();
        for v in &section.entries {
            if v.compression_level.is_some() {
                warn!(
                    "[{}] Load units are never compressed per entry, ignored the level of {}.",
                    section.name, v.internal_path
                );
            }

            if let Err(err) = generator.add_entry(&v.to_load_unit_entry(), &input.base) {
                error!("[{}] Skipped {}. {}", section.name, v.external_path, err);
                failures += 1;
            }
        }

        match generator.compile(&input.output, &section.name) {
            Ok(report) => println!(
                "{}/{}: {} entries, {} bytes.",
                input.output.display(),
                section.name,
                report.entries,
                report.bytes
            ),
            Err(err) => {
                error!("[{}] Failed to compile load unit. {}", section.name, err);
                failures += 1;
            }
        }
    }

    Ok(failures)
}
