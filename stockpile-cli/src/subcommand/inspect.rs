use stockpile::errors::*;
use stockpile::pack::PackFileReader;

pub fn execute(matches: &clap::ArgMatches) -> usize {
    let path = matches.value_of("path").unwrap_or_default();
    match run(path) {
        Ok(()) => 0,
        Err(err) => {
            error!("{}", err);
            1
        }
    }
}

fn run(path: &str) -> Result<()> {
    let reader = PackFileReader::new();
    let meta = reader.metadata(path)?;

    println!("{} entries", meta.len());
    for v in &meta.elements {
        if v.is_compressed() {
            println!("{:>12} {:>10} {:>10} {}", v.offset, v.size, v.compressed_size, v.name);
        } else {
            println!("{:>12} {:>10} {:>10} {}", v.offset, v.size, "-", v.name);
        }
    }

    Ok(())
}
