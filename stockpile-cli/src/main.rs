#[macro_use]
extern crate log;
extern crate clap;
extern crate env_logger;

extern crate stockpile;

mod subcommand;

use std::process;

fn main() {
    env_logger::init();

    let section = clap::Arg::with_name("section")
        .short("s")
        .long("section")
        .takes_value(true)
        .help("Only build the section with this name");

    let cmd_pack = clap::SubCommand::with_name("pack")
        .about("Build one pack file per description section")
        .arg(clap::Arg::with_name("description")
                 .required(true)
                 .index(1)
                 .help("The description file"))
        .arg(clap::Arg::with_name("output")
                 .required(true)
                 .index(2)
                 .help("The directory <section>.pack files are written into"))
        .arg(section.clone());

    let cmd_load_unit = clap::SubCommand::with_name("load-unit")
        .about("Build one load unit per description section")
        .arg(clap::Arg::with_name("description")
                 .required(true)
                 .index(1)
                 .help("The description file"))
        .arg(clap::Arg::with_name("output")
                 .required(true)
                 .index(2)
                 .help("The directory <section>.lum and <section>.lup files are written into"))
        .arg(section);

    let cmd_inspect = clap::SubCommand::with_name("inspect")
        .about("List the entries of a pack file")
        .arg(clap::Arg::with_name("path")
                 .required(true)
                 .index(1)
                 .help("The pack file"));

    let matches = clap::App::new("stockpile-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .subcommand(cmd_pack)
        .subcommand(cmd_load_unit)
        .subcommand(cmd_inspect)
        .get_matches();

    let failures = match matches.subcommand() {
        ("pack", Some(matches)) => subcommand::pack::execute(matches),
        ("load-unit", Some(matches)) => subcommand::load_unit::execute(matches),
        ("inspect", Some(matches)) => subcommand::inspect::execute(matches),
        _ => 0,
    };

    if failures > 0 {
        error!("Finished with {} failures.", failures);
        process::exit(1);
    }
}
