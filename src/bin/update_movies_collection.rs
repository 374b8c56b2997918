use std::{collections::BTreeMap, error::Error, fs};

use boxoffice::db::prod_db::ProdDb;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Scrape movie box office data to DuckDB.", long_about = None)]
struct Args {
    /// Path to the config file, a json object of movie name -> release date
    #[arg(short, long)]
    cfg: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    // a missing or malformed config is the only fatal error
    let config: BTreeMap<String, String> = serde_json::from_reader(fs::File::open(&args.cfg)?)?;

    let archive = ProdDb::movies_collection();
    archive.collect(&config);

    Ok(())
}
