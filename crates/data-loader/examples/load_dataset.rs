use data_loader::{DataIndex, LoadOptions};
use std::path::Path;
use std::time::Instant;

fn main() {
    let data_dir = Path::new("data/ml-latest-small");

    println!("Loading dataset from {}...\n", data_dir.display());

    let start = Instant::now();
    let index = DataIndex::load_from_files(
        &data_dir.join("movies.csv"),
        &data_dir.join("ratings.csv"),
        &LoadOptions::default(),
    )
    .expect("Failed to load dataset");
    let elapsed = start.elapsed();

    let (users, movies, liked) = index.counts();

    println!("=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Users: {}", users);
    println!("Movies: {}", movies);
    println!("Movies liked by someone: {}", liked);
}
