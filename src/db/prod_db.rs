use super::boxofficecollection::movies_collection_archive::MoviesCollectionArchive;

pub struct ProdDb {}

impl ProdDb {
    pub fn movies_collection() -> MoviesCollectionArchive {
        MoviesCollectionArchive {
            base_url: "https://boxofficecollection.in/".to_string(),
            duckdb_path: "movies.duckdb".to_string(),
        }
    }
}
