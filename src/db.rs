pub mod boxofficecollection;
pub mod prod_db;
