pub mod movies_collection_archive;
