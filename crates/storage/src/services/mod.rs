pub mod versioning;
