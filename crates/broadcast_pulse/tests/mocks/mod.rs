pub mod capture;
pub mod datastore;
pub mod ocr;
pub mod storage;
pub mod transcriber;
